use std::time::Duration;

/// Labels of the checker's progress display, in order. Index 0 is the
/// upload step; the last one waits for the real result.
pub const STEPS: [&str; 7] = [
    "Uploading your resume",
    "Extracting resume content",
    "Checking formatting and structure",
    "Scanning for relevant keywords",
    "Evaluating experience and skills",
    "Calculating ATS compatibility",
    "Preparing your report",
];

pub const LAST_STEP: usize = STEPS.len() - 1;

pub fn step_label(index: usize) -> Option<&'static str> {
    STEPS.get(index).copied()
}

/// UX pacing of the step display. Only `upload_timeout` bounds network time.
#[derive(Debug, Clone, PartialEq)]
pub struct Pacing {
    pub initial_delay: Duration,
    /// Advance delay is drawn from `[step_delay_min, step_delay_max)`.
    pub step_delay_min: Duration,
    pub step_delay_max: Duration,
    /// Once the result is in, skipping ahead is allowed from this step on.
    pub short_circuit_step: usize,
    pub short_circuit_jump: Duration,
    pub finish_delay: Duration,
    pub poll_interval: Duration,
    pub poll_window: Duration,
    pub cleanup_delay: Duration,
    pub display_delay: Duration,
    /// Step 0 gives up on the upload after this long.
    pub upload_timeout: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(500),
            step_delay_min: Duration::from_millis(600),
            step_delay_max: Duration::from_millis(1400),
            short_circuit_step: 3,
            short_circuit_jump: Duration::from_millis(800),
            finish_delay: Duration::from_millis(1000),
            poll_interval: Duration::from_millis(500),
            poll_window: Duration::from_millis(15_000),
            cleanup_delay: Duration::from_millis(800),
            display_delay: Duration::from_millis(800),
            upload_timeout: Duration::from_secs(60),
        }
    }
}

impl Pacing {
    pub fn with_short_circuit_step(mut self, step: usize) -> Self {
        self.short_circuit_step = step;
        self
    }
}
