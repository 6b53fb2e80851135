// ATS resume checker: PDF upload, remote analysis and the paced step
// animation the SPA renders while it waits.

pub mod analysis;
pub mod errors;
pub mod handlers;
pub mod machine;
pub mod models;
pub mod orchestrator;
pub mod registry;
pub mod steps;
pub mod store;
pub mod validation;

pub use errors::SessionError;
pub use orchestrator::SessionDeps;
pub use registry::SessionRegistry;
