// Profile completeness: weighted scoring over the profile record plus the
// backend client the record is fetched from.

pub mod backend;
pub mod completeness;
pub mod handlers;
pub mod models;
pub mod strategies;
pub mod weights;

pub use weights::SectionWeightConfig;
