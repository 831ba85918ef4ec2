//! Domain models for the labtrend system.

mod biomarker;
mod candidate;
mod report;

pub use biomarker::*;
pub use candidate::*;
pub use report::*;
