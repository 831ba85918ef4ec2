//! Report ingestion for labtrend.
//!
//! This crate turns files into page texts and runs the core pipeline over
//! many of them at once. The `labtrend` binary is a thin CLI on top.

pub mod batch;
pub mod source;

pub use batch::*;
pub use source::*;
