//! EphemFS Test & Validation Infrastructure
//!
//! Provides an in-memory backend adapter with failure injection plus
//! end-to-end lifecycle tests: save through the validation gate, sweep via
//! GC, and drive the whole thing from the periodic scheduler.

pub mod harness;
pub mod lifecycle;

pub use harness::MemoryMetaStore;
