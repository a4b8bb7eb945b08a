// Library crate for integration tests.
// main.rs has its own mod declarations; this re-exports all modules.

pub mod classify;
pub mod config;
pub mod error;
pub mod model;
pub mod recorder;
pub mod report;
pub mod transport;
pub mod verifier;
