//! Domain layer for pyide.
//!
//! Holds the project model, the console sink, the engine boundary and the
//! traits the other layers implement. Nothing here touches the filesystem or
//! spawns processes.

pub mod config;
pub mod console;
pub mod engine;
pub mod error;
pub mod project;
pub mod prompt;

// Re-export common error type
pub use error::PyideError;
