//! Execution layer: the engine handle and the subprocess interpreter backend.

pub mod handle;
pub mod process_backend;

pub use handle::EngineHandle;
pub use process_backend::ProcessBackend;
