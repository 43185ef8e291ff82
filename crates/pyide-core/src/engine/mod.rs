//! Engine domain module.
//!
//! - `state`: Engine lifecycle states (`EngineState`)
//! - `backend`: The execution boundary (`ExecutionBackend`) and its output types

mod backend;
mod state;

pub use backend::{
    ExecutionBackend, ExecutionOutcome, ExecutionRequest, OutputChunk, OutputSender,
    OutputStream,
};
pub use state::EngineState;
