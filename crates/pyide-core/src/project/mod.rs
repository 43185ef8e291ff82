//! Project domain module.
//!
//! # Module Structure
//!
//! - `model`: The project model (`Project`), its snapshots and file-name rules
//! - `repository`: Store trait for project persistence

mod model;
mod repository;

pub use model::{
    DEFAULT_FILE_CONTENT, DEFAULT_FILE_NAME, NEW_FILE_PLACEHOLDER, Project, ProjectFiles,
    ProjectSnapshot, validate_file_name,
};
pub use repository::ProjectStore;
