//! Application layer: the editing workspace, autosave, the run pipeline and
//! file transfer, wired together by [`AppContext`].

pub mod autosave;
pub mod context;
pub mod orchestrator;
pub mod transfer;
pub mod view;
pub mod workspace;

pub use autosave::Autosave;
pub use context::AppContext;
pub use orchestrator::{RunOrchestrator, RunRejection, RunReport};
pub use transfer::{ExportedDocument, ImportOutcome, PROJECT_BACKUP_FILE_NAME, TransferService};
pub use view::{View, ViewState};
pub use workspace::{FlushOrigin, FlushOutcome, Workspace};
