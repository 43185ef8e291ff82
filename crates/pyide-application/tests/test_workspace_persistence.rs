mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use common::{files, open_context};
use pyide_application::{
    AppContext, FlushOrigin, FlushOutcome, ImportOutcome, PROJECT_BACKUP_FILE_NAME, Workspace,
};
use pyide_core::console::ConsoleKind;
use pyide_core::error::Result;
use pyide_core::project::{Project, ProjectFiles, ProjectSnapshot, ProjectStore};
use pyide_core::prompt::FixedPrompter;
use pyide_infrastructure::JsonFileProjectStore;
use tempfile::TempDir;
use tokio::sync::Notify;

/// Store whose first save blocks until released.
#[derive(Default)]
struct GatedStore {
    saved: Mutex<Vec<ProjectFiles>>,
    entered: Notify,
    release: Notify,
}

#[async_trait]
impl ProjectStore for GatedStore {
    async fn load(&self) -> Project {
        Project::default()
    }

    async fn save(&self, snapshot: &ProjectSnapshot) -> Result<()> {
        let first = self.saved.lock().unwrap().is_empty();
        if first {
            self.entered.notify_one();
            self.release.notified().await;
        }
        self.saved.lock().unwrap().push(snapshot.files().clone());
        Ok(())
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_explicit_flush_wins_over_slow_periodic_flush() {
    let store = Arc::new(GatedStore::default());
    let workspace = Arc::new(Workspace::open(store.clone()).await);

    workspace.edit("print('old')").await;
    let periodic = {
        let workspace = workspace.clone();
        tokio::spawn(async move { workspace.flush(FlushOrigin::Periodic).await })
    };
    store.entered.notified().await;

    workspace.edit("print('new')").await;
    let explicit = {
        let workspace = workspace.clone();
        tokio::spawn(async move { workspace.flush(FlushOrigin::Explicit).await })
    };
    // Give the explicit flush time to queue behind the blocked write.
    tokio::time::sleep(Duration::from_millis(50)).await;
    store.release.notify_one();

    assert!(matches!(
        periodic.await.unwrap().unwrap(),
        FlushOutcome::Written { generation: 1 }
    ));
    assert!(matches!(
        explicit.await.unwrap().unwrap(),
        FlushOutcome::Written { generation: 2 }
    ));

    let saved = store.saved.lock().unwrap().clone();
    assert_eq!(saved.len(), 2);
    assert_eq!(saved.last().unwrap()["main.py"], "print('new')");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_queued_flush_never_writes_stale_content() {
    let store = Arc::new(GatedStore::default());
    let workspace = Arc::new(Workspace::open(store.clone()).await);

    workspace.edit("v1").await;
    let blocked = {
        let workspace = workspace.clone();
        tokio::spawn(async move { workspace.flush(FlushOrigin::Explicit).await })
    };
    store.entered.notified().await;

    // A periodic flush starts while "v2" is current, then waits for its turn.
    workspace.edit("v2").await;
    let periodic = {
        let workspace = workspace.clone();
        tokio::spawn(async move { workspace.flush(FlushOrigin::Periodic).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    workspace.edit("v3").await;
    let explicit = {
        let workspace = workspace.clone();
        tokio::spawn(async move { workspace.flush(FlushOrigin::Explicit).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    store.release.notify_one();

    assert_eq!(
        blocked.await.unwrap().unwrap(),
        FlushOutcome::Written { generation: 1 }
    );
    assert_eq!(
        periodic.await.unwrap().unwrap(),
        FlushOutcome::Written { generation: 2 }
    );
    assert_eq!(
        explicit.await.unwrap().unwrap(),
        FlushOutcome::Written { generation: 3 }
    );

    let saved: Vec<_> = store
        .saved
        .lock()
        .unwrap()
        .iter()
        .map(|files| files["main.py"].clone())
        .collect();
    assert_eq!(saved, vec!["v1", "v3", "v3"]);
}

#[tokio::test]
async fn test_edits_survive_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("project.json");

    {
        let store = Arc::new(JsonFileProjectStore::with_path(path.clone()));
        let context = AppContext::open(store).await;
        context.workspace.create_file("util.py").await.unwrap();
        context.workspace.edit("x = 1").await;
        context.shutdown().await.unwrap();
    }

    let store = Arc::new(JsonFileProjectStore::with_path(path));
    let context = AppContext::open(store).await;
    assert_eq!(context.workspace.file_names().await, vec!["main.py", "util.py"]);
    assert_eq!(context.workspace.content("util.py").await.as_deref(), Some("x = 1"));
    // The active file is not persisted.
    assert_eq!(context.workspace.active_file().await, "main.py");
}

#[tokio::test(start_paused = true)]
async fn test_autosave_persists_without_explicit_flush() {
    let (context, store) = open_context(files(&[("main.py", "print(1)")])).await;
    context.start_autosave(Duration::from_millis(1500)).await;

    context.workspace.edit("print(2)").await;
    tokio::time::sleep(Duration::from_millis(1600)).await;
    assert_eq!(store.stored().await.unwrap()["main.py"], "print(2)");

    context.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_import_new_file() {
    let (context, store) = open_context(files(&[("main.py", "print(1)")])).await;

    let outcome = context
        .transfer
        .import_file("data.csv", "a,b\n1,2", &FixedPrompter::always_no())
        .await
        .unwrap();

    assert_eq!(
        outcome,
        ImportOutcome::Imported {
            name: "data.csv".to_string(),
            replaced: false,
        }
    );
    assert_eq!(context.workspace.active_file().await, "data.csv");
    assert_eq!(store.stored().await.unwrap()["data.csv"], "a,b\n1,2");
    let last = context.console.entries().pop().unwrap();
    assert_eq!((last.kind, last.text.as_str()), (ConsoleKind::System, ">> Imported data.csv"));
}

#[tokio::test]
async fn test_import_collision_needs_confirmation() {
    let (context, store) = open_context(files(&[("main.py", "print(1)"), ("util.py", "x = 1")])).await;
    context.open_file("util.py").await.unwrap();
    let saves_before = store.save_count();

    let declined = context
        .transfer
        .import_file("main.py", "print('imported')", &FixedPrompter::always_no())
        .await
        .unwrap();
    assert_eq!(declined, ImportOutcome::Cancelled);
    assert_eq!(context.workspace.content("main.py").await.as_deref(), Some("print(1)"));
    assert_eq!(context.workspace.active_file().await, "util.py");
    assert_eq!(store.save_count(), saves_before);
    assert!(context.console.is_empty());

    let accepted = context
        .transfer
        .import_file("main.py", "print('imported')", &FixedPrompter::always_yes())
        .await
        .unwrap();
    assert!(matches!(accepted, ImportOutcome::Imported { replaced: true, .. }));
    assert_eq!(
        context.workspace.content("main.py").await.as_deref(),
        Some("print('imported')")
    );
    assert_eq!(context.workspace.active_file().await, "main.py");
    assert_eq!(store.stored().await.unwrap()["main.py"], "print('imported')");
}

#[tokio::test]
async fn test_import_rejects_bad_names() {
    let (context, _) = open_context(files(&[("main.py", "")])).await;
    let err = context
        .transfer
        .import_file("   ", "x", &FixedPrompter::always_yes())
        .await
        .unwrap_err();
    assert!(err.is_rejected_name());
}

#[tokio::test]
async fn test_export_active_file_includes_pending_edits() {
    let (context, _) = open_context(files(&[("main.py", "print(1)")])).await;
    context.workspace.edit("print(3)").await;

    let document = context.transfer.export_active_file().await.unwrap();
    assert_eq!(document.file_name, "main.py");
    assert_eq!(document.mime_type, "text/plain");
    assert_eq!(document.content, "print(3)");
    assert_eq!(context.console.entries().pop().unwrap().text, ">> Downloaded main.py");
}

#[tokio::test]
async fn test_export_project_backup() {
    let (context, _) = open_context(files(&[("main.py", "print(1)"), ("util.py", "x = 1")])).await;

    let document = context.transfer.export_project().await.unwrap();
    assert_eq!(document.file_name, PROJECT_BACKUP_FILE_NAME);

    let parsed: ProjectFiles = serde_json::from_str(&document.content).unwrap();
    assert_eq!(parsed, files(&[("main.py", "print(1)"), ("util.py", "x = 1")]));
    assert!(document.content.contains("\n  \"main.py\""));
}
