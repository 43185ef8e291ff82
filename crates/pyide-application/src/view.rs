//! Which pane the user is looking at.

use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum View {
    #[default]
    Editor,
    Console,
}

/// Current view, observable by front-ends.
pub struct ViewState {
    tx: watch::Sender<View>,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            tx: watch::Sender::new(View::Editor),
        }
    }
}

impl ViewState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> View {
        *self.tx.borrow()
    }

    pub fn set(&self, view: View) {
        self.tx.send_replace(view);
    }

    pub fn subscribe(&self) -> watch::Receiver<View> {
        self.tx.subscribe()
    }
}
