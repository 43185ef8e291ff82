//! User prompts as an injected collaborator.
//!
//! Workspace operations that need a decision from the user (overwrite on
//! import, deletion, naming a new file) ask through a [`Prompter`] instead of
//! opening dialogs themselves.

/// Request/response interface to the user.
pub trait Prompter: Send + Sync {
    /// Asks a yes/no question.
    fn request_confirmation(&self, question: &str) -> bool;

    /// Asks for a name. `None` means the user cancelled.
    fn request_name(&self, prompt: &str) -> Option<String>;
}

/// Prompter with fixed answers, for non-interactive use.
#[derive(Debug, Clone, Default)]
pub struct FixedPrompter {
    pub confirm: bool,
    pub name: Option<String>,
}

impl FixedPrompter {
    /// Answers yes to every question.
    pub fn always_yes() -> Self {
        Self {
            confirm: true,
            name: None,
        }
    }

    /// Answers no to every question and cancels every name request.
    pub fn always_no() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

impl Prompter for FixedPrompter {
    fn request_confirmation(&self, _question: &str) -> bool {
        self.confirm
    }

    fn request_name(&self, _prompt: &str) -> Option<String> {
        self.name.clone()
    }
}
