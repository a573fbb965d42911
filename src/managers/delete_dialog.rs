//! Delete confirmation dialog state.

/// What the dialog is currently showing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DialogState {
    #[default]
    Closed,
    Open { target_id: String, title: String },
}

/// Confirmation step guarding a destructive delete.
///
/// Holds nothing beyond the target supplied by the parent view.
#[derive(Debug, Clone, Default)]
pub struct DeleteDialog {
    state: DialogState,
}

impl DeleteDialog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens the dialog for one record, replacing any previous target.
    pub fn open(&mut self, target_id: impl Into<String>, title: impl Into<String>) {
        self.state = DialogState::Open {
            target_id: target_id.into(),
            title: title.into(),
        };
    }

    /// Closes the dialog and returns the id to delete; `None` when closed.
    pub fn confirm(&mut self) -> Option<String> {
        match std::mem::take(&mut self.state) {
            DialogState::Open { target_id, .. } => Some(target_id),
            DialogState::Closed => None,
        }
    }

    /// Closes without side effect. Covers the cancel button and backdrop dismiss.
    pub fn cancel(&mut self) {
        self.state = DialogState::Closed;
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, DialogState::Open { .. })
    }

    pub fn state(&self) -> &DialogState {
        &self.state
    }

    /// Prompt text shown while open.
    pub fn prompt(&self) -> Option<String> {
        match &self.state {
            DialogState::Open { title, .. } => Some(format!(
                "Are you sure you want to delete \"{}\"? This action cannot be undone.",
                title
            )),
            DialogState::Closed => None,
        }
    }
}
