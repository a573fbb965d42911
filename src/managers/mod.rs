// ReMarkable state managers
// Managers hold per-view state: session, bookmark list, add form, delete dialog.

pub mod bookmark_form;
pub mod bookmark_list;
pub mod delete_dialog;
pub mod session_manager;
