mod confirm_dialog;
mod header;
mod help_overlay;
mod input_prompt;
mod list_selector;
mod status_bar;

pub use confirm_dialog::ConfirmDialog;
pub use header::Header;
pub use help_overlay::HelpOverlay;
pub use input_prompt::InputPrompt;
pub use list_selector::{ListSelector, ListSelectorExt};
pub use status_bar::{StatusBar, list_nav_hints};
