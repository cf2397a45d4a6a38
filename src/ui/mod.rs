//! Terminal dashboard over the inbound and outbound queues

pub mod layout;
pub mod renderer;
pub mod terminal;

pub use terminal::{run_ui, Dashboard, UiState};
