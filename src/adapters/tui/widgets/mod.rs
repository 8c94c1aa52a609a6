pub mod search_bar;
pub mod task_dialog;
pub mod text_input;

pub use search_bar::*;
pub use task_dialog::*;
pub use text_input::*;
