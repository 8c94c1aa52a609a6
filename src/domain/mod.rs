pub mod color;
pub mod error;
pub mod task;
pub mod theme;

pub use color::*;
pub use error::*;
pub use task::*;
pub use theme::*;
