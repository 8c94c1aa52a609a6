pub mod error;
pub mod task_repository;
pub mod theme_store;

pub use error::*;
pub use task_repository::*;
pub use theme_store::*;
