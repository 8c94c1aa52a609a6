pub mod clock;
pub mod config_store;
pub mod key_value_store;

pub use clock::*;
pub use config_store::*;
pub use key_value_store::*;
