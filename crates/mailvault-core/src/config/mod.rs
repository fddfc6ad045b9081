//! Configuration loading

mod loader;

pub use loader::{ConfigLoader, CONFIG_FILE_NAME};
