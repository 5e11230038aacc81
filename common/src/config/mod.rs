mod file;

pub use file::{load_config, update_config, HeraldConfig};
