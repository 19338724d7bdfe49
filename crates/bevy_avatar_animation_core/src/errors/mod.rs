mod config_error;
mod issue;

pub use config_error::*;
pub use issue::*;
