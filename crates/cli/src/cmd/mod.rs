mod build;
mod status;

pub use build::{BuildOptions, cmd_build};
pub use status::cmd_status;
