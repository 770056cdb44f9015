pub mod config;
pub mod process;
pub mod status;

pub use process::run_process;
pub use status::show_status;
