//! CLI subcommand implementations.

pub mod export;
pub mod import;
pub mod log;
pub mod report;
pub mod reset;
pub mod settings;
pub mod status;
pub mod sync;
pub mod task;
pub mod timer;
pub mod util;
pub mod watch;
