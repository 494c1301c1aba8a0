pub mod cli;
pub mod config;
pub mod console;
pub mod node_env;
pub mod process_monitor;
pub mod signal;
pub mod supervisor;
pub mod utils;
