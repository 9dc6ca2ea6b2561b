pub mod cli;
pub mod dedup;
pub mod http;
pub mod load_config;
pub mod logging;
pub mod notify;
pub mod storage;
pub mod tracking;
pub mod warehouse;

pub use cli::{run, Cli, Commands};
