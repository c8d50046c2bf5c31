pub mod cli;
pub mod commands;
pub mod config;
pub mod executor;
pub mod ssh;
pub mod target;
pub mod ui;
pub mod utils;

pub use cli::Cli;
pub use config::{Action, Credential, RunConfig};
pub use executor::{ExecutionResult, FanoutExecutor, Outcome};
pub use target::Target;
