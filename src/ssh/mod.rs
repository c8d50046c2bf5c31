pub mod client;
pub mod error;

pub use client::{Client, CommandOutput, OutputChunk};
pub use error::Error;
