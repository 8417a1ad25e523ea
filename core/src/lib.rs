pub mod cli;
pub mod config;
pub mod demos;
pub mod engine;
pub mod init;

// Re-export main types
pub use engine::*;

// Re-export init API for convenience
pub use init::{initialize, InitBuilder, InitOptions};
