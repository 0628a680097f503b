pub mod cli;
pub mod config;
pub mod gemini;
pub mod repl;
