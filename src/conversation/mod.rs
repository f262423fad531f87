pub mod commands;
pub mod repl;
pub mod session;
pub mod transcript;
