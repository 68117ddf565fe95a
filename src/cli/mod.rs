mod commands;

pub use commands::{AccountCommands, Cli, Commands, TokenCommands};
