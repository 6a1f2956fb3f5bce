//! Terminal front end.

pub mod command;
pub mod render;
pub mod terminal;

pub use command::{Command, CommandError};
pub use terminal::{Flow, execute, run_loop, run_terminal};
