// CLI module
// Public interface for command-line interface

mod args;
mod commands;
mod render;
mod repl;
mod run;
mod session;
mod spinner;

pub use args::{Cli, Mode};
pub use commands::{format_help, Command, ParseError};
pub use render::{diff_lines, DiffLine};
pub use repl::Repl;
pub use run::{run, EXIT_FAILURE, EXIT_INTERRUPTED, EXIT_OK};
pub use session::{console_observer, Session};
pub use spinner::Spinner;
