//! Line-oriented control protocol spoken between the director and load generators.
//!
//! Every message is a single `\n`-terminated text line. The director sends
//! [`Command`]s, the load generator answers with [`Reply`] lines.
mod command;
mod io;
mod reply;


pub use command::{Command, StartParams};
pub use io::{
    read_counted_lines, read_line, read_until_terminator, read_valid_line, write_line,
    write_lines,
};
pub use reply::{IntervalResult, Reply};

/// TCP port a load generator listens on unless told otherwise.
pub const DEFAULT_GENERATOR_PORT: u16 = 24226;

/// Line that closes a request script block.
pub const SCRIPT_TERMINATOR: &str = "tools.descartes.dlin.httploadgenerator.signal.luascriptterm";

pub(crate) const ACK: &str = "ok";
pub(crate) const DONE: &str = "done";
pub(crate) const ERROR_PREFIX: &str = "Error:";
