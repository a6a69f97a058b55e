//! CLI argument types and parsing helpers.
mod cli;
mod defaults;
pub(crate) mod parsers;
mod types;


pub use cli::{Cli, Command, DirectorArgs, LoadGeneratorArgs};
pub use parsers::{parse_address, socket_address};
pub use types::PositiveUsize;

pub(crate) use defaults::DEFAULT_CONFIG_FILES;
