use std::sync::Arc;

use clap::{ArgMatches, CommandFactory, FromArgMatches};
use tracing::info;

use crate::args::{Cli, Command, DirectorArgs};
use crate::director::{DirectorSettings, run_director};
use crate::error::AppResult;
use crate::generator::{ReqwestTransportFactory, run_load_generator};

/// Parses the command line and runs the selected role to completion.
///
/// # Errors
///
/// Returns an error when the arguments, config file or the run itself fail.
pub fn run() -> AppResult<()> {
    let matches = Cli::command().get_matches();
    let cli = Cli::from_arg_matches(&matches)?;

    crate::logger::init_logging(cli.verbose);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(run_async(cli.command, &matches))
}

async fn run_async(command: Command, matches: &ArgMatches) -> AppResult<()> {
    match command {
        Command::Director(args) => {
            let director_matches = matches.subcommand_matches("director").unwrap_or(matches);
            let settings = director_settings(args, director_matches)?;
            let run_log = run_director(&settings).await?;
            info!("Run log written to {}", run_log.display());
            Ok(())
        }
        Command::LoadGenerator(args) => {
            run_load_generator(&args.listen, args.once, Arc::new(ReqwestTransportFactory)).await
        }
    }
}

fn director_settings(mut args: DirectorArgs, matches: &ArgMatches) -> AppResult<DirectorSettings> {
    if let Some(config) = crate::config::load_config(args.config.as_deref())? {
        crate::config::apply_config(&mut args, matches, &config)?;
    }
    Ok(DirectorSettings::from(args))
}
