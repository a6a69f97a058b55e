use clap::{ArgMatches, CommandFactory, FromArgMatches};
use tempfile::tempdir;

use super::{apply_config, load_config, load_config_file, types::ConfigFile};
use crate::args::{Cli, Command, DirectorArgs};
use crate::telemetry::TelemetryKind;

fn director_matches(args: &[&str]) -> Result<(DirectorArgs, ArgMatches), String> {
    let matches = Cli::command()
        .try_get_matches_from(args)
        .map_err(|err| err.to_string())?;
    let cli = Cli::from_arg_matches(&matches).map_err(|err| err.to_string())?;
    let director = match cli.command {
        Command::Director(director) => director,
        Command::LoadGenerator(_) => return Err("Expected director subcommand".to_owned()),
    };
    let sub_matches = matches
        .subcommand_matches("director")
        .cloned()
        .ok_or_else(|| "Missing director matches".to_owned())?;
    Ok((director, sub_matches))
}

#[test]
fn parse_toml_config() -> Result<(), String> {
    let dir = tempdir().map_err(|err| format!("tempdir failed: {}", err))?;
    let path = dir.path().join("loadpace.toml");
    let content = r#"
arrivals = "profiles/spike.csv"
generators = ["10.0.0.1", "10.0.0.2:25000"]
threads = 32
warmup_rate = 15.0
power = ["10.0.0.9"]
power_collector = "hioki"
"#;
    std::fs::write(&path, content).map_err(|err| format!("write failed: {}", err))?;

    let config = load_config_file(&path)?;
    if config.arrivals.as_deref() != Some("profiles/spike.csv") {
        return Err(format!("Unexpected arrivals: {:?}", config.arrivals));
    }
    if config.generators.as_deref().map(<[String]>::len) != Some(2) {
        return Err(format!("Unexpected generators: {:?}", config.generators));
    }
    if config.threads != Some(32) || config.power_collector != Some(TelemetryKind::Hioki) {
        return Err(format!("Unexpected config: {:?}", config));
    }
    Ok(())
}

#[test]
fn parse_json_config() -> Result<(), String> {
    let dir = tempdir().map_err(|err| format!("tempdir failed: {}", err))?;
    let path = dir.path().join("loadpace.json");
    let content = r#"{"outfile": "run.csv", "seed": -1, "randomize_users": true, "power_collector": "tmctld"}"#;
    std::fs::write(&path, content).map_err(|err| format!("write failed: {}", err))?;

    let path_str = path.to_str().ok_or_else(|| "Non UTF-8 path".to_owned())?;
    let config = load_config(Some(path_str))?.ok_or_else(|| "Expected config".to_owned())?;
    if config.outfile.as_deref() != Some("run.csv") || config.seed != Some(-1) {
        return Err(format!("Unexpected config: {:?}", config));
    }
    if config.randomize_users != Some(true) || config.power_collector != Some(TelemetryKind::Tmctld)
    {
        return Err(format!("Unexpected config: {:?}", config));
    }
    Ok(())
}

#[test]
fn unknown_keys_and_extensions_are_rejected() -> Result<(), String> {
    let dir = tempdir().map_err(|err| format!("tempdir failed: {}", err))?;
    let unknown = dir.path().join("bad.toml");
    std::fs::write(&unknown, "arrival_rates = \"x.csv\"\n")
        .map_err(|err| format!("write failed: {}", err))?;
    if load_config_file(&unknown).is_ok() {
        return Err("Expected unknown key error".to_owned());
    }

    let yaml = dir.path().join("loadpace.yaml");
    std::fs::write(&yaml, "seed: 1\n").map_err(|err| format!("write failed: {}", err))?;
    if load_config_file(&yaml).is_ok() {
        return Err("Expected extension error".to_owned());
    }
    Ok(())
}

#[test]
fn config_fills_unset_options() -> Result<(), String> {
    let (mut args, matches) = director_matches(&["loadpace", "director"])?;
    let config = ConfigFile {
        outfile: Some("config_log.csv".to_owned()),
        generators: Some(vec!["gen-a".to_owned(), "gen-b".to_owned()]),
        threads: Some(16),
        timeout: Some(250),
        warmup_duration: Some(12),
        power_collector: Some(TelemetryKind::Hioki),
        ..ConfigFile::default()
    };

    apply_config(&mut args, &matches, &config)?;

    if args.outfile != "config_log.csv" || args.generators != ["gen-a", "gen-b"] {
        return Err(format!("Unexpected args: {:?}", args));
    }
    if args.threads.get() != 16 || args.timeout != 250 || args.warmup_duration != 12 {
        return Err(format!("Unexpected args: {:?}", args));
    }
    if args.power_collector != Some(TelemetryKind::Hioki) {
        return Err("Expected power collector from config".to_owned());
    }
    if args.seed != 5 {
        return Err("Seed should keep its default".to_owned());
    }
    Ok(())
}

#[test]
fn cli_values_win_over_config() -> Result<(), String> {
    let (mut args, matches) =
        director_matches(&["loadpace", "director", "-o", "cli.csv", "--threads", "8"])?;
    let config = ConfigFile {
        outfile: Some("config.csv".to_owned()),
        threads: Some(64),
        seed: Some(9),
        ..ConfigFile::default()
    };

    apply_config(&mut args, &matches, &config)?;

    if args.outfile != "cli.csv" || args.threads.get() != 8 {
        return Err(format!("CLI values overridden: {:?}", args));
    }
    if args.seed != 9 {
        return Err(format!("Expected seed from config, got {}", args.seed));
    }
    Ok(())
}

#[test]
fn zero_threads_in_config_fail() -> Result<(), String> {
    let (mut args, matches) = director_matches(&["loadpace", "director"])?;
    let config = ConfigFile {
        threads: Some(0),
        ..ConfigFile::default()
    };
    match apply_config(&mut args, &matches, &config) {
        Ok(()) => Err("Expected threads validation error".to_owned()),
        Err(err) => {
            if err.to_string().contains("threads") {
                Ok(())
            } else {
                Err(format!("Unexpected error: {}", err))
            }
        }
    }
}
