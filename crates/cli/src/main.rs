//! gold-trace: bootstrap and exercise a Gold trace store.
//!
//! ```text
//! gold-trace init                      # create the table, print the configuration
//! gold-trace --config gold.toml init
//! gold-trace simulate --commits 600 --ignore os=mac --dump
//! gold-trace --json simulate
//! ```

mod commands;
mod format;
mod parse;
mod simulate;

use commands::build_cli;
use format::{format_init, format_simulation, OutputMode};
use goldtrace::{Gold, GoldConfig};
use parse::{matches_to_action, CliAction};
use std::process;
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true)
        .with_writer(std::io::stderr)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn load_config(path: Option<&String>) -> goldtrace::Result<GoldConfig> {
    match path {
        Some(path) => GoldConfig::from_toml_file(path),
        None => Ok(GoldConfig::default()),
    }
}

fn execute(action: CliAction, config: GoldConfig, mode: OutputMode) -> Result<String, String> {
    match action {
        CliAction::Init => {
            let gold = Gold::builder().config(config).build().map_err(|e| e.to_string())?;
            format_init(gold.config(), mode)
        }
        CliAction::Simulate(args) => {
            let report = simulate::run(config, &args).map_err(|e| e.to_string())?;
            Ok(format_simulation(&report, mode))
        }
    }
}

fn main() {
    let matches = build_cli().get_matches();
    init_tracing(matches.get_count("verbose"));

    let mode = if matches.get_flag("json") {
        OutputMode::Json
    } else {
        OutputMode::Human
    };

    let action = match matches_to_action(&matches) {
        Ok(action) => action,
        Err(e) => {
            eprintln!("(error) {}", e);
            process::exit(2);
        }
    };

    let config = match load_config(matches.get_one::<String>("config")) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("(error) {}", e);
            process::exit(2);
        }
    };

    match execute(action, config, mode) {
        Ok(output) => {
            print!("{}", output);
            if !output.ends_with('\n') {
                println!();
            }
        }
        Err(e) => {
            eprintln!("(error) {}", e);
            process::exit(1);
        }
    }
}
