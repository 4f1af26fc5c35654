//! Command-line definition.

use clap::{value_parser, Arg, ArgAction, Command};

/// Build the `gold-trace` command tree.
pub fn build_cli() -> Command {
    Command::new("gold-trace")
        .about("Bootstrap and exercise a Gold trace store")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .global(true)
                .value_name("FILE")
                .help("TOML configuration file"),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Print JSON instead of text"),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .global(true)
                .action(ArgAction::Count)
                .help("More logging (-v debug, -vv trace); RUST_LOG overrides"),
        )
        .subcommand(
            Command::new("init").about("Create the table and column families, then print the effective configuration"),
        )
        .subcommand(
            Command::new("simulate")
                .about("Ingest synthetic data into an in-memory store and summarize the dense tile")
                .arg(
                    Arg::new("commits")
                        .long("commits")
                        .value_parser(value_parser!(usize))
                        .default_value("600")
                        .help("Commits in the synthetic history"),
                )
                .arg(
                    Arg::new("traces")
                        .long("traces")
                        .value_parser(value_parser!(usize))
                        .default_value("40")
                        .help("Distinct traces"),
                )
                .arg(
                    Arg::new("empty-every")
                        .long("empty-every")
                        .value_parser(value_parser!(usize))
                        .default_value("3")
                        .help("Every Nth commit produces no data (0: none)"),
                )
                .arg(
                    Arg::new("seed")
                        .long("seed")
                        .value_parser(value_parser!(u64))
                        .default_value("1")
                        .help("Random seed"),
                )
                .arg(
                    Arg::new("n-commits")
                        .long("n-commits")
                        .value_parser(value_parser!(usize))
                        .help("Commits with data per served tile (overrides the configuration)"),
                )
                .arg(
                    Arg::new("ignore")
                        .long("ignore")
                        .value_name("KEY=VALUE")
                        .action(ArgAction::Append)
                        .help("Ignore traces with this param (repeatable)"),
                )
                .arg(
                    Arg::new("dump")
                        .long("dump")
                        .action(ArgAction::SetTrue)
                        .help("Print every trace of the dense tile"),
                ),
        )
}
