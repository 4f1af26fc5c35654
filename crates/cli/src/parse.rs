//! ArgMatches → CliAction conversion.

use clap::ArgMatches;

/// What the user asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliAction {
    /// Bootstrap and print the configuration.
    Init,
    /// Run the ingestion simulator.
    Simulate(SimulateArgs),
}

/// Simulator parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulateArgs {
    pub commits: usize,
    pub traces: usize,
    pub empty_every: usize,
    pub seed: u64,
    pub n_commits: Option<usize>,
    pub ignore: Vec<(String, String)>,
    pub dump: bool,
}

/// Translate parsed arguments into an action.
pub fn matches_to_action(matches: &ArgMatches) -> Result<CliAction, String> {
    match matches.subcommand() {
        Some(("init", _)) => Ok(CliAction::Init),
        Some(("simulate", sub)) => {
            let ignore = sub
                .get_many::<String>("ignore")
                .into_iter()
                .flatten()
                .map(|s| parse_key_value(s))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(CliAction::Simulate(SimulateArgs {
                commits: *sub.get_one::<usize>("commits").unwrap_or(&600),
                traces: *sub.get_one::<usize>("traces").unwrap_or(&40),
                empty_every: *sub.get_one::<usize>("empty-every").unwrap_or(&3),
                seed: *sub.get_one::<u64>("seed").unwrap_or(&1),
                n_commits: sub.get_one::<usize>("n-commits").copied(),
                ignore,
                dump: sub.get_flag("dump"),
            }))
        }
        Some((other, _)) => Err(format!("unknown command '{}'", other)),
        None => Err("no command given".to_string()),
    }
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((k, v)) if !k.is_empty() => Ok((k.to_string(), v.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{}'", s)),
    }
}
