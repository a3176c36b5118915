//! CLI argument parsing and subcommand dispatch.

use spot_core::Config;

use crate::startup;

/// What `main` should do after dispatch.
#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    Serve,
    Done,
}

/// Parse CLI arguments and run any one-shot subcommand.
///
/// A trailing path after `serve` or `check` overrides `RULES_PATH`.
pub fn dispatch(config: &mut Config, args: &[String]) -> anyhow::Result<Command> {
    if let Some(path) = args.get(2) {
        config.alarm.rules_path = path.into();
    }
    match args.get(1).map(|s| s.as_str()) {
        None | Some("serve") => Ok(Command::Serve),
        Some("check") => {
            startup::check_rules(config)?;
            Ok(Command::Done)
        }
        Some("profiles") => {
            for profile in Config::available_profiles() {
                println!("{profile}");
            }
            Ok(Command::Done)
        }
        _ => {
            print_usage();
            Ok(Command::Done)
        }
    }
}

fn print_usage() {
    println!("spot-server v{}", env!("CARGO_PKG_VERSION"));
    println!("Usage: spot-server <command>");
    println!("  serve [rules_path]   Start the alarm scheduler and HTTP server (default)");
    println!("  check [rules_path]   Load and validate rules, then exit");
    println!("  profiles             List config profiles found in the environment");
}
