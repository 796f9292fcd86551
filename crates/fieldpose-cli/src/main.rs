//! `fieldpose-cli` – FieldPose Command Line Interface
//!
//! ```text
//! fieldpose init [--force]              write ~/.fieldpose/config.toml
//! fieldpose show                        print the effective configuration
//! fieldpose replay <log.jsonl> [--heading DEG]
//!                                       run a recorded detection log through
//!                                       the first configured camera
//! fieldpose sim [--ticks N]             closed-loop synthetic run
//! ```
//!
//! `sim` runs until Ctrl-C (or `N` ticks); on Ctrl-C the drivetrain is
//! held with a stop command before exiting.

mod config;
mod replay;
mod sim;

use colored::Colorize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, warn};

use config::Config;

/// A parsed command line.
#[derive(Debug, Clone, PartialEq)]
enum Cli {
    Init { force: bool },
    Show,
    Replay { log: PathBuf, heading_deg: f64 },
    Sim { ticks: Option<u64> },
    Help,
}

fn main() -> ExitCode {
    let _guard = fieldpose_runtime::init_tracing("fieldpose");

    let args: Vec<String> = std::env::args().skip(1).collect();
    let cli = match parse_args(&args) {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            print_usage();
            return ExitCode::from(2);
        }
    };

    let result = match cli {
        Cli::Help => {
            print_usage();
            Ok(())
        }
        Cli::Init { force } => run_init(force),
        Cli::Show => run_show(),
        Cli::Replay { log, heading_deg } => {
            load_or_default().and_then(|cfg| replay::run(&cfg, &log, heading_deg))
        }
        Cli::Sim { ticks } => load_or_default().and_then(|cfg| sim::run(&cfg, ticks)),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "command failed");
            eprintln!("{}: {}", "error".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn parse_args(args: &[String]) -> Result<Cli, String> {
    let Some((command, rest)) = args.split_first() else {
        return Ok(Cli::Help);
    };
    match command.as_str() {
        "init" => match rest {
            [] => Ok(Cli::Init { force: false }),
            [flag] if flag == "--force" => Ok(Cli::Init { force: true }),
            _ => Err(format!("unexpected arguments to init: {}", rest.join(" "))),
        },
        "show" if rest.is_empty() => Ok(Cli::Show),
        "replay" => {
            let (log, flags) = rest
                .split_first()
                .ok_or_else(|| "replay needs a log file".to_string())?;
            let heading_deg = match flags {
                [] => 0.0,
                [flag, value] if flag == "--heading" => value
                    .parse::<f64>()
                    .map_err(|_| format!("--heading expects degrees, got '{value}'"))?,
                _ => return Err(format!("unexpected arguments to replay: {}", flags.join(" "))),
            };
            Ok(Cli::Replay {
                log: PathBuf::from(log),
                heading_deg,
            })
        }
        "sim" => match rest {
            [] => Ok(Cli::Sim { ticks: None }),
            [flag, value] if flag == "--ticks" => value
                .parse::<u64>()
                .map(|n| Cli::Sim { ticks: Some(n) })
                .map_err(|_| format!("--ticks expects a count, got '{value}'")),
            _ => Err(format!("unexpected arguments to sim: {}", rest.join(" "))),
        },
        "help" | "--help" | "-h" => Ok(Cli::Help),
        other => Err(format!("unknown command '{other}'")),
    }
}

/// The stored config, or defaults when none has been written yet.
fn load_or_default() -> Result<Config, String> {
    match config::load()? {
        Some(cfg) => Ok(cfg),
        None => {
            warn!(path = %config::config_path().display(), "no config found; using defaults");
            let mut cfg = Config::default();
            config::apply_env_overrides(&mut cfg);
            cfg.validate().map_err(|e| e.to_string())?;
            Ok(cfg)
        }
    }
}

fn run_init(force: bool) -> Result<(), String> {
    let path = config::config_path();
    if path.exists() && !force {
        println!(
            "  Config already exists at {} (use {} to overwrite)",
            path.display().to_string().bold(),
            "--force".bold()
        );
        return Ok(());
    }
    config::save(&Config::default())?;
    println!(
        "  {} Config saved to {}",
        "✓".green().bold(),
        path.display().to_string().bold()
    );
    Ok(())
}

fn run_show() -> Result<(), String> {
    let path = config::config_path();
    let source = if path.exists() {
        path.display().to_string()
    } else {
        "built-in defaults".to_string()
    };
    let cfg = load_or_default()?;
    println!("# effective configuration ({})", source.dimmed());
    println!("{}", config::render(&cfg)?);
    Ok(())
}

fn print_usage() {
    println!();
    println!("  {} {}", "fieldpose".bold(), format!("v{}", env!("CARGO_PKG_VERSION")).dimmed());
    println!("  Vision pose estimation for field robots");
    println!();
    println!("  {}", "USAGE".bold());
    println!("    fieldpose init [--force]");
    println!("    fieldpose show");
    println!("    fieldpose replay <log.jsonl> [--heading DEG]");
    println!("    fieldpose sim [--ticks N]");
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn no_arguments_prints_help() {
        assert_eq!(parse_args(&[]), Ok(Cli::Help));
    }

    #[test]
    fn parses_init_and_show() {
        assert_eq!(parse_args(&args(&["init"])), Ok(Cli::Init { force: false }));
        assert_eq!(parse_args(&args(&["init", "--force"])), Ok(Cli::Init { force: true }));
        assert_eq!(parse_args(&args(&["show"])), Ok(Cli::Show));
        assert!(parse_args(&args(&["show", "extra"])).is_err());
    }

    #[test]
    fn parses_replay_with_optional_heading() {
        assert_eq!(
            parse_args(&args(&["replay", "match.jsonl"])),
            Ok(Cli::Replay {
                log: PathBuf::from("match.jsonl"),
                heading_deg: 0.0
            })
        );
        assert_eq!(
            parse_args(&args(&["replay", "match.jsonl", "--heading", "-90"])),
            Ok(Cli::Replay {
                log: PathBuf::from("match.jsonl"),
                heading_deg: -90.0
            })
        );
        assert!(parse_args(&args(&["replay"])).is_err());
        assert!(parse_args(&args(&["replay", "a", "--heading", "north"])).is_err());
    }

    #[test]
    fn parses_sim_ticks() {
        assert_eq!(parse_args(&args(&["sim"])), Ok(Cli::Sim { ticks: None }));
        assert_eq!(
            parse_args(&args(&["sim", "--ticks", "250"])),
            Ok(Cli::Sim { ticks: Some(250) })
        );
        assert!(parse_args(&args(&["sim", "--ticks", "-1"])).is_err());
    }

    #[test]
    fn unknown_command_is_an_error() {
        assert!(parse_args(&args(&["fly"])).is_err());
    }
}
