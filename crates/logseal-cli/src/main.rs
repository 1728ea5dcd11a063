#![forbid(unsafe_code)]

mod cmd;
mod hasher;
mod output;
mod signature;

use clap::{Parser, Subcommand};
use logseal_core::LookupStrategy;
use logseal_core::config::{ConfigSource, resolve_config};
use output::{CliError, OutputMode, render_error};
use std::env;
use std::process::ExitCode;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "logseal: tamper-evident signatures for append-only logs",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Node lookup strategy: indexed (more memory) or search (more CPU).
    #[arg(long, global = true)]
    lookup: Option<LookupStrategy>,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    const fn output_mode(&self) -> OutputMode {
        OutputMode::from_json_flag(self.json)
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        about = "Sign a log file",
        long_about = "Hash every line of a log file and write the root digest, line count, and algorithm to a signature file.",
        after_help = "EXAMPLES:\n    # Sign a static file\n    logseal sign app.log\n\n    # Sign a log that will keep growing\n    logseal sign app.log app.sig --allow-append"
    )]
    Sign(cmd::sign::SignArgs),

    #[command(
        about = "Verify a log file against its signature",
        long_about = "Re-hash a log file and check it against a signature. Append-only signatures accept new lines after the signed prefix.",
        after_help = "EXAMPLES:\n    # Verify with the default <file>.sig\n    logseal verify app.log\n\n    # Machine-readable result\n    logseal verify app.log app.sig --json"
    )]
    Verify(cmd::verify::VerifyArgs),

    #[command(
        about = "Extract the hash chain of one event",
        after_help = "EXAMPLES:\n    logseal chain app.log \"2024-01-01 user=alice login\" --out alice.chain.json"
    )]
    Chain(cmd::chain::ChainArgs),

    #[command(
        about = "Check a saved hash chain",
        after_help = "EXAMPLES:\n    logseal check-chain alice.chain.json --signature app.log.sig"
    )]
    CheckChain(cmd::chain::CheckChainArgs),

    #[command(
        about = "Draw the hash tree of a log file",
        after_help = "EXAMPLES:\n    logseal show app.log --width 6"
    )]
    Show(cmd::show::ShowArgs),
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("LOGSEAL_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if env::var("DEBUG").is_ok() {
            "logseal=debug,info"
        } else {
            "logseal=info,warn"
        })
    });

    let format = env::var("LOGSEAL_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let project_root = env::current_dir()?;
    let effective = resolve_config(&project_root)?;
    match &effective.source {
        ConfigSource::Project(path) | ConfigSource::User(path) => {
            debug!(path = %path.display(), "loaded config");
        }
        ConfigSource::Defaults => debug!("using default config"),
    }

    let mut config = effective.config;
    if let Some(lookup) = cli.lookup {
        config.tree.lookup = lookup;
    }

    let output = cli.output_mode();
    match &cli.command {
        Commands::Sign(args) => cmd::sign::run_sign(args, output, &config),
        Commands::Verify(args) => cmd::verify::run_verify(args, output, &config),
        Commands::Chain(args) => cmd::chain::run_chain(args, output, &config),
        Commands::CheckChain(args) => cmd::chain::run_check_chain(args, output),
        Commands::Show(args) => cmd::show::run_show(args, output, &config),
    }
}

fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();
    if cli.verbose {
        info!("Verbose mode enabled");
    }

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if render_error(cli.output_mode(), &CliError::from(&err)).is_err() {
                eprintln!("error: {err:#}");
            }
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn json_flag_parses_after_subcommand() {
        let cli = Cli::parse_from(["logseal", "verify", "app.log", "--json"]);
        assert!(cli.json);
        assert_eq!(cli.output_mode(), OutputMode::Json);
    }

    #[test]
    fn default_output_is_human() {
        let cli = Cli::parse_from(["logseal", "show", "app.log"]);
        assert_eq!(cli.output_mode(), OutputMode::Human);
        assert!(cli.lookup.is_none());
    }

    #[test]
    fn sign_parses_options() {
        let cli = Cli::parse_from([
            "logseal",
            "sign",
            "app.log",
            "app.sig",
            "-a",
            "MD5",
            "--allow-append",
        ]);
        let Commands::Sign(args) = cli.command else {
            panic!("expected sign");
        };
        assert_eq!(args.file, PathBuf::from("app.log"));
        assert_eq!(args.signature, Some(PathBuf::from("app.sig")));
        assert_eq!(args.algorithm.as_deref(), Some("MD5"));
        assert!(args.allow_append);
    }

    #[test]
    fn signature_path_is_optional() {
        let cli = Cli::parse_from(["logseal", "verify", "app.log"]);
        assert!(matches!(
            cli.command,
            Commands::Verify(cmd::verify::VerifyArgs { signature: None, .. })
        ));
    }

    #[test]
    fn lookup_flag_accepts_aliases() {
        let cli = Cli::parse_from(["logseal", "--lookup", "cpu", "show", "app.log"]);
        assert_eq!(cli.lookup, Some(LookupStrategy::Search));
        assert!(Cli::try_parse_from(["logseal", "--lookup", "fast", "show", "x"]).is_err());
    }

    #[test]
    fn chain_takes_event_and_out() {
        let cli = Cli::parse_from(["logseal", "chain", "app.log", "user=alice", "-o", "c.json"]);
        let Commands::Chain(args) = cli.command else {
            panic!("expected chain");
        };
        assert_eq!(args.event, "user=alice");
        assert_eq!(args.out, Some(PathBuf::from("c.json")));
    }

    #[test]
    fn show_width_defaults_to_eight() {
        let cli = Cli::parse_from(["logseal", "show", "app.log"]);
        let Commands::Show(args) = cli.command else {
            panic!("expected show");
        };
        assert_eq!(args.width, 8);
    }

    #[test]
    fn check_chain_is_kebab_case() {
        let cli = Cli::parse_from(["logseal", "check-chain", "c.json"]);
        assert!(matches!(cli.command, Commands::CheckChain(_)));
    }
}
