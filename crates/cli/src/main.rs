//! # squid-tagger
//!
//! Squid URL redirector: classifies each request by the tags of its site and
//! answers with a redirect or a pass. Also dumps and loads the policy tables.

mod bootstrap;
mod commands;
mod server;

use clap::{ArgGroup, Parser};
use server::StopReason;
use squid_tagger_domain::CliOverrides;
use std::path::PathBuf;
use tracing::info;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser, Debug)]
#[command(name = "squid-tagger")]
#[command(version)]
#[command(about = "Squid redirector that classifies URLs by site tags")]
#[command(group(ArgGroup::new("mode").multiple(false)))]
struct Cli {
    /// Configuration file (default: /usr/local/etc/squid-tagger.toml when present)
    #[arg(short = 'c', long)]
    config: Option<String>,

    /// Write site assignments as CSV to stdout
    #[arg(short = 'd', long, group = "mode")]
    dump: bool,

    /// Read site assignments as CSV from stdin
    #[arg(short = 'l', long, group = "mode")]
    load: bool,

    /// Write rules as CSV to stdout
    #[arg(short = 'D', long, group = "mode")]
    dump_conf: bool,

    /// Replace all rules with CSV read from stdin
    #[arg(short = 'L', long, group = "mode")]
    load_conf: bool,

    /// Convert a SquidGuard database directory to site CSV on stdout
    #[arg(long, value_name = "DIR", group = "mode")]
    import_squidguard: Option<PathBuf>,

    /// Delete existing site assignments before loading
    #[arg(short = 'f', long, requires = "load")]
    flush_database: bool,

    /// Number of workers; 0 classifies requests inline
    #[arg(short = 'w', long)]
    workers: Option<usize>,

    /// Requests waiting for a worker before reading pauses
    #[arg(short = 'q', long)]
    queue_capacity: Option<usize>,

    /// Discard all log output
    #[arg(short = 's', long)]
    silent: bool,
}

#[derive(Debug, PartialEq, Eq)]
enum Mode {
    Redirector,
    DumpSites,
    LoadSites { flush: bool },
    DumpRules,
    LoadRules,
    ImportSquidGuard(PathBuf),
}

impl Cli {
    fn mode(&self) -> Mode {
        if self.dump {
            Mode::DumpSites
        } else if self.load {
            Mode::LoadSites {
                flush: self.flush_database,
            }
        } else if self.dump_conf {
            Mode::DumpRules
        } else if self.load_conf {
            Mode::LoadRules
        } else if let Some(dir) = &self.import_squidguard {
            Mode::ImportSquidGuard(dir.clone())
        } else {
            Mode::Redirector
        }
    }

    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            workers: self.workers,
            queue_capacity: self.queue_capacity,
            silent: self.silent,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = bootstrap::load_config(cli.config.as_deref(), cli.overrides())?;
    bootstrap::init_logging(&config);
    info!(
        config_file = cli.config.as_deref().unwrap_or("default"),
        workers = config.redirector.workers,
        queue_capacity = config.redirector.queue_capacity,
        "Configuration loaded"
    );

    match cli.mode() {
        Mode::Redirector => {
            if server::run_redirector(&config).await? == StopReason::Signal {
                // The blocking stdin read cannot be interrupted and would keep
                // the runtime from shutting down.
                std::process::exit(0);
            }
        }
        Mode::DumpSites => commands::dump_sites(&config).await?,
        Mode::LoadSites { flush } => commands::load_sites(&config, flush).await?,
        Mode::DumpRules => commands::dump_rules(&config).await?,
        Mode::LoadRules => commands::load_rules(&config).await?,
        Mode::ImportSquidGuard(dir) => commands::import_squidguard(dir).await?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_default_mode_is_redirector() {
        let cli = Cli::try_parse_from(["squid-tagger", "-w", "4"]).unwrap();

        assert_eq!(cli.mode(), Mode::Redirector);
        assert_eq!(cli.overrides().workers, Some(4));
    }

    #[test]
    fn test_load_with_flush() {
        let cli = Cli::try_parse_from(["squid-tagger", "-l", "-f"]).unwrap();

        assert_eq!(cli.mode(), Mode::LoadSites { flush: true });
    }

    #[test]
    fn test_modes_are_exclusive() {
        assert!(Cli::try_parse_from(["squid-tagger", "-d", "-l"]).is_err());
        assert!(Cli::try_parse_from(["squid-tagger", "-D", "--import-squidguard", "/tmp"]).is_err());
    }

    #[test]
    fn test_flush_requires_load() {
        assert!(Cli::try_parse_from(["squid-tagger", "-f"]).is_err());
        assert!(Cli::try_parse_from(["squid-tagger", "-d", "-f"]).is_err());
    }
}
