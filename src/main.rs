//! hiscounts CLI: update the wiki's hiscore counts modules.

use std::fs::File;
use std::path::PathBuf;
use std::sync::Mutex;

use chrono::Utc;
use clap::Parser;
use miette::{IntoDiagnostic, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use hiscore_counts::config::Config;
use hiscore_counts::counts;

#[derive(Parser)]
#[command(name = "hiscounts", version, about = "Update the wiki's hiscore counts modules")]
struct Cli {
    /// Path to the TOML configuration file.
    config: PathBuf,

    /// Increase log verbosity (-v: info, -vv: debug).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;

    let log_path = init_logging(cli.verbose, &config)?;
    tracing::info!(config = %cli.config.display(), log = %log_path.display(), "starting counts run");

    counts::run(&config)?;

    tracing::info!("counts run completed successfully");
    Ok(())
}

/// Log to stderr and to a per-run file under `log_dir`.
///
/// `RUST_LOG` overrides the verbosity flag when set.
fn init_logging(verbose: u8, config: &Config) -> Result<PathBuf> {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        // Silence the HTML parser stack; it is chatty at debug level.
        tracing_subscriber::EnvFilter::new(format!("{level},html5ever=warn,selectors=warn"))
    });

    let log_path = config.log_dir.join(format!(
        "hiscorecounts-{}.log",
        Utc::now().format("%Y-%m-%d_%H-%M-%S")
    ));
    let log_file = File::create(&log_path).into_diagnostic()?;

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(log_file)),
        )
        .init();

    Ok(log_path)
}
