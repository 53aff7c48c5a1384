use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::io;
use tracing_subscriber::EnvFilter;

use gitskills::cli;

#[derive(Parser)]
#[command(name = "gitskills", version)]
#[command(about = "Infer skills from GitHub contribution history", long_about = None)]
struct Cli {
    /// Debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a user's repositories and recommend skills
    Analyze {
        /// GitHub login to analyze (defaults to the token owner)
        #[arg(short, long)]
        user: Option<String>,

        /// Maximum repositories to analyze, after dropping forks
        #[arg(long)]
        max_repos: Option<usize>,

        /// Ask the configured LLM to verify each recommendation
        #[arg(long)]
        ai: bool,

        /// Include forked repositories
        #[arg(long)]
        include_forks: bool,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,

        /// Number of recommendations to show
        #[arg(long, default_value_t = 15)]
        top: usize,

        /// Path to config file (defaults to ./gitskills.toml or ~/.config/gitskills/config.toml)
        #[arg(long)]
        config: Option<String>,

        /// Use a mock LLM client for verification
        #[arg(long)]
        dry_run: bool,
    },

    /// Validate configuration and environment without calling any API
    ConfigCheck {
        #[arg(long)]
        config: Option<String>,
    },

    /// Print shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn init_logging(verbose: bool) {
    // Logs go to stderr so stdout carries only the report
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("gitskills=debug")
        } else {
            EnvFilter::new("gitskills=info")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Analyze {
            user,
            max_repos,
            ai,
            include_forks,
            json,
            top,
            config,
            dry_run,
        } => {
            cli::analyze::run(
                user,
                config,
                max_repos,
                ai,
                include_forks,
                json,
                top,
                dry_run,
            )
            .await?;
        }
        Commands::ConfigCheck { config } => {
            cli::config_check::run(config)?;
        }
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "gitskills", &mut io::stdout());
        }
    }

    Ok(())
}
