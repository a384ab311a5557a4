// Entrypoint for the Yatai CLI.
// - Parses arguments and installs logging.
// - Hands each subcommand to its flow in `ui`.
// - Maps failures to exit codes: 2 for bad input, 3 for a failed upload,
//   1 for everything else.

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use yatai_cli::bento::default_repository;
use yatai_cli::config::{default_config_path, Config, DEFAULT_CONTEXT_NAME};
use yatai_cli::error::CliError;
use yatai_cli::ui::{self, LoginArgs};

/// Yatai CLI tool
#[derive(Parser)]
#[command(name = "yatai", version)]
struct Cli {
    /// Context store (default: ~/.yatai.yaml)
    #[arg(long, global = true, env = "YATAI_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Local bento repository (default: ~/bentoml/repository)
    #[arg(long, global = true, env = "BENTOML_REPOSITORY", value_name = "DIR")]
    repository: Option<PathBuf>,

    /// Debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Hide spinners and progress bars
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in to a Yatai registry and make it the current context
    Login {
        /// Yatai endpoint, like https://yatai.io
        #[arg(long)]
        endpoint: Option<String>,

        /// Yatai user api token
        #[arg(long)]
        api_token: Option<String>,

        /// Organization to push bentos to (default: first one visible)
        #[arg(long)]
        org: Option<String>,

        /// Name to store the context under
        #[arg(long, default_value = DEFAULT_CONTEXT_NAME)]
        context: String,
    },
    /// Organization management
    Org {
        #[command(subcommand)]
        command: OrgCommand,
    },
    /// Bento management
    Bento {
        #[command(subcommand)]
        command: BentoCommand,
    },
}

#[derive(Subcommand)]
enum OrgCommand {
    /// List organizations visible to the current context
    List,
}

#[derive(Subcommand)]
enum BentoCommand {
    /// Push a local bento to the registry
    Push {
        /// Bento tag, `name:version`
        bento: String,
    },
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("yatai_cli=debug,yatai=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(path: &Path) -> anyhow::Result<Config> {
    Config::load(path).with_context(|| format!("reading {}", path.display()))
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config_path = cli.config.unwrap_or_else(default_config_path);

    match cli.command {
        Commands::Login {
            endpoint,
            api_token,
            org,
            context,
        } => {
            let args = LoginArgs {
                endpoint,
                api_token,
                org,
                context,
                quiet: cli.quiet,
            };
            ui::login(&config_path, args)?;
        }
        Commands::Org {
            command: OrgCommand::List,
        } => {
            let config = load_config(&config_path)?;
            ui::list_organizations(config.current_context()?, cli.quiet)?;
        }
        Commands::Bento {
            command: BentoCommand::Push { bento },
        } => {
            let repository = cli.repository.unwrap_or_else(default_repository);
            ui::push(&config_path, &repository, &bento, cli.quiet)?;
        }
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(err) = run(cli) {
        let code = err
            .downcast_ref::<CliError>()
            .map(CliError::exit_code)
            .unwrap_or(1);
        ui::echo_error(&format!("{err:#}"));
        std::process::exit(code);
    }
}
