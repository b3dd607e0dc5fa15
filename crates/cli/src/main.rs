mod commands;
mod config;
mod serve;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use crate::commands::check::cmd_check;
use crate::commands::grants::cmd_grants;
use crate::commands::users::cmd_users;
use crate::config::ServiceConfig;

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// And/Or: role- and state-based access control for document collections.
#[derive(Parser)]
#[command(
    name = "andor",
    version,
    about = "Role- and state-based access control for document collections"
)]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    /// Emit log events as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate an access model and print its states and roles
    Check {
        /// Path to the model file (.toml or .json)
        model: PathBuf,
    },

    /// Print the operations a user holds at each state
    Grants {
        /// Path to the model file (.toml or .json)
        model: PathBuf,
        /// Path to the users file (.toml or .json)
        #[arg(long)]
        users: PathBuf,
        /// User id to look up
        #[arg(long)]
        user: String,
    },

    /// List and edit the users file
    Users {
        /// Path to the model file roles and create queues are checked against
        #[arg(long)]
        model: PathBuf,
        /// Path to the users file (.toml or .json)
        #[arg(long)]
        users: PathBuf,
        #[command(subcommand)]
        action: UserAction,
    },

    /// Start the HTTP request layer
    Serve {
        /// Path to the service config file
        #[arg(long)]
        config: PathBuf,
        /// Port to listen on (overrides the config file)
        #[arg(long)]
        port: Option<u16>,
    },
}

#[derive(Subcommand)]
pub(crate) enum UserAction {
    /// Print every user record
    List,
    /// Add a user (creates the users file if it does not exist)
    Add {
        user_id: String,
        #[arg(long, default_value = "")]
        display_name: String,
        /// Initial state for documents the user creates
        #[arg(long)]
        create_queue: Option<String>,
        /// Role to grant; repeat for several
        #[arg(long = "role")]
        roles: Vec<String>,
    },
    /// Remove a user
    Remove { user_id: String },
    /// Grant a role to a user
    AddRole { user_id: String, role: String },
    /// Take a role away from a user
    RemoveRole { user_id: String, role: String },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.log_json, cli.quiet);

    match cli.command {
        Commands::Check { model } => {
            cmd_check(&model, cli.output, cli.quiet);
        }
        Commands::Grants { model, users, user } => {
            cmd_grants(&model, &users, &user, cli.output, cli.quiet);
        }
        Commands::Users {
            model,
            users,
            action,
        } => {
            cmd_users(&model, &users, action, cli.output, cli.quiet);
        }
        Commands::Serve { config, port } => {
            let mut config = match ServiceConfig::load(&config) {
                Ok(c) => c,
                Err(e) => {
                    report_error(&e.to_string(), cli.output, cli.quiet);
                    process::exit(1);
                }
            };
            if let Some(port) = port {
                config.port = port;
            }
            let rt = match tokio::runtime::Runtime::new() {
                Ok(rt) => rt,
                Err(e) => {
                    report_error(&format!("failed to create tokio runtime: {}", e), cli.output, cli.quiet);
                    process::exit(1);
                }
            };
            if let Err(e) = rt.block_on(serve::start_server(config)) {
                report_error(&format!("server error: {}", e), cli.output, cli.quiet);
                process::exit(1);
            }
        }
    }
}

/// Install the global `tracing` subscriber. `RUST_LOG` wins when set;
/// otherwise `info`, or `warn` under `--quiet`. Events go to stderr so
/// command output on stdout stays parseable.
fn init_tracing(json: bool, quiet: bool) {
    let default = if quiet { "warn" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    let result = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    if let Err(e) = result {
        eprintln!("warning: could not install log subscriber: {}", e);
    }
}

pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("error: {}", msg),
        OutputFormat::Json => {
            eprintln!("{}", serde_json::json!({ "error": msg }));
        }
    }
}
