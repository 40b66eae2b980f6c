//! wsctl - lifecycle control for managed compute sessions
//!
//! This binary launches, monitors, and tears down containerized
//! interactive compute sessions on the workspace platform.
//!
//! # Usage
//!
//! ```text
//! wsctl list                          # All sessions
//! wsctl show anna-flights-1           # One session in detail
//! wsctl start --namespace anna --project flights \
//!       --commit 7f3a9b2 --class 3    # Launch and wait
//! wsctl pause anna-flights-1          # Hibernate (asks about unsaved work)
//! wsctl resume anna-flights-1
//! wsctl stop anna-flights-1 --yes     # Delete without prompting
//! ```

use std::collections::BTreeMap;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use clap::{Args, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use wsctl_api::SessionCreateRequest;
use wsctl_cli::commands;
use wsctl_cli::config::Config;
use wsctl_client::{
    HttpSessionApi, Notifier, RepositoryProbe, SessionApi, SessionController, TracingNotifier,
};
use wsctl_core::{Quantity, SessionName};

// ============================================================================
// CLI Arguments
// ============================================================================

/// wsctl - lifecycle control for managed compute sessions
#[derive(Parser, Debug)]
#[command(name = "wsctl")]
#[command(about = "Launch, monitor, and control compute sessions")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// API base URL (overrides WSCTL_API_URL and the config file)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Bearer token (overrides WSCTL_API_TOKEN and the config file)
    #[arg(long, global = true)]
    api_token: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List sessions
    List,
    /// Show one session in detail
    Show {
        /// Session name
        name: String,
    },
    /// Start a new session
    Start(StartArgs),
    /// Pause (hibernate) a running session
    Pause {
        /// Session name
        name: String,
        #[command(flatten)]
        confirm: ConfirmArgs,
        #[command(flatten)]
        wait: WaitArgs,
    },
    /// Resume a paused session
    Resume {
        /// Session name
        name: String,
        #[command(flatten)]
        wait: WaitArgs,
    },
    /// Change a session's resource class
    Modify {
        /// Session name
        name: String,
        /// New resource class id
        #[arg(long = "class")]
        resource_class_id: u32,
        /// Resume the session once the class change is committed
        #[arg(long)]
        resume: bool,
        #[command(flatten)]
        wait: WaitArgs,
    },
    /// Delete a session
    Stop {
        /// Session name
        name: String,
        #[command(flatten)]
        confirm: ConfirmArgs,
        #[command(flatten)]
        wait: WaitArgs,
    },
    /// Print recent container logs
    Logs {
        /// Session name
        name: String,
        /// Limit output to the last N lines
        #[arg(long, value_name = "N")]
        tail: Option<u32>,
    },
    /// Print the URL of a running session
    Open {
        /// Session name
        name: String,
    },
    /// Show the effective configuration
    Config,
}

#[derive(Args, Debug)]
struct StartArgs {
    /// Namespace (user or group) owning the project
    #[arg(long)]
    namespace: String,

    /// Project name
    #[arg(long)]
    project: String,

    /// Branch to clone
    #[arg(long, default_value = "main")]
    branch: String,

    /// Commit to check out
    #[arg(long)]
    commit: String,

    /// Resource class id
    #[arg(long = "class")]
    resource_class_id: u32,

    /// Workspace disk size, e.g. "32G"
    #[arg(long)]
    storage: Option<String>,

    /// Runtime image override
    #[arg(long)]
    image: Option<String>,

    /// Environment variable for the session container, repeatable
    #[arg(long = "env", value_name = "KEY=VALUE")]
    env: Vec<String>,

    /// Relative URL path the session opens on
    #[arg(long, default_value = "/lab")]
    default_url: String,

    /// Fetch LFS objects during clone
    #[arg(long)]
    lfs_auto_fetch: bool,

    #[command(flatten)]
    wait: WaitArgs,
}

#[derive(Args, Debug)]
struct WaitArgs {
    /// Give up waiting after this many seconds
    #[arg(long, value_name = "SECONDS", default_value_t = 600)]
    wait_timeout: u64,

    /// Submit the request and return without waiting
    #[arg(long)]
    no_wait: bool,
}

#[derive(Args, Debug)]
struct ConfirmArgs {
    /// Skip the confirmation prompt
    #[arg(long, short = 'y')]
    yes: bool,
}

// ============================================================================
// Wiring
// ============================================================================

/// Initializes stderr logging, filtered by `WSCTL_LOG`.
fn init_logging() {
    let filter = EnvFilter::try_from_env("WSCTL_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// Builds the controller over the HTTP API per the effective config.
fn build_controller(config: &Config, wait_timeout: Option<Duration>) -> Result<SessionController> {
    let api = Arc::new(HttpSessionApi::new(config.api_config())?);
    let notifier: Arc<dyn Notifier> = Arc::new(TracingNotifier);

    let mut controller = SessionController::new(
        Arc::clone(&api) as Arc<dyn SessionApi>,
        api as Arc<dyn RepositoryProbe>,
        notifier,
    );
    if let Some(interval) = config.poll_interval_ms {
        controller = controller.with_poll_interval(Duration::from_millis(interval));
    }
    if let Some(limit) = wait_timeout {
        controller = controller.with_wait_limit(limit);
    }
    Ok(controller)
}

fn parse_env_vars(pairs: &[String]) -> Result<BTreeMap<String, String>> {
    let mut vars = BTreeMap::new();
    for pair in pairs {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| anyhow!("invalid --env {pair:?}, expected KEY=VALUE"))?;
        vars.insert(key.to_string(), value.to_string());
    }
    Ok(vars)
}

fn build_create_request(args: &StartArgs) -> Result<SessionCreateRequest> {
    let mut request = SessionCreateRequest::new(
        args.namespace.clone(),
        args.project.clone(),
        args.branch.clone(),
        args.commit.clone(),
        args.resource_class_id,
    );
    request.default_url = args.default_url.clone();
    if let Some(storage) = &args.storage {
        request.storage = Some(storage.parse::<Quantity>()?);
    }
    request.image = args.image.clone();
    request.environment_variables = parse_env_vars(&args.env)?;
    request.lfs_auto_fetch = args.lfs_auto_fetch;
    Ok(request)
}

fn wait_limit(wait: &WaitArgs) -> Option<Duration> {
    if wait.no_wait {
        None
    } else {
        Some(Duration::from_secs(wait.wait_timeout))
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging();

    let flags = Config {
        api_url: cli.api_url.clone(),
        api_token: cli.api_token.clone(),
        poll_interval_ms: None,
    };
    let config = Config::load()?.merged(Config::from_env()).merged(flags);
    debug!(api_url = %config.api_config().base_url, "Configuration resolved");

    match cli.command {
        Command::List => commands::list(&build_controller(&config, None)?).await,
        Command::Show { name } => {
            commands::show(&build_controller(&config, None)?, &SessionName::new(name)).await
        }
        Command::Start(args) => {
            let controller = build_controller(&config, wait_limit(&args.wait))?;
            let request = build_create_request(&args)?;
            commands::start(&controller, request, args.wait.no_wait).await
        }
        Command::Pause {
            name,
            confirm,
            wait,
        } => {
            let controller = build_controller(&config, wait_limit(&wait))?;
            commands::pause(
                &controller,
                &SessionName::new(name),
                confirm.yes,
                wait.no_wait,
            )
            .await
        }
        Command::Resume { name, wait } => {
            let controller = build_controller(&config, wait_limit(&wait))?;
            commands::resume(&controller, &SessionName::new(name), wait.no_wait).await
        }
        Command::Modify {
            name,
            resource_class_id,
            resume,
            wait,
        } => {
            let controller = build_controller(&config, wait_limit(&wait))?;
            commands::modify(
                &controller,
                &SessionName::new(name),
                resource_class_id,
                resume,
                wait.no_wait,
            )
            .await
        }
        Command::Stop {
            name,
            confirm,
            wait,
        } => {
            let controller = build_controller(&config, wait_limit(&wait))?;
            commands::stop(
                &controller,
                &SessionName::new(name),
                confirm.yes,
                wait.no_wait,
            )
            .await
        }
        Command::Logs { name, tail } => {
            commands::logs(
                &build_controller(&config, None)?,
                &SessionName::new(name),
                tail,
            )
            .await
        }
        Command::Open { name } => {
            commands::open(&build_controller(&config, None)?, &SessionName::new(name)).await
        }
        Command::Config => {
            commands::show_config(&config);
            Ok(())
        }
    }
}
