pub mod commands;
pub mod context;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use tramite_core::config::ConfigOverrides;

use crate::commands::CommandResult;
use crate::context::AppContext;

#[derive(Debug, Parser)]
#[command(
    name = "tramite",
    about = "Approval-workflow client CLI",
    long_about = "Submit, inspect, and decide approval requests against the approvals backend, \
                  with a locally-cached session and polled notification feed.",
    after_help = "Examples:\n  tramite login --credential ana@coe.dev\n  tramite dashboard --status pending\n  tramite show 42 --watch\n  tramite approve 42 --comment \"ok\""
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(long, global = true, help = "Path to the config file (default: tramite.toml)")]
    config: Option<PathBuf>,

    #[arg(long, global = true, help = "Backend base URL override")]
    api_url: Option<String>,

    #[arg(long, global = true, help = "Session storage directory override")]
    storage_dir: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        help = "Run against an ephemeral in-process backend instead of the network"
    )]
    offline: bool,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Exchange an identity-provider credential for a session")]
    Login {
        #[arg(long, help = "Identity-provider credential to exchange")]
        credential: String,
    },
    #[command(about = "Clear the stored session")]
    Logout,
    #[command(about = "Show the current session user")]
    Whoami,
    #[command(about = "Choose your workflow role (one-time, after first login)")]
    Role {
        #[arg(help = "requester or approver")]
        role: String,
    },
    #[command(about = "Stats and filtered request list for an approver")]
    Dashboard {
        #[arg(long, default_value = "", help = "Free-text filter over title, description, and id")]
        search: String,
        #[arg(long, default_value = "all", help = "all, pending, approved, or rejected")]
        status: String,
        #[arg(long = "type", default_value = "all", help = "all or an exact type key")]
        type_key: String,
        #[arg(long, help = "Approver id (default: the current user)")]
        approver: Option<i64>,
    },
    #[command(about = "Pending inbox for an approver")]
    Pending {
        #[arg(long, help = "Approver id (default: the current user)")]
        approver: Option<i64>,
    },
    #[command(about = "Create a new approval request")]
    New {
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: String,
        #[arg(long = "type")]
        type_key: String,
        #[arg(long)]
        approver: i64,
    },
    #[command(about = "Request detail with its audit history")]
    Show {
        id: i64,
        #[arg(long, help = "Keep refreshing the detail until interrupted")]
        watch: bool,
    },
    #[command(about = "Approve a pending request assigned to you")]
    Approve {
        id: i64,
        #[arg(long, help = "Optional comment for the history")]
        comment: Option<String>,
    },
    #[command(about = "Reject a pending request assigned to you")]
    Reject {
        id: i64,
        #[arg(long, help = "Optional comment for the history")]
        comment: Option<String>,
    },
    #[command(about = "Notification feed with unread count")]
    Notifications {
        #[arg(long, help = "Keep refreshing the feed until interrupted")]
        watch: bool,
    },
    #[command(about = "Mark a notification as read and print its deep link")]
    Read { id: i64 },
    #[command(about = "Request-type catalog, grouped by category")]
    Types,
    #[command(about = "Create a request type")]
    TypeAdd {
        #[arg(long)]
        key: String,
        #[arg(long)]
        label: String,
        #[arg(long)]
        category: String,
        #[arg(long)]
        description: Option<String>,
    },
    #[command(about = "Toggle a request type between active and deactivated (soft delete)")]
    TypeToggle { id: i64 },
    #[command(about = "Show the effective configuration with secrets redacted")]
    Config,
    #[command(about = "Validate config, storage writability, and backend reachability")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub async fn run() -> ExitCode {
    let cli = Cli::parse();

    let overrides = ConfigOverrides {
        base_url: cli.api_url.clone(),
        storage_dir: cli.storage_dir.clone(),
        ..ConfigOverrides::default()
    };

    // Doctor reports a broken config instead of failing on it, so it builds
    // its own report without a full context.
    if let Command::Doctor { json } = cli.command {
        let result = commands::doctor::run(cli.config.clone(), overrides, cli.offline, json).await;
        println!("{}", result.output);
        return ExitCode::from(result.exit_code);
    }

    let context = match AppContext::init(cli.config.clone(), overrides, cli.offline) {
        Ok(context) => context,
        Err(error) => {
            println!("error: {error:#}");
            return ExitCode::from(2);
        }
    };

    let result = dispatch(&cli.command, &context).await;
    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

async fn dispatch(command: &Command, context: &AppContext) -> CommandResult {
    match command {
        Command::Login { credential } => commands::session::login(context, credential).await,
        Command::Logout => commands::session::logout(context),
        Command::Whoami => commands::session::whoami(context),
        Command::Role { role } => commands::session::choose_role(context, role).await,
        Command::Dashboard { search, status, type_key, approver } => {
            commands::dashboard::run(context, search, status, type_key, *approver).await
        }
        Command::Pending { approver } => commands::requests::pending(context, *approver).await,
        Command::New { title, description, type_key, approver } => {
            commands::requests::create(context, title, description, type_key, *approver).await
        }
        Command::Show { id, watch } => commands::requests::show(context, *id, *watch).await,
        Command::Approve { id, comment } => {
            commands::requests::decide(context, *id, true, comment.clone()).await
        }
        Command::Reject { id, comment } => {
            commands::requests::decide(context, *id, false, comment.clone()).await
        }
        Command::Notifications { watch } => {
            commands::notifications::list(context, *watch).await
        }
        Command::Read { id } => commands::notifications::read(context, *id).await,
        Command::Types => commands::types::list(context).await,
        Command::TypeAdd { key, label, category, description } => {
            commands::types::add(context, key, label, category, description.clone()).await
        }
        Command::TypeToggle { id } => commands::types::toggle(context, *id).await,
        Command::Config => commands::config::run(context),
        Command::Doctor { .. } => unreachable!("handled before context init"),
    }
}
