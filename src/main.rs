//! RBAC Console CLI

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use clap::{Parser, Subcommand};
use colored::Colorize;

use rbac_console::api::{create_api, ListParams, Query, RbacApi};
use rbac_console::config::{mask_token, ConfigOverrides, ConsoleConfig};
use rbac_console::error::{FixSuggestion, RbacError};
use rbac_console::model::EntityKind;
use rbac_console::seed::{run_seed, SeedOutcome, SeedPayload, SeedSummary, NO_OPERATIONS};
use rbac_console::tui::{self, ScreenSpec};

#[derive(Parser)]
#[command(name = "rbac")]
#[command(about = "RBAC Console - manage roles, groups, users and workspaces")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Use the in-memory demo backend instead of the API
    #[arg(long, global = true)]
    mock: bool,

    /// RBAC API base url
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Bearer token
    #[arg(long, global = true)]
    token: Option<String>,

    /// Rows per list page (1-100)
    #[arg(long, global = true)]
    page_size: Option<usize>,

    /// Config file (default: ~/.config/rbac-console/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Browse roles (default)
    Roles,
    /// Browse groups
    Groups,
    /// Browse users (read-only)
    Users,
    /// Browse the workspace tree
    Workspaces,

    /// Open one role
    Role { id: String },
    /// Open one group
    Group { id: String },
    /// Open one workspace
    Workspace { id: String },

    /// Create roles, groups and workspaces from a JSON or YAML file
    Seed {
        /// Path to the payload (.json, .yaml, .yml)
        file: PathBuf,
    },

    /// Check the API is reachable with the current settings
    Check,
}

impl Commands {
    fn start_screen(&self) -> Option<ScreenSpec> {
        match self {
            Self::Roles => Some(ScreenSpec::List(EntityKind::Role)),
            Self::Groups => Some(ScreenSpec::List(EntityKind::Group)),
            Self::Users => Some(ScreenSpec::List(EntityKind::User)),
            Self::Workspaces => Some(ScreenSpec::List(EntityKind::Workspace)),
            Self::Role { id } => Some(ScreenSpec::detail(EntityKind::Role, id.clone())),
            Self::Group { id } => Some(ScreenSpec::detail(EntityKind::Group, id.clone())),
            Self::Workspace { id } => Some(ScreenSpec::detail(EntityKind::Workspace, id.clone())),
            Self::Seed { .. } | Self::Check => None,
        }
    }
}

#[tokio::main]
async fn main() {
    // Load .env file (ignore if not present)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let default = Commands::Roles;
    let command = cli.command.as_ref().unwrap_or(&default);
    init_tracing(command.start_screen().is_some());

    let code = match run(&cli, command).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            if let Some(suggestion) = e
                .downcast_ref::<RbacError>()
                .and_then(|err| err.fix_suggestion())
            {
                eprintln!("  {} {}", "Fix:".yellow(), suggestion);
            }
            1
        }
    };
    std::process::exit(code);
}

/// The TUI owns the terminal, so it logs to a file; everything else logs to stderr
fn init_tracing(tui_mode: bool) {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing::Level::INFO.into());

    if !tui_mode {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
        return;
    }

    let log_path = ConsoleConfig::log_path();
    let file = fs::create_dir_all(ConsoleConfig::config_dir()).and_then(|_| {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
    });
    match file {
        Ok(file) => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init(),
        Err(_) => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::sink)
            .init(),
    }
}

fn load_config(cli: &Cli) -> Result<ConsoleConfig, RbacError> {
    let path = cli.config.clone().unwrap_or_else(ConsoleConfig::config_path);
    let overrides = ConfigOverrides {
        api_url: cli.api_url.clone(),
        token: cli.token.clone(),
        page_size: cli.page_size,
    };
    ConsoleConfig::load_from(&path)?
        .with_env()?
        .with_overrides(&overrides)
}

async fn run(cli: &Cli, command: &Commands) -> anyhow::Result<i32> {
    let config = load_config(cli)?;
    let api = create_api(&config, cli.mock)?;

    if let Some(start) = command.start_screen() {
        tui::run(api, start, config.ui.page_size).await?;
        return Ok(0);
    }

    match command {
        Commands::Seed { file } => Ok(seed(api.as_ref(), file).await?),
        Commands::Check => {
            check(api.as_ref(), &config).await?;
            Ok(0)
        }
        _ => Ok(0),
    }
}

async fn seed(api: &dyn RbacApi, file: &Path) -> Result<i32, RbacError> {
    let payload = SeedPayload::from_path(file)?;

    println!(
        "{} Seeding {} entr{} from {} via {}",
        "→".cyan(),
        payload.operation_count(),
        if payload.operation_count() == 1 { "y" } else { "ies" },
        file.display().to_string().cyan(),
        api.name().cyan().bold()
    );

    match run_seed(api, &payload, print_summary).await {
        SeedOutcome::NoOperations => {
            println!("{} {}", "•".yellow(), NO_OPERATIONS);
            Ok(0)
        }
        SeedOutcome::Completed(summary) if summary.success => Ok(0),
        SeedOutcome::Completed(_) => Ok(1),
    }
}

fn print_summary(summary: &SeedSummary) {
    for (name, collection) in summary.collections() {
        let failed = if collection.failed > 0 {
            collection.failed.to_string().red().bold()
        } else {
            collection.failed.to_string().normal()
        };
        println!(
            "  {:<11} {} created, {} failed",
            name,
            collection.created.to_string().green(),
            failed
        );
        for error in &collection.errors {
            println!("    {} {}", "✗".red(), error);
        }
    }

    if summary.success {
        println!("{} Seed completed", "✓".green());
    } else {
        println!("{} Seed completed with errors", "✗".red());
    }
}

async fn check(api: &dyn RbacApi, config: &ConsoleConfig) -> Result<(), RbacError> {
    let target = if api.name() == "mock" {
        "in-memory demo data".to_string()
    } else {
        config.api.url.clone()
    };
    println!("{} Checking {}", "→".cyan(), target.cyan());
    if let Some(token) = &config.api.token {
        println!("  Token: {}", mask_token(token, 8));
    }

    let data = api
        .query(&Query::list(EntityKind::Role, ListParams::page(1, 1)))
        .await?;
    let roles = data.as_page().map(|page| page.meta.count).unwrap_or(0);

    println!("{} API reachable ({} roles)", "✓".green(), roles);
    Ok(())
}
