use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use civic_profile::config::WidgetSettings;
use civic_profile::profile::{LoadOutcome, ProfileLoader, ProfileStore};
use civic_profile::render::{HtmlRenderer, RenderBackend, TextRenderer, derive_view};
use civic_profile::role::{FileStorage, RoleKey, RoleState};
use civic_profile::scenario::{DEFAULT_SCENARIO_PATH, run_scenario_command};
use civic_profile::server::run_http_server;
use civic_profile::studio::run_studio;

const LOG_DIR_ENV: &str = "CIVIC_PROFILE_LOG_DIR";

#[derive(Debug, Parser)]
#[command(name = "civic_profile", about = "Role-aware profile widget toolkit")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print the summary icon and popup markup for a role.
    Render {
        /// Role to render instead of the persisted one.
        #[arg(long)]
        role: Option<String>,
        /// Also print the popup, as if the summary had been activated.
        #[arg(long)]
        open: bool,
        #[arg(long, value_enum, default_value_t = OutputFormat::Html)]
        format: OutputFormat,
    },
    /// Inspect or change the persisted role.
    Role {
        #[command(subcommand)]
        action: RoleCommand,
    },
    /// Replay widget scenarios from a YAML suite.
    Scenario {
        #[arg(default_value = DEFAULT_SCENARIO_PATH)]
        path: PathBuf,
    },
    /// Serve the profile document and rendered widget fragments over HTTP.
    Serve {
        #[arg(long, default_value = "127.0.0.1:4321")]
        bind: String,
    },
    /// Open the native widget preview.
    Studio,
}

#[derive(Debug, Subcommand)]
enum RoleCommand {
    Show,
    Set { role: String },
    Reset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Html,
    Text,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _log_guard = init_tracing()?;

    let cli = Cli::parse();
    let settings = WidgetSettings::from_env().context("failed to load configuration")?;

    match cli.command {
        Commands::Render { role, open, format } => {
            run_render(&settings, role, open, format).await?
        }
        Commands::Role { action } => run_role(&settings, action),
        Commands::Scenario { path } => run_scenario_command(&path, &settings.widget_options())?,
        Commands::Serve { bind } => run_http_server(&settings, &bind).await?,
        Commands::Studio => run_studio(&settings)?,
    }

    Ok(())
}

async fn run_render(
    settings: &WidgetSettings,
    role: Option<String>,
    open: bool,
    format: OutputFormat,
) -> Result<()> {
    let role = match role {
        Some(role) => RoleKey::from(role),
        None => persisted_role(settings).current().clone(),
    };
    let loader = ProfileLoader::new(settings.profile_source.clone());
    let store = match loader.load().await {
        LoadOutcome::Loaded(store) => store,
        LoadOutcome::Failed(error) => {
            eprintln!("warning: rendering without profiles: {error}");
            ProfileStore::new()
        }
    };

    let view = derive_view(&role, &store, &settings.view_options());
    let renderer: Box<dyn RenderBackend> = match format {
        OutputFormat::Html => Box::new(HtmlRenderer),
        OutputFormat::Text => Box::new(TextRenderer),
    };
    println!("{}", renderer.render_summary(&view.summary).trim_end());
    if open {
        println!("{}", renderer.render_popup(&view.popup).trim_end());
    }

    Ok(())
}

fn run_role(settings: &WidgetSettings, action: RoleCommand) {
    let mut state = persisted_role(settings);
    match action {
        RoleCommand::Show => {}
        RoleCommand::Set { role } => {
            state.set_role(RoleKey::from(role));
        }
        RoleCommand::Reset => {
            state.reset();
        }
    }
    println!("{}", state.current());
}

fn persisted_role(settings: &WidgetSettings) -> RoleState<FileStorage> {
    RoleState::load(
        FileStorage::new(&settings.role_storage_path),
        settings.role_storage_key.clone(),
    )
}

fn init_tracing() -> Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,civic_profile=debug"));

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact();

    let (file_layer, guard) = match std::env::var(LOG_DIR_ENV) {
        Ok(dir) if !dir.trim().is_empty() => {
            let appender = tracing_appender::rolling::daily(dir.trim(), "civic_profile.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        _ => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))?;

    Ok(guard)
}
