//! # Cakeday CLI
//!
//! Birthday reminders: push a notification two days before, one day
//! before, and on the day itself, once each.
//!
//! Usage:
//!   cakeday serve                      # HTTP API + scheduled passes
//!   cakeday run-once                   # One reminder pass, then exit
//!   cakeday run-once --dry-run         # Log reminders instead of sending
//!   cakeday migrate                    # Normalize legacy lastNotified values
//!   cakeday config show                # Show configuration

use anyhow::{Context, Result};
use cakeday_core::CakedayConfig;
use cakeday_core::traits::SystemClock;
use cakeday_scheduler::{CronSchedule, DispatchCoordinator, RunReport, SchedulerEngine};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "cakeday",
    version,
    about = "🎂 Cakeday: birthday reminders, exactly once per day",
    long_about = "Stores birthdays and pushes a reminder two days before, one day before,\nand on the day, in the configured timezone."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API and the reminder scheduler
    Serve {
        /// Override the listen port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Run a single reminder pass and exit
    RunOnce {
        /// Log reminders instead of sending them
        #[arg(long)]
        dry_run: bool,
    },

    /// Rewrite legacy lastNotified values into the per-category map
    Migrate,

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Show system info
    Info,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Reset to defaults
    Reset,
}

fn build_coordinator(config: &CakedayConfig) -> Result<Arc<DispatchCoordinator>> {
    let store = cakeday_memory::create_store(config).context("opening birthday store")?;
    let transport = cakeday_channels::create_transport(&config.push).context("setting up push")?;
    let coordinator = DispatchCoordinator::new(store, transport, Arc::new(SystemClock), config.tz()?)
        .with_max_concurrent(config.max_concurrent_sends);
    Ok(Arc::new(coordinator))
}

fn print_report(report: &RunReport) {
    println!("🎂 Pass for {}", report.today);
    println!("   Records: {}", report.records);
    println!("   Sent: {} | Already sent: {}", report.sent, report.already_sent);
    println!(
        "   Removed: {} | Transient failures: {} | Commit failures: {}",
        report.removed, report.transient_failures, report.commit_failures
    );
    if report.errors > 0 || report.vanished > 0 {
        println!("   Errors: {} | Vanished: {}", report.errors, report.vanished);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "cakeday=debug,cakeday_core=debug,cakeday_scheduler=debug,cakeday_channels=debug,cakeday_memory=debug,cakeday_gateway=debug"
    } else {
        "cakeday=info,cakeday_scheduler=info,cakeday_channels=info,cakeday_memory=info,cakeday_gateway=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();

    // Load config
    let config_path = cli
        .config
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or_else(CakedayConfig::default_path);
    let mut config = CakedayConfig::load_from(&config_path)?;
    config.apply_env()?;

    match cli.command {
        Commands::Serve { port } => {
            if let Some(port) = port {
                config.gateway.port = port;
            }
            let coordinator = build_coordinator(&config)?;
            let engine = SchedulerEngine::from_config(coordinator.clone(), &config)?;
            if config.test_mode {
                tracing::warn!("🧪 Test mode: reminder pass runs every minute");
            }

            let email = match config.email.smtp_host {
                Some(_) => match cakeday_channels::EmailSender::from_config(&config.email) {
                    Ok(sender) => Some(sender),
                    Err(e) => {
                        tracing::warn!("⚠️ Email disabled: {e}");
                        None
                    }
                },
                None => None,
            };
            let holidays = cakeday_gateway::HolidayClient::from_config(&config.holidays);

            let state = cakeday_gateway::AppState::new(config.gateway.clone(), coordinator)
                .with_email(email)
                .with_holidays(holidays);

            let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
            let scheduler = engine.spawn(shutdown_rx);

            println!("🎂 Cakeday v{}", env!("CARGO_PKG_VERSION"));
            println!("   Schedule: {} ({})", config.effective_schedule(), config.timezone);
            println!("   Press Ctrl+C to stop.");

            cakeday_gateway::start_server(Arc::new(state), async move {
                let _ = tokio::signal::ctrl_c().await;
                let _ = shutdown_tx.send(true);
            })
            .await?;

            scheduler.await.context("scheduler task panicked")??;
            println!("\n👋 Cakeday stopped.");
        }

        Commands::RunOnce { dry_run } => {
            if dry_run {
                config.push.backend = "log".into();
            }
            let coordinator = build_coordinator(&config)?;
            let report = coordinator.run_now().await?;
            print_report(&report);
        }

        Commands::Migrate => {
            let store = cakeday_memory::create_store(&config)?;
            let migrated = store.migrate_legacy().await?;
            println!("✅ Migrated {migrated} record(s) on {}.", store.name());
        }

        Commands::Config { action } => match action {
            ConfigAction::Show => {
                let content = toml::to_string_pretty(&config.redacted())?;
                println!("{content}");
            }
            ConfigAction::Reset => {
                CakedayConfig::default().save_to(&config_path)?;
                println!("✅ Configuration reset to defaults at {}.", config_path.display());
            }
        },

        Commands::Info => {
            let tz = config.tz()?;
            let schedule = CronSchedule::parse(config.effective_schedule())?;
            println!("🎂 Cakeday v{}", env!("CARGO_PKG_VERSION"));
            println!("   Platform: {} / {}", std::env::consts::OS, std::env::consts::ARCH);
            println!("   Config: {}", config_path.display());
            println!("   Timezone: {tz}");
            println!(
                "   Schedule: {schedule}{}",
                if config.test_mode { " (test mode)" } else { "" }
            );
            match schedule.next_after(chrono::Utc::now(), tz) {
                Some(next) => println!("   Next pass: {}", next.with_timezone(&tz)),
                None => println!("   Next pass: never"),
            }
            println!("   Store: {} ({})", config.store.backend, config.store_path().display());
            println!("   Push: {}", config.push.backend);
            println!(
                "   Email: {}",
                if config.email.smtp_host.is_some() { "configured" } else { "not configured" }
            );
        }
    }

    Ok(())
}
