use clap::Parser;

use player_tracker_backend::cli::{Cli, Commands};
use player_tracker_backend::config::Settings;
use player_tracker_backend::models::JobKind;
use player_tracker_backend::{api, db, notifier, scheduler};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

    let cli = Cli::parse();
    let settings = Settings::from_env()?;
    let pool = db::create_pool(&settings.database_url).await?;
    db::init_schema(&pool).await?;

    match cli.command {
        Commands::InitDb => {
            tracing::info!("schema initialized");
        }
        Commands::SyncStats { player, full } => {
            run_manual_sync(&pool, &settings, JobKind::Stats, player, full).await?;
        }
        Commands::SyncMatchlogs { player, full } => {
            run_manual_sync(&pool, &settings, JobKind::Matchlogs, player, full).await?;
        }
        Commands::Serve { port } => {
            serve(pool, settings, port).await?;
        }
    }

    Ok(())
}

async fn run_manual_sync(
    pool: &sqlx::PgPool,
    settings: &Settings,
    kind: JobKind,
    player: Option<i64>,
    full: bool,
) -> anyhow::Result<()> {
    let notifier = notifier::Notifier::from_settings(settings);
    let report = scheduler::run_job(pool, settings, kind, player, full, scheduler::CancelToken::new()).await?;
    tracing::info!(
        attempted = report.attempted,
        succeeded = report.succeeded,
        failed = report.failed,
        "sync complete"
    );
    notifier.notify(&report).await;
    Ok(())
}

async fn serve(pool: sqlx::PgPool, settings: Settings, port_override: Option<u16>) -> anyhow::Result<()> {
    let port = port_override.unwrap_or(settings.http_port);

    let _scheduler_handle = if settings.scheduler_enabled {
        Some(scheduler::build_scheduler(pool.clone(), settings.clone()).await?)
    } else {
        None
    };

    let state = api::AppState {
        pool,
        started_at: chrono::Utc::now(),
        scheduler_enabled: settings.scheduler_enabled,
        scheduler_timezone: settings.scheduler_timezone,
    };
    let app = api::create_router(state);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    tracing::info!(port, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}
