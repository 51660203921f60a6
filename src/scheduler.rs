//! Scheduler (C8, §4.8).
//!
//! Single-process, cron-triggered orchestration of `SyncStats`/`SyncMatchlogs` jobs
//! across the full roster. Players are processed sequentially and share one `Fetcher`
//! (and therefore one rate gate) per job; a per-player failure is captured into the
//! job's `SyncReport` rather than aborting the run.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Datelike, TimeZone, Utc, Weekday};
use chrono_tz::Tz;
use sqlx::PgPool;
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::config::Settings;
use crate::db;
use crate::error::EngineError;
use crate::fetch::Fetcher;
use crate::models::{JobKind, Player, PlayerFailure, SyncReport};
use crate::notifier::Notifier;
use crate::orchestrator::{self, ScrapeRequest};
use crate::writer::{self, ReplaceScope};
use crate::backfill;

/// Cooperative cancellation observed between players (§4.8 "Cancellation").
#[derive(Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        CancelToken(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

fn is_national_team_label(label: &str) -> bool {
    // A four-digit bare year is only ever a national-team label in our own storage;
    // anything else is a club season.
    label.len() == 4 && label.chars().all(|c| c.is_ascii_digit())
}

/// Runs one sync job over the full roster (or a single player, for manual CLI runs),
/// sequentially, honoring `cancel` between players (§4.8, §5 "Ordering guarantees").
/// `full` selects a full resync (every season the source exposes) over the default
/// incremental (current season only) scope (§4.5 "Season scope policy").
pub async fn run_job(
    pool: &PgPool,
    settings: &Settings,
    job_kind: JobKind,
    only_player: Option<i64>,
    full: bool,
    cancel: CancelToken,
) -> Result<SyncReport, EngineError> {
    let started_at = Utc::now();

    let roster: Vec<Player> = match only_player {
        Some(id) => db::get_player(pool, id).await?.into_iter().collect(),
        None => db::list_players(pool).await?,
    };
    let mut roster = roster;
    roster.sort_by_key(|p| p.id);

    let fetcher =
        Fetcher::launch(settings.rate_limit, settings.fetch_max_retries, settings.fetch_timeout).await?;

    let request = if full { ScrapeRequest::Full } else { ScrapeRequest::Incremental };
    let replace = match job_kind {
        JobKind::Stats => ReplaceScope::all(),
        JobKind::Matchlogs => ReplaceScope::matches_only(),
    };

    let mut attempted = 0u32;
    let mut succeeded = 0u32;
    let mut failures = Vec::new();
    let mut cancelled = false;

    for player in &roster {
        if cancel.is_cancelled() {
            cancelled = true;
            break;
        }

        attempted += 1;
        match sync_one_player(pool, &fetcher, player, request, replace).await {
            Ok(()) => succeeded += 1,
            Err(err) => {
                tracing::warn!(player_id = player.id, player = %player.name, error = %err, "sync failed for player");
                failures.push(PlayerFailure {
                    player_id: player.id,
                    player_name: player.name.clone(),
                    reason: err.to_string(),
                });
            }
        }
    }

    fetcher.shutdown().await;

    // A full-scope replace can bulk-insert rows that bypass normal per-request id
    // allocation; reseed sequences so the next administratively-created row doesn't
    // collide (§4.6 "reseed_sequences hook").
    if full {
        if let Err(err) = writer::reseed_sequences(pool).await {
            tracing::warn!(error = %err, "sequence reseed failed after full sync");
        }
    }

    let failed = failures.len() as u32;
    Ok(SyncReport {
        job_kind,
        started_at,
        finished_at: Utc::now(),
        attempted,
        succeeded,
        failed,
        failures,
        cancelled,
    })
}

async fn sync_one_player(
    pool: &PgPool,
    fetcher: &Fetcher,
    player: &Player,
    request: ScrapeRequest,
    replace: ReplaceScope,
) -> Result<(), EngineError> {
    let (dossier, scope) = orchestrator::scrape_player(fetcher, player, request)
        .await
        .map_err(|e| e.source)?;

    writer::write(pool, player.id, &dossier, &scope, replace).await?;

    if !dossier.matches.is_empty() {
        match backfill::backfill_player(pool, player.id, player.is_goalkeeper, is_national_team_label, &dossier.matches).await {
            Ok(repaired) if repaired > 0 => {
                tracing::info!(player_id = player.id, repaired, "backfilled minutes from match log");
            }
            Ok(_) => {}
            Err(err) => {
                // Backfill failure is non-fatal (§7 "BackfillError - non-fatal; log and continue").
                tracing::warn!(player_id = player.id, error = %err, "backfill failed");
            }
        }
    }

    Ok(())
}

/// Next occurrence of each default job, in UTC, for the API root endpoint to surface
/// (§6.1 "GET / — API metadata including scheduler next-run times"). Computed directly
/// from the same weekday/hour pairs `build_scheduler` registers, rather than consulting a
/// live `JobScheduler` handle, so the metadata endpoint stays a cheap, stateless read.
pub fn next_run_times(tz: Tz) -> Vec<(&'static str, DateTime<Utc>)> {
    let now = Utc::now().with_timezone(&tz);
    vec![
        ("sync_stats", next_occurrence(now, &[Weekday::Mon, Weekday::Thu], 6, 0).with_timezone(&Utc)),
        ("sync_matchlogs", next_occurrence(now, &[Weekday::Tue], 7, 0).with_timezone(&Utc)),
    ]
}

fn next_occurrence(now: DateTime<Tz>, weekdays: &[Weekday], hour: u32, minute: u32) -> DateTime<Tz> {
    let tz = now.timezone();
    for days_ahead in 0..8i64 {
        let candidate_date = now.date_naive() + chrono::Duration::days(days_ahead);
        if !weekdays.contains(&candidate_date.weekday()) {
            continue;
        }
        let Some(naive) = candidate_date.and_hms_opt(hour, minute, 0) else { continue };
        let Some(candidate) = tz.from_local_datetime(&naive).single() else { continue };
        if candidate > now {
            return candidate;
        }
    }
    now
}

/// Builds the `tokio-cron-scheduler` instance with the two default jobs wired in
/// (§4.8 "Default trigger"). Cron expressions are six-field (seconds-first).
pub async fn build_scheduler(
    pool: PgPool,
    settings: Settings,
) -> Result<JobScheduler, EngineError> {
    let scheduler = JobScheduler::new().await.map_err(|e| EngineError::Config(e.to_string()))?;

    let stats_pool = pool.clone();
    let stats_settings = settings.clone();
    let stats_job = Job::new_async_tz("0 0 6 * * Mon,Thu", settings.scheduler_timezone, move |_uuid, _l| {
        let pool = stats_pool.clone();
        let settings = stats_settings.clone();
        let notifier_settings = stats_settings.clone();
        Box::pin(async move {
            let notifier = Notifier::from_settings(&notifier_settings);
            match run_job(&pool, &settings, JobKind::Stats, None, false, CancelToken::new()).await {
                Ok(report) => notifier.notify(&report).await,
                Err(err) => tracing::error!(error = %err, "SyncStats job failed to start"),
            }
        })
    })
    .map_err(|e| EngineError::Config(e.to_string()))?;
    scheduler.add(stats_job).await.map_err(|e| EngineError::Config(e.to_string()))?;

    let matchlogs_pool = pool.clone();
    let matchlogs_settings = settings.clone();
    let matchlogs_job = Job::new_async_tz("0 0 7 * * Tue", settings.scheduler_timezone, move |_uuid, _l| {
        let pool = matchlogs_pool.clone();
        let settings = matchlogs_settings.clone();
        let notifier_settings = matchlogs_settings.clone();
        Box::pin(async move {
            let notifier = Notifier::from_settings(&notifier_settings);
            match run_job(&pool, &settings, JobKind::Matchlogs, None, false, CancelToken::new()).await {
                Ok(report) => notifier.notify(&report).await,
                Err(err) => tracing::error!(error = %err, "SyncMatchlogs job failed to start"),
            }
        })
    })
    .map_err(|e| EngineError::Config(e.to_string()))?;
    scheduler.add(matchlogs_job).await.map_err(|e| EngineError::Config(e.to_string()))?;

    scheduler.start().await.map_err(|e| EngineError::Config(e.to_string()))?;
    Ok(scheduler)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn cancel_token_starts_uncancelled() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        token.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn national_team_label_detection() {
        assert!(is_national_team_label("2025"));
        assert!(!is_national_team_label("2025-2026"));
    }

    #[test]
    fn next_occurrence_lands_on_a_requested_weekday_in_the_future() {
        let tz = chrono_tz::Europe::Warsaw;
        let now = Utc::now().with_timezone(&tz);
        let next = next_occurrence(now, &[Weekday::Mon, Weekday::Thu], 6, 0);
        assert!(next > now);
        assert!(matches!(next.weekday(), Weekday::Mon | Weekday::Thu));
        assert_eq!(next.hour(), 6);
    }

    #[test]
    fn next_run_times_covers_both_default_jobs() {
        let runs = next_run_times(chrono_tz::Europe::Warsaw);
        assert_eq!(runs.len(), 2);
        assert!(runs.iter().all(|(_, at)| *at > Utc::now()));
    }
}
