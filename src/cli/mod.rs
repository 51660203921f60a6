//! CLI entry points (C12, §4.12).

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "player-tracker-backend")]
#[command(about = "Ingests, reconciles, and serves football player statistics")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Starts the HTTP API, and the scheduler if SCHEDULER_ENABLED is set.
    Serve {
        #[arg(long)]
        port: Option<u16>,
    },
    /// Runs one SyncStats pass immediately, for the whole roster or one player.
    SyncStats {
        #[arg(long)]
        player: Option<i64>,
        /// Resync every season the source exposes instead of just the current one.
        #[arg(long)]
        full: bool,
    },
    /// Runs one SyncMatchlogs pass immediately, for the whole roster or one player.
    SyncMatchlogs {
        #[arg(long)]
        player: Option<i64>,
        /// Resync every season the source exposes instead of just the current one.
        #[arg(long)]
        full: bool,
    },
    /// Creates the schema if it does not already exist, then exits.
    InitDb,
}
