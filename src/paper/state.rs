//! JSON persistence of the paper environment
//!
//! The CLI runs one command per process, so ledger balances, market positions,
//! trust flags and straddle rounds are written to a state file after every
//! command and read back on the next one. A missing file means a fresh
//! environment; a corrupt one is an error rather than a silent reset, since it
//! holds fund balances.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::ledger::LedgerSnapshot;
use super::market::MarketSnapshot;
use crate::common::errors::{Result, StraddleError};
use crate::strategy::StraddlePosition;
use crate::trust::FeeCounterSnapshot;

const STATE_VERSION: u32 = 1;

/// Everything needed to rebuild a [`super::PaperEnvironment`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperSnapshot {
    pub version: u32,
    pub ledger: LedgerSnapshot,
    pub market: MarketSnapshot,
    pub fee_counter: FeeCounterSnapshot,
    pub rounds: Vec<StraddlePosition>,
    pub saved_at: DateTime<Utc>,
}

impl PaperSnapshot {
    pub fn new(
        ledger: LedgerSnapshot,
        market: MarketSnapshot,
        fee_counter: FeeCounterSnapshot,
        rounds: Vec<StraddlePosition>,
    ) -> Self {
        Self {
            version: STATE_VERSION,
            ledger,
            market,
            fee_counter,
            rounds,
            saved_at: Utc::now(),
        }
    }
}

/// Reads and writes the state file
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted snapshot, `None` if nothing was saved yet
    pub fn load(&self) -> Result<Option<PaperSnapshot>> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "No state file, starting fresh");
            return Ok(None);
        }

        let file = File::open(&self.path)?;
        let snapshot: PaperSnapshot = serde_json::from_reader(BufReader::new(file))?;
        if snapshot.version != STATE_VERSION {
            return Err(StraddleError::Persistence(format!(
                "state file {} has version {}, expected {}",
                self.path.display(),
                snapshot.version,
                STATE_VERSION
            )));
        }

        info!(
            path = %self.path.display(),
            rounds = snapshot.rounds.len(),
            saved_at = %snapshot.saved_at,
            "Loaded paper state"
        );
        Ok(Some(snapshot))
    }

    /// Write the snapshot, creating parent directories as needed
    pub fn save(&self, snapshot: &PaperSnapshot) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        // stage beside the target, then rename over it
        let staging = self.path.with_extension("json.tmp");
        {
            let writer = BufWriter::new(File::create(&staging)?);
            serde_json::to_writer_pretty(writer, snapshot)?;
        }
        fs::rename(&staging, &self.path)?;

        debug!(path = %self.path.display(), "Saved paper state");
        Ok(())
    }

    /// Remove the state file if present
    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
            info!(path = %self.path.display(), "Cleared paper state");
        }
        Ok(())
    }
}
