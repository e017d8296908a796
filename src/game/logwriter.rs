// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! Server-side sink for aggregated game logs.

use super::{types::GameLog, GameError};
use std::path::{Path, PathBuf};
use tokio::{fs::OpenOptions, io::AsyncWriteExt, sync::Mutex};
use tracing::debug;

/// Appends game logs to a file, one line per record.
///
/// Writes are serialized so concurrent deliveries never interleave lines.
pub struct GameLogWriter {
    path: PathBuf,
    guard: Mutex<()>,
}

impl GameLogWriter {
    pub fn new(path: impl AsRef<Path>) -> Self {
        GameLogWriter {
            path: path.as_ref().to_path_buf(),
            guard: Mutex::new(()),
        }
    }

    /// File the logs are appended to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends `log` as a single line, creating the file if needed.
    ///
    /// # Parameters
    /// * `log` - Record to append, rendered with its `Display` form
    ///
    /// # Returns
    /// [`GameError::LogWriteError`] when the file cannot be opened or written
    pub async fn write(&self, log: &GameLog) -> Result<(), GameError> {
        let _guard = self.guard.lock().await;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|err| GameError::LogWriteError(err.to_string()))?;

        file.write_all(format!("{log}\n").as_bytes())
            .await
            .map_err(|err| GameError::LogWriteError(err.to_string()))?;
        file.flush()
            .await
            .map_err(|err| GameError::LogWriteError(err.to_string()))?;

        debug!("game log from {} written to {}", log.username, self.path.display());
        Ok(())
    }
}
