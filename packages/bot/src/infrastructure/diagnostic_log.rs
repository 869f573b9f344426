//! Append-only diagnostic files for socket events and errors.
//!
//! Independent of `tracing`: these files hold full payloads of what the room
//! socket delivered. Failures to write are reported through `tracing` and
//! never reach the caller.

use std::{
    io,
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use async_trait::async_trait;
use clap::ValueEnum;
use roomlink_shared::time::Clock;
use serde::Serialize;
use serde_json::Value;
use tokio::{fs, io::AsyncWriteExt};

use crate::domain::DiagnosticSink;

pub use crate::domain::streams;

const DEFAULT_EXTENSION: &str = "log";

/// Verbosity of the diagnostic files
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogPolicy {
    /// Nothing is written
    #[default]
    Off,
    /// One fixed file per logical stream
    On,
    /// One new file per record, numbered across all streams
    Debug,
}

/// Writer of diagnostic records under a log directory
pub struct DiagnosticLogger {
    dir: PathBuf,
    policy: LogPolicy,
    /// Shared by every stream; starts at zero for each logger
    sequence: AtomicU64,
    clock: Arc<dyn Clock>,
}

impl DiagnosticLogger {
    pub fn new(dir: impl Into<PathBuf>, policy: LogPolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            dir: dir.into(),
            policy,
            sequence: AtomicU64::new(0),
            clock,
        }
    }

    /// Append `payload` to the file for `stream`.
    ///
    /// Returns the file written, or `None` if nothing was written.
    pub async fn write<T>(&self, stream: &str, payload: &T) -> Option<PathBuf>
    where
        T: Serialize + ?Sized,
    {
        let file_name = self.file_name(stream)?;
        let path = self.dir.join(file_name);

        match self.append(&path, payload).await {
            Ok(()) => Some(path),
            Err(e) => {
                tracing::warn!(
                    stream,
                    path = %path.display(),
                    "Failed to write diagnostic log: {}",
                    e
                );
                None
            }
        }
    }

    fn file_name(&self, stream: &str) -> Option<String> {
        match self.policy {
            LogPolicy::Off => None,
            LogPolicy::On => Some(with_extension(stream)),
            LogPolicy::Debug => {
                let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
                Some(format!("{:06}_{}", sequence, with_extension(stream)))
            }
        }
    }

    async fn append<T>(&self, path: &Path, payload: &T) -> io::Result<()>
    where
        T: Serialize + ?Sized,
    {
        let pretty = serde_json::to_string_pretty(payload).map_err(io::Error::other)?;
        let record = format!("{}: {}\n", self.clock.now_iso8601(), pretty);

        fs::create_dir_all(&self.dir).await?;
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        file.write_all(record.as_bytes()).await?;
        file.flush().await
    }
}

#[async_trait]
impl DiagnosticSink for DiagnosticLogger {
    async fn record(&self, stream: &str, payload: &Value) {
        self.write(stream, payload).await;
    }
}

fn with_extension(name: &str) -> String {
    if Path::new(name).extension().is_some() {
        name.to_string()
    } else {
        format!("{name}.{DEFAULT_EXTENSION}")
    }
}
