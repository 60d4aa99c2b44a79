//! Append-only JSONL persistence.
//!
//! One JSON object per line. The whole file is read once at open time and
//! kept in memory; each append goes to disk first (on a blocking thread)
//! and only then into the cache, so a failed write never shows up in reads.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;

use felos_domain::error::{Error, Result};

use crate::store::{newest_first, LedgerStore};
use crate::transaction::Transaction;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Generic JSONL file
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A JSONL file plus its in-memory mirror.
pub struct JsonlFile<T> {
    path: PathBuf,
    cache: RwLock<Vec<T>>,
    /// Serializes appends so file order matches cache order.
    write_lock: tokio::sync::Mutex<()>,
}

impl<T> JsonlFile<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    /// Open (or create the parent directory of) `path` and load its lines.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(Error::Io)?;
        }
        let lines = read_jsonl(&path)?;
        tracing::debug!(path = %path.display(), entries = lines.len(), "jsonl file loaded");
        Ok(Self {
            path,
            cache: RwLock::new(lines),
            write_lock: tokio::sync::Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one item: disk first, then cache.
    pub async fn append(&self, item: T) -> Result<()> {
        let mut line = serde_json::to_string(&item)?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || append_line(&path, &line))
            .await
            .map_err(|e| Error::Other(format!("spawn_blocking join: {e}")))??;

        self.cache.write().push(item);
        Ok(())
    }

    /// Run `f` over the cached items without cloning them.
    pub fn with_items<R>(&self, f: impl FnOnce(&[T]) -> R) -> R {
        f(&self.cache.read())
    }

    pub fn snapshot(&self) -> Vec<T> {
        self.cache.read().clone()
    }
}

fn append_line(path: &Path, line: &str) -> Result<()> {
    use std::io::Write;
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(Error::Io)?;
    file.write_all(line.as_bytes()).map_err(Error::Io)?;
    Ok(())
}

fn read_jsonl<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let raw = std::fs::read_to_string(path).map_err(Error::Io)?;
    let mut items = Vec::new();
    for (lineno, line) in raw.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<T>(line) {
            Ok(item) => items.push(item),
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    line = lineno + 1,
                    error = %e,
                    "skipping malformed jsonl line"
                );
            }
        }
    }
    Ok(items)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Ledger backend
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Ledger persisted to `<state_dir>/transactions.jsonl`.
pub struct JsonlLedger {
    file: Arc<JsonlFile<Transaction>>,
}

impl JsonlLedger {
    pub const FILE_NAME: &'static str = "transactions.jsonl";

    pub fn open(state_dir: &Path) -> Result<Self> {
        let file = JsonlFile::open(state_dir.join(Self::FILE_NAME))?;
        Ok(Self {
            file: Arc::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

#[async_trait::async_trait]
impl LedgerStore for JsonlLedger {
    async fn append(&self, tx: Transaction) -> Result<()> {
        self.file.append(tx).await
    }

    async fn by_session(&self, session_id: &str) -> Result<Vec<Transaction>> {
        Ok(self.file.with_items(|items| {
            items
                .iter()
                .filter(|t| t.session_id == session_id)
                .cloned()
                .collect()
        }))
    }

    async fn recent(&self, limit: usize) -> Result<Vec<Transaction>> {
        Ok(self.file.with_items(|items| newest_first(items, limit)))
    }

    async fn all(&self) -> Result<Vec<Transaction>> {
        Ok(self.file.snapshot())
    }

    fn backend_name(&self) -> &'static str {
        "jsonl"
    }
}
