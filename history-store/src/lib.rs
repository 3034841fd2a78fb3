use std::borrow::Cow;
use std::collections::HashSet;
use std::io::{ErrorKind, SeekFrom};
use std::path::{Path, PathBuf};
use subwatch_core::HistoryError;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};


/// Append-only record of post identifiers that have already been processed.
///
/// The whole file is loaded into memory on open. Every new identifier is
/// appended and flushed before `record` returns, so a crash never loses an
/// identifier the monitor has acted on.
#[derive(Debug)]
pub struct HistoryStore {
    path: PathBuf,
    seen: RwLock<HashSet<String>>,
    writer: Mutex<Option<File>>,
}

impl HistoryStore {
    /// Loads the history file at `path`. A missing file is an empty history.
    ///
    /// If the file exists but cannot be read the store refuses to start, since
    /// running with an empty history would re-announce every post. Lines that
    /// are not valid UTF-8 are skipped.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, HistoryError> {
        let path = path.into();
        let seen = load_identifiers(&path)?;

        if let Err(source) = std::fs::OpenOptions::new()
            .append(true)
            .create(true)
            .open(&path)
        {
            warn!(
                "History file {} is not writable ({}); continuing in memory",
                path.display(),
                source
            );
        }

        info!(
            "Loaded {} identifiers from history file {}",
            seen.len(),
            path.display()
        );

        Ok(Self {
            path,
            seen: RwLock::new(seen),
            writer: Mutex::new(None),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn has(&self, id: &str) -> bool {
        self.seen.read().await.contains(&*normalize_id(id))
    }

    /// Atomically checks and records `id`.
    ///
    /// Returns `Ok(false)` if the identifier was already known (or blank) and
    /// `Ok(true)` if it was new and has been persisted. A disk failure returns
    /// `Err`, which only ever happens for new identifiers: the in-memory set is
    /// updated regardless, so the caller should treat the post as new.
    ///
    /// Line breaks inside `id` are folded into single spaces so that every
    /// identifier occupies exactly one line of the file.
    pub async fn record(&self, id: &str) -> Result<bool, HistoryError> {
        let id = normalize_id(id);
        if id.is_empty() {
            return Ok(false);
        }

        {
            let mut seen = self.seen.write().await;
            if !seen.insert(id.to_string()) {
                return Ok(false);
            }
        }

        self.append(&id).await?;
        debug!("Recorded {} in history", id);
        Ok(true)
    }

    pub async fn len(&self) -> usize {
        self.seen.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.seen.read().await.is_empty()
    }

    async fn append(&self, id: &str) -> Result<(), HistoryError> {
        let mut writer = self.writer.lock().await;

        let mut file = match writer.take() {
            Some(file) => file,
            None => open_for_append(&self.path)
                .await
                .map_err(|source| HistoryError::Write {
                    path: self.path.clone(),
                    source,
                })?,
        };

        match write_line(&mut file, id).await {
            Ok(()) => {
                *writer = Some(file);
                Ok(())
            }
            // The handle is dropped so the next record reopens the file.
            Err(source) => Err(HistoryError::Write {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

fn normalize_id(id: &str) -> Cow<'_, str> {
    let id = id.trim();
    if !id.contains(['\n', '\r']) {
        return Cow::Borrowed(id);
    }
    let folded = id
        .split(['\n', '\r'])
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    debug!("Folded line breaks out of identifier {:?}", id);
    Cow::Owned(folded)
}

fn load_identifiers(path: &Path) -> Result<HashSet<String>, HistoryError> {
    let raw = match std::fs::read(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(HashSet::new()),
        Err(source) => {
            return Err(HistoryError::Load {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let mut seen = HashSet::new();
    let mut skipped = 0usize;
    for line in raw.split(|byte| *byte == b'\n') {
        match std::str::from_utf8(line) {
            Ok(line) => {
                let line = line.trim();
                if !line.is_empty() {
                    seen.insert(line.to_string());
                }
            }
            Err(_) => skipped += 1,
        }
    }

    if skipped > 0 {
        warn!(
            "Skipped {} unreadable lines in history file {}",
            skipped,
            path.display()
        );
    }
    Ok(seen)
}

/// Opens the file for appending, terminating a dangling last line first so the
/// next identifier starts on its own line.
async fn open_for_append(path: &Path) -> std::io::Result<File> {
    let mut file = OpenOptions::new()
        .read(true)
        .append(true)
        .create(true)
        .open(path)
        .await?;

    if file.metadata().await?.len() > 0 {
        let mut last = [0u8; 1];
        file.seek(SeekFrom::End(-1)).await?;
        file.read_exact(&mut last).await?;
        if last[0] != b'\n' {
            file.write_all(b"\n").await?;
            file.flush().await?;
        }
    }

    Ok(file)
}

async fn write_line(file: &mut File, id: &str) -> std::io::Result<()> {
    file.write_all(format!("{}\n", id).as_bytes()).await?;
    file.flush().await
}
