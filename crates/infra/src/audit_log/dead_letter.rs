//! JSON-lines dead-letter log for violations the primary log rejected.
//!
//! Each record is one line. Appends are serialized through a mutex and run on
//! the blocking pool. [`FileDeadLetterLog::replay_into`] drains the file into
//! a recovered primary log; records the primary still rejects stay parked.

use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::instrument;

use bitflow_governance::{AuditLog, StoreError, ViolationRecord};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayReport {
    pub replayed: usize,
    pub requeued: usize,
}

#[derive(Debug, Clone)]
pub struct FileDeadLetterLog {
    path: Arc<PathBuf>,
    write_lock: Arc<Mutex<()>>,
}

impl FileDeadLetterLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Arc::new(path.into()),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Everything currently parked in the file, oldest first.
    pub async fn records(&self) -> Result<Vec<ViolationRecord>, StoreError> {
        let path = Arc::clone(&self.path);
        let lock = Arc::clone(&self.write_lock);
        run_blocking(move || {
            let _guard = lock
                .lock()
                .map_err(|_| StoreError::Unavailable("dead-letter lock poisoned".into()))?;
            read_records(&path)
        })
        .await
    }

    /// Move parked records into `primary`.
    ///
    /// The file is only rewritten after the primary has answered for every
    /// parked record, and then only the accepted records are dropped from it.
    /// Records appended while the replay runs are kept.
    #[instrument(skip(self, primary), fields(path = %self.path.display()), err)]
    pub async fn replay_into(&self, primary: &dyn AuditLog) -> Result<ReplayReport, StoreError> {
        let parked = self.records().await?;

        let mut report = ReplayReport::default();
        let mut accepted = HashSet::new();
        for record in &parked {
            match primary.append(record).await {
                Ok(()) => {
                    accepted.insert(record.id);
                    report.replayed += 1;
                }
                Err(err) => {
                    tracing::warn!(violation_id = %record.id, error = %err, "replay failed; record stays parked");
                    report.requeued += 1;
                }
            }
        }

        if !accepted.is_empty() {
            let path = Arc::clone(&self.path);
            let lock = Arc::clone(&self.write_lock);
            run_blocking(move || {
                let _guard = lock
                    .lock()
                    .map_err(|_| StoreError::Unavailable("dead-letter lock poisoned".into()))?;
                let remaining: Vec<ViolationRecord> = read_records(&path)?
                    .into_iter()
                    .filter(|r| !accepted.contains(&r.id))
                    .collect();
                rewrite_records(&path, &remaining)
            })
            .await?;
        }

        tracing::info!(replayed = report.replayed, requeued = report.requeued, "dead-letter replay finished");
        Ok(report)
    }
}

#[async_trait::async_trait]
impl AuditLog for FileDeadLetterLog {
    async fn append(&self, record: &ViolationRecord) -> Result<(), StoreError> {
        let mut line = serde_json::to_string(record)
            .map_err(|e| StoreError::Query(format!("failed to serialize violation {}: {e}", record.id)))?;
        line.push('\n');

        let path = Arc::clone(&self.path);
        let lock = Arc::clone(&self.write_lock);
        run_blocking(move || {
            let _guard = lock
                .lock()
                .map_err(|_| StoreError::Unavailable("dead-letter lock poisoned".into()))?;
            let mut file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&*path)
                .map_err(|e| io_error("open", &path, e))?;
            file.write_all(line.as_bytes())
                .and_then(|_| file.sync_data())
                .map_err(|e| io_error("write", &path, e))
        })
        .await
    }
}

async fn run_blocking<T, F>(f: F) -> Result<T, StoreError>
where
    F: FnOnce() -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| StoreError::Unavailable(format!("dead-letter task failed: {e}")))?
}

fn read_records(path: &Path) -> Result<Vec<ViolationRecord>, StoreError> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(io_error("open", path, e)),
    };

    let mut records = Vec::new();
    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|e| io_error("read", path, e))?;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(&line).map_err(|e| {
            StoreError::Query(format!("corrupt dead-letter line {} in {}: {e}", idx + 1, path.display()))
        })?;
        records.push(record);
    }
    Ok(records)
}

/// Replace the file with `records` via a sibling temp file and a rename.
fn rewrite_records(path: &Path, records: &[ViolationRecord]) -> Result<(), StoreError> {
    if records.is_empty() {
        return match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error("remove", path, e)),
        };
    }

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".replay");
    let tmp = PathBuf::from(tmp_name);

    let mut contents = String::new();
    for record in records {
        let line = serde_json::to_string(record)
            .map_err(|e| StoreError::Query(format!("failed to serialize violation {}: {e}", record.id)))?;
        contents.push_str(&line);
        contents.push('\n');
    }

    let mut file = File::create(&tmp).map_err(|e| io_error("create", &tmp, e))?;
    file.write_all(contents.as_bytes())
        .and_then(|_| file.sync_data())
        .map_err(|e| io_error("write", &tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| io_error("rename", path, e))
}

fn io_error(op: &str, path: &Path, err: std::io::Error) -> StoreError {
    StoreError::Unavailable(format!("dead-letter {op} failed for {}: {err}", path.display()))
}
