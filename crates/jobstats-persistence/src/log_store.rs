//! Append-log backed counter store.
//!
//! Layout: `<data_dir>/execution_stats.jsonl`, one JSON object per line, each
//! line the full post-increment `DayStat` for its day. The last line for a day
//! wins on replay. `<data_dir>/LOCK` carries an exclusive advisory lock for as
//! long as the store is open, so a second process cannot replay and append to
//! the same log.
//!
//! Concurrency:
//! - Each day has its own async write gate, so increments for one day are
//!   serialized while other days proceed independently.
//! - The published record for a day sits behind a short `RwLock` that is never
//!   held across I/O, so readers always see a whole pre- or post-increment
//!   value without waiting on a writer's fsync.
//! - The log file itself has a single writer lock held only for one append.
//! - Periodic compaction runs on the blocking pool. The bulk rewrite happens
//!   outside the writer lock; only the catch-up of records appended meanwhile
//!   and the rename happen under it.
//!
//! Crash safety: a record is published in memory only after its line has been
//! written (and synced when `sync_writes` is on). A failed append is truncated
//! away. A crash mid-append leaves a tail without a newline, which replay
//! drops, so an increment lands entirely or not at all.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use fs2::FileExt;
use jobstats_core::{DayKey, DayStat, StatsError, StatsResult};
use parking_lot::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::StoreConfig;
use crate::error::{PersistenceError, PersistenceResult};
use crate::store::CounterStore;

/// Log file name inside `data_dir`.
pub const LOG_FILE_NAME: &str = "execution_stats.jsonl";

/// Lock file name inside `data_dir`.
pub const LOCK_FILE_NAME: &str = "LOCK";

/// Per-day state.
struct DayCell {
    /// Serializes read-modify-write for this day.
    gate: tokio::sync::Mutex<()>,
    /// Last durably written record.
    current: RwLock<DayStat>,
}

impl DayCell {
    fn new(stat: DayStat) -> Self {
        Self {
            gate: tokio::sync::Mutex::new(()),
            current: RwLock::new(stat),
        }
    }
}

/// Open log file plus the last-wins view of what it contains.
struct LogWriter {
    path: PathBuf,
    file: File,
    /// Length of the file up to the last complete record.
    len: u64,
    latest: BTreeMap<DayKey, DayStat>,
    appends_since_compaction: usize,
}

impl LogWriter {
    /// Rewrite `latest` as one line per day and swap it in for the log at `path`.
    fn create_compacted(
        path: PathBuf,
        latest: BTreeMap<DayKey, DayStat>,
    ) -> PersistenceResult<Self> {
        let (file, len) = write_compacted(&path, &latest)?;
        install_compacted(&path, &file)?;

        Ok(Self {
            path,
            file,
            len,
            latest,
            appends_since_compaction: 0,
        })
    }

    /// Append one record. On failure the file is cut back to its previous length.
    fn append(&mut self, stat: &DayStat, sync: bool) -> PersistenceResult<()> {
        let line = encode_line(stat)?;
        let result = self.file.write_all(&line).and_then(|()| {
            if sync {
                self.file.sync_data()
            } else {
                Ok(())
            }
        });

        if let Err(e) = result {
            self.rollback();
            return Err(e.into());
        }

        self.len += line.len() as u64;
        self.latest.insert(stat.date, *stat);
        self.appends_since_compaction += 1;
        Ok(())
    }

    /// Drop anything written past the last complete record.
    fn rollback(&mut self) {
        if let Err(trunc_err) = self.file.set_len(self.len) {
            warn!(?trunc_err, "Failed to truncate partial stats record");
        }
    }
}

fn encode_line(stat: &DayStat) -> PersistenceResult<Vec<u8>> {
    let mut line = serde_json::to_vec(stat)?;
    line.push(b'\n');
    Ok(line)
}

fn compaction_path(path: &Path) -> PathBuf {
    path.with_extension("jsonl.compact")
}

/// Write `latest` to a fresh sibling of the log at `path`.
///
/// The sibling is neither synced nor renamed yet, so the old log stays intact
/// if anything fails before `install_compacted`.
fn write_compacted(
    path: &Path,
    latest: &BTreeMap<DayKey, DayStat>,
) -> PersistenceResult<(File, u64)> {
    let tmp = compaction_path(path);
    match fs::remove_file(&tmp) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }

    let file = OpenOptions::new().append(true).create_new(true).open(&tmp)?;
    let mut len = 0u64;
    {
        let mut writer = BufWriter::new(&file);
        for stat in latest.values() {
            let line = encode_line(stat)?;
            writer.write_all(&line)?;
            len += line.len() as u64;
        }
        writer.flush()?;
    }
    Ok((file, len))
}

/// Sync the sibling written by `write_compacted` and rename it over `path`.
fn install_compacted(path: &Path, file: &File) -> PersistenceResult<()> {
    file.sync_all()?;
    fs::rename(compaction_path(path), path)?;
    if let Err(e) = sync_parent_dir(path) {
        warn!(?e, path = %path.display(), "Failed to sync stats directory after compaction");
    }
    Ok(())
}

/// Compact the log owned by `log` without holding its lock during the rewrite.
///
/// Records appended while the snapshot is written are carried into the new
/// file under the lock, right before the swap. Returns the number of days in
/// the compacted log, or `None` if the store was closed in the meantime.
fn compact_log(log: &Mutex<Option<LogWriter>>) -> PersistenceResult<Option<usize>> {
    let (path, snapshot) = {
        let guard = log.lock();
        let Some(writer) = guard.as_ref() else {
            return Ok(None);
        };
        (writer.path.clone(), writer.latest.clone())
    };

    let (mut file, mut len) = write_compacted(&path, &snapshot)?;

    let mut guard = log.lock();
    let Some(writer) = guard.as_mut() else {
        if let Err(e) = fs::remove_file(compaction_path(&path)) {
            debug!(?e, "Failed to remove abandoned compaction file");
        }
        return Ok(None);
    };

    let mut tail = Vec::new();
    for (day, stat) in &writer.latest {
        if snapshot.get(day) != Some(stat) {
            tail.extend(encode_line(stat)?);
        }
    }
    file.write_all(&tail)?;
    len += tail.len() as u64;

    install_compacted(&path, &file)?;
    writer.file = file;
    writer.len = len;
    writer.appends_since_compaction = 0;
    Ok(Some(writer.latest.len()))
}

/// Marks a compaction in flight; clears the flag when dropped.
struct CompactionGuard(Arc<AtomicBool>);

impl CompactionGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        if flag.swap(true, Ordering::AcqRel) {
            return None;
        }
        Some(Self(flag.clone()))
    }
}

impl Drop for CompactionGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Take the exclusive advisory lock on `<dir>/LOCK`.
fn lock_data_dir(dir: &Path) -> PersistenceResult<File> {
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(dir.join(LOCK_FILE_NAME))?;
    match file.try_lock_exclusive() {
        Ok(()) => Ok(file),
        Err(e) if e.raw_os_error() == fs2::lock_contended_error().raw_os_error() => {
            Err(PersistenceError::Locked(dir.to_path_buf()))
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(unix)]
fn sync_parent_dir(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(dir) => File::open(dir)?.sync_all(),
        None => Ok(()),
    }
}

#[cfg(not(unix))]
fn sync_parent_dir(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

/// Rebuild the last-wins view from the log at `path`.
///
/// An incomplete final line (no trailing newline) is a write interrupted by a
/// crash and is dropped. Any other undecodable line is corruption.
fn replay(path: &Path) -> PersistenceResult<BTreeMap<DayKey, DayStat>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
        Err(e) => return Err(e.into()),
    };

    let complete_len = bytes
        .iter()
        .rposition(|b| *b == b'\n')
        .map(|i| i + 1)
        .unwrap_or(0);
    if complete_len < bytes.len() {
        warn!(
            path = %path.display(),
            dropped_bytes = bytes.len() - complete_len,
            "Dropping incomplete trailing stats record"
        );
    }

    let mut latest = BTreeMap::new();
    for (idx, line) in bytes[..complete_len].split(|b| *b == b'\n').enumerate() {
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        let stat: DayStat =
            serde_json::from_slice(line).map_err(|e| PersistenceError::Corrupt {
                line: idx + 1,
                reason: e.to_string(),
            })?;
        latest.insert(stat.date, stat);
    }

    Ok(latest)
}

/// Durable counter store backed by a JSON Lines append log.
pub struct LogCounterStore {
    config: StoreConfig,
    days: DashMap<DayKey, Arc<DayCell>>,
    /// `None` once closed.
    log: Arc<Mutex<Option<LogWriter>>>,
    compacting: Arc<AtomicBool>,
    /// Shared with in-flight compactions; the lock is released when the last
    /// handle closes.
    dir_lock: Mutex<Option<Arc<File>>>,
    closed: AtomicBool,
}

impl LogCounterStore {
    /// Open (or create) the store under `config.data_dir`.
    ///
    /// Fails with `StorageFailure` if another open store holds the directory.
    /// Replays the existing log and compacts it before accepting writes.
    pub fn open(config: StoreConfig) -> StatsResult<Self> {
        Ok(Self::open_inner(config)?)
    }

    fn open_inner(config: StoreConfig) -> PersistenceResult<Self> {
        fs::create_dir_all(&config.data_dir)?;
        let dir_lock = lock_data_dir(&config.data_dir)?;
        let path = config.data_dir.join(LOG_FILE_NAME);

        let latest = replay(&path)?;
        let writer = LogWriter::create_compacted(path, latest)?;

        let days = DashMap::new();
        for (day, stat) in &writer.latest {
            days.insert(*day, Arc::new(DayCell::new(*stat)));
        }

        info!(
            path = %writer.path.display(),
            days = writer.latest.len(),
            "Opened execution stats store"
        );

        Ok(Self {
            config,
            days,
            log: Arc::new(Mutex::new(Some(writer))),
            compacting: Arc::new(AtomicBool::new(false)),
            dir_lock: Mutex::new(Some(Arc::new(dir_lock))),
            closed: AtomicBool::new(false),
        })
    }

    /// Path of the backing log file.
    pub fn log_path(&self) -> PathBuf {
        self.config.data_dir.join(LOG_FILE_NAME)
    }

    /// Rewrite the log as one line per day.
    ///
    /// Returns immediately if a periodic compaction is already running.
    pub fn compact(&self) -> StatsResult<()> {
        self.ensure_open()?;
        let Some(_guard) = CompactionGuard::acquire(&self.compacting) else {
            debug!("Compaction already in progress");
            return Ok(());
        };
        let days = compact_log(&self.log)?.ok_or(StatsError::StoreClosed)?;
        info!(days, "Compacted execution stats log");
        Ok(())
    }

    fn ensure_open(&self) -> StatsResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StatsError::StoreClosed);
        }
        Ok(())
    }

    fn cell(&self, day: DayKey) -> Arc<DayCell> {
        self.days
            .entry(day)
            .or_insert_with(|| Arc::new(DayCell::new(DayStat::zero(day))))
            .value()
            .clone()
    }

    /// Durably append `stat`. Returns whether the log is due for compaction.
    fn persist(&self, stat: &DayStat) -> StatsResult<bool> {
        let mut log = self.log.lock();
        let writer = log.as_mut().ok_or(StatsError::StoreClosed)?;
        writer.append(stat, self.config.sync_writes)?;

        let threshold = self.config.compact_after_records;
        Ok(threshold > 0 && writer.appends_since_compaction >= threshold)
    }

    /// Compact on the blocking pool unless a compaction is already running.
    fn schedule_compaction(&self) {
        let Some(guard) = CompactionGuard::acquire(&self.compacting) else {
            return;
        };
        let log = self.log.clone();
        let dir_lock = self.dir_lock.lock().clone();
        tokio::task::spawn_blocking(move || {
            let _guard = guard;
            let _dir_lock = dir_lock;
            // Records are already durable; a failed compaction only delays cleanup.
            match compact_log(&log) {
                Ok(Some(days)) => debug!(days, "Compacted execution stats log"),
                Ok(None) => {}
                Err(e) => warn!(error = %e, "Execution stats log compaction failed"),
            }
        });
    }
}

impl CounterStore for LogCounterStore {
    async fn increment(
        &self,
        ctx: &CancellationToken,
        day: DayKey,
        success: bool,
    ) -> StatsResult<()> {
        self.ensure_open()?;
        if ctx.is_cancelled() {
            return Err(StatsError::Cancelled);
        }

        let cell = self.cell(day);
        let _gate = tokio::select! {
            biased;
            _ = ctx.cancelled() => return Err(StatsError::Cancelled),
            gate = cell.gate.lock() => gate,
        };
        if ctx.is_cancelled() {
            return Err(StatsError::Cancelled);
        }

        // No await point from here on: the write and the publish happen together.
        let next = cell.current.read().incremented(success);
        let compaction_due = self.persist(&next)?;
        *cell.current.write() = next;

        debug!(
            day = %day,
            success,
            success_count = next.success_count,
            failed_count = next.failed_count,
            "Execution stat incremented"
        );

        if compaction_due {
            self.schedule_compaction();
        }
        Ok(())
    }

    async fn get(&self, ctx: &CancellationToken, day: DayKey) -> StatsResult<DayStat> {
        self.ensure_open()?;
        if ctx.is_cancelled() {
            return Err(StatsError::Cancelled);
        }

        let stat = self
            .days
            .get(&day)
            .map(|cell| *cell.current.read())
            .unwrap_or_else(|| DayStat::zero(day));
        Ok(stat)
    }

    fn days(&self) -> StatsResult<Vec<DayKey>> {
        self.ensure_open()?;
        let log = self.log.lock();
        let writer = log.as_ref().ok_or(StatsError::StoreClosed)?;
        Ok(writer.latest.keys().copied().collect())
    }

    fn close(&self) -> StatsResult<()> {
        self.closed.store(true, Ordering::Release);
        if let Some(writer) = self.log.lock().take() {
            if let Err(e) = writer.file.sync_all() {
                warn!(?e, "Failed to sync stats log on close");
            }
            info!(path = %writer.path.display(), "Closed execution stats store");
        }
        self.dir_lock.lock().take();
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl Drop for LogCounterStore {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(?e, "Failed to close stats store on drop");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader};
    use std::time::Duration;
    use tempfile::TempDir;

    fn day(d: u32) -> DayKey {
        DayKey::from_ymd(2026, 10, d).unwrap()
    }

    fn open(dir: &TempDir) -> LogCounterStore {
        LogCounterStore::open(StoreConfig::with_data_dir(dir.path())).unwrap()
    }

    async fn wait_for_compaction(store: &LogCounterStore) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while store.compacting.load(Ordering::Acquire) {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
    }

    fn log_lines(store: &LogCounterStore) -> Vec<String> {
        let file = File::open(store.log_path()).unwrap();
        BufReader::new(file).lines().map(|l| l.unwrap()).collect()
    }

    #[tokio::test]
    async fn test_increment_and_get() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);
        let ctx = CancellationToken::new();

        store.increment(&ctx, day(19), true).await.unwrap();
        store.increment(&ctx, day(19), true).await.unwrap();
        store.increment(&ctx, day(19), false).await.unwrap();

        let stat = store.get(&ctx, day(19)).await.unwrap();
        assert_eq!(stat.success_count, 2);
        assert_eq!(stat.failed_count, 1);
        assert_eq!(stat.date, day(19));
    }

    #[tokio::test]
    async fn test_missing_day_is_zero() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);

        let stat = store.get(&CancellationToken::new(), day(3)).await.unwrap();
        assert_eq!(stat, DayStat::zero(day(3)));
        // Reads never create records.
        assert!(store.days().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let ctx = CancellationToken::new();
        {
            let store = open(&dir);
            store.increment(&ctx, day(18), true).await.unwrap();
            store.increment(&ctx, day(19), false).await.unwrap();
            store.increment(&ctx, day(19), false).await.unwrap();
            store.close().unwrap();
        }

        let store = open(&dir);
        assert_eq!(store.days().unwrap(), vec![day(18), day(19)]);
        let stat = store.get(&ctx, day(19)).await.unwrap();
        assert_eq!(stat.failed_count, 2);
        // Reopen compacts to one line per day.
        assert_eq!(log_lines(&store).len(), 2);
    }

    #[tokio::test]
    async fn test_torn_tail_is_dropped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(LOG_FILE_NAME);
        let good = serde_json::to_string(&DayStat::zero(day(19)).incremented(true)).unwrap();
        let mut content = format!("{good}\n");
        content.push_str("{\"date\":\"2026-10-19T00:00:00Z\",\"success_co");
        fs::write(&path, content).unwrap();

        let store = open(&dir);
        let ctx = CancellationToken::new();
        assert_eq!(store.get(&ctx, day(19)).await.unwrap().success_count, 1);

        store.increment(&ctx, day(19), true).await.unwrap();
        store.close().unwrap();

        let store = open(&dir);
        assert_eq!(store.get(&ctx, day(19)).await.unwrap().success_count, 2);
    }

    #[test]
    fn test_corrupt_line_fails_open() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(LOG_FILE_NAME);
        let good = serde_json::to_string(&DayStat::zero(day(19))).unwrap();
        fs::write(&path, format!("not json\n{good}\n")).unwrap();

        let err = LogCounterStore::open(StoreConfig::with_data_dir(dir.path()))
            .err()
            .unwrap();
        assert!(err.is_storage_failure(), "unexpected error: {err}");
        // The corrupt log is left untouched for inspection.
        assert!(fs::read_to_string(&path).unwrap().starts_with("not json"));
    }

    #[tokio::test]
    async fn test_closed_store_rejects_operations() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);
        let ctx = CancellationToken::new();

        store.close().unwrap();
        store.close().unwrap();
        assert!(store.is_closed());

        assert_eq!(
            store.increment(&ctx, day(19), true).await,
            Err(StatsError::StoreClosed)
        );
        assert_eq!(store.get(&ctx, day(19)).await, Err(StatsError::StoreClosed));
        assert_eq!(store.days(), Err(StatsError::StoreClosed));
        assert_eq!(store.compact(), Err(StatsError::StoreClosed));
    }

    #[tokio::test]
    async fn test_cancelled_before_start_has_no_effect() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);
        let ctx = CancellationToken::new();
        ctx.cancel();

        assert_eq!(
            store.increment(&ctx, day(19), true).await,
            Err(StatsError::Cancelled)
        );
        assert_eq!(store.get(&ctx, day(19)).await, Err(StatsError::Cancelled));

        let fresh = CancellationToken::new();
        assert!(store.get(&fresh, day(19)).await.unwrap().is_zero());
        assert!(log_lines(&store).is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_while_waiting_for_day_lock() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(open(&dir));
        let cell = store.cell(day(19));
        let held = cell.gate.lock().await;

        let ctx = CancellationToken::new();
        let task = {
            let store = store.clone();
            let ctx = ctx.clone();
            tokio::spawn(async move { store.increment(&ctx, day(19), true).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        ctx.cancel();
        assert_eq!(task.await.unwrap(), Err(StatsError::Cancelled));
        drop(held);

        let stat = store.get(&CancellationToken::new(), day(19)).await.unwrap();
        assert!(stat.is_zero());
    }

    #[tokio::test]
    async fn test_other_days_not_blocked() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);
        let cell = store.cell(day(18));
        let _held = cell.gate.lock().await;

        let ctx = CancellationToken::new();
        let result = tokio::time::timeout(
            Duration::from_secs(1),
            store.increment(&ctx, day(19), true),
        )
        .await;
        assert!(matches!(result, Ok(Ok(()))));
        // Reads of the locked day still return immediately.
        assert!(store.get(&ctx, day(18)).await.unwrap().is_zero());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_increments_are_not_lost() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(open(&dir));
        let ctx = CancellationToken::new();

        let mut handles = Vec::new();
        for worker in 0..8 {
            let store = store.clone();
            let ctx = ctx.clone();
            handles.push(tokio::spawn(async move {
                for i in 0..25 {
                    let success = (worker + i) % 3 != 0;
                    let target = if i % 2 == 0 { day(18) } else { day(19) };
                    store.increment(&ctx, target, success).await.unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let mut expected = BTreeMap::new();
        for worker in 0..8 {
            for i in 0..25 {
                let success = (worker + i) % 3 != 0;
                let target = if i % 2 == 0 { day(18) } else { day(19) };
                let entry = expected.entry(target).or_insert((0u64, 0u64));
                if success {
                    entry.0 += 1;
                } else {
                    entry.1 += 1;
                }
            }
        }

        for (target, (success, failed)) in &expected {
            let stat = store.get(&ctx, *target).await.unwrap();
            assert_eq!((stat.success_count, stat.failed_count), (*success, *failed));
        }

        store.close().unwrap();
        let reopened = open(&dir);
        for (target, (success, failed)) in &expected {
            let stat = reopened.get(&ctx, *target).await.unwrap();
            assert_eq!((stat.success_count, stat.failed_count), (*success, *failed));
        }
    }

    #[tokio::test]
    async fn test_periodic_compaction() {
        let dir = TempDir::new().unwrap();
        let config = StoreConfig {
            compact_after_records: 5,
            ..StoreConfig::with_data_dir(dir.path())
        };
        let store = LogCounterStore::open(config.clone()).unwrap();
        let ctx = CancellationToken::new();

        for i in 0..5u32 {
            let target = if i % 2 == 0 { day(18) } else { day(19) };
            store.increment(&ctx, target, true).await.unwrap();
        }
        // The fifth append hands a compaction to the blocking pool.
        wait_for_compaction(&store).await;
        assert_eq!(log_lines(&store).len(), 2);

        for i in 5..12u32 {
            let target = if i % 2 == 0 { day(18) } else { day(19) };
            store.increment(&ctx, target, true).await.unwrap();
        }
        wait_for_compaction(&store).await;
        store.close().unwrap();

        let store = LogCounterStore::open(config).unwrap();
        assert_eq!(store.get(&ctx, day(18)).await.unwrap().success_count, 6);
        assert_eq!(store.get(&ctx, day(19)).await.unwrap().success_count, 6);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_appends_during_compaction_are_kept() {
        let dir = TempDir::new().unwrap();
        let config = StoreConfig {
            compact_after_records: 3,
            sync_writes: false,
            ..StoreConfig::with_data_dir(dir.path())
        };
        let store = Arc::new(LogCounterStore::open(config.clone()).unwrap());
        let ctx = CancellationToken::new();

        let mut handles = Vec::new();
        for worker in 0..4u32 {
            let store = store.clone();
            let ctx = ctx.clone();
            handles.push(tokio::spawn(async move {
                for i in 0..50u32 {
                    store
                        .increment(&ctx, day(10 + (worker + i) % 4), true)
                        .await
                        .unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        wait_for_compaction(&store).await;
        store.close().unwrap();

        let store = LogCounterStore::open(config).unwrap();
        let mut total = 0;
        for d in 10..14 {
            total += store.get(&ctx, day(d)).await.unwrap().success_count;
        }
        assert_eq!(total, 200);
    }

    #[tokio::test]
    async fn test_failed_compaction_keeps_log() {
        let dir = TempDir::new().unwrap();
        let config = StoreConfig {
            compact_after_records: 2,
            ..StoreConfig::with_data_dir(dir.path())
        };
        let store = LogCounterStore::open(config.clone()).unwrap();
        let ctx = CancellationToken::new();

        // A directory where the compaction file goes makes every rewrite fail.
        let blocker = compaction_path(&store.log_path());
        fs::create_dir(&blocker).unwrap();

        for _ in 0..3 {
            store.increment(&ctx, day(19), true).await.unwrap();
            wait_for_compaction(&store).await;
        }
        assert_eq!(store.get(&ctx, day(19)).await.unwrap().success_count, 3);
        assert_eq!(log_lines(&store).len(), 3);
        assert!(store.compact().unwrap_err().is_storage_failure());
        store.close().unwrap();

        fs::remove_dir(&blocker).unwrap();
        let store = LogCounterStore::open(config).unwrap();
        assert_eq!(store.get(&ctx, day(19)).await.unwrap().success_count, 3);
        assert_eq!(log_lines(&store).len(), 1);
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_failed_append_is_not_published() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);
        let ctx = CancellationToken::new();
        store.increment(&ctx, day(19), true).await.unwrap();

        // Every write to /dev/full fails with ENOSPC.
        {
            let mut log = store.log.lock();
            let writer = log.as_mut().unwrap();
            writer.file = OpenOptions::new().write(true).open("/dev/full").unwrap();
        }

        let err = store.increment(&ctx, day(19), true).await.unwrap_err();
        assert!(err.is_storage_failure(), "unexpected error: {err}");
        let err = store.increment(&ctx, day(20), false).await.unwrap_err();
        assert!(err.is_storage_failure(), "unexpected error: {err}");

        assert_eq!(store.get(&ctx, day(19)).await.unwrap().success_count, 1);
        assert!(store.get(&ctx, day(20)).await.unwrap().is_zero());
        assert_eq!(store.days().unwrap(), vec![day(19)]);
        store.close().unwrap();

        let store = open(&dir);
        assert_eq!(store.days().unwrap(), vec![day(19)]);
        assert_eq!(store.get(&ctx, day(19)).await.unwrap().success_count, 1);
    }

    #[tokio::test]
    async fn test_partial_append_is_cut_back() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);
        let ctx = CancellationToken::new();
        store.increment(&ctx, day(19), true).await.unwrap();

        {
            let mut log = store.log.lock();
            let writer = log.as_mut().unwrap();
            writer
                .file
                .write_all(b"{\"date\":\"2026-10-19T00:00:00Z\",\"succ")
                .unwrap();
            writer.rollback();
        }

        // Without the cut, this record would be glued onto the fragment.
        store.increment(&ctx, day(19), false).await.unwrap();
        assert_eq!(log_lines(&store).len(), 2);
        store.close().unwrap();

        let store = open(&dir);
        let stat = store.get(&ctx, day(19)).await.unwrap();
        assert_eq!((stat.success_count, stat.failed_count), (1, 1));
    }

    #[tokio::test]
    async fn test_second_open_is_refused() {
        let dir = TempDir::new().unwrap();
        let first = open(&dir);
        let ctx = CancellationToken::new();
        first.increment(&ctx, day(19), true).await.unwrap();

        let err = LogCounterStore::open(StoreConfig::with_data_dir(dir.path()))
            .err()
            .unwrap();
        assert!(err.is_storage_failure(), "unexpected error: {err}");
        assert!(err.to_string().contains("locked"));

        // The refused open left the first store's log alone.
        first.increment(&ctx, day(19), true).await.unwrap();
        assert_eq!(log_lines(&first).len(), 2);
        first.close().unwrap();

        let second = open(&dir);
        assert_eq!(second.get(&ctx, day(19)).await.unwrap().success_count, 2);
    }

    #[tokio::test]
    async fn test_manual_compaction_keeps_values() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);
        let ctx = CancellationToken::new();

        for _ in 0..3 {
            store.increment(&ctx, day(19), false).await.unwrap();
        }
        assert_eq!(log_lines(&store).len(), 3);

        store.compact().unwrap();
        let lines = log_lines(&store);
        assert_eq!(lines.len(), 1);
        let stat: DayStat = serde_json::from_str(&lines[0]).unwrap();
        assert_eq!(stat.failed_count, 3);

        // Appends after compaction land in the new file.
        store.increment(&ctx, day(19), true).await.unwrap();
        assert_eq!(log_lines(&store).len(), 2);
    }
}
