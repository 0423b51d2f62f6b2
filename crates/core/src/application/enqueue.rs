// Enqueue Use Case

use crate::domain::{DomainError, ItemId, ItemState, QueueItem};
use crate::error::{AppError, Result};
use crate::port::{ItemStore, TimeProvider};
use chrono::{DateTime, TimeDelta, Utc};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

/// Bumps tried when another process took the same id
const MAX_ID_ATTEMPTS: usize = 16;

/// Copies external files into Pending under ordered ids
pub struct Enqueuer {
    store: Arc<dyn ItemStore>,
    time_provider: Arc<dyn TimeProvider>,
    last_instant: Mutex<Option<DateTime<Utc>>>,
}

impl Enqueuer {
    pub fn new(store: Arc<dyn ItemStore>, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            store,
            time_provider,
            last_instant: Mutex::new(None),
        }
    }

    /// Enqueue a copy of the file at `source`
    ///
    /// The source file is read, never moved or modified.
    ///
    /// # Errors
    /// - AppError::SourceNotFound if `source` is missing or not a regular file
    /// - AppError::Domain if the file name is not valid UTF-8
    pub async fn enqueue(&self, source: &Path) -> Result<ItemId> {
        match tokio::fs::metadata(source).await {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => return Err(AppError::SourceNotFound(source.to_path_buf())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AppError::SourceNotFound(source.to_path_buf()))
            }
            Err(e) => return Err(e.into()),
        }
        let original_name = source_basename(source)?;
        let payload = tokio::fs::read(source).await?;

        let mut instant = self.next_instant();
        for _ in 0..MAX_ID_ATTEMPTS {
            let id = ItemId::new(instant, &original_name)?;
            match self.store.put(ItemState::Pending, &id, &payload).await {
                Ok(item) => {
                    info!(
                        item_id = %item.id,
                        source = %source.display(),
                        size_bytes = item.size_bytes,
                        "Item enqueued"
                    );
                    return Ok(item.id);
                }
                Err(AppError::AlreadyExists { .. }) => {
                    warn!(item_id = %id, "Item id taken, bumping enqueue instant");
                    instant = self.bump_past(instant);
                }
                Err(e) => return Err(e),
            }
        }

        Err(AppError::Internal(format!(
            "could not allocate a unique id for '{original_name}' after {MAX_ID_ATTEMPTS} attempts"
        )))
    }

    /// Enqueue an item directly from bytes (producers that never touch disk)
    pub async fn enqueue_bytes(&self, original_name: &str, payload: &[u8]) -> Result<QueueItem> {
        let mut instant = self.next_instant();
        for _ in 0..MAX_ID_ATTEMPTS {
            let id = ItemId::new(instant, original_name)?;
            match self.store.put(ItemState::Pending, &id, payload).await {
                Err(AppError::AlreadyExists { .. }) => instant = self.bump_past(instant),
                other => return other,
            }
        }
        Err(AppError::Internal(format!(
            "could not allocate a unique id for '{original_name}' after {MAX_ID_ATTEMPTS} attempts"
        )))
    }

    /// Clock reading forced strictly past anything issued by this enqueuer
    fn next_instant(&self) -> DateTime<Utc> {
        let now = self.time_provider.now();
        let mut last = self.last_instant.lock().unwrap_or_else(|e| e.into_inner());
        let instant = match *last {
            Some(prev) if now <= prev => prev + TimeDelta::microseconds(1),
            _ => now,
        };
        *last = Some(instant);
        instant
    }

    fn bump_past(&self, instant: DateTime<Utc>) -> DateTime<Utc> {
        let bumped = instant + TimeDelta::microseconds(1);
        let mut last = self.last_instant.lock().unwrap_or_else(|e| e.into_inner());
        if last.map_or(true, |prev| bumped > prev) {
            *last = Some(bumped);
        }
        bumped
    }
}

fn source_basename(source: &Path) -> Result<String> {
    let name = source
        .file_name()
        .ok_or_else(|| AppError::SourceNotFound(source.to_path_buf()))?;
    name.to_str().map(str::to_string).ok_or_else(|| {
        DomainError::ValidationError(format!(
            "file name is not valid UTF-8: {}",
            name.to_string_lossy()
        ))
        .into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::item_store::mocks::InMemoryItemStore;
    use crate::port::time_provider::mocks::FixedTimeProvider;
    use chrono::TimeZone;

    fn fixed_clock() -> Arc<FixedTimeProvider> {
        Arc::new(FixedTimeProvider::new(
            Utc.with_ymd_and_hms(2026, 10, 16, 9, 30, 0).unwrap(),
        ))
    }

    #[tokio::test]
    async fn test_same_instant_still_yields_increasing_ids() {
        let store = Arc::new(InMemoryItemStore::new());
        let enqueuer = Enqueuer::new(store.clone(), fixed_clock());

        let a = enqueuer.enqueue_bytes("b.txt", b"1").await.unwrap();
        let b = enqueuer.enqueue_bytes("a.txt", b"2").await.unwrap();
        let c = enqueuer.enqueue_bytes("a.txt", b"3").await.unwrap();

        assert!(a.id < b.id);
        assert!(b.id < c.id);
        assert_eq!(store.count(ItemState::Pending).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_id_carries_clock_reading() {
        let store = Arc::new(InMemoryItemStore::new());
        let clock = fixed_clock();
        let start = clock.now();
        let enqueuer = Enqueuer::new(store, clock.clone());

        let first = enqueuer.enqueue_bytes("a.txt", b"1").await.unwrap();
        clock.advance(TimeDelta::seconds(90));
        let later = enqueuer.enqueue_bytes("a.txt", b"2").await.unwrap();

        assert_eq!(first.id.enqueued_at(), Some(start));
        assert_eq!(later.id.enqueued_at(), Some(start + TimeDelta::seconds(90)));
        assert!(later.id.as_str().starts_with("20261016_093130_000000_"));
    }

    #[tokio::test]
    async fn test_id_collision_from_another_producer_is_bumped() {
        let store = Arc::new(InMemoryItemStore::new());
        let clock = fixed_clock();
        let first = Enqueuer::new(store.clone(), clock.clone());
        let second = Enqueuer::new(store.clone(), clock);

        let a = first.enqueue_bytes("same.txt", b"1").await.unwrap();
        let b = second.enqueue_bytes("same.txt", b"2").await.unwrap();

        assert_ne!(a.id, b.id);
        assert!(a.id < b.id);
        assert_eq!(b.original_name, "same.txt");
    }

    #[tokio::test]
    async fn test_missing_source_is_rejected_without_mutation() {
        let store = Arc::new(InMemoryItemStore::new());
        let enqueuer = Enqueuer::new(store.clone(), fixed_clock());

        let err = enqueuer
            .enqueue(Path::new("/definitely/not/here.txt"))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::SourceNotFound(_)));
        assert_eq!(store.count(ItemState::Pending).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_directory_source_is_rejected() {
        let store = Arc::new(InMemoryItemStore::new());
        let enqueuer = Enqueuer::new(store, fixed_clock());

        let dir = std::env::temp_dir();
        let err = enqueuer.enqueue(&dir).await.unwrap_err();
        assert!(matches!(err, AppError::SourceNotFound(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_utf8_file_name_is_a_validation_error() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join(OsStr::from_bytes(b"bad_\xff.txt"));
        if std::fs::write(&source, b"x").is_err() {
            // Filesystem refuses non-UTF-8 names (e.g. some macOS volumes)
            return;
        }
        let store = Arc::new(InMemoryItemStore::new());
        let enqueuer = Enqueuer::new(store.clone(), fixed_clock());

        let err = enqueuer.enqueue(&source).await.unwrap_err();

        assert!(matches!(
            err,
            AppError::Domain(DomainError::ValidationError(_))
        ));
        assert_eq!(store.count(ItemState::Pending).await.unwrap(), 0);
    }
}
