// Filesystem ItemStore Implementation

use crate::layout::QueueLayout;
use async_trait::async_trait;
use dirqueue_core::domain::{ItemId, ItemState, QueueConfig, QueueItem};
use dirqueue_core::error::{AppError, Result};
use dirqueue_core::port::ItemStore;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use uuid::Uuid;

// Attach the path to an io::Error so "No such file" says which file
fn map_io_error(err: std::io::Error, action: &str, path: &Path) -> AppError {
    AppError::Io(std::io::Error::new(
        err.kind(),
        format!("{} {}: {}", action, path.display(), err),
    ))
}

/// One directory per state; `rename(2)` is the relocate primitive
///
/// Concurrent renames of the same source path are resolved by the kernel:
/// exactly one succeeds, the rest see `ENOENT` and report `NotFound`.
pub struct FsItemStore {
    layout: QueueLayout,
}

impl FsItemStore {
    pub fn new(config: &QueueConfig) -> Self {
        Self {
            layout: QueueLayout::new(config),
        }
    }

    pub fn layout(&self) -> &QueueLayout {
        &self.layout
    }

    /// Write + fsync under staging, then publish into the state directory
    async fn stage(&self, id: &ItemId, payload: &[u8]) -> Result<PathBuf> {
        let staged = self
            .layout
            .staging_dir()
            .join(format!("{}.{}", id, Uuid::new_v4().simple()));

        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&staged)
            .await
            .map_err(|e| map_io_error(e, "create staging file", &staged))?;
        file.write_all(payload)
            .await
            .map_err(|e| map_io_error(e, "write", &staged))?;
        file.sync_all()
            .await
            .map_err(|e| map_io_error(e, "sync", &staged))?;

        Ok(staged)
    }

    /// Publish a staged file without ever replacing an existing item
    async fn publish(&self, staged: &Path, dest: &Path) -> std::io::Result<()> {
        match tokio::fs::hard_link(staged, dest).await {
            Err(e) if e.kind() == ErrorKind::Unsupported => {
                // No hard links on this filesystem: check-then-rename
                if tokio::fs::try_exists(dest).await? {
                    return Err(std::io::Error::from(ErrorKind::AlreadyExists));
                }
                tokio::fs::rename(staged, dest).await
            }
            other => other,
        }
    }

    async fn is_item_entry(entry: &tokio::fs::DirEntry) -> Option<ItemId> {
        let name = match entry.file_name().into_string() {
            Ok(name) => name,
            Err(raw) => {
                warn!(name = ?raw, "Skipping non UTF-8 file name");
                return None;
            }
        };
        if name.starts_with('.') {
            return None;
        }
        // file_type() does not follow symlinks
        match entry.file_type().await {
            Ok(ft) if ft.is_file() => {}
            _ => return None,
        }
        ItemId::parse(name).ok()
    }

    async fn remove_files_in(dir: &Path) -> Result<usize> {
        let mut entries = match tokio::fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(map_io_error(e, "read dir", dir)),
        };

        let mut removed = 0;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| map_io_error(e, "read dir", dir))?
        {
            let is_file = entry.file_type().await.map(|ft| ft.is_file()).unwrap_or(false);
            if !is_file {
                continue;
            }
            match tokio::fs::remove_file(entry.path()).await {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(map_io_error(e, "remove", &entry.path())),
            }
        }
        Ok(removed)
    }
}

#[async_trait]
impl ItemStore for FsItemStore {
    async fn init(&self) -> Result<()> {
        for dir in self.layout.all_dirs() {
            tokio::fs::create_dir_all(&dir)
                .await
                .map_err(|e| map_io_error(e, "create dir", &dir))?;
        }
        info!(root = %self.layout.root().display(), "Queue initialized");
        Ok(())
    }

    async fn put(&self, state: ItemState, id: &ItemId, payload: &[u8]) -> Result<QueueItem> {
        let dest = self.layout.item_path(state, id);
        let staged = self.stage(id, payload).await?;

        let published = self.publish(&staged, &dest).await;
        if let Err(e) = tokio::fs::remove_file(&staged).await {
            // Already gone if publish fell back to rename
            if e.kind() != ErrorKind::NotFound {
                warn!(path = %staged.display(), error = %e, "Failed to remove staging file");
            }
        }

        match published {
            Ok(()) => {
                debug!(item_id = %id, state = %state, "Item stored");
                Ok(QueueItem::new(id.clone(), state, payload.len() as u64, dest))
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Err(AppError::AlreadyExists {
                id: id.clone(),
                state,
            }),
            Err(e) => Err(map_io_error(e, "publish", &dest)),
        }
    }

    async fn relocate(&self, id: &ItemId, from: ItemState, to: ItemState) -> Result<QueueItem> {
        let source = self.layout.item_path(from, id);
        let target = self.layout.item_path(to, id);

        // rename(2) would silently replace an existing target
        if tokio::fs::try_exists(&target)
            .await
            .map_err(|e| map_io_error(e, "stat", &target))?
        {
            // The target may be there because a concurrent relocate of this
            // very item just won. rename moves both names in one step, so a
            // missing source means the item is no longer in `from`.
            let source_present = tokio::fs::try_exists(&source)
                .await
                .map_err(|e| map_io_error(e, "stat", &source))?;
            if !source_present {
                return Err(AppError::NotFound {
                    id: id.clone(),
                    state: from,
                });
            }
            return Err(AppError::AlreadyExists {
                id: id.clone(),
                state: to,
            });
        }

        if let Err(e) = tokio::fs::rename(&source, &target).await {
            if e.kind() != ErrorKind::NotFound {
                return Err(map_io_error(e, "rename", &source));
            }
            // ENOENT also covers a missing target directory: that is a broken
            // store, not a lost race
            let target_dir = self.layout.state_dir(to);
            if !tokio::fs::try_exists(&target_dir).await.unwrap_or(false) {
                return Err(map_io_error(e, "rename into missing dir", &target_dir));
            }
            return Err(AppError::NotFound {
                id: id.clone(),
                state: from,
            });
        }

        let size_bytes = match tokio::fs::metadata(&target).await {
            Ok(meta) => meta.len(),
            Err(e) => {
                // Already moved on by someone else; the rename itself stood
                debug!(item_id = %id, error = %e, "Could not stat relocated item");
                0
            }
        };
        Ok(QueueItem::new(id.clone(), to, size_bytes, target))
    }

    async fn list(&self, state: ItemState) -> Result<Vec<QueueItem>> {
        let dir = self.layout.state_dir(state);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(map_io_error(e, "read dir", &dir)),
        };

        let mut items = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| map_io_error(e, "read dir", &dir))?
        {
            let Some(id) = Self::is_item_entry(&entry).await else {
                continue;
            };
            // Entry may be claimed away between readdir and stat
            let Ok(meta) = entry.metadata().await else {
                continue;
            };
            items.push(QueueItem::new(id, state, meta.len(), entry.path()));
        }

        items.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(items)
    }

    async fn count(&self, state: ItemState) -> Result<usize> {
        let dir = self.layout.state_dir(state);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(map_io_error(e, "read dir", &dir)),
        };

        let mut count = 0;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| map_io_error(e, "read dir", &dir))?
        {
            if Self::is_item_entry(&entry).await.is_some() {
                count += 1;
            }
        }
        Ok(count)
    }

    fn payload_path(&self, state: ItemState, id: &ItemId) -> PathBuf {
        self.layout.item_path(state, id)
    }

    async fn clear(&self) -> Result<usize> {
        let mut removed = 0;
        for state in ItemState::ALL {
            removed += Self::remove_files_in(&self.layout.state_dir(state)).await?;
        }
        let leftovers = Self::remove_files_in(&self.layout.staging_dir()).await?;
        if leftovers > 0 {
            debug!(leftovers, "Removed stale staging files");
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    async fn store() -> (TempDir, FsItemStore) {
        let tmp = TempDir::new().unwrap();
        let store = FsItemStore::new(&QueueConfig::new(tmp.path()));
        store.init().await.unwrap();
        (tmp, store)
    }

    fn id(name: &str) -> ItemId {
        ItemId::parse(name).unwrap()
    }

    #[tokio::test]
    async fn test_init_creates_state_dirs() {
        let (tmp, _store) = store().await;
        for dir in ["in", "processing", "done", "failed", ".staging"] {
            assert!(tmp.path().join(dir).is_dir(), "{dir} missing");
        }
    }

    #[tokio::test]
    async fn test_put_writes_payload_and_cleans_staging() {
        let (tmp, store) = store().await;

        let item = store
            .put(ItemState::Pending, &id("001_a.bin"), &[0, 1, 2, 255])
            .await
            .unwrap();

        assert_eq!(item.size_bytes, 4);
        assert_eq!(std::fs::read(&item.path).unwrap(), vec![0, 1, 2, 255]);
        assert_eq!(
            std::fs::read_dir(tmp.path().join(".staging")).unwrap().count(),
            0
        );
    }

    #[tokio::test]
    async fn test_put_never_replaces_existing_item() {
        let (_tmp, store) = store().await;
        store.put(ItemState::Pending, &id("001_a"), b"first").await.unwrap();

        let err = store
            .put(ItemState::Pending, &id("001_a"), b"second")
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::AlreadyExists { .. }));
        let path = store.payload_path(ItemState::Pending, &id("001_a"));
        assert_eq!(std::fs::read(path).unwrap(), b"first");
    }

    #[tokio::test]
    async fn test_relocate_moves_exactly_one_copy() {
        let (_tmp, store) = store().await;
        store.put(ItemState::Pending, &id("001_a"), b"x").await.unwrap();

        let moved = store
            .relocate(&id("001_a"), ItemState::Pending, ItemState::Processing)
            .await
            .unwrap();

        assert_eq!(moved.state, ItemState::Processing);
        assert_eq!(moved.size_bytes, 1);
        assert_eq!(store.count(ItemState::Pending).await.unwrap(), 0);
        assert_eq!(store.count(ItemState::Processing).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_relocate_missing_item_is_not_found() {
        let (_tmp, store) = store().await;

        let err = store
            .relocate(&id("nope"), ItemState::Pending, ItemState::Processing)
            .await
            .unwrap_err();

        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_relocate_after_rival_won_is_not_found() {
        let (_tmp, store) = store().await;
        store.put(ItemState::Pending, &id("001_a"), b"x").await.unwrap();
        store
            .relocate(&id("001_a"), ItemState::Pending, ItemState::Processing)
            .await
            .unwrap();

        // Target now exists, source is gone: a lost race, not a conflict
        let err = store
            .relocate(&id("001_a"), ItemState::Pending, ItemState::Processing)
            .await
            .unwrap_err();

        assert!(err.is_not_found(), "got {err}");
    }

    #[tokio::test]
    async fn test_relocate_refuses_to_overwrite_target() {
        let (_tmp, store) = store().await;
        store.put(ItemState::Pending, &id("001_a"), b"new").await.unwrap();
        store.put(ItemState::Processing, &id("001_a"), b"old").await.unwrap();

        let err = store
            .relocate(&id("001_a"), ItemState::Pending, ItemState::Processing)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::AlreadyExists { .. }));
        assert_eq!(store.count(ItemState::Pending).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_relocate_into_missing_dir_is_io_error() {
        let (tmp, store) = store().await;
        store.put(ItemState::Pending, &id("001_a"), b"x").await.unwrap();
        std::fs::remove_dir(tmp.path().join("done")).unwrap();

        let err = store
            .relocate(&id("001_a"), ItemState::Pending, ItemState::Done)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Io(_)));
        assert_eq!(store.count(ItemState::Pending).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_list_sorts_and_skips_foreign_entries() {
        let (tmp, store) = store().await;
        store.put(ItemState::Pending, &id("002_b"), b"bb").await.unwrap();
        store.put(ItemState::Pending, &id("001_a"), b"a").await.unwrap();
        std::fs::write(tmp.path().join("in/.hidden"), b"").unwrap();
        std::fs::create_dir(tmp.path().join("in/subdir")).unwrap();

        let items = store.list(ItemState::Pending).await.unwrap();

        let names: Vec<_> = items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(names, vec!["001_a", "002_b"]);
        assert_eq!(items[1].size_bytes, 2);
        assert_eq!(store.count(ItemState::Pending).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_uninitialized_root_lists_empty() {
        let tmp = TempDir::new().unwrap();
        let store = FsItemStore::new(&QueueConfig::new(tmp.path().join("missing")));

        assert!(store.list(ItemState::Pending).await.unwrap().is_empty());
        assert_eq!(store.count(ItemState::Done).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_clear_empties_all_states() {
        let (_tmp, store) = store().await;
        store.put(ItemState::Pending, &id("001_a"), b"").await.unwrap();
        store.put(ItemState::Done, &id("002_b"), b"").await.unwrap();
        store.put(ItemState::Failed, &id("003_c"), b"").await.unwrap();

        assert_eq!(store.clear().await.unwrap(), 3);
        for state in ItemState::ALL {
            assert_eq!(store.count(state).await.unwrap(), 0);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_relocate_has_one_winner() {
        let (_tmp, store) = store().await;
        let store = Arc::new(store);

        for trial in 0..50 {
            let name = format!("{trial:03}_a");
            store.put(ItemState::Pending, &id(&name), b"x").await.unwrap();

            let mut tasks = tokio::task::JoinSet::new();
            for _ in 0..16 {
                let store = Arc::clone(&store);
                let name = name.clone();
                tasks.spawn(async move {
                    store
                        .relocate(&id(&name), ItemState::Pending, ItemState::Processing)
                        .await
                });
            }

            let mut wins = 0;
            let mut not_found = 0;
            while let Some(joined) = tasks.join_next().await {
                match joined.unwrap() {
                    Ok(_) => wins += 1,
                    Err(e) if e.is_not_found() => not_found += 1,
                    Err(e) => panic!("trial {trial}: unexpected error: {e}"),
                }
            }

            assert_eq!((wins, not_found), (1, 15), "trial {trial}");
        }
        assert_eq!(store.count(ItemState::Processing).await.unwrap(), 50);
    }
}
