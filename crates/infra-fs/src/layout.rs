// Queue directory layout

use dirqueue_core::domain::{ItemId, ItemState, QueueConfig};
use std::path::{Path, PathBuf};

/// Hidden directory where payloads are written before being published
pub const STAGING_DIR: &str = ".staging";

/// `<root>/{in,processing,done,failed}` plus `<root>/.staging`
///
/// Staging lives under the same root so publishing is a same-filesystem
/// link, never a copy.
#[derive(Debug, Clone)]
pub struct QueueLayout {
    root: PathBuf,
}

impl QueueLayout {
    pub fn new(config: &QueueConfig) -> Self {
        Self {
            root: config.root.clone(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn state_dir(&self, state: ItemState) -> PathBuf {
        self.root.join(state.dir_name())
    }

    pub fn staging_dir(&self) -> PathBuf {
        self.root.join(STAGING_DIR)
    }

    pub fn item_path(&self, state: ItemState, id: &ItemId) -> PathBuf {
        self.state_dir(state).join(id.as_str())
    }

    /// Every directory the store needs, state directories first
    pub fn all_dirs(&self) -> Vec<PathBuf> {
        let mut dirs: Vec<PathBuf> = ItemState::ALL
            .iter()
            .map(|state| self.state_dir(*state))
            .collect();
        dirs.push(self.staging_dir());
        dirs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_matches_state_dir_names() {
        let layout = QueueLayout::new(&QueueConfig::new("/var/q"));
        assert_eq!(layout.state_dir(ItemState::Pending), PathBuf::from("/var/q/in"));
        assert_eq!(
            layout.item_path(ItemState::Failed, &ItemId::parse("001_a").unwrap()),
            PathBuf::from("/var/q/failed/001_a")
        );
        assert_eq!(layout.all_dirs().len(), 5);
    }
}
