// dirqueue Infrastructure - Filesystem Adapter
// Implements: ItemStore (one directory per state, rename as the relocate primitive)

mod item_store;
mod layout;

pub use item_store::FsItemStore;
pub use layout::{QueueLayout, STAGING_DIR};
