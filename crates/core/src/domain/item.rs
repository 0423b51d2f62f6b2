// Queue Item Domain Model

use crate::domain::error::{DomainError, Result};
use chrono::{DateTime, NaiveDateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Instant prefix of an item id. Fixed width, so lexicographic order is
/// chronological order.
const INSTANT_FORMAT: &str = "%Y%m%d_%H%M%S_%6f";

/// Item State
///
/// Pending -> Processing -> Done | Failed. Every item is in exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemState {
    Pending,
    Processing,
    Done,
    Failed,
}

impl ItemState {
    /// All states in lifecycle order
    pub const ALL: [ItemState; 4] = [
        ItemState::Pending,
        ItemState::Processing,
        ItemState::Done,
        ItemState::Failed,
    ];

    /// Directory name of this state under the queue root
    pub const fn dir_name(self) -> &'static str {
        match self {
            ItemState::Pending => "in",
            ItemState::Processing => "processing",
            ItemState::Done => "done",
            ItemState::Failed => "failed",
        }
    }
}

impl std::fmt::Display for ItemState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ItemState::Pending => write!(f, "pending"),
            ItemState::Processing => write!(f, "processing"),
            ItemState::Done => write!(f, "done"),
            ItemState::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for ItemState {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "pending" | "in" => Ok(ItemState::Pending),
            "processing" => Ok(ItemState::Processing),
            "done" => Ok(ItemState::Done),
            "failed" => Ok(ItemState::Failed),
            other => Err(DomainError::ValidationError(format!(
                "unknown state: {other}"
            ))),
        }
    }
}

/// Item identifier: `<YYYYMMDD>_<HHMMSS>_<micros>_<original name>`
///
/// Doubles as the payload file name inside a state directory. Ids that do
/// not carry the instant prefix (files dropped into a state directory by
/// hand) are still accepted; they sort by their raw name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    /// Build the id for a file enqueued at `instant`
    pub fn new(instant: DateTime<Utc>, original_name: &str) -> Result<Self> {
        validate_original_name(original_name)?;
        Ok(Self(format!(
            "{}_{}",
            instant.format(INSTANT_FORMAT),
            original_name
        )))
    }

    /// Accept an existing id (e.g. read back from a state directory)
    pub fn parse(s: impl Into<String>) -> Result<Self> {
        let s = s.into();
        if s.is_empty() {
            return Err(DomainError::InvalidItemId("empty".to_string()));
        }
        if s.starts_with('.') {
            return Err(DomainError::InvalidItemId(format!("hidden name: {s:?}")));
        }
        if s.contains(['/', '\\', '\0']) {
            return Err(DomainError::InvalidItemId(format!(
                "path separator in id: {s:?}"
            )));
        }
        Ok(Self(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Basename supplied at enqueue time
    pub fn original_name(&self) -> &str {
        match self.split_instant() {
            Some((_, name)) => name,
            None => &self.0,
        }
    }

    /// Enqueue instant encoded in the id, if present
    pub fn enqueued_at(&self) -> Option<DateTime<Utc>> {
        self.split_instant().map(|(instant, _)| instant)
    }

    fn split_instant(&self) -> Option<(DateTime<Utc>, &str)> {
        let mut parts = self.0.splitn(4, '_');
        let date = parts.next()?;
        let time = parts.next()?;
        let micros = parts.next()?;
        let name = parts.next()?;

        let all_digits = |s: &str, len: usize| s.len() == len && s.bytes().all(|b| b.is_ascii_digit());
        if !all_digits(date, 8) || !all_digits(time, 6) || !all_digits(micros, 6) || name.is_empty()
        {
            return None;
        }

        let seconds = NaiveDateTime::parse_from_str(&format!("{date}_{time}"), "%Y%m%d_%H%M%S").ok()?;
        let micros: i64 = micros.parse().ok()?;
        let instant = seconds.and_utc() + TimeDelta::microseconds(micros);
        Some((instant, name))
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ItemId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn validate_original_name(name: &str) -> Result<()> {
    if name.is_empty() || name == "." || name == ".." {
        return Err(DomainError::ValidationError(format!(
            "invalid file name: {name:?}"
        )));
    }
    if name.contains(['/', '\\', '\0']) {
        return Err(DomainError::ValidationError(format!(
            "file name must be a basename: {name:?}"
        )));
    }
    Ok(())
}

/// A queue item as seen in one state directory
///
/// The payload itself stays on disk at `path`; the queue never rewrites it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueueItem {
    pub id: ItemId,
    pub original_name: String,
    pub state: ItemState,
    pub size_bytes: u64,
    pub path: PathBuf,
}

impl QueueItem {
    pub fn new(id: ItemId, state: ItemState, size_bytes: u64, path: PathBuf) -> Self {
        Self {
            original_name: id.original_name().to_string(),
            id,
            state,
            size_bytes,
            path,
        }
    }
}
