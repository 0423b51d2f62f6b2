// Terminal rendering for queue state

use colored::Colorize;
use dirqueue_core::application::{
    ItemOutcome, ProcessObserver, ProcessedItem, QueueCounts, QueueListing,
};
use dirqueue_core::domain::{ItemId, ItemState, QueueItem};
use tabled::{Table, Tabled};

#[derive(Tabled)]
struct ItemRow {
    id: String,
    name: String,
    size: String,
}

impl From<&QueueItem> for ItemRow {
    fn from(item: &QueueItem) -> Self {
        Self {
            id: item.id.to_string(),
            name: item.original_name.clone(),
            size: format_size(item.size_bytes),
        }
    }
}

pub fn state_heading(state: ItemState) -> &'static str {
    match state {
        ItemState::Pending => "In Queue:",
        ItemState::Processing => "Processing:",
        ItemState::Done => "Completed:",
        ItemState::Failed => "Failed:",
    }
}

/// Name for humans, then the id for scripts that pipe it onwards
pub fn push_lines(id: &ItemId) -> Vec<String> {
    vec![format!("Pushed: {}", id.original_name()), id.to_string()]
}

pub fn count_lines(counts: &QueueCounts) -> Vec<String> {
    vec![
        format!("Items in queue: {}", counts.pending),
        format!("Items processing: {}", counts.processing),
        format!("Items completed: {}", counts.done),
        format!("Items failed: {}", counts.failed),
    ]
}

pub fn print_listing(listing: &QueueListing) {
    for (i, state) in ItemState::ALL.into_iter().enumerate() {
        if i > 0 {
            println!();
        }
        println!("{}", state_heading(state).cyan().bold());
        let items = listing.items(state);
        if items.is_empty() {
            println!("  {}", "(empty)".dimmed());
            continue;
        }
        let rows: Vec<ItemRow> = items.iter().map(ItemRow::from).collect();
        println!("{}", Table::new(rows));
    }
}

fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    match bytes {
        b if b >= MB => format!("{:.2} MB", b as f64 / MB as f64),
        b if b >= KB => format!("{:.1} KB", b as f64 / KB as f64),
        b => format!("{} B", b),
    }
}

/// Prints progress lines during `process`
pub struct ConsoleObserver;

impl ProcessObserver for ConsoleObserver {
    fn on_claimed(&self, item: &QueueItem) {
        println!("Processing: {}", item.id);
    }

    fn on_finished(&self, item: &ProcessedItem) {
        match &item.outcome {
            ItemOutcome::Succeeded => println!("{} {}", "Success:".green(), item.id),
            ItemOutcome::Failed { exit_code, .. } => match exit_code {
                Some(code) => println!("{} {} (exit {})", "Failed:".red(), item.id, code),
                None => println!("{} {}", "Failed:".red(), item.id),
            },
        }
    }
}
