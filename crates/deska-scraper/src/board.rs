use std::collections::HashMap;

use deska_core::{Attachment, Entry, Notices};
use tokio::sync::Mutex;

use crate::ScrapeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    New,
    Replaced,
}

/// Run-scoped URL -> Entry container shared by the listing and detail passes.
///
/// Entries keep the position at which their URL was first seen.
#[derive(Debug, Default)]
pub struct NoticeBoard {
    state: Mutex<BoardState>,
}

#[derive(Debug, Default)]
struct BoardState {
    index: HashMap<String, usize>,
    entries: Vec<Entry>,
}

impl NoticeBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `entry` under its URL. A repeated URL replaces the listing
    /// fields of the earlier entry but keeps any attachments it already has.
    pub async fn register(&self, mut entry: Entry) -> Registration {
        let mut state = self.state.lock().await;
        if let Some(&idx) = state.index.get(&entry.entry_url) {
            let existing = &mut state.entries[idx];
            entry.attachments = std::mem::take(&mut existing.attachments);
            *existing = entry;
            return Registration::Replaced;
        }

        let idx = state.entries.len();
        state.index.insert(entry.entry_url.clone(), idx);
        state.entries.push(entry);
        Registration::New
    }

    pub async fn append_attachments(
        &self,
        entry_url: &str,
        attachments: Vec<Attachment>,
    ) -> Result<(), ScrapeError> {
        let mut state = self.state.lock().await;
        let Some(&idx) = state.index.get(entry_url) else {
            return Err(ScrapeError::UnregisteredEntry(entry_url.to_string()));
        };
        for attachment in attachments {
            state.entries[idx].push_attachment(attachment);
        }
        Ok(())
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn snapshot(&self) -> Notices {
        Notices::new(self.state.lock().await.entries.clone())
    }
}
