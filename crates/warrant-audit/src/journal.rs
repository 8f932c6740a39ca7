//! Append-only, hash-chained journal of delegation events

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::warn;
use warrant_types::{Address, DelegationEvent, EventSink, WarrantConfig};

/// Hash every chain starts from
pub const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// One journal entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Position in the journal, starting at 0 and never reused
    pub sequence: u64,
    /// Hash of the entry before this one
    pub previous_hash: String,
    /// Hash of this entry
    pub hash: String,
    /// Timestamp of the recorded transition
    pub recorded_at: DateTime<Utc>,
    pub event: DelegationEvent,
}

impl AuditEntry {
    /// SHA-256 over previous hash, sequence and the event's JSON
    pub fn compute_hash(previous_hash: &str, sequence: u64, event: &DelegationEvent) -> String {
        // Infallible: events carry no maps and no custom serializers
        let body = serde_json::to_string(event).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(previous_hash.as_bytes());
        hasher.update(b":");
        hasher.update(sequence.to_be_bytes());
        hasher.update(b":");
        hasher.update(body.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Verify the entry hash
    pub fn verify(&self) -> bool {
        self.hash == Self::compute_hash(&self.previous_hash, self.sequence, &self.event)
    }
}

#[derive(Debug)]
struct JournalState {
    entries: VecDeque<AuditEntry>,
    /// Hash preceding the oldest retained entry
    anchor: String,
    next_sequence: u64,
}

impl Default for JournalState {
    fn default() -> Self {
        Self {
            entries: VecDeque::new(),
            anchor: GENESIS_HASH.to_string(),
            next_sequence: 0,
        }
    }
}

/// Journal of every event it receives. Clones share the same journal.
#[derive(Debug, Clone, Default)]
pub struct AuditJournal {
    state: Arc<RwLock<JournalState>>,
    max_entries: Option<usize>,
}

impl AuditJournal {
    /// Unbounded journal
    pub fn new() -> Self {
        Self::default()
    }

    /// Journal that keeps at most `max_entries` of the newest entries
    pub fn with_max_entries(max_entries: usize) -> Self {
        Self {
            state: Arc::default(),
            max_entries: Some(max_entries),
        }
    }

    pub fn from_config(config: &WarrantConfig) -> Self {
        Self {
            state: Arc::default(),
            max_entries: config.audit_max_entries,
        }
    }

    /// Append an event, returning the new entry
    pub fn append(&self, event: DelegationEvent) -> AuditEntry {
        let mut state = self.state.write();
        let sequence = state.next_sequence;
        let previous_hash = state
            .entries
            .back()
            .map(|e| e.hash.clone())
            .unwrap_or_else(|| state.anchor.clone());
        let entry = AuditEntry {
            sequence,
            hash: AuditEntry::compute_hash(&previous_hash, sequence, &event),
            previous_hash,
            recorded_at: event.timestamp(),
            event,
        };
        state.entries.push_back(entry.clone());
        state.next_sequence += 1;

        if let Some(max) = self.max_entries {
            while state.entries.len() > max {
                if let Some(dropped) = state.entries.pop_front() {
                    state.anchor = dropped.hash;
                }
            }
        }
        entry
    }

    /// Re-derive every retained hash and check the links between entries
    pub fn verify_chain(&self) -> bool {
        let state = self.state.read();
        let mut expected_previous = state.anchor.as_str();
        for entry in &state.entries {
            if entry.previous_hash != expected_previous || !entry.verify() {
                warn!(sequence = entry.sequence, "audit chain broken");
                return false;
            }
            expected_previous = &entry.hash;
        }
        true
    }

    /// All retained entries, oldest first
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.state.read().entries.iter().cloned().collect()
    }

    /// Retained entries whose event involves `address` in any role
    pub fn entries_for(&self, address: &Address) -> Vec<AuditEntry> {
        self.state
            .read()
            .entries
            .iter()
            .filter(|e| e.event.involves(address))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().entries.is_empty()
    }

    /// Hash of the newest entry, or the anchor when empty
    pub fn head(&self) -> String {
        let state = self.state.read();
        state
            .entries
            .back()
            .map(|e| e.hash.clone())
            .unwrap_or_else(|| state.anchor.clone())
    }

    /// Retained entries as pretty JSON
    pub fn export_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.entries())
    }

    #[cfg(test)]
    fn tamper(&self, index: usize, event: DelegationEvent) {
        if let Some(entry) = self.state.write().entries.get_mut(index) {
            entry.event = event;
        }
    }
}

impl EventSink for AuditJournal {
    fn emit(&self, event: DelegationEvent) {
        self.append(event);
    }
}
