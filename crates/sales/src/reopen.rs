//! Reopen protocol state.
//!
//! Reopen requests used to be tracked by writing markers into the order note.
//! State now lives in an append-only [`ReopenLog`]; the marker scan is kept for
//! reading legacy notes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use orderflow_core::UserId;

pub const REOPEN_REQUEST_MARKER: &str = "[REOPEN REQUEST]";
pub const REOPEN_APPROVED_MARKER: &str = "[REOPEN APPROVED]";
pub const REOPEN_REJECTED_MARKER: &str = "[REOPEN REJECTED]";

/// Legacy textual check: a request marker without any resolution marker.
pub fn has_pending_reopen_request(note: Option<&str>) -> bool {
    let Some(note) = note else {
        return false;
    };
    note.contains(REOPEN_REQUEST_MARKER)
        && !note.contains(REOPEN_APPROVED_MARKER)
        && !note.contains(REOPEN_REJECTED_MARKER)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReopenEventKind {
    Request,
    Approve,
    Reject,
}

impl ReopenEventKind {
    fn marker(self) -> &'static str {
        match self {
            ReopenEventKind::Request => REOPEN_REQUEST_MARKER,
            ReopenEventKind::Approve => REOPEN_APPROVED_MARKER,
            ReopenEventKind::Reject => REOPEN_REJECTED_MARKER,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReopenEvent {
    pub kind: ReopenEventKind,
    /// `None` for events migrated from a legacy note.
    pub actor: Option<UserId>,
    pub at: DateTime<Utc>,
    pub comment: Option<String>,
}

/// Append-only history of reopen requests and their resolutions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReopenLog {
    events: Vec<ReopenEvent>,
}

impl ReopenLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a log from a legacy note by reading markers in order of
    /// appearance. Migrated events carry no actor and are stamped `at`.
    pub fn from_legacy_note(note: Option<&str>, at: DateTime<Utc>) -> Self {
        let Some(note) = note else {
            return Self::default();
        };

        let kinds = [
            ReopenEventKind::Request,
            ReopenEventKind::Approve,
            ReopenEventKind::Reject,
        ];
        let mut found: Vec<(usize, ReopenEventKind)> = kinds
            .into_iter()
            .flat_map(|kind| note.match_indices(kind.marker()).map(move |(pos, _)| (pos, kind)))
            .collect();
        found.sort_by_key(|(pos, _)| *pos);

        Self {
            events: found
                .into_iter()
                .map(|(_, kind)| ReopenEvent {
                    kind,
                    actor: None,
                    at,
                    comment: None,
                })
                .collect(),
        }
    }

    /// A request is pending when the most recent event is a request.
    pub fn has_pending(&self) -> bool {
        self.pending_request().is_some()
    }

    pub fn last(&self) -> Option<&ReopenEvent> {
        self.events.last()
    }

    /// The request awaiting a decision, if any.
    pub fn pending_request(&self) -> Option<&ReopenEvent> {
        self.last().filter(|e| e.kind == ReopenEventKind::Request)
    }

    pub fn events(&self) -> &[ReopenEvent] {
        &self.events
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn append(&mut self, event: ReopenEvent) {
        self.events.push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marker_scan_cases() {
        assert!(!has_pending_reopen_request(None));
        assert!(!has_pending_reopen_request(Some("")));
        assert!(has_pending_reopen_request(Some("x [REOPEN REQUEST] y")));
        assert!(!has_pending_reopen_request(Some(
            "[REOPEN REQUEST] a\n[REOPEN APPROVED] b"
        )));
        assert!(!has_pending_reopen_request(Some(
            "[REOPEN REQUEST] a\n[REOPEN REJECTED] b"
        )));
    }

    #[test]
    fn log_pending_follows_the_latest_event() {
        let now = Utc::now();
        let event = |kind| ReopenEvent {
            kind,
            actor: Some(UserId::new(10)),
            at: now,
            comment: None,
        };

        let mut log = ReopenLog::new();
        assert!(!log.has_pending());
        log.append(event(ReopenEventKind::Request));
        assert!(log.has_pending());
        assert_eq!(log.pending_request().map(|e| e.actor), Some(Some(UserId::new(10))));
        log.append(event(ReopenEventKind::Reject));
        assert!(log.pending_request().is_none());
        assert!(!log.has_pending());
        // Unlike the marker scan, a second request after a rejection is pending.
        log.append(event(ReopenEventKind::Request));
        assert!(log.has_pending());
        assert_eq!(log.events().len(), 3);
    }

    #[test]
    fn legacy_note_is_migrated_in_order_of_appearance() {
        let note = "customer changed spec [REOPEN REQUEST] please\n[REOPEN REJECTED] no\n[REOPEN REQUEST] again";
        let log = ReopenLog::from_legacy_note(Some(note), Utc::now());
        let kinds: Vec<_> = log.events().iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ReopenEventKind::Request,
                ReopenEventKind::Reject,
                ReopenEventKind::Request
            ]
        );
        assert!(log.has_pending());
        assert!(log.events().iter().all(|e| e.actor.is_none()));
    }

    #[test]
    fn legacy_note_without_markers_is_empty() {
        assert!(ReopenLog::from_legacy_note(Some("rush order"), Utc::now()).is_empty());
        assert!(ReopenLog::from_legacy_note(None, Utc::now()).is_empty());
    }
}
