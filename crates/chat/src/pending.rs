use std::collections::HashMap;
use std::collections::hash_map::Entry;

use chrono::{DateTime, TimeDelta, Utc};
use farm_helper_advice::AdviceResult;

use crate::ids::MessageId;

/// What the tracker remembers about an outstanding submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingEntry {
    pub has_image: bool,
    pub submitted_at: DateTime<Utc>,
}

impl PendingEntry {
    pub fn new(has_image: bool) -> Self {
        Self {
            has_image,
            submitted_at: Utc::now(),
        }
    }

    pub fn waited(&self) -> TimeDelta {
        Utc::now() - self.submitted_at
    }
}

/// Submissions still waiting for an answer, keyed by the user message id.
///
/// [`PendingSet::resolve`] is the single arbitration point between the answer
/// paths: it removes and reports membership in one step, so exactly one caller
/// ever observes `Some` for a given id.
#[derive(Debug, Clone, Default)]
pub struct PendingSet {
    entries: HashMap<MessageId, PendingEntry>,
}

impl PendingSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` when the id was already pending; the first entry is kept.
    pub fn mark_pending(&mut self, message_id: MessageId, entry: PendingEntry) -> bool {
        match self.entries.entry(message_id) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(entry);
                true
            }
        }
    }

    pub fn resolve(&mut self, message_id: MessageId) -> Option<PendingEntry> {
        self.entries.remove(&message_id)
    }

    pub fn is_pending(&self, message_id: MessageId) -> bool {
        self.entries.contains_key(&message_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Which path settled a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resolution {
    Delivered,
    Rejected,
    TransportFailed,
    TimedOut,
}

impl Resolution {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Delivered => "delivered",
            Self::Rejected => "rejected",
            Self::TransportFailed => "transport-failed",
            Self::TimedOut => "timed-out",
        }
    }
}

/// Lifecycle of one submitted message: `Pending` until exactly one path resolves it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionState {
    Pending,
    Resolved(Resolution),
}

/// Result of handing a question to the advice client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    Acknowledged,
    Rejected { status: u16 },
    TransportError { message: String },
}

impl SendOutcome {
    pub fn from_result(result: AdviceResult<()>) -> Self {
        match result {
            Ok(()) => Self::Acknowledged,
            Err(error) => match error.rejected_status() {
                Some(status) => Self::Rejected { status },
                None => Self::TransportError {
                    message: error.to_string(),
                },
            },
        }
    }

    /// Resolution to apply right away, `None` when the answer is still awaited.
    pub fn immediate_resolution(&self) -> Option<Resolution> {
        match self {
            Self::Acknowledged => None,
            Self::Rejected { .. } => Some(Resolution::Rejected),
            Self::TransportError { .. } => Some(Resolution::TransportFailed),
        }
    }
}

#[cfg(test)]
mod tests {
    use farm_helper_advice::AdviceError;

    use super::*;

    #[test]
    fn resolve_reports_membership_exactly_once() {
        let mut pending = PendingSet::new();
        let message_id = MessageId::generate();

        assert!(pending.mark_pending(message_id, PendingEntry::new(true)));
        assert!(pending.is_pending(message_id));

        let first = pending.resolve(message_id);
        let second = pending.resolve(message_id);

        assert!(first.is_some_and(|entry| entry.has_image));
        assert!(first.is_some_and(|entry| entry.waited() >= TimeDelta::zero()));
        assert_eq!(second, None);
        assert!(!pending.is_pending(message_id));
        assert!(pending.is_empty());
    }

    #[test]
    fn marking_twice_keeps_first_entry() {
        let mut pending = PendingSet::new();
        let message_id = MessageId::generate();

        assert!(pending.mark_pending(message_id, PendingEntry::new(false)));
        assert!(!pending.mark_pending(message_id, PendingEntry::new(true)));

        assert_eq!(pending.len(), 1);
        assert!(pending.resolve(message_id).is_some_and(|entry| !entry.has_image));
    }

    #[test]
    fn unknown_id_resolves_to_none() {
        let mut pending = PendingSet::new();
        pending.mark_pending(MessageId::generate(), PendingEntry::new(false));

        assert_eq!(pending.resolve(MessageId::generate()), None);
        assert_eq!(pending.len(), 1);
    }

    #[test]
    fn send_outcomes_map_to_resolutions() {
        assert_eq!(SendOutcome::Acknowledged.immediate_resolution(), None);
        assert_eq!(
            SendOutcome::Rejected { status: 502 }.immediate_resolution(),
            Some(Resolution::Rejected)
        );
        assert_eq!(
            SendOutcome::TransportError {
                message: "connection refused".to_string()
            }
            .immediate_resolution(),
            Some(Resolution::TransportFailed)
        );
    }

    #[test]
    fn advice_results_classify_into_outcomes() {
        assert_eq!(SendOutcome::from_result(Ok(())), SendOutcome::Acknowledged);

        let rejected = AdviceError::Rejected {
            stage: "test",
            status: 503,
            body: "busy".to_string(),
        };
        assert_eq!(
            SendOutcome::from_result(Err(rejected)),
            SendOutcome::Rejected { status: 503 }
        );

        let invalid = AdviceError::InvalidEndpoint {
            stage: "test",
            endpoint: "nowhere".to_string(),
        };
        assert!(matches!(
            SendOutcome::from_result(Err(invalid)),
            SendOutcome::TransportError { .. }
        ));
    }
}
