//! # Message Dispatcher
//!
//! Classifies raw feed frames. Malformed frames are dropped here and never
//! reach a reconciler; unknown tags are accepted and ignored.

use tracing::{debug, warn};

use crate::domain::InboundMessage;

/// Result of classifying one frame.
#[derive(Clone, Debug, PartialEq)]
pub enum DispatchOutcome {
    /// Recognised message for a reconciler.
    Routed(InboundMessage),
    /// Unknown tag.
    Ignored { tag: String },
    /// Malformed frame.
    Dropped { reason: String },
}

/// Frame counters since creation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub routed: u64,
    pub ignored: u64,
    pub dropped: u64,
}

#[derive(Debug, Default)]
pub struct Dispatcher {
    stats: DispatchStats,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode and classify one raw frame.
    pub fn classify(&mut self, raw: &str) -> DispatchOutcome {
        match InboundMessage::decode(raw) {
            Ok(InboundMessage::Unknown { tag, .. }) => {
                self.stats.ignored += 1;
                debug!(tag = %tag, "[shield] Ignoring unknown message type");
                DispatchOutcome::Ignored { tag }
            }
            Ok(msg) => {
                self.stats.routed += 1;
                DispatchOutcome::Routed(msg)
            }
            Err(e) => {
                self.stats.dropped += 1;
                warn!(len = raw.len(), "[shield] Dropping feed message: {}", e);
                DispatchOutcome::Dropped {
                    reason: e.to_string(),
                }
            }
        }
    }

    pub fn stats(&self) -> DispatchStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_counts_each_outcome() {
        let mut dispatcher = Dispatcher::new();

        let anchor = r#"{"type":"offsec.anchor","data":{"root":"ab","ts":"2025-01-01T00:00:00Z","status":"anchored"}}"#;
        assert!(matches!(dispatcher.classify(anchor), DispatchOutcome::Routed(_)));
        assert!(matches!(
            dispatcher.classify(r#"{"type":"future.thing","data":null}"#),
            DispatchOutcome::Ignored { .. }
        ));
        assert!(matches!(dispatcher.classify("{"), DispatchOutcome::Dropped { .. }));
        assert!(matches!(
            dispatcher.classify(r#"{"type":"threat_event","data":{"id":"e1"}}"#),
            DispatchOutcome::Dropped { .. }
        ));

        assert_eq!(
            dispatcher.stats(),
            DispatchStats {
                routed: 1,
                ignored: 1,
                dropped: 2
            }
        );
    }
}
