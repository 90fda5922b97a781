//! Event types for the Tune Terminal event stream
//!
//! Events are broadcast by the dispatcher and serialized for SSE transmission.

use crate::models::{Tune, TuneId};
use serde::{Deserialize, Serialize};

/// Dispatcher event types
///
/// All events carry the UTC time at which they were raised.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DispatchEvent {
    /// A catalog was installed (possibly empty after a failed load)
    CatalogLoaded {
        tune_count: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A three-tune draw was computed; the settle delay is now running
    DrawStarted {
        tune_ids: Vec<TuneId>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The settle delay elapsed and the draw is final
    DrawSettled {
        tunes: Vec<Tune>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// One more tune was appended to the in-progress draw
    TuneAppended {
        tune: Tune,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Working sequence contents changed (commit, removal, clear, load)
    WorkingSequenceChanged {
        tune_ids: Vec<TuneId>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A tune was starred or un-starred
    FavoritesChanged {
        tune_id: TuneId,
        favorite: bool,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl DispatchEvent {
    /// Event name used as the SSE `event:` field
    pub fn event_type(&self) -> &'static str {
        match self {
            DispatchEvent::CatalogLoaded { .. } => "CatalogLoaded",
            DispatchEvent::DrawStarted { .. } => "DrawStarted",
            DispatchEvent::DrawSettled { .. } => "DrawSettled",
            DispatchEvent::TuneAppended { .. } => "TuneAppended",
            DispatchEvent::WorkingSequenceChanged { .. } => "WorkingSequenceChanged",
            DispatchEvent::FavoritesChanged { .. } => "FavoritesChanged",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = DispatchEvent::FavoritesChanged {
            tune_id: TuneId(12),
            favorite: true,
            timestamp: chrono::Utc::now(),
        };

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "FavoritesChanged");
        assert_eq!(value["tune_id"], 12);
        assert_eq!(value["favorite"], true);
        assert_eq!(event.event_type(), "FavoritesChanged");
    }

    #[test]
    fn test_event_round_trips_through_json() {
        let event = DispatchEvent::WorkingSequenceChanged {
            tune_ids: vec![TuneId(1), TuneId(2)],
            timestamp: chrono::Utc::now(),
        };

        let json = serde_json::to_string(&event).unwrap();
        let decoded: DispatchEvent = serde_json::from_str(&json).unwrap();
        match decoded {
            DispatchEvent::WorkingSequenceChanged { tune_ids, .. } => {
                assert_eq!(tune_ids, vec![TuneId(1), TuneId(2)]);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }
}
