//! Literal sample payloads for manually triggering each event kind.
//!
//! Used by the administrative `test <kind>` command and by tests in other
//! crates.
//!
//! # Example
//!
//! ```
//! use relay_events::samples;
//!
//! let kind = samples::kind_for_alias("bits").unwrap();
//! let envelope = samples::sample_envelope(kind);
//! assert_eq!(envelope.event_type, "cheer");
//! ```

use serde_json::{json, Map, Value};

use crate::event::{EventEnvelope, EventKind};

/// Resolves a test-command argument, accepting the short aliases.
pub fn kind_for_alias(arg: &str) -> Option<EventKind> {
    match arg.to_ascii_lowercase().as_str() {
        "subscribe" | "sub" => Some(EventKind::Subscribe),
        "gift" | "gift_subscription" => Some(EventKind::GiftSubscription),
        "cheer" | "bits" => Some(EventKind::Cheer),
        "raid" => Some(EventKind::Raid),
        "follow" => Some(EventKind::Follow),
        _ => None,
    }
}

/// Names accepted by [`kind_for_alias`], for help text.
pub const AVAILABLE: &str = "subscribe, gift, cheer, raid, follow";

/// Returns the sample payload for a kind.
pub fn sample_data(kind: EventKind) -> Map<String, Value> {
    let value = match kind {
        EventKind::Subscribe => json!({
            "userName": "TestUser",
            "userId": "12345",
            "tier": "1000",
            "isGift": false
        }),
        EventKind::GiftSubscription => json!({
            "userName": "TestGifter",
            "userId": "12345",
            "total": 5,
            "tier": "1000"
        }),
        EventKind::Cheer => json!({
            "userName": "TestCheerer",
            "userId": "12345",
            "bits": 500,
            "message": "Test cheer message!"
        }),
        EventKind::Raid => json!({
            "fromBroadcasterName": "TestRaider",
            "viewers": 100
        }),
        EventKind::Follow => json!({
            "userName": "TestFollower",
            "userId": "12345",
            "followedAt": "2024-01-01T00:00:00Z"
        }),
    };
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Returns a ready-to-dispatch envelope for a kind.
pub fn sample_envelope(kind: EventKind) -> EventEnvelope {
    EventEnvelope::new(kind, sample_data(kind))
}
