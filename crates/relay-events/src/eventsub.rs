//! EventSub notification translation.
//!
//! Maps raw platform webhook notifications (`channel.subscribe`,
//! `channel.cheer`, ...) onto the relay's own `{eventType, data}` envelope.
//! Signature verification is not performed here.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::event::{EventEnvelope, EventKind};

/// Header carrying the message type.
pub const MESSAGE_TYPE_HEADER: &str = "twitch-eventsub-message-type";

/// Display name used when the platform hides the viewer.
pub const ANONYMOUS: &str = "Anonymous";

/// Kind of EventSub delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageType {
    Verification,
    Notification,
    Revocation,
    Other(String),
}

impl MessageType {
    pub fn from_header(value: &str) -> Self {
        match value {
            "webhook_callback_verification" => MessageType::Verification,
            "notification" => MessageType::Notification,
            "revocation" => MessageType::Revocation,
            other => MessageType::Other(other.to_string()),
        }
    }
}

/// Subscription metadata attached to every delivery.
#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionInfo {
    #[serde(rename = "type")]
    pub kind: String,
}

/// Body of an EventSub delivery.
#[derive(Debug, Clone, Deserialize)]
pub struct Delivery {
    pub subscription: SubscriptionInfo,
    #[serde(default)]
    pub event: Value,
    #[serde(default)]
    pub challenge: Option<String>,
}

// (relay field, platform field) pairs copied when present and non-null.
const SUBSCRIBE_FIELDS: &[(&str, &str)] =
    &[("userId", "user_id"), ("tier", "tier"), ("isGift", "is_gift")];
const GIFT_FIELDS: &[(&str, &str)] = &[
    ("userId", "user_id"),
    ("total", "total"),
    ("tier", "tier"),
    ("cumulativeTotal", "cumulative_total"),
];
const CHEER_FIELDS: &[(&str, &str)] =
    &[("userId", "user_id"), ("bits", "bits"), ("message", "message")];
const RAID_FIELDS: &[(&str, &str)] = &[
    ("fromBroadcasterId", "from_broadcaster_user_id"),
    ("viewers", "viewers"),
];
const FOLLOW_FIELDS: &[(&str, &str)] = &[("userId", "user_id"), ("followedAt", "followed_at")];

/// Translates a notification into a relay envelope.
///
/// Returns `None` for subscription types the relay does not handle.
pub fn translate(subscription_type: &str, event: &Value) -> Option<EventEnvelope> {
    let (kind, fields) = match subscription_type {
        "channel.subscribe" => (EventKind::Subscribe, SUBSCRIBE_FIELDS),
        "channel.subscription.gift" => (EventKind::GiftSubscription, GIFT_FIELDS),
        "channel.cheer" => (EventKind::Cheer, CHEER_FIELDS),
        "channel.raid" => (EventKind::Raid, RAID_FIELDS),
        "channel.follow" => (EventKind::Follow, FOLLOW_FIELDS),
        _ => return None,
    };

    let mut data = Map::new();
    match kind {
        EventKind::Raid => {
            data.insert(
                "fromBroadcasterName".to_string(),
                name_or_anonymous(event, "from_broadcaster_user_name"),
            );
        }
        _ => {
            data.insert("userName".to_string(), name_or_anonymous(event, "user_name"));
        }
    }
    for (ours, theirs) in fields {
        match event.get(*theirs) {
            Some(Value::Null) | None => {}
            Some(value) => {
                data.insert((*ours).to_string(), value.clone());
            }
        }
    }

    Some(EventEnvelope::new(kind, data))
}

fn name_or_anonymous(event: &Value, key: &str) -> Value {
    match event.get(key).and_then(Value::as_str) {
        Some(name) => Value::String(name.to_string()),
        None => Value::String(ANONYMOUS.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Event;
    use serde_json::json;

    #[test]
    fn test_message_type_from_header() {
        assert_eq!(
            MessageType::from_header("webhook_callback_verification"),
            MessageType::Verification
        );
        assert_eq!(MessageType::from_header("notification"), MessageType::Notification);
        assert_eq!(MessageType::from_header("revocation"), MessageType::Revocation);
        assert_eq!(
            MessageType::from_header("other"),
            MessageType::Other("other".to_string())
        );
    }

    #[test]
    fn test_translate_cheer() {
        let event = json!({
            "user_name": "Mira",
            "user_id": "42",
            "bits": 500,
            "message": "Cheer500 go"
        });
        let envelope = translate("channel.cheer", &event).unwrap();
        assert_eq!(envelope.event_type, "cheer");
        match envelope.parse().unwrap() {
            Event::Cheer(p) => {
                assert_eq!(p.user_name, "Mira");
                assert_eq!(p.bits, 500);
                assert_eq!(p.message.as_deref(), Some("Cheer500 go"));
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_translate_anonymous_gift() {
        let event = json!({
            "user_name": null,
            "user_id": null,
            "total": 3,
            "tier": "1000",
            "cumulative_total": null,
            "is_anonymous": true
        });
        let envelope = translate("channel.subscription.gift", &event).unwrap();
        match envelope.parse().unwrap() {
            Event::GiftSubscription(p) => {
                assert_eq!(p.user_name, ANONYMOUS);
                assert_eq!(p.total, 3);
                assert_eq!(p.cumulative_total, None);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_translate_raid() {
        let event = json!({
            "from_broadcaster_user_name": "Voss",
            "from_broadcaster_user_id": "7",
            "viewers": 45
        });
        let envelope = translate("channel.raid", &event).unwrap();
        assert_eq!(envelope.data["fromBroadcasterName"], "Voss");
        assert_eq!(envelope.data["viewers"], 45);
    }

    #[test]
    fn test_translate_unhandled_type() {
        assert!(translate("channel.hype_train.begin", &json!({})).is_none());
    }

    #[test]
    fn test_delivery_parses_challenge() {
        let body = json!({
            "subscription": { "type": "channel.follow", "version": "2" },
            "challenge": "abc123"
        });
        let delivery: Delivery = serde_json::from_value(body).unwrap();
        assert_eq!(delivery.subscription.kind, "channel.follow");
        assert_eq!(delivery.challenge.as_deref(), Some("abc123"));
        assert!(delivery.event.is_null());
    }
}
