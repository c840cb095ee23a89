//! Event Types
//!
//! The inbound `{eventType, data}` envelope and the typed payload for each
//! supported stream event kind.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Stream event kinds the relay reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Subscribe,
    GiftSubscription,
    Cheer,
    Raid,
    Follow,
}

impl EventKind {
    /// Returns the `eventType` string used on the wire.
    pub fn wire_name(&self) -> &'static str {
        match self {
            EventKind::Subscribe => "subscribe",
            EventKind::GiftSubscription => "gift_subscription",
            EventKind::Cheer => "cheer",
            EventKind::Raid => "raid",
            EventKind::Follow => "follow",
        }
    }

    /// Parses a wire `eventType` string.
    pub fn from_wire_name(name: &str) -> Option<Self> {
        Self::all().iter().copied().find(|k| k.wire_name() == name)
    }

    /// Returns the configuration section name under `events.`.
    ///
    /// Section names are the wire name with underscores removed, so
    /// `gift_subscription` lives under `events.giftsubscription`.
    pub fn config_key(&self) -> &'static str {
        match self {
            EventKind::Subscribe => "subscribe",
            EventKind::GiftSubscription => "giftsubscription",
            EventKind::Cheer => "cheer",
            EventKind::Raid => "raid",
            EventKind::Follow => "follow",
        }
    }

    /// Returns all event kind variants.
    pub fn all() -> &'static [EventKind] {
        &[
            EventKind::Subscribe,
            EventKind::GiftSubscription,
            EventKind::Cheer,
            EventKind::Raid,
            EventKind::Follow,
        ]
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// The JSON body accepted on `POST /event`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    #[serde(rename = "eventType")]
    pub event_type: String,
    pub data: Map<String, Value>,
}

impl EventEnvelope {
    /// Creates an envelope for a known kind.
    pub fn new(kind: EventKind, data: Map<String, Value>) -> Self {
        Self {
            event_type: kind.wire_name().to_string(),
            data,
        }
    }

    /// Parses an envelope from a request body.
    pub fn from_json(body: &str) -> Result<Self, EnvelopeError> {
        Ok(serde_json::from_str(body)?)
    }

    /// Returns the kind named by `eventType`, if it is one we know.
    pub fn kind(&self) -> Option<EventKind> {
        EventKind::from_wire_name(&self.event_type)
    }

    /// Validates the payload against its kind's schema.
    ///
    /// No partial parsing: a single missing required field rejects the
    /// whole event.
    pub fn parse(&self) -> Result<Event, EnvelopeError> {
        let kind = self
            .kind()
            .ok_or_else(|| EnvelopeError::UnknownKind(self.event_type.clone()))?;
        Ok(Event::from_parts(kind, self.data.clone())?)
    }
}

/// A validated inbound event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Subscribe(SubscribePayload),
    GiftSubscription(GiftSubscriptionPayload),
    Cheer(CheerPayload),
    Raid(RaidPayload),
    Follow(FollowPayload),
}

impl Event {
    /// Builds a typed event from a kind and its raw `data` object.
    pub fn from_parts(kind: EventKind, data: Map<String, Value>) -> Result<Self, PayloadError> {
        let value = Value::Object(data);
        let wrap = |source| PayloadError { kind, source };
        Ok(match kind {
            EventKind::Subscribe => Event::Subscribe(serde_json::from_value(value).map_err(wrap)?),
            EventKind::GiftSubscription => {
                Event::GiftSubscription(serde_json::from_value(value).map_err(wrap)?)
            }
            EventKind::Cheer => Event::Cheer(serde_json::from_value(value).map_err(wrap)?),
            EventKind::Raid => Event::Raid(serde_json::from_value(value).map_err(wrap)?),
            EventKind::Follow => Event::Follow(serde_json::from_value(value).map_err(wrap)?),
        })
    }

    pub fn kind(&self) -> EventKind {
        match self {
            Event::Subscribe(_) => EventKind::Subscribe,
            Event::GiftSubscription(_) => EventKind::GiftSubscription,
            Event::Cheer(_) => EventKind::Cheer,
            Event::Raid(_) => EventKind::Raid,
            Event::Follow(_) => EventKind::Follow,
        }
    }

    /// Name of whoever triggered the event: the viewer, or the raiding broadcaster.
    pub fn source_name(&self) -> &str {
        match self {
            Event::Subscribe(p) => &p.user_name,
            Event::GiftSubscription(p) => &p.user_name,
            Event::Cheer(p) => &p.user_name,
            Event::Raid(p) => &p.from_broadcaster_name,
            Event::Follow(p) => &p.user_name,
        }
    }
}

/// `subscribe` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribePayload {
    pub user_name: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub tier: Option<String>,
    /// Gifted subs also arrive as a `gift_subscription`; see the policy engine.
    #[serde(default)]
    pub is_gift: bool,
}

/// `gift_subscription` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GiftSubscriptionPayload {
    pub user_name: String,
    /// Number of subscriptions gifted in this batch
    pub total: u32,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub tier: Option<String>,
    #[serde(default)]
    pub cumulative_total: Option<u32>,
}

/// `cheer` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheerPayload {
    pub user_name: String,
    pub bits: u64,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// `raid` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RaidPayload {
    pub from_broadcaster_name: String,
    pub viewers: u64,
    #[serde(default)]
    pub from_broadcaster_id: Option<String>,
}

/// `follow` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowPayload {
    pub user_name: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub followed_at: Option<String>,
}

/// A payload that does not match its kind's schema.
#[derive(Debug, Error)]
#[error("invalid {kind} payload: {source}")]
pub struct PayloadError {
    pub kind: EventKind,
    #[source]
    pub source: serde_json::Error,
}

/// Errors raised while turning a request body into an [`Event`].
#[derive(Debug, Error)]
pub enum EnvelopeError {
    /// Body is not a `{eventType, data}` JSON object
    #[error("invalid event JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// `eventType` names a kind we do not handle
    #[error("unknown event type: {0}")]
    UnknownKind(String),
    /// Payload is missing a required field or has the wrong type
    #[error(transparent)]
    Payload(#[from] PayloadError),
}
