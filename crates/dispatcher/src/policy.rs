//! Per-kind event policy.
//!
//! Turns a validated event plus a configuration snapshot into a
//! [`DerivedAction`]: what to do, how many times, and which message to
//! broadcast. All arithmetic is integer and every count is clamped, so a
//! single event can never produce an unbounded amount of work.

use std::collections::BTreeMap;
use std::fmt;

use relay_events::{Event, EventKind};
use serde::{Deserialize, Serialize};

use crate::config::RelayConfig;

/// Template tokens filled by the policy engine or the emitter.
pub mod tokens {
    /// Resolved actor name, filled by the emitter
    pub const PLAYER: &str = "player";
    /// Triggering viewer or raiding broadcaster
    pub const USER: &str = "user";
    /// Computed count
    pub const AMOUNT: &str = "amount";
    /// Bits cheered
    pub const BITS: &str = "bits";
    /// Raid size
    pub const VIEWERS: &str = "viewers";
}

/// What a derived action does in the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    SpawnHostiles,
    GrantItem,
}

/// Resolved, clamped parameters for one event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedAction {
    pub kind: ActionKind,
    /// Event kind this action came from
    pub source: EventKind,
    pub count: u32,
    /// Hostile kind or item kind
    pub subject_kind: String,
    /// Name shown on spawned hostiles (the triggering user)
    pub label: String,
    pub message_template: String,
    /// Kind-specific token values (everything except `player`)
    pub substitutions: BTreeMap<String, String>,
}

/// Why an event produced no action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// `events.<kind>.enabled = false`
    Disabled(EventKind),
    /// Subscribe flagged as a gift; credited through the gift path instead
    GiftedSubscribe,
    /// `eventType` we do not recognise
    UnknownKind(String),
    /// No online actor matched the target policy
    NoTarget,
    /// Target resolved but the adapter could not describe where it is
    TargetUnavailable(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Disabled(kind) => write!(f, "event type {} is disabled", kind),
            SkipReason::GiftedSubscribe => write!(f, "gifted subscription handled by gift path"),
            SkipReason::UnknownKind(kind) => write!(f, "unknown event type: {}", kind),
            SkipReason::NoTarget => write!(f, "no target player available"),
            SkipReason::TargetUnavailable(name) => {
                write!(f, "target player {} has no known location", name)
            }
        }
    }
}

/// Result of evaluating policy for one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Action(DerivedAction),
    Skip(SkipReason),
}

/// Derives action parameters from events. Stateless.
#[derive(Debug, Clone, Copy, Default)]
pub struct PolicyEngine;

impl PolicyEngine {
    pub fn new() -> Self {
        Self
    }

    /// Returns the tokens each kind fills in, besides `player`.
    pub fn relevant_tokens(kind: EventKind) -> &'static [&'static str] {
        match kind {
            EventKind::Subscribe | EventKind::Follow => &[tokens::USER],
            EventKind::GiftSubscription => &[tokens::USER, tokens::AMOUNT],
            EventKind::Cheer => &[tokens::USER, tokens::BITS, tokens::AMOUNT],
            EventKind::Raid => &[tokens::USER, tokens::VIEWERS, tokens::AMOUNT],
        }
    }

    /// Evaluates policy for one event against a frozen config.
    pub fn resolve(&self, event: &Event, config: &RelayConfig) -> Resolution {
        let kind = event.kind();
        if !config.events.enabled(kind) {
            tracing::info!(event_type = %kind, "event type is disabled");
            return Resolution::Skip(SkipReason::Disabled(kind));
        }

        let global_max = u64::from(config.spawn.max_mobs_per_event);
        let events = &config.events;
        let label = event.source_name().to_string();
        let mut substitutions = BTreeMap::new();
        substitutions.insert(tokens::USER.to_string(), label.clone());

        let (action_kind, count, subject_kind) = match event {
            Event::Subscribe(payload) => {
                if payload.is_gift {
                    tracing::debug!(user = %payload.user_name, "gifted subscribe skipped");
                    return Resolution::Skip(SkipReason::GiftedSubscribe);
                }
                let count = clamp_count(u64::from(events.subscribe.amount), 0, global_max);
                (ActionKind::SpawnHostiles, count, events.subscribe.action.clone())
            }
            Event::GiftSubscription(payload) => {
                let raw = u64::from(events.giftsubscription.amount) * u64::from(payload.total);
                let count = clamp_count(raw, 0, global_max);
                substitutions.insert(tokens::AMOUNT.to_string(), count.to_string());
                (
                    ActionKind::SpawnHostiles,
                    count,
                    events.giftsubscription.mob_type.clone(),
                )
            }
            Event::Cheer(payload) => {
                let bits_per_mob = u64::from(events.cheer.bits_per_mob).max(1);
                let count = clamp_count(payload.bits / bits_per_mob, 1, global_max);
                substitutions.insert(tokens::BITS.to_string(), payload.bits.to_string());
                substitutions.insert(tokens::AMOUNT.to_string(), count.to_string());
                (ActionKind::SpawnHostiles, count, events.cheer.mob_type.clone())
            }
            Event::Raid(payload) => {
                let viewers_per_mob = u64::from(events.raid.viewers_per_mob).max(1);
                let max_mobs = u64::from(events.raid.max_mobs);
                let count = clamp_count(payload.viewers / viewers_per_mob, 1, max_mobs);
                substitutions.insert(tokens::VIEWERS.to_string(), payload.viewers.to_string());
                substitutions.insert(tokens::AMOUNT.to_string(), count.to_string());
                (ActionKind::SpawnHostiles, count, events.raid.mob_type.clone())
            }
            Event::Follow(_) => (
                ActionKind::GrantItem,
                events.follow.amount,
                events.follow.item.clone(),
            ),
        };

        tracing::debug!(
            event_type = %kind,
            count,
            subject_kind = %subject_kind,
            label = %label,
            "derived action"
        );

        Resolution::Action(DerivedAction {
            kind: action_kind,
            source: kind,
            count,
            subject_kind,
            label,
            message_template: events.message(kind).to_string(),
            substitutions,
        })
    }
}

/// Clamps into `[min, max]`, where a `max` below `min` is raised to `min`.
fn clamp_count(raw: u64, min: u64, max: u64) -> u32 {
    let clamped = raw.clamp(min, max.max(min));
    u32::try_from(clamped).unwrap_or(u32::MAX)
}
