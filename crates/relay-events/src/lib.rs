//! Shared event and command types for the stream relay.
//!
//! This crate contains pure data structures with no dispatch logic: the
//! inbound notification envelope, typed per-kind payloads, actor handles,
//! and the world commands the dispatcher hands to a game adapter.
//! It is a dependency for all other crates in the workspace.

pub mod command;
pub mod event;
pub mod eventsub;
pub mod samples;
pub mod world;

// Re-export event types
pub use event::{
    CheerPayload, EnvelopeError, Event, EventEnvelope, EventKind, FollowPayload,
    GiftSubscriptionPayload, PayloadError, RaidPayload, SubscribePayload,
};

// Re-export command types
pub use command::{Difficulty, StatusEffect, WorldCommand};

// Re-export world handle types
pub use world::{ActorId, ActorRef, Direction, Location, NameColor, Nameplate};
