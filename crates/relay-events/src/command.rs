//! World commands.
//!
//! Value objects produced by the dispatcher and handed straight to the game
//! adapter. Nothing here touches the game.

use serde::{Deserialize, Serialize};

use crate::world::{ActorRef, Location, Nameplate};

/// World difficulty levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Peaceful,
    Easy,
    Normal,
    Hard,
}

/// Status effects the relay can apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusEffect {
    /// Slows block breaking
    MiningFatigue,
}

/// A single world-affecting instruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorldCommand {
    /// Spawn `count` hostiles at `at`, targeting `near_actor`.
    SpawnHostiles {
        near_actor: ActorRef,
        at: Location,
        count: u32,
        subject_kind: String,
        label: Nameplate,
    },
    GrantItem {
        to_actor: ActorRef,
        item_kind: String,
        count: u32,
    },
    Broadcast {
        text: String,
    },
    DirectMessage {
        to_actor: ActorRef,
        text: String,
    },
    SetWorldDifficulty {
        world: String,
        level: Difficulty,
    },
    ApplyStatusEffect {
        to_actor: ActorRef,
        effect: StatusEffect,
        duration_ticks: u32,
        amplifier: u32,
    },
}

impl WorldCommand {
    /// Short name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            WorldCommand::SpawnHostiles { .. } => "spawn_hostiles",
            WorldCommand::GrantItem { .. } => "grant_item",
            WorldCommand::Broadcast { .. } => "broadcast",
            WorldCommand::DirectMessage { .. } => "direct_message",
            WorldCommand::SetWorldDifficulty { .. } => "set_world_difficulty",
            WorldCommand::ApplyStatusEffect { .. } => "apply_status_effect",
        }
    }

    pub fn is_spawn(&self) -> bool {
        matches!(self, WorldCommand::SpawnHostiles { .. })
    }
}
