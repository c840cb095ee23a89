//! In-memory game adapter.
//!
//! `SimulatedWorld` stands in for a real game server: it tracks online
//! actors, where they stand, per-world difficulty, inventories, spawned
//! hostiles, status effects, and what each actor has been told. It is both
//! the [`WorldView`] the dispatcher reads and the [`CommandExecutor`] that
//! applies the resulting commands.

use std::collections::{BTreeMap, BTreeSet};

use dispatcher::{Damager, WorldView};
use relay_events::{
    ActorId, ActorRef, Difficulty, Direction, Location, Nameplate, StatusEffect, WorldCommand,
};
use uuid::Uuid;

use crate::error::ExecutionError;
use crate::executor::CommandExecutor;

/// Entity kinds the world can spawn.
pub const HOSTILE_KINDS: &[&str] = &[
    "zombie",
    "skeleton",
    "creeper",
    "spider",
    "cave_spider",
    "husk",
    "stray",
    "drowned",
    "witch",
    "slime",
];

/// Item kinds the world can hand out.
pub const ITEM_KINDS: &[&str] = &[
    "golden_apple",
    "enchanted_golden_apple",
    "bread",
    "cooked_beef",
    "diamond",
    "emerald",
    "iron_ingot",
    "torch",
];

/// Broadcasts and inbox messages kept per list; older ones are dropped.
pub const MESSAGE_HISTORY: usize = 50;

/// Live hostiles kept; the oldest despawn first.
pub const HOSTILE_LIMIT: usize = 512;

/// An online actor and everything the world knows about them.
#[derive(Debug, Clone)]
pub struct PlacedActor {
    pub actor: ActorRef,
    pub display_name: Option<String>,
    pub location: Location,
    pub facing: Direction,
    pub inventory: BTreeMap<String, u32>,
    pub effects: Vec<ActiveEffect>,
    /// Last [`MESSAGE_HISTORY`] direct messages received, oldest first
    pub inbox: Vec<String>,
}

/// A status effect currently on an actor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveEffect {
    pub effect: StatusEffect,
    pub duration_ticks: u32,
    pub amplifier: u32,
    pub ambient: bool,
    pub particles: bool,
}

/// A hostile spawned by a command.
#[derive(Debug, Clone, PartialEq)]
pub struct SpawnedHostile {
    pub id: Uuid,
    pub kind: String,
    pub at: Location,
    pub nameplate: Nameplate,
    /// Actor the hostile is hunting
    pub target: ActorRef,
}

/// In-memory world used by the relay binary and tests.
#[derive(Debug, Clone, Default)]
pub struct SimulatedWorld {
    actors: Vec<PlacedActor>,
    difficulty: BTreeMap<String, Difficulty>,
    hostiles: Vec<SpawnedHostile>,
    broadcasts: Vec<String>,
    unavailable_worlds: BTreeSet<String>,
}

impl SimulatedWorld {
    pub fn new() -> Self {
        Self::default()
    }

    /// Puts an actor online at the origin of `world`, facing north.
    pub fn join(&mut self, name: impl Into<String>, world: impl Into<String>) -> ActorRef {
        self.join_at(
            name,
            Location::new(world, 0.0, 64.0, 0.0),
            Direction::new(0.0, 0.0, -1.0),
        )
    }

    pub fn join_at(
        &mut self,
        name: impl Into<String>,
        location: Location,
        facing: Direction,
    ) -> ActorRef {
        let actor = ActorRef::new(ActorId::new_v4(), name);
        self.difficulty
            .entry(location.world.clone())
            .or_insert(Difficulty::Normal);
        self.actors.push(PlacedActor {
            actor: actor.clone(),
            display_name: None,
            location,
            facing,
            inventory: BTreeMap::new(),
            effects: Vec::new(),
            inbox: Vec::new(),
        });
        tracing::info!(actor = %actor.name, "actor joined");
        actor
    }

    pub fn leave(&mut self, actor: &ActorRef) -> bool {
        let before = self.actors.len();
        self.actors.retain(|placed| placed.actor != *actor);
        before != self.actors.len()
    }

    pub fn set_display_name(&mut self, actor: &ActorRef, display_name: impl Into<String>) {
        if let Some(placed) = self.placed_mut(actor) {
            placed.display_name = Some(display_name.into());
        }
    }

    /// Moves an actor, possibly into another world.
    pub fn teleport(&mut self, actor: &ActorRef, location: Location) {
        self.difficulty
            .entry(location.world.clone())
            .or_insert(Difficulty::Normal);
        if let Some(placed) = self.placed_mut(actor) {
            placed.location = location;
        }
    }

    /// Marks a world whose chunks fail to load, so every spawn there fails.
    pub fn set_chunks_unavailable(&mut self, world: impl Into<String>) {
        self.unavailable_worlds.insert(world.into());
    }

    pub fn find_online(&self, name: &str) -> Option<&ActorRef> {
        self.actors
            .iter()
            .find(|placed| placed.actor.name.eq_ignore_ascii_case(name))
            .map(|placed| &placed.actor)
    }

    pub fn actor(&self, actor: &ActorRef) -> Option<&PlacedActor> {
        self.actors.iter().find(|placed| placed.actor == *actor)
    }

    pub fn difficulty(&self, world: &str) -> Option<Difficulty> {
        self.difficulty.get(world).copied()
    }

    pub fn hostiles(&self) -> &[SpawnedHostile] {
        &self.hostiles
    }

    pub fn broadcasts(&self) -> &[String] {
        &self.broadcasts
    }

    /// Most recent hostile hunting `actor`.
    pub fn latest_hostile_for(&self, actor: &ActorRef) -> Option<&SpawnedHostile> {
        self.hostiles.iter().rev().find(|h| h.target == *actor)
    }

    /// Describes whatever damaged an actor, for the combat rule.
    pub fn damager(&self, hostile: Option<Uuid>) -> Damager {
        let nameplate = hostile
            .and_then(|id| self.hostiles.iter().find(|h| h.id == id))
            .map(|h| h.nameplate.clone());
        Damager { nameplate }
    }

    fn placed_mut(&mut self, actor: &ActorRef) -> Option<&mut PlacedActor> {
        self.actors.iter_mut().find(|placed| placed.actor == *actor)
    }

    fn require_mut(&mut self, actor: &ActorRef) -> Result<&mut PlacedActor, ExecutionError> {
        self.placed_mut(actor)
            .ok_or_else(|| ExecutionError::UnknownActor(actor.name.clone()))
    }
}

impl WorldView for SimulatedWorld {
    fn online_actors(&self) -> Vec<ActorRef> {
        self.actors.iter().map(|placed| placed.actor.clone()).collect()
    }

    fn location(&self, actor: &ActorRef) -> Option<Location> {
        self.actor(actor).map(|placed| placed.location.clone())
    }

    fn facing(&self, actor: &ActorRef) -> Option<Direction> {
        self.actor(actor).map(|placed| placed.facing)
    }

    fn display_name(&self, actor: &ActorRef) -> Option<String> {
        self.actor(actor).and_then(|placed| placed.display_name.clone())
    }
}

impl CommandExecutor for SimulatedWorld {
    fn execute(&mut self, command: &WorldCommand) -> Result<(), ExecutionError> {
        match command {
            WorldCommand::SpawnHostiles {
                near_actor,
                at,
                count,
                subject_kind,
                label,
            } => {
                if !HOSTILE_KINDS.contains(&subject_kind.as_str()) {
                    return Err(ExecutionError::UnknownEntityKind(subject_kind.clone()));
                }
                if self.unavailable_worlds.contains(&at.world) {
                    return Err(ExecutionError::ChunkUnavailable {
                        world: at.world.clone(),
                    });
                }
                self.require_mut(near_actor)?;
                for _ in 0..*count {
                    let hostile = SpawnedHostile {
                        id: Uuid::new_v4(),
                        kind: subject_kind.clone(),
                        at: at.clone(),
                        nameplate: label.clone(),
                        target: near_actor.clone(),
                    };
                    tracing::debug!(
                        id = %hostile.id,
                        kind = %hostile.kind,
                        target = %near_actor.name,
                        "hostile spawned"
                    );
                    push_capped(&mut self.hostiles, hostile, HOSTILE_LIMIT);
                }
                Ok(())
            }
            WorldCommand::GrantItem {
                to_actor,
                item_kind,
                count,
            } => {
                if !ITEM_KINDS.contains(&item_kind.as_str()) {
                    return Err(ExecutionError::UnknownItem(item_kind.clone()));
                }
                let placed = self.require_mut(to_actor)?;
                *placed.inventory.entry(item_kind.clone()).or_insert(0) += *count;
                Ok(())
            }
            WorldCommand::Broadcast { text } => {
                tracing::info!(text = %text, "broadcast");
                push_capped(&mut self.broadcasts, text.clone(), MESSAGE_HISTORY);
                Ok(())
            }
            WorldCommand::DirectMessage { to_actor, text } => {
                let inbox = &mut self.require_mut(to_actor)?.inbox;
                push_capped(inbox, text.clone(), MESSAGE_HISTORY);
                Ok(())
            }
            WorldCommand::SetWorldDifficulty { world, level } => {
                let current = self
                    .difficulty
                    .get_mut(world)
                    .ok_or_else(|| ExecutionError::UnknownWorld(world.clone()))?;
                *current = *level;
                Ok(())
            }
            WorldCommand::ApplyStatusEffect {
                to_actor,
                effect,
                duration_ticks,
                amplifier,
            } => {
                let placed = self.require_mut(to_actor)?;
                placed.effects.retain(|active| active.effect != *effect);
                placed.effects.push(ActiveEffect {
                    effect: *effect,
                    duration_ticks: *duration_ticks,
                    amplifier: *amplifier,
                    ambient: true,
                    particles: false,
                });
                Ok(())
            }
        }
    }
}

fn push_capped<T>(list: &mut Vec<T>, item: T, limit: usize) {
    list.push(item);
    if list.len() > limit {
        let excess = list.len() - limit;
        list.drain(..excess);
    }
}
