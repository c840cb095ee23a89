//! Event dispatch and policy resolution for the stream relay.
//!
//! The dispatcher sits between the HTTP ingress and the game adapter. It
//! validates an inbound event, applies the per-kind policy from a frozen
//! configuration snapshot, picks the affected actor, and emits the ordered
//! batch of world commands for that actor. It never touches the game
//! itself: the world is seen through [`WorldView`] and commands are plain
//! values.
//!
//! # Architecture
//!
//! ```text
//! envelope ──▶ PolicyEngine ──▶ TargetResolver ──▶ CommandEmitter ──▶ Vec<WorldCommand>
//!                  ▲                                     ▲
//!              RelayConfig                           WorldView
//! ```
//!
//! # Modules
//!
//! - [`config`]: TOML configuration and the reloadable [`ConfigStore`]
//! - [`policy`]: Per-kind derivation of counts and message templates
//! - [`target`]: Fixed or random target actor selection
//! - [`emitter`]: Zone-gated command batch construction
//! - [`combat`]: Status effect for actors hit by tagged hostiles
//! - [`text`]: Template tokens and colour codes

pub mod combat;
pub mod config;
pub mod emitter;
pub mod policy;
pub mod target;
pub mod text;

// Re-export config types
pub use config::{
    default_config_toml, CheerConfig, ConfigError, ConfigStore, DebugConfig, EffectsConfig,
    EventsConfig, FollowConfig, GiftSubscriptionConfig, MiningFatigueConfig, RaidConfig,
    RelayConfig, ServerConfig, SpawnConfig, SubscribeConfig, TargetConfig,
};

// Re-export pipeline stages
pub use combat::{CombatTagRule, Damager};
pub use emitter::{ActorState, CommandEmitter};
pub use policy::{ActionKind, DerivedAction, PolicyEngine, Resolution, SkipReason};
pub use target::{TargetMode, TargetPolicy, TargetResolver};

use relay_events::{
    ActorRef, Direction, Event, EventEnvelope, EventKind, Location, PayloadError, WorldCommand,
};

/// Read-only view of the game world used to resolve and place actors.
pub trait WorldView {
    /// Actors currently online, in a stable order.
    fn online_actors(&self) -> Vec<ActorRef>;

    fn location(&self, actor: &ActorRef) -> Option<Location>;

    fn facing(&self, actor: &ActorRef) -> Option<Direction>;

    /// Name shown in chat; defaults to the login name when absent.
    fn display_name(&self, actor: &ActorRef) -> Option<String>;

    /// Everything the emitter needs about `actor`, if it is still placed.
    fn actor_state(&self, actor: &ActorRef) -> Option<ActorState> {
        let location = self.location(actor)?;
        let facing = self.facing(actor)?;
        let display_name = self
            .display_name(actor)
            .unwrap_or_else(|| actor.name.clone());
        Some(ActorState {
            actor: actor.clone(),
            display_name,
            location,
            facing,
        })
    }
}

/// What happened to one event.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Commands ready for the executor
    Emitted {
        source: EventKind,
        target: ActorRef,
        commands: Vec<WorldCommand>,
    },
    Skipped(SkipReason),
}

impl Outcome {
    pub fn commands(&self) -> &[WorldCommand] {
        match self {
            Outcome::Emitted { commands, .. } => commands,
            Outcome::Skipped(_) => &[],
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Outcome::Skipped(_))
    }
}

/// Full event pipeline. Owns the only mutable state: the target RNG.
#[derive(Debug, Clone, Default)]
pub struct Dispatcher {
    engine: PolicyEngine,
    resolver: TargetResolver,
}

impl Dispatcher {
    pub fn new(resolver: TargetResolver) -> Self {
        Self {
            engine: PolicyEngine::new(),
            resolver,
        }
    }

    /// Dispatcher whose random target picks are reproducible.
    pub fn seeded(seed: u64) -> Self {
        Self::new(TargetResolver::seeded(seed))
    }

    /// Runs one validated event through policy, targeting and emission.
    pub fn handle_event(
        &mut self,
        event: &Event,
        config: &RelayConfig,
        world: &dyn WorldView,
    ) -> Outcome {
        let action = match self.engine.resolve(event, config) {
            Resolution::Action(action) => action,
            Resolution::Skip(reason) => return Outcome::Skipped(reason),
        };

        let policy = TargetPolicy::from_config(&config.target);
        let online = world.online_actors();
        let Some(target) = self.resolver.select(&policy, &online) else {
            tracing::info!(event_type = %action.source, "no target player; event dropped");
            return Outcome::Skipped(SkipReason::NoTarget);
        };
        let Some(state) = world.actor_state(&target) else {
            tracing::warn!(actor = %target.name, "target player has no location");
            return Outcome::Skipped(SkipReason::TargetUnavailable(target.name));
        };

        let commands = CommandEmitter::from_config(&config.spawn).build(&action, Some(&state));
        tracing::info!(
            event_type = %action.source,
            user = %action.label,
            target = %target.name,
            commands = commands.len(),
            "event dispatched"
        );
        Outcome::Emitted {
            source: action.source,
            target,
            commands,
        }
    }

    /// Validates an envelope and dispatches it.
    ///
    /// Unknown kinds are skipped rather than rejected; a payload that does
    /// not match its kind's schema is an error.
    pub fn handle_envelope(
        &mut self,
        envelope: &EventEnvelope,
        config: &RelayConfig,
        world: &dyn WorldView,
    ) -> Result<Outcome, PayloadError> {
        let Some(kind) = envelope.kind() else {
            tracing::warn!(event_type = %envelope.event_type, "unknown event type");
            return Ok(Outcome::Skipped(SkipReason::UnknownKind(
                envelope.event_type.clone(),
            )));
        };
        let event = Event::from_parts(kind, envelope.data.clone())?;
        Ok(self.handle_event(&event, config, world))
    }

    /// Evaluates the combat tag rule against the current effect settings.
    pub fn on_actor_damaged(
        &self,
        victim: &ActorRef,
        damager: &Damager,
        config: &RelayConfig,
    ) -> Option<WorldCommand> {
        CombatTagRule::from_config(&config.effects.mining_fatigue).on_actor_damaged(victim, damager)
    }
}
