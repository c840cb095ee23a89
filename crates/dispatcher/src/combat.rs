//! Combat tag rule: relay-spawned hostiles slow their victims' mining.

use relay_events::{ActorRef, Nameplate, StatusEffect, WorldCommand};

use crate::config::MiningFatigueConfig;

/// What hit the actor, as far as the rule cares.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Damager {
    pub nameplate: Option<Nameplate>,
}

impl Damager {
    pub fn untagged() -> Self {
        Self { nameplate: None }
    }

    pub fn tagged(nameplate: Nameplate) -> Self {
        Self {
            nameplate: Some(nameplate),
        }
    }

    /// Visible nameplate in the reserved hostile colour.
    pub fn is_relay_hostile(&self) -> bool {
        self.nameplate
            .as_ref()
            .is_some_and(|plate| plate.visible && plate.is_hostile_marker())
    }
}

/// Stateless rule mapping damage by a tagged hostile to a status effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CombatTagRule {
    pub duration_ticks: u32,
    pub amplifier: u32,
}

impl CombatTagRule {
    pub fn from_config(config: &MiningFatigueConfig) -> Self {
        Self {
            duration_ticks: config.duration,
            amplifier: config.amplifier,
        }
    }

    pub fn on_actor_damaged(&self, victim: &ActorRef, damager: &Damager) -> Option<WorldCommand> {
        if !damager.is_relay_hostile() {
            return None;
        }
        tracing::debug!(
            victim = %victim.name,
            duration_ticks = self.duration_ticks,
            amplifier = self.amplifier,
            "mining fatigue from tagged hostile"
        );
        Some(WorldCommand::ApplyStatusEffect {
            to_actor: victim.clone(),
            effect: StatusEffect::MiningFatigue,
            duration_ticks: self.duration_ticks,
            amplifier: self.amplifier,
        })
    }
}

impl Default for CombatTagRule {
    fn default() -> Self {
        Self::from_config(&MiningFatigueConfig::default())
    }
}
