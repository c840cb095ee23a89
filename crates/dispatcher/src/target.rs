//! Target actor selection.
//!
//! Decides which online actor an event hits: a fixed, named actor (the
//! streamer) or a uniformly random one. The random source is injected so
//! selection is reproducible under a fixed seed.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use relay_events::ActorRef;

use crate::config::TargetConfig;

/// How the target actor is chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetMode {
    /// Always the actor named in the policy
    FixedActor,
    /// Any online actor, uniformly
    RandomOnlineActor,
    /// Unrecognised mode string from config
    Unknown(String),
}

impl TargetMode {
    /// Parses a config mode string, case-insensitively.
    pub fn parse(mode: &str) -> Self {
        match mode.to_ascii_lowercase().as_str() {
            "streamer" | "fixed" => TargetMode::FixedActor,
            "random" => TargetMode::RandomOnlineActor,
            _ => TargetMode::Unknown(mode.to_string()),
        }
    }
}

/// Target selection policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetPolicy {
    pub mode: TargetMode,
    pub fixed_actor_name: Option<String>,
}

impl TargetPolicy {
    pub fn fixed(name: impl Into<String>) -> Self {
        Self {
            mode: TargetMode::FixedActor,
            fixed_actor_name: Some(name.into()),
        }
    }

    pub fn random() -> Self {
        Self {
            mode: TargetMode::RandomOnlineActor,
            fixed_actor_name: None,
        }
    }

    pub fn from_config(config: &TargetConfig) -> Self {
        Self {
            mode: TargetMode::parse(&config.mode),
            fixed_actor_name: config.streamer_username.clone(),
        }
    }
}

/// Picks the affected actor for each event.
#[derive(Debug, Clone)]
pub struct TargetResolver {
    rng: SmallRng,
}

impl TargetResolver {
    pub fn new(rng: SmallRng) -> Self {
        Self { rng }
    }

    /// Creates a resolver whose random picks are reproducible.
    pub fn seeded(seed: u64) -> Self {
        Self::new(SmallRng::seed_from_u64(seed))
    }

    pub fn from_entropy() -> Self {
        Self::new(SmallRng::from_entropy())
    }

    /// Selects the target among `online`, or `None` with a diagnostic.
    pub fn select(&mut self, policy: &TargetPolicy, online: &[ActorRef]) -> Option<ActorRef> {
        match &policy.mode {
            TargetMode::FixedActor => {
                let Some(name) = policy.fixed_actor_name.as_deref() else {
                    tracing::warn!("target mode is streamer but no streamer_username is set");
                    return None;
                };
                let found = find_by_name(online, name);
                if found.is_none() {
                    let names: Vec<&str> = online.iter().map(|a| a.name.as_str()).collect();
                    tracing::warn!(
                        target_name = %name,
                        online = ?names,
                        "target player not found; make sure they are online and the username matches"
                    );
                }
                found
            }
            TargetMode::RandomOnlineActor => {
                if online.is_empty() {
                    tracing::warn!("no players online to target");
                    return None;
                }
                let index = self.rng.gen_range(0..online.len());
                Some(online[index].clone())
            }
            TargetMode::Unknown(mode) => {
                tracing::warn!(mode = %mode, "unknown target mode");
                None
            }
        }
    }
}

impl Default for TargetResolver {
    fn default() -> Self {
        Self::from_entropy()
    }
}

/// Exact match first, then case-insensitive.
fn find_by_name(online: &[ActorRef], name: &str) -> Option<ActorRef> {
    online
        .iter()
        .find(|a| a.name == name)
        .or_else(|| online.iter().find(|a| a.name.eq_ignore_ascii_case(name)))
        .cloned()
}
