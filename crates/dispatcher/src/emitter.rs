//! Command emission.
//!
//! Expands a [`DerivedAction`] for one resolved actor into the ordered batch
//! of [`WorldCommand`]s the executor applies. Hostiles only ever spawn inside
//! mines worlds; elsewhere the actor gets a warning instead.

use relay_events::{ActorRef, Difficulty, Direction, Location, Nameplate, WorldCommand};

use crate::config::SpawnConfig;
use crate::policy::{tokens, ActionKind, DerivedAction};
use crate::text::{substitute, translate_color_codes};

/// Distance in blocks ahead of the actor where hostiles appear.
pub const SPAWN_DISTANCE: f64 = 3.0;

/// Alternate colour character used in config templates.
pub const ALT_COLOR_CHAR: char = '&';

/// Warning sent when a spawn is requested outside a mines world.
pub const OUTSIDE_MINES_WARNING: &str = "§c⚠ Mobs can only spawn in mines worlds!";

/// Second line of the spawn summary.
pub const SPAWN_HINT: &str = "§e⛏ Watch out - they slow down mining speed!";

/// Where the resolved actor is at emission time.
#[derive(Debug, Clone, PartialEq)]
pub struct ActorState {
    pub actor: ActorRef,
    /// Name used for `%player%`
    pub display_name: String,
    pub location: Location,
    pub facing: Direction,
}

/// Builds world command batches. Never fails.
#[derive(Debug, Clone)]
pub struct CommandEmitter {
    mines_prefix: String,
    spawn_distance: f64,
}

impl CommandEmitter {
    pub fn new(mines_prefix: impl Into<String>) -> Self {
        Self {
            mines_prefix: mines_prefix.into(),
            spawn_distance: SPAWN_DISTANCE,
        }
    }

    pub fn from_config(config: &SpawnConfig) -> Self {
        Self::new(config.mines_world_prefix.clone())
    }

    /// Whether hostiles may spawn in `world`.
    pub fn is_mines_world(&self, world: &str) -> bool {
        world.starts_with(&self.mines_prefix)
    }

    /// Builds the command batch for `action` against `actor`.
    ///
    /// With no actor the batch is empty.
    pub fn build(&self, action: &DerivedAction, actor: Option<&ActorState>) -> Vec<WorldCommand> {
        let Some(state) = actor else {
            return Vec::new();
        };

        let mut commands = match action.kind {
            ActionKind::SpawnHostiles => self.spawn_batch(action, state),
            ActionKind::GrantItem => vec![WorldCommand::GrantItem {
                to_actor: state.actor.clone(),
                item_kind: action.subject_kind.clone(),
                count: action.count,
            }],
        };

        if let Some(text) = broadcast_text(action, &state.display_name) {
            commands.push(WorldCommand::Broadcast { text });
        }
        commands
    }

    fn spawn_batch(&self, action: &DerivedAction, state: &ActorState) -> Vec<WorldCommand> {
        let world = &state.location.world;
        if !self.is_mines_world(world) {
            tracing::info!(
                actor = %state.actor.name,
                world = %world,
                "spawn requested outside a mines world"
            );
            return vec![WorldCommand::DirectMessage {
                to_actor: state.actor.clone(),
                text: OUTSIDE_MINES_WARNING.to_string(),
            }];
        }

        let at = state.location.ahead(state.facing, self.spawn_distance);
        let mut commands = Vec::with_capacity(action.count as usize + 3);
        commands.push(WorldCommand::SetWorldDifficulty {
            world: world.clone(),
            level: Difficulty::Easy,
        });
        for _ in 0..action.count {
            commands.push(WorldCommand::SpawnHostiles {
                near_actor: state.actor.clone(),
                at: at.clone(),
                count: 1,
                subject_kind: action.subject_kind.clone(),
                label: Nameplate::hostile(action.label.clone()),
            });
        }
        if action.count > 0 {
            commands.push(WorldCommand::DirectMessage {
                to_actor: state.actor.clone(),
                text: format!("§c⚠ {} stream mob(s) spawned in the mines!", action.count),
            });
            commands.push(WorldCommand::DirectMessage {
                to_actor: state.actor.clone(),
                text: SPAWN_HINT.to_string(),
            });
        }
        commands
    }
}

impl Default for CommandEmitter {
    fn default() -> Self {
        Self::from_config(&SpawnConfig::default())
    }
}

/// Resolves the message template; `None` when nothing is left to say.
fn broadcast_text(action: &DerivedAction, display_name: &str) -> Option<String> {
    let mut substitutions = action.substitutions.clone();
    substitutions.insert(tokens::PLAYER.to_string(), display_name.to_string());
    let text = substitute(&action.message_template, &substitutions);
    if text.is_empty() {
        return None;
    }
    Some(translate_color_codes(ALT_COLOR_CHAR, &text))
}
