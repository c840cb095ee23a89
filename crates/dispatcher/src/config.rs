//! Configuration loading for the relay.
//!
//! All relay settings are loaded from a TOML configuration file. Every
//! section and key is optional and falls back to the defaults below. The
//! live configuration sits in a [`ConfigStore`] so it can be reloaded while
//! events are in flight; each event works from the snapshot it took on entry.

use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use relay_events::EventKind;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Complete relay configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// HTTP listener settings
    pub server: ServerConfig,
    /// Diagnostics
    pub debug: DebugConfig,
    /// Who gets hit by events
    pub target: TargetConfig,
    /// Spawn limits and zone gating
    pub spawn: SpawnConfig,
    /// Per-kind event settings
    pub events: EventsConfig,
    /// Status effects applied by tagged hostiles
    pub effects: EffectsConfig,
}

impl RelayConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_str(&content)
    }

    /// Parses configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Serializes the configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// Diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    /// Log every raw inbound body
    pub log_events: bool,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self { log_events: true }
    }
}

/// Target selection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    /// `streamer` (fixed actor) or `random`
    pub mode: String,
    /// Actor name used in `streamer` mode
    #[serde(skip_serializing_if = "Option::is_none")]
    pub streamer_username: Option<String>,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            mode: "streamer".to_string(),
            streamer_username: None,
        }
    }
}

/// Spawn limits and zone gating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnConfig {
    /// Upper bound on hostiles from a single event
    pub max_mobs_per_event: u32,
    /// Worlds whose name starts with this prefix are mines worlds
    pub mines_world_prefix: String,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            max_mobs_per_event: 50,
            mines_world_prefix: "mines/".to_string(),
        }
    }
}

/// Per-kind event settings, keyed as `events.<kind>`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventsConfig {
    pub subscribe: SubscribeConfig,
    pub giftsubscription: GiftSubscriptionConfig,
    pub cheer: CheerConfig,
    pub raid: RaidConfig,
    pub follow: FollowConfig,
}

impl EventsConfig {
    /// Whether events of this kind should do anything at all.
    pub fn enabled(&self, kind: EventKind) -> bool {
        match kind {
            EventKind::Subscribe => self.subscribe.enabled,
            EventKind::GiftSubscription => self.giftsubscription.enabled,
            EventKind::Cheer => self.cheer.enabled,
            EventKind::Raid => self.raid.enabled,
            EventKind::Follow => self.follow.enabled,
        }
    }

    /// Broadcast template for this kind.
    pub fn message(&self, kind: EventKind) -> &str {
        match kind {
            EventKind::Subscribe => &self.subscribe.message,
            EventKind::GiftSubscription => &self.giftsubscription.message,
            EventKind::Cheer => &self.cheer.message,
            EventKind::Raid => &self.raid.message,
            EventKind::Follow => &self.follow.message,
        }
    }
}

/// `events.subscribe`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubscribeConfig {
    /// Off when the key is missing from a present section
    #[serde(default)]
    pub enabled: bool,
    /// Hostiles per subscription
    pub amount: u32,
    /// Hostile kind to spawn
    pub action: String,
    pub message: String,
}

impl Default for SubscribeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            amount: 1,
            action: "zombie".to_string(),
            message: "&6%user% &esubscribed! &cA zombie hunts %player%!".to_string(),
        }
    }
}

/// `events.giftsubscription`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GiftSubscriptionConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Hostiles per gifted subscription
    pub amount: u32,
    pub mob_type: String,
    pub message: String,
}

impl Default for GiftSubscriptionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            amount: 5,
            mob_type: "zombie".to_string(),
            message: "&6%user% &egifted subs! &c%amount% zombies hunt %player%!".to_string(),
        }
    }
}

/// `events.cheer`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheerConfig {
    #[serde(default)]
    pub enabled: bool,
    pub bits_per_mob: u32,
    pub mob_type: String,
    pub message: String,
}

impl Default for CheerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bits_per_mob: 100,
            mob_type: "skeleton".to_string(),
            message: "&6%user% &echeered %bits% bits! &c%amount% skeletons hunt %player%!"
                .to_string(),
        }
    }
}

/// `events.raid`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RaidConfig {
    #[serde(default)]
    pub enabled: bool,
    pub viewers_per_mob: u32,
    /// Raid-specific cap, applied instead of `spawn.max_mobs_per_event`
    pub max_mobs: u32,
    pub mob_type: String,
    pub message: String,
}

impl Default for RaidConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            viewers_per_mob: 10,
            max_mobs: 20,
            mob_type: "creeper".to_string(),
            message: "&6%user% &eraided with %viewers% viewers! &c%amount% creepers hunt %player%!"
                .to_string(),
        }
    }
}

/// `events.follow`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FollowConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Item granted to the target
    pub item: String,
    pub amount: u32,
    pub message: String,
}

impl Default for FollowConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            item: "golden_apple".to_string(),
            amount: 1,
            message: "&6%user% &efollowed! &a%player% got a golden apple.".to_string(),
        }
    }
}

/// Status effects applied by tagged hostiles.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectsConfig {
    pub mining_fatigue: MiningFatigueConfig,
}

/// `effects.mining_fatigue`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MiningFatigueConfig {
    /// Effect length in game ticks (20 per second)
    pub duration: u32,
    /// Zero-based effect level
    pub amplifier: u32,
}

impl Default for MiningFatigueConfig {
    fn default() -> Self {
        Self {
            duration: 200,
            amplifier: 1,
        }
    }
}

/// Shared, reloadable configuration.
#[derive(Debug)]
pub struct ConfigStore {
    /// File to re-read on reload, if any
    path: Option<PathBuf>,
    current: RwLock<Arc<RelayConfig>>,
}

impl ConfigStore {
    /// Creates a store holding a fixed configuration.
    pub fn new(config: RelayConfig) -> Self {
        Self {
            path: None,
            current: RwLock::new(Arc::new(config)),
        }
    }

    /// Loads the store from a file, remembering the path for reloads.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let config = RelayConfig::from_file(&path)?;
        Ok(Self {
            path: Some(path),
            current: RwLock::new(Arc::new(config)),
        })
    }

    /// Creates a store with defaults that will read `path` on the next reload.
    pub fn with_defaults_at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            current: RwLock::new(Arc::new(RelayConfig::default())),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Returns the current configuration, frozen for the caller.
    pub fn snapshot(&self) -> Arc<RelayConfig> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Re-reads the file and swaps it in. On error the old config stays.
    pub fn reload(&self) -> Result<Arc<RelayConfig>, ConfigError> {
        let path = self.path.as_deref().ok_or(ConfigError::NoPath)?;
        let config = Arc::new(RelayConfig::from_file(path)?);
        self.swap(config.clone());
        tracing::info!(path = %path.display(), "configuration reloaded");
        Ok(config)
    }

    /// Replaces the configuration outright.
    pub fn replace(&self, config: RelayConfig) {
        self.swap(Arc::new(config));
    }

    fn swap(&self, config: Arc<RelayConfig>) {
        *self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner) = config;
    }
}

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// IO error reading config file
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Error parsing TOML config
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    /// Error writing TOML config
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    /// Reload requested on a store with no backing file
    #[error("no configuration file to reload")]
    NoPath,
}

/// Generates the default configuration file content.
pub fn default_config_toml() -> String {
    r#"# Stream relay configuration

[server]
host = "0.0.0.0"
port = 8080

[debug]
log_events = true

[target]
# "streamer" targets streamer_username, "random" picks any online player
mode = "streamer"
streamer_username = "YourMinecraftName"

[spawn]
max_mobs_per_event = 50
mines_world_prefix = "mines/"

[events.subscribe]
enabled = true
amount = 1
action = "zombie"
message = "&6%user% &esubscribed! &cA zombie hunts %player%!"

[events.giftsubscription]
enabled = true
amount = 5
mob_type = "zombie"
message = "&6%user% &egifted subs! &c%amount% zombies hunt %player%!"

[events.cheer]
enabled = true
bits_per_mob = 100
mob_type = "skeleton"
message = "&6%user% &echeered %bits% bits! &c%amount% skeletons hunt %player%!"

[events.raid]
enabled = true
viewers_per_mob = 10
max_mobs = 20
mob_type = "creeper"
message = "&6%user% &eraided with %viewers% viewers! &c%amount% creepers hunt %player%!"

[events.follow]
enabled = true
item = "golden_apple"
amount = 1
message = "&6%user% &efollowed! &a%player% got a golden apple."

[effects.mining_fatigue]
duration = 200
amplifier = 1
"#
    .to_string()
}
