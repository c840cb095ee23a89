//! Integration tests for the dispatch pipeline.
//!
//! These tests feed fixture envelopes through a [`Dispatcher`] against a small
//! in-memory world and check the command batches end-to-end.

use std::collections::HashMap;
use std::fs;

use dispatcher::{ConfigStore, Dispatcher, Outcome, RelayConfig, SkipReason, WorldView};
use relay_events::{ActorId, ActorRef, Direction, EventEnvelope, Location, WorldCommand};
use tempfile::tempdir;

/// Actors placed in named worlds.
struct FixtureWorld {
    actors: Vec<(ActorRef, Location)>,
    display_names: HashMap<ActorId, String>,
}

impl FixtureWorld {
    fn new() -> Self {
        Self {
            actors: Vec::new(),
            display_names: HashMap::new(),
        }
    }

    fn with_actor(mut self, name: &str, world: &str) -> Self {
        let actor = ActorRef::new(ActorId::new_v4(), name);
        self.actors
            .push((actor, Location::new(world, 100.0, 40.0, 100.0)));
        self
    }

    fn actor(&self, name: &str) -> ActorRef {
        self.actors
            .iter()
            .find(|(a, _)| a.name == name)
            .map(|(a, _)| a.clone())
            .expect("actor in fixture world")
    }
}

impl WorldView for FixtureWorld {
    fn online_actors(&self) -> Vec<ActorRef> {
        self.actors.iter().map(|(a, _)| a.clone()).collect()
    }

    fn location(&self, actor: &ActorRef) -> Option<Location> {
        self.actors
            .iter()
            .find(|(a, _)| a == actor)
            .map(|(_, l)| l.clone())
    }

    fn facing(&self, _actor: &ActorRef) -> Option<Direction> {
        Some(Direction::new(0.0, 0.0, -1.0))
    }

    fn display_name(&self, actor: &ActorRef) -> Option<String> {
        self.display_names.get(&actor.id).cloned()
    }
}

/// Load fixture envelopes.
fn load_envelopes() -> Vec<EventEnvelope> {
    let content = fs::read_to_string("tests/fixtures/sample_envelopes.jsonl")
        .expect("Failed to read envelopes");

    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| EventEnvelope::from_json(line).expect("Failed to parse envelope"))
        .collect()
}

fn streamer_config(name: &str) -> RelayConfig {
    let mut config = RelayConfig::default();
    config.target.streamer_username = Some(name.to_string());
    config
}

fn spawn_count(commands: &[WorldCommand]) -> usize {
    commands.iter().filter(|c| c.is_spawn()).count()
}

#[test]
fn test_fixture_envelopes_dispatch() {
    let world = FixtureWorld::new()
        .with_actor("Mira", "mines/deep")
        .with_actor("Alice", "overworld");
    let config = streamer_config("mira");
    let mut dispatcher = Dispatcher::seeded(3);

    let outcomes: Vec<Outcome> = load_envelopes()
        .iter()
        .map(|e| dispatcher.handle_envelope(e, &config, &world).unwrap())
        .collect();

    assert_eq!(outcomes.len(), 7);

    // subscribe: 1 zombie
    assert_eq!(spawn_count(outcomes[0].commands()), 1);
    // gifted subscribe: skipped
    assert_eq!(outcomes[1], Outcome::Skipped(SkipReason::GiftedSubscribe));
    // gift of 3: 15 zombies
    assert_eq!(spawn_count(outcomes[2].commands()), 15);
    // cheer 500: 5 skeletons, 9 commands total
    assert_eq!(outcomes[3].commands().len(), 9);
    // raid 45: 4 creepers
    assert_eq!(spawn_count(outcomes[4].commands()), 4);
    // follow: item plus broadcast
    assert!(matches!(
        outcomes[5].commands()[0],
        WorldCommand::GrantItem { count: 1, .. }
    ));
    // unknown kind
    assert!(outcomes[6].is_skipped());

    let mira = world.actor("Mira");
    for outcome in &outcomes[..6] {
        if let Outcome::Emitted { target, .. } = outcome {
            assert_eq!(target, &mira);
        }
    }
}

#[test]
fn test_spawns_face_the_actor_direction() {
    let world = FixtureWorld::new().with_actor("Mira", "mines/deep");
    let config = streamer_config("Mira");
    let mut dispatcher = Dispatcher::seeded(3);

    let envelope = &load_envelopes()[4];
    let outcome = dispatcher.handle_envelope(envelope, &config, &world).unwrap();

    for command in outcome.commands() {
        if let WorldCommand::SpawnHostiles { at, label, .. } = command {
            assert_eq!(at.world, "mines/deep");
            assert_eq!((at.x, at.y, at.z), (100.0, 40.0, 97.0));
            assert_eq!(label.text, "Halloway");
        }
    }
}

#[test]
fn test_actor_outside_mines_never_gets_spawns() {
    let world = FixtureWorld::new().with_actor("Mira", "overworld");
    let config = streamer_config("Mira");
    let mut dispatcher = Dispatcher::seeded(3);

    for envelope in load_envelopes() {
        let outcome = dispatcher.handle_envelope(&envelope, &config, &world).unwrap();
        assert_eq!(spawn_count(outcome.commands()), 0);
    }
}

#[test]
fn test_random_mode_is_reproducible() {
    let world = FixtureWorld::new()
        .with_actor("a", "mines/1")
        .with_actor("b", "mines/2")
        .with_actor("c", "mines/3")
        .with_actor("d", "mines/4");
    let mut config = RelayConfig::default();
    config.target.mode = "random".to_string();

    let targets = |seed: u64| -> Vec<String> {
        let mut dispatcher = Dispatcher::seeded(seed);
        load_envelopes()
            .iter()
            .filter_map(|e| match dispatcher.handle_envelope(e, &config, &world).unwrap() {
                Outcome::Emitted { target, .. } => Some(target.name),
                Outcome::Skipped(_) => None,
            })
            .collect()
    };

    assert_eq!(targets(11), targets(11));
}

#[test]
fn test_reloaded_config_applies_to_next_event() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("relay.toml");
    fs::write(
        &path,
        "[target]\nstreamer_username = \"Mira\"\n[events.cheer]\nenabled = true\nbits_per_mob = 100\n",
    )
    .unwrap();

    let store = ConfigStore::load(&path).unwrap();
    let world = FixtureWorld::new().with_actor("Mira", "mines/deep");
    let mut dispatcher = Dispatcher::seeded(3);
    let cheer = &load_envelopes()[3];

    let before = store.snapshot();
    assert_eq!(
        spawn_count(dispatcher.handle_envelope(cheer, &before, &world).unwrap().commands()),
        5
    );

    fs::write(
        &path,
        "[target]\nstreamer_username = \"Mira\"\n[events.cheer]\nenabled = true\nbits_per_mob = 250\n",
    )
    .unwrap();
    store.reload().unwrap();

    // The old snapshot is unchanged
    assert_eq!(before.events.cheer.bits_per_mob, 100);
    let after = store.snapshot();
    assert_eq!(
        spawn_count(dispatcher.handle_envelope(cheer, &after, &world).unwrap().commands()),
        2
    );
}

#[test]
fn test_disabled_kind_from_toml() {
    let config = RelayConfig::from_str(
        "[target]\nstreamer_username = \"Mira\"\n[events.raid]\nenabled = false\n",
    )
    .unwrap();
    let world = FixtureWorld::new().with_actor("Mira", "mines/deep");
    let outcome = Dispatcher::seeded(3)
        .handle_envelope(&load_envelopes()[4], &config, &world)
        .unwrap();

    assert!(outcome.is_skipped());
}
