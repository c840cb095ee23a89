//! The single command-application loop.
//!
//! Ingress and console tasks never touch the world. They send [`WorkItem`]s
//! over a channel to one [`GameLoop`] task, which owns the dispatcher and the
//! world and applies every batch in arrival order.

use std::future::Future;
use std::sync::Arc;

use dispatcher::{ConfigStore, Dispatcher, Outcome, WorldView};
use relay_events::{EventEnvelope, WorldCommand};
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use crate::executor::{apply_batch, ExecutionReport};
use crate::world::SimulatedWorld;

/// Bound on queued work before senders wait.
pub const QUEUE_CAPACITY: usize = 256;

/// A unit of work for the game loop.
#[derive(Debug)]
pub enum WorkItem {
    /// Inbound notification, already accepted by the ingress
    Event(EventEnvelope),
    /// Something hit the named entity
    ActorDamaged { victim: String, source: DamageSource },
    /// Names of online actors, for the console
    ListActors(oneshot::Sender<Vec<String>>),
}

/// What dealt the damage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageSource {
    /// A specific spawned hostile
    Hostile(Uuid),
    /// The newest hostile hunting the victim, if any
    LatestHostile,
    /// Anything that is not a spawned hostile
    Environment,
}

/// Sending half handed to the ingress and the console.
pub type WorkSender = mpsc::Sender<WorkItem>;

pub fn channel() -> (WorkSender, mpsc::Receiver<WorkItem>) {
    mpsc::channel(QUEUE_CAPACITY)
}

/// Owns the world and applies work items one at a time.
pub struct GameLoop {
    dispatcher: Dispatcher,
    world: SimulatedWorld,
    config: Arc<ConfigStore>,
}

impl GameLoop {
    pub fn new(dispatcher: Dispatcher, world: SimulatedWorld, config: Arc<ConfigStore>) -> Self {
        Self {
            dispatcher,
            world,
            config,
        }
    }

    pub fn world(&self) -> &SimulatedWorld {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut SimulatedWorld {
        &mut self.world
    }

    /// Processes items until every sender is dropped, then hands back the world.
    pub async fn run(self, rx: mpsc::Receiver<WorkItem>) -> SimulatedWorld {
        self.run_until(rx, std::future::pending()).await
    }

    /// Like [`run`](Self::run), but also stops once `shutdown` completes.
    ///
    /// On shutdown the queue is closed to new work and whatever is already
    /// queued is still applied.
    pub async fn run_until<F>(mut self, mut rx: mpsc::Receiver<WorkItem>, shutdown: F) -> SimulatedWorld
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                item = rx.recv() => match item {
                    Some(item) => {
                        self.handle(item);
                    }
                    None => break,
                },
                _ = &mut shutdown => {
                    rx.close();
                    while let Some(item) = rx.recv().await {
                        self.handle(item);
                    }
                    break;
                }
            }
        }
        tracing::info!("work queue closed; game loop stopping");
        self.world
    }

    /// Applies one work item. Returns the execution report for world-changing items.
    pub fn handle(&mut self, item: WorkItem) -> Option<ExecutionReport> {
        match item {
            WorkItem::Event(envelope) => Some(self.handle_envelope(&envelope)),
            WorkItem::ActorDamaged { victim, source } => self.handle_damage(&victim, source),
            WorkItem::ListActors(reply) => {
                let names = self
                    .world
                    .online_actors()
                    .into_iter()
                    .map(|actor| actor.name)
                    .collect();
                // Console may have given up waiting
                let _ = reply.send(names);
                None
            }
        }
    }

    fn handle_envelope(&mut self, envelope: &EventEnvelope) -> ExecutionReport {
        let config = self.config.snapshot();
        let outcome = match self
            .dispatcher
            .handle_envelope(envelope, &config, &self.world)
        {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(event_type = %envelope.event_type, error = %e, "invalid event payload");
                return ExecutionReport::default();
            }
        };

        match outcome {
            Outcome::Emitted { commands, .. } => apply_batch(&mut self.world, &commands),
            Outcome::Skipped(reason) => {
                tracing::info!(event_type = %envelope.event_type, reason = %reason, "event skipped");
                ExecutionReport::default()
            }
        }
    }

    fn handle_damage(&mut self, victim: &str, source: DamageSource) -> Option<ExecutionReport> {
        let Some(victim) = self.world.find_online(victim).cloned() else {
            tracing::debug!(victim = %victim, "damaged entity is not an online actor");
            return None;
        };
        let hostile = match source {
            DamageSource::Hostile(id) => Some(id),
            DamageSource::LatestHostile => self.world.latest_hostile_for(&victim).map(|h| h.id),
            DamageSource::Environment => None,
        };
        let damager = self.world.damager(hostile);
        let config = self.config.snapshot();
        let effect = self
            .dispatcher
            .on_actor_damaged(&victim, &damager, &config)?;

        let label = damager
            .nameplate
            .as_ref()
            .map(|plate| plate.text.clone())
            .unwrap_or_default();
        tracing::info!(
            victim = %victim.name,
            hostile = %label,
            amplifier = config.effects.mining_fatigue.amplifier,
            "tagged hostile hit actor; mining fatigue applied"
        );
        let commands = [
            effect,
            WorldCommand::DirectMessage {
                to_actor: victim,
                text: format!("§4⛏ Mining speed reduced by {}!", label),
            },
        ];
        Some(apply_batch(&mut self.world, &commands))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dispatcher::RelayConfig;
    use relay_events::{samples, EventKind, StatusEffect};

    fn game_loop(world: SimulatedWorld) -> GameLoop {
        let mut config = RelayConfig::default();
        config.target.streamer_username = Some("Mira".into());
        GameLoop::new(
            Dispatcher::seeded(9),
            world,
            Arc::new(ConfigStore::new(config)),
        )
    }

    #[test]
    fn test_sample_cheer_spawns_in_mines() {
        let mut world = SimulatedWorld::new();
        let mira = world.join("Mira", "mines/a");
        let mut game = game_loop(world);

        let report = game
            .handle(WorkItem::Event(samples::sample_envelope(EventKind::Cheer)))
            .unwrap();

        assert_eq!(report.spawned, 5);
        assert_eq!(report.attempted, 9);
        assert!(report.is_clean());
        let placed = game.world().actor(&mira).unwrap();
        assert_eq!(placed.inbox.len(), 2);
        assert_eq!(game.world().broadcasts().len(), 1);
    }

    #[test]
    fn test_unavailable_chunks_count_failures() {
        let mut world = SimulatedWorld::new();
        world.join("Mira", "mines/a");
        world.set_chunks_unavailable("mines/a");
        let mut game = game_loop(world);

        let report = game
            .handle(WorkItem::Event(samples::sample_envelope(EventKind::Raid)))
            .unwrap();

        assert_eq!(report.spawn_requested, 10);
        assert_eq!(report.spawned, 0);
        assert_eq!(report.failures.len(), 10);
        // Messages and broadcast still go out
        assert_eq!(report.succeeded, 4);
    }

    #[test]
    fn test_tagged_hit_applies_fatigue() {
        let mut world = SimulatedWorld::new();
        let mira = world.join("Mira", "mines/a");
        let mut game = game_loop(world);
        game.handle(WorkItem::Event(samples::sample_envelope(EventKind::Subscribe)));
        let hostile = game.world().latest_hostile_for(&mira).unwrap().id;

        let report = game
            .handle(WorkItem::ActorDamaged {
                victim: "Mira".into(),
                source: DamageSource::Hostile(hostile),
            })
            .unwrap();

        assert!(report.is_clean());
        let placed = game.world().actor(&mira).unwrap();
        assert_eq!(placed.effects[0].effect, StatusEffect::MiningFatigue);
        assert_eq!(
            placed.inbox.last().map(String::as_str),
            Some("§4⛏ Mining speed reduced by TestUser!")
        );
    }

    #[test]
    fn test_untagged_hit_is_ignored() {
        let mut world = SimulatedWorld::new();
        let mira = world.join("Mira", "mines/a");
        let mut game = game_loop(world);

        assert!(game
            .handle(WorkItem::ActorDamaged {
                victim: "Mira".into(),
                source: DamageSource::LatestHostile,
            })
            .is_none());
        assert!(game.world().actor(&mira).unwrap().effects.is_empty());
        assert!(game
            .handle(WorkItem::ActorDamaged {
                victim: "Villager".into(),
                source: DamageSource::Environment,
            })
            .is_none());
    }

    #[tokio::test]
    async fn test_run_drains_queue() {
        let mut world = SimulatedWorld::new();
        world.join("Mira", "overworld");
        let game = game_loop(world);
        let (tx, rx) = channel();
        let task = tokio::spawn(game.run(rx));

        tx.send(WorkItem::Event(samples::sample_envelope(EventKind::Follow)))
            .await
            .unwrap();
        let (reply_tx, reply_rx) = oneshot::channel();
        tx.send(WorkItem::ListActors(reply_tx)).await.unwrap();
        assert_eq!(reply_rx.await.unwrap(), vec!["Mira".to_string()]);
        drop(tx);

        let world = task.await.unwrap();
        let mira = world.find_online("Mira").unwrap();
        assert_eq!(world.actor(mira).unwrap().inventory["golden_apple"], 1);
    }

    #[tokio::test]
    async fn test_shutdown_drains_queued_work() {
        let mut world = SimulatedWorld::new();
        world.join("Mira", "overworld");
        let game = game_loop(world);
        let (tx, rx) = channel();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();

        for _ in 0..3 {
            tx.send(WorkItem::Event(samples::sample_envelope(EventKind::Follow)))
                .await
                .unwrap();
        }
        stop_tx.send(()).unwrap();

        let world = game
            .run_until(rx, async {
                let _ = stop_rx.await;
            })
            .await;
        let mira = world.find_online("Mira").unwrap();
        assert_eq!(world.actor(mira).unwrap().inventory["golden_apple"], 3);
        // Sender is still alive but the queue is closed
        assert!(tx.try_send(WorkItem::ListActors(oneshot::channel().0)).is_err());
    }
}
