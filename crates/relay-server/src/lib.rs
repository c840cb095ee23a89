//! Relay server: HTTP ingress, command application, and a simulated world.
//!
//! # Architecture
//!
//! ```text
//! POST /event ───┐
//! POST /eventsub ├─▶ Ingress ──mpsc──▶ GameLoop ──▶ Dispatcher ──▶ apply_batch ──▶ SimulatedWorld
//! console ───────┘
//! ```
//!
//! Connections are served concurrently; everything that touches the world
//! runs on the single [`GameLoop`] task.
//!
//! # Modules
//!
//! - [`http`]: Request parsing, routing, and the accept loop
//! - [`runtime`]: Work items and the game loop
//! - [`executor`]: Command application and batch reports
//! - [`world`]: In-memory game adapter
//! - [`console`]: Administrative stdin commands

pub mod console;
pub mod error;
pub mod executor;
pub mod http;
pub mod runtime;
pub mod world;

pub use error::{ExecutionError, ServerError};
pub use executor::{apply_batch, CommandExecutor, CommandFailure, ExecutionReport};
pub use http::{Ingress, Request, Response};
pub use runtime::{DamageSource, GameLoop, WorkItem, WorkSender};
pub use world::{ActiveEffect, PlacedActor, SimulatedWorld, SpawnedHostile};

use std::net::SocketAddr;
use std::sync::Arc;

use dispatcher::{ConfigStore, Dispatcher};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// A running relay: listener plus game loop.
pub struct RelayHandle {
    addr: SocketAddr,
    queue: WorkSender,
    stop: oneshot::Sender<()>,
    server: JoinHandle<Result<(), ServerError>>,
    game: JoinHandle<SimulatedWorld>,
}

impl RelayHandle {
    /// Address the listener is bound to.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Queue for submitting work directly, e.g. from the console.
    pub fn queue(&self) -> WorkSender {
        self.queue.clone()
    }

    /// Stops accepting connections, applies already-queued work, and returns the world.
    pub async fn shutdown(self) -> Result<SimulatedWorld, ServerError> {
        self.server.abort();
        // A cancelled server is expected; anything else is reported
        match self.server.await {
            Ok(Err(e)) => tracing::warn!(error = %e, "server stopped with error"),
            Ok(Ok(())) => {}
            Err(e) if e.is_cancelled() => {}
            Err(e) => return Err(ServerError::Task(e.to_string())),
        }
        // Game loop may already be gone
        let _ = self.stop.send(());
        self.game
            .await
            .map_err(|e| ServerError::Task(e.to_string()))
    }
}

/// Binds the configured address and starts the relay tasks.
pub async fn start(
    store: Arc<ConfigStore>,
    world: SimulatedWorld,
    dispatcher: Dispatcher,
) -> Result<RelayHandle, ServerError> {
    let config = store.snapshot();
    let bind = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(bind.as_str())
        .await
        .map_err(|e| ServerError::bind(&bind, e))?;
    let addr = listener.local_addr()?;

    let (queue, rx) = runtime::channel();
    let (stop, stopped) = oneshot::channel();
    let game_loop = GameLoop::new(dispatcher, world, Arc::clone(&store));
    let game = tokio::spawn(game_loop.run_until(rx, async {
        let _ = stopped.await;
    }));
    let ingress = Arc::new(Ingress::new(queue.clone(), store));
    let server = tokio::spawn(http::serve(listener, ingress));

    Ok(RelayHandle {
        addr,
        queue,
        stop,
        server,
        game,
    })
}
