//! Command application.
//!
//! The executor is the only stage that mutates the world. Commands in a
//! batch are applied one by one; a failed command is counted and logged and
//! the rest of the batch still runs. Nothing is rolled back.

use relay_events::WorldCommand;

use crate::error::ExecutionError;

/// Applies world commands on the authoritative game thread.
pub trait CommandExecutor {
    fn execute(&mut self, command: &WorldCommand) -> Result<(), ExecutionError>;
}

/// One failed command in a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandFailure {
    /// Position in the batch
    pub index: usize,
    pub command: &'static str,
    pub error: ExecutionError,
}

/// Counters for an applied batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionReport {
    pub attempted: usize,
    pub succeeded: usize,
    /// Hostiles actually spawned
    pub spawned: u32,
    /// Hostiles requested by the batch
    pub spawn_requested: u32,
    pub failures: Vec<CommandFailure>,
}

impl ExecutionReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Applies every command in order and reports what happened.
pub fn apply_batch<E: CommandExecutor + ?Sized>(
    executor: &mut E,
    commands: &[WorldCommand],
) -> ExecutionReport {
    let mut report = ExecutionReport::default();

    for (index, command) in commands.iter().enumerate() {
        report.attempted += 1;
        let spawn_count = match command {
            WorldCommand::SpawnHostiles { count, .. } => Some(*count),
            _ => None,
        };
        if let Some(count) = spawn_count {
            report.spawn_requested += count;
        }

        match executor.execute(command) {
            Ok(()) => {
                report.succeeded += 1;
                if let Some(count) = spawn_count {
                    report.spawned += count;
                }
            }
            Err(error) => {
                tracing::warn!(index, command = command.name(), error = %error, "command failed");
                report.failures.push(CommandFailure {
                    index,
                    command: command.name(),
                    error,
                });
            }
        }
    }

    if report.spawn_requested > 0 {
        tracing::info!(
            "spawned {} of {} hostiles",
            report.spawned,
            report.spawn_requested
        );
    }
    report
}
