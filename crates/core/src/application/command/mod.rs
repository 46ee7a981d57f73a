//! Command channel between the presentation layer and the engine
//!
//! Callers never hold a reference into the controller. They send a
//! [`QueueCommand`] through a [`CommandHandle`] and await the outcome; one
//! [`CommandLoop`] task owns the controller and runs commands one at a time
//! in arrival order. The loop ends on shutdown or when every handle is gone.

mod shutdown;

pub use shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};

use crate::application::attribution::ManagerSelection;
use crate::application::lifecycle::{CompletedVisit, QueueController};
use crate::application::reinsertion::{Placement, Position};
use crate::domain::{EarlyReason, Entry, EntryId, FeedDocument, FeedKey, JoinType};
use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

/// Default bound of the command queue
pub const DEFAULT_COMMAND_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum QueueCommand {
    /// Current feed snapshot and the feed it belongs to
    Snapshot,
    Enqueue {
        first_name: String,
        #[serde(default)]
        last_name: String,
        #[serde(default)]
        note: String,
    },
    BeginService {
        entry_id: EntryId,
        join_type: JoinType,
    },
    SendBack {
        entry_id: EntryId,
        #[serde(default)]
        position: Position,
        #[serde(default)]
        managers: ManagerSelection,
    },
    CompleteVisit {
        entry_id: EntryId,
        #[serde(default)]
        managers: ManagerSelection,
        #[serde(default)]
        position: Position,
        #[serde(default)]
        early_reason: Option<EarlyReason>,
    },
    RemoveFromQueue {
        entry_id: EntryId,
    },
    RemoveCompleted {
        entry_id: EntryId,
    },
    ClearQueue,
    SetTeamLabel {
        entry_id: EntryId,
        label: String,
    },
    SwitchRegion {
        region: String,
    },
}

impl QueueCommand {
    pub fn name(&self) -> &'static str {
        match self {
            QueueCommand::Snapshot => "snapshot",
            QueueCommand::Enqueue { .. } => "enqueue",
            QueueCommand::BeginService { .. } => "begin_service",
            QueueCommand::SendBack { .. } => "send_back",
            QueueCommand::CompleteVisit { .. } => "complete_visit",
            QueueCommand::RemoveFromQueue { .. } => "remove_from_queue",
            QueueCommand::RemoveCompleted { .. } => "remove_completed",
            QueueCommand::ClearQueue => "clear_queue",
            QueueCommand::SetTeamLabel { .. } => "set_team_label",
            QueueCommand::SwitchRegion { .. } => "switch_region",
        }
    }
}

/// What a command did. `Skipped` is the benign no-op of a lost race or
/// blank input, not a failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CommandOutcome {
    Feed {
        key: Option<FeedKey>,
        feed: FeedDocument,
    },
    Enqueued {
        entry: Entry,
    },
    ServiceBegun {
        entry_id: EntryId,
        original_queue_index: usize,
    },
    SentBack {
        entry_id: EntryId,
        placement: Placement,
    },
    Completed {
        visit: CompletedVisit,
    },
    Removed {
        entry_id: EntryId,
    },
    Cleared {
        removed: usize,
    },
    TeamLabelSet {
        entry_id: EntryId,
    },
    RegionSwitched {
        key: FeedKey,
    },
    Skipped {
        reason: String,
    },
}

impl CommandOutcome {
    fn skipped(reason: impl Into<String>) -> Self {
        CommandOutcome::Skipped {
            reason: reason.into(),
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, CommandOutcome::Skipped { .. })
    }
}

struct Envelope {
    command: QueueCommand,
    reply: oneshot::Sender<Result<CommandOutcome>>,
}

/// Sending side of the command channel. Cheap to clone.
#[derive(Clone)]
pub struct CommandHandle {
    tx: mpsc::Sender<Envelope>,
}

impl CommandHandle {
    /// Send a command and wait for its outcome
    pub async fn send(&self, command: QueueCommand) -> Result<CommandOutcome> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Envelope { command, reply })
            .await
            .map_err(|_| AppError::InvalidState("Queue engine is not running".to_string()))?;
        rx.await
            .map_err(|_| AppError::Internal("Queue engine dropped the command".to_string()))?
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Receiving side; owns the controller
pub struct CommandLoop {
    controller: Arc<QueueController>,
    rx: mpsc::Receiver<Envelope>,
}

/// Create a handle/loop pair around `controller`
pub fn command_channel(controller: Arc<QueueController>, capacity: usize) -> (CommandHandle, CommandLoop) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (CommandHandle { tx }, CommandLoop { controller, rx })
}

impl CommandLoop {
    /// Process commands until shutdown or until every handle is dropped
    pub async fn run(mut self, mut shutdown: ShutdownToken) {
        info!("Command loop started");
        loop {
            tokio::select! {
                envelope = self.rx.recv() => {
                    let Some(Envelope { command, reply }) = envelope else {
                        debug!("All command handles dropped");
                        break;
                    };
                    let name = command.name();
                    let result = execute(&self.controller, command).await;
                    if let Err(e) = &result {
                        warn!(command = name, error = %e, "Command failed");
                    }
                    if reply.send(result).is_err() {
                        debug!(command = name, "Command caller went away");
                    }
                }
                _ = shutdown.wait() => {
                    info!("Command loop interrupted by shutdown");
                    break;
                }
            }
        }
        self.rx.close();
        info!("Command loop stopped");
    }
}

/// Run one command against the controller
pub async fn execute(controller: &QueueController, command: QueueCommand) -> Result<CommandOutcome> {
    let outcome = match command {
        QueueCommand::Snapshot => CommandOutcome::Feed {
            key: controller.key(),
            feed: controller.snapshot(),
        },
        QueueCommand::Enqueue {
            first_name,
            last_name,
            note,
        } => match controller.enqueue(&first_name, &last_name, &note).await? {
            Some(entry) => CommandOutcome::Enqueued { entry },
            None => CommandOutcome::skipped("first name is empty"),
        },
        QueueCommand::BeginService {
            entry_id,
            join_type,
        } => match controller.begin_service(&entry_id, join_type).await? {
            Some(index) => CommandOutcome::ServiceBegun {
                entry_id,
                original_queue_index: index,
            },
            None => CommandOutcome::skipped("entry is no longer waiting"),
        },
        QueueCommand::SendBack {
            entry_id,
            position,
            managers,
        } => match controller.send_back(&entry_id, position, &managers).await? {
            Some(placement) => CommandOutcome::SentBack {
                entry_id,
                placement,
            },
            None => CommandOutcome::skipped("entry is no longer in service"),
        },
        QueueCommand::CompleteVisit {
            entry_id,
            managers,
            position,
            early_reason,
        } => match controller
            .complete_visit(&entry_id, &managers, position, early_reason)
            .await?
        {
            Some(visit) => CommandOutcome::Completed { visit },
            None => CommandOutcome::skipped("entry is no longer in service"),
        },
        QueueCommand::RemoveFromQueue { entry_id } => {
            if controller.remove_from_queue(&entry_id).await? {
                CommandOutcome::Removed { entry_id }
            } else {
                CommandOutcome::skipped("entry is not waiting")
            }
        }
        QueueCommand::RemoveCompleted { entry_id } => {
            if controller.remove_completed(&entry_id).await? {
                CommandOutcome::Removed { entry_id }
            } else {
                CommandOutcome::skipped("entry is not in completed")
            }
        }
        QueueCommand::ClearQueue => CommandOutcome::Cleared {
            removed: controller.clear_queue().await?,
        },
        QueueCommand::SetTeamLabel { entry_id, label } => {
            if controller.set_team_label(&entry_id, &label).await? {
                CommandOutcome::TeamLabelSet { entry_id }
            } else {
                CommandOutcome::skipped("entry is not in service")
            }
        }
        QueueCommand::SwitchRegion { region } => CommandOutcome::RegionSwitched {
            key: controller.switch_region(&region).await?,
        },
    };
    Ok(outcome)
}
