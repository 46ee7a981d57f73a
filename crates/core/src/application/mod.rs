// Application Layer - Queue lifecycle use cases

pub mod attribution;
pub mod command;
pub mod feed_sync;
pub mod lifecycle;
pub mod reinsertion;
pub mod roster;
pub mod team_label;

// Re-exports
pub use attribution::{AttributionResolver, ManagerSelection};
pub use command::{
    command_channel, shutdown_channel, CommandHandle, CommandLoop, CommandOutcome, QueueCommand,
    ShutdownSender, ShutdownToken,
};
pub use feed_sync::{FeedSync, WriteMode};
pub use lifecycle::{CompletedVisit, QueueController};
pub use reinsertion::{Placement, Position};
pub use roster::DocumentRoster;
