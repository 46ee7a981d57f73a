//! RPC Method Handlers
//!
//! Feed methods turn their params into a `QueueCommand` and wait for the
//! engine's answer. Roster methods go straight to the roster store.

use crate::error::to_rpc_error;
use crate::types::{
    AddManagerRequest, AddManagerResponse, AddSavedNameRequest, AddSavedNameResponse,
    BeginServiceRequest, ClearQueueRequest, CompleteVisitRequest, EnqueueRequest, EntryRequest,
    FeedRequest, FeedResponse, ManagersResponse, RemoveSavedNameRequest, RemoveSavedNameResponse,
    RosterRequest, SavedNamesResponse, SendBackRequest, SwitchRegionRequest, TeamLabelRequest,
};
use jsonrpsee::types::ErrorObjectOwned;
use queueline_core::application::{CommandHandle, CommandOutcome, QueueCommand};
use queueline_core::error::AppError;
use queueline_core::port::RosterStore;
use std::sync::Arc;
use tracing::debug;

type RpcResult<T> = Result<T, ErrorObjectOwned>;

/// RPC Handler with injected dependencies
pub struct RpcHandler {
    commands: CommandHandle,
    roster: Arc<dyn RosterStore>,
    default_location: String,
}

impl RpcHandler {
    pub fn new(
        commands: CommandHandle,
        roster: Arc<dyn RosterStore>,
        default_location: impl Into<String>,
    ) -> Self {
        Self {
            commands,
            roster,
            default_location: default_location.into(),
        }
    }

    async fn dispatch(&self, command: QueueCommand) -> RpcResult<CommandOutcome> {
        let name = command.name();
        let outcome = self.commands.send(command).await.map_err(to_rpc_error)?;
        debug!(command = name, skipped = outcome.is_skipped(), "RPC command handled");
        Ok(outcome)
    }

    fn location(&self, requested: Option<String>) -> RpcResult<String> {
        match requested {
            Some(id) if id.trim().is_empty() => Err(to_rpc_error(AppError::Validation(
                "location_id must not be empty".to_string(),
            ))),
            Some(id) => Ok(id),
            None => Ok(self.default_location.clone()),
        }
    }

    /// feed.get.v1
    pub async fn feed(&self, _params: FeedRequest) -> RpcResult<FeedResponse> {
        match self.dispatch(QueueCommand::Snapshot).await? {
            CommandOutcome::Feed { key, feed } => Ok(FeedResponse::new(key, feed)),
            other => Err(to_rpc_error(AppError::Internal(format!(
                "Unexpected snapshot outcome: {:?}",
                other
            )))),
        }
    }

    /// feed.switch_region.v1
    pub async fn switch_region(&self, params: SwitchRegionRequest) -> RpcResult<CommandOutcome> {
        self.dispatch(QueueCommand::SwitchRegion {
            region: params.region,
        })
        .await
    }

    /// queue.enqueue.v1
    pub async fn enqueue(&self, params: EnqueueRequest) -> RpcResult<CommandOutcome> {
        self.dispatch(QueueCommand::Enqueue {
            first_name: params.first_name,
            last_name: params.last_name,
            note: params.note,
        })
        .await
    }

    /// queue.begin_service.v1
    pub async fn begin_service(&self, params: BeginServiceRequest) -> RpcResult<CommandOutcome> {
        self.dispatch(QueueCommand::BeginService {
            entry_id: params.entry_id,
            join_type: params.join_type,
        })
        .await
    }

    /// queue.send_back.v1
    pub async fn send_back(&self, params: SendBackRequest) -> RpcResult<CommandOutcome> {
        self.dispatch(QueueCommand::SendBack {
            entry_id: params.entry_id,
            position: params.position,
            managers: params.managers,
        })
        .await
    }

    /// queue.complete_visit.v1
    pub async fn complete_visit(&self, params: CompleteVisitRequest) -> RpcResult<CommandOutcome> {
        self.dispatch(QueueCommand::CompleteVisit {
            entry_id: params.entry_id,
            managers: params.managers,
            position: params.position,
            early_reason: params.early_reason,
        })
        .await
    }

    /// queue.remove.v1
    pub async fn remove_from_queue(&self, params: EntryRequest) -> RpcResult<CommandOutcome> {
        self.dispatch(QueueCommand::RemoveFromQueue {
            entry_id: params.entry_id,
        })
        .await
    }

    /// completed.remove.v1
    pub async fn remove_completed(&self, params: EntryRequest) -> RpcResult<CommandOutcome> {
        self.dispatch(QueueCommand::RemoveCompleted {
            entry_id: params.entry_id,
        })
        .await
    }

    /// queue.clear.v1
    pub async fn clear_queue(&self, _params: ClearQueueRequest) -> RpcResult<CommandOutcome> {
        self.dispatch(QueueCommand::ClearQueue).await
    }

    /// active.team_label.v1
    pub async fn set_team_label(&self, params: TeamLabelRequest) -> RpcResult<CommandOutcome> {
        self.dispatch(QueueCommand::SetTeamLabel {
            entry_id: params.entry_id,
            label: params.label,
        })
        .await
    }

    /// roster.managers.list.v1
    pub async fn managers(&self, params: RosterRequest) -> RpcResult<ManagersResponse> {
        let location_id = self.location(params.location_id)?;
        let managers = self.roster.managers(&location_id).await.map_err(to_rpc_error)?;
        Ok(ManagersResponse {
            location_id,
            managers,
        })
    }

    /// roster.managers.add.v1
    pub async fn add_manager(&self, params: AddManagerRequest) -> RpcResult<AddManagerResponse> {
        let location_id = self.location(params.location_id)?;
        let manager = self
            .roster
            .add_manager(&location_id, &params.name)
            .await
            .map_err(to_rpc_error)?;
        Ok(AddManagerResponse { manager })
    }

    /// roster.names.list.v1
    pub async fn saved_names(&self, params: RosterRequest) -> RpcResult<SavedNamesResponse> {
        let location_id = self.location(params.location_id)?;
        let names = self.roster.saved_names(&location_id).await.map_err(to_rpc_error)?;
        Ok(SavedNamesResponse { location_id, names })
    }

    /// roster.names.add.v1
    pub async fn add_saved_name(&self, params: AddSavedNameRequest) -> RpcResult<AddSavedNameResponse> {
        let location_id = self.location(params.location_id)?;
        let saved_name = self
            .roster
            .add_saved_name(&location_id, &params.first_name, &params.last_name)
            .await
            .map_err(to_rpc_error)?;
        Ok(AddSavedNameResponse { saved_name })
    }

    /// roster.names.remove.v1
    pub async fn remove_saved_name(
        &self,
        params: RemoveSavedNameRequest,
    ) -> RpcResult<RemoveSavedNameResponse> {
        let location_id = self.location(params.location_id)?;
        let removed = self
            .roster
            .remove_saved_name(&location_id, &params.id)
            .await
            .map_err(to_rpc_error)?;
        Ok(RemoveSavedNameResponse {
            id: params.id,
            removed,
        })
    }
}
