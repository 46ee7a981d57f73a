//! JSON-RPC Server
//!
//! Serves the engine over JSON-RPC 2.0 on TCP.

use crate::handler::RpcHandler;
use crate::types::{
    AddManagerRequest, AddSavedNameRequest, BeginServiceRequest, ClearQueueRequest,
    CompleteVisitRequest, EnqueueRequest, EntryRequest, FeedRequest, RemoveSavedNameRequest,
    RosterRequest, SendBackRequest, SwitchRegionRequest, TeamLabelRequest,
};
use jsonrpsee::server::{Server, ServerHandle};
use jsonrpsee::RpcModule;
use queueline_core::application::CommandHandle;
use queueline_core::port::RosterStore;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

pub const DEFAULT_RPC_HOST: &str = "127.0.0.1";
pub const DEFAULT_RPC_PORT: u16 = 9630;

/// Every method the server answers
pub const METHODS: &[&str] = &[
    "feed.get.v1",
    "feed.switch_region.v1",
    "queue.enqueue.v1",
    "queue.begin_service.v1",
    "queue.send_back.v1",
    "queue.complete_visit.v1",
    "queue.remove.v1",
    "queue.clear.v1",
    "completed.remove.v1",
    "active.team_label.v1",
    "roster.managers.list.v1",
    "roster.managers.add.v1",
    "roster.names.list.v1",
    "roster.names.add.v1",
    "roster.names.remove.v1",
];

/// RPC Server Configuration
#[derive(Debug, Clone)]
pub struct RpcServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for RpcServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_RPC_HOST.to_string(),
            port: DEFAULT_RPC_PORT,
        }
    }
}

/// RPC Server
pub struct RpcServer {
    config: RpcServerConfig,
    handler: Arc<RpcHandler>,
}

/// Register `$method` so that its params parse as `$req` and are passed to
/// `RpcHandler::$call`
macro_rules! register {
    ($module:expr, $handler:expr, $method:literal, $req:ty, $call:ident) => {{
        let handler = $handler.clone();
        $module
            .register_async_method($method, move |params, _, _| {
                let handler = handler.clone();
                async move {
                    let req: $req = params.parse()?;
                    handler.$call(req).await
                }
            })
            .map_err(|e| e.to_string())?;
    }};
}

impl RpcServer {
    pub fn new(
        config: RpcServerConfig,
        commands: CommandHandle,
        roster: Arc<dyn RosterStore>,
        location_id: impl Into<String>,
    ) -> Self {
        Self {
            config,
            handler: Arc::new(RpcHandler::new(commands, roster, location_id)),
        }
    }

    /// Build the method table
    pub fn module(&self) -> Result<RpcModule<()>, String> {
        let mut module = RpcModule::new(());
        let handler = &self.handler;

        register!(module, handler, "feed.get.v1", FeedRequest, feed);
        register!(module, handler, "feed.switch_region.v1", SwitchRegionRequest, switch_region);

        register!(module, handler, "queue.enqueue.v1", EnqueueRequest, enqueue);
        register!(module, handler, "queue.begin_service.v1", BeginServiceRequest, begin_service);
        register!(module, handler, "queue.send_back.v1", SendBackRequest, send_back);
        register!(module, handler, "queue.complete_visit.v1", CompleteVisitRequest, complete_visit);
        register!(module, handler, "queue.remove.v1", EntryRequest, remove_from_queue);
        register!(module, handler, "queue.clear.v1", ClearQueueRequest, clear_queue);
        register!(module, handler, "completed.remove.v1", EntryRequest, remove_completed);
        register!(module, handler, "active.team_label.v1", TeamLabelRequest, set_team_label);

        // Roster
        register!(module, handler, "roster.managers.list.v1", RosterRequest, managers);
        register!(module, handler, "roster.managers.add.v1", AddManagerRequest, add_manager);
        register!(module, handler, "roster.names.list.v1", RosterRequest, saved_names);
        register!(module, handler, "roster.names.add.v1", AddSavedNameRequest, add_saved_name);
        register!(module, handler, "roster.names.remove.v1", RemoveSavedNameRequest, remove_saved_name);

        Ok(module)
    }

    /// Start the JSON-RPC server. Port 0 picks a free port; the bound
    /// address is returned with the handle.
    pub async fn start(self) -> Result<(SocketAddr, ServerHandle), String> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let module = self.module()?;

        let server = Server::builder()
            .build(&addr)
            .await
            .map_err(|e| format!("Failed to build server on {}: {}", addr, e))?;
        let local_addr = server
            .local_addr()
            .map_err(|e| format!("Failed to read bound address: {}", e))?;

        info!(
            host = %self.config.host,
            addr = %local_addr,
            methods = METHODS.len(),
            "JSON-RPC server started"
        );

        let handle = server.start(module);
        Ok((local_addr, handle))
    }
}
