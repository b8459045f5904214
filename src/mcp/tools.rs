//! MCP Tools Implementation
//!
//! The four gateway tools and the registry that installs them on a server.
//! Database failures never surface as protocol errors: handlers log them and
//! answer with the same text a missing record would produce.

use crate::database::ConnectionManager;
use crate::mcp::errors::McpError;
use crate::mcp::format;
use crate::mcp::protocol::*;
use crate::mcp::server::{McpServer, ToolHandler};
use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

pub const FETCH_PLAYER_INFO: &str = "fetchPlayerInfo";
pub const GET_RECENT_PLAYERS: &str = "getRecentPlayers";
pub const LIST_SUPPLIES: &str = "listSupplies";
pub const GET_SUPPLY_DETAILS: &str = "getSupplyDetails";

/// Pull a required string argument. Numbers are accepted and rendered as
/// text so `{"id": 7}` works the same as `{"id": "7"}`.
fn required_string(params: &CallToolParams, key: &str) -> Result<String, McpError> {
    let value = params
        .arguments
        .as_ref()
        .and_then(|args| args.get(key))
        .ok_or_else(|| McpError::InvalidToolParameters {
            tool: params.name.clone(),
            message: format!("Missing required parameter: {}", key),
        })?;

    match value {
        Value::String(text) => Ok(text.clone()),
        Value::Number(number) => Ok(number.to_string()),
        _ => Err(McpError::InvalidToolParameters {
            tool: params.name.clone(),
            message: format!("Parameter '{}' must be a string", key),
        }),
    }
}

fn no_arguments_schema() -> Value {
    json!({
        "type": "object",
        "properties": {},
        "additionalProperties": false
    })
}

/// Player lookup by name, case-insensitive
pub struct FetchPlayerInfoHandler {
    manager: Arc<ConnectionManager>,
}

impl FetchPlayerInfoHandler {
    #[inline]
    pub fn new(manager: Arc<ConnectionManager>) -> Self {
        Self { manager }
    }

    #[inline]
    pub fn tool_definition() -> Tool {
        Tool {
            name: FETCH_PLAYER_INFO.to_string(),
            description: Some(
                "Look up a player by name (case-insensitive) and report registration time, \
                 last login time and whether they are currently online"
                    .to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "name": {
                        "type": "string",
                        "description": "Player name"
                    }
                },
                "required": ["name"],
                "additionalProperties": false
            }),
        }
    }

    /// Render the lookup result; any failure reads as "not found"
    #[inline]
    pub async fn fetch(&self, name: &str) -> String {
        debug!("Fetching player info for '{}'", name);

        match self.manager.query_player_by_name(name).await {
            Ok(record) => format::player_info(record.as_ref()),
            Err(e) => {
                warn!("Player lookup for '{}' failed: {}", name, e);
                format::player_info(None)
            }
        }
    }
}

#[async_trait]
impl ToolHandler for FetchPlayerInfoHandler {
    #[inline]
    async fn handle(&self, params: CallToolParams) -> Result<CallToolResult> {
        let name = required_string(&params, "name")?;
        Ok(CallToolResult::text([self.fetch(&name).await]))
    }
}

/// Names of the most recently active players
pub struct GetRecentPlayersHandler {
    manager: Arc<ConnectionManager>,
}

impl GetRecentPlayersHandler {
    #[inline]
    pub fn new(manager: Arc<ConnectionManager>) -> Self {
        Self { manager }
    }

    #[inline]
    pub fn tool_definition() -> Tool {
        Tool {
            name: GET_RECENT_PLAYERS.to_string(),
            description: Some(
                "List the names of the players who logged in most recently, newest first"
                    .to_string(),
            ),
            input_schema: no_arguments_schema(),
        }
    }

    /// Names newest first; empty when the database is unavailable
    #[inline]
    pub async fn recent(&self) -> Vec<String> {
        match self.manager.query_recent_players().await {
            Ok(names) => names,
            Err(e) => {
                warn!("Recent player query failed: {}", e);
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl ToolHandler for GetRecentPlayersHandler {
    #[inline]
    async fn handle(&self, _params: CallToolParams) -> Result<CallToolResult> {
        Ok(CallToolResult::text(self.recent().await))
    }
}

/// Every supply with its content
pub struct ListSuppliesHandler {
    manager: Arc<ConnectionManager>,
}

impl ListSuppliesHandler {
    #[inline]
    pub fn new(manager: Arc<ConnectionManager>) -> Self {
        Self { manager }
    }

    #[inline]
    pub fn tool_definition() -> Tool {
        Tool {
            name: LIST_SUPPLIES.to_string(),
            description: Some("List all supply points with their ID and content".to_string()),
            input_schema: no_arguments_schema(),
        }
    }

    #[inline]
    pub async fn list(&self) -> String {
        match self.manager.query_supplies().await {
            Ok(records) => format::supply_list(&records),
            Err(e) => {
                warn!("Supply listing failed: {}", e);
                format::supply_list(&[])
            }
        }
    }
}

#[async_trait]
impl ToolHandler for ListSuppliesHandler {
    #[inline]
    async fn handle(&self, _params: CallToolParams) -> Result<CallToolResult> {
        Ok(CallToolResult::text([self.list().await]))
    }
}

/// Location and state of one supply
pub struct GetSupplyDetailsHandler {
    manager: Arc<ConnectionManager>,
}

impl GetSupplyDetailsHandler {
    #[inline]
    pub fn new(manager: Arc<ConnectionManager>) -> Self {
        Self { manager }
    }

    #[inline]
    pub fn tool_definition() -> Tool {
        Tool {
            name: GET_SUPPLY_DETAILS.to_string(),
            description: Some(
                "Show world, coordinates, efficiency, availability and message of one supply point"
                    .to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "id": {
                        "type": "string",
                        "description": "Supply ID, as shown by listSupplies"
                    }
                },
                "required": ["id"],
                "additionalProperties": false
            }),
        }
    }

    #[inline]
    pub async fn details(&self, id: &str) -> String {
        match self.manager.query_supply_detail(id).await {
            Ok(detail) => format::supply_detail(id, detail.as_ref()),
            Err(e) => {
                warn!("Supply detail query for '{}' failed: {}", id, e);
                format::supply_not_found(id)
            }
        }
    }
}

#[async_trait]
impl ToolHandler for GetSupplyDetailsHandler {
    #[inline]
    async fn handle(&self, params: CallToolParams) -> Result<CallToolResult> {
        let id = required_string(&params, "id")?;
        Ok(CallToolResult::text([self.details(&id).await]))
    }
}

/// Tool definitions paired with their handlers, keyed by tool name
pub struct ToolRegistry {
    tools: HashMap<String, (Tool, Box<dyn ToolHandler>)>,
}

impl ToolRegistry {
    #[inline]
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool, replacing any previous tool with the same name
    #[inline]
    pub fn register<H>(&mut self, tool: Tool, handler: H)
    where
        H: ToolHandler + 'static,
    {
        self.tools.insert(tool.name.clone(), (tool, Box::new(handler)));
    }

    /// All registered tool definitions, sorted by name
    #[inline]
    pub fn list_tools(&self) -> Vec<Tool> {
        let mut tools: Vec<Tool> = self.tools.values().map(|(tool, _)| tool.clone()).collect();
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        tools
    }

    #[inline]
    pub fn get_tool(&self, name: &str) -> Option<&Tool> {
        self.tools.get(name).map(|(tool, _)| tool)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// The gateway's four tools, all backed by one connection manager
    #[inline]
    pub fn gateway(manager: &Arc<ConnectionManager>) -> Self {
        let mut registry = Self::new();

        registry.register(
            FetchPlayerInfoHandler::tool_definition(),
            FetchPlayerInfoHandler::new(Arc::clone(manager)),
        );
        registry.register(
            GetRecentPlayersHandler::tool_definition(),
            GetRecentPlayersHandler::new(Arc::clone(manager)),
        );
        registry.register(
            ListSuppliesHandler::tool_definition(),
            ListSuppliesHandler::new(Arc::clone(manager)),
        );
        registry.register(
            GetSupplyDetailsHandler::tool_definition(),
            GetSupplyDetailsHandler::new(Arc::clone(manager)),
        );

        registry
    }

    /// Move every tool into the server
    #[inline]
    pub async fn install(self, server: &McpServer) {
        for (_, (tool, handler)) in self.tools {
            server.register_boxed_tool(tool, handler).await;
        }
    }
}

impl Default for ToolRegistry {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}
