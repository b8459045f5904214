//! MCP Tool Tests
//!
//! Tool definitions, argument handling and the degraded behaviour of every
//! tool while the database is unreachable.

#[cfg(test)]
mod tool_definition_tests {
    use crate::mcp::tools::*;

    #[test]
    fn fetch_player_info_tool_definition() {
        let tool = FetchPlayerInfoHandler::tool_definition();

        assert_eq!(tool.name, "fetchPlayerInfo");
        assert!(tool.description.is_some());

        let schema = tool.input_schema;
        assert_eq!(schema["properties"]["name"]["type"], "string");

        let required = schema["required"].as_array().expect("has required array");
        assert_eq!(required.len(), 1);
        assert_eq!(required[0], "name");
    }

    #[test]
    fn get_supply_details_tool_definition() {
        let tool = GetSupplyDetailsHandler::tool_definition();

        assert_eq!(tool.name, "getSupplyDetails");

        let schema = tool.input_schema;
        assert_eq!(schema["properties"]["id"]["type"], "string");

        let required = schema["required"].as_array().expect("has required array");
        assert_eq!(required.len(), 1);
        assert_eq!(required[0], "id");
    }

    #[test]
    fn argument_free_tool_definitions() {
        for tool in [
            GetRecentPlayersHandler::tool_definition(),
            ListSuppliesHandler::tool_definition(),
        ] {
            let properties = tool.input_schema["properties"]
                .as_object()
                .expect("has properties");
            assert!(properties.is_empty(), "{} takes no arguments", tool.name);
            assert!(tool.input_schema.get("required").is_none());
        }
    }
}

#[cfg(test)]
mod registry_tests {
    use crate::config::{DatabaseConfig, TableConfig};
    use crate::database::ConnectionManager;
    use crate::mcp::server::McpServer;
    use crate::mcp::tools::ToolRegistry;
    use std::sync::Arc;

    fn offline_manager() -> Arc<ConnectionManager> {
        Arc::new(ConnectionManager::new(
            DatabaseConfig::default(),
            TableConfig::default(),
        ))
    }

    #[test]
    fn gateway_registry_has_exact_tool_names() {
        let registry = ToolRegistry::gateway(&offline_manager());

        let names: Vec<String> = registry
            .list_tools()
            .into_iter()
            .map(|tool| tool.name)
            .collect();
        assert_eq!(
            names,
            vec![
                "fetchPlayerInfo",
                "getRecentPlayers",
                "getSupplyDetails",
                "listSupplies"
            ]
        );
        assert!(registry.get_tool("fetchPlayerInfo").is_some());
        assert!(registry.get_tool("fetch_player_info").is_none());
    }

    #[test]
    fn empty_registry() {
        let registry = ToolRegistry::default();
        assert!(registry.is_empty());
        assert!(registry.list_tools().is_empty());
    }

    #[tokio::test]
    async fn install_moves_tools_into_server() {
        let registry = ToolRegistry::gateway(&offline_manager());
        assert_eq!(registry.len(), 4);

        let server = McpServer::new("test".to_string(), "0.0.0".to_string());
        registry.install(&server).await;

        assert_eq!(server.tool_names().await.len(), 4);
        assert_eq!(server.tool_handlers.read().await.len(), 4);
    }
}

#[cfg(test)]
mod disconnected_tool_tests {
    use crate::config::{DatabaseConfig, TableConfig};
    use crate::database::ConnectionManager;
    use crate::mcp::errors::McpError;
    use crate::mcp::protocol::{CallToolParams, ToolContent};
    use crate::mcp::server::ToolHandler;
    use crate::mcp::tools::*;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Arc;

    // Never initialized, so every query reports Disconnected
    fn offline_manager() -> Arc<ConnectionManager> {
        Arc::new(ConnectionManager::new(
            DatabaseConfig::default(),
            TableConfig::default(),
        ))
    }

    fn call(name: &str, arguments: serde_json::Value) -> CallToolParams {
        let arguments: HashMap<String, serde_json::Value> =
            serde_json::from_value(arguments).expect("arguments should be an object");
        CallToolParams {
            name: name.to_string(),
            arguments: Some(arguments),
        }
    }

    fn texts(content: &[ToolContent]) -> Vec<&str> {
        content
            .iter()
            .map(|item| match item {
                ToolContent::Text { text } => text.as_str(),
            })
            .collect()
    }

    #[tokio::test]
    async fn fetch_player_info_reports_not_found() {
        let handler = FetchPlayerInfoHandler::new(offline_manager());
        let result = handler
            .handle(call("fetchPlayerInfo", json!({"name": "Notch"})))
            .await
            .expect("tool should not fail");

        assert_eq!(texts(&result.content), vec!["Player not found"]);
        assert_eq!(result.is_error, Some(false));
    }

    #[tokio::test]
    async fn get_recent_players_is_empty() {
        let handler = GetRecentPlayersHandler::new(offline_manager());
        let result = handler
            .handle(call("getRecentPlayers", json!({})))
            .await
            .expect("tool should not fail");

        assert!(result.content.is_empty());
    }

    #[tokio::test]
    async fn list_supplies_reports_none() {
        let handler = ListSuppliesHandler::new(offline_manager());
        let result = handler
            .handle(call("listSupplies", json!({})))
            .await
            .expect("tool should not fail");

        assert_eq!(texts(&result.content), vec!["No supplies found"]);
    }

    #[tokio::test]
    async fn get_supply_details_reports_missing_id() {
        let handler = GetSupplyDetailsHandler::new(offline_manager());
        let result = handler
            .handle(call("getSupplyDetails", json!({"id": "iron"})))
            .await
            .expect("tool should not fail");

        assert_eq!(
            texts(&result.content),
            vec!["No details found for supply ID iron"]
        );
    }

    #[tokio::test]
    async fn numeric_supply_id_is_accepted() {
        let handler = GetSupplyDetailsHandler::new(offline_manager());
        let result = handler
            .handle(call("getSupplyDetails", json!({"id": 42})))
            .await
            .expect("tool should not fail");

        assert_eq!(
            texts(&result.content),
            vec!["No details found for supply ID 42"]
        );
    }

    #[tokio::test]
    async fn missing_argument_is_a_parameter_error() {
        let handler = FetchPlayerInfoHandler::new(offline_manager());
        let error = handler
            .handle(call("fetchPlayerInfo", json!({})))
            .await
            .expect_err("name is required");

        let mcp_error = error
            .downcast_ref::<McpError>()
            .expect("should be an MCP error");
        assert!(matches!(
            mcp_error,
            McpError::InvalidToolParameters { tool, .. } if tool == "fetchPlayerInfo"
        ));
    }

    #[tokio::test]
    async fn non_string_argument_is_a_parameter_error() {
        let handler = GetSupplyDetailsHandler::new(offline_manager());
        let error = handler
            .handle(call("getSupplyDetails", json!({"id": ["a", "b"]})))
            .await
            .expect_err("id must be a string");

        assert!(error.downcast_ref::<McpError>().is_some());
    }

    #[tokio::test]
    async fn absent_arguments_object_is_a_parameter_error() {
        let handler = FetchPlayerInfoHandler::new(offline_manager());
        let params = CallToolParams {
            name: "fetchPlayerInfo".to_string(),
            arguments: None,
        };

        assert!(handler.handle(params).await.is_err());
    }
}
