use sentinels_shared::models::OverlayDocument;
use sentinels_shared::sync::OverlaySnapshot;
use serde::{Deserialize, Serialize};

use crate::config;

/// Selection set shared by the overlay query and the live subscription.
const SNAPSHOT_FIELDS: &str = r#"revision initialized document {
    THREATS { id name lat lng type faction }
    ASSETS { id name lat lng type faction }
    LOGISTICS { id name lat lng type faction }
}"#;

/// Subscription streaming the overlay document: current content first,
/// then every write.
pub fn overlay_subscription_query() -> String {
    format!("subscription OverlayChanged {{ overlayChanged {{ {} }} }}", SNAPSHOT_FIELDS)
}

/// Build the variables JSON for a push overlay mutation.
pub fn build_push_variables(document: &OverlayDocument) -> serde_json::Value {
    serde_json::json!({ "document": document })
}

#[derive(Debug, Clone, Serialize)]
pub struct GraphQLRequest {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variables: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphQLResponse<T> {
    pub data: Option<T>,
    pub errors: Option<Vec<GraphQLError>>,
}

impl<T> GraphQLResponse<T> {
    /// The data, or the first reported error.
    pub fn into_result(self) -> Result<T, String> {
        if let Some(errors) = self.errors {
            if let Some(first) = errors.into_iter().next() {
                return Err(first.message);
            }
        }
        self.data.ok_or_else(|| "No data returned".to_string())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphQLError {
    pub message: String,
}

async fn query<T: for<'de> Deserialize<'de>>(
    query_str: &str,
    variables: Option<serde_json::Value>,
) -> Result<T, String> {
    let req = GraphQLRequest {
        query: query_str.to_string(),
        variables,
    };
    let url = config::graphql_url(&config::page_origin()?);

    let resp = reqwest::Client::new()
        .post(url)
        .json(&req)
        .send()
        .await
        .map_err(|e| e.to_string())?;

    let gql_resp: GraphQLResponse<T> = resp.json().await.map_err(|e| e.to_string())?;
    gql_resp.into_result()
}

// Responses

#[derive(Debug, Clone, Deserialize)]
pub struct OverlayChangedData {
    #[serde(rename = "overlayChanged")]
    pub overlay_changed: OverlaySnapshot,
}

#[derive(Deserialize)]
pub struct PushOverlayResponse {
    #[serde(rename = "pushOverlay")]
    pub push_overlay: u64,
}

/// Overwrite the shared overlay document. Returns the new revision.
pub async fn push_overlay(document: &OverlayDocument) -> Result<u64, String> {
    let resp: PushOverlayResponse = query(
        r#"mutation PushOverlay($document: OverlayDocumentInput!) {
            pushOverlay(document: $document)
        }"#,
        Some(build_push_variables(document)),
    )
    .await?;
    Ok(resp.push_overlay)
}
