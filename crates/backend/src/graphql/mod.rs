use std::sync::Arc;

use async_graphql::{Context, Enum, InputObject, Object, SimpleObject, Subscription};
use futures_util::stream::{self, Stream, StreamExt};
use sentinels_shared::{
    base,
    models::{Category, MarkerRecord, OverlayDocument},
    sync::OverlaySnapshot,
};
use tokio::sync::broadcast::error::RecvError;

use crate::overlay::OverlayHub;

#[derive(Enum, Copy, Clone, Eq, PartialEq)]
pub enum GqlCategory {
    Threats,
    Assets,
    Logistics,
}

impl From<Category> for GqlCategory {
    fn from(c: Category) -> Self {
        match c {
            Category::Threats => GqlCategory::Threats,
            Category::Assets => GqlCategory::Assets,
            Category::Logistics => GqlCategory::Logistics,
        }
    }
}

impl From<GqlCategory> for Category {
    fn from(c: GqlCategory) -> Self {
        match c {
            GqlCategory::Threats => Category::Threats,
            GqlCategory::Assets => Category::Assets,
            GqlCategory::Logistics => Category::Logistics,
        }
    }
}

// GraphQL output types. Field names follow the stored document so clients
// can decode responses straight into the shared model.

#[derive(SimpleObject, Clone)]
pub struct GqlMarker {
    pub id: u64,
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    #[graphql(name = "type")]
    pub kind: String,
    pub faction: String,
}

impl From<MarkerRecord> for GqlMarker {
    fn from(r: MarkerRecord) -> Self {
        GqlMarker {
            id: r.id,
            name: r.name,
            lat: r.lat,
            lng: r.lng,
            kind: r.kind,
            faction: r.group,
        }
    }
}

#[derive(SimpleObject)]
pub struct GqlBaseMarker {
    pub category: GqlCategory,
    pub marker: GqlMarker,
}

#[derive(SimpleObject)]
pub struct GqlOverlayDocument {
    #[graphql(name = "THREATS")]
    pub threats: Vec<GqlMarker>,
    #[graphql(name = "ASSETS")]
    pub assets: Vec<GqlMarker>,
    #[graphql(name = "LOGISTICS")]
    pub logistics: Vec<GqlMarker>,
}

impl From<OverlayDocument> for GqlOverlayDocument {
    fn from(doc: OverlayDocument) -> Self {
        let convert = |records: Vec<MarkerRecord>| -> Vec<GqlMarker> {
            records.into_iter().map(GqlMarker::from).collect()
        };
        GqlOverlayDocument {
            threats: convert(doc.threats),
            assets: convert(doc.assets),
            logistics: convert(doc.logistics),
        }
    }
}

#[derive(SimpleObject)]
pub struct GqlOverlaySnapshot {
    pub revision: u64,
    pub initialized: bool,
    pub document: GqlOverlayDocument,
}

impl From<OverlaySnapshot> for GqlOverlaySnapshot {
    fn from(s: OverlaySnapshot) -> Self {
        GqlOverlaySnapshot {
            revision: s.revision,
            initialized: s.initialized,
            document: s.document.into(),
        }
    }
}

#[derive(SimpleObject)]
pub struct GqlStats {
    pub revision: u64,
    pub updated_at: Option<String>,
    pub overlay_markers: u64,
    pub base_markers: u64,
    pub subscribers: u64,
    pub db_size_bytes: u64,
}

// Input types

#[derive(InputObject)]
pub struct MarkerInput {
    pub id: u64,
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    #[graphql(name = "type")]
    pub kind: String,
    pub faction: String,
}

impl From<MarkerInput> for MarkerRecord {
    fn from(m: MarkerInput) -> Self {
        MarkerRecord {
            id: m.id,
            name: m.name,
            lat: m.lat,
            lng: m.lng,
            kind: m.kind,
            group: m.faction,
        }
    }
}

#[derive(InputObject)]
pub struct OverlayDocumentInput {
    #[graphql(name = "THREATS", default)]
    pub threats: Vec<MarkerInput>,
    #[graphql(name = "ASSETS", default)]
    pub assets: Vec<MarkerInput>,
    #[graphql(name = "LOGISTICS", default)]
    pub logistics: Vec<MarkerInput>,
}

impl From<OverlayDocumentInput> for OverlayDocument {
    fn from(input: OverlayDocumentInput) -> Self {
        let convert = |markers: Vec<MarkerInput>| -> Vec<MarkerRecord> {
            markers.into_iter().map(MarkerRecord::from).collect()
        };
        OverlayDocument {
            threats: convert(input.threats),
            assets: convert(input.assets),
            logistics: convert(input.logistics),
        }
    }
}

// Query root

pub struct QueryRoot;

#[Object]
impl QueryRoot {
    /// The shared overlay document, or null if nobody has written or
    /// subscribed yet.
    async fn overlay(&self, ctx: &Context<'_>) -> async_graphql::Result<Option<GqlOverlaySnapshot>> {
        let hub = ctx.data::<Arc<OverlayHub>>()?;
        let stored = hub.current().map_err(async_graphql::Error::new)?;
        Ok(stored.map(|s| GqlOverlaySnapshot {
            revision: s.revision,
            initialized: false,
            document: s.document.into(),
        }))
    }

    /// The hardcoded base layer, optionally limited to one category.
    async fn base_layer(&self, category: Option<GqlCategory>) -> Vec<GqlBaseMarker> {
        let dataset = base::base_dataset();
        dataset
            .iter()
            .filter(|m| match category {
                Some(c) => m.category == Category::from(c),
                None => true,
            })
            .map(|m| GqlBaseMarker {
                category: m.category.into(),
                marker: m.to_record().into(),
            })
            .collect()
    }

    async fn stats(&self, ctx: &Context<'_>) -> async_graphql::Result<GqlStats> {
        let hub = ctx.data::<Arc<OverlayHub>>()?;
        let stored = hub.current().map_err(async_graphql::Error::new)?;
        let db_size_bytes = hub
            .storage()
            .db_size_bytes()
            .map_err(async_graphql::Error::new)?;

        Ok(GqlStats {
            revision: stored.as_ref().map_or(0, |s| s.revision),
            updated_at: stored.as_ref().map(|s| s.updated_at.clone()),
            overlay_markers: stored.as_ref().map_or(0, |s| s.document.len() as u64),
            base_markers: base::base_dataset().len() as u64,
            subscribers: hub.subscriber_count() as u64,
            db_size_bytes,
        })
    }
}

// Mutation root

pub struct MutationRoot;

#[Object]
impl MutationRoot {
    /// Overwrite the whole overlay document. Returns the new revision.
    async fn push_overlay(
        &self,
        ctx: &Context<'_>,
        document: OverlayDocumentInput,
    ) -> async_graphql::Result<u64> {
        let hub = ctx.data::<Arc<OverlayHub>>()?;
        hub.push(document.into()).map_err(|e| {
            tracing::warn!(error = %e, "Rejected overlay push");
            async_graphql::Error::new(e)
        })
    }
}

// Subscription root

pub struct SubscriptionRoot;

#[Subscription]
impl SubscriptionRoot {
    /// Current overlay content first, then every subsequent write.
    async fn overlay_changed(
        &self,
        ctx: &Context<'_>,
    ) -> async_graphql::Result<impl Stream<Item = GqlOverlaySnapshot>> {
        let hub = ctx.data::<Arc<OverlayHub>>()?;
        let (initial, receiver) = hub.subscribe().map_err(async_graphql::Error::new)?;
        tracing::debug!(revision = initial.revision, "Overlay subscriber attached");

        let updates = stream::unfold(receiver, |mut receiver| async move {
            loop {
                match receiver.recv().await {
                    Ok(snapshot) => return Some((snapshot, receiver)),
                    // Every snapshot is the full document, so skipping ahead is safe.
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Overlay subscriber lagged");
                    }
                    Err(RecvError::Closed) => return None,
                }
            }
        });

        Ok(stream::once(async move { initial })
            .chain(updates)
            .map(GqlOverlaySnapshot::from))
    }
}

pub type Schema = async_graphql::Schema<QueryRoot, MutationRoot, SubscriptionRoot>;

pub fn build_schema(hub: Arc<OverlayHub>) -> Schema {
    async_graphql::Schema::build(QueryRoot, MutationRoot, SubscriptionRoot)
        .data(hub)
        .finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Storage;

    fn schema() -> (tempfile::TempDir, Arc<OverlayHub>, Schema) {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::open(&dir.path().join("gql.redb")).unwrap();
        let hub = OverlayHub::new(storage);
        let schema = build_schema(hub.clone());
        (dir, hub, schema)
    }

    const PUSH: &str = r#"mutation {
        pushOverlay(document: {
            THREATS: [{ id: 1717000000000, name: "New Hostile", lat: 10.0, lng: 20.0, type: "User Added", faction: "Unknown Force" }]
        })
    }"#;

    #[tokio::test]
    async fn test_overlay_is_null_before_first_write() {
        let (_dir, _hub, schema) = schema();
        let res = schema.execute("{ overlay { revision } }").await;
        assert!(res.errors.is_empty());
        let json = res.data.into_json().unwrap();
        assert!(json["overlay"].is_null());
    }

    #[tokio::test]
    async fn test_push_then_query_overlay() {
        let (_dir, _hub, schema) = schema();
        let res = schema.execute(PUSH).await;
        assert!(res.errors.is_empty(), "{:?}", res.errors);
        assert_eq!(res.data.into_json().unwrap()["pushOverlay"], 1);

        let res = schema
            .execute("{ overlay { revision document { THREATS { id name type faction } ASSETS { id } } } }")
            .await;
        let json = res.data.into_json().unwrap();
        let doc = &json["overlay"]["document"];
        assert_eq!(json["overlay"]["revision"], 1);
        assert_eq!(doc["THREATS"][0]["name"], "New Hostile");
        assert_eq!(doc["THREATS"][0]["type"], "User Added");
        assert_eq!(doc["THREATS"][0]["faction"], "Unknown Force");
        assert_eq!(doc["ASSETS"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_overlay_response_decodes_into_shared_document() {
        let (_dir, _hub, schema) = schema();
        schema.execute(PUSH).await;
        let res = schema
            .execute("{ overlay { document { THREATS { id name lat lng type faction } ASSETS { id name lat lng type faction } LOGISTICS { id name lat lng type faction } } } }")
            .await;
        let json = res.data.into_json().unwrap();
        let doc: OverlayDocument = serde_json::from_value(json["overlay"]["document"].clone()).unwrap();
        assert_eq!(doc.threats[0].id, 1_717_000_000_000);
        assert_eq!(doc.threats[0].group, "Unknown Force");
    }

    #[tokio::test]
    async fn test_push_with_reserved_id_is_an_error() {
        let (_dir, _hub, schema) = schema();
        let res = schema
            .execute(r#"mutation { pushOverlay(document: { ASSETS: [{ id: 301, name: "x", lat: 0, lng: 0, type: "t", faction: "f" }] }) }"#)
            .await;
        assert_eq!(res.errors.len(), 1);
        assert!(res.errors[0].message.contains("reserved"));
    }

    #[tokio::test]
    async fn test_base_layer_filter() {
        let (_dir, _hub, schema) = schema();
        let res = schema
            .execute("{ baseLayer(category: LOGISTICS) { category marker { id name } } }")
            .await;
        let json = res.data.into_json().unwrap();
        let markers = json["baseLayer"].as_array().unwrap();
        assert_eq!(markers.len(), 2);
        assert_eq!(markers[0]["category"], "LOGISTICS");
        assert_eq!(markers[0]["marker"]["name"], "Refuel: Pizza Hut");
    }

    #[tokio::test]
    async fn test_stats_after_push() {
        let (_dir, _hub, schema) = schema();
        schema.execute(PUSH).await;
        let res = schema
            .execute("{ stats { revision overlayMarkers baseMarkers dbSizeBytes updatedAt } }")
            .await;
        let json = res.data.into_json().unwrap();
        assert_eq!(json["stats"]["revision"], 1);
        assert_eq!(json["stats"]["overlayMarkers"], 1);
        assert_eq!(json["stats"]["baseMarkers"], 10);
        assert!(json["stats"]["updatedAt"].is_string());
    }

    #[tokio::test]
    async fn test_subscription_initializes_then_streams_pushes() {
        let (_dir, hub, schema) = schema();
        let mut stream = schema.execute_stream(
            "subscription { overlayChanged { revision initialized document { THREATS { name } } } }",
        );

        let first = stream.next().await.unwrap();
        assert!(first.errors.is_empty(), "{:?}", first.errors);
        let first = first.data.into_json().unwrap();
        assert_eq!(first["overlayChanged"]["initialized"], true);
        assert_eq!(first["overlayChanged"]["revision"], 0);

        hub.push(OverlayDocument {
            threats: vec![MarkerRecord {
                id: 20_000,
                name: "Pushed".to_string(),
                lat: 1.0,
                lng: 2.0,
                kind: "User Added".to_string(),
                group: "Unknown Force".to_string(),
            }],
            ..Default::default()
        })
        .unwrap();

        let second = stream.next().await.unwrap().data.into_json().unwrap();
        assert_eq!(second["overlayChanged"]["initialized"], false);
        assert_eq!(second["overlayChanged"]["revision"], 1);
        assert_eq!(
            second["overlayChanged"]["document"]["THREATS"][0]["name"],
            "Pushed"
        );
    }
}
