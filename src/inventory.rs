//! Inventory service client.
//!
//! Thin typed wrappers over the inventory and inventory-selection REST
//! endpoints. Every call is one authenticated GET or POST; there is no
//! retry and no caching. A non-2xx status becomes
//! [`IngestError::Source`], a non-JSON body [`IngestError::Malformed`],
//! and JSON that doesn't fit the record [`IngestError::Data`].
//!
//! | Operation | Endpoint |
//! |-----------|----------|
//! | `get_image` | `GET {inventory}/images/geospatial-images/{id}` |
//! | `get_sample_points_summary` | `GET {inventory}/image-sample-points?imageIdentifier={id}&returnSummary=True` |
//! | `get_cloud` | `GET {selection}/cover-assignments/associated-items?imageIdentifier={id}&coverTypeName=cloud` |
//! | `get_stereo` | `GET {selection}/stereo/{id}` |
//! | `list_images` | `POST {selection}/images` |

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

use crate::config::{InventoryConfig, SelectionConfig};
use crate::error::{IngestError, IngestResult};
use crate::models::{
    parse_record, CloudCovers, ImageRecord, ImageSelection, SamplePoints, StereoPairs,
};

/// The per-record metadata queries the fetch orchestrator depends on.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    async fn get_image(&self, token: &str, image_id: &str) -> IngestResult<ImageRecord>;

    async fn get_sample_points_summary(
        &self,
        token: &str,
        image_id: &str,
    ) -> IngestResult<SamplePoints>;

    async fn get_cloud(&self, token: &str, image_id: &str) -> IngestResult<CloudCovers>;

    async fn get_stereo(&self, token: &str, image_id: &str) -> IngestResult<StereoPairs>;
}

pub struct InventoryClient {
    inventory_url: String,
    selection_url: String,
    client: reqwest::Client,
}

impl InventoryClient {
    pub fn new(config: &InventoryConfig) -> anyhow::Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        Ok(Self {
            inventory_url: config.url.trim_end_matches('/').to_string(),
            selection_url: config.selection_url.trim_end_matches('/').to_string(),
            client: builder.build()?,
        })
    }

    /// Select every image identifier matching the configured filter.
    pub async fn list_images(
        &self,
        token: &str,
        selection: &SelectionConfig,
    ) -> IngestResult<Vec<String>> {
        let url = format!("{}/images", self.selection_url);
        let body = json!({
            "startTime": selection.start_time,
            "endTime": selection.end_time,
            "isGeospatial": selection.is_geospatial,
            "isOffEarth": selection.is_off_earth,
        });
        debug!(url = %url, "POST");
        let req = self.client.post(&url).bearer_auth(token).json(&body);
        let selected: ImageSelection = send_and_parse(req, &url).await?;
        Ok(selected.image_identifiers)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        token: &str,
        url: &str,
        query: &[(&str, &str)],
    ) -> IngestResult<T> {
        debug!(url = %url, "GET");
        let req = self.client.get(url).bearer_auth(token).query(query);
        send_and_parse(req, url).await
    }
}

async fn send_and_parse<T: DeserializeOwned>(
    req: reqwest::RequestBuilder,
    url: &str,
) -> IngestResult<T> {
    let resp = req.send().await.map_err(|e| IngestError::Transport {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        debug!(
            url = %url,
            status = status.as_u16(),
            body = %body.chars().take(500).collect::<String>(),
            "non-success response"
        );
        return Err(IngestError::Source {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }

    let text = resp.text().await.map_err(|e| IngestError::Transport {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    parse_record(url, &text)
}

#[async_trait]
impl MetadataSource for InventoryClient {
    async fn get_image(&self, token: &str, image_id: &str) -> IngestResult<ImageRecord> {
        let url = format!("{}/images/geospatial-images/{}", self.inventory_url, image_id);
        self.get_json(token, &url, &[]).await
    }

    async fn get_sample_points_summary(
        &self,
        token: &str,
        image_id: &str,
    ) -> IngestResult<SamplePoints> {
        let url = format!("{}/image-sample-points", self.inventory_url);
        self.get_json(
            token,
            &url,
            &[("imageIdentifier", image_id), ("returnSummary", "True")],
        )
        .await
    }

    async fn get_cloud(&self, token: &str, image_id: &str) -> IngestResult<CloudCovers> {
        let url = format!(
            "{}/cover-assignments/associated-items",
            self.selection_url
        );
        self.get_json(
            token,
            &url,
            &[("imageIdentifier", image_id), ("coverTypeName", "cloud")],
        )
        .await
    }

    async fn get_stereo(&self, token: &str, image_id: &str) -> IngestResult<StereoPairs> {
        let url = format!("{}/stereo/{}", self.selection_url, image_id);
        self.get_json(token, &url, &[]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> InventoryClient {
        InventoryClient::new(&InventoryConfig {
            url: server.uri(),
            selection_url: format!("{}/selection/", server.uri()),
            concurrency: 5,
            timeout_secs: Some(5),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn image_not_found_is_source_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/images/geospatial-images/missing"))
            .and(header("authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(404).set_body_string("no such image"))
            .mount(&server)
            .await;

        let err = client(&server).get_image("tok", "missing").await.unwrap_err();
        match err {
            IngestError::Source { status, .. } => assert_eq!(status, 404),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn sample_points_sends_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/image-sample-points"))
            .and(query_param("imageIdentifier", "img-1"))
            .and(query_param("returnSummary", "True"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"samplePointSummaries": []})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let points = client(&server)
            .get_sample_points_summary("tok", "img-1")
            .await
            .unwrap();
        assert!(points.sample_point_summaries.is_empty());
    }

    #[tokio::test]
    async fn cloud_uses_selection_service() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/selection/cover-assignments/associated-items"))
            .and(query_param("coverTypeName", "cloud"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "covers": [{"isBest": true, "coverPercentage": 12.5}]
            })))
            .mount(&server)
            .await;

        let cloud = client(&server).get_cloud("tok", "img-1").await.unwrap();
        assert_eq!(cloud.covers.len(), 1);
        assert_eq!(cloud.covers[0].cover_percentage, Some(12.5));
    }

    #[tokio::test]
    async fn html_body_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/selection/stereo/img-1"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = client(&server).get_stereo("tok", "img-1").await.unwrap_err();
        assert!(matches!(err, IngestError::Malformed { .. }));
    }

    #[tokio::test]
    async fn list_images_posts_filter() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/selection/images"))
            .and(body_json(serde_json::json!({
                "startTime": "2016-01-01T00:00:00Z",
                "endTime": "2020-01-01T00:00:00Z",
                "isGeospatial": true,
                "isOffEarth": false
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "imageIdentifiers": ["a", "b", "c"]
            })))
            .mount(&server)
            .await;

        let ids = client(&server)
            .list_images("tok", &SelectionConfig::default())
            .await
            .unwrap();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }
}
