//! Output destinations for finished items.
//!
//! A batch writes to exactly one [`Sink`]: either a folder with one
//! `<id>.geojson` file per record, or an SQS queue with one message per
//! record carrying the catalog name as the `catalog` attribute. Both
//! receive the same pretty-printed [`FeatureCollection`].

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::models::FeatureCollection;
use crate::sqs::{MessageAttribute, SqsQueue};

#[async_trait]
pub trait Sink: Send + Sync {
    /// Short label for log lines (`folder:<path>`, `queue:<url>`).
    fn describe(&self) -> String;

    async fn write(&self, catalog: &str, collection: &FeatureCollection) -> Result<()>;
}

pub fn render(collection: &FeatureCollection) -> Result<String> {
    Ok(serde_json::to_string_pretty(collection)?)
}

pub struct FolderSink {
    folder: PathBuf,
}

impl FolderSink {
    pub fn new(folder: &Path) -> Result<Self> {
        std::fs::create_dir_all(folder)
            .with_context(|| format!("Failed to create output folder {}", folder.display()))?;
        Ok(Self {
            folder: folder.to_path_buf(),
        })
    }

    pub fn path_for(&self, image_id: &str) -> PathBuf {
        self.folder.join(format!("{}.geojson", image_id))
    }
}

#[async_trait]
impl Sink for FolderSink {
    fn describe(&self) -> String {
        format!("folder:{}", self.folder.display())
    }

    async fn write(&self, _catalog: &str, collection: &FeatureCollection) -> Result<()> {
        let path = self.path_for(collection.item_id());
        let mut message = render(collection)?;
        message.push('\n');
        tokio::fs::write(&path, message)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        debug!(path = %path.display(), "wrote item");
        Ok(())
    }
}

pub struct QueueSink {
    queue: SqsQueue,
}

impl QueueSink {
    pub fn new(queue: SqsQueue) -> Self {
        Self { queue }
    }
}

#[async_trait]
impl Sink for QueueSink {
    fn describe(&self) -> String {
        format!("queue:{}", self.queue.queue_url())
    }

    async fn write(&self, catalog: &str, collection: &FeatureCollection) -> Result<()> {
        let message = render(collection)?;
        let message_id = self
            .queue
            .send_message(
                &message,
                &[MessageAttribute {
                    name: "catalog",
                    value: catalog,
                }],
            )
            .await?;
        debug!(message_id = %message_id, image_id = collection.item_id(), "queued item");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Attachments, Geometry, ItemProperties, Link, StacItem};
    use serde_json::{json, Map};
    use tempfile::TempDir;

    fn sample_collection(id: &str) -> FeatureCollection {
        let properties = ItemProperties {
            datetime: "2018-06-01T10:00:00Z".to_string(),
            vendor: "DigitalGlobe".to_string(),
            gsd: 0.3,
            platform: "WORLDVIEW04".to_string(),
            constellation: "WORLDVIEW".to_string(),
            instrument: "VNIR".to_string(),
            bands: Vec::new(),
            azimuth: 1.0,
            sun_azimuth: 2.0,
            sun_elevation: 3.0,
            off_nadir: 4.0,
            epsg: Some(4326),
            cloud_cover: None,
            collect_time_start: "2018-06-01T10:00:00Z".to_string(),
            collect_time_end: "2018-06-01T10:00:05Z".to_string(),
            scan_direction: "forward".to_string(),
            acquisition_rev_number: 1,
            sun_elevation_min: 0.0,
            sun_elevation_max: 0.0,
            target_azimuth_min: 0.0,
            target_azimuth_max: 0.0,
            target_azimuth_start: 0.0,
            target_azimuth_end: 0.0,
            off_nadir_min: 0.0,
            off_nadir_max: 0.0,
            off_nadir_start: 0.0,
            off_nadir_end: 0.0,
            sun_azimuth_min: 0.0,
            sun_azimuth_max: 0.0,
            stereo_pair_identifiers: Vec::new(),
            bits_per_pixel: 16,
            storage: None,
            processing_options: Vec::new(),
            vnir_association: None,
            swir_association: None,
            cavis_association: None,
            pan: None,
            multi: None,
        };
        FeatureCollection::single(
            StacItem {
                id: id.to_string(),
                kind: "Feature".to_string(),
                geometry: Geometry {
                    kind: "Point".to_string(),
                    coordinates: json!([0.0, 0.0]),
                    crs: None,
                    extra: Map::new(),
                },
                assets: Map::new(),
                links: vec![Link {
                    rel: "self".to_string(),
                    href: format!("https://example.test/item/{}", id),
                }],
                properties,
            },
            Attachments::default(),
        )
    }

    #[tokio::test]
    async fn folder_sink_writes_one_file_per_item() {
        let tmp = TempDir::new().unwrap();
        let sink = FolderSink::new(&tmp.path().join("out")).unwrap();
        sink.write("cat", &sample_collection("img-9")).await.unwrap();

        let written = std::fs::read_to_string(sink.path_for("img-9")).unwrap();
        let v: serde_json::Value = serde_json::from_str(&written).unwrap();
        assert_eq!(v["type"], "FeatureCollection");
        assert_eq!(v["features"].as_array().unwrap().len(), 1);
        assert_eq!(v["features"][0]["id"], "img-9");
        assert_eq!(v["attachments"], json!({}));
        assert!(v["features"][0]["properties"]
            .get("dg:pan_resolution_avg")
            .is_none());
        assert!(sink.describe().starts_with("folder:"));
    }

    #[tokio::test]
    async fn queue_sink_sends_catalog_attribute() {
        use crate::sqs::AwsCredentials;
        use wiremock::matchers::{body_string_contains, method};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("MessageAttribute.1.Value.StringValue=wv04"))
            .and(body_string_contains("img-7"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "<SendMessageResponse><SendMessageResult><MessageId>abc</MessageId>\
                 </SendMessageResult></SendMessageResponse>",
            ))
            .expect(1)
            .mount(&server)
            .await;

        let queue = SqsQueue::new(
            &format!("{}/1/items", server.uri()),
            Some("us-east-1"),
            AwsCredentials::new("AKID", "secret", None),
        )
        .unwrap();
        let sink = QueueSink::new(queue);
        sink.write("wv04", &sample_collection("img-7")).await.unwrap();
        assert!(sink.describe().starts_with("queue:"));
    }
}
