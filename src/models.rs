//! Typed records flowing through the loader.
//!
//! Inbound types mirror the inventory service JSON (camelCase); outbound
//! types serialize to the STAC item layout written to sinks. Required
//! fields are plain fields, so a missing one fails deserialization and is
//! reported once, as a data error, by [`parse_record`].

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{IngestError, IngestResult};

// ============ Inventory records ============

/// Image record from `images/geospatial-images/{id}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRecord {
    pub image_identifier: String,
    pub vehicle_name: String,
    pub scan_direction: String,
    pub start_time: String,
    pub end_time: String,
    pub acquisition_rev_number: i64,
    pub geometry: Geometry,
    #[serde(default)]
    pub is_ingest_complete: bool,
    /// An empty `{}` profile is treated as absent.
    #[serde(default, deserialize_with = "non_empty_profile")]
    pub data_access_profile: Option<AccessProfile>,
}

fn non_empty_profile<'de, D>(deserializer: D) -> Result<Option<AccessProfile>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(map)) if map.is_empty() => Ok(None),
        Some(value) => serde_json::from_value(value)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

/// GeoJSON geometry with the inventory's optional CRS annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    #[serde(rename = "type")]
    pub kind: String,
    pub coordinates: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crs: Option<Crs>,
    /// Other GeoJSON members (`bbox`, foreign members) pass through.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Crs {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    pub properties: CrsProperties,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrsProperties {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SamplePoints {
    #[serde(default)]
    pub sample_point_summaries: Vec<SamplePointSummary>,
}

/// Resolution and angle statistics for one band-set.
///
/// Resolution statistics are always required. Angle statistics are only
/// read from the record's main summary, so they are optional here and
/// checked by [`SamplePointSummary::angles`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SamplePointSummary {
    pub bandset_name: String,

    pub resolution_avg: f64,
    pub resolution_min: f64,
    pub resolution_max: f64,
    pub resolution_start: f64,
    pub resolution_end: f64,

    #[serde(default)]
    pub spacecraft_to_target_azimuth_angle_avg: Option<f64>,
    #[serde(default)]
    pub spacecraft_to_target_azimuth_angle_min: Option<f64>,
    #[serde(default)]
    pub spacecraft_to_target_azimuth_angle_max: Option<f64>,
    #[serde(default)]
    pub spacecraft_to_target_azimuth_angle_start: Option<f64>,
    #[serde(default)]
    pub spacecraft_to_target_azimuth_angle_end: Option<f64>,

    #[serde(default)]
    pub spacecraft_to_target_off_nadir_angle_avg: Option<f64>,
    #[serde(default)]
    pub spacecraft_to_target_off_nadir_angle_min: Option<f64>,
    #[serde(default)]
    pub spacecraft_to_target_off_nadir_angle_max: Option<f64>,
    #[serde(default)]
    pub spacecraft_to_target_off_nadir_angle_start: Option<f64>,
    #[serde(default)]
    pub spacecraft_to_target_off_nadir_angle_end: Option<f64>,

    #[serde(default)]
    pub target_to_sun_azimuth_angle_avg: Option<f64>,
    #[serde(default)]
    pub target_to_sun_azimuth_angle_min: Option<f64>,
    #[serde(default)]
    pub target_to_sun_azimuth_angle_max: Option<f64>,

    #[serde(default)]
    pub target_to_sun_elevation_angle_avg: Option<f64>,
    #[serde(default)]
    pub target_to_sun_elevation_angle_min: Option<f64>,
    #[serde(default)]
    pub target_to_sun_elevation_angle_max: Option<f64>,
}

/// Angle statistics of a main summary, all present.
#[derive(Debug, Clone, PartialEq)]
pub struct AngleStats {
    pub spacecraft_to_target_azimuth_angle_avg: f64,
    pub spacecraft_to_target_azimuth_angle_min: f64,
    pub spacecraft_to_target_azimuth_angle_max: f64,
    pub spacecraft_to_target_azimuth_angle_start: f64,
    pub spacecraft_to_target_azimuth_angle_end: f64,

    pub spacecraft_to_target_off_nadir_angle_avg: f64,
    pub spacecraft_to_target_off_nadir_angle_min: f64,
    pub spacecraft_to_target_off_nadir_angle_max: f64,
    pub spacecraft_to_target_off_nadir_angle_start: f64,
    pub spacecraft_to_target_off_nadir_angle_end: f64,

    pub target_to_sun_azimuth_angle_avg: f64,
    pub target_to_sun_azimuth_angle_min: f64,
    pub target_to_sun_azimuth_angle_max: f64,

    pub target_to_sun_elevation_angle_avg: f64,
    pub target_to_sun_elevation_angle_min: f64,
    pub target_to_sun_elevation_angle_max: f64,
}

impl SamplePointSummary {
    pub fn angles(&self) -> IngestResult<AngleStats> {
        let required = |value: Option<f64>, field: &str| {
            value.ok_or_else(|| {
                IngestError::data(format!(
                    "\"{}\" sample points summary is missing field `{}`",
                    self.bandset_name, field
                ))
            })
        };
        Ok(AngleStats {
            spacecraft_to_target_azimuth_angle_avg: required(
                self.spacecraft_to_target_azimuth_angle_avg,
                "spacecraftToTargetAzimuthAngleAvg",
            )?,
            spacecraft_to_target_azimuth_angle_min: required(
                self.spacecraft_to_target_azimuth_angle_min,
                "spacecraftToTargetAzimuthAngleMin",
            )?,
            spacecraft_to_target_azimuth_angle_max: required(
                self.spacecraft_to_target_azimuth_angle_max,
                "spacecraftToTargetAzimuthAngleMax",
            )?,
            spacecraft_to_target_azimuth_angle_start: required(
                self.spacecraft_to_target_azimuth_angle_start,
                "spacecraftToTargetAzimuthAngleStart",
            )?,
            spacecraft_to_target_azimuth_angle_end: required(
                self.spacecraft_to_target_azimuth_angle_end,
                "spacecraftToTargetAzimuthAngleEnd",
            )?,
            spacecraft_to_target_off_nadir_angle_avg: required(
                self.spacecraft_to_target_off_nadir_angle_avg,
                "spacecraftToTargetOffNadirAngleAvg",
            )?,
            spacecraft_to_target_off_nadir_angle_min: required(
                self.spacecraft_to_target_off_nadir_angle_min,
                "spacecraftToTargetOffNadirAngleMin",
            )?,
            spacecraft_to_target_off_nadir_angle_max: required(
                self.spacecraft_to_target_off_nadir_angle_max,
                "spacecraftToTargetOffNadirAngleMax",
            )?,
            spacecraft_to_target_off_nadir_angle_start: required(
                self.spacecraft_to_target_off_nadir_angle_start,
                "spacecraftToTargetOffNadirAngleStart",
            )?,
            spacecraft_to_target_off_nadir_angle_end: required(
                self.spacecraft_to_target_off_nadir_angle_end,
                "spacecraftToTargetOffNadirAngleEnd",
            )?,
            target_to_sun_azimuth_angle_avg: required(
                self.target_to_sun_azimuth_angle_avg,
                "targetToSunAzimuthAngleAvg",
            )?,
            target_to_sun_azimuth_angle_min: required(
                self.target_to_sun_azimuth_angle_min,
                "targetToSunAzimuthAngleMin",
            )?,
            target_to_sun_azimuth_angle_max: required(
                self.target_to_sun_azimuth_angle_max,
                "targetToSunAzimuthAngleMax",
            )?,
            target_to_sun_elevation_angle_avg: required(
                self.target_to_sun_elevation_angle_avg,
                "targetToSunElevationAngleAvg",
            )?,
            target_to_sun_elevation_angle_min: required(
                self.target_to_sun_elevation_angle_min,
                "targetToSunElevationAngleMin",
            )?,
            target_to_sun_elevation_angle_max: required(
                self.target_to_sun_elevation_angle_max,
                "targetToSunElevationAngleMax",
            )?,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CloudCovers {
    #[serde(default)]
    pub covers: Vec<CoverAssignment>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverAssignment {
    #[serde(default)]
    pub is_best: bool,
    #[serde(default)]
    pub cover_percentage: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StereoPairs {
    #[serde(default)]
    pub stereo_identifiers: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageSelection {
    pub image_identifiers: Vec<String>,
}

// ============ Access policy ============

/// Data access profile: time-bounded allow/deny scope policies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessProfile {
    pub policies: Vec<AccessPolicy>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessPolicy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(default)]
    pub allow: Vec<String>,
    #[serde(default)]
    pub deny: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ============ STAC output ============

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Band {
    pub name: String,
    pub center_wavelength: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Link {
    pub rel: String,
    pub href: String,
}

/// The canonical STAC item produced for one image.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StacItem {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub geometry: Geometry,
    pub assets: Map<String, Value>,
    pub links: Vec<Link>,
    pub properties: ItemProperties,
}

/// Flat property bag. Pan and multi resolution fields are omitted, not
/// nulled, when the corresponding summary is absent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemProperties {
    pub datetime: String,
    pub vendor: String,

    #[serde(rename = "eo:gsd")]
    pub gsd: f64,
    #[serde(rename = "eo:platform")]
    pub platform: String,
    #[serde(rename = "eo:constellation")]
    pub constellation: String,
    #[serde(rename = "eo:instrument")]
    pub instrument: String,
    #[serde(rename = "eo:bands")]
    pub bands: Vec<Band>,
    #[serde(rename = "eo:azimuth")]
    pub azimuth: f64,
    #[serde(rename = "eo:sun_azimuth")]
    pub sun_azimuth: f64,
    #[serde(rename = "eo:sun_elevation")]
    pub sun_elevation: f64,
    #[serde(rename = "eo:off_nadir")]
    pub off_nadir: f64,
    #[serde(rename = "eo:epsg")]
    pub epsg: Option<u32>,
    #[serde(rename = "eo:cloud_cover")]
    pub cloud_cover: Option<f64>,

    #[serde(rename = "dg:collect_time_start")]
    pub collect_time_start: String,
    #[serde(rename = "dg:collect_time_end")]
    pub collect_time_end: String,
    #[serde(rename = "dg:scan_direction")]
    pub scan_direction: String,
    #[serde(rename = "dg:acquisition_rev_number")]
    pub acquisition_rev_number: i64,

    #[serde(rename = "dg:sun_elevation_min")]
    pub sun_elevation_min: f64,
    #[serde(rename = "dg:sun_elevation_max")]
    pub sun_elevation_max: f64,

    #[serde(rename = "dg:target_azimuth_min")]
    pub target_azimuth_min: f64,
    #[serde(rename = "dg:target_azimuth_max")]
    pub target_azimuth_max: f64,
    #[serde(rename = "dg:target_azimuth_start")]
    pub target_azimuth_start: f64,
    #[serde(rename = "dg:target_azimuth_end")]
    pub target_azimuth_end: f64,

    #[serde(rename = "dg:off_nadir_min")]
    pub off_nadir_min: f64,
    #[serde(rename = "dg:off_nadir_max")]
    pub off_nadir_max: f64,
    #[serde(rename = "dg:off_nadir_start")]
    pub off_nadir_start: f64,
    #[serde(rename = "dg:off_nadir_end")]
    pub off_nadir_end: f64,

    #[serde(rename = "dg:sun_azimuth_min")]
    pub sun_azimuth_min: f64,
    #[serde(rename = "dg:sun_azimuth_max")]
    pub sun_azimuth_max: f64,

    #[serde(rename = "dg:stereo_pair_identifiers")]
    pub stereo_pair_identifiers: Vec<String>,
    #[serde(rename = "dg:bits_per_pixel")]
    pub bits_per_pixel: u32,
    #[serde(rename = "dg:storage")]
    pub storage: Option<String>,
    #[serde(rename = "dg:processing_options")]
    pub processing_options: Vec<String>,
    #[serde(rename = "dg:vnir_association")]
    pub vnir_association: Option<String>,
    #[serde(rename = "dg:swir_association")]
    pub swir_association: Option<String>,
    #[serde(rename = "dg:cavis_association")]
    pub cavis_association: Option<String>,

    #[serde(flatten)]
    pub pan: Option<PanResolution>,
    #[serde(flatten)]
    pub multi: Option<MultiResolution>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PanResolution {
    #[serde(rename = "dg:pan_resolution_avg")]
    pub avg: f64,
    #[serde(rename = "dg:pan_resolution_min")]
    pub min: f64,
    #[serde(rename = "dg:pan_resolution_max")]
    pub max: f64,
    #[serde(rename = "dg:pan_resolution_start")]
    pub start: f64,
    #[serde(rename = "dg:pan_resolution_end")]
    pub end: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MultiResolution {
    #[serde(rename = "dg:multi_resolution_avg")]
    pub avg: f64,
    #[serde(rename = "dg:multi_resolution_min")]
    pub min: f64,
    #[serde(rename = "dg:multi_resolution_max")]
    pub max: f64,
    #[serde(rename = "dg:multi_resolution_start")]
    pub start: f64,
    #[serde(rename = "dg:multi_resolution_end")]
    pub end: f64,
}

/// Side-channel documents stored next to an item.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Attachments {
    #[serde(
        rename = "data-access-profile",
        skip_serializing_if = "Option::is_none"
    )]
    pub data_access_profile: Option<AccessProfile>,
}

/// One-feature GeoJSON collection: the unit written to a sink.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    pub kind: String,
    pub features: Vec<StacItem>,
    pub attachments: Attachments,
}

impl FeatureCollection {
    pub fn single(item: StacItem, attachments: Attachments) -> Self {
        Self {
            kind: "FeatureCollection".to_string(),
            features: vec![item],
            attachments,
        }
    }

    pub fn item_id(&self) -> &str {
        self.features.first().map(|f| f.id.as_str()).unwrap_or("")
    }
}

/// Parse a response body into a typed record.
///
/// Non-JSON bodies are [`IngestError::Malformed`]; JSON that does not fit
/// the record (a missing required field, a wrong type) is
/// [`IngestError::Data`].
pub fn parse_record<T: DeserializeOwned>(url: &str, body: &str) -> IngestResult<T> {
    let value: Value = serde_json::from_str(body).map_err(|e| IngestError::Malformed {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    serde_json::from_value(value).map_err(|e| IngestError::data(format!("{}: {}", url, e)))
}
