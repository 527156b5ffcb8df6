//! Inventory fragments → STAC item.
//!
//! [`build_item`] merges the image record, its band-set summaries, its
//! cloud covers and (optionally) its stereo pairs into one
//! [`StacItem`]. It performs no I/O and is deterministic for a given input.
//!
//! # Rules
//!
//! 1. The vehicle name must match a registered [`VehicleProfile`]; the
//!    profile supplies platform, constellation, instrument and bands.
//! 2. Summaries are partitioned into the `pan` and `n1_r_g_b` slots. A
//!    repeated or unknown band-set name is an error, as is a slot the
//!    vehicle requires but the record lacks.
//! 3. All angle fields come from one summary: pan when present, otherwise
//!    multi.
//! 4. Scan direction is lower-cased and must be `forward` or `reverse`.
//! 5. With [`EpsgPolicy::Parse`] the EPSG code is read from the geometry's
//!    CRS annotation (`EPSG:4326` → `4326`). The annotation is always
//!    stripped from the emitted geometry.
//! 6. Cloud cover is the first cover flagged best, else null.
//! 7. The access profile, if any, is fixed (see [`crate::scopes`]) and
//!    attached under `data-access-profile`.

use serde_json::Map;

use crate::config::{EpsgMode, NormalizeConfig, StereoMode, VehicleConfig};
use crate::error::{IngestError, IngestResult};
use crate::models::{
    Attachments, Band, CloudCovers, Geometry, ImageRecord, ItemProperties, Link,
    MultiResolution, PanResolution, SamplePointSummary, SamplePoints, StacItem, StereoPairs,
};
use crate::scopes;

pub const PAN_BANDSET: &str = "pan";
pub const MULTI_BANDSET: &str = "n1_r_g_b";

const VENDOR: &str = "DigitalGlobe";
const BITS_PER_PIXEL: u32 = 16;

/// Everything known about one supported vehicle.
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleProfile {
    pub vehicle_name: String,
    pub platform: String,
    pub constellation: String,
    pub instrument: String,
    pub bands: Vec<Band>,
    pub requires_pan: bool,
    pub requires_multi: bool,
}

impl VehicleProfile {
    pub fn worldview4() -> Self {
        let band = |name: &str, center_wavelength: f64| Band {
            name: name.to_string(),
            center_wavelength,
        };
        Self {
            vehicle_name: "WV04".to_string(),
            platform: "WORLDVIEW04".to_string(),
            constellation: "WORLDVIEW".to_string(),
            instrument: "VNIR".to_string(),
            bands: vec![
                band("blue", 480.0),
                band("green", 545.0),
                band("red", 672.5),
                band("nir", 850.0),
                band("pan", 625.0),
            ],
            requires_pan: true,
            requires_multi: true,
        }
    }
}

impl From<&VehicleConfig> for VehicleProfile {
    fn from(v: &VehicleConfig) -> Self {
        Self {
            vehicle_name: v.vehicle_name.clone(),
            platform: v.platform.clone(),
            constellation: v.constellation.clone(),
            instrument: v.instrument.clone(),
            bands: v
                .bands
                .iter()
                .map(|b| Band {
                    name: b.name.clone(),
                    center_wavelength: b.center_wavelength,
                })
                .collect(),
            requires_pan: v.requires_pan,
            requires_multi: v.requires_multi,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpsgPolicy {
    /// Parse the code from the geometry CRS annotation; failure is an error.
    Parse,
    /// Emit `eo:epsg: null` regardless of the annotation.
    Null,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StereoPolicy {
    /// Stereo pairs are not queried; the item lists none.
    AssumeEmpty,
    /// Stereo pairs are fetched alongside the other fragments.
    Fetch,
}

/// Knobs for [`build_item`].
#[derive(Debug, Clone)]
pub struct NormalizeOptions {
    pub epsg: EpsgPolicy,
    pub stereo: StereoPolicy,
    /// Base URL of the STAC catalog, used for self links.
    pub catalog_url: String,
    pub vehicles: Vec<VehicleProfile>,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            epsg: EpsgPolicy::Parse,
            stereo: StereoPolicy::AssumeEmpty,
            catalog_url: "https://api.discover.digitalglobe.com/v2/stac".to_string(),
            vehicles: vec![VehicleProfile::worldview4()],
        }
    }
}

impl NormalizeOptions {
    pub fn from_config(normalize: &NormalizeConfig, catalog_url: &str) -> Self {
        let mut vehicles = vec![VehicleProfile::worldview4()];
        for extra in &normalize.vehicles {
            // Config may override a built-in profile by name.
            vehicles.retain(|v| v.vehicle_name != extra.vehicle_name);
            vehicles.push(VehicleProfile::from(extra));
        }
        Self {
            epsg: match normalize.epsg {
                EpsgMode::Parse => EpsgPolicy::Parse,
                EpsgMode::Null => EpsgPolicy::Null,
            },
            stereo: match normalize.stereo {
                StereoMode::Empty => StereoPolicy::AssumeEmpty,
                StereoMode::Fetch => StereoPolicy::Fetch,
            },
            catalog_url: catalog_url.to_string(),
            vehicles,
        }
    }

    pub fn vehicle(&self, name: &str) -> IngestResult<&VehicleProfile> {
        self.vehicles
            .iter()
            .find(|v| v.vehicle_name == name)
            .ok_or_else(|| IngestError::data(format!("unsupported vehicle: {}", name)))
    }
}

/// The pan and multi summary slots of one record.
#[derive(Debug, Default)]
pub struct BandsetSlots<'a> {
    pub pan: Option<&'a SamplePointSummary>,
    pub multi: Option<&'a SamplePointSummary>,
}

impl<'a> BandsetSlots<'a> {
    /// The summary that supplies every angle field: pan, else multi.
    pub fn main(&self) -> Option<&'a SamplePointSummary> {
        self.pan.or(self.multi)
    }
}

pub fn partition_summaries(summaries: &[SamplePointSummary]) -> IngestResult<BandsetSlots<'_>> {
    let mut slots = BandsetSlots::default();
    for summary in summaries {
        let slot = match summary.bandset_name.as_str() {
            PAN_BANDSET => &mut slots.pan,
            MULTI_BANDSET => &mut slots.multi,
            other => {
                return Err(IngestError::data(format!(
                    "sample points summary has unrecognized band-set name: \"{}\"",
                    other
                )))
            }
        };
        if slot.is_some() {
            return Err(IngestError::data(format!(
                "sample points has multiple \"{}\" summaries",
                summary.bandset_name
            )));
        }
        *slot = Some(summary);
    }
    Ok(slots)
}

pub fn normalize_scan_direction(raw: &str) -> IngestResult<String> {
    let lower = raw.to_lowercase();
    match lower.as_str() {
        "forward" | "reverse" => Ok(lower),
        _ => Err(IngestError::data(format!(
            "unrecognized scan direction: \"{}\"",
            raw
        ))),
    }
}

/// Parse `"<authority>:<code>"` into the numeric code.
pub fn parse_epsg(crs_name: &str) -> IngestResult<u32> {
    let (_, code) = crs_name
        .rsplit_once(':')
        .ok_or_else(|| IngestError::data(format!("CRS name has no code: \"{}\"", crs_name)))?;
    code.trim()
        .parse::<u32>()
        .map_err(|_| IngestError::data(format!("CRS code is not a number: \"{}\"", crs_name)))
}

/// First cover flagged best, if any.
pub fn select_cloud_cover(cloud: &CloudCovers) -> IngestResult<Option<f64>> {
    match cloud.covers.iter().find(|c| c.is_best) {
        Some(best) => best
            .cover_percentage
            .map(Some)
            .ok_or_else(|| IngestError::data("best cloud cover has no coverPercentage")),
        None => Ok(None),
    }
}

/// Self link of an item inside a catalog.
pub fn self_href(catalog_url: &str, catalog: &str, image_id: &str) -> String {
    format!(
        "{}/catalog/{}/item/{}",
        catalog_url.trim_end_matches('/'),
        catalog,
        image_id
    )
}

/// Build the STAC item and its attachments for one image.
pub fn build_item(
    image: &ImageRecord,
    points: &SamplePoints,
    cloud: &CloudCovers,
    stereo: Option<&StereoPairs>,
    catalog: &str,
    options: &NormalizeOptions,
) -> IngestResult<(StacItem, Attachments)> {
    let vehicle = options.vehicle(&image.vehicle_name)?;

    let slots = partition_summaries(&points.sample_point_summaries)?;
    if vehicle.requires_pan && slots.pan.is_none() {
        return Err(IngestError::data(format!(
            "{} image has no \"{}\" sample points summary",
            vehicle.vehicle_name, PAN_BANDSET
        )));
    }
    if vehicle.requires_multi && slots.multi.is_none() {
        return Err(IngestError::data(format!(
            "{} image has no \"{}\" sample points summary",
            vehicle.vehicle_name, MULTI_BANDSET
        )));
    }
    let main = slots
        .main()
        .ok_or_else(|| IngestError::data("image has no sample points summaries"))?;
    let angles = main.angles()?;

    let scan_direction = normalize_scan_direction(&image.scan_direction)?;

    let epsg = match options.epsg {
        EpsgPolicy::Parse => {
            let crs = image
                .geometry
                .crs
                .as_ref()
                .ok_or_else(|| IngestError::data("geometry has no CRS annotation"))?;
            Some(parse_epsg(&crs.properties.name)?)
        }
        EpsgPolicy::Null => None,
    };

    let cloud_cover = select_cloud_cover(cloud)?;

    let geometry = Geometry {
        crs: None,
        ..image.geometry.clone()
    };

    let properties = ItemProperties {
        datetime: image.start_time.clone(),
        vendor: VENDOR.to_string(),

        gsd: main.resolution_avg,
        platform: vehicle.platform.clone(),
        constellation: vehicle.constellation.clone(),
        instrument: vehicle.instrument.clone(),
        bands: vehicle.bands.clone(),
        azimuth: angles.spacecraft_to_target_azimuth_angle_avg,
        sun_azimuth: angles.target_to_sun_azimuth_angle_avg,
        sun_elevation: angles.target_to_sun_elevation_angle_avg,
        off_nadir: angles.spacecraft_to_target_off_nadir_angle_avg,
        epsg,
        cloud_cover,

        collect_time_start: image.start_time.clone(),
        collect_time_end: image.end_time.clone(),
        scan_direction,
        acquisition_rev_number: image.acquisition_rev_number,

        sun_elevation_min: angles.target_to_sun_elevation_angle_min,
        sun_elevation_max: angles.target_to_sun_elevation_angle_max,

        target_azimuth_min: angles.spacecraft_to_target_azimuth_angle_min,
        target_azimuth_max: angles.spacecraft_to_target_azimuth_angle_max,
        target_azimuth_start: angles.spacecraft_to_target_azimuth_angle_start,
        target_azimuth_end: angles.spacecraft_to_target_azimuth_angle_end,

        off_nadir_min: angles.spacecraft_to_target_off_nadir_angle_min,
        off_nadir_max: angles.spacecraft_to_target_off_nadir_angle_max,
        off_nadir_start: angles.spacecraft_to_target_off_nadir_angle_start,
        off_nadir_end: angles.spacecraft_to_target_off_nadir_angle_end,

        sun_azimuth_min: angles.target_to_sun_azimuth_angle_min,
        sun_azimuth_max: angles.target_to_sun_azimuth_angle_max,

        stereo_pair_identifiers: stereo
            .map(|s| s.stereo_identifiers.clone())
            .unwrap_or_default(),
        bits_per_pixel: BITS_PER_PIXEL,
        storage: None,
        processing_options: Vec::new(),
        vnir_association: None,
        swir_association: None,
        cavis_association: None,

        pan: slots.pan.map(|p| PanResolution {
            avg: p.resolution_avg,
            min: p.resolution_min,
            max: p.resolution_max,
            start: p.resolution_start,
            end: p.resolution_end,
        }),
        multi: slots.multi.map(|m| MultiResolution {
            avg: m.resolution_avg,
            min: m.resolution_min,
            max: m.resolution_max,
            start: m.resolution_start,
            end: m.resolution_end,
        }),
    };

    let item = StacItem {
        id: image.image_identifier.clone(),
        kind: "Feature".to_string(),
        geometry,
        assets: Map::new(),
        links: vec![Link {
            rel: "self".to_string(),
            href: self_href(&options.catalog_url, catalog, &image.image_identifier),
        }],
        properties,
    };

    let mut attachments = Attachments::default();
    if let Some(profile) = &image.data_access_profile {
        let mut fixed = profile.clone();
        scopes::fix_profile(&mut fixed)?;
        attachments.data_access_profile = Some(fixed);
    }

    Ok((item, attachments))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CoverAssignment, Crs, CrsProperties};
    use serde_json::json;

    fn summary(name: &str, base: f64) -> SamplePointSummary {
        serde_json::from_value(json!({
            "bandsetName": name,
            "resolutionAvg": base + 1.0,
            "resolutionMin": base + 2.0,
            "resolutionMax": base + 3.0,
            "resolutionStart": base + 4.0,
            "resolutionEnd": base + 5.0,
            "spacecraftToTargetAzimuthAngleAvg": base + 6.0,
            "spacecraftToTargetAzimuthAngleMin": base + 7.0,
            "spacecraftToTargetAzimuthAngleMax": base + 8.0,
            "spacecraftToTargetAzimuthAngleStart": base + 9.0,
            "spacecraftToTargetAzimuthAngleEnd": base + 10.0,
            "spacecraftToTargetOffNadirAngleAvg": base + 11.0,
            "spacecraftToTargetOffNadirAngleMin": base + 12.0,
            "spacecraftToTargetOffNadirAngleMax": base + 13.0,
            "spacecraftToTargetOffNadirAngleStart": base + 14.0,
            "spacecraftToTargetOffNadirAngleEnd": base + 15.0,
            "targetToSunAzimuthAngleAvg": base + 16.0,
            "targetToSunAzimuthAngleMin": base + 17.0,
            "targetToSunAzimuthAngleMax": base + 18.0,
            "targetToSunElevationAngleAvg": base + 19.0,
            "targetToSunElevationAngleMin": base + 20.0,
            "targetToSunElevationAngleMax": base + 21.0
        }))
        .unwrap()
    }

    fn image(vehicle: &str) -> ImageRecord {
        serde_json::from_value(json!({
            "imageIdentifier": "img-1",
            "vehicleName": vehicle,
            "scanDirection": "Forward",
            "startTime": "2018-06-01T10:00:00Z",
            "endTime": "2018-06-01T10:00:05Z",
            "acquisitionRevNumber": 1234,
            "isIngestComplete": true,
            "geometry": {
                "type": "Polygon",
                "coordinates": [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]],
                "crs": { "type": "name", "properties": { "name": "EPSG:4326" } }
            }
        }))
        .unwrap()
    }

    fn points(summaries: Vec<SamplePointSummary>) -> SamplePoints {
        SamplePoints {
            sample_point_summaries: summaries,
        }
    }

    fn covers(list: &[(bool, f64)]) -> CloudCovers {
        CloudCovers {
            covers: list
                .iter()
                .map(|(is_best, pct)| CoverAssignment {
                    is_best: *is_best,
                    cover_percentage: Some(*pct),
                })
                .collect(),
        }
    }

    fn multi_only_options() -> NormalizeOptions {
        let mut options = NormalizeOptions::default();
        options.vehicles.push(VehicleProfile {
            vehicle_name: "WV03".to_string(),
            platform: "WORLDVIEW03".to_string(),
            constellation: "WORLDVIEW".to_string(),
            instrument: "VNIR".to_string(),
            bands: Vec::new(),
            requires_pan: false,
            requires_multi: true,
        });
        options
    }

    #[test]
    fn builds_full_worldview4_item() {
        let (item, attachments) = build_item(
            &image("WV04"),
            &points(vec![summary("pan", 10.0), summary("n1_r_g_b", 50.0)]),
            &covers(&[(false, 10.0), (true, 42.0)]),
            None,
            "my-catalog",
            &NormalizeOptions::default(),
        )
        .unwrap();

        let v = serde_json::to_value(&item).unwrap();
        let p = &v["properties"];
        assert_eq!(v["id"], "img-1");
        assert_eq!(v["type"], "Feature");
        assert_eq!(v["assets"], json!({}));
        assert_eq!(
            v["links"][0]["href"],
            "https://api.discover.digitalglobe.com/v2/stac/catalog/my-catalog/item/img-1"
        );
        assert!(v["geometry"].get("crs").is_none());
        assert_eq!(p["eo:platform"], "WORLDVIEW04");
        assert_eq!(p["eo:epsg"], 4326);
        assert_eq!(p["eo:cloud_cover"], 42.0);
        assert_eq!(p["eo:off_nadir"], 21.0);
        assert_eq!(p["eo:gsd"], 11.0);
        assert_eq!(p["dg:scan_direction"], "forward");
        assert_eq!(p["dg:acquisition_rev_number"], 1234);
        assert_eq!(p["dg:pan_resolution_avg"], 11.0);
        assert_eq!(p["dg:multi_resolution_avg"], 51.0);
        assert_eq!(p["dg:stereo_pair_identifiers"], json!([]));
        assert_eq!(p["dg:bits_per_pixel"], 16);
        assert!(p["dg:storage"].is_null());
        assert_eq!(p["eo:bands"].as_array().unwrap().len(), 5);
        assert_eq!(attachments, Attachments::default());
    }

    #[test]
    fn multi_only_falls_back_without_pan_fields() {
        let (item, _) = build_item(
            &image("WV03"),
            &points(vec![summary("n1_r_g_b", 50.0)]),
            &CloudCovers::default(),
            None,
            "c",
            &multi_only_options(),
        )
        .unwrap();

        let p = serde_json::to_value(&item.properties).unwrap();
        assert_eq!(p["eo:off_nadir"], 61.0);
        assert_eq!(p["eo:sun_azimuth"], 66.0);
        assert_eq!(p["eo:sun_elevation"], 69.0);
        assert_eq!(p["eo:azimuth"], 56.0);
        assert_eq!(p["dg:off_nadir_end"], 65.0);
        assert!(p.get("dg:pan_resolution_avg").is_none());
        assert_eq!(p["dg:multi_resolution_min"], 52.0);
        assert!(p["eo:cloud_cover"].is_null());
    }

    #[test]
    fn worldview4_requires_both_summaries() {
        let err = build_item(
            &image("WV04"),
            &points(vec![summary("pan", 1.0)]),
            &CloudCovers::default(),
            None,
            "c",
            &NormalizeOptions::default(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("n1_r_g_b"));
    }

    #[test]
    fn duplicate_and_unknown_summaries_rejected() {
        let dup = [summary("pan", 1.0), summary("pan", 2.0)];
        assert!(matches!(
            partition_summaries(&dup),
            Err(IngestError::Data(_))
        ));
        let unknown = [summary("swir", 1.0)];
        assert!(matches!(
            partition_summaries(&unknown),
            Err(IngestError::Data(_))
        ));
    }

    #[test]
    fn unsupported_vehicle_rejected() {
        let err = build_item(
            &image("QB02"),
            &points(vec![summary("pan", 1.0), summary("n1_r_g_b", 2.0)]),
            &CloudCovers::default(),
            None,
            "c",
            &NormalizeOptions::default(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("unsupported vehicle"));
    }

    #[test]
    fn scan_direction_rules() {
        assert_eq!(normalize_scan_direction("REVERSE").unwrap(), "reverse");
        assert!(normalize_scan_direction("sideways").is_err());
    }

    #[test]
    fn epsg_parsing() {
        assert_eq!(parse_epsg("EPSG:4326").unwrap(), 4326);
        assert_eq!(parse_epsg("EPSG:32617").unwrap(), 32617);
        assert!(matches!(parse_epsg("bogus"), Err(IngestError::Data(_))));
        assert!(matches!(parse_epsg("EPSG:abc"), Err(IngestError::Data(_))));
    }

    #[test]
    fn epsg_null_policy_ignores_bad_crs() {
        let mut img = image("WV04");
        img.geometry.crs = Some(Crs {
            kind: None,
            properties: CrsProperties {
                name: "bogus".to_string(),
            },
        });
        let mut options = NormalizeOptions::default();
        options.epsg = EpsgPolicy::Null;
        let (item, _) = build_item(
            &img,
            &points(vec![summary("pan", 1.0), summary("n1_r_g_b", 2.0)]),
            &CloudCovers::default(),
            None,
            "c",
            &options,
        )
        .unwrap();
        assert_eq!(item.properties.epsg, None);
        assert!(item.geometry.crs.is_none());

        let err = build_item(
            &img,
            &points(vec![summary("pan", 1.0), summary("n1_r_g_b", 2.0)]),
            &CloudCovers::default(),
            None,
            "c",
            &NormalizeOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, IngestError::Data(_)));
    }

    #[test]
    fn cloud_cover_selection() {
        assert_eq!(
            select_cloud_cover(&covers(&[(false, 10.0), (true, 42.0)])).unwrap(),
            Some(42.0)
        );
        assert_eq!(
            select_cloud_cover(&covers(&[(false, 10.0), (false, 20.0)])).unwrap(),
            None
        );
        assert_eq!(
            select_cloud_cover(&covers(&[(true, 5.0), (true, 6.0)])).unwrap(),
            Some(5.0)
        );
    }

    #[test]
    fn stereo_pairs_are_copied() {
        let stereo = StereoPairs {
            stereo_identifiers: vec!["img-2".to_string()],
        };
        let (item, _) = build_item(
            &image("WV04"),
            &points(vec![summary("pan", 1.0), summary("n1_r_g_b", 2.0)]),
            &CloudCovers::default(),
            Some(&stereo),
            "c",
            &NormalizeOptions::default(),
        )
        .unwrap();
        assert_eq!(item.properties.stereo_pair_identifiers, vec!["img-2"]);
    }

    #[test]
    fn access_profile_is_fixed_and_attached() {
        let mut img = image("WV04");
        img.data_access_profile = Some(
            serde_json::from_value(json!({
                "policies": [{
                    "name": "p",
                    "startDate": "2017-02-21T08:01:35Z",
                    "endDate": "9999-12-31T23:59:59Z",
                    "allow": ["Public", "dg.internal.system"],
                    "deny": ["All"]
                }]
            }))
            .unwrap(),
        );
        let (_, attachments) = build_item(
            &img,
            &points(vec![summary("pan", 1.0), summary("n1_r_g_b", 2.0)]),
            &CloudCovers::default(),
            None,
            "c",
            &NormalizeOptions::default(),
        )
        .unwrap();
        let v = serde_json::to_value(&attachments).unwrap();
        let policy = &v["data-access-profile"]["policies"][0];
        assert!(policy.get("name").is_none());
        assert_eq!(policy["allow"], json!(["dataaccess.public"]));
        assert_eq!(policy["deny"], json!([]));
    }

    fn resolution_only(name: &str, base: f64) -> SamplePointSummary {
        serde_json::from_value(json!({
            "bandsetName": name,
            "resolutionAvg": base + 1.0,
            "resolutionMin": base + 2.0,
            "resolutionMax": base + 3.0,
            "resolutionStart": base + 4.0,
            "resolutionEnd": base + 5.0
        }))
        .unwrap()
    }

    #[test]
    fn secondary_summary_needs_only_resolution() {
        let (item, _) = build_item(
            &image("WV04"),
            &points(vec![summary("pan", 10.0), resolution_only("n1_r_g_b", 50.0)]),
            &CloudCovers::default(),
            None,
            "c",
            &NormalizeOptions::default(),
        )
        .unwrap();
        let v = serde_json::to_value(&item.properties).unwrap();
        assert_eq!(v["eo:off_nadir"], 21.0);
        assert_eq!(v["dg:multi_resolution_avg"], 51.0);
        assert_eq!(v["dg:multi_resolution_end"], 55.0);
    }

    #[test]
    fn main_summary_missing_angles_is_data_error() {
        let err = build_item(
            &image("WV04"),
            &points(vec![resolution_only("pan", 10.0), summary("n1_r_g_b", 50.0)]),
            &CloudCovers::default(),
            None,
            "c",
            &NormalizeOptions::default(),
        )
        .unwrap_err();
        match err {
            IngestError::Data(msg) => assert!(msg.contains("\"pan\"")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn empty_access_profile_adds_no_attachment() {
        let img: ImageRecord = serde_json::from_value(json!({
            "imageIdentifier": "img-1",
            "vehicleName": "WV04",
            "scanDirection": "forward",
            "startTime": "2018-06-01T10:00:00Z",
            "endTime": "2018-06-01T10:00:05Z",
            "acquisitionRevNumber": 1,
            "geometry": {
                "type": "Point",
                "coordinates": [0.0, 0.0],
                "crs": { "properties": { "name": "EPSG:4326" } }
            },
            "dataAccessProfile": {}
        }))
        .unwrap();
        let (item, attachments) = build_item(
            &img,
            &points(vec![summary("pan", 1.0), summary("n1_r_g_b", 2.0)]),
            &CloudCovers::default(),
            None,
            "c",
            &NormalizeOptions::default(),
        )
        .unwrap();
        assert_eq!(item.id, "img-1");
        assert_eq!(serde_json::to_value(&attachments).unwrap(), json!({}));
    }

    #[test]
    fn geometry_members_other_than_crs_survive() {
        let mut img = image("WV04");
        img.geometry
            .extra
            .insert("bbox".to_string(), json!([0.0, 0.0, 1.0, 1.0]));
        let (item, _) = build_item(
            &img,
            &points(vec![summary("pan", 1.0), summary("n1_r_g_b", 2.0)]),
            &CloudCovers::default(),
            None,
            "c",
            &NormalizeOptions::default(),
        )
        .unwrap();
        let g = serde_json::to_value(&item.geometry).unwrap();
        assert!(g.get("crs").is_none());
        assert_eq!(g["bbox"], json!([0.0, 0.0, 1.0, 1.0]));
    }
}
