//! Data access profile cleanup.
//!
//! Inventory access profiles carry scope tokens in several spellings and
//! include internal-only scopes that must never reach the catalog. Each
//! policy's allow and deny lists are rewritten independently:
//!
//! | Input (case-insensitive) | Output |
//! |--------------------------|--------|
//! | `public` | `dataaccess.public` |
//! | `calibration` | `dataaccess.calibration` |
//! | `experimental` | `dataaccess.experimental` |
//! | `dataaccess.daf*` | dropped, but remembered |
//! | `dg.internal.*` | dropped |
//! | `all` | dropped |
//! | anything else | lower-cased |
//!
//! A DAF scope marks restricted imagery. It is normally accompanied by an
//! internal scope and a customer scope; only the customer scope survives.
//! A list that had a DAF scope and ends up empty is rejected, since the
//! image would otherwise lose its access gate entirely.

use std::collections::BTreeSet;

use crate::error::{IngestError, IngestResult};
use crate::models::AccessProfile;

const DAF_PREFIX: &str = "dataaccess.daf";
const INTERNAL_PREFIX: &str = "dg.internal.";

/// Fix every policy in the profile in place.
///
/// Policy names are removed; validity dates and unknown fields are kept.
pub fn fix_profile(profile: &mut AccessProfile) -> IngestResult<()> {
    for policy in &mut profile.policies {
        policy.name = None;
        policy.deny = fix_scopes(&policy.deny)?;
        policy.allow = fix_scopes(&policy.allow)?;
    }
    Ok(())
}

/// Rewrite one scope list. The result is sorted and free of duplicates.
pub fn fix_scopes(scopes: &[String]) -> IngestResult<Vec<String>> {
    let mut result = BTreeSet::new();
    let mut has_daf = false;

    for scope in scopes {
        let lower = scope.to_lowercase();
        let fixed = match lower.as_str() {
            "public" => Some("dataaccess.public".to_string()),
            "calibration" => Some("dataaccess.calibration".to_string()),
            "experimental" => Some("dataaccess.experimental".to_string()),
            "all" => None,
            s if s.starts_with(DAF_PREFIX) => {
                has_daf = true;
                None
            }
            s if s.starts_with(INTERNAL_PREFIX) => None,
            _ => Some(lower),
        };
        if let Some(f) = fixed {
            result.insert(f);
        }
    }

    if has_daf && result.is_empty() {
        return Err(IngestError::data(
            "access profile has a DAF scope but no remaining dataaccess scope",
        ));
    }

    Ok(result.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AccessPolicy;
    use serde_json::Map;

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    fn profile(allow: &[&str], deny: &[&str]) -> AccessProfile {
        AccessProfile {
            policies: vec![AccessPolicy {
                name: Some("TheName".to_string()),
                start_date: Some("2017-02-21T08:01:35Z".to_string()),
                end_date: Some("9999-12-31T23:59:59Z".to_string()),
                allow: strings(allow),
                deny: strings(deny),
                extra: Map::new(),
            }],
            extra: Map::new(),
        }
    }

    fn assert_clean(scopes: &[String]) {
        let unique: BTreeSet<_> = scopes.iter().collect();
        assert_eq!(unique.len(), scopes.len(), "duplicates in {:?}", scopes);
        for scope in scopes {
            assert_eq!(scope, &scope.to_lowercase());
            assert_ne!(scope, "all");
            assert_ne!(scope, "public");
            assert_ne!(scope, "experimental");
            assert!(!scope.starts_with(INTERNAL_PREFIX));
            assert!(!scope.starts_with(DAF_PREFIX));
        }
    }

    #[test]
    fn removes_internal_and_wildcard_scopes() {
        let mut dap = profile(&["dg.internal.system"], &["All"]);
        let before = dap.clone();
        fix_profile(&mut dap).unwrap();

        let policy = &dap.policies[0];
        assert!(policy.name.is_none());
        assert!(policy.allow.is_empty());
        assert!(policy.deny.is_empty());
        assert_eq!(policy.start_date, before.policies[0].start_date);
        assert_eq!(policy.end_date, before.policies[0].end_date);
    }

    #[test]
    fn daf_without_other_scope_is_rejected() {
        let mut dap = profile(&["dataaccess.daf100"], &["All"]);
        let err = fix_profile(&mut dap).unwrap_err();
        assert!(matches!(err, IngestError::Data(_)));
    }

    #[test]
    fn daf_with_internal_only_is_rejected() {
        let err = fix_scopes(&strings(&["dataaccess.DAF81", "dg.internal.system"])).unwrap_err();
        assert!(matches!(err, IngestError::Data(_)));
    }

    #[test]
    fn daf_keeps_customer_scope() {
        let fixed = fix_scopes(&strings(&[
            "dataaccess.59345",
            "dataaccess.daf81",
            "dg.internal.system",
        ]))
        .unwrap();
        assert_eq!(fixed, strings(&["dataaccess.59345"]));
    }

    #[test]
    fn plain_scopes_unchanged() {
        let mut dap = profile(
            &["dataaccess.user3", "dataaccess.user4", "dataaccess.user5"],
            &["dataaccess.user1", "dataaccess.user2"],
        );
        fix_profile(&mut dap).unwrap();
        assert_eq!(
            dap.policies[0].allow,
            strings(&["dataaccess.user3", "dataaccess.user4", "dataaccess.user5"])
        );
        assert_eq!(
            dap.policies[0].deny,
            strings(&["dataaccess.user1", "dataaccess.user2"])
        );
    }

    #[test]
    fn aliases_rewritten_and_deduplicated() {
        let fixed = fix_scopes(&strings(&[
            "Public",
            "dataaccess.public",
            "CALIBRATION",
            "experimental",
            "DataAccess.Customer7",
            "dataaccess.customer7",
        ]))
        .unwrap();
        assert_eq!(
            fixed,
            strings(&[
                "dataaccess.calibration",
                "dataaccess.customer7",
                "dataaccess.experimental",
                "dataaccess.public",
            ])
        );
        assert_clean(&fixed);
    }

    #[test]
    fn fixing_twice_is_stable() {
        let mut dap = profile(
            &["Public", "dataaccess.daf9", "dataaccess.42", "dg.internal.ops"],
            &["All", "Experimental", "experimental"],
        );
        fix_profile(&mut dap).unwrap();
        let once = dap.clone();
        fix_profile(&mut dap).unwrap();
        assert_eq!(dap, once);
        assert_clean(&dap.policies[0].allow);
        assert_clean(&dap.policies[0].deny);
    }

    #[test]
    fn policy_without_name_stays_unnamed() {
        let mut dap = profile(&["dataaccess.1"], &[]);
        dap.policies[0].name = None;
        fix_profile(&mut dap).unwrap();
        let json = serde_json::to_value(&dap).unwrap();
        assert!(json["policies"][0].get("name").is_none());
    }
}
