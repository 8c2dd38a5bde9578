//! Endpoint derivation tests
//!
//! Tests for zone classification and the ordering of derived scrape paths.

use tps_zone_sync::zones::{derive, endpoint_for, ActivePolicy, Zone, ZoneMode};

const TEMPLATE: &str = "/ddos/dst/zone/{zone}/stats";

#[test]
fn test_idle_zone_is_omitted_and_order_kept() {
    // Given: Three zones, the middle one idle
    let zones = vec![
        Zone::new("z1", "monitor"),
        Zone::new("z2", "idle"),
        Zone::new("z3", "learning"),
    ];

    // When: Deriving endpoints with the default policy
    let derivation = derive(&zones, ActivePolicy::default(), TEMPLATE);

    // Then: Active zones map to paths in source order, idle zone is reported
    assert_eq!(
        derivation.endpoints,
        vec!["/ddos/dst/zone/z1/stats", "/ddos/dst/zone/z3/stats"]
    );
    assert_eq!(derivation.omitted_names(), vec!["z2"]);
    assert_eq!(derivation.omitted[0].mode, ZoneMode::Idle);
}

#[test]
fn test_no_zones_is_valid() {
    // Given: An empty inventory
    // When: Deriving endpoints
    let derivation = derive(&[], ActivePolicy::NonIdle, TEMPLATE);

    // Then: Nothing to scrape, nothing omitted
    assert!(derivation.endpoints.is_empty());
    assert!(derivation.omitted.is_empty());
}

#[test]
fn test_unknown_mode_is_active_under_non_idle_policy() {
    // Given: A zone in a mode newer firmware might report
    let zones = vec![Zone::new("edge", "mitigation")];

    // When: Deriving with each policy
    let lenient = derive(&zones, ActivePolicy::NonIdle, TEMPLATE);
    let strict = derive(&zones, ActivePolicy::Strict, TEMPLATE);

    // Then: Only the non-idle policy scrapes it
    assert_eq!(lenient.endpoints, vec!["/ddos/dst/zone/edge/stats"]);
    assert!(strict.endpoints.is_empty());
    assert_eq!(strict.omitted_names(), vec!["edge"]);
}

#[test]
fn test_all_idle_zones_yield_empty_target_list() {
    // Given: Only idle zones
    let zones = vec![Zone::new("a", "idle"), Zone::new("b", "IDLE")];

    // When: Deriving endpoints
    let derivation = derive(&zones, ActivePolicy::NonIdle, TEMPLATE);

    // Then: Empty target list, both zones reported as omitted
    assert!(derivation.endpoints.is_empty());
    assert_eq!(derivation.omitted_names(), vec!["a", "b"]);
}

#[test]
fn test_derive_is_deterministic() {
    // Given: The same inventory twice
    let zones = vec![
        Zone::new("web", "monitor"),
        Zone::new("dns", "learning"),
        Zone::new("mail", "idle"),
    ];

    // When: Deriving twice
    let first = derive(&zones, ActivePolicy::NonIdle, TEMPLATE);
    let second = derive(&zones, ActivePolicy::NonIdle, TEMPLATE);

    // Then: Results are identical
    assert_eq!(first, second);
}

#[test]
fn test_endpoint_template_substitution() {
    assert_eq!(
        endpoint_for("/custom/{zone}/counters", "zone-7"),
        "/custom/zone-7/counters"
    );
}
