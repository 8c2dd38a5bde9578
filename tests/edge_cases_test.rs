//! Edge case tests
//!
//! Tests for unusual but valid inventory and scrape configuration data.

use chrono::{TimeZone, Utc};
use tps_zone_sync::appliance::types::ZoneListResponse;
use tps_zone_sync::error::SyncError;
use tps_zone_sync::scrape_config::{self, JobSelector, ScrapeDocument};
use tps_zone_sync::zones::{derive, ActivePolicy, Zone, ZoneMode};

const TEMPLATE: &str = "/ddos/dst/zone/{zone}/stats";

fn prefix() -> JobSelector {
    JobSelector::Prefix("a10-tps".to_string())
}

#[test]
fn test_unicode_zone_name_survives_round_trip() {
    // Given: A zone named with non-ASCII characters
    let zones = vec![Zone::new("zóna-ü", "monitor")];
    let derivation = derive(&zones, ActivePolicy::NonIdle, TEMPLATE);
    let document =
        ScrapeDocument::parse("scrape_configs:\n  - job_name: a10-tps\n").expect("parse");

    // When: Reconciling and reparsing the written text
    let reconciled = scrape_config::reconcile(&document, &derivation.endpoints, &prefix()).unwrap();
    let text = reconciled.document.to_yaml().unwrap();
    let reparsed = ScrapeDocument::parse(&text).expect("reparse");

    // Then: The endpoint is preserved byte for byte
    assert_eq!(
        reparsed.endpoints_of("a10-tps"),
        Some(vec!["/ddos/dst/zone/zóna-ü/stats".to_string()])
    );
}

#[test]
fn test_zone_name_that_looks_like_yaml() {
    // Given: Zone names that would be misread if emitted unquoted
    let zones = vec![
        Zone::new("true", "monitor"),
        Zone::new("123", "monitor"),
        Zone::new("a: b", "learning"),
    ];
    let derivation = derive(&zones, ActivePolicy::NonIdle, "{zone}");
    let document =
        ScrapeDocument::parse("scrape_configs:\n  - job_name: a10-tps\n").expect("parse");

    // When: Reconciling and reparsing
    let reconciled = scrape_config::reconcile(&document, &derivation.endpoints, &prefix()).unwrap();
    let reparsed = ScrapeDocument::parse(&reconciled.document.to_yaml().unwrap()).unwrap();

    // Then: Every endpoint comes back as the same string
    assert_eq!(
        reparsed.endpoints_of("a10-tps"),
        Some(vec!["true".to_string(), "123".to_string(), "a: b".to_string()])
    );
}

#[test]
fn test_mode_is_case_insensitive() {
    // Given: Modes in mixed case with padding
    let zones = vec![Zone::new("a", " IDLE "), Zone::new("b", "Monitor")];

    // When: Deriving endpoints
    let derivation = derive(&zones, ActivePolicy::Strict, TEMPLATE);

    // Then: Both modes are recognized
    assert_eq!(derivation.endpoints, vec!["/ddos/dst/zone/b/stats"]);
    assert_eq!(derivation.omitted_names(), vec!["a"]);
}

#[test]
fn test_unknown_mode_kept_verbatim() {
    // Given: A mode this crate does not know
    let mode = ZoneMode::from("Blocking");

    // Then: It is preserved for logging and treated as active by default
    assert_eq!(mode, ZoneMode::Other("Blocking".to_string()));
    assert_eq!(mode.to_string(), "Blocking");
    assert!(ActivePolicy::NonIdle.is_active(&mode));
    assert!(!ActivePolicy::Strict.is_active(&mode));
}

#[test]
fn test_zone_list_with_extra_fields_and_null_mode() {
    // Given: An inventory with unrelated fields and a null mode
    let json = r#"{
        "zone-list": [
            {"zone-name": "z1", "operational-mode": null, "uuid": "abc", "ip": [{"ip-addr": "10.0.0.1"}]},
            {"zone-name": "z2", "operational-mode": "idle", "a10-url": "/axapi/v3/ddos/dst/zone/z2"}
        ]
    }"#;

    // When: Parsing
    let zones = serde_json::from_str::<ZoneListResponse>(json)
        .unwrap()
        .into_zones();

    // Then: Unknown fields are ignored and the null mode is unset
    assert_eq!(zones.len(), 2);
    assert_eq!(zones[0].mode, ZoneMode::default());
    assert_eq!(zones[0].mode.to_string(), "<unset>");
    assert_eq!(zones[1].mode, ZoneMode::Idle);
}

#[test]
fn test_duplicate_zone_names_keep_inventory_order() {
    // Given: The same zone listed twice
    let zones = vec![Zone::new("dup", "monitor"), Zone::new("dup", "learning")];

    // When: Deriving endpoints
    let derivation = derive(&zones, ActivePolicy::NonIdle, TEMPLATE);

    // Then: One endpoint per inventory entry, in order
    assert_eq!(derivation.endpoints.len(), 2);
    assert!(derivation.endpoints.iter().all(|e| e == "/ddos/dst/zone/dup/stats"));
}

#[test]
fn test_document_without_scrape_configs() {
    // Given: A configuration with no scrape_configs key
    let document = ScrapeDocument::parse("global:\n  scrape_interval: 30s\n").unwrap();

    // When: Reconciling
    let reconciled =
        scrape_config::reconcile(&document, &["/x".to_string()], &prefix()).unwrap();

    // Then: Nothing matches and the document is unchanged
    assert_eq!(reconciled.jobs_updated(), 0);
    assert_eq!(reconciled.document, document);
}

#[test]
fn test_job_without_name_is_skipped() {
    // Given: A job entry missing job_name
    let document = ScrapeDocument::parse(
        "scrape_configs:\n  - metrics_path: /metrics\n  - job_name: a10-tps-1\n",
    )
    .unwrap();

    // When: Reconciling
    let reconciled =
        scrape_config::reconcile(&document, &["/x".to_string()], &prefix()).unwrap();

    // Then: Only the named job is updated
    assert_eq!(reconciled.jobs, vec!["a10-tps-1"]);
}

#[test]
fn test_params_that_are_not_a_mapping() {
    // Given: A selected job whose params is a list
    let document =
        ScrapeDocument::parse("scrape_configs:\n  - job_name: a10-tps\n    params: [1, 2]\n")
            .unwrap();

    // When: Reconciling
    let result = scrape_config::reconcile(&document, &["/x".to_string()], &prefix());

    // Then: The document is rejected rather than silently rewritten
    assert!(matches!(result, Err(SyncError::ConfigParse(_))));
}

#[test]
fn test_prefix_match_is_case_sensitive() {
    // Given: A job with the prefix in upper case
    let selector = prefix();

    // Then: It is not selected
    assert!(selector.matches("a10-tps"));
    assert!(selector.matches("a10-tps-edge"));
    assert!(!selector.matches("A10-TPS-edge"));
    assert!(!selector.matches("x-a10-tps"));
}

#[test]
fn test_backup_name_collision_gets_suffix() {
    // Given: A backup with the same timestamp already on disk
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("prometheus.yml");
    std::fs::write(&path, "scrape_configs: []\n").unwrap();
    let at = Utc.with_ymd_and_hms(2026, 10, 18, 3, 15, 0).unwrap();

    // When: Backing up twice within the same second
    let first = scrape_config::backup(&path, at).unwrap();
    let second = scrape_config::backup(&path, at).unwrap();

    // Then: The second backup gets a numeric suffix and both survive
    assert_ne!(first, second);
    assert!(second
        .to_string_lossy()
        .ends_with("prometheus.yml.20261018T031500Z-1.bak"));
    assert!(first.exists());
    assert!(second.exists());
}

#[test]
fn test_empty_file_is_rejected() {
    // Given: An empty scrape configuration file
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("prometheus.yml");
    std::fs::write(&path, "").unwrap();

    // When: Loading
    let result = scrape_config::load(&path);

    // Then: It is a parse error, not an empty document
    assert!(matches!(result, Err(SyncError::ConfigParse(_))));
}
