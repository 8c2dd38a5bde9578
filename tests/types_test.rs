use serde_json::json;
use tps_zone_sync::appliance::types::*;
use tps_zone_sync::zones::ZoneMode;

#[test]
fn test_serialize_auth_request() {
    let body = AuthRequest {
        credentials: AuthCredentials {
            username: "admin",
            password: "secret",
        },
    };

    let value = serde_json::to_value(&body).expect("Failed to serialize AuthRequest");
    assert_eq!(
        value,
        json!({"credentials": {"username": "admin", "password": "secret"}})
    );
}

#[test]
fn test_deserialize_auth_response() {
    let json = json!({
        "authresponse": {
            "signature": "6f0b3c2a1d",
            "description": "the signature should be set in Authorization header for following request."
        }
    });

    let auth: AuthResponse = serde_json::from_value(json).expect("Failed to parse AuthResponse");
    assert_eq!(auth.authresponse.signature, "6f0b3c2a1d");
    assert!(auth.authresponse.description.is_some());
}

#[test]
fn test_deserialize_zone_list() {
    let json = json!({
        "zone-list": [
            {
                "zone-name": "web-farm",
                "operational-mode": "monitor",
                "zone-oper-policy": "default",
                "uuid": "b7c5-11ee",
                "ip": [{"ip-addr": "203.0.113.10"}]
            },
            {
                "zone-name": "legacy",
                "operational-mode": "idle"
            }
        ]
    });

    let inventory: ZoneListResponse =
        serde_json::from_value(json).expect("Failed to parse ZoneListResponse");
    let zones = inventory.into_zones();
    assert_eq!(zones.len(), 2);
    assert_eq!(zones[0].name, "web-farm");
    assert_eq!(zones[0].mode, ZoneMode::Monitor);
    assert_eq!(zones[1].mode, ZoneMode::Idle);
}

#[test]
fn test_missing_zone_list_is_empty() {
    let inventory: ZoneListResponse =
        serde_json::from_value(json!({})).expect("Failed to parse empty object");
    assert!(inventory.into_zones().is_empty());

    let inventory: ZoneListResponse =
        serde_json::from_value(json!({"zone-list": null})).expect("Failed to parse null list");
    assert!(inventory.into_zones().is_empty());
}

#[test]
fn test_zone_without_mode() {
    let inventory: ZoneListResponse =
        serde_json::from_value(json!({"zone-list": [{"zone-name": "bare"}]}))
            .expect("Failed to parse zone without mode");
    let zones = inventory.into_zones();
    assert_eq!(zones[0].mode, ZoneMode::Other(String::new()));
}
