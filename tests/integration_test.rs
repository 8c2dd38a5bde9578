use tps_zone_sync::config::Config;

#[test]
fn test_config_load() {
    // This assumes config/Default.toml exists relative to where cargo test is run
    let config_res = Config::load("config/Default.toml");
    assert!(config_res.is_ok(), "Failed to load default config");

    let config = config_res.unwrap();
    assert!(config.validate().is_ok(), "Default config should validate");
    assert_eq!(config.appliance.hosts.len(), 2);
}
