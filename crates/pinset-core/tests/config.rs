use pinset_core::config::{dirs_path, GlobalConfig, DEFAULT_INDEX_URL};

#[test]
fn test_global_config_default_index_url() {
    let config = GlobalConfig::default();
    assert_eq!(config.index.url, DEFAULT_INDEX_URL);
}

#[test]
fn test_global_config_default_cache_dir() {
    let config = GlobalConfig::default();
    assert_eq!(config.cache.dir, "~/.pinset/cache");
    assert!(config.cache.enabled);
}

#[test]
fn test_dirs_path_contains_pinset() {
    let path = dirs_path();
    assert!(path.ends_with(".pinset"));
}

#[test]
fn test_default_path_is_config_toml() {
    assert!(GlobalConfig::default_path().ends_with(".pinset/config.toml"));
}

#[test]
fn test_load_from_missing_file_gives_defaults() {
    let tmp = tempfile::tempdir().unwrap();
    let config = GlobalConfig::load_from(&tmp.path().join("config.toml")).unwrap();
    assert!(!config.resolve.pre);
}

#[test]
fn test_load_from_file() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
[index]
url = "https://mirror.example.org/pypi"

[cache]
enabled = false

[resolve]
pre = true
"#,
    )
    .unwrap();
    let config = GlobalConfig::load_from(&path).unwrap();
    assert_eq!(config.index.url, "https://mirror.example.org/pypi");
    assert!(!config.cache.enabled);
    assert!(config.resolve.pre);
}

#[test]
fn test_load_from_invalid_toml_fails() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("config.toml");
    std::fs::write(&path, "[index\nurl = 3").unwrap();
    let err = GlobalConfig::load_from(&path).unwrap_err();
    assert!(err.to_string().contains("Failed to parse global config"));
}

#[test]
fn test_load_from_unreadable_file_fails() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("config.toml");
    std::fs::write(&path, [0xff, 0xfe, 0x00]).unwrap();
    let err = GlobalConfig::load_from(&path).unwrap_err();
    assert!(err.to_string().contains("Failed to read global config"), "{err}");
}

#[test]
fn test_listing_ttl_setting() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("config.toml");
    std::fs::write(&path, "[cache]\nlisting-ttl-secs = 0\n").unwrap();
    let config = GlobalConfig::load_from(&path).unwrap();
    assert_eq!(config.cache.listing_ttl_secs, 0);
    assert!(config.cache.enabled);
    assert_eq!(GlobalConfig::default().cache.listing_ttl_secs, 600);
}

#[test]
fn test_cache_dir_tilde_expansion() {
    let config = GlobalConfig::default();
    let dir = config.cache.resolved_dir();
    assert!(!dir.starts_with("~"));
    assert!(dir.ends_with(".pinset/cache"));
}
