use std::fs;

use assert_matches::assert_matches;
use proven_rollover_file::{
    Access, Naming, OpenFlags, RotationConfig, TransformConfig, TriggerConfig,
};
use tempfile::tempdir;

const FULL: &str = r#"
path = "/var/log/app/application.log"

[open]
access = "read-write"
append = true

[trigger]
kind = "size"
max_bytes = 10485760

[[transforms]]
kind = "rename"
timestamp_format = "%Y%m%d"
naming = "collision"
force_move = true

[[transforms]]
kind = "gzip"
level = 9
"#;

#[test]
fn test_parse_full_config() {
    let config: RotationConfig = toml::from_str(FULL).unwrap();

    let expected = RotationConfig::new(
        "/var/log/app/application.log",
        TriggerConfig::size(10 * 1024 * 1024),
    )
    .with_open_flags(OpenFlags::append().with_access(Access::ReadWrite))
    .with_transform(TransformConfig::Rename {
        timestamp_format: "%Y%m%d".to_string(),
        naming: Naming::Collision,
        force_move: true,
    })
    .with_transform(TransformConfig::Gzip { level: 9 });
    assert_eq!(config, expected);
}

#[test]
fn test_parse_applies_defaults() {
    let config: RotationConfig = toml::from_str(
        r#"
        path = "app.log"
        trigger = { kind = "schedule", cron = "0 0 * * *" }
        transforms = [{ kind = "rename" }, { kind = "gzip" }]
        "#,
    )
    .unwrap();

    assert_eq!(config.open, OpenFlags::default());
    assert_eq!(config.trigger, TriggerConfig::schedule("0 0 * * *"));
    assert_eq!(
        config.transforms,
        [TransformConfig::rename(), TransformConfig::gzip()]
    );
}

#[test]
fn test_parse_rejects_unknown_fields() {
    let unknown_top = toml::from_str::<RotationConfig>(
        r#"
        path = "app.log"
        trigger = { kind = "size", max_bytes = 10 }
        compress = true
        "#,
    );
    assert!(unknown_top.is_err());

    let unknown_kind = toml::from_str::<RotationConfig>(
        r#"
        path = "app.log"
        trigger = { kind = "weekly" }
        "#,
    );
    assert!(unknown_kind.is_err());
}

#[test]
fn test_serialized_config_parses_back() {
    let config = RotationConfig::new("logs/app.log", TriggerConfig::schedule("*/5 * * * *"))
        .with_transform(TransformConfig::rename());

    let text = toml::to_string(&config).unwrap();

    assert_eq!(toml::from_str::<RotationConfig>(&text).unwrap(), config);
}

#[test]
fn test_build_from_parsed_config_truncates_when_asked() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("app.log");
    fs::write(&path, b"stale\n").unwrap();

    let text = format!(
        r#"
        path = {path:?}
        open = {{ truncate = true, append = false }}
        trigger = {{ kind = "size", max_bytes = 1024 }}
        "#,
        path = path.to_str().unwrap()
    );
    let config: RotationConfig = toml::from_str(&text).unwrap();
    assert_matches!(config.open, OpenFlags { truncate: true, append: false, .. });

    let writer = config.build().unwrap();
    writer.write(b"fresh\n").unwrap();
    writer.close().unwrap();

    assert_eq!(fs::read(&path).unwrap(), b"fresh\n");
}
