//! Configuration feeding the launch domain and bridge timeouts.

use std::convert::Infallible;
use std::time::Duration;

use tempfile::tempdir;

use ordo_bridge::{BridgeError, ContinuationSlot, LoopbackConnection, bridge_with_optional_timeout};
use ordo_config::{ConfigError, OrdoConfig};
use ordo_queue::LaunchDomain;
use ordo_types::TaskPriority;

use crate::common::ScriptedService;

const CONFIG: &str = r#"
[logging]
filter = "ordo_queue=debug"

[launch]
default_priority = "user_initiated"

[bridge]
reply_timeout_ms = 20
"#;

#[tokio::test]
async fn file_config_drives_launch_and_bridge_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, CONFIG).unwrap();

    let config = OrdoConfig::load_from(&path).unwrap().unwrap();
    assert_eq!(config.logging.filter_or_default(), "ordo_queue=debug");

    let priority = config.launch.default_priority.unwrap();
    assert_eq!(priority, TaskPriority::UserInitiated);
    let domain = LaunchDomain::new().with_default_priority(priority);
    let handle = domain.launch(None, None, || async { Ok::<_, Infallible>(()) });
    assert_eq!(handle.priority(), TaskPriority::UserInitiated);
    handle.await.unwrap();

    let timeout = config.bridge.reply_timeout();
    assert_eq!(timeout, Some(Duration::from_millis(20)));
    let service = ScriptedService::default();
    let connection = LoopbackConnection::new(service.clone());
    let result = bridge_with_optional_timeout(
        &connection,
        timeout,
        |service: ScriptedService, slot: ContinuationSlot<u32>| {
            service.fetch_status(slot.decoding_reply());
        },
    )
    .await;
    assert!(matches!(result, Err(BridgeError::TimedOut(_))));
}

#[test]
fn bad_priority_is_a_parse_error_naming_the_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[launch]\ndefault_priority = \"urgent\"\n").unwrap();

    let err = OrdoConfig::load_from(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
    assert_eq!(err.path(), path.as_path());
}
