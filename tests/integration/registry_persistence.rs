//! Integration tests for the JSON-backed host registry

use assert_matches::assert_matches;
use network_logger::HostRegistry;
use network_logger::hosts::RegistryError;
use pretty_assertions::assert_eq;
use tempfile::tempdir;

use crate::helpers::host_id;

const DEFAULT: &str = "alert@example.com";

#[test]
fn test_hosts_survive_reopen_in_order() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("hosts.json");

    let mut registry = HostRegistry::open(&path, DEFAULT).unwrap();
    registry.add(host_id("zeta.example.com"), None).unwrap();
    registry.add(host_id("10.0.0.1"), None).unwrap();
    registry
        .add(host_id("alpha.example.com"), Some("ops@example.com".into()))
        .unwrap();

    let reopened = HostRegistry::open(&path, DEFAULT).unwrap();
    let hosts: Vec<(String, String)> = reopened
        .list()
        .into_iter()
        .map(|host| (host.id.to_string(), host.destination))
        .collect();

    assert_eq!(
        hosts,
        vec![
            ("zeta.example.com".to_string(), DEFAULT.to_string()),
            ("10.0.0.1".to_string(), DEFAULT.to_string()),
            ("alpha.example.com".to_string(), "ops@example.com".to_string()),
        ]
    );
}

#[test]
fn test_add_twice_keeps_single_entry_on_disk() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("hosts.json");

    let mut registry = HostRegistry::open(&path, DEFAULT).unwrap();
    registry.add(host_id("h1"), None).unwrap();

    assert_matches!(
        registry.add(host_id("h1"), Some("other@example.com".into())),
        Err(RegistryError::AlreadyExists(id)) if id == host_id("h1")
    );

    let reopened = HostRegistry::open(&path, DEFAULT).unwrap();
    assert_eq!(reopened.len(), 1);
    assert_eq!(reopened.list()[0].destination, DEFAULT);
}

#[test]
fn test_remove_missing_host_is_not_found() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("hosts.json");

    let mut registry = HostRegistry::open(&path, DEFAULT).unwrap();

    assert_matches!(
        registry.remove(&host_id("h2")),
        Err(RegistryError::NotFound(_))
    );
    // nothing was written
    assert!(!path.exists());
}

#[test]
fn test_custom_destination_listed_then_removed() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("hosts.json");

    let mut registry = HostRegistry::open(&path, DEFAULT).unwrap();
    registry
        .add(host_id("db.internal"), Some("dba@example.com".into()))
        .unwrap();

    let listed = HostRegistry::open(&path, DEFAULT).unwrap().list();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].destination, "dba@example.com");

    registry.remove(&host_id("db.internal")).unwrap();

    let reopened = HostRegistry::open(&path, DEFAULT).unwrap();
    assert!(reopened.is_empty());
    assert!(reopened.get(&host_id("db.internal")).is_none());
}

#[test]
fn test_reload_picks_up_external_changes() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("hosts.json");

    let mut monitor_view = HostRegistry::open(&path, DEFAULT).unwrap();
    let mut admin_view = HostRegistry::open(&path, DEFAULT).unwrap();
    admin_view.add(host_id("new.example.com"), None).unwrap();

    assert!(monitor_view.is_empty());
    monitor_view.reload().unwrap();
    assert_eq!(monitor_view.len(), 1);
}

#[test]
fn test_file_without_recipient_uses_default() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("hosts.json");
    std::fs::write(&path, r#"{"a.example.com": {}, "b.example.com": {"recipient": "b@example.com"}}"#)
        .unwrap();

    let registry = HostRegistry::open(&path, DEFAULT).unwrap();
    let hosts = registry.list();

    assert_eq!(hosts[0].destination, DEFAULT);
    assert_eq!(hosts[1].destination, "b@example.com");
}

#[test]
fn test_respelled_duplicate_in_file_keeps_first() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("hosts.json");
    std::fs::write(
        &path,
        r#"{"Example.com": {"recipient": "first@example.com"}, "example.com.": {"recipient": "second@example.com"}}"#,
    )
    .unwrap();

    let registry = HostRegistry::open(&path, DEFAULT).unwrap();

    assert_eq!(registry.len(), 1);
    assert_eq!(registry.list()[0].id.as_str(), "example.com");
    assert_eq!(registry.list()[0].destination, "first@example.com");
}

#[test]
fn test_malformed_file_is_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("hosts.json");
    std::fs::write(&path, "[not, a, map").unwrap();

    assert_matches!(
        HostRegistry::open(&path, DEFAULT),
        Err(RegistryError::Parse { .. })
    );
}

#[test]
fn test_invalid_host_key_is_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("hosts.json");
    std::fs::write(&path, r#"{"bad host": {}}"#).unwrap();

    assert_matches!(
        HostRegistry::open(&path, DEFAULT),
        Err(RegistryError::InvalidHost { .. })
    );
}
