//! Unit tests for the SQLite store

use super::*;
use serde_json::json;
use tempfile::tempdir;

fn descriptor(slug: &str) -> PackageDescriptor {
    let mut desc = PackageDescriptor::new(slug);
    desc.name = Some(format!("{} plugin", slug));
    desc.version = Some("1.0.0".to_string());
    desc.download_link = Some(format!("http://x/{}.zip", slug));
    desc.last_updated = Some("2024-06-01 10:00am GMT".to_string());
    desc.active_installs = Some(json!(5000));
    desc
}

fn finding(check_id: &str) -> ScanFinding {
    ScanFinding::from_value(json!({
        "check_id": check_id,
        "path": "plugins/foo/foo.php",
        "start": { "line": 3 },
        "end": { "line": 4 },
        "extra": { "message": "bad", "severity": "WARNING" }
    }))
}

#[test]
fn test_in_memory_insert_and_count() {
    let mut store = SqliteStore::in_memory().unwrap();

    store.insert_plugin(&descriptor("foo")).unwrap();
    store.insert_finding("foo", &finding("rule.a")).unwrap();
    store.insert_finding("foo", &finding("rule.b")).unwrap();
    store.insert_finding("bar", &finding("rule.c")).unwrap();
    store.commit().unwrap();

    assert_eq!(store.plugin_count().unwrap(), 1);
    assert_eq!(store.finding_count(None).unwrap(), 3);
    assert_eq!(store.finding_count(Some("foo")).unwrap(), 2);
    assert_eq!(
        store.finding_check_ids("foo").unwrap(),
        vec![Some("rule.a".to_string()), Some("rule.b".to_string())]
    );
}

#[test]
fn test_raw_descriptor_is_stored() {
    let mut store = SqliteStore::in_memory().unwrap();
    let mut desc = descriptor("foo");
    desc.extra.insert("tested".to_string(), json!("6.5"));
    store.insert_plugin(&desc).unwrap();
    store.commit().unwrap();

    let (raw, installs): (String, Option<i64>) = store
        .conn
        .query_row("SELECT raw, active_installs FROM plugins WHERE slug = 'foo'", [], |row| {
            Ok((row.get(0)?, row.get(1)?))
        })
        .unwrap();

    let raw: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(raw["tested"], "6.5");
    assert_eq!(installs, Some(5000));
}

#[test]
fn test_unparsable_install_count_stored_as_null() {
    let mut store = SqliteStore::in_memory().unwrap();
    let mut desc = descriptor("foo");
    desc.active_installs = Some(json!("lots"));
    store.insert_plugin(&desc).unwrap();
    store.commit().unwrap();

    let installs: Option<i64> = store
        .conn
        .query_row("SELECT active_installs FROM plugins", [], |row| row.get(0))
        .unwrap();
    assert_eq!(installs, None);
}

#[test]
fn test_delete_all_findings() {
    let mut store = SqliteStore::in_memory().unwrap();
    store.insert_plugin(&descriptor("foo")).unwrap();
    store.insert_finding("foo", &finding("rule.a")).unwrap();
    store.commit().unwrap();

    store.delete_all_findings().unwrap();
    store.commit().unwrap();

    assert_eq!(store.finding_count(None).unwrap(), 0);
    // plugin inventory is untouched
    assert_eq!(store.plugin_count().unwrap(), 1);
}

#[test]
fn test_connect_without_schema_fails_on_empty_database() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("audit.db");

    let err = SqliteStore::connect(&path, false).err().unwrap();
    assert!(matches!(err, AuditError::Store { .. }));
    assert!(err.to_string().contains("plugins"));
}

#[test]
fn test_connect_creates_schema_and_parent_dirs() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested/audit.db");

    let store = SqliteStore::connect(&path, true).unwrap();
    store.close().unwrap();

    assert!(path.is_file());
    // a second run no longer needs the flag
    let store = SqliteStore::connect(&path, false).unwrap();
    assert_eq!(store.plugin_count().unwrap(), 0);
}

#[test]
fn test_committed_rows_survive_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("audit.db");

    let mut store = SqliteStore::connect(&path, true).unwrap();
    store.insert_plugin(&descriptor("foo")).unwrap();
    store.commit().unwrap();
    store.close().unwrap();

    let store = SqliteStore::connect(&path, false).unwrap();
    assert_eq!(store.plugin_count().unwrap(), 1);
}

#[test]
fn test_uncommitted_rows_are_lost_on_close() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("audit.db");

    let mut store = SqliteStore::connect(&path, true).unwrap();
    store.insert_plugin(&descriptor("foo")).unwrap();
    store.commit().unwrap();
    store.insert_plugin(&descriptor("bar")).unwrap();
    store.close().unwrap();

    let store = SqliteStore::connect(&path, false).unwrap();
    assert_eq!(store.plugin_count().unwrap(), 1);
}

#[test]
fn test_commit_without_pending_writes_is_a_no_op() {
    let mut store = SqliteStore::in_memory().unwrap();
    store.commit().unwrap();
    store.commit().unwrap();
}
