//! Append-only file recovery across restarts

use forumdb::config::{BackendKind, Config};
use forumdb::Database;
use tokio_test::assert_ok;

fn config(backend: BackendKind, dir: &std::path::Path) -> Config {
    let mut config = Config::ephemeral();
    config.storage.backend = backend;
    config.storage.shards = 3;
    config.aof.enabled = true;
    config.aof.dir = dir.to_path_buf();
    config
}

#[tokio::test]
async fn restart_restores_keyspace() {
    for backend in [BackendKind::Memory, BackendKind::Sharded] {
        let dir = tempfile::tempdir().unwrap();
        {
            let db = assert_ok!(Database::open(&config(backend, dir.path())).await);
            assert_ok!(db.increment("global:nextPid").await);
            assert_ok!(db.increment("global:nextPid").await);
            assert_ok!(db.set_object("user:1", [("username", "alice"), ("postcount", "4")]).await);
            assert_ok!(db.increment_object_field_by("user:1", "postcount", 1).await);
            assert_ok!(db.sorted_set_incr_by("users:postcount", 5.0, "1").await);
            assert_ok!(db.set_add("uid:1:followed", &["2", "3"]).await);
            assert_ok!(db.list_prepend("uid:1:notifications", &["n1", "n2"]).await);
            assert_ok!(db.search_index("posts", "hello persistence", "10").await);
            assert_ok!(db.set("doomed", "x").await);
            assert_ok!(db.delete("doomed").await);
            assert_ok!(db.rename("user:1", "user:one").await);
        }

        let db = assert_ok!(Database::open(&config(backend, dir.path())).await);
        assert_eq!(assert_ok!(db.get("global:nextPid").await).as_deref(), Some("2"), "{backend}");
        assert_eq!(
            assert_ok!(db.get_object_field("user:one", "postcount").await).as_deref(),
            Some("5"),
            "{backend}"
        );
        assert!(!assert_ok!(db.exists("user:1").await), "{backend}");
        assert_eq!(assert_ok!(db.sorted_set_score("users:postcount", "1").await), Some(5.0), "{backend}");
        assert_eq!(assert_ok!(db.get_set_members("uid:1:followed").await), ["2", "3"], "{backend}");
        assert_eq!(
            assert_ok!(db.get_list_range("uid:1:notifications", 0, -1).await),
            ["n2", "n1"],
            "{backend}"
        );
        assert_eq!(assert_ok!(db.search("posts", "persistence", 10).await), ["10"], "{backend}");
        assert!(!assert_ok!(db.exists("doomed").await), "{backend}");
    }
}

#[tokio::test]
async fn restart_keeps_renamed_empty_objects() {
    for backend in [BackendKind::Memory, BackendKind::Sharded] {
        let dir = tempfile::tempdir().unwrap();
        // Several pairs so that some renames cross shards
        let pairs: Vec<(String, String)> = (0..8).map(|i| (format!("draft:{i}"), format!("moved:{i}"))).collect();
        {
            let db = assert_ok!(Database::open(&config(backend, dir.path())).await);
            for (old, new) in &pairs {
                assert_ok!(db.set_object_field(old, "f", "1").await);
                assert_ok!(db.delete_object_field(old, "f").await);
                assert_ok!(db.rename(old, new).await);
                assert!(assert_ok!(db.exists(new).await), "{backend}");
            }
        }

        let db = assert_ok!(Database::open(&config(backend, dir.path())).await);
        for (old, new) in &pairs {
            assert!(!assert_ok!(db.exists(old).await), "{backend} {old}");
            assert!(assert_ok!(db.exists(new).await), "{backend} {new}");
            assert_eq!(assert_ok!(db.get_object(new).await), None, "{backend} {new}");
        }
    }
}

#[tokio::test]
async fn info_reports_log_file_size() {
    for backend in [BackendKind::Memory, BackendKind::Sharded] {
        let dir = tempfile::tempdir().unwrap();
        let db = assert_ok!(Database::open(&config(backend, dir.path())).await);
        let before: f64 = assert_ok!(db.info().await).file_size.parse().unwrap();

        for i in 0..20 {
            assert_ok!(db.set_object(&format!("post:{i}"), [("content", "x".repeat(100))]).await);
        }

        let after: f64 = assert_ok!(db.info().await).file_size.parse().unwrap();
        assert!(after > before + 1.0, "{backend}: {before} -> {after}");
    }
}
