//! Introspection and reset

use super::{lossy, ok_reply, unexpected, Database, DbResult};
use crate::protocol::Frame;
use serde::Serialize;
use std::collections::BTreeMap;

/// `INFO` text split into sections of `name -> value`
type InfoSections = BTreeMap<String, BTreeMap<String, String>>;

/// Backend figures normalized for display
#[derive(Debug, Clone, Serialize)]
pub struct DbInfo {
    pub backend: String,
    pub shards: usize,
    pub keys: u64,
    pub expires: u64,
    pub search_documents: u64,
    /// Kilobytes, two decimals
    pub avg_obj_size: String,
    pub data_size: String,
    pub storage_size: String,
    pub index_size: String,
    /// Append-only file on disk
    pub file_size: String,
    /// Pretty JSON of everything the backend reported
    pub raw: String,
}

fn parse_info(text: &str) -> InfoSections {
    let mut sections = InfoSections::new();
    let mut current = String::from("default");
    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if let Some(name) = line.strip_prefix('#') {
            current = name.trim().to_lowercase();
            continue;
        }
        if let Some((name, value)) = line.split_once(':') {
            sections
                .entry(current.clone())
                .or_default()
                .insert(name.to_string(), value.to_string());
        }
    }
    sections
}

fn kilobytes(bytes: f64) -> String {
    format!("{:.2}", bytes / 1024.0)
}

impl DbInfo {
    fn from_sections(sections: &InfoSections) -> Self {
        let text = |section: &str, name: &str| {
            sections
                .get(section)
                .and_then(|s| s.get(name))
                .cloned()
                .unwrap_or_default()
        };
        let number = |section: &str, name: &str| text(section, name).parse::<u64>().unwrap_or(0);

        let keys = number("keyspace", "keys");
        let data = number("memory", "used_memory") as f64;
        let index = number("memory", "index_memory") as f64;
        let file = number("memory", "aof_bytes") as f64;
        let avg = if keys == 0 { 0.0 } else { data / keys as f64 };

        DbInfo {
            backend: text("server", "backend"),
            shards: number("server", "shards") as usize,
            keys,
            expires: number("keyspace", "expires"),
            search_documents: number("search", "search_documents"),
            avg_obj_size: kilobytes(avg),
            data_size: kilobytes(data),
            storage_size: kilobytes(data + index),
            index_size: kilobytes(index),
            file_size: kilobytes(file),
            raw: serde_json::to_string_pretty(sections).unwrap_or_default(),
        }
    }
}

impl Database {
    pub async fn info(&self) -> DbResult<DbInfo> {
        let reply = self.call("INFO", Vec::<String>::new()).await?;
        let text = match &reply {
            Frame::Bulk(bytes) => lossy(bytes),
            _ => return Err(unexpected("INFO", &reply)),
        };
        Ok(DbInfo::from_sections(&parse_info(&text)))
    }

    /// Erase every key and search document, on every shard
    pub async fn flushdb(&self) -> DbResult<()> {
        let reply = self.call("FLUSHDB", Vec::<String>::new()).await?;
        ok_reply("FLUSHDB", reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::tests::memory_db;

    #[test]
    fn test_parse_info_sections() {
        let sections = parse_info("# Server\r\nbackend:memory\r\n\r\n# Keyspace\r\nkeys:3\r\n");
        assert_eq!(sections["server"]["backend"], "memory");
        assert_eq!(sections["keyspace"]["keys"], "3");
    }

    #[test]
    fn test_sizes_in_kilobytes() {
        let sections = parse_info(
            "# Keyspace\nkeys:2\n# Memory\nused_memory:3072\nindex_memory:512\naof_bytes:2560\n",
        );
        let info = DbInfo::from_sections(&sections);
        assert_eq!(info.avg_obj_size, "1.50");
        assert_eq!(info.data_size, "3.00");
        assert_eq!(info.index_size, "0.50");
        assert_eq!(info.storage_size, "3.50");
        assert_eq!(info.file_size, "2.50");
    }

    #[tokio::test]
    async fn test_info_counts_keys() {
        let db = memory_db().await;
        db.set("a", "1").await.unwrap();
        db.set_add("b", &["x"]).await.unwrap();
        db.pexpire("b", 60_000).await.unwrap();
        db.search_index("posts", "hello", "1").await.unwrap();

        let info = db.info().await.unwrap();
        assert_eq!(info.backend, "memory");
        assert_eq!(info.shards, 1);
        assert_eq!(info.keys, 2);
        assert_eq!(info.expires, 1);
        assert_eq!(info.search_documents, 1);
        assert_eq!(info.file_size, "0.00");
        assert!(info.raw.contains("\"keyspace\""));
    }

    #[tokio::test]
    async fn test_flushdb_erases_everything() {
        let db = memory_db().await;
        db.set("a", "1").await.unwrap();
        db.search_index("posts", "hello", "1").await.unwrap();
        db.flushdb().await.unwrap();

        assert!(!db.exists("a").await.unwrap());
        assert!(db.search("posts", "hello", 10).await.unwrap().is_empty());
        assert_eq!(db.info().await.unwrap().keys, 0);
    }
}
