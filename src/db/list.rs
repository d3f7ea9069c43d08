//! Lists

use super::{integer_reply, ok_reply, optional_string_reply, strings_reply, Database, DbResult};

impl Database {
    async fn push(&self, command: &str, key: &str, values: &[&str]) -> DbResult<()> {
        if key.is_empty() || values.is_empty() {
            return Ok(());
        }
        let mut args = vec![key.to_string()];
        args.extend(values.iter().map(|v| v.to_string()));
        let reply = self.call(command, args).await?;
        integer_reply(command, reply).map(|_| ())
    }

    /// Push to the head; with several values the last one ends up first
    pub async fn list_prepend(&self, key: &str, values: &[&str]) -> DbResult<()> {
        self.push("LPUSH", key, values).await
    }

    pub async fn list_append(&self, key: &str, values: &[&str]) -> DbResult<()> {
        self.push("RPUSH", key, values).await
    }

    /// Pop from the tail
    pub async fn list_remove_last(&self, key: &str) -> DbResult<Option<String>> {
        if key.is_empty() {
            return Ok(None);
        }
        let reply = self.call("RPOP", [key.to_string()]).await?;
        optional_string_reply("RPOP", reply)
    }

    /// Remove every occurrence of `value`
    pub async fn list_remove_all(&self, key: &str, value: &str) -> DbResult<()> {
        if key.is_empty() {
            return Ok(());
        }
        let reply = self.call("LREM", [key.to_string(), "0".to_string(), value.to_string()]).await?;
        integer_reply("LREM", reply).map(|_| ())
    }

    /// Keep only the inclusive index range
    pub async fn list_trim(&self, key: &str, start: i64, stop: i64) -> DbResult<()> {
        if key.is_empty() {
            return Ok(());
        }
        let reply = self
            .call("LTRIM", [key.to_string(), start.to_string(), stop.to_string()])
            .await?;
        ok_reply("LTRIM", reply)
    }

    pub async fn get_list_range(&self, key: &str, start: i64, stop: i64) -> DbResult<Vec<String>> {
        if key.is_empty() {
            return Ok(Vec::new());
        }
        let reply = self
            .call("LRANGE", [key.to_string(), start.to_string(), stop.to_string()])
            .await?;
        strings_reply("LRANGE", reply)
    }

    pub async fn list_length(&self, key: &str) -> DbResult<i64> {
        if key.is_empty() {
            return Ok(0);
        }
        let reply = self.call("LLEN", [key.to_string()]).await?;
        integer_reply("LLEN", reply)
    }
}
