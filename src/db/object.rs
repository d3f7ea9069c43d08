//! Objects, single values, counters and expiration

use super::{
    integer_reply, ok_reply, optional_string_reply, optional_strings_reply, pairs_reply,
    strings_reply, Database, DbResult,
};
use bytes::Bytes;
use std::collections::HashMap;

/// Field map of an object as returned to callers
pub type Object = HashMap<String, String>;

impl Database {
    /// False for a missing key and for the empty key
    pub async fn exists(&self, key: &str) -> DbResult<bool> {
        if key.is_empty() {
            return Ok(false);
        }
        let reply = self.call("EXISTS", [key.to_string()]).await?;
        Ok(integer_reply("EXISTS", reply)? > 0)
    }

    /// The `value` field of the object at `key`
    pub async fn get(&self, key: &str) -> DbResult<Option<String>> {
        if key.is_empty() {
            return Ok(None);
        }
        let reply = self.call("GET", [key.to_string()]).await?;
        optional_string_reply("GET", reply)
    }

    pub async fn set(&self, key: &str, value: &str) -> DbResult<()> {
        if key.is_empty() {
            return Ok(());
        }
        let reply = self.call("SET", [key.to_string(), value.to_string()]).await?;
        ok_reply("SET", reply)
    }

    pub async fn delete(&self, key: &str) -> DbResult<()> {
        self.delete_all(&[key]).await
    }

    /// Delete every listed key; empty keys are skipped
    pub async fn delete_all(&self, keys: &[&str]) -> DbResult<()> {
        let keys: Vec<String> = keys.iter().filter(|k| !k.is_empty()).map(|k| k.to_string()).collect();
        if keys.is_empty() {
            return Ok(());
        }
        let reply = self.call("DEL", keys).await?;
        integer_reply("DEL", reply).map(|_| ())
    }

    /// Atomically add one to the `value` field, starting from 0
    pub async fn increment(&self, key: &str) -> DbResult<i64> {
        if key.is_empty() {
            return Ok(0);
        }
        let reply = self.call("INCR", [key.to_string()]).await?;
        integer_reply("INCR", reply)
    }

    /// Move everything stored under `old` to `new`, replacing `new`
    pub async fn rename(&self, old: &str, new: &str) -> DbResult<()> {
        if old.is_empty() || new.is_empty() {
            return Ok(());
        }
        let reply = self.call("RENAME", [old.to_string(), new.to_string()]).await?;
        ok_reply("RENAME", reply)
    }

    async fn set_expiration(&self, command: &str, key: &str, amount: i64) -> DbResult<()> {
        if key.is_empty() {
            return Ok(());
        }
        let reply = self.call(command, [key.to_string(), amount.to_string()]).await?;
        integer_reply(command, reply).map(|_| ())
    }

    /// Expire after `seconds`, counted from the current second
    pub async fn expire(&self, key: &str, seconds: i64) -> DbResult<()> {
        self.set_expiration("EXPIRE", key, seconds).await
    }

    /// Expire at a Unix time in seconds
    pub async fn expire_at(&self, key: &str, unix_seconds: i64) -> DbResult<()> {
        self.set_expiration("EXPIREAT", key, unix_seconds).await
    }

    pub async fn pexpire(&self, key: &str, ms: i64) -> DbResult<()> {
        self.set_expiration("PEXPIRE", key, ms).await
    }

    pub async fn pexpire_at(&self, key: &str, unix_ms: i64) -> DbResult<()> {
        self.set_expiration("PEXPIREAT", key, unix_ms).await
    }

    /// Seconds to live; `-1` without expiration, `-2` when missing
    pub async fn ttl(&self, key: &str) -> DbResult<i64> {
        if key.is_empty() {
            return Ok(-2);
        }
        let reply = self.call("TTL", [key.to_string()]).await?;
        integer_reply("TTL", reply)
    }

    pub async fn pttl(&self, key: &str) -> DbResult<i64> {
        if key.is_empty() {
            return Ok(-2);
        }
        let reply = self.call("PTTL", [key.to_string()]).await?;
        integer_reply("PTTL", reply)
    }

    /// Upsert several fields at once
    pub async fn set_object<I, F, V>(&self, key: &str, fields: I) -> DbResult<()>
    where
        I: IntoIterator<Item = (F, V)>,
        F: Into<Bytes>,
        V: Into<Bytes>,
    {
        if key.is_empty() {
            return Ok(());
        }
        let mut args = vec![Bytes::copy_from_slice(key.as_bytes())];
        for (field, value) in fields {
            args.push(field.into());
            args.push(value.into());
        }
        if args.len() == 1 {
            return Ok(());
        }
        let reply = self.call("HSET", args).await?;
        integer_reply("HSET", reply).map(|_| ())
    }

    pub async fn set_object_field(&self, key: &str, field: &str, value: &str) -> DbResult<()> {
        self.set_object(key, [(field.to_string(), value.to_string())]).await
    }

    /// The whole object; `None` when missing or without fields
    pub async fn get_object(&self, key: &str) -> DbResult<Option<Object>> {
        if key.is_empty() {
            return Ok(None);
        }
        let reply = self.call("HGETALL", [key.to_string()]).await?;
        let fields = pairs_reply("HGETALL", reply)?;
        if fields.is_empty() {
            return Ok(None);
        }
        Ok(Some(fields.into_iter().collect()))
    }

    /// One result per key, in order
    pub async fn get_objects(&self, keys: &[&str]) -> DbResult<Vec<Option<Object>>> {
        let mut objects = Vec::with_capacity(keys.len());
        for key in keys {
            objects.push(self.get_object(key).await?);
        }
        Ok(objects)
    }

    pub async fn get_object_field(&self, key: &str, field: &str) -> DbResult<Option<String>> {
        if key.is_empty() {
            return Ok(None);
        }
        let reply = self.call("HGET", [key.to_string(), field.to_string()]).await?;
        optional_string_reply("HGET", reply)
    }

    /// The requested fields, each `None` when absent
    pub async fn get_object_fields(
        &self,
        key: &str,
        fields: &[&str],
    ) -> DbResult<HashMap<String, Option<String>>> {
        if key.is_empty() || fields.is_empty() {
            return Ok(fields.iter().map(|f| (f.to_string(), None)).collect());
        }
        let mut args = vec![key.to_string()];
        args.extend(fields.iter().map(|f| f.to_string()));
        let reply = self.call("HMGET", args).await?;
        let values = optional_strings_reply("HMGET", reply)?;
        Ok(fields.iter().map(|f| f.to_string()).zip(values).collect())
    }

    pub async fn get_object_keys(&self, key: &str) -> DbResult<Vec<String>> {
        if key.is_empty() {
            return Ok(Vec::new());
        }
        let reply = self.call("HKEYS", [key.to_string()]).await?;
        strings_reply("HKEYS", reply)
    }

    pub async fn get_object_values(&self, key: &str) -> DbResult<Vec<String>> {
        if key.is_empty() {
            return Ok(Vec::new());
        }
        let reply = self.call("HVALS", [key.to_string()]).await?;
        strings_reply("HVALS", reply)
    }

    pub async fn is_object_field(&self, key: &str, field: &str) -> DbResult<bool> {
        if key.is_empty() {
            return Ok(false);
        }
        let reply = self.call("HEXISTS", [key.to_string(), field.to_string()]).await?;
        Ok(integer_reply("HEXISTS", reply)? == 1)
    }

    /// Remove one field; the object itself stays, even when left empty
    pub async fn delete_object_field(&self, key: &str, field: &str) -> DbResult<()> {
        if key.is_empty() {
            return Ok(());
        }
        let reply = self.call("HDEL", [key.to_string(), field.to_string()]).await?;
        integer_reply("HDEL", reply).map(|_| ())
    }

    pub async fn increment_object_field_by(&self, key: &str, field: &str, by: i64) -> DbResult<i64> {
        if key.is_empty() {
            return Ok(0);
        }
        let reply = self
            .call("HINCRBY", [key.to_string(), field.to_string(), by.to_string()])
            .await?;
        integer_reply("HINCRBY", reply)
    }

    pub async fn decrement_object_field_by(&self, key: &str, field: &str, by: i64) -> DbResult<i64> {
        self.increment_object_field_by(key, field, by.saturating_neg()).await
    }
}
