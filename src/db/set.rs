//! Unordered sets

use super::{integer_reply, strings_reply, Database, DbResult};

impl Database {
    pub async fn set_add(&self, key: &str, members: &[&str]) -> DbResult<()> {
        if key.is_empty() || members.is_empty() {
            return Ok(());
        }
        let mut args = vec![key.to_string()];
        args.extend(members.iter().map(|m| m.to_string()));
        let reply = self.call("SADD", args).await?;
        integer_reply("SADD", reply).map(|_| ())
    }

    pub async fn set_remove(&self, key: &str, members: &[&str]) -> DbResult<()> {
        if key.is_empty() || members.is_empty() {
            return Ok(());
        }
        let mut args = vec![key.to_string()];
        args.extend(members.iter().map(|m| m.to_string()));
        let reply = self.call("SREM", args).await?;
        integer_reply("SREM", reply).map(|_| ())
    }

    pub async fn is_set_member(&self, key: &str, member: &str) -> DbResult<bool> {
        if key.is_empty() {
            return Ok(false);
        }
        let reply = self.call("SISMEMBER", [key.to_string(), member.to_string()]).await?;
        Ok(integer_reply("SISMEMBER", reply)? == 1)
    }

    /// Members sorted by their bytes
    pub async fn get_set_members(&self, key: &str) -> DbResult<Vec<String>> {
        if key.is_empty() {
            return Ok(Vec::new());
        }
        let reply = self.call("SMEMBERS", [key.to_string()]).await?;
        strings_reply("SMEMBERS", reply)
    }

    pub async fn set_count(&self, key: &str) -> DbResult<i64> {
        if key.is_empty() {
            return Ok(0);
        }
        let reply = self.call("SCARD", [key.to_string()]).await?;
        integer_reply("SCARD", reply)
    }
}
