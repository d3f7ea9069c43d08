//! Full-text search

use super::{integer_reply, ok_reply, strings_reply, Database, DbResult};
use tracing::error;

impl Database {
    /// Index `content` under `id` in the `key` namespace, replacing any
    /// previous version of the document
    ///
    /// Failures are logged here and returned; callers that do not care
    /// may drop the result.
    pub async fn search_index(&self, key: &str, content: &str, id: &str) -> DbResult<()> {
        if key.is_empty() || id.is_empty() {
            return Ok(());
        }
        let result = match self
            .call("SEARCHINDEX", [key.to_string(), id.to_string(), content.to_string()])
            .await
        {
            Ok(reply) => ok_reply("SEARCHINDEX", reply),
            Err(e) => Err(e),
        };
        if let Err(e) = &result {
            error!("Error indexing {} document {}: {}", key, id, e);
        }
        result
    }

    /// Ids of matching documents, best match first, at most `limit`
    /// (`limit <= 0` for all)
    pub async fn search(&self, key: &str, term: &str, limit: i64) -> DbResult<Vec<String>> {
        if key.is_empty() {
            return Ok(Vec::new());
        }
        let reply = self
            .call("SEARCH", [key.to_string(), term.to_string(), limit.to_string()])
            .await?;
        strings_reply("SEARCH", reply)
    }

    pub async fn search_remove(&self, key: &str, id: &str) -> DbResult<()> {
        if key.is_empty() || id.is_empty() {
            return Ok(());
        }
        let reply = self.call("SEARCHREMOVE", [key.to_string(), id.to_string()]).await?;
        integer_reply("SEARCHREMOVE", reply).map(|_| ())
    }
}
