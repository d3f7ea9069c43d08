//! Sorted-set operations

use super::{integer_reply, lossy, optional_string_reply, pairs_reply, strings_reply, unexpected, Database, DbError, DbResult};
use crate::protocol::Frame;
use crate::store::zset::{format_score, parse_score};

fn score_arg(score: f64) -> String {
    format_score(score)
}

fn parse_reply_score(command: &str, raw: &str) -> DbResult<f64> {
    parse_score(raw.as_bytes()).ok_or_else(|| DbError::UnexpectedReply {
        command: command.to_string(),
        reply: raw.to_string(),
    })
}

fn scored_pairs(command: &str, reply: Frame) -> DbResult<Vec<(String, f64)>> {
    pairs_reply(command, reply)?
        .into_iter()
        .map(|(member, score)| Ok((member, parse_reply_score(command, &score)?)))
        .collect()
}

fn optional_integer_reply(command: &str, reply: Frame) -> DbResult<Option<i64>> {
    match reply {
        Frame::Null => Ok(None),
        Frame::Integer(n) => Ok(Some(n)),
        other => Err(unexpected(command, &other)),
    }
}

impl Database {
    pub async fn sorted_set_add(&self, key: &str, score: f64, member: &str) -> DbResult<()> {
        self.sorted_set_add_many(key, &[(score, member)]).await
    }

    /// Add or re-score several members in one command
    pub async fn sorted_set_add_many(&self, key: &str, members: &[(f64, &str)]) -> DbResult<()> {
        if key.is_empty() || members.is_empty() {
            return Ok(());
        }
        let mut args = vec![key.to_string()];
        for (score, member) in members {
            args.push(score_arg(*score));
            args.push(member.to_string());
        }
        let reply = self.call("ZADD", args).await?;
        integer_reply("ZADD", reply).map(|_| ())
    }

    pub async fn sorted_set_remove(&self, key: &str, member: &str) -> DbResult<()> {
        if key.is_empty() {
            return Ok(());
        }
        let reply = self.call("ZREM", [key.to_string(), member.to_string()]).await?;
        integer_reply("ZREM", reply).map(|_| ())
    }

    async fn rank_range(&self, command: &str, key: &str, start: i64, stop: i64, with_scores: bool) -> DbResult<Frame> {
        let mut args = vec![key.to_string(), start.to_string(), stop.to_string()];
        if with_scores {
            args.push("WITHSCORES".to_string());
        }
        self.call(command, args).await
    }

    /// Members between two inclusive ranks, lowest score first
    pub async fn get_sorted_set_range(&self, key: &str, start: i64, stop: i64) -> DbResult<Vec<String>> {
        if key.is_empty() {
            return Ok(Vec::new());
        }
        let reply = self.rank_range("ZRANGE", key, start, stop, false).await?;
        strings_reply("ZRANGE", reply)
    }

    pub async fn get_sorted_set_rev_range(&self, key: &str, start: i64, stop: i64) -> DbResult<Vec<String>> {
        if key.is_empty() {
            return Ok(Vec::new());
        }
        let reply = self.rank_range("ZREVRANGE", key, start, stop, false).await?;
        strings_reply("ZREVRANGE", reply)
    }

    pub async fn get_sorted_set_range_with_scores(
        &self,
        key: &str,
        start: i64,
        stop: i64,
    ) -> DbResult<Vec<(String, f64)>> {
        if key.is_empty() {
            return Ok(Vec::new());
        }
        let reply = self.rank_range("ZRANGE", key, start, stop, true).await?;
        scored_pairs("ZRANGE", reply)
    }

    pub async fn get_sorted_set_rev_range_with_scores(
        &self,
        key: &str,
        start: i64,
        stop: i64,
    ) -> DbResult<Vec<(String, f64)>> {
        if key.is_empty() {
            return Ok(Vec::new());
        }
        let reply = self.rank_range("ZREVRANGE", key, start, stop, true).await?;
        scored_pairs("ZREVRANGE", reply)
    }

    async fn score_range(
        &self,
        command: &str,
        key: &str,
        (offset, count): (i64, i64),
        (from, to): (f64, f64),
        with_scores: bool,
    ) -> DbResult<Frame> {
        let mut args = vec![key.to_string(), score_arg(from), score_arg(to)];
        if with_scores {
            args.push("WITHSCORES".to_string());
        }
        args.extend(["LIMIT".to_string(), offset.to_string(), count.to_string()]);
        self.call(command, args).await
    }

    /// Members with `min <= score <= max`, skipping `start`, at most
    /// `count` of them (`count < 0` for all)
    pub async fn get_sorted_set_range_by_score(
        &self,
        key: &str,
        start: i64,
        count: i64,
        min: f64,
        max: f64,
    ) -> DbResult<Vec<String>> {
        if key.is_empty() {
            return Ok(Vec::new());
        }
        let reply = self.score_range("ZRANGEBYSCORE", key, (start, count), (min, max), false).await?;
        strings_reply("ZRANGEBYSCORE", reply)
    }

    /// Same as [`Database::get_sorted_set_range_by_score`], walking from
    /// `max` down to `min`
    pub async fn get_sorted_set_rev_range_by_score(
        &self,
        key: &str,
        start: i64,
        count: i64,
        max: f64,
        min: f64,
    ) -> DbResult<Vec<String>> {
        if key.is_empty() {
            return Ok(Vec::new());
        }
        let reply = self.score_range("ZREVRANGEBYSCORE", key, (start, count), (max, min), false).await?;
        strings_reply("ZREVRANGEBYSCORE", reply)
    }

    pub async fn get_sorted_set_range_by_score_with_scores(
        &self,
        key: &str,
        start: i64,
        count: i64,
        min: f64,
        max: f64,
    ) -> DbResult<Vec<(String, f64)>> {
        if key.is_empty() {
            return Ok(Vec::new());
        }
        let reply = self.score_range("ZRANGEBYSCORE", key, (start, count), (min, max), true).await?;
        scored_pairs("ZRANGEBYSCORE", reply)
    }

    pub async fn get_sorted_set_rev_range_by_score_with_scores(
        &self,
        key: &str,
        start: i64,
        count: i64,
        max: f64,
        min: f64,
    ) -> DbResult<Vec<(String, f64)>> {
        if key.is_empty() {
            return Ok(Vec::new());
        }
        let reply = self.score_range("ZREVRANGEBYSCORE", key, (start, count), (max, min), true).await?;
        scored_pairs("ZREVRANGEBYSCORE", reply)
    }

    pub async fn sorted_set_count(&self, key: &str, min: f64, max: f64) -> DbResult<i64> {
        if key.is_empty() {
            return Ok(0);
        }
        let reply = self.call("ZCOUNT", [key.to_string(), score_arg(min), score_arg(max)]).await?;
        integer_reply("ZCOUNT", reply)
    }

    pub async fn sorted_set_card(&self, key: &str) -> DbResult<i64> {
        if key.is_empty() {
            return Ok(0);
        }
        let reply = self.call("ZCARD", [key.to_string()]).await?;
        integer_reply("ZCARD", reply)
    }

    pub async fn sorted_set_score(&self, key: &str, member: &str) -> DbResult<Option<f64>> {
        if key.is_empty() {
            return Ok(None);
        }
        let reply = self.call("ZSCORE", [key.to_string(), member.to_string()]).await?;
        optional_string_reply("ZSCORE", reply)?
            .map(|raw| parse_reply_score("ZSCORE", &raw))
            .transpose()
    }

    pub async fn is_sorted_set_member(&self, key: &str, member: &str) -> DbResult<bool> {
        Ok(self.sorted_set_score(key, member).await?.is_some())
    }

    pub async fn sorted_set_rank(&self, key: &str, member: &str) -> DbResult<Option<i64>> {
        if key.is_empty() {
            return Ok(None);
        }
        let reply = self.call("ZRANK", [key.to_string(), member.to_string()]).await?;
        optional_integer_reply("ZRANK", reply)
    }

    pub async fn sorted_set_rev_rank(&self, key: &str, member: &str) -> DbResult<Option<i64>> {
        if key.is_empty() {
            return Ok(None);
        }
        let reply = self.call("ZREVRANK", [key.to_string(), member.to_string()]).await?;
        optional_integer_reply("ZREVRANK", reply)
    }

    /// Atomically add `by` to the member's score; returns the new score
    pub async fn sorted_set_incr_by(&self, key: &str, by: f64, member: &str) -> DbResult<f64> {
        if key.is_empty() {
            return Ok(0.0);
        }
        let reply = self.call("ZINCRBY", [key.to_string(), score_arg(by), member.to_string()]).await?;
        match reply {
            Frame::Bulk(raw) => parse_reply_score("ZINCRBY", &lossy(&raw)),
            other => Err(unexpected("ZINCRBY", &other)),
        }
    }

    /// Returns how many members were removed
    pub async fn sorted_set_remove_range_by_score(&self, key: &str, min: f64, max: f64) -> DbResult<i64> {
        if key.is_empty() {
            return Ok(0);
        }
        let reply = self
            .call("ZREMRANGEBYSCORE", [key.to_string(), score_arg(min), score_arg(max)])
            .await?;
        integer_reply("ZREMRANGEBYSCORE", reply)
    }
}

#[cfg(test)]
mod tests {
    use crate::db::tests::memory_db;
    use crate::db::Database;

    async fn leaderboard() -> Database {
        let db = memory_db().await;
        db.sorted_set_add_many("users:reputation", &[(30.0, "carol"), (10.0, "alice"), (20.0, "bob")])
            .await
            .unwrap();
        db.sorted_set_add("users:reputation", 20.0, "dave").await.unwrap();
        db
    }

    #[tokio::test]
    async fn test_rank_ranges() {
        let db = leaderboard().await;
        assert_eq!(
            db.get_sorted_set_range("users:reputation", 0, -1).await.unwrap(),
            ["alice", "bob", "dave", "carol"]
        );
        assert_eq!(
            db.get_sorted_set_rev_range("users:reputation", 0, 1).await.unwrap(),
            ["carol", "dave"]
        );
        assert_eq!(
            db.get_sorted_set_range_with_scores("users:reputation", -1, -1).await.unwrap(),
            [("carol".to_string(), 30.0)]
        );
        assert_eq!(
            db.get_sorted_set_rev_range_with_scores("users:reputation", 0, 0).await.unwrap(),
            [("carol".to_string(), 30.0)]
        );
        assert!(db.get_sorted_set_range("missing", 0, -1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_score_ranges() {
        let db = leaderboard().await;
        assert_eq!(
            db.get_sorted_set_range_by_score("users:reputation", 0, -1, 15.0, f64::INFINITY).await.unwrap(),
            ["bob", "dave", "carol"]
        );
        assert_eq!(
            db.get_sorted_set_range_by_score("users:reputation", 1, 1, f64::NEG_INFINITY, f64::INFINITY)
                .await
                .unwrap(),
            ["bob"]
        );
        assert_eq!(
            db.get_sorted_set_rev_range_by_score("users:reputation", 0, 2, 20.0, f64::NEG_INFINITY)
                .await
                .unwrap(),
            ["dave", "bob"]
        );
        assert_eq!(
            db.get_sorted_set_rev_range_by_score_with_scores("users:reputation", 0, -1, f64::INFINITY, 25.0)
                .await
                .unwrap(),
            [("carol".to_string(), 30.0)]
        );
        assert_eq!(
            db.get_sorted_set_range_by_score_with_scores("users:reputation", 0, 1, 0.0, 100.0)
                .await
                .unwrap(),
            [("alice".to_string(), 10.0)]
        );
        assert_eq!(db.sorted_set_count("users:reputation", 20.0, 30.0).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_membership_and_rank() {
        let db = leaderboard().await;
        assert_eq!(db.sorted_set_card("users:reputation").await.unwrap(), 4);
        assert_eq!(db.sorted_set_score("users:reputation", "bob").await.unwrap(), Some(20.0));
        assert_eq!(db.sorted_set_score("users:reputation", "zed").await.unwrap(), None);
        assert!(db.is_sorted_set_member("users:reputation", "alice").await.unwrap());
        assert_eq!(db.sorted_set_rank("users:reputation", "dave").await.unwrap(), Some(2));
        assert_eq!(db.sorted_set_rev_rank("users:reputation", "dave").await.unwrap(), Some(1));
        assert_eq!(db.sorted_set_rank("users:reputation", "zed").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_incr_and_removal() {
        let db = leaderboard().await;
        assert_eq!(db.sorted_set_incr_by("users:reputation", 2.5, "alice").await.unwrap(), 12.5);
        assert_eq!(db.sorted_set_incr_by("topics:views", 1.0, "topic:1").await.unwrap(), 1.0);

        assert_eq!(db.sorted_set_remove_range_by_score("users:reputation", 15.0, 25.0).await.unwrap(), 2);
        db.sorted_set_remove("users:reputation", "alice").await.unwrap();
        assert_eq!(db.get_sorted_set_range("users:reputation", 0, -1).await.unwrap(), ["carol"]);

        db.sorted_set_remove("users:reputation", "carol").await.unwrap();
        assert!(!db.exists("users:reputation").await.unwrap());
    }

    #[tokio::test]
    async fn test_fractional_scores_survive() {
        let db = memory_db().await;
        db.sorted_set_add("z", 0.1, "a").await.unwrap();
        db.sorted_set_add("z", -1e20, "b").await.unwrap();
        assert_eq!(db.sorted_set_score("z", "a").await.unwrap(), Some(0.1));
        assert_eq!(db.sorted_set_score("z", "b").await.unwrap(), Some(-1e20));
    }
}
