//! Sorted set commands
//!
//! ZADD, ZREM, ZRANGE, ZREVRANGE, ZRANGEBYSCORE, ZREVRANGEBYSCORE, ZCOUNT,
//! ZCARD, ZSCORE, ZRANK, ZREVRANK, ZINCRBY, ZREMRANGEBYSCORE

use super::{
    arg, arg_bound, arg_integer, arg_is, arg_score, scored_reply, Command, CommandContext,
    CommandError, CommandResult,
};
use crate::aof::AofOperation;
use crate::protocol::Frame;
use crate::store::zset::format_score;
use bytes::Bytes;

/// ZADD key score member [score member ...]
pub struct ZAddCommand;

impl Command for ZAddCommand {
    fn execute(&self, ctx: &mut CommandContext, args: &[Frame]) -> CommandResult {
        if (args.len() - 1) % 2 != 0 {
            return Err(CommandError::Syntax);
        }
        let key = arg(args, 0)?;

        let mut pairs = Vec::with_capacity((args.len() - 1) / 2);
        for i in (1..args.len()).step_by(2) {
            pairs.push((arg_score(args, i)?, arg(args, i + 1)?.clone()));
        }

        let zset = ctx.sorted_set_or_create(key)?;
        let mut added = 0;
        for (score, member) in &pairs {
            if zset.insert(member.clone(), *score) {
                added += 1;
            }
        }

        let payload = pairs
            .into_iter()
            .flat_map(|(score, member)| [Bytes::from(format_score(score)), member])
            .collect();
        ctx.log(AofOperation::ZAdd, key.clone(), payload);
        Ok(Frame::integer(added))
    }

    fn name(&self) -> &'static str {
        "ZADD"
    }

    fn min_args(&self) -> usize {
        3
    }
}

/// ZREM key member [member ...]
pub struct ZRemCommand;

impl Command for ZRemCommand {
    fn execute(&self, ctx: &mut CommandContext, args: &[Frame]) -> CommandResult {
        let key = arg(args, 0)?;
        let members = (1..args.len()).map(|i| arg(args, i)).collect::<Result<Vec<_>, _>>()?;

        let Some(zset) = ctx.sorted_set_mut(key)? else {
            return Ok(Frame::integer(0));
        };
        let removed: Vec<Bytes> = members
            .into_iter()
            .filter(|member| zset.remove(member))
            .cloned()
            .collect();
        ctx.store.remove_if_vacant(key);

        let count = removed.len() as i64;
        if !removed.is_empty() {
            ctx.log(AofOperation::ZRem, key.clone(), removed);
        }
        Ok(Frame::integer(count))
    }

    fn name(&self) -> &'static str {
        "ZREM"
    }

    fn min_args(&self) -> usize {
        2
    }
}

fn range_by_rank(ctx: &mut CommandContext, args: &[Frame], reverse: bool) -> CommandResult {
    let key = arg(args, 0)?;
    let start = arg_integer(args, 1)?;
    let stop = arg_integer(args, 2)?;
    let with_scores = match args.len() {
        3 => false,
        4 if arg_is(args, 3, "WITHSCORES") => true,
        _ => return Err(CommandError::Syntax),
    };

    let items = ctx
        .sorted_set(key)?
        .map(|zset| zset.range_by_rank(start, stop, reverse))
        .unwrap_or_default();
    Ok(scored_reply(items, with_scores))
}

/// ZRANGE key start stop [WITHSCORES]
pub struct ZRangeCommand;

impl Command for ZRangeCommand {
    fn execute(&self, ctx: &mut CommandContext, args: &[Frame]) -> CommandResult {
        range_by_rank(ctx, args, false)
    }

    fn name(&self) -> &'static str {
        "ZRANGE"
    }

    fn min_args(&self) -> usize {
        3
    }

    fn max_args(&self) -> Option<usize> {
        Some(4)
    }
}

/// ZREVRANGE key start stop [WITHSCORES]
pub struct ZRevRangeCommand;

impl Command for ZRevRangeCommand {
    fn execute(&self, ctx: &mut CommandContext, args: &[Frame]) -> CommandResult {
        range_by_rank(ctx, args, true)
    }

    fn name(&self) -> &'static str {
        "ZREVRANGE"
    }

    fn min_args(&self) -> usize {
        3
    }

    fn max_args(&self) -> Option<usize> {
        Some(4)
    }
}

/// Shared by the forward and reverse forms; `reverse` takes `max` first
fn range_by_score(ctx: &mut CommandContext, args: &[Frame], reverse: bool) -> CommandResult {
    let key = arg(args, 0)?;
    let (min, max) = if reverse {
        (arg_bound(args, 2)?, arg_bound(args, 1)?)
    } else {
        (arg_bound(args, 1)?, arg_bound(args, 2)?)
    };

    let mut with_scores = false;
    let mut offset = 0i64;
    let mut count = -1i64;
    let mut i = 3;
    while i < args.len() {
        if arg_is(args, i, "WITHSCORES") {
            with_scores = true;
            i += 1;
        } else if arg_is(args, i, "LIMIT") && i + 2 < args.len() {
            offset = arg_integer(args, i + 1)?;
            count = arg_integer(args, i + 2)?;
            i += 3;
        } else {
            return Err(CommandError::Syntax);
        }
    }

    if offset < 0 {
        return Ok(Frame::Array(vec![]));
    }
    let count = if count < 0 { None } else { Some(count as usize) };

    let items = ctx
        .sorted_set(key)?
        .map(|zset| zset.range_by_score(min, max, reverse, offset as usize, count))
        .unwrap_or_default();
    Ok(scored_reply(items, with_scores))
}

/// ZRANGEBYSCORE key min max [WITHSCORES] [LIMIT offset count]
///
/// A negative count means no limit.
pub struct ZRangeByScoreCommand;

impl Command for ZRangeByScoreCommand {
    fn execute(&self, ctx: &mut CommandContext, args: &[Frame]) -> CommandResult {
        range_by_score(ctx, args, false)
    }

    fn name(&self) -> &'static str {
        "ZRANGEBYSCORE"
    }

    fn min_args(&self) -> usize {
        3
    }

    fn max_args(&self) -> Option<usize> {
        Some(7)
    }
}

/// ZREVRANGEBYSCORE key max min [WITHSCORES] [LIMIT offset count]
pub struct ZRevRangeByScoreCommand;

impl Command for ZRevRangeByScoreCommand {
    fn execute(&self, ctx: &mut CommandContext, args: &[Frame]) -> CommandResult {
        range_by_score(ctx, args, true)
    }

    fn name(&self) -> &'static str {
        "ZREVRANGEBYSCORE"
    }

    fn min_args(&self) -> usize {
        3
    }

    fn max_args(&self) -> Option<usize> {
        Some(7)
    }
}

/// ZCOUNT key min max
pub struct ZCountCommand;

impl Command for ZCountCommand {
    fn execute(&self, ctx: &mut CommandContext, args: &[Frame]) -> CommandResult {
        let key = arg(args, 0)?;
        let min = arg_bound(args, 1)?;
        let max = arg_bound(args, 2)?;
        let n = ctx.sorted_set(key)?.map(|zset| zset.count(min, max)).unwrap_or(0);
        Ok(Frame::integer(n as i64))
    }

    fn name(&self) -> &'static str {
        "ZCOUNT"
    }

    fn min_args(&self) -> usize {
        3
    }

    fn max_args(&self) -> Option<usize> {
        Some(3)
    }
}

/// ZCARD key
pub struct ZCardCommand;

impl Command for ZCardCommand {
    fn execute(&self, ctx: &mut CommandContext, args: &[Frame]) -> CommandResult {
        let n = ctx.sorted_set(arg(args, 0)?)?.map(|zset| zset.len()).unwrap_or(0);
        Ok(Frame::integer(n as i64))
    }

    fn name(&self) -> &'static str {
        "ZCARD"
    }

    fn min_args(&self) -> usize {
        1
    }

    fn max_args(&self) -> Option<usize> {
        Some(1)
    }
}

/// ZSCORE key member
pub struct ZScoreCommand;

impl Command for ZScoreCommand {
    fn execute(&self, ctx: &mut CommandContext, args: &[Frame]) -> CommandResult {
        let member = arg(args, 1)?;
        let score = ctx.sorted_set(arg(args, 0)?)?.and_then(|zset| zset.score(member));
        Ok(match score {
            Some(score) => Frame::bulk(format_score(score)),
            None => Frame::Null,
        })
    }

    fn name(&self) -> &'static str {
        "ZSCORE"
    }

    fn min_args(&self) -> usize {
        2
    }

    fn max_args(&self) -> Option<usize> {
        Some(2)
    }
}

fn rank(ctx: &mut CommandContext, args: &[Frame], reverse: bool) -> CommandResult {
    let member = arg(args, 1)?;
    let rank = ctx.sorted_set(arg(args, 0)?)?.and_then(|zset| {
        if reverse {
            zset.rev_rank(member)
        } else {
            zset.rank(member)
        }
    });
    Ok(match rank {
        Some(rank) => Frame::integer(rank as i64),
        None => Frame::Null,
    })
}

/// ZRANK key member
pub struct ZRankCommand;

impl Command for ZRankCommand {
    fn execute(&self, ctx: &mut CommandContext, args: &[Frame]) -> CommandResult {
        rank(ctx, args, false)
    }

    fn name(&self) -> &'static str {
        "ZRANK"
    }

    fn min_args(&self) -> usize {
        2
    }

    fn max_args(&self) -> Option<usize> {
        Some(2)
    }
}

/// ZREVRANK key member
pub struct ZRevRankCommand;

impl Command for ZRevRankCommand {
    fn execute(&self, ctx: &mut CommandContext, args: &[Frame]) -> CommandResult {
        rank(ctx, args, true)
    }

    fn name(&self) -> &'static str {
        "ZREVRANK"
    }

    fn min_args(&self) -> usize {
        2
    }

    fn max_args(&self) -> Option<usize> {
        Some(2)
    }
}

/// ZINCRBY key increment member
///
/// Logged as a ZADD of the resulting score.
pub struct ZIncrByCommand;

impl Command for ZIncrByCommand {
    fn execute(&self, ctx: &mut CommandContext, args: &[Frame]) -> CommandResult {
        let key = arg(args, 0)?;
        let by = arg_score(args, 1)?;
        let member = arg(args, 2)?.clone();

        let zset = ctx.sorted_set_or_create(key)?;
        let score = zset.score(&member).unwrap_or(0.0) + by;
        if score.is_nan() {
            ctx.store.remove_if_vacant(key);
            return Err(CommandError::Invalid("resulting score is not a number (NaN)".to_string()));
        }
        zset.insert(member.clone(), score);

        let formatted = format_score(score);
        ctx.log(AofOperation::ZAdd, key.clone(), vec![Bytes::from(formatted.clone()), member]);
        Ok(Frame::bulk(formatted))
    }

    fn name(&self) -> &'static str {
        "ZINCRBY"
    }

    fn min_args(&self) -> usize {
        3
    }

    fn max_args(&self) -> Option<usize> {
        Some(3)
    }
}

/// ZREMRANGEBYSCORE key min max
pub struct ZRemRangeByScoreCommand;

impl Command for ZRemRangeByScoreCommand {
    fn execute(&self, ctx: &mut CommandContext, args: &[Frame]) -> CommandResult {
        let key = arg(args, 0)?;
        let min = arg_bound(args, 1)?;
        let max = arg_bound(args, 2)?;

        let Some(zset) = ctx.sorted_set_mut(key)? else {
            return Ok(Frame::integer(0));
        };
        let removed = zset.remove_range_by_score(min, max);
        ctx.store.remove_if_vacant(key);

        let count = removed.len() as i64;
        if !removed.is_empty() {
            ctx.log(AofOperation::ZRem, key.clone(), removed);
        }
        Ok(Frame::integer(count))
    }

    fn name(&self) -> &'static str {
        "ZREMRANGEBYSCORE"
    }

    fn min_args(&self) -> usize {
        3
    }

    fn max_args(&self) -> Option<usize> {
        Some(3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::CommandRegistry;

    fn run(ctx: &mut CommandContext, parts: &[&str]) -> Frame {
        CommandRegistry::new().execute(ctx, &Frame::command(parts[0], parts[1..].iter().map(|p| p.to_string())))
    }

    fn leaderboard() -> CommandContext {
        let mut ctx = CommandContext::new();
        run(&mut ctx, &["ZADD", "users:reputation", "10", "alice", "20", "bob", "20", "dave", "30", "carol"]);
        ctx
    }

    #[test]
    fn test_zadd_counts_new_members() {
        let mut ctx = leaderboard();
        assert_eq!(run(&mut ctx, &["ZADD", "users:reputation", "15", "alice", "5", "erin"]), Frame::integer(1));
        assert_eq!(run(&mut ctx, &["ZCARD", "users:reputation"]), Frame::integer(5));
        assert_eq!(run(&mut ctx, &["ZSCORE", "users:reputation", "alice"]), Frame::bulk("15"));
        assert!(run(&mut ctx, &["ZADD", "users:reputation", "abc", "x"]).is_error());
        assert_eq!(run(&mut ctx, &["ZSCORE", "users:reputation", "x"]), Frame::Null);
    }

    #[test]
    fn test_zrange_and_zrevrange() {
        let mut ctx = leaderboard();
        assert_eq!(
            run(&mut ctx, &["ZRANGE", "users:reputation", "0", "-1"]),
            Frame::bulk_array(["alice", "bob", "dave", "carol"])
        );
        assert_eq!(
            run(&mut ctx, &["ZREVRANGE", "users:reputation", "0", "1", "WITHSCORES"]),
            Frame::bulk_array(["carol", "30", "dave", "20"])
        );
        assert_eq!(run(&mut ctx, &["ZRANGE", "missing", "0", "-1"]), Frame::Array(vec![]));
        assert!(run(&mut ctx, &["ZRANGE", "users:reputation", "0", "-1", "BOGUS"]).is_error());
    }

    #[test]
    fn test_zrangebyscore_with_limit() {
        let mut ctx = leaderboard();
        assert_eq!(
            run(&mut ctx, &["ZRANGEBYSCORE", "users:reputation", "(10", "+inf", "LIMIT", "1", "5"]),
            Frame::bulk_array(["dave", "carol"])
        );
        assert_eq!(
            run(&mut ctx, &["ZREVRANGEBYSCORE", "users:reputation", "20", "-inf", "WITHSCORES", "LIMIT", "0", "-1"]),
            Frame::bulk_array(["dave", "20", "bob", "20", "alice", "10"])
        );
        assert_eq!(run(&mut ctx, &["ZCOUNT", "users:reputation", "20", "30"]), Frame::integer(3));
        assert!(run(&mut ctx, &["ZCOUNT", "users:reputation", "x", "30"]).is_error());
    }

    #[test]
    fn test_ranks() {
        let mut ctx = leaderboard();
        assert_eq!(run(&mut ctx, &["ZRANK", "users:reputation", "bob"]), Frame::integer(1));
        assert_eq!(run(&mut ctx, &["ZREVRANK", "users:reputation", "bob"]), Frame::integer(2));
        assert_eq!(run(&mut ctx, &["ZRANK", "users:reputation", "zed"]), Frame::Null);
    }

    #[test]
    fn test_zincrby() {
        let mut ctx = leaderboard();
        assert_eq!(run(&mut ctx, &["ZINCRBY", "users:reputation", "2.5", "alice"]), Frame::bulk("12.5"));
        assert_eq!(run(&mut ctx, &["ZINCRBY", "views", "1", "topic:1"]), Frame::bulk("1"));
    }

    #[test]
    fn test_removal_drops_empty_set() {
        let mut ctx = leaderboard();
        assert_eq!(run(&mut ctx, &["ZREMRANGEBYSCORE", "users:reputation", "15", "25"]), Frame::integer(2));
        assert_eq!(run(&mut ctx, &["ZREM", "users:reputation", "alice", "carol", "nobody"]), Frame::integer(2));
        assert_eq!(run(&mut ctx, &["EXISTS", "users:reputation"]), Frame::integer(0));
    }
}
