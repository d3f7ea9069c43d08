//! Expiration commands (EXPIRE, EXPIREAT, PEXPIRE, PEXPIREAT, TTL, PTTL)
//!
//! All four setters reduce to an absolute deadline in Unix milliseconds,
//! which is also what gets logged.

use super::{arg, arg_integer, Command, CommandContext, CommandError, CommandResult};
use crate::aof::AofOperation;
use crate::protocol::Frame;
use bytes::Bytes;

fn expire_at(ctx: &mut CommandContext, key: &Bytes, at_millis: i64) -> CommandResult {
    let at = at_millis.max(0) as u64;
    ctx.store.set_expire_at(key, at);
    ctx.log(AofOperation::PExpireAt, key.clone(), vec![Bytes::from(at.to_string())]);
    Ok(Frame::integer(1))
}

fn seconds_to_millis(seconds: i64) -> Result<i64, CommandError> {
    seconds.checked_mul(1000).ok_or(CommandError::NotInteger)
}

/// EXPIRE key seconds
///
/// Second granularity: the deadline is `round(now / 1s) + seconds`.
pub struct ExpireCommand;

impl Command for ExpireCommand {
    fn execute(&self, ctx: &mut CommandContext, args: &[Frame]) -> CommandResult {
        let key = arg(args, 0)?;
        let seconds = arg_integer(args, 1)?;
        let now_secs = ((ctx.store.now() + 500) / 1000) as i64;
        let at = seconds_to_millis(now_secs.saturating_add(seconds))?;
        expire_at(ctx, key, at)
    }

    fn name(&self) -> &'static str {
        "EXPIRE"
    }

    fn min_args(&self) -> usize {
        2
    }

    fn max_args(&self) -> Option<usize> {
        Some(2)
    }
}

/// EXPIREAT key unix-seconds
pub struct ExpireAtCommand;

impl Command for ExpireAtCommand {
    fn execute(&self, ctx: &mut CommandContext, args: &[Frame]) -> CommandResult {
        let key = arg(args, 0)?;
        let at = seconds_to_millis(arg_integer(args, 1)?)?;
        expire_at(ctx, key, at)
    }

    fn name(&self) -> &'static str {
        "EXPIREAT"
    }

    fn min_args(&self) -> usize {
        2
    }

    fn max_args(&self) -> Option<usize> {
        Some(2)
    }
}

/// PEXPIRE key milliseconds
pub struct PExpireCommand;

impl Command for PExpireCommand {
    fn execute(&self, ctx: &mut CommandContext, args: &[Frame]) -> CommandResult {
        let key = arg(args, 0)?;
        let ms = arg_integer(args, 1)?;
        let at = (ctx.store.now() as i64).saturating_add(ms);
        expire_at(ctx, key, at)
    }

    fn name(&self) -> &'static str {
        "PEXPIRE"
    }

    fn min_args(&self) -> usize {
        2
    }

    fn max_args(&self) -> Option<usize> {
        Some(2)
    }
}

/// PEXPIREAT key unix-milliseconds
pub struct PExpireAtCommand;

impl Command for PExpireAtCommand {
    fn execute(&self, ctx: &mut CommandContext, args: &[Frame]) -> CommandResult {
        let key = arg(args, 0)?;
        let at = arg_integer(args, 1)?;
        expire_at(ctx, key, at)
    }

    fn name(&self) -> &'static str {
        "PEXPIREAT"
    }

    fn min_args(&self) -> usize {
        2
    }

    fn max_args(&self) -> Option<usize> {
        Some(2)
    }
}

/// TTL key
///
/// Seconds left, rounded; `-1` without expiration, `-2` when missing.
pub struct TtlCommand;

impl Command for TtlCommand {
    fn execute(&self, ctx: &mut CommandContext, args: &[Frame]) -> CommandResult {
        let pttl = ctx.store.pttl(arg(args, 0)?);
        let ttl = if pttl < 0 { pttl } else { (pttl + 500) / 1000 };
        Ok(Frame::integer(ttl))
    }

    fn name(&self) -> &'static str {
        "TTL"
    }

    fn min_args(&self) -> usize {
        1
    }

    fn max_args(&self) -> Option<usize> {
        Some(1)
    }
}

/// PTTL key
pub struct PTtlCommand;

impl Command for PTtlCommand {
    fn execute(&self, ctx: &mut CommandContext, args: &[Frame]) -> CommandResult {
        Ok(Frame::integer(ctx.store.pttl(arg(args, 0)?)))
    }

    fn name(&self) -> &'static str {
        "PTTL"
    }

    fn min_args(&self) -> usize {
        1
    }

    fn max_args(&self) -> Option<usize> {
        Some(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::commands::CommandRegistry;
    use std::sync::Arc;

    fn run(ctx: &mut CommandContext, parts: &[&str]) -> Frame {
        CommandRegistry::new().execute(ctx, &Frame::command(parts[0], parts[1..].iter().map(|p| p.to_string())))
    }

    #[test]
    fn test_expire_rounds_to_seconds() {
        let clock = Arc::new(ManualClock::new(10_600));
        let mut ctx = CommandContext::with_clock(16, clock.clone());
        run(&mut ctx, &["HSET", "session", "uid", "1"]);

        assert_eq!(run(&mut ctx, &["EXPIRE", "session", "5"]), Frame::integer(1));
        // round(10.6) + 5 = 16s
        assert_eq!(run(&mut ctx, &["PTTL", "session"]), Frame::integer(5_400));
        assert_eq!(run(&mut ctx, &["HGET", "session", "expireAt"]), Frame::bulk("16000"));
        assert_eq!(run(&mut ctx, &["TTL", "session"]), Frame::integer(5));

        clock.advance(5_400);
        assert_eq!(run(&mut ctx, &["EXISTS", "session"]), Frame::integer(0));
        assert_eq!(run(&mut ctx, &["TTL", "session"]), Frame::integer(-2));
    }

    #[test]
    fn test_pexpire_and_absolute_forms() {
        let clock = Arc::new(ManualClock::new(1_000));
        let mut ctx = CommandContext::with_clock(16, clock);

        run(&mut ctx, &["PEXPIRE", "a", "250"]);
        assert_eq!(run(&mut ctx, &["PTTL", "a"]), Frame::integer(250));

        run(&mut ctx, &["EXPIREAT", "b", "3"]);
        assert_eq!(run(&mut ctx, &["PTTL", "b"]), Frame::integer(2_000));

        run(&mut ctx, &["PEXPIREAT", "c", "1500"]);
        assert_eq!(run(&mut ctx, &["PTTL", "c"]), Frame::integer(500));

        run(&mut ctx, &["HSET", "d", "f", "v"]);
        assert_eq!(run(&mut ctx, &["TTL", "d"]), Frame::integer(-1));
    }

    #[test]
    fn test_expire_missing_key_creates_object() {
        let mut ctx = CommandContext::with_clock(16, Arc::new(ManualClock::new(0)));
        run(&mut ctx, &["PEXPIRE", "ghost", "60000"]);
        assert_eq!(run(&mut ctx, &["TYPE", "ghost"]), Frame::simple("hash"));
        assert_eq!(run(&mut ctx, &["HKEYS", "ghost"]), Frame::bulk_array(["expireAt"]));
    }

    #[test]
    fn test_expire_zero_expires_immediately() {
        let mut ctx = CommandContext::with_clock(16, Arc::new(ManualClock::new(2_000)));
        run(&mut ctx, &["SET", "k", "v"]);
        run(&mut ctx, &["EXPIRE", "k", "0"]);
        assert_eq!(run(&mut ctx, &["EXISTS", "k"]), Frame::integer(0));
    }

    #[test]
    fn test_expire_on_set_keeps_type() {
        let mut ctx = CommandContext::with_clock(16, Arc::new(ManualClock::new(0)));
        run(&mut ctx, &["SADD", "tags", "x"]);
        run(&mut ctx, &["PEXPIRE", "tags", "100"]);
        assert_eq!(run(&mut ctx, &["SMEMBERS", "tags"]), Frame::bulk_array(["x"]));
        assert_eq!(run(&mut ctx, &["PTTL", "tags"]), Frame::integer(100));
    }
}
