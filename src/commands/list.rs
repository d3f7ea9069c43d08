//! List commands (LPUSH, RPUSH, RPOP, LREM, LTRIM, LRANGE, LLEN)

use super::{arg, arg_integer, Command, CommandContext, CommandResult};
use crate::aof::AofOperation;
use crate::protocol::Frame;
use bytes::Bytes;
use std::collections::VecDeque;

/// Clamp redis-style inclusive indexes to a `start..end` range
fn index_range(len: usize, start: i64, stop: i64) -> Option<(usize, usize)> {
    let len = len as i64;
    let start = if start < 0 { (start + len).max(0) } else { start };
    let stop = if stop < 0 { stop + len } else { stop.min(len - 1) };
    if len == 0 || start > stop || start >= len {
        return None;
    }
    Some((start as usize, stop as usize + 1))
}

fn push(ctx: &mut CommandContext, args: &[Frame], front: bool) -> CommandResult {
    let key = arg(args, 0)?;
    let values = (1..args.len()).map(|i| arg(args, i).cloned()).collect::<Result<Vec<_>, _>>()?;

    let list = ctx.list_or_create(key)?;
    for value in &values {
        if front {
            list.push_front(value.clone());
        } else {
            list.push_back(value.clone());
        }
    }
    let len = list.len() as i64;

    let op = if front { AofOperation::LPush } else { AofOperation::RPush };
    ctx.log(op, key.clone(), values);
    Ok(Frame::integer(len))
}

/// LPUSH key value [value ...]
pub struct LPushCommand;

impl Command for LPushCommand {
    fn execute(&self, ctx: &mut CommandContext, args: &[Frame]) -> CommandResult {
        push(ctx, args, true)
    }

    fn name(&self) -> &'static str {
        "LPUSH"
    }

    fn min_args(&self) -> usize {
        2
    }
}

/// RPUSH key value [value ...]
pub struct RPushCommand;

impl Command for RPushCommand {
    fn execute(&self, ctx: &mut CommandContext, args: &[Frame]) -> CommandResult {
        push(ctx, args, false)
    }

    fn name(&self) -> &'static str {
        "RPUSH"
    }

    fn min_args(&self) -> usize {
        2
    }
}

/// RPOP key
pub struct RPopCommand;

impl Command for RPopCommand {
    fn execute(&self, ctx: &mut CommandContext, args: &[Frame]) -> CommandResult {
        let key = arg(args, 0)?;
        let popped = match ctx.list_mut(key)? {
            Some(list) => list.pop_back(),
            None => None,
        };
        ctx.store.remove_if_vacant(key);

        match popped {
            Some(value) => {
                ctx.log(AofOperation::RPop, key.clone(), vec![]);
                Ok(Frame::Bulk(value))
            }
            None => Ok(Frame::Null),
        }
    }

    fn name(&self) -> &'static str {
        "RPOP"
    }

    fn min_args(&self) -> usize {
        1
    }

    fn max_args(&self) -> Option<usize> {
        Some(1)
    }
}

/// Remove up to `count` occurrences of `value`: from the head when positive,
/// from the tail when negative, all of them when zero
fn remove_occurrences(list: &mut VecDeque<Bytes>, count: i64, value: &Bytes) -> usize {
    let limit = if count == 0 { usize::MAX } else { count.unsigned_abs() as usize };
    let mut removed = 0;

    if count >= 0 {
        let mut i = 0;
        while i < list.len() && removed < limit {
            if &list[i] == value {
                list.remove(i);
                removed += 1;
            } else {
                i += 1;
            }
        }
    } else {
        let mut i = list.len();
        while i > 0 && removed < limit {
            i -= 1;
            if &list[i] == value {
                list.remove(i);
                removed += 1;
            }
        }
    }
    removed
}

/// LREM key count value
pub struct LRemCommand;

impl Command for LRemCommand {
    fn execute(&self, ctx: &mut CommandContext, args: &[Frame]) -> CommandResult {
        let key = arg(args, 0)?;
        let count = arg_integer(args, 1)?;
        let value = arg(args, 2)?;

        let removed = match ctx.list_mut(key)? {
            Some(list) => remove_occurrences(list, count, value),
            None => 0,
        };
        ctx.store.remove_if_vacant(key);

        if removed > 0 {
            ctx.log(
                AofOperation::LRem,
                key.clone(),
                vec![Bytes::from(count.to_string()), value.clone()],
            );
        }
        Ok(Frame::integer(removed as i64))
    }

    fn name(&self) -> &'static str {
        "LREM"
    }

    fn min_args(&self) -> usize {
        3
    }

    fn max_args(&self) -> Option<usize> {
        Some(3)
    }
}

/// LTRIM key start stop
pub struct LTrimCommand;

impl Command for LTrimCommand {
    fn execute(&self, ctx: &mut CommandContext, args: &[Frame]) -> CommandResult {
        let key = arg(args, 0)?;
        let start = arg_integer(args, 1)?;
        let stop = arg_integer(args, 2)?;

        let Some(list) = ctx.list_mut(key)? else {
            return Ok(Frame::ok());
        };
        match index_range(list.len(), start, stop) {
            Some((from, to)) => {
                list.truncate(to);
                list.drain(..from);
            }
            None => list.clear(),
        }
        ctx.store.remove_if_vacant(key);

        ctx.log(
            AofOperation::LTrim,
            key.clone(),
            vec![Bytes::from(start.to_string()), Bytes::from(stop.to_string())],
        );
        Ok(Frame::ok())
    }

    fn name(&self) -> &'static str {
        "LTRIM"
    }

    fn min_args(&self) -> usize {
        3
    }

    fn max_args(&self) -> Option<usize> {
        Some(3)
    }
}

/// LRANGE key start stop
pub struct LRangeCommand;

impl Command for LRangeCommand {
    fn execute(&self, ctx: &mut CommandContext, args: &[Frame]) -> CommandResult {
        let key = arg(args, 0)?;
        let start = arg_integer(args, 1)?;
        let stop = arg_integer(args, 2)?;

        let items: Vec<Bytes> = match ctx.list(key)? {
            Some(list) => match index_range(list.len(), start, stop) {
                Some((from, to)) => list.range(from..to).cloned().collect(),
                None => Vec::new(),
            },
            None => Vec::new(),
        };
        Ok(Frame::bulk_array(items))
    }

    fn name(&self) -> &'static str {
        "LRANGE"
    }

    fn min_args(&self) -> usize {
        3
    }

    fn max_args(&self) -> Option<usize> {
        Some(3)
    }
}

/// LLEN key
pub struct LLenCommand;

impl Command for LLenCommand {
    fn execute(&self, ctx: &mut CommandContext, args: &[Frame]) -> CommandResult {
        let n = ctx.list(arg(args, 0)?)?.map(|list| list.len()).unwrap_or(0);
        Ok(Frame::integer(n as i64))
    }

    fn name(&self) -> &'static str {
        "LLEN"
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
    use crate::commands::CommandRegistry;

    fn run(ctx: &mut CommandContext, parts: &[&str]) -> Frame {
        CommandRegistry::new().execute(ctx, &Frame::command(parts[0], parts[1..].iter().map(|p| p.to_string())))
    }

    #[test]
    fn test_push_order() {
        let mut ctx = CommandContext::new();
        assert_eq!(run(&mut ctx, &["RPUSH", "l", "b", "c"]), Frame::integer(2));
        assert_eq!(run(&mut ctx, &["LPUSH", "l", "a", "z"]), Frame::integer(4));
        assert_eq!(run(&mut ctx, &["LRANGE", "l", "0", "-1"]), Frame::bulk_array(["z", "a", "b", "c"]));
        assert_eq!(run(&mut ctx, &["LLEN", "l"]), Frame::integer(4));
    }

    #[test]
    fn test_rpop_until_empty() {
        let mut ctx = CommandContext::new();
        run(&mut ctx, &["RPUSH", "l", "a"]);
        assert_eq!(run(&mut ctx, &["RPOP", "l"]), Frame::bulk("a"));
        assert_eq!(run(&mut ctx, &["RPOP", "l"]), Frame::Null);
        assert_eq!(run(&mut ctx, &["EXISTS", "l"]), Frame::integer(0));
    }

    #[test]
    fn test_lrem_directions() {
        let mut ctx = CommandContext::new();
        run(&mut ctx, &["RPUSH", "l", "x", "a", "x", "b", "x"]);
        assert_eq!(run(&mut ctx, &["LREM", "l", "1", "x"]), Frame::integer(1));
        assert_eq!(run(&mut ctx, &["LRANGE", "l", "0", "-1"]), Frame::bulk_array(["a", "x", "b", "x"]));
        assert_eq!(run(&mut ctx, &["LREM", "l", "-1", "x"]), Frame::integer(1));
        assert_eq!(run(&mut ctx, &["LRANGE", "l", "0", "-1"]), Frame::bulk_array(["a", "x", "b"]));
        assert_eq!(run(&mut ctx, &["LREM", "l", "0", "x"]), Frame::integer(1));
    }

    #[test]
    fn test_ltrim() {
        let mut ctx = CommandContext::new();
        run(&mut ctx, &["RPUSH", "l", "a", "b", "c", "d"]);
        assert_eq!(run(&mut ctx, &["LTRIM", "l", "1", "-2"]), Frame::ok());
        assert_eq!(run(&mut ctx, &["LRANGE", "l", "0", "-1"]), Frame::bulk_array(["b", "c"]));
        run(&mut ctx, &["LTRIM", "l", "5", "10"]);
        assert_eq!(run(&mut ctx, &["EXISTS", "l"]), Frame::integer(0));
    }
}
