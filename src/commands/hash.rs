//! Object commands (HSET, HGET, HMGET, HGETALL, HDEL, HKEYS, HVALS, HEXISTS, HINCRBY)

use super::{arg, arg_integer, parse_integer, Command, CommandContext, CommandError, CommandResult};
use crate::aof::AofOperation;
use crate::protocol::Frame;
use crate::store::ObjectMap;
use bytes::Bytes;

/// Add `by` to an integer field (missing counts as 0), logging the result
pub(super) fn increment_field(
    ctx: &mut CommandContext,
    key: &Bytes,
    field: Bytes,
    by: i64,
) -> Result<i64, CommandError> {
    let hash = ctx.hash_or_create(key)?;
    let current = match hash.get(&field) {
        Some(raw) => parse_integer(raw)?,
        None => 0,
    };
    let next = current.checked_add(by).ok_or(CommandError::Overflow)?;
    let encoded = Bytes::from(next.to_string());
    hash.insert(field.clone(), encoded.clone());

    ctx.log(AofOperation::HSet, key.clone(), vec![field, encoded]);
    Ok(next)
}

/// Fields in byte order, for stable replies
fn sorted_fields(hash: &ObjectMap) -> Vec<(&Bytes, &Bytes)> {
    let mut fields: Vec<_> = hash.iter().collect();
    fields.sort_by(|a, b| a.0.cmp(b.0));
    fields
}

/// HSET key field value [field value ...]
pub struct HSetCommand;

impl Command for HSetCommand {
    fn execute(&self, ctx: &mut CommandContext, args: &[Frame]) -> CommandResult {
        if (args.len() - 1) % 2 != 0 {
            return Err(CommandError::WrongArity("hset".to_string()));
        }
        let key = arg(args, 0)?;

        let mut pairs = Vec::with_capacity(args.len() - 1);
        for i in (1..args.len()).step_by(2) {
            pairs.push((arg(args, i)?.clone(), arg(args, i + 1)?.clone()));
        }

        let hash = ctx.hash_or_create(key)?;
        let mut added = 0;
        for (field, value) in &pairs {
            if hash.insert(field.clone(), value.clone()).is_none() {
                added += 1;
            }
        }

        let payload = pairs.into_iter().flat_map(|(f, v)| [f, v]).collect();
        ctx.log(AofOperation::HSet, key.clone(), payload);
        Ok(Frame::integer(added))
    }

    fn name(&self) -> &'static str {
        "HSET"
    }

    fn min_args(&self) -> usize {
        3
    }
}

/// HGET key field
pub struct HGetCommand;

impl Command for HGetCommand {
    fn execute(&self, ctx: &mut CommandContext, args: &[Frame]) -> CommandResult {
        let field = arg(args, 1)?;
        let value = ctx.hash(arg(args, 0)?)?.and_then(|hash| hash.get(field)).cloned();
        Ok(value.map(Frame::Bulk).unwrap_or(Frame::Null))
    }

    fn name(&self) -> &'static str {
        "HGET"
    }

    fn min_args(&self) -> usize {
        2
    }

    fn max_args(&self) -> Option<usize> {
        Some(2)
    }
}

/// HMGET key field [field ...]
pub struct HMGetCommand;

impl Command for HMGetCommand {
    fn execute(&self, ctx: &mut CommandContext, args: &[Frame]) -> CommandResult {
        let key = arg(args, 0)?;
        let fields = (1..args.len()).map(|i| arg(args, i)).collect::<Result<Vec<_>, _>>()?;
        let hash = ctx.hash(key)?;

        let values = fields
            .into_iter()
            .map(|field| match hash.and_then(|h| h.get(field)) {
                Some(value) => Frame::Bulk(value.clone()),
                None => Frame::Null,
            })
            .collect();
        Ok(Frame::Array(values))
    }

    fn name(&self) -> &'static str {
        "HMGET"
    }

    fn min_args(&self) -> usize {
        2
    }
}

/// HGETALL key
pub struct HGetAllCommand;

impl Command for HGetAllCommand {
    fn execute(&self, ctx: &mut CommandContext, args: &[Frame]) -> CommandResult {
        let Some(hash) = ctx.hash(arg(args, 0)?)? else {
            return Ok(Frame::Array(vec![]));
        };
        let mut out = Vec::with_capacity(hash.len() * 2);
        for (field, value) in sorted_fields(hash) {
            out.push(Frame::Bulk(field.clone()));
            out.push(Frame::Bulk(value.clone()));
        }
        Ok(Frame::Array(out))
    }

    fn name(&self) -> &'static str {
        "HGETALL"
    }

    fn min_args(&self) -> usize {
        1
    }

    fn max_args(&self) -> Option<usize> {
        Some(1)
    }
}

/// HDEL key field [field ...]
///
/// Removing the last field leaves an empty object behind.
pub struct HDelCommand;

impl Command for HDelCommand {
    fn execute(&self, ctx: &mut CommandContext, args: &[Frame]) -> CommandResult {
        let key = arg(args, 0)?;
        let fields = (1..args.len()).map(|i| arg(args, i)).collect::<Result<Vec<_>, _>>()?;

        let Some(hash) = ctx.hash_mut(key)? else {
            return Ok(Frame::integer(0));
        };
        let removed: Vec<Bytes> = fields
            .into_iter()
            .filter(|field| hash.remove(*field).is_some())
            .cloned()
            .collect();

        let count = removed.len() as i64;
        if !removed.is_empty() {
            ctx.log(AofOperation::HDel, key.clone(), removed);
        }
        Ok(Frame::integer(count))
    }

    fn name(&self) -> &'static str {
        "HDEL"
    }

    fn min_args(&self) -> usize {
        2
    }
}

/// HKEYS key
pub struct HKeysCommand;

impl Command for HKeysCommand {
    fn execute(&self, ctx: &mut CommandContext, args: &[Frame]) -> CommandResult {
        let fields: Vec<Bytes> = ctx
            .hash(arg(args, 0)?)?
            .map(|hash| sorted_fields(hash).into_iter().map(|(f, _)| f.clone()).collect())
            .unwrap_or_else(Vec::new);
        Ok(Frame::bulk_array(fields))
    }

    fn name(&self) -> &'static str {
        "HKEYS"
    }

    fn min_args(&self) -> usize {
        1
    }

    fn max_args(&self) -> Option<usize> {
        Some(1)
    }
}

/// HVALS key
///
/// Values follow the field order of HKEYS.
pub struct HValsCommand;

impl Command for HValsCommand {
    fn execute(&self, ctx: &mut CommandContext, args: &[Frame]) -> CommandResult {
        let values: Vec<Bytes> = ctx
            .hash(arg(args, 0)?)?
            .map(|hash| sorted_fields(hash).into_iter().map(|(_, v)| v.clone()).collect())
            .unwrap_or_else(Vec::new);
        Ok(Frame::bulk_array(values))
    }

    fn name(&self) -> &'static str {
        "HVALS"
    }

    fn min_args(&self) -> usize {
        1
    }

    fn max_args(&self) -> Option<usize> {
        Some(1)
    }
}

/// HEXISTS key field
pub struct HExistsCommand;

impl Command for HExistsCommand {
    fn execute(&self, ctx: &mut CommandContext, args: &[Frame]) -> CommandResult {
        let field = arg(args, 1)?;
        let found = ctx
            .hash(arg(args, 0)?)?
            .map(|hash| hash.contains_key(field))
            .unwrap_or(false);
        Ok(Frame::integer(found as i64))
    }

    fn name(&self) -> &'static str {
        "HEXISTS"
    }

    fn min_args(&self) -> usize {
        2
    }

    fn max_args(&self) -> Option<usize> {
        Some(2)
    }
}

/// HINCRBY key field increment
pub struct HIncrByCommand;

impl Command for HIncrByCommand {
    fn execute(&self, ctx: &mut CommandContext, args: &[Frame]) -> CommandResult {
        let key = arg(args, 0)?;
        let field = arg(args, 1)?.clone();
        let by = arg_integer(args, 2)?;
        Ok(Frame::integer(increment_field(ctx, key, field, by)?))
    }

    fn name(&self) -> &'static str {
        "HINCRBY"
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

    #[test]
    fn test_hset_counts_new_fields() {
        let mut ctx = CommandContext::new();
        assert_eq!(run(&mut ctx, &["HSET", "user:1", "name", "alice", "age", "30"]), Frame::integer(2));
        assert_eq!(run(&mut ctx, &["HSET", "user:1", "age", "31"]), Frame::integer(0));
        assert_eq!(run(&mut ctx, &["HGET", "user:1", "age"]), Frame::bulk("31"));
        assert_eq!(run(&mut ctx, &["HGET", "user:1", "missing"]), Frame::Null);
        assert_eq!(run(&mut ctx, &["HGET", "user:2", "age"]), Frame::Null);
    }

    #[test]
    fn test_hset_odd_pairs() {
        let mut ctx = CommandContext::new();
        assert!(run(&mut ctx, &["HSET", "k", "a", "1", "b"]).is_error());
        assert_eq!(run(&mut ctx, &["EXISTS", "k"]), Frame::integer(0));
    }

    #[test]
    fn test_hgetall_keys_vals_in_field_order() {
        let mut ctx = CommandContext::new();
        run(&mut ctx, &["HSET", "k", "b", "2", "a", "1"]);
        assert_eq!(run(&mut ctx, &["HGETALL", "k"]), Frame::bulk_array(["a", "1", "b", "2"]));
        assert_eq!(run(&mut ctx, &["HKEYS", "k"]), Frame::bulk_array(["a", "b"]));
        assert_eq!(run(&mut ctx, &["HVALS", "k"]), Frame::bulk_array(["1", "2"]));
        assert_eq!(
            run(&mut ctx, &["HMGET", "k", "b", "zz"]),
            Frame::Array(vec![Frame::bulk("2"), Frame::Null])
        );
        assert_eq!(run(&mut ctx, &["HGETALL", "missing"]), Frame::Array(vec![]));
    }

    #[test]
    fn test_hdel_keeps_empty_object() {
        let mut ctx = CommandContext::new();
        run(&mut ctx, &["HSET", "k", "a", "1"]);
        assert_eq!(run(&mut ctx, &["HDEL", "k", "a", "b"]), Frame::integer(1));
        assert_eq!(run(&mut ctx, &["EXISTS", "k"]), Frame::integer(1));
        assert_eq!(run(&mut ctx, &["HEXISTS", "k", "a"]), Frame::integer(0));
        assert_eq!(run(&mut ctx, &["HDEL", "missing", "a"]), Frame::integer(0));
    }

    #[test]
    fn test_hincrby() {
        let mut ctx = CommandContext::new();
        assert_eq!(run(&mut ctx, &["HINCRBY", "topic:1", "postcount", "5"]), Frame::integer(5));
        assert_eq!(run(&mut ctx, &["HINCRBY", "topic:1", "postcount", "-2"]), Frame::integer(3));
        assert!(run(&mut ctx, &["HINCRBY", "topic:1", "postcount", "x"]).is_error());
    }

    #[test]
    fn test_wrong_type_never_mutates() {
        let mut ctx = CommandContext::new();
        run(&mut ctx, &["ZADD", "z", "1", "a"]);
        assert_eq!(run(&mut ctx, &["HSET", "z", "f", "v"]), Frame::wrong_type());
        assert_eq!(run(&mut ctx, &["HINCRBY", "z", "f", "1"]), Frame::wrong_type());
        assert_eq!(run(&mut ctx, &["TYPE", "z"]), Frame::simple("zset"));
    }
}
