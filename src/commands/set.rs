//! Set commands (SADD, SREM, SISMEMBER, SMEMBERS, SCARD)

use super::{arg, Command, CommandContext, CommandResult};
use crate::aof::AofOperation;
use crate::protocol::Frame;
use bytes::Bytes;

/// SADD key member [member ...]
pub struct SAddCommand;

impl Command for SAddCommand {
    fn execute(&self, ctx: &mut CommandContext, args: &[Frame]) -> CommandResult {
        let key = arg(args, 0)?;
        let members = (1..args.len()).map(|i| arg(args, i)).collect::<Result<Vec<_>, _>>()?;

        let set = ctx.set_or_create(key)?;
        let added: Vec<Bytes> = members
            .into_iter()
            .filter(|member| set.insert((*member).clone()))
            .cloned()
            .collect();

        let count = added.len() as i64;
        if !added.is_empty() {
            ctx.log(AofOperation::SAdd, key.clone(), added);
        }
        Ok(Frame::integer(count))
    }

    fn name(&self) -> &'static str {
        "SADD"
    }

    fn min_args(&self) -> usize {
        2
    }
}

/// SREM key member [member ...]
pub struct SRemCommand;

impl Command for SRemCommand {
    fn execute(&self, ctx: &mut CommandContext, args: &[Frame]) -> CommandResult {
        let key = arg(args, 0)?;
        let members = (1..args.len()).map(|i| arg(args, i)).collect::<Result<Vec<_>, _>>()?;

        let Some(set) = ctx.set_mut(key)? else {
            return Ok(Frame::integer(0));
        };
        let removed: Vec<Bytes> = members
            .into_iter()
            .filter(|member| set.remove(*member))
            .cloned()
            .collect();
        ctx.store.remove_if_vacant(key);

        let count = removed.len() as i64;
        if !removed.is_empty() {
            ctx.log(AofOperation::SRem, key.clone(), removed);
        }
        Ok(Frame::integer(count))
    }

    fn name(&self) -> &'static str {
        "SREM"
    }

    fn min_args(&self) -> usize {
        2
    }
}

/// SISMEMBER key member
pub struct SIsMemberCommand;

impl Command for SIsMemberCommand {
    fn execute(&self, ctx: &mut CommandContext, args: &[Frame]) -> CommandResult {
        let member = arg(args, 1)?;
        let found = ctx.set(arg(args, 0)?)?.map(|set| set.contains(member)).unwrap_or(false);
        Ok(Frame::integer(found as i64))
    }

    fn name(&self) -> &'static str {
        "SISMEMBER"
    }

    fn min_args(&self) -> usize {
        2
    }

    fn max_args(&self) -> Option<usize> {
        Some(2)
    }
}

/// SMEMBERS key
///
/// Members come back in byte order.
pub struct SMembersCommand;

impl Command for SMembersCommand {
    fn execute(&self, ctx: &mut CommandContext, args: &[Frame]) -> CommandResult {
        let mut members: Vec<Bytes> = ctx
            .set(arg(args, 0)?)?
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default();
        members.sort();
        Ok(Frame::bulk_array(members))
    }

    fn name(&self) -> &'static str {
        "SMEMBERS"
    }

    fn min_args(&self) -> usize {
        1
    }

    fn max_args(&self) -> Option<usize> {
        Some(1)
    }
}

/// SCARD key
pub struct SCardCommand;

impl Command for SCardCommand {
    fn execute(&self, ctx: &mut CommandContext, args: &[Frame]) -> CommandResult {
        let n = ctx.set(arg(args, 0)?)?.map(|set| set.len()).unwrap_or(0);
        Ok(Frame::integer(n as i64))
    }

    fn name(&self) -> &'static str {
        "SCARD"
    }

    fn min_args(&self) -> usize {
        1
    }

    fn max_args(&self) -> Option<usize> {
        Some(1)
    }
}
