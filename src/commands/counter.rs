//! Counters on the `value` field (INCR, INCRBY, DECR, DECRBY)

use super::hash::increment_field;
use super::value::value_field;
use super::{arg, arg_integer, Command, CommandContext, CommandError, CommandResult};
use crate::protocol::Frame;

fn increment(ctx: &mut CommandContext, args: &[Frame], by: i64) -> CommandResult {
    let key = arg(args, 0)?;
    let n = increment_field(ctx, key, value_field(), by)?;
    Ok(Frame::integer(n))
}

/// INCR key
pub struct IncrCommand;

impl Command for IncrCommand {
    fn execute(&self, ctx: &mut CommandContext, args: &[Frame]) -> CommandResult {
        increment(ctx, args, 1)
    }

    fn name(&self) -> &'static str {
        "INCR"
    }

    fn min_args(&self) -> usize {
        1
    }

    fn max_args(&self) -> Option<usize> {
        Some(1)
    }
}

/// INCRBY key increment
pub struct IncrByCommand;

impl Command for IncrByCommand {
    fn execute(&self, ctx: &mut CommandContext, args: &[Frame]) -> CommandResult {
        let by = arg_integer(args, 1)?;
        increment(ctx, args, by)
    }

    fn name(&self) -> &'static str {
        "INCRBY"
    }

    fn min_args(&self) -> usize {
        2
    }

    fn max_args(&self) -> Option<usize> {
        Some(2)
    }
}

/// DECR key
pub struct DecrCommand;

impl Command for DecrCommand {
    fn execute(&self, ctx: &mut CommandContext, args: &[Frame]) -> CommandResult {
        increment(ctx, args, -1)
    }

    fn name(&self) -> &'static str {
        "DECR"
    }

    fn min_args(&self) -> usize {
        1
    }

    fn max_args(&self) -> Option<usize> {
        Some(1)
    }
}

/// DECRBY key decrement
pub struct DecrByCommand;

impl Command for DecrByCommand {
    fn execute(&self, ctx: &mut CommandContext, args: &[Frame]) -> CommandResult {
        let by = arg_integer(args, 1)?.checked_neg().ok_or(CommandError::Overflow)?;
        increment(ctx, args, by)
    }

    fn name(&self) -> &'static str {
        "DECRBY"
    }

    fn min_args(&self) -> usize {
        2
    }

    fn max_args(&self) -> Option<usize> {
        Some(2)
    }
}
