//! Single-value wrappers (SET, GET)
//!
//! A "plain" value is an object with one field, `value`. Other fields of
//! the object are left alone.

use super::{arg, Command, CommandContext, CommandResult};
use crate::aof::AofOperation;
use crate::protocol::Frame;
use crate::store::VALUE_FIELD;
use bytes::Bytes;

pub(crate) fn value_field() -> Bytes {
    Bytes::from_static(VALUE_FIELD.as_bytes())
}

/// SET key value
pub struct SetCommand;

impl Command for SetCommand {
    fn execute(&self, ctx: &mut CommandContext, args: &[Frame]) -> CommandResult {
        let key = arg(args, 0)?;
        let value = arg(args, 1)?.clone();

        ctx.hash_or_create(key)?.insert(value_field(), value.clone());
        ctx.log(AofOperation::HSet, key.clone(), vec![value_field(), value]);
        Ok(Frame::ok())
    }

    fn name(&self) -> &'static str {
        "SET"
    }

    fn min_args(&self) -> usize {
        2
    }

    fn max_args(&self) -> Option<usize> {
        Some(2)
    }
}

/// GET key
pub struct GetCommand;

impl Command for GetCommand {
    fn execute(&self, ctx: &mut CommandContext, args: &[Frame]) -> CommandResult {
        let value = ctx
            .hash(arg(args, 0)?)?
            .and_then(|hash| hash.get(VALUE_FIELD.as_bytes()))
            .cloned();
        Ok(value.map(Frame::Bulk).unwrap_or(Frame::Null))
    }

    fn name(&self) -> &'static str {
        "GET"
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
    fn test_set_get() {
        let mut ctx = CommandContext::new();
        assert_eq!(run(&mut ctx, &["GET", "k"]), Frame::Null);
        assert_eq!(run(&mut ctx, &["SET", "k", "v1"]), Frame::ok());
        assert_eq!(run(&mut ctx, &["SET", "k", "v2"]), Frame::ok());
        assert_eq!(run(&mut ctx, &["GET", "k"]), Frame::bulk("v2"));
        assert_eq!(run(&mut ctx, &["HGET", "k", "value"]), Frame::bulk("v2"));
    }

    #[test]
    fn test_set_keeps_other_fields() {
        let mut ctx = CommandContext::new();
        run(&mut ctx, &["HSET", "k", "other", "1"]);
        run(&mut ctx, &["SET", "k", "v"]);
        assert_eq!(run(&mut ctx, &["HGET", "k", "other"]), Frame::bulk("1"));
    }

    #[test]
    fn test_wrong_type() {
        let mut ctx = CommandContext::new();
        run(&mut ctx, &["SADD", "s", "x"]);
        assert_eq!(run(&mut ctx, &["SET", "s", "v"]), Frame::wrong_type());
        assert_eq!(run(&mut ctx, &["GET", "s"]), Frame::wrong_type());
        assert_eq!(run(&mut ctx, &["SCARD", "s"]), Frame::integer(1));
    }
}
