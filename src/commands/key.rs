//! Key commands (DEL, EXISTS, RENAME, KEYS, TYPE)

use super::{arg, Command, CommandContext, CommandResult};
use crate::aof::AofOperation;
use crate::protocol::Frame;

/// DEL key [key ...]
pub struct DelCommand;

impl Command for DelCommand {
    fn execute(&self, ctx: &mut CommandContext, args: &[Frame]) -> CommandResult {
        let mut deleted = 0;
        for i in 0..args.len() {
            let key = arg(args, i)?;
            if ctx.store.delete(key) {
                ctx.log(AofOperation::Del, key.clone(), vec![]);
                deleted += 1;
            }
        }
        Ok(Frame::integer(deleted))
    }

    fn name(&self) -> &'static str {
        "DEL"
    }

    fn min_args(&self) -> usize {
        1
    }
}

/// EXISTS key [key ...]
pub struct ExistsCommand;

impl Command for ExistsCommand {
    fn execute(&self, ctx: &mut CommandContext, args: &[Frame]) -> CommandResult {
        let mut count = 0;
        for i in 0..args.len() {
            if ctx.store.exists(arg(args, i)?) {
                count += 1;
            }
        }
        Ok(Frame::integer(count))
    }

    fn name(&self) -> &'static str {
        "EXISTS"
    }

    fn min_args(&self) -> usize {
        1
    }
}

/// RENAME old new
///
/// Replaces whatever `new` held. Renaming a missing key does nothing.
pub struct RenameCommand;

impl Command for RenameCommand {
    fn execute(&self, ctx: &mut CommandContext, args: &[Frame]) -> CommandResult {
        let old = arg(args, 0)?;
        let new = arg(args, 1)?;
        if old != new && ctx.store.rename(old, new) {
            ctx.log(AofOperation::Rename, old.clone(), vec![new.clone()]);
        }
        Ok(Frame::ok())
    }

    fn name(&self) -> &'static str {
        "RENAME"
    }

    fn min_args(&self) -> usize {
        2
    }

    fn max_args(&self) -> Option<usize> {
        Some(2)
    }
}

/// KEYS pattern
///
/// `*` matches any run of bytes, `?` exactly one.
pub struct KeysCommand;

impl Command for KeysCommand {
    fn execute(&self, ctx: &mut CommandContext, args: &[Frame]) -> CommandResult {
        let pattern = arg(args, 0)?;
        let mut keys: Vec<_> = ctx
            .store
            .keys()
            .into_iter()
            .filter(|key| glob_match(pattern, key))
            .collect();
        keys.sort();
        Ok(Frame::bulk_array(keys))
    }

    fn name(&self) -> &'static str {
        "KEYS"
    }

    fn min_args(&self) -> usize {
        1
    }

    fn max_args(&self) -> Option<usize> {
        Some(1)
    }
}

/// TYPE key
pub struct TypeCommand;

impl Command for TypeCommand {
    fn execute(&self, ctx: &mut CommandContext, args: &[Frame]) -> CommandResult {
        let name = ctx
            .store
            .get(arg(args, 0)?)
            .map(|value| value.type_name())
            .unwrap_or("none");
        Ok(Frame::simple(name))
    }

    fn name(&self) -> &'static str {
        "TYPE"
    }

    fn min_args(&self) -> usize {
        1
    }

    fn max_args(&self) -> Option<usize> {
        Some(1)
    }
}

/// Glob match with backtracking on the last `*`
pub(crate) fn glob_match(pattern: &[u8], input: &[u8]) -> bool {
    let (mut p, mut s) = (0, 0);
    let mut star: Option<(usize, usize)> = None;

    while s < input.len() {
        match pattern.get(p) {
            Some(b'*') => {
                star = Some((p, s));
                p += 1;
            }
            Some(b'?') => {
                p += 1;
                s += 1;
            }
            Some(c) if *c == input[s] => {
                p += 1;
                s += 1;
            }
            _ => match star {
                Some((sp, ss)) => {
                    p = sp + 1;
                    s = ss + 1;
                    star = Some((sp, ss + 1));
                }
                None => return false,
            },
        }
    }

    pattern[p..].iter().all(|c| *c == b'*')
}
