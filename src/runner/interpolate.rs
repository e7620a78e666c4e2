//! Placeholder substitution for strings
//!
//! Supported placeholders:
//! - `$(command)` - replaced by the trimmed stdout of running `command`.
//!   Parentheses nest, and quoted parentheses do not close the command.
//! - `${NAME}` and `$NAME` - replaced by the variable's value from the
//!   context or the process environment
//!
//! Substitution is a single left-to-right pass, so text produced by a
//! command is never expanded again.

use crate::error::{ConfigError, Result};
use crate::runner::{capture, Context};
use regex::{Captures, Regex};
use std::sync::OnceLock;
use tracing::debug;

const PLACEHOLDER_PATTERN: &str = r"\$\(|\$\{[A-Za-z_][A-Za-z0-9_]*\}|\$[A-Za-z_]";

const ENV_PATTERN: &str = r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}|\$([A-Za-z_][A-Za-z0-9_]*)";

/// What to do with a variable that has no value yet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Undefined {
    Empty,
    Keep,
}

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(PLACEHOLDER_PATTERN).expect("placeholder pattern is valid"))
}

fn env_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(ENV_PATTERN).expect("environment pattern is valid"))
}

fn leading_env_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!("^(?:{})", ENV_PATTERN)).expect("environment pattern is valid")
    })
}

/// Resolve every placeholder in `s`, running `$(...)` commands through the OS.
/// Undefined variables become empty.
pub fn interpolate(s: &str, ctx: &Context) -> Result<String> {
    substitute(s, ctx, Undefined::Empty)
}

/// Like `interpolate`, but references to variables that are not defined yet
/// are left in place so they can be expanded when the command runs
pub fn interpolate_deferred(s: &str, ctx: &Context) -> Result<String> {
    substitute(s, ctx, Undefined::Keep)
}

/// Expand `$NAME` and `${NAME}` references only, leaving `$(...)` untouched
pub fn expand_env(s: &str, ctx: &Context) -> String {
    env_regex()
        .replace_all(s, |caps: &Captures| {
            variable_value(caps, ctx).unwrap_or_default()
        })
        .into_owned()
}

/// Check whether `s` contains any placeholder at all
pub fn has_placeholders(s: &str) -> bool {
    placeholder_regex().is_match(s)
}

fn substitute(s: &str, ctx: &Context, undefined: Undefined) -> Result<String> {
    if !has_placeholders(s) {
        return Ok(s.to_string());
    }

    let mut result = String::with_capacity(s.len());
    let mut rest = s;

    while let Some(pos) = rest.find('$') {
        result.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        if let Some(body) = tail.strip_prefix("$(") {
            if let Some(end) = command_end(body) {
                result.push_str(&run_substitution(&body[..end], ctx)?);
                rest = &body[end + 1..];
                continue;
            }
        } else if let Some(caps) = leading_env_regex().captures(tail) {
            let whole = caps.get(0).map_or("", |m| m.as_str());
            match variable_value(&caps, ctx) {
                Some(value) => result.push_str(&value),
                None if undefined == Undefined::Keep => result.push_str(whole),
                None => {}
            }
            rest = &tail[whole.len()..];
            continue;
        }

        // a lone or unterminated `$` is literal
        result.push('$');
        rest = &tail[1..];
    }

    result.push_str(rest);
    Ok(result)
}

/// Byte offset of the `)` closing a `$(` whose body starts `body`
fn command_end(body: &str) -> Option<usize> {
    let mut depth = 1usize;
    let mut quote = None;

    for (i, c) in body.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }

    None
}

fn run_substitution(command: &str, ctx: &Context) -> Result<String> {
    let expanded = expand_env(command, ctx);
    debug!(command = %expanded, "running substitution");

    capture(&expanded, ctx).map_err(|e| {
        ConfigError::Substitution {
            command: command.to_string(),
            source: Box::new(e),
        }
        .into()
    })
}

// Group 1 is the braced form, group 2 the bare form.
fn variable_value(caps: &Captures, ctx: &Context) -> Option<String> {
    let name = caps.get(1).or_else(|| caps.get(2))?.as_str();
    ctx.lookup(name)
}
