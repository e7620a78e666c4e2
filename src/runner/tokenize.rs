//! Command line tokenizer
//!
//! Splits a shell-like command string into an argument vector. No expansion
//! happens here; placeholders are resolved before a command is tokenized.

use crate::error::{ExecutionError, ExecutionResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Start,
    Arg,
    Quoted(char),
}

/// Split `command` into arguments.
///
/// Whitespace separates arguments unless quoted. Single and double quotes
/// delimit literal content and may not nest. Outside quotes a backslash makes
/// the next character literal. A closing quote emits the accumulated argument
/// even when it is empty, so `""` yields an empty argument.
pub fn tokenize(command: &str) -> ExecutionResult<Vec<String>> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut state = State::Start;
    let mut escape_next = false;

    for c in command.chars() {
        if let State::Quoted(quote) = state {
            if c == quote {
                args.push(std::mem::take(&mut current));
                state = State::Start;
            } else {
                current.push(c);
            }
            continue;
        }

        if escape_next {
            current.push(c);
            escape_next = false;
            state = State::Arg;
            continue;
        }

        match c {
            '\\' => escape_next = true,
            '"' | '\'' => state = State::Quoted(c),
            c if c.is_whitespace() => {
                if state == State::Arg {
                    args.push(std::mem::take(&mut current));
                    state = State::Start;
                }
            }
            c => {
                current.push(c);
                state = State::Arg;
            }
        }
    }

    if matches!(state, State::Quoted(_)) {
        return Err(ExecutionError::MalformedCommand(command.to_string()));
    }

    if !current.is_empty() {
        args.push(current);
    }

    Ok(args)
}
