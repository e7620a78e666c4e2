//! Configuration validation
//!
//! Checks a resolved task table before it is cached or executed.

use crate::config::types::{TaskTable, GLOBAL_KEY};
use crate::error::{ConfigError, ConfigResult};
use std::collections::HashSet;

/// Validate a complete task table
pub fn validate_tasks(tasks: &TaskTable) -> ConfigResult<()> {
    for (name, task) in tasks {
        if name.trim().is_empty() {
            return Err(ConfigError::Invalid("task names cannot be empty".to_string()));
        }
        if name == GLOBAL_KEY {
            return Err(ConfigError::Invalid(format!("'{}' is reserved", GLOBAL_KEY)));
        }
        if task.run.iter().any(|cmd| cmd.trim().is_empty()) {
            return Err(ConfigError::Invalid(format!(
                "task '{}' has an empty run command",
                name
            )));
        }
    }

    detect_circular_references(tasks)
}

/// Detect run entries that reference tasks in a cycle
fn detect_circular_references(tasks: &TaskTable) -> ConfigResult<()> {
    let mut names: Vec<&String> = tasks.keys().collect();
    names.sort();

    let mut visited = HashSet::new();
    for task_name in names {
        let mut stack = Vec::new();
        check_task_cycle(tasks, task_name, &mut visited, &mut stack)?;
    }
    Ok(())
}

/// Recursively check for cycles in task references
fn check_task_cycle(
    tasks: &TaskTable,
    task_name: &str,
    visited: &mut HashSet<String>,
    stack: &mut Vec<String>,
) -> ConfigResult<()> {
    if stack.iter().any(|t| t == task_name) {
        stack.push(task_name.to_string());
        return Err(ConfigError::CircularReference(stack.join(" -> ")));
    }

    // Skip if already fully processed
    if visited.contains(task_name) {
        return Ok(());
    }

    let Some(task) = tasks.get(task_name) else {
        return Ok(());
    };

    stack.push(task_name.to_string());

    for cmd in &task.run {
        if tasks.contains_key(cmd) {
            check_task_cycle(tasks, cmd, visited, stack)?;
        }
    }

    stack.pop();
    visited.insert(task_name.to_string());

    Ok(())
}
