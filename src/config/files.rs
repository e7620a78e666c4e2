//! File pattern expansion

use crate::error::{ConfigError, ConfigResult};
use crate::runner::Context;
use std::path::Path;

/// Characters that turn a file entry into a glob pattern
const WILDCARDS: &[char] = &['*', '?', '['];

/// Check whether `pattern` needs glob expansion
pub fn is_glob(pattern: &str) -> bool {
    pattern.contains(WILDCARDS)
}

/// Expand one `files` entry into concrete paths.
///
/// Glob patterns return every on-disk match, which may be none. Literal
/// entries are kept only when they name an existing regular file. Relative
/// patterns are matched against the project root and reported relative to it.
pub fn expand_file_pattern(pattern: &str, ctx: &Context) -> ConfigResult<Vec<String>> {
    if !is_glob(pattern) {
        return Ok(if ctx.resolve(pattern).is_file() {
            vec![pattern.to_string()]
        } else {
            Vec::new()
        });
    }

    let full_pattern = if Path::new(pattern).is_absolute() {
        pattern.to_string()
    } else {
        // the root is a literal path; only the entry itself may carry wildcards
        let root = glob::Pattern::escape(&ctx.working_dir.to_string_lossy());
        Path::new(&root).join(pattern).to_string_lossy().into_owned()
    };

    let entries = glob::glob(&full_pattern).map_err(|e| ConfigError::Pattern {
        pattern: pattern.to_string(),
        error: e.to_string(),
    })?;

    let mut paths = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| ConfigError::Pattern {
            pattern: pattern.to_string(),
            error: e.to_string(),
        })?;
        paths.push(display_path(&path, &ctx.working_dir, Path::new(pattern).is_absolute()));
    }

    Ok(paths)
}

fn display_path(path: &Path, root: &Path, absolute: bool) -> String {
    if absolute {
        return path.to_string_lossy().into_owned();
    }

    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .into_owned()
}
