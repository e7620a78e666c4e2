//! Common test utilities

#![allow(dead_code)]

use kick::config::Parser;
use kick::lockfile::Lockfile;
use kick::runner::{Context, Executor, ExecutorOptions, Verbosity};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Create a temporary project directory with a kick.yml file
pub fn create_test_config(content: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("kick.yml");
    fs::write(&config_path, content).unwrap();
    (temp_dir, config_path)
}

/// Write `files` (relative paths) into `dir`, each containing its own name
pub fn write_files(dir: &Path, files: &[&str]) {
    for file in files {
        let path = dir.join(file);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, *file).unwrap();
    }
}

/// Quiet context rooted at `dir`
pub fn quiet_context(dir: &Path) -> Context {
    Context::new()
        .with_working_dir(dir.to_path_buf())
        .with_verbosity(Verbosity::Quiet)
}

/// Parse `yaml` for the project in `dir` and build an executor whose lockfile
/// lives inside `dir`
pub fn executor_for(dir: &Path, yaml: &str, options: ExecutorOptions) -> Executor {
    let mut ctx = quiet_context(dir);
    let parser = Parser::parse(yaml, &mut ctx).unwrap();
    let lockfile = Lockfile::new(dir.join(".kick-lock.yml"), "-test-project", dir.to_path_buf());
    Executor::new(parser, lockfile, ctx, options)
}

/// Lines appended to `order.log` by test commands
pub fn read_log(dir: &Path) -> Vec<String> {
    fs::read_to_string(dir.join("order.log"))
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}
