//! Config parser
//!
//! Turns a kick.yml document into the resolved task table. The `global`
//! section is handled first so its exported variables are visible while
//! tasks are resolved. A valid snapshot from a previous run replaces the
//! whole parse, including every substitution command, every variable export
//! and every glob.
//!
//! Variables that are still undefined when a `run` entry is resolved stay in
//! the command text and are expanded when the command runs.

use crate::config::files::expand_file_pattern;
use crate::config::schema::validate_tasks;
use crate::config::snapshot::{ParserCache, Snapshot};
use crate::config::types::{
    scalar_to_string, Global, RawGlobal, RawTask, Task, TaskTable, GLOBAL_KEY,
};
use crate::config::parse::read_config;
use crate::error::{ConfigError, ConfigResult, Result};
use crate::runner::{interpolate, interpolate_deferred, Context};
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, warn};

/// Token replaced by a task's expanded file list inside `run` entries
pub const FILES_TOKEN: &str = "{FILES}";

/// Options that influence parser construction
#[derive(Debug, Clone, Copy, Default)]
pub struct ParserOptions {
    /// Suppress diagnostics; cache write failures become non-fatal
    pub quiet: bool,

    /// Drop any existing snapshot before loading
    pub clear_cache: bool,
}

/// Resolved configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parser {
    pub tasks: TaskTable,
    pub global: Global,

    /// Every expanded file path across all tasks
    pub file_paths: Vec<String>,

    from_cache: bool,
}

impl Parser {
    /// Load from the snapshot cache, or parse `config_path` and cache the result
    pub fn load(
        config_path: &Path,
        ctx: &mut Context,
        options: ParserOptions,
        cache: &ParserCache,
    ) -> Result<Self> {
        if let Err(e) = cache.prepare(config_path, options.clear_cache) {
            warn!(error = %e, "could not invalidate parser cache");
        }

        if let Some(snapshot) = cache.load() {
            debug!(cache = %cache.path().display(), "using cached parse result");
            return Ok(Parser::from_snapshot(snapshot));
        }

        let text = read_config(config_path)?;
        let parser = Parser::parse(&text, ctx)?;

        if let Err(e) = cache.store(&parser.snapshot()) {
            if !options.quiet {
                return Err(e.into());
            }
            warn!(error = %e, "could not write parser cache");
        }

        Ok(parser)
    }

    /// Parse a document, running substitutions and exporting into `ctx`
    pub fn parse(text: &str, ctx: &mut Context) -> Result<Self> {
        let document = parse_document(text)?;

        let global = parse_global(&document, ctx)?;
        let (tasks, file_paths) = parse_tasks(&document, ctx)?;
        validate_tasks(&tasks)?;

        Ok(Parser {
            tasks,
            global,
            file_paths,
            from_cache: false,
        })
    }

    /// Rebuild parser state from a snapshot
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        Parser {
            tasks: snapshot.tasks,
            global: snapshot.global,
            file_paths: snapshot.file_paths,
            from_cache: true,
        }
    }

    /// Capture the parser state for caching
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::new(
            self.tasks.clone(),
            self.global.clone(),
            self.file_paths.clone(),
        )
    }

    /// Whether this state came from the snapshot cache
    pub fn from_cache(&self) -> bool {
        self.from_cache
    }

    /// Look a task up by name
    pub fn task(&self, name: &str) -> ConfigResult<&Task> {
        self.tasks
            .get(name)
            .ok_or_else(|| ConfigError::TaskNotFound(name.to_string()))
    }

    /// Sorted task names
    pub fn task_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tasks.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

fn parse_document(text: &str) -> ConfigResult<Mapping> {
    match serde_yaml::from_str::<Value>(text)? {
        Value::Mapping(mapping) => Ok(mapping),
        Value::Null => Ok(Mapping::new()),
        _ => Err(ConfigError::Invalid(
            "the document must be a mapping of task names".to_string(),
        )),
    }
}

/// Resolve the `global` section and export its environment
fn parse_global(document: &Mapping, ctx: &mut Context) -> Result<Global> {
    let raw: RawGlobal = match document.get(GLOBAL_KEY) {
        Some(value) => serde_yaml::from_value(value.clone()).map_err(|error| {
            ConfigError::TaskSyntax {
                task: GLOBAL_KEY.to_string(),
                error,
            }
        })?,
        None => RawGlobal::default(),
    };

    let environment = resolve_env(&raw.environment, ctx)?;

    Ok(Global {
        environment,
        events: raw.events,
    })
}

/// Resolve every task, returning the table and all expanded paths
fn parse_tasks(document: &Mapping, ctx: &mut Context) -> Result<(TaskTable, Vec<String>)> {
    let mut tasks = TaskTable::new();
    let mut all_file_paths = Vec::new();

    for (key, value) in document {
        let name = match key {
            Value::String(name) => name.clone(),
            other => scalar_to_string(other).ok_or_else(|| {
                ConfigError::Invalid("task names must be scalars".to_string())
            })?,
        };
        if name == GLOBAL_KEY {
            continue;
        }

        let raw: RawTask =
            serde_yaml::from_value(value.clone()).map_err(|error| ConfigError::TaskSyntax {
                task: name.clone(),
                error,
            })?;

        let task = resolve_task(&name, raw, ctx)?;
        debug!(task = %name, files = task.files.len(), "resolved task");

        all_file_paths.extend(task.files.iter().cloned());
        tasks.insert(name, task);
    }

    Ok((tasks, all_file_paths))
}

fn resolve_task(name: &str, raw: RawTask, ctx: &mut Context) -> Result<Task> {
    let mut files = Vec::new();
    for pattern in &raw.files {
        let resolved = interpolate(pattern, ctx)?;
        files.extend(expand_file_pattern(&resolved, ctx)?);
    }

    let joined = files.join(" ");
    let mut run = Vec::with_capacity(raw.run.len());
    for command in &raw.run {
        run.push(interpolate_deferred(
            &command.replace(FILES_TOKEN, &joined),
            ctx,
        )?);
    }

    let env = resolve_env(&raw.env, ctx)?;

    Ok(Task {
        name: name.to_string(),
        files,
        run,
        env,
    })
}

/// Resolve variables in document order, exporting each as soon as it is known
fn resolve_env(vars: &Mapping, ctx: &mut Context) -> Result<BTreeMap<String, String>> {
    let mut resolved = BTreeMap::new();

    for (key, value) in vars {
        let key = scalar_to_string(key)
            .ok_or_else(|| ConfigError::Invalid("variable names must be scalars".to_string()))?;
        let raw = scalar_to_string(value).ok_or_else(|| {
            ConfigError::Invalid(format!("variable '{}' must be a scalar value", key))
        })?;

        let value = interpolate(&raw, ctx)?;
        ctx.set_var(key.clone(), value.clone());
        resolved.insert(key, value);
    }

    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::KickError;
    use std::fs;
    use tempfile::TempDir;

    fn project(files: &[&str]) -> (TempDir, Context) {
        let dir = TempDir::new().unwrap();
        for file in files {
            let path = dir.path().join(file);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(path, *file).unwrap();
        }
        let ctx = Context::new().with_working_dir(dir.path().to_path_buf());
        (dir, ctx)
    }

    #[test]
    fn test_parse_tasks_and_global() {
        let (_dir, mut ctx) = project(&[]);
        let yaml = r#"
global:
  environment:
    FOO: foo
  events:
    before_each_task: [echo start]

build:
  run:
    - cargo build

test:
  run: cargo test
"#;
        let parser = Parser::parse(yaml, &mut ctx).unwrap();
        assert_eq!(parser.task_names(), vec!["build", "test"]);
        assert_eq!(parser.global.environment.get("FOO").unwrap(), "foo");
        assert_eq!(parser.global.events.before_each_task, vec!["echo start"]);
        assert_eq!(ctx.lookup("FOO"), Some("foo".to_string()));
        assert!(!parser.from_cache());
    }

    #[test]
    fn test_files_token_interpolation() {
        let (_dir, mut ctx) = project(&["a.txt", "b.txt"]);
        let yaml = r#"
show:
  files: ["a.txt", "b.txt"]
  run: ["cat {FILES}"]
"#;
        let parser = Parser::parse(yaml, &mut ctx).unwrap();
        let task = parser.task("show").unwrap();
        assert_eq!(task.files, vec!["a.txt", "b.txt"]);
        assert_eq!(task.run, vec!["cat a.txt b.txt"]);
    }

    #[test]
    fn test_globs_and_missing_literals() {
        let (_dir, mut ctx) = project(&["src/a.rs", "src/b.rs", "Cargo.toml"]);
        let yaml = r#"
build:
  files: [src/*.rs, Cargo.toml, missing.toml, docs/*.md]
  run: cargo build
lint:
  files: Cargo.toml
  run: cargo clippy
"#;
        let parser = Parser::parse(yaml, &mut ctx).unwrap();
        assert_eq!(
            parser.task("build").unwrap().files,
            vec!["src/a.rs", "src/b.rs", "Cargo.toml"]
        );
        assert_eq!(
            parser.file_paths,
            vec!["src/a.rs", "src/b.rs", "Cargo.toml", "Cargo.toml"]
        );
    }

    #[test]
    fn test_global_environment_visible_to_tasks() {
        let (_dir, mut ctx) = project(&["out/app.bin"]);
        let yaml = r#"
global:
  environment:
    DIR: out
    NAME: $(echo app)

build:
  files: ["$DIR/*.bin"]
  run: ["echo ${NAME} $DIR"]
"#;
        let parser = Parser::parse(yaml, &mut ctx).unwrap();
        let task = parser.task("build").unwrap();
        assert_eq!(task.files, vec!["out/app.bin"]);
        assert_eq!(task.run, vec!["echo app out"]);
        assert_eq!(parser.global.environment.get("NAME").unwrap(), "app");
    }

    #[test]
    fn test_task_env_is_resolved_and_exported() {
        let (_dir, mut ctx) = project(&[]);
        let yaml = r#"
deploy:
  env:
    TARGET: $(echo prod)
    PORT: 8080
  run: ["echo $TARGET"]
"#;
        let parser = Parser::parse(yaml, &mut ctx).unwrap();
        let task = parser.task("deploy").unwrap();
        assert_eq!(task.env.get("TARGET").unwrap(), "prod");
        assert_eq!(task.env.get("PORT").unwrap(), "8080");
        assert_eq!(ctx.lookup("TARGET"), Some("prod".to_string()));
    }

    #[test]
    fn test_run_keeps_references_to_later_variables() {
        let (_dir, mut ctx) = project(&[]);
        let yaml = r#"
global:
  environment:
    OUT: build
deploy:
  env:
    KICK_PARSER_MODE: release
  run: ["echo $KICK_PARSER_MODE ${KICK_PARSER_MODE} $OUT"]
"#;
        let parser = Parser::parse(yaml, &mut ctx).unwrap();
        assert_eq!(
            parser.task("deploy").unwrap().run,
            vec!["echo $KICK_PARSER_MODE ${KICK_PARSER_MODE} build"]
        );
    }

    #[test]
    fn test_malformed_document() {
        let (_dir, mut ctx) = project(&[]);
        let result = Parser::parse("build: [unclosed", &mut ctx);
        assert!(matches!(result, Err(KickError::Config(ConfigError::Syntax(_)))));
    }

    #[test]
    fn test_task_without_run_is_syntax_error() {
        let (_dir, mut ctx) = project(&[]);
        let result = Parser::parse("build:\n  files: [a.txt]\n", &mut ctx);
        assert!(matches!(
            result,
            Err(KickError::Config(ConfigError::TaskSyntax { task, .. })) if task == "build"
        ));
    }

    #[test]
    fn test_failing_substitution_aborts() {
        let (_dir, mut ctx) = project(&[]);
        let yaml = "global:\n  environment:\n    BAD: $(false)\n";
        let result = Parser::parse(yaml, &mut ctx);
        assert!(matches!(
            result,
            Err(KickError::Config(ConfigError::Substitution { .. }))
        ));
    }

    #[test]
    fn test_unknown_task_lookup() {
        let (_dir, mut ctx) = project(&[]);
        let parser = Parser::parse("main:\n  run: ls\n", &mut ctx).unwrap();
        assert!(matches!(parser.task("nope"), Err(ConfigError::TaskNotFound(_))));
    }

    #[test]
    fn test_load_writes_and_reuses_snapshot() {
        let (dir, mut ctx) = project(&[]);
        let config = dir.path().join("kick.yml");
        fs::write(
            &config,
            "stamp:\n  run: [\"echo $(echo ok)\"]\n",
        )
        .unwrap();
        let cache = ParserCache::new(dir.path(), "-parser-test");

        let first = Parser::load(&config, &mut ctx, ParserOptions::default(), &cache).unwrap();
        assert!(!first.from_cache());
        assert!(cache.path().exists());
        assert_eq!(first.task("stamp").unwrap().run, vec!["echo ok"]);
    }

    #[test]
    fn test_cache_hit_skips_substitution() {
        let (dir, mut ctx) = project(&[]);
        let config = dir.path().join("kick.yml");
        fs::write(
            &config,
            "global:\n  environment:\n    STAMP: $(touch marker)\nmain:\n  run: ls\n",
        )
        .unwrap();
        let cache = ParserCache::new(dir.path(), "-parser-hit");

        let first = Parser::load(&config, &mut ctx, ParserOptions::default(), &cache).unwrap();
        assert!(dir.path().join("marker").exists());
        fs::remove_file(dir.path().join("marker")).unwrap();

        let mut fresh = Context::new().with_working_dir(dir.path().to_path_buf());
        let second = Parser::load(&config, &mut fresh, ParserOptions::default(), &cache).unwrap();
        assert!(second.from_cache());
        assert!(!dir.path().join("marker").exists());
        assert_eq!(first.snapshot(), second.snapshot());
        assert_eq!(fresh.vars.get("STAMP"), None);
    }

    #[test]
    fn test_clear_cache_forces_reparse() {
        let (dir, mut ctx) = project(&[]);
        let config = dir.path().join("kick.yml");
        fs::write(&config, "main:\n  run: ls\n").unwrap();
        let cache = ParserCache::new(dir.path(), "-parser-clear");

        Parser::load(&config, &mut ctx, ParserOptions::default(), &cache).unwrap();
        let options = ParserOptions {
            clear_cache: true,
            ..ParserOptions::default()
        };
        let again = Parser::load(&config, &mut ctx, options, &cache).unwrap();
        assert!(!again.from_cache());
    }

    #[test]
    fn test_cache_write_failure_depends_on_quiet() {
        let (dir, mut ctx) = project(&[]);
        let config = dir.path().join("kick.yml");
        fs::write(&config, "main:\n  run: ls\n").unwrap();
        let cache = ParserCache::new(&dir.path().join("no-such-dir"), "-parser-write");

        let loud = Parser::load(&config, &mut ctx, ParserOptions::default(), &cache);
        assert!(matches!(loud, Err(KickError::Cache(_))));

        let quiet = ParserOptions {
            quiet: true,
            ..ParserOptions::default()
        };
        assert!(Parser::load(&config, &mut ctx, quiet, &cache).is_ok());
    }
}
