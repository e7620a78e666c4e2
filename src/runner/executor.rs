//! Dispatch engine
//!
//! Decides whether a task needs to run, then runs its commands wrapped in the
//! global hooks. Everything is sequential: each command finishes before the
//! next one starts, and the first failure aborts the whole dispatch.

use crate::config::{Parser, Task};
use crate::error::Result;
use crate::lockfile::{mod_time, Lockfile};
use crate::runner::{execute_command, run_isolated, CommandLine, Context};
use std::thread;
use std::time::Duration;
use tracing::debug;

/// Pause between two watch cycles
pub const WATCH_INTERVAL: Duration = Duration::from_secs(1);

/// Options set by the caller
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecutorOptions {
    /// Dispatch even when no file changed
    pub force: bool,

    /// Keep re-checking the task instead of running it once
    pub watch: bool,
}

/// Outcome of one dispatch decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// The task's commands ran to completion
    Ran,

    /// Nothing changed since the last successful run
    NothingToRun,
}

/// Runs tasks from a resolved configuration
pub struct Executor {
    parser: Parser,
    lockfile: Lockfile,
    ctx: Context,
    options: ExecutorOptions,
}

impl Executor {
    pub fn new(parser: Parser, lockfile: Lockfile, ctx: Context, options: ExecutorOptions) -> Self {
        Executor {
            parser,
            lockfile,
            ctx,
            options,
        }
    }

    /// Run `task_name` once, or watch it when watch mode is on
    pub fn start(&self, task_name: &str) -> Result<Dispatch> {
        if self.options.watch {
            self.watch(task_name)
        } else {
            self.execute(task_name)
        }
    }

    /// One dispatch-decision cycle for `task_name`
    pub fn execute(&self, task_name: &str) -> Result<Dispatch> {
        let task = self.parser.task(task_name)?;
        let outcome = self.check_and_dispatch(task, self.options.force)?;

        match outcome {
            Dispatch::Ran => self.ctx.print_success("Done!"),
            Dispatch::NothingToRun => self.ctx.print_info("Nothing to run"),
        }

        Ok(outcome)
    }

    /// Re-check `task_name` every `WATCH_INTERVAL`, forever.
    ///
    /// Failed cycles are reported and watching continues. Force only applies
    /// to the first cycle. Only an unknown task name returns.
    pub fn watch(&self, task_name: &str) -> Result<Dispatch> {
        let task = self.parser.task(task_name)?;
        let mut force = self.options.force;

        loop {
            match self.check_and_dispatch(task, force) {
                Ok(Dispatch::Ran) => self.ctx.print_success("Done!"),
                Ok(Dispatch::NothingToRun) => {}
                Err(e) => self.ctx.print_error(&e.to_string()),
            }
            force = false;

            self.ctx.print_debug("Watching for file changes...");
            thread::sleep(WATCH_INTERVAL);
        }
    }

    /// Decide, dispatch if warranted and record timestamps on success
    pub fn check_and_dispatch(&self, task: &Task, force: bool) -> Result<Dispatch> {
        if !force && !self.should_dispatch(task)? {
            debug!(task = %task.name, "no file changed");
            return Ok(Dispatch::NothingToRun);
        }

        self.dispatch_task(task, true)?;

        if !task.files.is_empty() {
            self.lockfile.update_timestamps(&task.files)?;
        }

        Ok(Dispatch::Ran)
    }

    /// Whether any of the task's files changed since its last successful run.
    /// Tasks without files always run.
    pub fn should_dispatch(&self, task: &Task) -> Result<bool> {
        if task.files.is_empty() {
            return Ok(true);
        }

        let lockfile = self.lockfile.clone();
        let files = task.files.clone();

        run_isolated("scan", move || {
            let stored = lockfile.current_project()?;

            for file in &files {
                let now = mod_time(&lockfile.root().join(file))?;
                let changed = stored.get(file).map_or(true, |&seen| seen < now);
                if changed {
                    debug!(file = %file, "file changed");
                    return Ok(true);
                }
            }

            Ok(false)
        })
    }

    /// Run a task's commands. Hooks only wrap the initial, top-level dispatch.
    fn dispatch_task(&self, task: &Task, initial_run: bool) -> Result<()> {
        debug!(task = %task.name, initial_run, "dispatching");
        let events = &self.parser.global.events;

        if initial_run {
            self.run_all(&events.before_each_task)?;
        }

        for command in &task.run {
            if initial_run {
                self.run_all(&events.before_each_run)?;
            }

            self.run_command(command)?;

            if initial_run {
                self.run_all(&events.after_each_run)?;
            }
        }

        if initial_run {
            self.run_all(&events.after_each_task)?;
        }

        Ok(())
    }

    fn run_all(&self, commands: &[String]) -> Result<()> {
        for command in commands {
            self.run_command(command)?;
        }
        Ok(())
    }

    /// Run a task reference as a nested dispatch, anything else as a process
    fn run_command(&self, raw: &str) -> Result<()> {
        self.ctx.print_command(raw);

        match CommandLine::classify(raw, &self.parser.tasks, &self.ctx)? {
            CommandLine::TaskReference(name) => {
                let nested = self.parser.task(&name)?;
                self.dispatch_task(nested, false)
            }
            CommandLine::Shell(argv) => {
                let output = execute_command(argv, &self.ctx)?;
                self.ctx.print_output(&output.combined());
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::Verbosity;
    use std::fs;
    use tempfile::TempDir;

    fn executor(yaml: &str) -> (TempDir, Executor) {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("input.txt"), "input").unwrap();

        let mut ctx = Context::new()
            .with_working_dir(dir.path().to_path_buf())
            .with_verbosity(Verbosity::Quiet);
        let parser = Parser::parse(yaml, &mut ctx).unwrap();
        let lockfile = Lockfile::new(
            dir.path().join("lockfile.yml"),
            "-executor-test",
            dir.path().to_path_buf(),
        );
        let executor = Executor::new(parser, lockfile, ctx, ExecutorOptions::default());
        (dir, executor)
    }

    fn log(dir: &TempDir) -> Vec<String> {
        fs::read_to_string(dir.path().join("order.log"))
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_task_without_files_always_dispatches() {
        let (_dir, executor) = executor("main:\n  run: [\"true\"]\n");
        let task = executor.parser.task("main").unwrap();
        assert!(executor.should_dispatch(task).unwrap());
        assert_eq!(executor.execute("main").unwrap(), Dispatch::Ran);
        assert_eq!(executor.execute("main").unwrap(), Dispatch::Ran);
    }

    #[test]
    fn test_unchanged_files_skip_dispatch() {
        let (_dir, executor) = executor("main:\n  files: [input.txt]\n  run: [\"true\"]\n");
        assert_eq!(executor.execute("main").unwrap(), Dispatch::Ran);
        assert_eq!(executor.execute("main").unwrap(), Dispatch::NothingToRun);
    }

    #[test]
    fn test_force_dispatches_unchanged_task() {
        let (_dir, mut executor) = executor("main:\n  files: [input.txt]\n  run: [\"true\"]\n");
        executor.execute("main").unwrap();
        executor.options.force = true;
        assert_eq!(executor.execute("main").unwrap(), Dispatch::Ran);
    }

    #[test]
    fn test_unknown_task() {
        let (_dir, executor) = executor("main:\n  run: [\"true\"]\n");
        let err = executor.execute("missing").unwrap_err();
        assert!(err.is_task_not_found());
    }

    #[test]
    fn test_missing_file_aborts_decision() {
        let (dir, executor) = executor("main:\n  files: [input.txt]\n  run: [\"true\"]\n");
        fs::remove_file(dir.path().join("input.txt")).unwrap();
        let task = executor.parser.task("main").unwrap();
        assert!(matches!(
            executor.should_dispatch(task),
            Err(crate::error::KickError::Cache(_))
        ));
    }

    #[test]
    fn test_hook_ordering() {
        let yaml = r#"
global:
  events:
    before_each_task: ["sh -c 'echo T1 >> order.log'"]
    before_each_run: ["sh -c 'echo B >> order.log'"]
    after_each_run: ["sh -c 'echo A >> order.log'"]
    after_each_task: ["sh -c 'echo T2 >> order.log'"]

main:
  run:
    - "sh -c 'echo C1 >> order.log'"
    - "sh -c 'echo C2 >> order.log'"
"#;
        let (dir, executor) = executor(yaml);
        executor.execute("main").unwrap();
        assert_eq!(log(&dir), vec!["T1", "B", "C1", "A", "B", "C2", "A", "T2"]);
    }

    #[test]
    fn test_nested_task_skips_hooks() {
        let yaml = r#"
global:
  events:
    before_each_run: ["sh -c 'echo B >> order.log'"]
    after_each_task: ["sh -c 'echo T2 >> order.log'"]

inner:
  run:
    - "sh -c 'echo I1 >> order.log'"
    - "sh -c 'echo I2 >> order.log'"

main:
  run: [inner]
"#;
        let (dir, executor) = executor(yaml);
        executor.execute("main").unwrap();
        assert_eq!(log(&dir), vec!["B", "I1", "I2", "T2"]);
    }

    #[test]
    fn test_failure_aborts_and_keeps_cache() {
        let yaml = r#"
main:
  files: [input.txt]
  run:
    - "sh -c 'echo first >> order.log'"
    - "false"
    - "sh -c 'echo never >> order.log'"
"#;
        let (dir, executor) = executor(yaml);
        assert!(executor.execute("main").is_err());
        assert_eq!(log(&dir), vec!["first"]);
        assert!(executor.lockfile.current_project().unwrap().is_empty());

        let task = executor.parser.task("main").unwrap();
        assert!(executor.should_dispatch(task).unwrap());
    }

    #[test]
    fn test_nested_failure_propagates() {
        let yaml = r#"
broken:
  run: ["false"]
main:
  run: [broken, "sh -c 'echo after >> order.log'"]
"#;
        let (dir, executor) = executor(yaml);
        let err = executor.execute("main").unwrap_err();
        assert!(matches!(
            err,
            crate::error::KickError::Execution(crate::error::ExecutionError::CommandFailed { .. })
        ));
        assert!(log(&dir).is_empty());
    }

    #[test]
    fn test_success_records_timestamps() {
        let (dir, executor) = executor("main:\n  files: [input.txt]\n  run: [\"true\"]\n");
        executor.execute("main").unwrap();

        let stored = executor.lockfile.current_project().unwrap();
        assert_eq!(
            stored["input.txt"],
            mod_time(&dir.path().join("input.txt")).unwrap()
        );
    }

    #[test]
    fn test_stale_timestamp_triggers_dispatch() {
        let (dir, executor) = executor("main:\n  files: [input.txt]\n  run: [\"true\"]\n");
        executor.execute("main").unwrap();

        let now = mod_time(&dir.path().join("input.txt")).unwrap();
        let stale = format!(
            "version: 1\nprojects:\n  -executor-test:\n    input.txt: {}\n",
            now - 10
        );
        fs::write(dir.path().join("lockfile.yml"), stale).unwrap();

        let task = executor.parser.task("main").unwrap();
        assert!(executor.should_dispatch(task).unwrap());
    }

    #[test]
    fn test_children_see_exported_environment() {
        let yaml = r#"
global:
  environment:
    GREETING: hello
main:
  run: ["sh -c 'echo $GREETING > env.out'"]
"#;
        let (dir, executor) = executor(yaml);
        executor.execute("main").unwrap();
        let out = fs::read_to_string(dir.path().join("env.out")).unwrap();
        assert_eq!(out.trim(), "hello");
    }

    #[test]
    fn test_run_expands_own_env_at_execution() {
        let yaml = r#"
main:
  env:
    MODE: release
  run: ["sh -c 'echo mode=$MODE > out.txt'"]
"#;
        let (dir, executor) = executor(yaml);
        executor.execute("main").unwrap();
        let out = fs::read_to_string(dir.path().join("out.txt")).unwrap();
        assert_eq!(out.trim(), "mode=release");
    }

    #[test]
    fn test_run_sees_env_of_later_task() {
        let yaml = r#"
first:
  run: ["sh -c 'echo target=${TARGET} > out.txt'"]
second:
  env:
    TARGET: prod
  run: ["true"]
"#;
        let (dir, executor) = executor(yaml);
        executor.execute("first").unwrap();
        let out = fs::read_to_string(dir.path().join("out.txt")).unwrap();
        assert_eq!(out.trim(), "target=prod");
    }
}
