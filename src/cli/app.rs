//! Main CLI application

use crate::config::{
    find_config_file_from, init_config, project_key, Parser, ParserCache, ParserOptions,
    DEFAULT_TASK,
};
use crate::error::KickError;
use crate::lockfile::Lockfile;
use crate::logging::init_logging;
use crate::runner::{Context, Executor, ExecutorOptions, Verbosity};
use clap::{Arg, ArgAction, ArgMatches, Command};
use clap_complete::Shell;
use colored::Colorize;
use std::env;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Options collected from the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliOptions {
    pub task: String,
    pub watch: bool,
    pub force: bool,
    pub verbosity: Verbosity,
    pub clear_cache: bool,
    pub init: bool,
    pub list: bool,
    pub file: Option<PathBuf>,
    pub log_level: Option<String>,
    pub completions: Option<Shell>,
}

impl CliOptions {
    pub fn from_matches(matches: &ArgMatches) -> Self {
        CliOptions {
            task: matches
                .get_one::<String>("task")
                .cloned()
                .unwrap_or_else(|| DEFAULT_TASK.to_string()),
            watch: matches.get_flag("watch"),
            force: matches.get_flag("force"),
            verbosity: get_verbosity(matches),
            clear_cache: matches.get_flag("clear-cache"),
            init: matches.get_flag("init"),
            list: matches.get_flag("list"),
            file: matches.get_one::<PathBuf>("file").cloned(),
            log_level: matches.get_one::<String>("log-level").cloned(),
            completions: matches.get_one::<Shell>("completions").copied(),
        }
    }
}

/// CLI application
pub struct App {
    options: CliOptions,
}

impl App {
    /// Parse the process arguments; exits with usage on invalid input
    pub fn from_args() -> Self {
        let matches = build_command().get_matches();
        App {
            options: CliOptions::from_matches(&matches),
        }
    }

    /// Parse an explicit argument list
    pub fn try_from_iter<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let matches = build_command().try_get_matches_from(args)?;
        Ok(App {
            options: CliOptions::from_matches(&matches),
        })
    }

    pub fn options(&self) -> &CliOptions {
        &self.options
    }

    pub fn is_quiet(&self) -> bool {
        self.options.verbosity == Verbosity::Quiet
    }

    /// Run the application
    pub fn run(&self) -> anyhow::Result<()> {
        init_logging(self.options.log_level.as_deref());

        if let Some(shell) = self.options.completions {
            let mut command = build_command();
            clap_complete::generate(shell, &mut command, "kick", &mut io::stdout());
            return Ok(());
        }

        let cwd = env::current_dir()?;

        if self.options.init {
            let path = init_config(&cwd).map_err(KickError::from)?;
            Context::new()
                .with_verbosity(self.options.verbosity)
                .print_success(&format!("Created {}", path.display()));
            return Ok(());
        }

        let config_path = match &self.options.file {
            Some(path) => cwd.join(path),
            None => find_config_file_from(&cwd).map_err(KickError::from)?,
        };
        let root = config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| cwd.clone());
        let key = project_key(&root);
        debug!(config = %config_path.display(), project = %key, "loading configuration");

        let mut ctx = Context::new()
            .with_working_dir(root.clone())
            .with_verbosity(self.options.verbosity);

        let parser_options = ParserOptions {
            quiet: self.is_quiet(),
            clear_cache: self.options.clear_cache,
        };
        let cache = ParserCache::in_temp_dir(&key);
        let parser = Parser::load(&config_path, &mut ctx, parser_options, &cache)?;

        if self.options.list {
            print_task_list(&parser);
            return Ok(());
        }

        let lockfile = Lockfile::new(Lockfile::default_path(), key, root);
        let executor_options = ExecutorOptions {
            force: self.options.force,
            watch: self.options.watch,
        };

        Executor::new(parser, lockfile, ctx, executor_options).start(&self.options.task)?;
        Ok(())
    }
}

/// Build the clap command
pub fn build_command() -> Command {
    Command::new("kick")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Run tasks from kick.yml, only when their files changed")
        .arg(
            Arg::new("task")
                .value_name("TASK")
                .help("Task to run")
                .default_value(DEFAULT_TASK),
        )
        .arg(
            Arg::new("watch")
                .short('w')
                .long("watch")
                .help("Keep watching the task's files and re-run on change")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("force")
                .short('f')
                .long("force")
                .help("Run even if no file changed")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .help("Suppress all output, failures only set the exit status")
                .action(ArgAction::SetTrue)
                .conflicts_with("verbose"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Print verbose output")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("clear-cache")
                .short('c')
                .long("clear-cache")
                .help("Discard the cached parse of kick.yml")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("init")
                .short('i')
                .long("init")
                .help("Write a sample kick.yml in the current directory")
                .action(ArgAction::SetTrue)
                .conflicts_with_all(["list", "file"]),
        )
        .arg(
            Arg::new("list")
                .short('l')
                .long("list")
                .help("List tasks and their file counts")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("file")
                .long("file")
                .value_name("PATH")
                .help("Path to the kick.yml config file")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .value_name("LEVEL")
                .help("Diagnostic log level (overrides KICK_LOG)")
                .value_parser(["error", "warn", "info", "debug", "trace"]),
        )
        .arg(
            Arg::new("completions")
                .long("completions")
                .value_name("SHELL")
                .help("Print a shell completion script")
                .value_parser(clap::value_parser!(Shell)),
        )
}

/// Get verbosity level from matches
fn get_verbosity(matches: &ArgMatches) -> Verbosity {
    if matches.get_flag("quiet") {
        Verbosity::Quiet
    } else if matches.get_flag("verbose") {
        Verbosity::Verbose
    } else {
        Verbosity::Normal
    }
}

fn print_task_list(parser: &Parser) {
    let names = parser.task_names();
    let width = names.iter().map(|n| n.len()).max().unwrap_or(0);

    for name in names {
        let files = parser.tasks[name].files.len();
        let suffix = if files == 1 { "" } else { "s" };
        println!(
            "{}  {} file{}",
            format!("{:<width$}", name, width = width).bold(),
            files,
            suffix
        );
    }
}
