use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use color_eyre::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;

mod adapters;
mod application;
mod domain;
mod ports;

use adapters::{
    config::FileConfigStore,
    store::{FileKeyValueStore, MemoryKeyValueStore},
    tui::{run_tui, App},
};
use application::{AppError, AppResult, LoadReport, TaskRepository, ThemeStore};
use domain::{swatch, ColorTag, DomainError, Task, TaskDraft, TaskId, TaskTime, Theme, PALETTE};
use ports::{ConfigStore, KeyValueStore};

const DATA_ENV: &str = "TODO_TUI_DATA";
const LOG_FILE: &str = "todo-tui.log";

fn build_cli() -> Command {
    Command::new("todo-tui")
        .version("0.1.0")
        .about("A keyboard-driven task list for the terminal")
        .long_about("A keyboard-driven task list for the terminal.\n\nRun without a subcommand to open the interactive list. Tasks and the theme\nare kept in one JSON file under the platform data directory.")
        .arg(
            Arg::new("data-file")
                .long("data-file")
                .value_name("PATH")
                .value_parser(value_parser!(PathBuf))
                .help("Store file (can also be set via TODO_TUI_DATA env var)")
                .global(true),
        )
        .arg(
            Arg::new("ephemeral")
                .long("ephemeral")
                .action(ArgAction::SetTrue)
                .help("Keep tasks and theme in memory; the store and config files are left alone")
                .global(true),
        )
        .subcommand(
            Command::new("tasks")
                .about("Task operations")
                .subcommand(Command::new("list").about("List tasks as JSON"))
                .subcommand(with_draft_args(
                    Command::new("add")
                        .about("Add a task")
                        .arg(text_arg(1)),
                ))
                .subcommand(with_draft_args(
                    Command::new("edit")
                        .about("Replace a task's text, keeping fields that are not given")
                        .arg(id_arg())
                        .arg(text_arg(2)),
                ))
                .subcommand(Command::new("done").about("Mark a task done").arg(id_arg()))
                .subcommand(
                    Command::new("undone")
                        .about("Mark a task not done")
                        .arg(id_arg()),
                )
                .subcommand(Command::new("delete").about("Delete a task").arg(id_arg())),
        )
        .subcommand(
            Command::new("theme")
                .about("Print or set the theme")
                .arg(
                    Arg::new("mode")
                        .help("Theme to switch to")
                        .value_parser(["light", "dark"])
                        .index(1),
                ),
        )
}

fn id_arg() -> Arg {
    Arg::new("id")
        .help("Task ID")
        .required(true)
        .index(1)
}

fn text_arg(index: usize) -> Arg {
    Arg::new("text")
        .help("Task text")
        .required(true)
        .index(index)
}

fn with_draft_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("color")
                .long("color")
                .short('c')
                .value_name("N")
                .value_parser(value_parser!(usize))
                .help("Palette index: 0 white, 1 yellow, 2 red, 3 green, 4 blue, 5 purple"),
        )
        .arg(
            Arg::new("start")
                .long("start")
                .value_name("YYYY-MM-DD HH:MM")
                .help("Start time"),
        )
        .arg(
            Arg::new("end")
                .long("end")
                .value_name("YYYY-MM-DD HH:MM")
                .help("End time"),
        )
}

fn read_id(matches: &ArgMatches) -> AppResult<TaskId> {
    let raw = matches
        .get_one::<String>("id")
        .map(String::as_str)
        .unwrap_or_default();
    Ok(raw.parse::<TaskId>()?)
}

/// Overlays the flags given on the command line onto `base`.
fn read_draft(matches: &ArgMatches, base: TaskDraft) -> AppResult<TaskDraft> {
    let mut draft = base;

    if let Some(text) = matches.get_one::<String>("text") {
        draft.text = text.clone();
    }

    if let Some(&index) = matches.get_one::<usize>("color") {
        if index >= PALETTE.len() {
            return Err(DomainError::InvalidColor(index).into());
        }
        draft.color_tag = PALETTE[index].tag;
    }

    if let Some(start) = matches.get_one::<String>("start") {
        draft.start_time = TaskTime::parse_input(start)?;
    }

    if let Some(end) = matches.get_one::<String>("end") {
        draft.end_time = TaskTime::parse_input(end)?;
    }

    Ok(draft)
}

async fn run_task_command(
    repository: &TaskRepository,
    matches: &ArgMatches,
    default_color: ColorTag,
) -> AppResult<Task> {
    match matches.subcommand() {
        Some(("add", add_matches)) => {
            let draft = read_draft(add_matches, TaskDraft::new("", default_color))?;
            repository.create(draft).await
        }
        Some(("edit", edit_matches)) => {
            let id = read_id(edit_matches)?;
            let current = repository.get(id).await?;
            let draft = read_draft(edit_matches, TaskDraft::from(&current))?;
            repository.update(id, draft).await
        }
        Some(("done", done_matches)) => repository.toggle(read_id(done_matches)?, true).await,
        Some(("undone", undone_matches)) => {
            repository.toggle(read_id(undone_matches)?, false).await
        }
        Some(("delete", delete_matches)) => repository.delete(read_id(delete_matches)?).await,
        _ => Err(AppError::Application("Unknown tasks subcommand".to_string())),
    }
}

fn resolve_data_file(matches: &ArgMatches, configured: Option<PathBuf>) -> Result<PathBuf> {
    let chosen = matches
        .get_one::<PathBuf>("data-file")
        .cloned()
        .or_else(|| std::env::var_os(DATA_ENV).map(PathBuf::from))
        .or(configured);

    match chosen {
        Some(path) => Ok(path),
        None => Ok(FileKeyValueStore::default_path()?),
    }
}

/// Opens the store file. When it cannot be opened the session runs on an
/// in-memory store and the reason is returned for the user.
async fn open_store(data_file: &Path, ephemeral: bool) -> (Arc<dyn KeyValueStore>, Option<String>) {
    if ephemeral {
        return (Arc::new(MemoryKeyValueStore::new()), None);
    }

    match FileKeyValueStore::open_or_recover(data_file).await {
        Ok(store) => (Arc::new(store), None),
        Err(e) => {
            tracing::warn!(
                "Cannot open store {}, changes will not be saved: {}",
                data_file.display(),
                e
            );
            let reason = format!("{e}; changes in this session will not be saved");
            (Arc::new(MemoryKeyValueStore::new()), Some(reason))
        }
    }
}

fn init_logging(data_file: &Path, level: tracing::Level) -> Result<()> {
    let log_path = data_file.with_file_name(LOG_FILE);
    if let Some(dir) = log_path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    tracing_subscriber::fmt()
        .with_writer(std::sync::Mutex::new(log_file))
        .with_ansi(false)
        .with_max_level(level)
        .init();

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize color-eyre for better error reporting
    color_eyre::install()?;

    let matches = build_cli().get_matches();

    let ephemeral = matches.get_flag("ephemeral");

    // Load configuration, writing the defaults out on first run
    let config_store = FileConfigStore::new()?;
    let config = config_store.load_config().await?;
    if !ephemeral && !config_store.exists().await {
        config_store.save_config(&config).await?;
    }

    let data_file = resolve_data_file(&matches, config.data_file.clone())?;
    init_logging(&data_file, config.log_level)?;

    tracing::info!(
        "Starting with store {} (ephemeral: {})",
        data_file.display(),
        ephemeral
    );

    if config.default_color >= PALETTE.len() {
        tracing::warn!(
            "Configured default_color {} is out of range, using {}",
            config.default_color,
            PALETTE[0].name
        );
    }
    let default_color = swatch(config.default_color).tag;

    // Create dependencies
    let (store, open_failure) = open_store(&data_file, ephemeral).await;

    let repository = Arc::new(TaskRepository::new(store.clone()));
    let themes = Arc::new(ThemeStore::new(store));

    let report = match open_failure {
        Some(reason) => LoadReport::Recovered(reason),
        None => repository.load().await,
    };

    // Handle subcommands
    match matches.subcommand() {
        Some(("tasks", tasks_matches)) => {
            match &report {
                LoadReport::Recovered(reason) => {
                    eprintln!("⚠️  Stored tasks could not be read, starting empty: {reason}");
                }
                LoadReport::Renumbered { renumbered, .. } => {
                    eprintln!("⚠️  {renumbered} tasks had duplicate ids and were given new ids");
                }
                LoadReport::Empty | LoadReport::Restored(_) => {}
            }

            if let Some(("list", _)) = tasks_matches.subcommand() {
                let tasks = repository.tasks().await;
                let json = serde_json::to_string_pretty(&tasks)?;
                println!("{json}");
                return Ok(());
            }

            match run_task_command(&repository, tasks_matches, default_color).await {
                Ok(task) => {
                    let json = serde_json::to_string_pretty(&task)?;
                    println!("{json}");
                }
                Err(e) => {
                    eprintln!("❌ {e}");
                    std::process::exit(1);
                }
            }
        }
        Some(("theme", theme_matches)) => {
            let result = match theme_matches.get_one::<String>("mode") {
                None => Ok(themes.load_theme().await),
                Some(mode) => match mode.parse::<Theme>() {
                    Ok(theme) => themes.save_theme(theme).await.map(|_| theme),
                    Err(e) => Err(e.into()),
                },
            };

            match result {
                Ok(theme) => println!("{}", theme.label()),
                Err(e) => {
                    eprintln!("❌ Failed to update theme: {e}");
                    std::process::exit(1);
                }
            }
        }
        None => {
            // Default behavior - run TUI
            let app = App::new(repository, themes, default_color);

            if let Err(e) = run_tui(app, &report).await {
                eprintln!("❌ Application error: {e}");
                std::process::exit(1);
            }
        }
        _ => {
            eprintln!("❌ Unknown command");
            std::process::exit(1);
        }
    }

    Ok(())
}
