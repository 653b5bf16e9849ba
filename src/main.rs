use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::json;

use taskforge_lib::planner::{GeminiPlanner, PlanGenerator, PlanRequest};
use taskforge_lib::stats::{self, TaskFilter};
use taskforge_lib::theme::LogTheme;
use taskforge_lib::{
    time, write_atomic, AppConfig, Habit, LocalStore, Priority, SeedData, StoreHandle, Task,
    TaskStatus,
};

#[derive(Debug, Parser)]
#[command(name = "taskforge", about = "Tasks, habits and learning roadmaps", version)]
struct Cli {
    /// Directory holding store.json (overrides TASKFORGE_DATA_DIR).
    #[arg(long, global = true, value_name = "DIR")]
    data_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Seed empty collections. Existing data is never touched.
    Init {
        /// Seed empty collections instead of the starter content.
        #[arg(long)]
        empty: bool,
    },
    /// Task commands.
    #[command(subcommand)]
    Task(TaskCommand),
    /// Habit tracker commands.
    #[command(subcommand)]
    Habit(HabitCommand),
    /// Learning roadmap commands.
    #[command(subcommand)]
    Roadmap(RoadmapCommand),
    /// Profile commands.
    #[command(subcommand)]
    Profile(ProfileCommand),
    /// Print dashboard numbers.
    Stats,
    /// Export every collection as one JSON document.
    Export {
        /// Write the document to FILE instead of stdout.
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,
    },
    /// Ask the AI planner for a roadmap and daily habits, then save them.
    Plan {
        #[arg(long)]
        goal: String,
        #[arg(long)]
        duration: String,
        #[arg(long)]
        time_per_day: String,
        #[arg(long)]
        skill_level: String,
        /// Print the composed records without saving them.
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Debug, Subcommand)]
enum TaskCommand {
    List {
        /// Case-insensitive title search.
        #[arg(long, default_value = "")]
        search: String,
        /// Only tasks in this category ("All" disables the filter).
        #[arg(long)]
        category: Option<String>,
    },
    Add {
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "Medium")]
        priority: Priority,
        #[arg(long, default_value = "To Do")]
        status: TaskStatus,
        /// Due date (YYYY-MM-DD), today when omitted.
        #[arg(long)]
        due: Option<NaiveDate>,
        #[arg(long, default_value = "Personal")]
        category: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        roadmap_id: Option<String>,
    },
    SetStatus {
        id: String,
        status: TaskStatus,
    },
    Delete {
        id: String,
    },
}

#[derive(Debug, Subcommand)]
enum HabitCommand {
    List {
        /// Include the last seven days' completion grid.
        #[arg(long)]
        week: bool,
    },
    Add {
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "Health")]
        category: String,
    },
    Toggle {
        id: String,
        /// Day to toggle (YYYY-MM-DD), today when omitted.
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Zero every streak, keeping history.
    Reset,
}

#[derive(Debug, Subcommand)]
enum RoadmapCommand {
    List,
    ToggleStep {
        roadmap_id: String,
        step_id: String,
    },
    Delete {
        id: String,
    },
}

#[derive(Debug, Subcommand)]
enum ProfileCommand {
    Show,
    Set {
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        avatar_url: Option<String>,
        #[arg(long)]
        dark_mode: Option<bool>,
    },
}

fn main() {
    let cli = Cli::parse();
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Error: {err}");
            process::exit(1);
        }
    };
    taskforge_lib::init_logging(&config.log_filter);

    match run(cli, config) {
        Ok(()) => {}
        Err(err) => {
            eprintln!("Error: {err:#}");
            process::exit(1);
        }
    }
}

fn run(cli: Cli, mut config: AppConfig) -> Result<()> {
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    let medium = StoreHandle::file(&config.data_dir).context("open data store")?;
    let store = LocalStore::new(medium)
        .with_streak_mode(config.streak_mode)
        .with_theme(Arc::new(LogTheme));

    let seed = match &cli.command {
        Commands::Init { empty: true } => SeedData::empty(),
        _ => SeedData::demo(time::today(), time::now_utc()),
    };
    let seeded = store.initialize(&seed)?;
    store.sync_theme();

    match cli.command {
        Commands::Init { .. } => {
            let names: Vec<&str> = seeded.iter().map(|c| c.name()).collect();
            print_json(&json!({
                "dataDir": config.data_dir.display().to_string(),
                "seeded": names,
            }))
        }
        Commands::Task(command) => handle_task(&store, command),
        Commands::Habit(command) => handle_habit(&store, command),
        Commands::Roadmap(command) => handle_roadmap(&store, command),
        Commands::Profile(command) => handle_profile(&store, command),
        Commands::Stats => print_json(&stats::dashboard(
            &store.list_tasks(),
            &store.list_habits(),
            &store.list_roadmaps(),
        )),
        Commands::Export { out } => {
            let document = store.export_all()?;
            match out {
                Some(path) => {
                    write_atomic(&path, document.as_bytes())
                        .with_context(|| format!("write export {}", path.display()))?;
                    print_json(&json!({ "path": path.display().to_string() }))
                }
                None => {
                    println!("{document}");
                    Ok(())
                }
            }
        }
        Commands::Plan {
            goal,
            duration,
            time_per_day,
            skill_level,
            dry_run,
        } => {
            let request = PlanRequest {
                goal,
                duration,
                time_per_day,
                skill_level,
            };
            handle_plan(&store, &config, request, dry_run)
        }
    }
}

fn handle_task(store: &LocalStore, command: TaskCommand) -> Result<()> {
    match command {
        TaskCommand::List { search, category } => {
            let tasks = store.list_tasks();
            print_json(&TaskFilter::new(search, category).apply(&tasks))
        }
        TaskCommand::Add {
            title,
            priority,
            status,
            due,
            category,
            description,
            roadmap_id,
        } => {
            let mut task = Task::new(
                title,
                priority,
                status,
                due.unwrap_or_else(time::today),
                category,
            );
            task.description = description;
            task.roadmap_id = roadmap_id;
            print_json(&store.save_task(task)?)
        }
        TaskCommand::SetStatus { id, status } => {
            let mut task = store
                .get_task(&id)
                .with_context(|| format!("task {id} not found"))?;
            task.status = status;
            print_json(&store.save_task(task)?)
        }
        TaskCommand::Delete { id } => {
            let removed = store.delete_task(&id)?;
            print_json(&json!({ "id": id, "removed": removed }))
        }
    }
}

fn handle_habit(store: &LocalStore, command: HabitCommand) -> Result<()> {
    match command {
        HabitCommand::List { week: false } => print_json(&store.list_habits()),
        HabitCommand::List { week: true } => {
            let days = stats::week_window(time::today());
            let rows: Vec<_> = store
                .list_habits()
                .into_iter()
                .map(|habit| {
                    let grid: Vec<_> = days
                        .iter()
                        .map(|day| json!({ "date": time::date_key(*day), "done": habit.is_done_on(*day) }))
                        .collect();
                    json!({ "habit": habit, "week": grid })
                })
                .collect();
            print_json(&rows)
        }
        HabitCommand::Add { title, category } => {
            print_json(&store.save_habit(Habit::new(title, category))?)
        }
        HabitCommand::Toggle { id, date } => {
            let date = date.unwrap_or_else(time::today);
            match store.toggle_habit_for_date(&id, date)? {
                Some(habit) => print_json(&habit),
                None => print_json(&json!({ "id": id, "found": false })),
            }
        }
        HabitCommand::Reset => print_json(&store.reset_streaks()?),
    }
}

fn handle_roadmap(store: &LocalStore, command: RoadmapCommand) -> Result<()> {
    match command {
        RoadmapCommand::List => {
            let rows: Vec<_> = store
                .list_roadmaps()
                .into_iter()
                .map(|roadmap| {
                    let progress = stats::roadmap_progress(&roadmap);
                    json!({ "roadmap": roadmap, "progress": progress })
                })
                .collect();
            print_json(&rows)
        }
        RoadmapCommand::ToggleStep {
            roadmap_id,
            step_id,
        } => match store.toggle_roadmap_step(&roadmap_id, &step_id)? {
            Some(roadmap) => print_json(&roadmap),
            None => print_json(&json!({ "roadmapId": roadmap_id, "stepId": step_id, "found": false })),
        },
        RoadmapCommand::Delete { id } => {
            let removed = store.delete_roadmap(&id)?;
            print_json(&json!({ "id": id, "removed": removed }))
        }
    }
}

fn handle_profile(store: &LocalStore, command: ProfileCommand) -> Result<()> {
    match command {
        ProfileCommand::Show => print_json(&store.get_profile()),
        ProfileCommand::Set {
            username,
            email,
            avatar_url,
            dark_mode,
        } => {
            let mut profile = store.get_profile();
            if let Some(username) = username {
                profile.username = username;
            }
            if let Some(email) = email {
                profile.email = email;
            }
            if let Some(avatar_url) = avatar_url {
                profile.avatar_url = Some(avatar_url).filter(|url| !url.is_empty());
            }
            if let Some(dark_mode) = dark_mode {
                profile.dark_mode = dark_mode;
            }
            print_json(&store.save_profile(profile)?)
        }
    }
}

fn handle_plan(
    store: &LocalStore,
    config: &AppConfig,
    request: PlanRequest,
    dry_run: bool,
) -> Result<()> {
    let planner = GeminiPlanner::from_config(&config.planner);
    let runtime = tokio::runtime::Runtime::new().context("start async runtime")?;
    let response = runtime
        .block_on(planner.generate(&request))
        .map_err(taskforge_lib::AppError::from)?;

    let records = response.into_records(time::today(), time::now_utc());
    let records = if dry_run {
        records
    } else {
        records.save_into(store)?
    };
    print_json(&json!({
        "saved": !dry_run,
        "roadmap": records.roadmap,
        "habits": records.habits,
    }))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("render output")?;
    println!("{rendered}");
    Ok(())
}
