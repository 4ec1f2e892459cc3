//! PrepSquad CLI - find and run interview-prep study groups from the terminal.
//!
//! Every command that touches the API goes through the core client, so an
//! expired access token is renewed transparently and a dead session ends
//! with a single "please login again" message.

mod app;
mod format;
mod session;

use std::io;
use std::path::PathBuf;

use anyhow::{bail, Result};
use chrono::{NaiveDate, NaiveTime};
use clap::{Args, Parser, Subcommand};
use prepsquad_core::api::ApiError;
use prepsquad_core::config::TokenStoreKind;
use prepsquad_core::models::{NewGroup, PrepType, ProfileUpdate};
use prepsquad_core::{Config, RenewalPolicy};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use app::App;

/// Log file written when `--log-file` is given without a path
const LOG_FILE_NAME: &str = "prepsquad.log";

#[derive(Parser)]
#[command(name = "prepsquad", version, about = "PrepSquad study groups from the terminal")]
struct Cli {
    /// API base URL (overrides config and PREPSQUAD_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Also write logs to a file (defaults to the cache directory)
    #[arg(long, global = true, num_args = 0..=1, default_missing_value = "")]
    log_file: Option<String>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sign in and store credentials
    Login {
        #[arg(long)]
        email: Option<String>,
    },
    /// Create an account and sign in
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
    },
    /// Forget stored credentials
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Check that the API is reachable
    Health,
    /// Browse, create and manage study groups
    #[command(subcommand)]
    Groups(GroupsCommand),
    /// View or edit your profile
    #[command(subcommand)]
    Profile(ProfileCommand),
    /// Inspect or change local settings
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Subcommand)]
enum GroupsCommand {
    /// List groups, optionally filtered by prep type
    List {
        #[arg(long = "type", value_parser = parse_prep_type)]
        prep_type: Option<PrepType>,
    },
    /// Groups you created, with pending requests
    Mine,
    /// Create a new group
    Create(CreateArgs),
    /// Ask to join a group
    Join { group_id: String },
    /// Accept a pending member into your group
    Approve { group_id: String, user_id: String },
    /// Turn down a pending member
    Reject { group_id: String, user_id: String },
}

#[derive(Args)]
struct CreateArgs {
    #[arg(long)]
    name: String,
    #[arg(long = "type", value_parser = parse_prep_type)]
    prep_type: PrepType,
    #[arg(long, default_value = "")]
    description: String,
    #[arg(long)]
    goal: Option<String>,
    #[arg(long, value_parser = parse_date)]
    start: Option<NaiveDate>,
    #[arg(long, value_parser = parse_date)]
    end: Option<NaiveDate>,
    #[arg(long)]
    requirements: Option<String>,
    #[arg(long)]
    timezone: Option<String>,
    #[arg(long)]
    weekly_calls: Option<u32>,
    #[arg(long, value_parser = parse_time)]
    call_start: Option<NaiveTime>,
    #[arg(long, value_parser = parse_time)]
    call_end: Option<NaiveTime>,
    #[arg(long)]
    max_members: Option<u32>,
}

#[derive(Subcommand)]
enum ProfileCommand {
    /// Show a profile (your own by default)
    Show { user_id: Option<String> },
    /// Change profile fields; unspecified fields keep their current value
    Update(UpdateArgs),
}

#[derive(Args)]
struct UpdateArgs {
    #[arg(long)]
    bio: Option<String>,
    #[arg(long)]
    avatar_url: Option<String>,
    #[arg(long)]
    linkedin_url: Option<String>,
    #[arg(long)]
    github_url: Option<String>,
    #[arg(long = "add-skill")]
    add_skills: Vec<String>,
    #[arg(long = "remove-skill")]
    remove_skills: Vec<String>,
    #[arg(long = "add-goal")]
    add_goals: Vec<String>,
    #[arg(long = "remove-goal")]
    remove_goals: Vec<String>,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Print the effective configuration
    Show,
    /// Persist a setting
    Set {
        #[command(subcommand)]
        setting: Setting,
    },
}

#[derive(Subcommand)]
enum Setting {
    ApiUrl { url: String },
    TokenStore {
        #[arg(value_parser = parse_store_kind)]
        kind: TokenStoreKind,
    },
    Renewal {
        #[arg(value_parser = parse_policy)]
        policy: RenewalPolicy,
    },
    Timeout { secs: Option<u64> },
}

fn parse_prep_type(value: &str) -> Result<PrepType, String> {
    PrepType::parse(value).ok_or_else(|| {
        let known: Vec<&str> = PrepType::ALL.iter().map(|t| t.as_str()).collect();
        format!("unknown prep type (expected one of {})", known.join(", "))
    })
}

fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| "expected YYYY-MM-DD".to_string())
}

fn parse_time(value: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map_err(|_| "expected HH:MM".to_string())
}

fn parse_store_kind(value: &str) -> Result<TokenStoreKind, String> {
    serde_json::from_value(serde_json::Value::String(value.to_lowercase()))
        .map_err(|_| "expected file, keyring or memory".to_string())
}

fn parse_policy(value: &str) -> Result<RenewalPolicy, String> {
    serde_json::from_value(serde_json::Value::String(value.to_lowercase()))
        .map_err(|_| "expected independent or coalesced".to_string())
}

/// Initialize the tracing subscriber for logging.
///
/// `RUST_LOG` controls the level (default `warn`). The returned guard must
/// live until exit so buffered file output is flushed.
fn init_tracing(log_file: Option<PathBuf>) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let dir = path.parent().map(PathBuf::from).unwrap_or_default();
            let name = path
                .file_name()
                .map(|n| n.to_os_string())
                .unwrap_or_else(|| LOG_FILE_NAME.into());
            std::fs::create_dir_all(&dir)?;
            let appender = tracing_appender::rolling::never(dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    Ok(guard)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let mut config = Config::load()?;
    config.apply_env();
    if let Some(ref url) = cli.api_url {
        config.api_base_url = url.clone();
    }

    let log_file = match cli.log_file.as_deref() {
        Some("") => Some(config.cache_dir()?.join(LOG_FILE_NAME)),
        Some(path) => Some(PathBuf::from(path)),
        None => None,
    };
    let guard = init_tracing(log_file)?;
    info!(api_base = %config.api_base(), "PrepSquad CLI starting");

    let mut app = App::new(config)?;
    let result = run(&mut app, cli.command, cli.json).await;

    if let Err(ref e) = result {
        app.on_error(e);
        if ApiError::is_session_expired(e) {
            eprintln!("Session expired. Please login again.");
            drop(guard);
            std::process::exit(1);
        }
    }
    drop(guard);
    result
}

async fn run(app: &mut App, command: Command, json: bool) -> Result<()> {
    match command {
        Command::Login { email } => {
            let user = app.login(email).await?;
            println!("Signed in as {}", user.display_name());
        }
        Command::Register { name, email } => {
            let user = app.register(&name, &email).await?;
            println!("Welcome, {}!", user.display_name());
        }
        Command::Logout => {
            app.logout()?;
            println!("Signed out");
        }
        Command::Whoami => {
            let user = app.require_user()?;
            if json {
                print_json(user)?;
            } else {
                let since = app
                    .signed_in_at()
                    .map(format::format_age)
                    .unwrap_or_default();
                println!("{} <{}>  id {}  signed in {}", user.display_name(), user.email, user.id, since);
            }
        }
        Command::Health => {
            let status = app.client.health().await?;
            if json {
                print_json(&status)?;
            } else if status.is_ok() {
                println!("API is up ({})", app.config.api_base());
            } else {
                bail!("API reported status {:?}: {:?}", status.status, status.message);
            }
        }
        Command::Groups(cmd) => run_groups(app, cmd, json).await?,
        Command::Profile(cmd) => run_profile(app, cmd, json).await?,
        Command::Config(cmd) => run_config(app, cmd)?,
    }
    Ok(())
}

async fn run_groups(app: &mut App, command: GroupsCommand, json: bool) -> Result<()> {
    match command {
        GroupsCommand::List { prep_type } => {
            let groups = app.client.list_groups(prep_type).await?;
            if json {
                return print_json(&groups);
            }
            if groups.is_empty() {
                println!("No groups found");
            }
            let user = app.user();
            for group in &groups {
                println!("{}", format::group_summary(group, user));
            }
        }
        GroupsCommand::Mine => {
            let user_id = app.require_user()?.id.clone();
            let groups = app.client.groups_created_by(&user_id).await?;
            if json {
                return print_json(&groups);
            }
            if groups.is_empty() {
                println!("You have not created any groups");
            }
            for group in &groups {
                println!("{}\n", format::group_details(group));
            }
        }
        GroupsCommand::Create(args) => {
            let user_id = app.require_user()?.id.clone();
            let new_group = NewGroup {
                name: args.name,
                description: args.description,
                prep_type: args.prep_type,
                goal: args.goal,
                start_date: args.start,
                end_date: args.end,
                requirements: args.requirements,
                timezone: args.timezone,
                weekly_calls: args.weekly_calls,
                call_start_time: args.call_start,
                call_end_time: args.call_end,
                max_members: args.max_members,
                user_id: Some(user_id),
            };
            let group = app.client.create_group(&new_group).await?;
            if json {
                return print_json(&group);
            }
            println!("Created group {}", group.id);
            println!("{}", format::group_details(&group));
        }
        GroupsCommand::Join { group_id } => {
            let user_id = app.require_user()?.id.clone();
            let group = app.client.join_group(&group_id, &user_id).await?;
            if json {
                return print_json(&group);
            }
            if group.is_member(&user_id) {
                println!("Joined {}", group.name);
            } else {
                println!("Request sent to join {}", group.name);
            }
        }
        GroupsCommand::Approve { group_id, user_id } => {
            let group = app.client.approve_member(&group_id, &user_id).await?;
            if json {
                return print_json(&group);
            }
            println!("Approved {} ({})", user_id, group.display_capacity());
        }
        GroupsCommand::Reject { group_id, user_id } => {
            let group = app.client.reject_member(&group_id, &user_id).await?;
            if json {
                return print_json(&group);
            }
            println!("Rejected {} ({} pending)", user_id, group.pending_count());
        }
    }
    Ok(())
}

async fn run_profile(app: &mut App, command: ProfileCommand, json: bool) -> Result<()> {
    match command {
        ProfileCommand::Show { user_id } => {
            let user_id = match user_id {
                Some(id) => id,
                None => app.require_user()?.id.clone(),
            };
            let profile = app.client.profile(&user_id).await?;
            if json {
                return print_json(&profile);
            }
            println!("{}", format::profile_details(&profile));
        }
        ProfileCommand::Update(args) => {
            let user_id = app.require_user()?.id.clone();
            let current = app.client.profile(&user_id).await?;

            let mut update = ProfileUpdate::from(&current);
            if let Some(bio) = args.bio {
                update.bio = bio;
            }
            if let Some(url) = args.avatar_url {
                update.avatar_url = url;
            }
            if let Some(url) = args.linkedin_url {
                update.linkedin_url = url;
            }
            if let Some(url) = args.github_url {
                update.github_url = url;
            }
            for skill in &args.add_skills {
                update.add_skill(skill);
            }
            for skill in &args.remove_skills {
                update.remove_skill(skill);
            }
            for goal in &args.add_goals {
                update.add_prep_goal(goal);
            }
            for goal in &args.remove_goals {
                update.remove_prep_goal(goal);
            }

            let profile = app.client.update_profile(&update).await?;
            if json {
                return print_json(&profile);
            }
            println!("Profile updated\n{}", format::profile_details(&profile));
        }
    }
    Ok(())
}

fn run_config(app: &mut App, command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Show => print_json(&app.config)?,
        ConfigCommand::Set { setting } => {
            // Start from the file, not the env/flag overrides applied at startup
            let mut config = Config::load()?;
            match setting {
                Setting::ApiUrl { url } => config.api_base_url = url,
                Setting::TokenStore { kind } => config.token_store = kind,
                Setting::Renewal { policy } => config.renewal = policy,
                Setting::Timeout { secs } => config.request_timeout_secs = secs,
            }
            config.save()?;
            println!("Saved");
        }
    }
    Ok(())
}
