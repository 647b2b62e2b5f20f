//! moodlog CLI - journal your mood from the command line
//!
//! Thin client over moodlog-core: entries live on the server, with an
//! offline mirror and detail cache under the local data directory.

mod session_file;

use std::env;
use std::fs;
use std::io::{self, IsTerminal, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use serde::Serialize;
use thiserror::Error;

use moodlog_core::api::JournalApiClient;
use moodlog_core::cache::DetailCache;
use moodlog_core::config::ClientConfig;
use moodlog_core::events::EventBus;
use moodlog_core::models::AttachmentTracker;
use moodlog_core::session::{Session, SessionStore};
use moodlog_core::store::{BlobStore, EntryStore, FsBlobStore};
use moodlog_core::sync::{EntryChanges, SyncCoordinator};
use moodlog_core::{Emotion, Entry, ServerId};

use session_file::FileSessionStore;

const DEFAULT_API_URL: &str = "https://api.moodlog.app";

#[derive(Parser)]
#[command(name = "moodlog")]
#[command(about = "Mood journal with offline cache and server sync")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Optional path to the local data directory
    #[arg(long, value_name = "PATH")]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Store a session token for subsequent commands
    Login {
        /// Bearer session token issued by the auth flow
        token: String,
    },
    /// Clear the session and all locally cached journal data
    Logout,
    /// List journal entries
    List {
        /// Number of entries to fetch
        #[arg(short, long, default_value = "20")]
        limit: usize,
        /// Offset into the remote collection
        #[arg(long, default_value = "0")]
        offset: usize,
        /// Read the offline mirror instead of refreshing from the server
        #[arg(long)]
        cached: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one entry in full
    Show {
        /// Server id of the entry
        id: i64,
        /// Bypass the detail cache and re-fetch
        #[arg(long)]
        refresh: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Create a new entry
    New {
        /// Entry content (stdin when omitted)
        content: Vec<String>,
        /// Emotion tag
        #[arg(short, long, default_value = "neutral")]
        emotion: Emotion,
        /// Attach an image file (repeatable, up to 3)
        #[arg(long, value_name = "PATH")]
        image: Vec<PathBuf>,
    },
    /// Edit an existing entry
    Edit {
        /// Server id of the entry
        id: i64,
        /// Replacement content
        #[arg(long)]
        content: Option<String>,
        /// Replacement emotion tag
        #[arg(short, long)]
        emotion: Option<Emotion>,
        /// Remove the attachment at this index (repeatable)
        #[arg(long, value_name = "INDEX")]
        remove_image: Vec<usize>,
        /// Attach an image file (repeatable)
        #[arg(long, value_name = "PATH")]
        add_image: Vec<PathBuf>,
    },
    /// Delete an entry
    Delete {
        /// Server id of the entry
        id: i64,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: Shell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Core(#[from] moodlog_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("No entry content provided")]
    EmptyContent,
    #[error("An entry can carry at most 3 images")]
    TooManyImages,
    #[error("No entry with server id {0} in the local mirror or on the server")]
    EntryNotFound(i64),
    #[error("Login token must not be empty")]
    EmptyToken,
}

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("moodlog=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();
    let services = build_services(cli.data_dir)?;

    match cli.command {
        Commands::Login { token } => run_login(&services, &token),
        Commands::Logout => run_logout(&services),
        Commands::List {
            limit,
            offset,
            cached,
            json,
        } => run_list(&services, limit, offset, cached, json).await,
        Commands::Show { id, refresh, json } => run_show(&services, id, refresh, json).await,
        Commands::New {
            content,
            emotion,
            image,
        } => run_new(&services, &content, emotion, &image).await,
        Commands::Edit {
            id,
            content,
            emotion,
            remove_image,
            add_image,
        } => run_edit(&services, id, content, emotion, remove_image, &add_image).await,
        Commands::Delete { id } => run_delete(&services, id).await,
        Commands::Completions { shell, output } => run_completions(shell, output.as_deref()),
    }
}

struct Services {
    coordinator: SyncCoordinator,
    sessions: Arc<FileSessionStore>,
}

fn build_services(data_dir_override: Option<PathBuf>) -> Result<Services, CliError> {
    let api_base_url =
        env::var("MOODLOG_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
    let data_dir = data_dir_override
        .or_else(|| env::var_os("MOODLOG_DATA_DIR").map(PathBuf::from))
        .unwrap_or_else(default_data_dir);

    let config = ClientConfig::new(api_base_url, data_dir)?;

    let blobs: Arc<dyn BlobStore> = Arc::new(FsBlobStore::new(config.data_dir.join("journal")));
    let sessions = Arc::new(FileSessionStore::new(config.data_dir.join("session.json")));
    let api = Arc::new(JournalApiClient::new(config.api_base_url.clone())?);

    let coordinator = SyncCoordinator::new(
        api,
        EntryStore::new(blobs.clone()),
        DetailCache::new(blobs),
        sessions.clone(),
        EventBus::default(),
    );

    Ok(Services {
        coordinator,
        sessions,
    })
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("moodlog")
}

fn run_login(services: &Services, token: &str) -> Result<(), CliError> {
    let token = token.trim();
    if token.is_empty() {
        return Err(CliError::EmptyToken);
    }
    services.sessions.save(&Session::new(token))?;
    println!("Logged in.");
    Ok(())
}

fn run_logout(services: &Services) -> Result<(), CliError> {
    services.sessions.clear()?;
    services.coordinator.cache().clear()?;
    services.coordinator.store().save_all(&[])?;
    println!("Logged out.");
    Ok(())
}

#[derive(Debug, Serialize)]
struct EntryListItem {
    server_id: Option<i64>,
    local_id: String,
    date: String,
    emotion: String,
    preview: String,
    attachments: usize,
    edited: bool,
}

impl From<&Entry> for EntryListItem {
    fn from(entry: &Entry) -> Self {
        Self {
            server_id: entry.server_id().map(ServerId::as_i64),
            local_id: entry.local_id().as_str(),
            date: format_timestamp(entry.timestamp),
            emotion: entry.emotion.to_string(),
            preview: preview_line(entry.display_content(), 60),
            attachments: entry.attachments.len(),
            edited: entry.edited,
        }
    }
}

async fn run_list(
    services: &Services,
    limit: usize,
    offset: usize,
    cached: bool,
    json: bool,
) -> Result<(), CliError> {
    let entries = if cached {
        services.coordinator.store().load_all()
    } else {
        services.coordinator.refresh_list(limit, offset).await?
    };

    let items: Vec<EntryListItem> = entries.iter().map(EntryListItem::from).collect();
    if json {
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    if items.is_empty() {
        println!("No entries.");
        return Ok(());
    }
    for item in items {
        let id = item
            .server_id
            .map_or_else(|| "pending".to_string(), |id| id.to_string());
        let mut flags = String::new();
        if item.edited {
            flags.push_str(" (edited)");
        }
        if item.attachments > 0 {
            flags.push_str(&format!(" [{} image(s)]", item.attachments));
        }
        println!(
            "{id:>8}  {}  {:<8}  {}{flags}",
            item.date, item.emotion, item.preview
        );
    }
    Ok(())
}

async fn run_show(services: &Services, id: i64, refresh: bool, json: bool) -> Result<(), CliError> {
    let entry = services
        .coordinator
        .fetch_detail(ServerId::new(id), refresh)
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entry)?);
        return Ok(());
    }

    println!("Entry {id}  {}  {}", format_timestamp(entry.timestamp), entry.emotion);
    if entry.edited {
        println!("(edited)");
    }
    println!();
    println!("{}", entry.display_content());
    if entry.has_attachments() {
        println!();
        for attachment in &entry.attachments {
            match attachment {
                moodlog_core::Attachment::Existing { id, url } => {
                    println!("image {id}: {url}");
                }
                moodlog_core::Attachment::New { .. } => println!("image: (pending upload)"),
            }
        }
    }
    Ok(())
}

async fn run_new(
    services: &Services,
    content_parts: &[String],
    emotion: Emotion,
    images: &[PathBuf],
) -> Result<(), CliError> {
    let content = resolve_content(content_parts)?;

    let mut tracker = AttachmentTracker::new();
    for path in images {
        let bytes = fs::read(path)?;
        if !tracker.add_new(bytes) {
            return Err(CliError::TooManyImages);
        }
    }

    let entry = services
        .coordinator
        .create_entry(&content, emotion, tracker.diff_for_save().add_payloads)
        .await?;

    match entry.server_id() {
        Some(id) => println!("Created entry {id}."),
        None => println!("Created entry (pending sync)."),
    }
    Ok(())
}

async fn run_edit(
    services: &Services,
    id: i64,
    content: Option<String>,
    emotion: Option<Emotion>,
    mut remove_image: Vec<usize>,
    add_image: &[PathBuf],
) -> Result<(), CliError> {
    let server_id = ServerId::new(id);
    let current = services.coordinator.fetch_detail(server_id, false).await?;

    let mut tracker = AttachmentTracker::seeded(current.attachments.clone());
    // Remove back-to-front so earlier removals don't shift later indices.
    remove_image.sort_unstable();
    for index in remove_image.into_iter().rev() {
        tracker.remove_at(index);
    }
    for path in add_image {
        let bytes = fs::read(path)?;
        if !tracker.add_new(bytes) {
            return Err(CliError::TooManyImages);
        }
    }

    let changes = EntryChanges {
        content,
        emotion,
        attachments: tracker.diff_for_save(),
    };
    let entry = services.coordinator.update_entry(server_id, changes).await?;

    println!(
        "Updated entry {id}: {} image(s), emotion {}.",
        entry.attachments.len(),
        entry.emotion
    );
    Ok(())
}

async fn run_delete(services: &Services, id: i64) -> Result<(), CliError> {
    let server_id = ServerId::new(id);
    let entry = match services
        .coordinator
        .store()
        .load_all()
        .into_iter()
        .find(|entry| entry.server_id() == Some(server_id))
    {
        Some(entry) => entry,
        None => services
            .coordinator
            .fetch_detail(server_id, false)
            .await
            .map_err(|error| match error {
                moodlog_core::Error::NotFound(_) => CliError::EntryNotFound(id),
                other => CliError::Core(other),
            })?,
    };

    services.coordinator.delete_entry(&entry).await?;
    println!("Deleted entry {id}.");
    Ok(())
}

fn run_completions(shell: Shell, output: Option<&Path>) -> Result<(), CliError> {
    let mut command = Cli::command();
    let mut buffer: Vec<u8> = Vec::new();
    generate(shell, &mut command, "moodlog", &mut buffer);

    match output {
        Some(path) => fs::write(path, buffer)?,
        None => io::stdout().write_all(&buffer)?,
    }
    Ok(())
}

fn resolve_content(parts: &[String]) -> Result<String, CliError> {
    if !parts.is_empty() {
        let content = parts.join(" ").trim().to_string();
        if content.is_empty() {
            return Err(CliError::EmptyContent);
        }
        return Ok(content);
    }

    let mut stdin = io::stdin();
    if stdin.is_terminal() {
        return Err(CliError::EmptyContent);
    }
    let mut content = String::new();
    stdin.read_to_string(&mut content)?;
    let content = content.trim().to_string();
    if content.is_empty() {
        return Err(CliError::EmptyContent);
    }
    Ok(content)
}

fn preview_line(content: &str, max_len: usize) -> String {
    let first = content.lines().next().unwrap_or("");
    let preview: String = first.chars().take(max_len).collect();
    if preview.is_empty() {
        "(no content)".to_string()
    } else {
        preview
    }
}

fn format_timestamp(unix_ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(unix_ms)
        .map_or_else(|| "-".to_string(), |dt| dt.format("%Y-%m-%d %H:%M").to_string())
}
