use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use phrasebank::browse::CatalogBrowser;
use phrasebank::catalog_store::{
    AudioAvailability, CatalogStore, Group, Language, Phrase, PhraseWithGroup, SearchScope,
    SqliteCatalogStore,
};
use phrasebank::config::{self, FileConfig};
use phrasebank::reconciler::{Reconciler, ScanStats};

fn parse_path(s: &str) -> Result<PathBuf, String> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(format!("Error resolving path '{}': {}", s, msg));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir().map_err(|e| format!("Failed to get current dir: {}", e))?;
    Ok(cwd.join(original_path))
}

/// Maintenance and browsing commands for the phrase bank.
#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to TOML configuration file. Values in the file override CLI arguments.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Path to the SQLite phrase database file.
    #[clap(long, value_parser = parse_path)]
    pub db_path: Option<PathBuf>,

    /// Root directory of the audio tree, laid out as {group_id}/{language}/.
    #[clap(long, value_parser = parse_path)]
    pub audio_root: Option<PathBuf>,

    /// Print results as JSON instead of plain text.
    #[clap(long)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Creates a group with the given name.
    AddGroup {
        name: String,
        #[clap(long, default_value = "")]
        description: String,
    },

    /// Updates the name and/or description of a group.
    UpdateGroup {
        group_id: i64,
        #[clap(long)]
        name: Option<String>,
        #[clap(long)]
        description: Option<String>,
    },

    /// Deletes a group together with its phrases and their audio files.
    DeleteGroup { group_id: i64 },

    /// Shows all groups, sorted by name.
    ListGroups,

    /// Shows one group and its phrases.
    ShowGroup { group_id: i64 },

    /// Creates the phrase of (group, language), or replaces its content.
    AddPhrase {
        group_id: i64,
        language: Language,
        content: String,
        /// Audio file the phrase should point at.
        #[clap(long, value_parser = parse_path)]
        audio: Option<PathBuf>,
    },

    /// Replaces the content of a phrase.
    SetContent { phrase_id: i64, content: String },

    /// Points a phrase at a new audio file. The file previously pointed at
    /// is removed from disk.
    SetAudio {
        phrase_id: i64,
        #[clap(value_parser = parse_path, required_unless_present = "clear")]
        audio: Option<PathBuf>,
        /// Drop the audio pointer instead of setting one.
        #[clap(long, conflicts_with = "audio")]
        clear: bool,
    },

    /// Deletes a phrase and its audio file.
    DeletePhrase { phrase_id: i64 },

    /// Shows one phrase.
    ShowPhrase { phrase_id: i64 },

    /// Shows phrases across all groups.
    ListPhrases {
        /// Restrict to one group.
        #[clap(long)]
        group: Option<i64>,
        /// Skip phrases that have no audio pointer.
        #[clap(long)]
        audio_only: bool,
    },

    /// Case-insensitive substring search over phrases.
    Search {
        query: String,
        #[clap(long, default_value = "all")]
        scope: SearchScope,
    },

    /// Creates a group row for every numeric folder under the audio root.
    SyncGroups,

    /// Scans the audio tree and updates the catalog to match it.
    Scan,

    /// Creates missing default phrases for every language of a group.
    EnsureDefaults { group_id: i64 },

    /// Creates the phrase of (group, language) if none exists yet.
    EnsurePhrase {
        group_id: i64,
        language: Language,
        /// Content for a newly created phrase. An existing phrase is never
        /// rewritten.
        #[clap(long)]
        content: Option<String>,
    },

    /// Drops every group and phrase row, then rebuilds the catalog from the
    /// audio tree. Audio files are left untouched.
    Reinit {
        /// Required acknowledgement that all phrase rows will be deleted.
        #[clap(long)]
        confirm: bool,
    },
}

/// Convert CLI args to CliConfig for config resolution
impl From<&CliArgs> for config::CliConfig {
    fn from(args: &CliArgs) -> Self {
        config::CliConfig {
            db_path: args.db_path.clone(),
            audio_root: args.audio_root.clone(),
        }
    }
}

fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .unwrap();

    // Load TOML config if provided
    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };

    // Resolve final configuration (TOML overrides CLI)
    let cli_config: config::CliConfig = (&cli_args).into();
    let app_config = config::AppConfig::resolve(&cli_config, file_config)?;

    std::fs::create_dir_all(&app_config.audio_root)
        .with_context(|| format!("Failed to create audio root {:?}", app_config.audio_root))?;

    let store: Arc<dyn CatalogStore> = Arc::new(SqliteCatalogStore::open(&app_config.db_path)?);
    let reconciler = Reconciler::new(store.clone(), app_config.audio_root.clone());
    let browser = CatalogBrowser::new(store.clone());

    run_command(cli_args.command, cli_args.json, &store, &reconciler, &browser)
}

fn run_command(
    command: Command,
    json: bool,
    store: &Arc<dyn CatalogStore>,
    reconciler: &Reconciler,
    browser: &CatalogBrowser,
) -> Result<()> {
    match command {
        Command::AddGroup { name, description } => {
            let group = store.create_group(&name, &description)?;
            if json {
                print_json(&group)?;
            } else {
                println!("Created group [{}] {}", group.id, group.name);
            }
        }

        Command::UpdateGroup {
            group_id,
            name,
            description,
        } => {
            if name.is_none() && description.is_none() {
                bail!("Nothing to update, pass --name and/or --description");
            }
            if !store.update_group(group_id, name.as_deref(), description.as_deref())? {
                bail!("Group {} not found", group_id);
            }
            if json {
                print_json(&serde_json::json!({ "updated": group_id }))?;
            } else {
                println!("Group {} updated", group_id);
            }
        }

        Command::DeleteGroup { group_id } => {
            if !store.delete_group(group_id)? {
                bail!("Group {} not found", group_id);
            }
            if json {
                print_json(&serde_json::json!({ "deleted": group_id }))?;
            } else {
                println!("Group {} deleted", group_id);
            }
        }

        Command::ListGroups => {
            let groups = browser.groups_by_name()?;
            if json {
                print_json(&groups)?;
            } else if groups.is_empty() {
                println!("No groups.");
            } else {
                for group in &groups {
                    print_group_line(group);
                }
            }
        }

        Command::ShowGroup { group_id } => {
            let group = browser
                .group(group_id)?
                .with_context(|| format!("Group {} not found", group_id))?;
            let phrases = browser.phrases_of_group(group_id)?;
            if json {
                print_json(&serde_json::json!({ "group": group, "phrases": phrases }))?;
            } else {
                print_group_line(&group);
                if !group.description.is_empty() {
                    println!("    {}", group.description);
                }
                for phrase in &phrases {
                    print_phrase_line(phrase);
                }
            }
        }

        Command::AddPhrase {
            group_id,
            language,
            content,
            audio,
        } => {
            if store.get_group(group_id)?.is_none() {
                bail!("Group {} not found", group_id);
            }
            let phrase_id = store.upsert_phrase(group_id, language, &content, audio.as_deref())?;
            if json {
                print_json(&serde_json::json!({ "phrase_id": phrase_id }))?;
            } else {
                println!("Phrase [{}] saved", phrase_id);
            }
        }

        Command::SetContent { phrase_id, content } => {
            if !store.update_phrase_content(phrase_id, &content)? {
                bail!("Phrase {} not found", phrase_id);
            }
            if json {
                print_json(&serde_json::json!({ "updated": phrase_id }))?;
            } else {
                println!("Phrase {} updated", phrase_id);
            }
        }

        Command::SetAudio {
            phrase_id,
            audio,
            clear: _,
        } => {
            if !store.update_phrase_audio(phrase_id, audio.as_deref())? {
                bail!("Phrase {} not found", phrase_id);
            }
            if json {
                print_json(&serde_json::json!({ "updated": phrase_id }))?;
            } else if audio.is_some() {
                println!("Phrase {} audio updated", phrase_id);
            } else {
                println!("Phrase {} audio cleared", phrase_id);
            }
        }

        Command::DeletePhrase { phrase_id } => {
            if !store.delete_phrase(phrase_id)? {
                bail!("Phrase {} not found", phrase_id);
            }
            if json {
                print_json(&serde_json::json!({ "deleted": phrase_id }))?;
            } else {
                println!("Phrase {} deleted", phrase_id);
            }
        }

        Command::ShowPhrase { phrase_id } => {
            let phrase = browser
                .phrase(phrase_id)?
                .with_context(|| format!("Phrase {} not found", phrase_id))?;
            if json {
                print_json(&phrase)?;
            } else {
                println!(
                    "Phrase [{}] group {} language {}",
                    phrase.id, phrase.group_id, phrase.language
                );
                println!("    created {}", phrase.created_at_utc());
                println!("    {}", describe_audio(&phrase));
                println!("    {}", phrase.content);
            }
        }

        Command::ListPhrases { group, audio_only } => match group {
            Some(group_id) => {
                let mut phrases = browser.phrases_of_group(group_id)?;
                if audio_only {
                    phrases.retain(|p| p.audio_path.is_some());
                }
                if json {
                    print_json(&phrases)?;
                } else if phrases.is_empty() {
                    println!("No phrases.");
                } else {
                    for phrase in &phrases {
                        print_phrase_line(phrase);
                    }
                }
            }
            None => {
                let phrases = browser.all_phrases(audio_only)?;
                if json {
                    print_json(&phrases)?;
                } else if phrases.is_empty() {
                    println!("No phrases.");
                } else {
                    for phrase in &phrases {
                        print_phrase_with_group_line(phrase);
                    }
                }
            }
        },

        Command::Search { query, scope } => {
            let phrases = browser.search(&query, scope)?;
            if json {
                print_json(&phrases)?;
            } else if phrases.is_empty() {
                println!("No matches.");
            } else {
                for phrase in &phrases {
                    print_phrase_with_group_line(phrase);
                }
            }
        }

        Command::SyncGroups => {
            let created = reconciler.sync_groups_from_folders()?;
            if json {
                print_json(&serde_json::json!({ "created": created }))?;
            } else {
                println!("Created {} group(s) from audio folders", created);
            }
        }

        Command::Scan => {
            let stats = reconciler.scan_and_update()?;
            if json {
                print_json(&stats)?;
            } else {
                print_scan_stats(&stats);
            }
        }

        Command::EnsureDefaults { group_id } => {
            let created = reconciler.ensure_default_phrases_for_group(group_id)?;
            if json {
                print_json(&serde_json::json!({ "created": created }))?;
            } else {
                println!("Created {} default phrase(s) for group {}", created, group_id);
            }
        }

        Command::EnsurePhrase {
            group_id,
            language,
            content,
        } => {
            let phrase_id = reconciler.ensure_phrase(group_id, language, content.as_deref())?;
            if json {
                print_json(&serde_json::json!({ "phrase_id": phrase_id }))?;
            } else {
                println!("Phrase [{}] in place", phrase_id);
            }
        }

        Command::Reinit { confirm } => {
            if !confirm {
                bail!(
                    "This deletes every group and phrase row before rebuilding \
                     from the audio tree, pass --confirm to proceed"
                );
            }
            let stats = reconciler.reinitialize_from_filesystem()?;
            if json {
                print_json(&stats)?;
            } else {
                println!("Recreated {} group(s) from the audio tree", stats.groups);
                print_scan_stats(&stats.scan);
            }
        }
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_group_line(group: &Group) {
    println!(
        "[{}] {} ({})",
        group.id,
        group.name,
        group.created_at_utc().format("%Y-%m-%d")
    );
}

fn print_phrase_line(phrase: &Phrase) {
    println!(
        "[{}] {}  {}  {}",
        phrase.id,
        phrase.language,
        describe_audio(phrase),
        phrase.content
    );
}

fn print_phrase_with_group_line(entry: &PhraseWithGroup) {
    println!(
        "[{}] {} / {}  {}  {}",
        entry.phrase.id,
        entry.group_name,
        entry.phrase.language,
        describe_audio(&entry.phrase),
        entry.phrase.content
    );
}

fn describe_audio(phrase: &Phrase) -> String {
    match (phrase.audio_availability(), &phrase.audio_path) {
        (AudioAvailability::Available, Some(path)) => format!("audio={}", path.display()),
        (AudioAvailability::Missing, Some(path)) => format!("audio missing ({})", path.display()),
        _ => "no audio".to_string(),
    }
}

fn print_scan_stats(stats: &ScanStats) {
    println!(
        "Scanned {} audio file(s): {} phrase(s) added, {} audio pointer(s) updated",
        stats.scanned, stats.added, stats.updated
    );
}
