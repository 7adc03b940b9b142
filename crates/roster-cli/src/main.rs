//! `roster` keeps the Sender.net newsletter lists in step with the
//! pilgrimage directory.
//!
//! # Usage
//!
//! ```text
//! roster sync-subscriptions --dry-run
//! roster --prod-dir sync-subscriptions --incremental
//! roster sync-subscriptions --person 42 --person 57
//! roster assign-week-conferences --limit 10
//! ```

mod settings;

use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use roster_core::{directory::DirectoryClient, person::PersonId};
use roster_http::{HttpDirectory, SenderClient, directory::PRODUCTION_URL};
use roster_sync::{
  Selection, SyncStats, assign_conference_newsletters, assign_week_conferences,
  sync_subscriptions,
};
use settings::Settings;
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::EnvFilter;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(author, version, about = "Directory to newsletter sync jobs")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "roster.toml")]
  config: PathBuf,

  /// Use the production directory instead of the local one.
  #[arg(long)]
  prod_dir: bool,

  /// Sender.net API token.
  #[arg(long, env = "SENDERNET_TOKEN", hide_env_values = true)]
  sendernet_token: Option<String>,

  /// Google token to exchange for a directory session.
  #[arg(long, env = "DIRECTORY_GOOGLE_TOKEN", hide_env_values = true)]
  google_token: Option<String>,

  /// Existing directory `ci_session` value.
  #[arg(long, env = "DIRECTORY_SESSION_TOKEN", hide_env_values = true)]
  session_token: Option<String>,

  /// Log every write instead of performing it.
  #[arg(long, global = true)]
  dry_run: bool,

  /// Process at most N records.
  #[arg(long, global = true, value_name = "N")]
  limit: Option<usize>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Create or update a subscriber for every person in the directory.
  SyncSubscriptions {
    /// Only people the directory flagged since the last sync.
    #[arg(long, conflicts_with = "person")]
    incremental: bool,

    /// Only these people (repeatable).
    #[arg(long, value_name = "ID")]
    person: Vec<PersonId>,
  },
  /// Subscribe people to the newsletters of conferences they served in.
  AssignConferenceNewsletters,
  /// Set each week's conference from its location.
  AssignWeekConferences,
  /// Print the directory's view of the current session.
  CheckAuth,
}

impl Cli {
  /// Flags and secrets from the command line win over the config file.
  fn apply(&self, settings: &mut Settings) {
    if self.prod_dir {
      settings.directory.base_url = Some(PRODUCTION_URL.to_string());
    }
    if let Some(token) = &self.sendernet_token {
      settings.sender.token = token.clone();
    }
    if let Some(token) = &self.google_token {
      settings.directory.google_token = Some(token.clone());
    }
    if let Some(token) = &self.session_token {
      settings.directory.session_token = Some(token.clone());
    }
    if self.dry_run {
      settings.sync.dry_run = true;
    }
    if self.limit.is_some() {
      settings.sync.limit = self.limit;
    }
  }
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let mut settings = Settings::load(&cli.config)
    .with_context(|| format!("failed to read config {}", cli.config.display()))?;
  cli.apply(&mut settings);

  let directory = HttpDirectory::new(settings.directory.clone(), &settings.http)
    .context("failed to build directory client")?;

  let stats = match cli.command {
    Command::CheckAuth => {
      let auth = directory
        .get_auth()
        .await
        .context("failed to fetch directory auth")?;
      println!("{}", serde_json::to_string_pretty(&auth)?);
      return Ok(());
    }
    Command::SyncSubscriptions {
      incremental,
      person,
    } => {
      if settings.sender.token.is_empty() {
        warn!("no Sender.net token configured");
      }
      let sender = SenderClient::new(settings.sender.clone(), &settings.http)
        .context("failed to build Sender.net client")?;
      let selection = match (incremental, person) {
        (true, _) => Selection::Flagged,
        (false, ids) if !ids.is_empty() => Selection::People(ids),
        _ => Selection::All,
      };
      info!(?selection, dry_run = settings.sync.dry_run, "syncing subscriptions");
      sync_subscriptions(&directory, &sender, &selection, &settings.sync)
        .await
        .context("subscription sync aborted")?
    }
    Command::AssignConferenceNewsletters => {
      assign_conference_newsletters(&directory, &settings.sync)
        .await
        .context("conference newsletter assignment aborted")?
    }
    Command::AssignWeekConferences => {
      assign_week_conferences(&directory, &settings.sync)
        .await
        .context("week conference assignment aborted")?
    }
  };

  report(&stats);
  Ok(())
}

fn report(stats: &SyncStats) {
  if stats.errored > 0 {
    warn!(%stats, "finished with errors");
  } else {
    info!(%stats, "finished");
  }
}
