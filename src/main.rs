use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use crossterm::tty::IsTty;
use std::path::PathBuf;
use tokio::sync::mpsc;

use hnplus::api::HnClient;
use hnplus::config::Config;
use hnplus::model::{CommentId, ItemId};
use hnplus::session::{LoadState, Session, SessionEvent};
use hnplus::thread::top_stories;
use hnplus::ui::View;

#[derive(Parser, Debug)]
#[command(name = "hnplus", about = "Read Hacker News comment threads in the terminal")]
struct Args {
    /// Config file (default: ~/.config/hnplus/config.toml)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// API root, overriding the config file
    #[arg(long, global = true, value_name = "URL")]
    base_url: Option<String>,

    /// Maximum concurrent item fetches
    #[arg(long, global = true, value_name = "N")]
    concurrency: Option<usize>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the current top stories
    Top {
        /// How many stories to show
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Show a story's comments
    Comments {
        /// Story id, e.g. 36185218
        post_id: ItemId,

        /// Collapse this comment's body (repeatable)
        #[arg(long = "collapse", value_name = "ID")]
        collapse: Vec<CommentId>,

        /// List comments that could not be loaded
        #[arg(long)]
        report: bool,
    },
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = match args.config.clone().or_else(Config::default_path) {
        Some(path) => Config::load(&path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => {
            tracing::debug!("HOME not set, using default configuration");
            Config::default()
        }
    };

    if let Some(base_url) = &args.base_url {
        config.base_url = base_url.clone();
    }
    if let Some(n) = args.concurrency {
        config.max_concurrent_fetches = Some(n);
    }
    if let Command::Top { limit: Some(n) } = args.command {
        config.top_stories_limit = n;
    }
    config.validate().context("Invalid settings")?;
    Ok(config)
}

fn view_for_stdout(no_color: bool) -> View {
    let width = crossterm::terminal::size()
        .map(|(cols, _)| usize::from(cols))
        .unwrap_or(80);
    let color =
        !no_color && std::env::var_os("NO_COLOR").is_none() && std::io::stdout().is_tty();
    View::new(width, color)
}

async fn run_top(client: &HnClient, config: &Config, view: View) -> Result<()> {
    let ids = client
        .top_story_ids()
        .await
        .context("Failed to fetch top stories")?;
    let ids = &ids[..ids.len().min(config.top_stories_limit)];

    let stories = top_stories(client, ids, config.max_concurrent_fetches).await;
    if stories.len() < ids.len() {
        tracing::warn!(
            requested = ids.len(),
            loaded = stories.len(),
            "Some stories could not be loaded"
        );
    }
    print!("{}", view.story_list(&stories));
    Ok(())
}

async fn run_comments(
    client: &HnClient,
    config: &Config,
    view: View,
    post_id: ItemId,
    collapse: &[CommentId],
    report: bool,
) -> Result<()> {
    let mut session = Session::new(post_id, config.max_concurrent_fetches);
    let (event_tx, mut event_rx) = mpsc::channel::<SessionEvent>(8);
    let loader = session.spawn_load(client.clone(), event_tx);

    while let Some(event) = event_rx.recv().await {
        if let SessionEvent::PostResolved { comment_count, .. } = &event {
            tracing::info!(post_id, comment_count, "Fetching comments");
        }
        session.apply(event);
    }
    loader.await.context("Comment loader stopped unexpectedly")?;

    if let LoadState::Failed(e) = session.state() {
        anyhow::bail!("Failed to load story {post_id}: {e}");
    }

    for &id in collapse {
        if session.comments().iter().any(|c| c.id == id) {
            session.toggle_collapsed(id);
        } else {
            tracing::warn!(id, "No such top-level comment to collapse");
        }
    }

    print!("{}", view.thread(&session.rendered_comments(Utc::now())));
    if report {
        print!("{}", view.dropped(session.failures()));
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout stays clean for piping
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;
    tracing::debug!(?config, "Effective configuration");

    let client = HnClient::with_base_url(&config.base_url, config.request_timeout())
        .context("Failed to create API client")?;
    let view = view_for_stdout(args.no_color);

    match &args.command {
        Command::Top { .. } => run_top(&client, &config, view).await,
        Command::Comments {
            post_id,
            collapse,
            report,
        } => run_comments(&client, &config, view, *post_id, collapse, *report).await,
    }
}
