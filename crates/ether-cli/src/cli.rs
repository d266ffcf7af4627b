use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use ether_proto::cache::TitleSource;

use crate::app::App;
use crate::watch;

#[derive(Parser)]
#[command(
    name = "ethermemo",
    version,
    about = "Remember what an internet radio station was playing"
)]
pub struct Cli {
    /// Configuration file (default: ~/.config/ethermemo/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Follow the station's now-playing title (default)
    Watch,
    /// Print the current title once
    Now,
    /// Save the current title to the liked tracks
    Like {
        /// What you think of it
        #[arg(long, short)]
        comment: Option<String>,
    },
    /// List liked tracks
    Liked {
        /// Only print where the journal lives
        #[arg(long)]
        path: bool,
    },
    /// Show the radio station, or switch to another one
    Station {
        /// New stream URL
        url: Option<String>,
    },
}

pub async fn run(cli: Cli) -> Result<()> {
    let mut app = App::open(cli.config)?;

    match cli.command.unwrap_or(Commands::Watch) {
        Commands::Watch => watch::run(&mut app).await,
        Commands::Now => cmd_now(&mut app).await,
        Commands::Like { comment } => cmd_like(&mut app, comment.as_deref().unwrap_or("")).await,
        Commands::Liked { path } => cmd_liked(&app, path).await,
        Commands::Station { url } => cmd_station(&mut app, url.as_deref()),
    }
}

async fn cmd_now<S: TitleSource>(app: &mut App<S>) -> Result<()> {
    let result = app.refresh().await;
    if !result.is_valid {
        // main reports it and exits non-zero
        anyhow::bail!("{}", result.status_line());
    }
    println!("{}", result.title);
    Ok(())
}

async fn cmd_like(app: &mut App, comment: &str) -> Result<()> {
    let track = app.like(comment).await?;
    println!("Liked: {}", track);
    Ok(())
}

async fn cmd_liked(app: &App, path_only: bool) -> Result<()> {
    if path_only {
        println!("{}", app.journal.path().display());
        return Ok(());
    }

    let saved = app.journal.load().await?;
    if saved.tracks.is_empty() {
        println!("No liked tracks yet.");
    }
    for track in &saved.tracks {
        println!("{}", track);
    }
    Ok(())
}

fn cmd_station(app: &mut App, url: Option<&str>) -> Result<()> {
    if let Some(url) = url {
        app.set_station(url)?;
    }
    println!("Radio: {}", app.config.stream.url);
    Ok(())
}
