//! Interactive watch loop: refresh once a second, print the status line when
//! it changes, and take one-letter commands on stdin.

use std::io::ErrorKind;
use std::time::Duration;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::app::{now_secs, App};

const HELP: &str = "l = like, c <text> = like with comment, s = status, q = quit";

#[derive(Debug, PartialEq, Eq)]
enum WatchCommand {
    Like(String),
    Status,
    Quit,
    Help,
}

impl WatchCommand {
    fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        let (head, rest) = input.split_once(' ').unwrap_or((input, ""));
        match head {
            "l" | "like" => Some(Self::Like(String::new())),
            "c" | "comment" if !rest.trim().is_empty() => Some(Self::Like(rest.trim().to_string())),
            "s" | "status" => Some(Self::Status),
            "q" | "quit" => Some(Self::Quit),
            "" => None,
            _ => Some(Self::Help),
        }
    }
}

enum StdinLine {
    Line(String),
    /// Bad bytes on one line; the next line may be fine.
    Unreadable,
    Closed,
}

/// Only a closed or broken stdin stops command input; polling carries on
/// either way.
fn read_outcome(input: std::io::Result<Option<String>>) -> StdinLine {
    match input {
        Ok(Some(line)) => StdinLine::Line(line),
        Ok(None) => {
            debug!("stdin closed, watching without commands");
            StdinLine::Closed
        }
        Err(e) if e.kind() == ErrorKind::InvalidData => {
            warn!("unreadable command line: {}", e);
            StdinLine::Unreadable
        }
        Err(e) => {
            warn!("stdin failed, watching without commands: {}", e);
            StdinLine::Closed
        }
    }
}

pub async fn run(app: &mut App) -> Result<()> {
    println!("Radio: {}", app.config.stream.url);
    println!("{}", HELP);

    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    // A slow fetch must not be followed by a burst of catch-up ticks
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let mut shown: Option<String> = None;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let line = app.refresh().await.status_line();
                if shown.as_deref() != Some(line.as_str()) {
                    println!("{}", line);
                    shown = Some(line);
                }
            }
            input = lines.next_line(), if stdin_open => {
                let input = match read_outcome(input) {
                    StdinLine::Line(input) => input,
                    StdinLine::Unreadable => {
                        println!("Could not read that line, try again.");
                        continue;
                    }
                    StdinLine::Closed => {
                        stdin_open = false;
                        continue;
                    }
                };
                match WatchCommand::parse(&input) {
                    Some(WatchCommand::Like(comment)) => match app.like(&comment).await {
                        Ok(track) => println!("Liked: {}", track),
                        Err(e) => {
                            warn!("like failed: {}", e);
                            println!("Not saved: {}", e);
                        }
                    },
                    Some(WatchCommand::Status) => {
                        let now = now_secs();
                        if let Some(last) = app.cache.last_result() {
                            let next_in = app.cache.next_refresh_in(now).unwrap_or(0);
                            println!("{} (next refresh in {}s)", last.status_line(), next_in);
                        }
                    }
                    Some(WatchCommand::Quit) => break,
                    Some(WatchCommand::Help) => println!("{}", HELP),
                    None => {}
                }
            }
        }
    }

    Ok(())
}
