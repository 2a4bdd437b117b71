use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use comfy_table::{Cell, Table};
use dialoguer::{Input, Select};

use crate::config::{self, Config};
use crate::core::download;
use crate::core::view::{ViewState, NOT_FOUND_ERROR};
use crate::models::Song;
use crate::sources::saavn::SaavnClient;

#[derive(Parser)]
#[command(name = "saavnplay", about = "Search, play and download songs")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Search songs and print the results
    Search {
        /// Search text
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
    },
    /// Search, pick a result and save it as an MP3 file
    Download {
        /// Search text
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
        /// Target directory (defaults to the configured download directory)
        #[arg(long)]
        dir: Option<PathBuf>,
        /// Take the first result without asking
        #[arg(long)]
        first: bool,
    },
    /// Edit the configuration file interactively
    Config,
}

pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Some(Commands::Search { query }) => cmd_search(&query.join(" ")),
        Some(Commands::Download { query, dir, first }) => cmd_download(&query.join(" "), dir, first),
        Some(Commands::Config) => cmd_config(),
        None => {
            #[cfg(feature = "gui")]
            {
                crate::gui::launch(config::load_config())
            }
            #[cfg(not(feature = "gui"))]
            {
                bail!("built without the GUI; rebuild with `--features gui` or use a subcommand (see --help)");
            }
        }
    }
}

/// Runs a search the same way the GUI does. Not-found yields an empty list,
/// every other error message becomes an `Err`.
fn search(cfg: &Config, query: &str) -> Result<Vec<Song>> {
    let client = SaavnClient::new(&cfg.api)?;
    let mut view = ViewState::new();
    view.query = query.to_string();
    view.submit_search(&client);

    match view.error() {
        None => Ok(view.songs().to_vec()),
        Some(NOT_FOUND_ERROR) => {
            println!("{}", NOT_FOUND_ERROR);
            Ok(Vec::new())
        }
        Some(message) => bail!("{}", message),
    }
}

fn cmd_search(query: &str) -> Result<()> {
    let cfg = config::load_config();
    let songs = search(&cfg, query)?;
    if songs.is_empty() {
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["#", "Title", "Artists", "Playable", "ID"]);

    for (i, song) in songs.iter().enumerate() {
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(&song.name),
            Cell::new(song.display_artists()),
            Cell::new(if song.is_playable() { "yes" } else { "no" }),
            Cell::new(&song.id),
        ]);
    }

    println!("{table}");
    println!("\n{} results", songs.len());
    Ok(())
}

fn cmd_download(query: &str, dir: Option<PathBuf>, first: bool) -> Result<()> {
    let cfg = config::load_config();
    let songs = search(&cfg, query)?;
    if songs.is_empty() {
        return Ok(());
    }

    let index = if first {
        0
    } else {
        let mut items: Vec<String> = songs.iter().map(|s| s.summary()).collect();
        items.push("Cancel".to_string());

        let selection = Select::new()
            .with_prompt("Pick a track")
            .items(&items)
            .default(0)
            .interact()?;
        if selection >= songs.len() {
            println!("Cancelled.");
            return Ok(());
        }
        selection
    };

    let song = &songs[index];
    if !song.is_playable() {
        println!("No download URL available for {}", song.name);
        return Ok(());
    }

    let dir = dir
        .or_else(|| cfg.download.directory.clone())
        .unwrap_or_else(|| PathBuf::from("."));

    let client = SaavnClient::new(&cfg.api)?;
    match download::download_track(&client, &song.name, song.audio_url(), &dir) {
        Some(path) => {
            println!("Saved {}", path.display());
            Ok(())
        }
        None => bail!("download of '{}' failed (run with RUST_LOG=debug for details)", song.name),
    }
}

fn cmd_config() -> Result<()> {
    let mut cfg = config::load_config();

    println!("saavnplay settings (leave a field empty to unset it)\n");

    let base_url: String = Input::new()
        .with_prompt("API base URL")
        .with_initial_text(cfg.api.base_url.clone())
        .interact_text()?;

    let limit: String = Input::new()
        .with_prompt("Results per search")
        .with_initial_text(cfg.api.limit.map(|n| n.to_string()).unwrap_or_default())
        .allow_empty(true)
        .interact_text()?;

    let directory: String = Input::new()
        .with_prompt("Download directory")
        .with_initial_text(
            cfg.download
                .directory
                .as_ref()
                .map(|d| d.display().to_string())
                .unwrap_or_default(),
        )
        .allow_empty(true)
        .interact_text()?;

    let volume: String = Input::new()
        .with_prompt("Volume (0.0 - 1.0)")
        .with_initial_text(cfg.playback.volume.to_string())
        .interact_text()?;

    cfg.api.base_url = base_url.trim().to_string();
    cfg.api.limit = match limit.trim() {
        "" => None,
        s => Some(s.parse().map_err(|_| anyhow::anyhow!("not a number: {}", s))?),
    };
    cfg.download.directory = match directory.trim() {
        "" => None,
        s => Some(PathBuf::from(s)),
    };
    cfg.playback.volume = volume
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("not a volume: {}", volume))?;

    config::save_config(&cfg)?;
    println!("\nSettings saved!");
    Ok(())
}
