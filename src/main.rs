mod cli;
mod config;
mod domain;
mod error;
mod infra;
mod media;
mod menu;
mod workflows;

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::{Cli, LogLevel};
use config::Settings;
use infra::anilist::AnilistClient;
use infra::cache::IdentifierCache;
use infra::jimaku::JimakuClient;
use media::ffsubsync::FfsubsyncTool;
use media::mpv::PlaybackLauncher;
use media::parser::PathParser;
use menu::FzfMenu;
use workflows::pipeline::{Pipeline, PipelineOptions};
use workflows::sync::SyncState;

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.log_level);

    match run(cli) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {e:#}");
            std::process::exit(1);
        }
    }
}

/// `RUST_LOG` wins over `--log-level` when set.
fn init_tracing(level: LogLevel) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.directive()));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn run(cli: Cli) -> Result<bool> {
    let settings = Settings::load(cli.token.clone())?;
    tracing::debug!("Using identifier cache {}", settings.cache_path.display());

    let mut cache = IdentifierCache::load(settings.cache_path.clone());
    tracing::debug!("{} cached AniList ID(s)", cache.len());
    let catalog = AnilistClient::new();
    let host = JimakuClient::new(settings.api_token.clone());
    let menu = FzfMenu::new(settings.menu_command.clone());
    let parser = PathParser::new(&settings.release_tokens, &settings.video_extensions);

    let options = PipelineOptions {
        dest: cli.dest.clone(),
        play: cli.play,
        sync: cli.sync,
        anilist_id: cli.anilist_id,
        recursive: cli.recursive,
    };
    let pipeline = Pipeline::new(
        parser,
        &catalog,
        &host,
        &menu,
        Arc::new(FfsubsyncTool::new(settings.sync_command.clone())),
        PlaybackLauncher::new(settings.player.clone()),
        options,
    );

    let mut report = pipeline.run(&cli.media_paths, &mut cache);

    for handle in report.background_syncs.drain(..) {
        if !handle.is_finished() {
            println!(
                "Waiting for background sync of {}...",
                handle.output_path().display()
            );
        }
        if handle.wait() == SyncState::Failed {
            println!("Background sync failed; the original subtitle is still available.");
        }
    }

    if report.downloaded.is_empty() {
        println!("No subtitle files were downloaded.");
    } else {
        println!("Downloaded {} subtitle file(s):", report.downloaded.len());
        for path in &report.downloaded {
            println!("  {}", path.display());
        }
    }
    if !report.failures.is_empty() {
        eprintln!("{} item(s) failed:", report.failures.len());
        for (path, e) in &report.failures {
            eprintln!("  {}: {e}", path.display());
        }
    }

    Ok(report.success())
}
