mod render;

use std::{io::Write, path::PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use client_core::{load_settings, BackendHttp, SessionController, SocketIoConnector};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use render::TranscriptView;

/// Describe a Minecraft mod, watch it being generated, then refine it in chat.
#[derive(Parser, Debug)]
#[command(name = "modgen")]
struct Args {
    /// Initial mod description. Read from stdin when omitted.
    prompt: Option<String>,
    #[arg(long)]
    backend_url: Option<String>,
    #[arg(long)]
    author: Option<String>,
    #[arg(long)]
    mc_version: Option<String>,
    /// Save every download link the backend returns into this directory.
    #[arg(long)]
    download_dir: Option<PathBuf>,
    #[arg(long)]
    skip_health_check: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let args = Args::parse();

    let mut settings = load_settings();
    if let Some(url) = args.backend_url.clone() {
        settings.backend_url = url;
    }
    let author = args.author.clone().or_else(|| settings.default_author.clone());
    let mc_version = args.mc_version.clone().or_else(|| settings.mc_version.clone());

    let http = BackendHttp::new(settings.backend_url.clone());
    if !args.skip_health_check {
        match http.health().await {
            Ok(true) => info!(backend_url = %settings.backend_url, "backend healthy"),
            Ok(false) => warn!(backend_url = %settings.backend_url, "backend reported not ok"),
            Err(err) => warn!(%err, "backend health check failed"),
        }
    }

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let prompt = match args.prompt.clone() {
        Some(prompt) => prompt,
        None => {
            prompt_marker("describe your mod")?;
            stdin
                .next_line()
                .await
                .context("failed to read prompt")?
                .unwrap_or_default()
        }
    };
    if prompt.trim().is_empty() {
        bail!("a mod description is required");
    }

    let connector = SocketIoConnector::new(settings.reconnect, settings.event_buffer);
    let mut controller = SessionController::spawn(&connector, &settings)?;
    controller.start_run(prompt, mc_version, author)?;

    let result = drive(&controller, &http, args.download_dir.as_deref(), &mut stdin).await;
    controller.shutdown().await;
    result
}

async fn drive<R>(
    controller: &SessionController,
    http: &BackendHttp,
    download_dir: Option<&std::path::Path>,
    stdin: &mut tokio::io::Lines<R>,
) -> Result<()>
where
    R: tokio::io::AsyncBufRead + Unpin,
{
    let mut snapshots = controller.subscribe();
    let mut view = TranscriptView::default();

    loop {
        let snapshot = snapshots.borrow_and_update().clone();
        let update = view.update(&snapshot);
        for line in &update.lines {
            println!("{line}");
        }
        if let Some(dir) = download_dir {
            for url in &update.downloads {
                match http.download(url, dir).await {
                    Ok(path) => println!("  saved: {}", path.display()),
                    Err(err) => warn!(%err, url = %url, "download failed"),
                }
            }
        }

        if snapshot.accepts_user_turn() {
            prompt_marker("follow-up (empty line to quit)")?;
            let line = tokio::select! {
                line = stdin.next_line() => line.context("failed to read stdin")?,
                _ = tokio::signal::ctrl_c() => return Ok(()),
            };
            match line {
                Some(line) if !line.trim().is_empty() => {
                    controller.send_chat(line)?;
                    tokio::select! {
                        turn = snapshots.wait_for(|s| !s.awaiting_user) => {
                            if turn.is_err() {
                                return Ok(());
                            }
                        }
                        _ = tokio::signal::ctrl_c() => return Ok(()),
                    }
                }
                _ => return Ok(()),
            }
        } else {
            tokio::select! {
                changed = snapshots.changed() => {
                    if changed.is_err() {
                        return Ok(());
                    }
                }
                _ = tokio::signal::ctrl_c() => return Ok(()),
            }
        }
    }
}

fn prompt_marker(label: &str) -> Result<()> {
    let mut stdout = std::io::stdout();
    write!(stdout, "{label}> ")?;
    stdout.flush()?;
    Ok(())
}
