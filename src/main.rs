//! clipchat - chat about a video from the terminal
//!
//! Submits a video URL to the backend, then relays questions to it while
//! answers arrive over a push channel.

mod config;
mod conversation;
mod format;
mod runtime;
mod session;
mod transport;
mod view;

use config::ClientConfig;
use crossterm::style::Stylize;
use runtime::spawn_session;
use session::SessionPhase;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_stream::StreamExt;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use transport::{ChannelConnection, HttpTransport};
use view::TerminalView;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging; stdout belongs to the chat
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "clipchat=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let config = ClientConfig::from_env()?;
    tracing::info!(
        backend = %config.backend_url,
        channel = %config.channel_url,
        send_path = ?config.send_path,
        submit_policy = ?config.submit_policy,
        "Starting clipchat"
    );

    let http = Arc::new(HttpTransport::new(&config.backend_url, config.http_timeout)?);
    tracing::debug!(base_url = %http.base_url(), timeout = ?config.http_timeout, "HTTP transport ready");
    let channel = ChannelConnection::global(&config.channel_url);
    if let Err(e) = channel.connect().await {
        tracing::warn!(error = %e, url = %channel.url(), "Push channel unavailable, replies will not arrive");
    }

    let handle = spawn_session(config.session_context(), http, Arc::clone(&channel));

    let mut updates = handle.updates();
    let renderer = tokio::spawn(async move {
        let mut terminal = TerminalView::new();
        while let Some(snapshot) = updates.next().await {
            if let Err(e) = terminal.render(&snapshot, &mut std::io::stdout().lock()) {
                tracing::error!(error = %e, "Failed to draw");
                break;
            }
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            "/quit" => break,
            "/reset" => handle.reset().await?,
            "/transcript" => {
                println!("{}", view::render_markup(&handle.snapshot().state.buffer));
            }
            _ => match handle.snapshot().state.phase {
                SessionPhase::Idle => handle.submit(line).await?,
                SessionPhase::Submitting => {
                    println!("{}", "Still processing the video, hold on.".dim());
                }
                SessionPhase::Active => {
                    handle.set_input(line.as_str()).await?;
                    handle.send(line).await?;
                }
            },
        }
    }

    tracing::info!("Shutting down");
    channel.shutdown();
    drop(handle);
    renderer.abort();

    Ok(())
}
