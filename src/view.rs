//! View binding
//!
//! Two renderers over the same snapshot: sanitized markup for embedding in
//! a page, and an incremental terminal renderer used by the binary. Neither
//! holds session state; they only read snapshots.

use crate::conversation::{ConversationBuffer, Message, Origin};
use crate::format;
use crate::runtime::SessionSnapshot;
use crate::session::SessionPhase;
use crate::transport::ChannelState;
use crossterm::style::Stylize;
use std::fmt::Write as _;
use std::io::{self, Write};

/// Render the conversation as a chat container.
///
/// Message text goes through [`format::render_markup`], so the output is
/// safe to inject.
pub fn render_markup(buffer: &ConversationBuffer) -> String {
    let mut html = String::from(r#"<div class="chat-container">"#);
    for message in buffer {
        let _ = write!(
            html,
            r#"<div class="message {}">{}</div>"#,
            message.origin().as_str(),
            format::render_markup(message.text())
        );
    }
    html.push_str("</div>");
    html
}

/// Incremental terminal renderer.
///
/// Prints only what changed since the previous snapshot: newly appended
/// messages, phase changes and channel drops. Snapshots may coalesce, so a
/// reset is recognized by the session's reset counter rather than by the
/// buffer length; after one, printing restarts from the first message.
#[derive(Debug, Default)]
pub struct TerminalView {
    rendered: usize,
    resets: Option<u64>,
    phase: Option<SessionPhase>,
    channel: Option<ChannelState>,
}

impl TerminalView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn render(&mut self, snapshot: &SessionSnapshot, out: &mut impl Write) -> io::Result<()> {
        let state = &snapshot.state;

        if self.resets != Some(state.resets) {
            if self.resets.is_some() {
                self.rendered = 0;
                self.phase = None;
            }
            self.resets = Some(state.resets);
        }

        if self.phase != Some(state.phase) {
            self.phase = Some(state.phase);
            match state.phase {
                SessionPhase::Idle => writeln!(out, "{}", "Enter a video URL to start.".bold())?,
                SessionPhase::Submitting => writeln!(out, "{}", "Submitting video...".dim())?,
                SessionPhase::Active => {
                    let headline = state
                        .content
                        .as_ref()
                        .and_then(|c| c.headline())
                        .unwrap_or("Ask a question about the video.");
                    writeln!(out, "{}", headline.bold())?;
                    writeln!(out, "{}", "Commands: /reset, /transcript, /quit".dim())?;
                }
            }
        }

        if self.channel != Some(snapshot.channel) {
            // Only report drops after the first snapshot
            if self.channel.is_some() && snapshot.channel == ChannelState::Disconnected {
                writeln!(out, "{}", "Push channel disconnected; replies will not arrive.".red())?;
            }
            self.channel = Some(snapshot.channel);
        }

        // Messages pushed before the chat opens are held back until it does
        if state.phase.shows_chat() {
            for message in &state.buffer.messages()[self.rendered..] {
                write_message(message, out)?;
            }
            self.rendered = state.buffer.len();
        }

        out.flush()
    }
}

fn write_message(message: &Message, out: &mut impl Write) -> io::Result<()> {
    let text = format::render_plain(message.text());
    match message.origin() {
        Origin::User => writeln!(out, "{} {}", "you:".cyan().bold(), text),
        Origin::System => writeln!(out, "{} {}", "bot:".green().bold(), text),
    }
}
