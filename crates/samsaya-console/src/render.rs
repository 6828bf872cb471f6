//! Terminal rendering of session events.

use std::io::{self, Write};

use colored::Colorize;
use samsaya_core::{Message, Role};

use crate::controller::SessionEvent;

/// How to bring the printed text of a streaming message up to a new snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delta<'a> {
    Append(&'a str),
    /// The snapshot no longer extends what was printed.
    Replace(&'a str),
}

pub fn delta<'a>(printed: &str, snapshot: &'a str) -> Delta<'a> {
    match snapshot.strip_prefix(printed) {
        Some(rest) => Delta::Append(rest),
        None => Delta::Replace(snapshot),
    }
}

pub struct TerminalRenderer<W: Write> {
    out: W,
    streaming_id: Option<String>,
    printed: String,
}

impl TerminalRenderer<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> TerminalRenderer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            streaming_id: None,
            printed: String::new(),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn handle(&mut self, event: &SessionEvent) -> io::Result<()> {
        match event {
            SessionEvent::MessageAdded(message) => self.message_added(message),
            SessionEvent::MessageUpdated { id, text } => self.message_updated(id, text),
            SessionEvent::MessageFinished { id, failed } => self.message_finished(id, *failed),
            SessionEvent::MessagesRemoved { ids } => {
                if !ids.is_empty() {
                    writeln!(self.out, "{}", "↻ regenerating last answer".dimmed())?;
                }
                Ok(())
            }
        }
    }

    fn message_added(&mut self, message: &Message) -> io::Result<()> {
        match message.role {
            Role::User => {
                writeln!(self.out, "{} {}", "you ›".cyan().bold(), message.text)?;
                for attachment in &message.attachments {
                    writeln!(
                        self.out,
                        "      {} {} ({})",
                        "+".dimmed(),
                        attachment.display_name(),
                        attachment.mime_type
                    )?;
                }
            }
            Role::Model => {
                write!(self.out, "{} ", "saṃśaya ›".magenta().bold())?;
                if message.streaming {
                    self.streaming_id = Some(message.id.clone());
                    self.printed.clear();
                } else {
                    writeln!(self.out, "{}", message.text)?;
                }
            }
        }
        self.out.flush()
    }

    fn message_updated(&mut self, id: &str, text: &str) -> io::Result<()> {
        if self.streaming_id.as_deref() != Some(id) {
            return Ok(());
        }
        match delta(&self.printed, text) {
            Delta::Append(rest) => write!(self.out, "{}", rest)?,
            Delta::Replace(all) => {
                writeln!(self.out)?;
                write!(self.out, "{}", all)?;
            }
        }
        self.printed = text.to_string();
        self.out.flush()
    }

    fn message_finished(&mut self, id: &str, failed: bool) -> io::Result<()> {
        if self.streaming_id.as_deref() != Some(id) {
            return Ok(());
        }
        if failed {
            if !self.printed.is_empty() {
                writeln!(self.out)?;
            }
            writeln!(self.out, "{}", crate::controller::SYSTEM_ERROR_TEXT.red())?;
        } else {
            writeln!(self.out)?;
        }
        self.streaming_id = None;
        self.printed.clear();
        self.out.flush()
    }
}

/// One-line listing of a message, used by `/history` and the numbered views.
pub fn summary_line(index: usize, message: &Message) -> String {
    let mut text: String = message.text.lines().next().unwrap_or_default().to_string();
    if text.chars().count() > 72 {
        text = text.chars().take(71).collect::<String>() + "…";
    }
    let time = message.created_at.with_timezone(&chrono::Local).format("%H:%M");
    format!("{:>3}. [{}] {}", index, time, text)
}
