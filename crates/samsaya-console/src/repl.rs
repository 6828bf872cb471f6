//! Interactive chat loop.

use std::future::Future;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use colored::Colorize;
use samsaya_core::{queries, ChatOptions, Message, SyllabusData};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use crate::actions::MessageActions;
use crate::attachments::ACCEPT_HINT;
use crate::audio::{AudioCapture, CaptureState};
use crate::capabilities::Notifier;
use crate::controller::{ConversationController, RejectReason, SessionEvent, SubmitOutcome};
use crate::platform::FileRecorder;
use crate::render::{summary_line, TerminalRenderer};

const HELP: &str = "\
Commands:
  /help               Show this help
  /attach <file>      Attach a file to the next message
  /detach <n>         Remove pending attachment n
  /files              List pending attachments
  /thinking           Toggle deep reasoning mode
  /search             Toggle web search grounding
  /regenerate         Replace the last answer
  /translate [n]      Translate answer n (default: last)
  /copy [n]           Copy answer n to the clipboard
  /share [n]          Share answer n
  /listen [n]         Read answer n aloud
  /record <clip>      Start speech capture from an audio clip
  /stop               Stop capture and transcribe into the draft
  /syllabus           Show the syllabus
  /pick <n>           Ask about syllabus entry n
  /history            List previous queries
  /rerun <n>          Re-run query n
  /suggest [n]        Show or ask a suggested inquiry
  /quit               Leave
An empty line sends the current draft.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Attach(PathBuf),
    Detach(usize),
    Files,
    Thinking,
    Search,
    Regenerate,
    Translate(Option<usize>),
    Copy(Option<usize>),
    Share(Option<usize>),
    Listen(Option<usize>),
    Record(PathBuf),
    Stop,
    Syllabus,
    Pick(usize),
    History,
    Rerun(usize),
    Suggest(Option<usize>),
    Quit,
}

fn parse_index(arg: &str) -> Result<usize, String> {
    match arg.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(format!("Expected a positive number, got '{}'", arg)),
    }
}

fn optional_index(arg: &str) -> Result<Option<usize>, String> {
    if arg.is_empty() {
        Ok(None)
    } else {
        parse_index(arg).map(Some)
    }
}

fn required<'a>(arg: &'a str, usage: &str) -> Result<&'a str, String> {
    if arg.is_empty() {
        Err(format!("Usage: {}", usage))
    } else {
        Ok(arg)
    }
}

/// Parse a `/command [arg]` line. Numbers are 1-based as displayed.
pub fn parse_command(line: &str) -> Result<Command, String> {
    let line = line.trim();
    let (name, arg) = match line.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (line, ""),
    };

    match name {
        "/help" | "/?" => Ok(Command::Help),
        "/attach" => Ok(Command::Attach(PathBuf::from(required(arg, "/attach <file>")?))),
        "/detach" => parse_index(required(arg, "/detach <n>")?).map(Command::Detach),
        "/files" => Ok(Command::Files),
        "/thinking" => Ok(Command::Thinking),
        "/search" => Ok(Command::Search),
        "/regenerate" => Ok(Command::Regenerate),
        "/translate" => optional_index(arg).map(Command::Translate),
        "/copy" => optional_index(arg).map(Command::Copy),
        "/share" => optional_index(arg).map(Command::Share),
        "/listen" => optional_index(arg).map(Command::Listen),
        "/record" => Ok(Command::Record(PathBuf::from(required(arg, "/record <clip>")?))),
        "/stop" => Ok(Command::Stop),
        "/syllabus" => Ok(Command::Syllabus),
        "/pick" => parse_index(required(arg, "/pick <n>")?).map(Command::Pick),
        "/history" => Ok(Command::History),
        "/rerun" => parse_index(required(arg, "/rerun <n>")?).map(Command::Rerun),
        "/suggest" => optional_index(arg).map(Command::Suggest),
        "/quit" | "/exit" => Ok(Command::Quit),
        other => Err(format!("Unknown command '{}'. Type /help.", other)),
    }
}

/// A plain line is sent when it, the draft, or the pending attachments carry something.
pub fn should_send(line: &str, draft: &str, pending_attachments: usize) -> bool {
    !line.trim().is_empty() || !draft.trim().is_empty() || pending_attachments > 0
}

/// Merge the typed line into the draft and take the result as the outgoing text.
pub fn compose_message(draft: &mut String, line: &str) -> String {
    let line = line.trim();
    if !line.is_empty() {
        crate::audio::append_to_draft(draft, line);
    }
    std::mem::take(draft)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyllabusEntry {
    pub label: String,
    pub query: String,
}

/// Every selectable syllabus item with the query it submits.
pub fn syllabus_entries(data: &SyllabusData) -> Vec<SyllabusEntry> {
    let mut entries = Vec::new();

    for source in &data.primary_sources_en {
        let label = match &source.section {
            Some(section) => format!("{} ({})", source.text, section),
            None => source.text.clone(),
        };
        entries.push(SyllabusEntry {
            label,
            query: queries::analyze_primary(source),
        });
    }
    for source in &data.primary_sources_bn {
        entries.push(SyllabusEntry {
            label: format!(
                "{} - {}",
                source.text,
                source.author.as_deref().unwrap_or_default()
            ),
            query: queries::explain_bengali_primary(source),
        });
    }
    for source in &data.secondary_sources {
        entries.push(SyllabusEntry {
            label: format!("{}: {}", source.author, source.focus),
            query: queries::summarize_secondary(source),
        });
    }
    for term in &data.key_terms {
        entries.push(SyllabusEntry {
            label: term.clone(),
            query: queries::define_term(term),
        });
    }

    entries
}

/// Finished model answers in session order.
fn answers(messages: &[Message]) -> Vec<&Message> {
    messages
        .iter()
        .filter(|m| !m.is_user() && !m.streaming)
        .collect()
}

pub struct Repl {
    controller: ConversationController,
    events: mpsc::UnboundedReceiver<SessionEvent>,
    renderer: TerminalRenderer<io::Stdout>,
    actions: MessageActions,
    capture: AudioCapture<FileRecorder>,
    notifier: Arc<dyn Notifier>,
    options: ChatOptions,
    draft: String,
}

impl Repl {
    pub fn new(
        controller: ConversationController,
        events: mpsc::UnboundedReceiver<SessionEvent>,
        actions: MessageActions,
        notifier: Arc<dyn Notifier>,
        options: ChatOptions,
    ) -> Self {
        Self {
            controller,
            events,
            renderer: TerminalRenderer::stdout(),
            actions,
            capture: AudioCapture::new(FileRecorder::new()),
            notifier,
            options,
            draft: String::new(),
        }
    }

    pub async fn run(mut self) -> anyhow::Result<()> {
        println!("{}", "📜 Gemini-Saṃśaya Research Console".cyan().bold());
        println!("{}", samsaya_core::syllabus().core_concept.dimmed());
        println!("{}", "Type /help for commands, /quit to leave".dimmed());
        self.print_suggestions();
        println!();

        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            self.prompt()?;
            let Some(line) = lines.next_line().await? else {
                break;
            };
            let line = line.trim().to_string();

            if line.starts_with('/') {
                match parse_command(&line) {
                    Ok(Command::Quit) => break,
                    Ok(command) => self.execute(command).await?,
                    Err(message) => println!("{}", message.yellow()),
                }
                continue;
            }

            if !should_send(&line, &self.draft, self.controller.pending_attachments().len()) {
                continue;
            }

            let text = compose_message(&mut self.draft, &line);
            let controller = self.controller.clone();
            let options = self.options;
            let outcome = self.drive(controller.submit(&text, options)).await;
            self.report(outcome, Some(text));
        }

        println!("{}", "👋 Goodbye!".cyan());
        Ok(())
    }

    fn prompt(&self) -> io::Result<()> {
        let mut flags = Vec::new();
        if self.options.thinking {
            flags.push("thinking");
        }
        if self.options.search {
            flags.push("search");
        }
        let pending = self.controller.pending_attachments().len();
        if pending > 0 {
            println!("{}", format!("📎 {} attachment(s) pending", pending).dimmed());
        }
        if !self.draft.is_empty() {
            println!("{} {}", "draft:".dimmed(), self.draft);
        }
        if self.capture.state() == CaptureState::Recording {
            println!("{}", "🎙 recording... /stop to transcribe".red());
        }

        if flags.is_empty() {
            print!("{} ", "You:".cyan().bold());
        } else {
            print!("{} {} ", format!("[{}]", flags.join(",")).dimmed(), "You:".cyan().bold());
        }
        io::stdout().flush()
    }

    /// Run a turn while rendering its events as they arrive.
    async fn drive<F>(&mut self, turn: F) -> SubmitOutcome
    where
        F: Future<Output = SubmitOutcome>,
    {
        tokio::pin!(turn);
        loop {
            tokio::select! {
                outcome = &mut turn => {
                    while let Ok(event) = self.events.try_recv() {
                        self.render(&event);
                    }
                    return outcome;
                }
                Some(event) = self.events.recv() => self.render(&event),
            }
        }
    }

    fn render(&mut self, event: &SessionEvent) {
        if let Err(e) = self.renderer.handle(event) {
            log::warn!("Failed to render event: {}", e);
        }
    }

    /// Rejected input goes back into the draft so nothing typed is lost.
    fn report(&mut self, outcome: SubmitOutcome, text: Option<String>) {
        match outcome {
            SubmitOutcome::Completed { .. } => {}
            SubmitOutcome::Failed { error, .. } => log::debug!("Turn failed: {}", error),
            SubmitOutcome::Rejected(reason) => {
                let message = match reason {
                    RejectReason::Empty => "Nothing to send",
                    RejectReason::InFlight => "Still waiting for the previous answer",
                    RejectReason::NothingToRegenerate => "No question to regenerate",
                    RejectReason::UnknownEntry => "No such entry",
                };
                println!("{}", message.yellow());
                if let Some(text) = text {
                    if self.draft.is_empty() {
                        self.draft = text;
                    }
                }
            }
        }
    }

    fn answer_text(&self, index: Option<usize>) -> Option<String> {
        let messages = self.controller.messages();
        let answers = answers(&messages);
        let picked = match index {
            Some(n) => answers.get(n - 1).copied(),
            None => answers.last().copied(),
        };
        match picked {
            Some(message) => Some(message.text.clone()),
            None => {
                println!("{}", "No such answer".yellow());
                None
            }
        }
    }

    fn print_suggestions(&self) {
        if !self.controller.is_empty() {
            return;
        }
        println!("{}", "Suggested inquiries:".cyan());
        for (i, prompt) in queries::SUGGESTED_INQUIRIES.iter().enumerate() {
            println!("  {}. {}", i + 1, prompt);
        }
    }

    async fn execute(&mut self, command: Command) -> anyhow::Result<()> {
        let options = self.options;
        let controller = self.controller.clone();

        match command {
            Command::Help => println!("{}", HELP),
            Command::Quit => {}
            Command::Attach(path) => match controller.attach_file(&path).await {
                Ok(attachment) => println!(
                    "{}",
                    format!("📎 Attached {} ({})", attachment.display_name(), attachment.mime_type)
                        .green()
                ),
                Err(e) => println!("{}", format!("❌ {} (accepts {})", e, ACCEPT_HINT).red()),
            },
            Command::Detach(n) => match controller.detach(n - 1) {
                Some(attachment) => println!("Removed {}", attachment.display_name()),
                None => println!("{}", "No such attachment".yellow()),
            },
            Command::Files => {
                let pending = controller.pending_attachments();
                if pending.is_empty() {
                    println!("{}", "No pending attachments".dimmed());
                }
                for (i, attachment) in pending.iter().enumerate() {
                    println!("  {}. {} ({})", i + 1, attachment.display_name(), attachment.mime_type);
                }
            }
            Command::Thinking => {
                self.options.thinking = !self.options.thinking;
                println!("Deep reasoning {}", on_off(self.options.thinking));
            }
            Command::Search => {
                self.options.search = !self.options.search;
                println!("Web search {}", on_off(self.options.search));
            }
            Command::Regenerate => {
                let outcome = self.drive(controller.regenerate(options)).await;
                self.report(outcome, None);
            }
            Command::Translate(index) => {
                if let Some(text) = self.answer_text(index) {
                    let outcome = self.drive(controller.translate(&text, options)).await;
                    self.report(outcome, None);
                }
            }
            Command::Copy(index) => {
                if let Some(text) = self.answer_text(index) {
                    if self.actions.copy(&text) {
                        println!("{}", "📋 Copied".green());
                    }
                }
            }
            Command::Share(index) => {
                if let Some(text) = self.answer_text(index) {
                    self.actions.share(&text).await;
                }
            }
            Command::Listen(index) => {
                if let Some(text) = self.answer_text(index) {
                    println!("{}", "🔊 Synthesizing speech...".dimmed());
                    self.actions.listen(&text).await;
                }
            }
            Command::Record(clip) => {
                self.capture.recorder_mut().set_clip(clip);
                self.capture.start_recording(self.notifier.as_ref()).await;
            }
            Command::Stop => {
                if self.capture.state() != CaptureState::Recording {
                    println!("{}", "Not recording".yellow());
                } else {
                    println!("{}", "✍ Transcribing...".dimmed());
                    let client = controller.client();
                    self.capture
                        .stop_recording(client.as_ref(), &mut self.draft, self.notifier.as_ref())
                        .await;
                }
            }
            Command::Syllabus => print_syllabus(samsaya_core::syllabus()),
            Command::Pick(n) => {
                let entries = syllabus_entries(samsaya_core::syllabus());
                match entries.get(n - 1) {
                    Some(entry) => {
                        let outcome = self.drive(controller.submit_query(&entry.query, options)).await;
                        self.report(outcome, None);
                    }
                    None => println!("{}", "No such syllabus entry".yellow()),
                }
            }
            Command::History => {
                let queries = controller.user_queries();
                if queries.is_empty() {
                    println!("{}", "No queries yet".dimmed());
                }
                for (i, message) in queries.iter().enumerate() {
                    println!("{}", summary_line(i + 1, message));
                }
            }
            Command::Rerun(n) => {
                let outcome = self.drive(controller.rerun_history(n - 1, options)).await;
                self.report(outcome, None);
            }
            Command::Suggest(None) => {
                for (i, prompt) in queries::SUGGESTED_INQUIRIES.iter().enumerate() {
                    println!("  {}. {}", i + 1, prompt);
                }
            }
            Command::Suggest(Some(n)) => match queries::SUGGESTED_INQUIRIES.get(n - 1) {
                Some(prompt) => {
                    let outcome = self.drive(controller.submit_query(prompt, options)).await;
                    self.report(outcome, None);
                }
                None => println!("{}", "No such suggestion".yellow()),
            },
        }

        Ok(())
    }
}

fn on_off(enabled: bool) -> colored::ColoredString {
    if enabled {
        "on".green()
    } else {
        "off".dimmed()
    }
}

/// Section titles with their entry counts, in menu order.
pub fn syllabus_sections(data: &SyllabusData) -> [(&'static str, usize); 4] {
    [
        ("Primary sources (English)", data.primary_sources_en.len()),
        ("Primary sources (Bengali)", data.primary_sources_bn.len()),
        ("Secondary sources", data.secondary_sources.len()),
        ("Key terms", data.key_terms.len()),
    ]
}

pub fn print_syllabus(data: &SyllabusData) {
    println!("{}", data.project_title.cyan().bold());
    println!("{}", data.core_concept.dimmed());

    let entries = syllabus_entries(data);
    let mut numbered = entries.iter().enumerate();

    for (title, count) in syllabus_sections(data) {
        if count == 0 {
            continue;
        }
        println!("{}", title.yellow());
        for (i, entry) in numbered.by_ref().take(count) {
            println!("  {:>2}. {}", i + 1, entry.label);
        }
    }
}
