//! Terminal front end: the interactive `chat` loop plus the one-shot `ask`
//! and `inspect` commands.
//!
//! The shell only collects inputs and prints [`Outcome`]s; every decision
//! about what to run lives in [`crate::session`]. Reader and writer are
//! generic so the loop can be driven from tests.

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use crate::chunk::chunk_text;
use crate::config::Config;
use crate::error::InputField;
use crate::extract;
use crate::history::ChatHistory;
use crate::models::{Credential, Upload};
use crate::session::{self, Advisory, Interaction, Outcome, Pipeline, SessionState};

const HELP: &str = "\
Type a question to ask about the open document.

Commands:
  :open PATH    upload a PDF (replaces the current one)
  :key VALUE    set the API key for this session
  :history      show recent questions and answers
  :reset        clear the chat history
  :help         show this message
  :quit         leave the session";

/// One line of chat input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Open(PathBuf),
    Key(String),
    History,
    Reset,
    Help,
    Quit,
    Ask(String),
    Unknown(String),
}

/// Parse a chat line. Blank lines yield `None`.
pub fn parse_line(line: &str) -> Option<Command> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let Some(rest) = line.strip_prefix(':') else {
        return Some(Command::Ask(line.to_string()));
    };
    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };
    let cmd = match name {
        "open" if !arg.is_empty() => Command::Open(PathBuf::from(arg)),
        "key" => Command::Key(arg.to_string()),
        "history" => Command::History,
        "reset" => Command::Reset,
        "help" | "h" | "?" => Command::Help,
        "quit" | "q" | "exit" => Command::Quit,
        _ => Command::Unknown(line.to_string()),
    };
    Some(cmd)
}

/// Read a PDF from disk into an [`Upload`] named after the file.
pub fn load_document(path: &Path) -> Result<Upload> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok(Upload::new(name, bytes))
}

/// Print the answer, then the last `window` exchanges.
pub fn print_outcome(
    out: &mut impl Write,
    outcome: &Outcome,
    history: &ChatHistory,
    window: usize,
) -> Result<()> {
    match outcome {
        Outcome::Answered { answer, .. } => {
            writeln!(out, "{}", answer.trim_end())?;
            writeln!(out)?;
            print_history(out, history, window)?;
        }
        Outcome::Advisory(advisories) => print_advisories(out, advisories)?,
        Outcome::Failed(message) => writeln!(out, "Error: {}", message)?,
    }
    Ok(())
}

pub fn print_history(out: &mut impl Write, history: &ChatHistory, window: usize) -> Result<()> {
    let recent = history.recent(window);
    if recent.is_empty() {
        writeln!(out, "(no chat history)")?;
        return Ok(());
    }
    writeln!(out, "Chat history:")?;
    for entry in recent {
        writeln!(out, "User: {}", entry.query)?;
        writeln!(out, "Bot: {}", entry.answer.trim_end())?;
        writeln!(out, "---")?;
    }
    Ok(())
}

fn print_advisories(out: &mut impl Write, advisories: &[Advisory]) -> Result<()> {
    for advisory in advisories {
        writeln!(out, "! {}", advisory)?;
    }
    Ok(())
}

/// Interactive session over `input`/`out` until `:quit` or end of input.
pub async fn run_chat<R: BufRead, W: Write>(
    pipeline: &Pipeline,
    mut credential: Option<Credential>,
    mut document: Option<Upload>,
    input: R,
    mut out: W,
) -> Result<()> {
    let window = pipeline.config().history.window;
    let mut state = SessionState::new();

    writeln!(out, "PDF Q&A. Type :help for commands.")?;
    if document.is_some() && credential.is_some() {
        state = prepare(pipeline, state, &credential, &document, &mut out).await?;
    }

    for line in input.lines() {
        let line = line.context("Failed to read input")?;
        let Some(command) = parse_line(&line) else {
            continue;
        };
        match command {
            Command::Quit => break,
            Command::Help => writeln!(out, "{}", HELP)?,
            Command::History => print_history(&mut out, &state.history, window)?,
            Command::Reset => {
                state = session::handle_reset(state);
                writeln!(out, "Chat history cleared.")?;
            }
            Command::Key(value) => {
                credential = Credential::new(value);
                if credential.is_some() {
                    writeln!(out, "API key set.")?;
                } else {
                    print_advisories(&mut out, &[Advisory::Missing(InputField::Credential)])?;
                }
            }
            Command::Open(path) => match load_document(&path) {
                Ok(upload) => {
                    writeln!(out, "Opened {}.", upload.name)?;
                    document = Some(upload);
                    if credential.is_some() {
                        state = prepare(pipeline, state, &credential, &document, &mut out).await?;
                    }
                }
                Err(e) => writeln!(out, "Error: {:#}", e)?,
            },
            Command::Ask(query) => {
                let interaction = Interaction::new()
                    .credential(credential.clone())
                    .document(document.clone())
                    .query(query);
                let (next, outcome) = session::handle_query(pipeline, state, interaction).await;
                state = next;
                print_outcome(&mut out, &outcome, &state.history, window)?;
            }
            Command::Unknown(line) => {
                writeln!(out, "Unknown command: {} (try :help)", line)?;
            }
        }
        out.flush()?;
    }
    Ok(())
}

/// Run the pipeline without a query so the document is indexed up front.
async fn prepare(
    pipeline: &Pipeline,
    state: SessionState,
    credential: &Option<Credential>,
    document: &Option<Upload>,
    out: &mut impl Write,
) -> Result<SessionState> {
    let interaction = Interaction::new()
        .credential(credential.clone())
        .document(document.clone());
    let (state, outcome) = session::handle_query(pipeline, state, interaction).await;
    match &outcome {
        Outcome::Advisory(advisories)
            if advisories.as_slice() == [Advisory::Missing(InputField::Query)] =>
        {
            if let Some(doc) = state.documents.current() {
                if doc.has_no_text() {
                    print_advisories(out, &[Advisory::NoExtractableText])?;
                } else {
                    writeln!(
                        out,
                        "Indexed {}: {} pages, {} chunks.",
                        doc.name,
                        doc.pages,
                        doc.index.len()
                    )?;
                }
            }
        }
        other => print_outcome(out, other, &state.history, pipeline.config().history.window)?,
    }
    Ok(state)
}

/// One interaction from the command line. Fails unless an answer was produced.
pub async fn run_ask(
    pipeline: &Pipeline,
    credential: Option<Credential>,
    path: &Path,
    question: &str,
    out: &mut impl Write,
) -> Result<()> {
    let upload = load_document(path)?;
    let interaction = Interaction::new()
        .credential(credential)
        .document(Some(upload))
        .query(question);
    let (_, outcome) = session::handle_query(pipeline, SessionState::new(), interaction).await;
    match outcome {
        Outcome::Answered { answer, .. } => {
            writeln!(out, "{}", answer.trim_end())?;
            Ok(())
        }
        Outcome::Advisory(advisories) => {
            print_advisories(out, &advisories)?;
            bail!("No answer produced")
        }
        Outcome::Failed(message) => bail!(message),
    }
}

/// Extract and chunk a PDF locally and report what the pipeline would index.
pub fn run_inspect(config: &Config, path: &Path, out: &mut impl Write) -> Result<()> {
    let upload = load_document(path)?;
    let id = upload.id();
    let pages = extract::extract_pages(&upload.bytes)?;
    let text = extract::join_pages(&pages);
    let chunks = chunk_text(&id, &text, &config.chunking);

    writeln!(out, "File:       {}", upload.name)?;
    writeln!(out, "Id:         {}", id.short())?;
    writeln!(out, "Pages:      {}", pages.len())?;
    writeln!(out, "Characters: {}", text.chars().count())?;
    writeln!(
        out,
        "Chunks:     {} (size {}, overlap {})",
        chunks.len(),
        config.chunking.chunk_size,
        config.chunking.chunk_overlap
    )?;
    for chunk in &chunks {
        let preview: String = chunk.text.chars().take(60).collect();
        writeln!(
            out,
            "  [{}] {} chars: {}",
            chunk.chunk_index,
            chunk.text.chars().count(),
            preview.replace('\n', " ")
        )?;
    }
    if chunks.is_empty() {
        print_advisories(out, &[Advisory::NoExtractableText])?;
    }
    Ok(())
}
