//! View derivation and rendering.
//!
//! [`derive_view`] turns the controller's `(query, state)` into a
//! [`QueryView`]: what may be shown and which actions are enabled.
//! Presenters then write that view out as text or JSON. Everything here is a
//! pure function of its inputs; rendering the same view twice gives the same
//! output.
//!
//! Passage text travels with every [`SourceView`] but the text renderer only
//! prints it for passages revealed in the [`Disclosure`].

use serde::Serialize;
use std::collections::BTreeSet;
use std::io::Write;

use crate::config::OutputFormat;
use crate::controller::InteractionState;
use crate::models::QueryResult;

pub const CALL_TO_ACTION: &str = "Ask a question to get answers from your documents.";
pub const BUSY_LABEL: &str = "Searching...";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryView {
    pub query: String,
    pub input_editable: bool,
    pub submit_enabled: bool,
    pub busy: bool,
    pub body: ViewBody,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ViewBody {
    CallToAction { prompt: String },
    Busy { label: String },
    Answer { answer: String, sources: Vec<SourceView> },
    Notice { message: String },
}

/// One source as displayed, in the order the service ranked it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceView {
    /// 1-based position in the result.
    pub rank: usize,
    pub label: String,
    pub document_name: String,
    pub document_type: String,
    pub chunk_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_number: Option<u32>,
    pub passage: String,
}

pub fn derive_view(query: &str, state: &InteractionState) -> QueryView {
    let busy = matches!(state, InteractionState::Loading);
    let body = match state {
        InteractionState::Idle => ViewBody::CallToAction {
            prompt: CALL_TO_ACTION.to_string(),
        },
        InteractionState::Loading => ViewBody::Busy {
            label: BUSY_LABEL.to_string(),
        },
        InteractionState::Succeeded(result) => answer_body(result),
        InteractionState::Failed { message } => ViewBody::Notice {
            message: message.clone(),
        },
    };

    QueryView {
        query: query.to_string(),
        input_editable: !busy,
        submit_enabled: !busy && !query.trim().is_empty(),
        busy,
        body,
    }
}

fn answer_body(result: &QueryResult) -> ViewBody {
    let sources = result
        .sources
        .iter()
        .enumerate()
        .map(|(i, s)| SourceView {
            rank: i + 1,
            label: s.label(),
            document_name: s.document_name.clone(),
            document_type: s.document_type.clone(),
            chunk_id: s.chunk_id.clone(),
            page_number: s.page_number,
            passage: s.text_content.clone(),
        })
        .collect();

    ViewBody::Answer {
        answer: result.answer.clone(),
        sources,
    }
}

/// Which passages the reader has asked to see. Ranks are 1-based.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Disclosure {
    all: bool,
    revealed: BTreeSet<usize>,
}

impl Disclosure {
    pub fn collapsed() -> Self {
        Self::default()
    }

    pub fn all() -> Self {
        Self {
            all: true,
            revealed: BTreeSet::new(),
        }
    }

    pub fn reveal(&mut self, rank: usize) {
        self.revealed.insert(rank);
    }

    pub fn reveal_all(&mut self) {
        self.all = true;
    }

    pub fn is_revealed(&self, rank: usize) -> bool {
        self.all || self.revealed.contains(&rank)
    }
}

/// Render a view as human-readable text.
pub fn render_text(view: &QueryView, disclosure: &Disclosure) -> String {
    let mut out = String::new();

    match &view.body {
        ViewBody::CallToAction { prompt } => {
            out.push_str(prompt);
            out.push('\n');
        }
        ViewBody::Busy { label } => {
            out.push_str(label);
            out.push('\n');
        }
        ViewBody::Notice { message } => {
            out.push_str(message);
            out.push('\n');
        }
        ViewBody::Answer { answer, sources } => {
            out.push_str("Answer:\n");
            // Keep the service's line breaks, blank lines included.
            for line in answer.split('\n') {
                push_indented(&mut out, 2, line.trim_end_matches('\r'));
            }
            out.push('\n');

            if sources.is_empty() {
                out.push_str("Sources: none\n");
                return out;
            }

            out.push_str("Sources:\n");
            let mut hidden = 0;
            for source in sources {
                let mut heading = format!("[{}] {}", source.rank, source.label);
                if !source.document_type.is_empty() {
                    heading.push_str(&format!(" · {}", source.document_type));
                }
                push_indented(&mut out, 2, &heading);

                if disclosure.is_revealed(source.rank) {
                    for line in source.passage.split('\n') {
                        push_indented(&mut out, 6, line.trim_end_matches('\r'));
                    }
                } else {
                    hidden += 1;
                }
            }
            if hidden > 0 {
                out.push_str(&format!(
                    "\n{} passage(s) hidden; reveal with --show-passages or :show <n>.\n",
                    hidden
                ));
            }
        }
    }

    out
}

fn push_indented(out: &mut String, indent: usize, line: &str) {
    if !line.is_empty() {
        out.extend(std::iter::repeat(' ').take(indent));
        out.push_str(line);
    }
    out.push('\n');
}

/// Writes views somewhere. Write errors are swallowed; a broken pipe on
/// stdout must not take the controller down.
pub trait Presenter: Send {
    fn present(&mut self, view: &QueryView, disclosure: &Disclosure);
}

/// Text output: one rendered block per view.
pub struct TextPresenter<W: Write + Send> {
    out: W,
}

impl<W: Write + Send> TextPresenter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> Presenter for TextPresenter<W> {
    fn present(&mut self, view: &QueryView, disclosure: &Disclosure) {
        let _ = self.out.write_all(render_text(view, disclosure).as_bytes());
        let _ = self.out.flush();
    }
}

/// Machine-readable output: one JSON object per line.
pub struct JsonPresenter<W: Write + Send> {
    out: W,
}

impl<W: Write + Send> JsonPresenter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> Presenter for JsonPresenter<W> {
    fn present(&mut self, view: &QueryView, _disclosure: &Disclosure) {
        if let Ok(line) = serde_json::to_string(view) {
            let _ = writeln!(self.out, "{}", line);
            let _ = self.out.flush();
        }
    }
}

impl OutputFormat {
    /// Presenter writing to stdout in this format.
    pub fn stdout_presenter(self) -> Box<dyn Presenter> {
        match self {
            OutputFormat::Text => Box::new(TextPresenter::new(std::io::stdout())),
            OutputFormat::Json => Box::new(JsonPresenter::new(std::io::stdout())),
        }
    }
}

/// Busy indicator for one-shot queries: stderr, and only on a terminal, so
/// stdout stays parseable.
pub fn announce_busy() {
    if atty::is(atty::Stream::Stderr) {
        eprintln!("{}", BUSY_LABEL);
    }
}
