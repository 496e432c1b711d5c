//! Presentation drivers: the one-shot `ragq ask` and the interactive
//! `ragq repl` session.
//!
//! The interactive loop keeps the outbound call as a separate future and
//! polls it alongside incoming [`SessionEvent`]s, so a submission that
//! arrives while a request is in flight reaches the controller and is
//! rejected there rather than queued behind the call.

use anyhow::Result;
use std::future::Future;
use std::io::BufRead;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

use crate::client::{AnswerService, HttpAnswerService};
use crate::config::{Config, OutputFormat};
use crate::controller::{InteractionState, PendingQuery, QueryController};
use crate::error::QueryError;
use crate::models::QueryResult;
use crate::view::{announce_busy, derive_view, Disclosure, Presenter, QueryView};

/// Input to an interactive session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The question text changed. Ignored while a request is in flight.
    Input(String),
    /// Submit the current question text.
    Submit,
    /// `Input` followed by `Submit`.
    Ask(String),
    Reveal(Reveal),
    /// Return to the call-to-action.
    Clear,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reveal {
    Rank(usize),
    All,
}

type CallFuture = Pin<Box<dyn Future<Output = Result<QueryResult, QueryError>> + Send>>;

struct InFlight {
    pending: PendingQuery,
    call: CallFuture,
}

/// Run an interactive session until [`SessionEvent::Quit`] or the event
/// channel closes.
///
/// `disclosure` is the passage visibility applied to each new answer.
/// Views are presented only when they change. When the channel closes, a
/// request still in flight is awaited and settled with its real outcome;
/// `Quit` resolves it as interrupted instead.
pub async fn run_session<S>(
    controller: &mut QueryController<S>,
    mut events: mpsc::Receiver<SessionEvent>,
    presenter: &mut dyn Presenter,
    disclosure: Disclosure,
) where
    S: AnswerService + ?Sized + 'static,
{
    let mut shown = disclosure.clone();
    let mut in_flight: Option<InFlight> = None;
    let mut last: Option<(QueryView, Disclosure)> = None;
    let mut events_open = true;

    present_if_changed(controller, &shown, presenter, &mut last);

    loop {
        tokio::select! {
            // Events first: anything already queued when the call settles was
            // issued while loading and must be judged against that state.
            biased;

            event = events.recv(), if events_open => {
                match event {
                    Some(SessionEvent::Input(text)) => set_input(controller, text),
                    Some(SessionEvent::Submit) => start(controller, &mut in_flight),
                    Some(SessionEvent::Ask(text)) => {
                        set_input(controller, text);
                        start(controller, &mut in_flight);
                    }
                    Some(SessionEvent::Reveal(target)) => {
                        if controller.state().result().is_some() {
                            match target {
                                Reveal::Rank(rank) => shown.reveal(rank),
                                Reveal::All => shown.reveal_all(),
                            }
                        }
                    }
                    Some(SessionEvent::Clear) => {
                        controller.clear();
                        shown = disclosure.clone();
                    }
                    Some(SessionEvent::Quit) => {
                        if let Some(abandoned) = in_flight.take() {
                            controller.resolve(abandoned.pending, Err(QueryError::Interrupted));
                        }
                        break;
                    }
                    None => {
                        debug!("session input closed");
                        events_open = false;
                    }
                }
            }

            outcome = poll_call(&mut in_flight), if in_flight.is_some() => {
                if let Some(done) = in_flight.take() {
                    controller.resolve(done.pending, outcome);
                    shown = disclosure.clone();
                }
            }
        }

        if !events_open && in_flight.is_none() {
            break;
        }
        present_if_changed(controller, &shown, presenter, &mut last);
    }

    present_if_changed(controller, &shown, presenter, &mut last);
}

fn set_input<S: AnswerService + ?Sized>(controller: &mut QueryController<S>, text: String) {
    if controller.is_loading() {
        debug!("input ignored while loading");
    } else {
        controller.set_query(text);
    }
}

fn start<S>(controller: &mut QueryController<S>, in_flight: &mut Option<InFlight>)
where
    S: AnswerService + ?Sized + 'static,
{
    let question = controller.query().to_string();
    let Some(pending) = controller.begin(&question) else {
        return;
    };

    let service = controller.service();
    let request = pending.request().clone();
    let call: CallFuture = Box::pin(async move { service.query(&request).await });
    *in_flight = Some(InFlight { pending, call });
}

async fn poll_call(in_flight: &mut Option<InFlight>) -> Result<QueryResult, QueryError> {
    match in_flight {
        Some(f) => f.call.as_mut().await,
        None => std::future::pending().await,
    }
}

fn present_if_changed<S: AnswerService + ?Sized>(
    controller: &QueryController<S>,
    disclosure: &Disclosure,
    presenter: &mut dyn Presenter,
    last: &mut Option<(QueryView, Disclosure)>,
) {
    let view = derive_view(controller.query(), controller.state());
    let current = (view, disclosure.clone());
    if last.as_ref() != Some(&current) {
        presenter.present(&current.0, &current.1);
        *last = Some(current);
    }
}

/// Submit one question and present the settled view.
///
/// Returns `false` when the query failed. A blank question issues no request
/// and presents the call-to-action.
pub async fn ask_once<S: AnswerService + ?Sized>(
    controller: &mut QueryController<S>,
    question: &str,
    presenter: &mut dyn Presenter,
    disclosure: &Disclosure,
) -> bool {
    controller.set_query(question);
    if derive_view(controller.query(), controller.state()).submit_enabled {
        announce_busy();
    }
    controller.submit_query().await;

    presenter.present(&derive_view(controller.query(), controller.state()), disclosure);
    !matches!(controller.state(), InteractionState::Failed { .. })
}

/// `ragq ask` entry point.
pub async fn run_ask(
    config: &Config,
    question: &str,
    format: OutputFormat,
    show_passages: bool,
) -> Result<bool> {
    let service = Arc::new(HttpAnswerService::new(&config.endpoint)?);
    let mut controller = QueryController::new(service);
    let mut presenter = format.stdout_presenter();

    let disclosure = if show_passages {
        Disclosure::all()
    } else {
        Disclosure::collapsed()
    };

    Ok(ask_once(&mut controller, question, presenter.as_mut(), &disclosure).await)
}

pub const REPL_HELP: &str = "\
Type a question and press Enter to ask it.
  :show <n>   show the passage of source <n>
  :show all   show every passage
  :clear      back to the start view
  :help       this text
  :quit       leave";

/// Parse one line of REPL input.
///
/// `Ok(None)` means nothing to do; `Err` carries a message for the user.
pub fn parse_command(line: &str) -> Result<Option<SessionEvent>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let Some(command) = line.strip_prefix(':') else {
        return Ok(Some(SessionEvent::Ask(line.to_string())));
    };

    let mut parts = command.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some("quit" | "q" | "exit"), None, None) => Ok(Some(SessionEvent::Quit)),
        (Some("clear" | "home"), None, None) => Ok(Some(SessionEvent::Clear)),
        (Some("help" | "h"), None, None) => Err(REPL_HELP.to_string()),
        (Some("show"), Some("all"), None) => Ok(Some(SessionEvent::Reveal(Reveal::All))),
        (Some("show"), Some(n), None) => match n.parse::<usize>() {
            Ok(rank) if rank >= 1 => Ok(Some(SessionEvent::Reveal(Reveal::Rank(rank)))),
            _ => Err(format!("invalid source number: {}", n)),
        },
        _ => Err(format!("unknown command: :{} (try :help)", command)),
    }
}

/// `ragq repl` entry point.
pub async fn run_repl(config: &Config, format: OutputFormat, show_passages: bool) -> Result<()> {
    let service = Arc::new(HttpAnswerService::new(&config.endpoint)?);
    let mut controller = QueryController::new(service);
    let mut presenter = format.stdout_presenter();

    let disclosure = if show_passages {
        Disclosure::all()
    } else {
        Disclosure::collapsed()
    };

    if format == OutputFormat::Text {
        println!("Connected to {} (:help for commands)", config.endpoint.base_url);
    }

    let (tx, rx) = mpsc::channel(16);

    // A plain thread so a pending stdin read never holds up runtime shutdown.
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            match parse_command(&line) {
                Ok(Some(event)) => {
                    let quit = event == SessionEvent::Quit;
                    if tx.blocking_send(event).is_err() || quit {
                        break;
                    }
                }
                Ok(None) => {}
                Err(message) => eprintln!("{}", message),
            }
        }
    });

    run_session(&mut controller, rx, presenter.as_mut(), disclosure).await;
    Ok(())
}
