//! Script injection with console relay.
//!
//! [`Injector::run`] resets the page, evaluates a script once in the fresh
//! document and relays console output until cancelled.
//!
//! # States
//!
//! ```text
//! Connected → PageEnabled → ReloadRequested → Reloaded ─────┐
//!                                           ↘ ReloadTimedOut ┤
//!     ┌─────────────────────────────────────────────────────┘
//!     ↓
//! RuntimeAndConsoleEnabled → Injected → Monitoring → Closed
//! ```
//!
//! The script is evaluated with `Runtime.evaluate`, never registered to run
//! on new documents, so repeated runs do not stack.
//!
//! # Example
//!
//! ```no_run
//! use cef_probe::{ConsoleEntry, Connection, Injector, ProbeConfig};
//!
//! # async fn example(address: &str) -> cef_probe::Result<()> {
//! let config = ProbeConfig::builder().build()?;
//! let mut connection = Connection::connect(address).await?;
//! let mut injector = Injector::from_config(&config);
//!
//! let mut print = |entry: ConsoleEntry| println!("{entry}");
//! let report = injector
//!     .run(&mut connection, "console.log('hi')", &mut print, tokio::signal::ctrl_c())
//!     .await?;
//! println!("relayed {} console entries", report.relayed);
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::future::Future;
use std::time::Duration;

use serde_json::Value;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::ProbeConfig;
use crate::error::Result;
use crate::protocol::{Command, Domain, Event, PageCommand, ParsedEvent, RuntimeCommand};
use crate::transport::{Connection, Transport};

// ============================================================================
// InjectionState
// ============================================================================

/// Progress of one injection run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectionState {
    /// Control channel open, nothing sent yet.
    Connected,
    /// `Page.enable` acknowledged.
    PageEnabled,
    /// `Page.reload` sent.
    ReloadRequested,
    /// `Page.loadEventFired` observed.
    Reloaded,
    /// No load event within the reload timeout.
    ReloadTimedOut,
    /// `Runtime.enable` and `Console.enable` acknowledged.
    RuntimeAndConsoleEnabled,
    /// Evaluation answered.
    Injected,
    /// Relaying console output.
    Monitoring,
    /// Connection closed.
    Closed,
}

impl fmt::Display for InjectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Connected => "connected",
            Self::PageEnabled => "page-enabled",
            Self::ReloadRequested => "reload-requested",
            Self::Reloaded => "reloaded",
            Self::ReloadTimedOut => "reload-timed-out",
            Self::RuntimeAndConsoleEnabled => "runtime-and-console-enabled",
            Self::Injected => "injected",
            Self::Monitoring => "monitoring",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Console Relay
// ============================================================================

/// Origin of a console entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleSource {
    /// `Console.messageAdded`.
    Message,
    /// `Runtime.consoleAPICalled`.
    Api,
}

/// One line of console output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleEntry {
    /// Event that produced the entry.
    pub source: ConsoleSource,
    /// Severity or call type (`log`, `warning`, `error`, ...).
    pub level: String,
    /// Rendered text.
    pub text: String,
}

impl ConsoleEntry {
    /// Extracts a console entry from an event, if it is one.
    #[must_use]
    pub fn from_event(event: &Event) -> Option<Self> {
        match event.parse() {
            ParsedEvent::ConsoleMessageAdded { level, text, .. } => Some(Self {
                source: ConsoleSource::Message,
                level,
                text,
            }),
            ParsedEvent::RuntimeConsoleApiCalled { call_type, args } => Some(Self {
                source: ConsoleSource::Api,
                level: call_type,
                text: args.join(" "),
            }),
            _ => None,
        }
    }

    /// Returns `true` for error-level output.
    #[inline]
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self.level.as_str(), "error" | "assert")
    }
}

impl fmt::Display for ConsoleEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.source {
            ConsoleSource::Message => "Console",
            ConsoleSource::Api => "Console API",
        };
        write!(f, "[{tag}] {}: {}", self.level, self.text)
    }
}

/// Receives relayed console output.
pub trait ConsoleObserver {
    /// Called once per console entry, in delivery order.
    fn observe(&mut self, entry: ConsoleEntry);
}

impl<F> ConsoleObserver for F
where
    F: FnMut(ConsoleEntry),
{
    fn observe(&mut self, entry: ConsoleEntry) {
        self(entry);
    }
}

// ============================================================================
// InjectionReport
// ============================================================================

/// How the evaluation went.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Evaluation {
    /// Evaluated without an exception.
    Completed,
    /// The script threw; carries the exception description.
    Threw(String),
    /// The request failed; carries the error text.
    Failed(String),
}

/// Why monitoring stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorExit {
    /// The cancel future resolved.
    Cancelled,
    /// The peer closed the channel.
    ChannelClosed,
}

/// Outcome of [`Injector::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectionReport {
    /// Whether the load event was seen after the reload.
    pub reloaded: bool,
    /// Evaluation outcome.
    pub evaluation: Evaluation,
    /// Number of console entries relayed.
    pub relayed: usize,
    /// Why monitoring stopped.
    pub exit: MonitorExit,
}

// ============================================================================
// Injector
// ============================================================================

/// Drives one injection run over a control connection.
#[derive(Debug, Clone)]
pub struct Injector {
    reload_timeout: Duration,
    command_timeout: Duration,
    state: InjectionState,
}

impl Injector {
    /// Creates an injector.
    #[must_use]
    pub fn new(reload_timeout: Duration, command_timeout: Duration) -> Self {
        Self {
            reload_timeout,
            command_timeout,
            state: InjectionState::Connected,
        }
    }

    /// Creates an injector using the configured timeouts.
    #[must_use]
    pub fn from_config(config: &ProbeConfig) -> Self {
        Self::new(config.reload_timeout(), config.command_timeout())
    }

    /// Returns the current state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> InjectionState {
        self.state
    }

    /// Runs the injection and relays console output until `cancel` resolves
    /// or the peer closes the channel.
    ///
    /// The connection is closed on return, whether the run succeeded or not.
    ///
    /// # Errors
    ///
    /// Returns an error if enabling a domain fails or the channel fails
    /// before monitoring starts. A reload timeout, a rejected evaluation and
    /// a thrown exception are reported, not returned.
    pub async fn run<T, O, C>(
        &mut self,
        connection: &mut Connection<T>,
        script: &str,
        observer: &mut O,
        cancel: C,
    ) -> Result<InjectionReport>
    where
        T: Transport,
        O: ConsoleObserver + ?Sized,
        C: Future,
    {
        self.state = InjectionState::Connected;
        let result = self.drive(connection, script, observer, cancel).await;

        connection.close().await;
        self.transition(InjectionState::Closed);
        result
    }

    // ========================================================================
    // Steps
    // ========================================================================

    async fn drive<T, O, C>(
        &mut self,
        connection: &mut Connection<T>,
        script: &str,
        observer: &mut O,
        cancel: C,
    ) -> Result<InjectionReport>
    where
        T: Transport,
        O: ConsoleObserver + ?Sized,
        C: Future,
    {
        let mut relayed = 0;

        connection.enable(Domain::Page).await?;
        self.transition(InjectionState::PageEnabled);

        connection
            .send(Command::Page(PageCommand::Reload { ignore_cache: true }))
            .await?;
        self.transition(InjectionState::ReloadRequested);

        let reloaded = self.await_load(connection, observer, &mut relayed).await?;
        if reloaded {
            info!("Page reloaded");
            self.transition(InjectionState::Reloaded);
        } else {
            warn!(
                timeout_ms = self.reload_timeout.as_millis() as u64,
                "Reload confirmation not received, proceeding"
            );
            self.transition(InjectionState::ReloadTimedOut);
        }

        connection.enable(Domain::Runtime).await?;
        connection.enable(Domain::Console).await?;
        self.transition(InjectionState::RuntimeAndConsoleEnabled);

        let evaluation = self.evaluate(connection, script).await?;
        self.transition(InjectionState::Injected);

        self.transition(InjectionState::Monitoring);
        let exit = monitor(connection, observer, &mut relayed, cancel).await;

        Ok(InjectionReport {
            reloaded,
            evaluation,
            relayed,
            exit,
        })
    }

    /// Drains events until `Page.loadEventFired` or the reload timeout.
    async fn await_load<T, O>(
        &self,
        connection: &mut Connection<T>,
        observer: &mut O,
        relayed: &mut usize,
    ) -> Result<bool>
    where
        T: Transport,
        O: ConsoleObserver + ?Sized,
    {
        let deadline = Instant::now() + self.reload_timeout;

        loop {
            let now = Instant::now();
            if now >= deadline {
                return Ok(false);
            }

            match connection.next_event(Some(deadline - now)).await? {
                None => return Ok(false),
                Some(event) if event.method == "Page.loadEventFired" => return Ok(true),
                Some(event) => {
                    if relay(&event, observer) {
                        *relayed += 1;
                    }
                }
            }
        }
    }

    /// Evaluates the script once.
    async fn evaluate<T: Transport>(
        &self,
        connection: &mut Connection<T>,
        script: &str,
    ) -> Result<Evaluation> {
        info!(bytes = script.len(), "Injecting script");

        let command = Command::Runtime(RuntimeCommand::Evaluate {
            expression: script.to_string(),
            return_by_value: None,
            user_gesture: Some(true),
            await_promise: Some(false),
        });
        let method = command.method();

        let response = match connection.send_and_await(command, self.command_timeout).await {
            Ok(response) => response,
            Err(e) if e.is_recoverable() => {
                warn!(error = %e, "Injection failed");
                return Ok(Evaluation::Failed(e.to_string()));
            }
            Err(e) => return Err(e),
        };

        let result = match response.into_result(method) {
            Ok(result) => result,
            Err(e) => {
                warn!(error = %e, "Injection error");
                return Ok(Evaluation::Failed(e.to_string()));
            }
        };

        if let Some(details) = result.get("exceptionDetails") {
            let description = exception_description(details);
            warn!(exception = %description, "Script exception");
            return Ok(Evaluation::Threw(description));
        }

        info!("Script injected");
        Ok(Evaluation::Completed)
    }

    fn transition(&mut self, next: InjectionState) {
        debug!(from = %self.state, to = %next, "Injection state");
        self.state = next;
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Relays console events until `cancel` resolves or the channel closes.
async fn monitor<T, O, C>(
    connection: &mut Connection<T>,
    observer: &mut O,
    relayed: &mut usize,
    cancel: C,
) -> MonitorExit
where
    T: Transport,
    O: ConsoleObserver + ?Sized,
    C: Future,
{
    info!("Monitoring console output");
    tokio::pin!(cancel);

    loop {
        tokio::select! {
            biased;

            _ = &mut cancel => {
                info!("Monitoring cancelled");
                return MonitorExit::Cancelled;
            }

            next = connection.next_event(None) => match next {
                Ok(Some(event)) => {
                    if relay(&event, observer) {
                        *relayed += 1;
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    info!(error = %e, "Control channel closed");
                    return MonitorExit::ChannelClosed;
                }
            },
        }
    }
}

/// Hands a console event to the observer; returns `true` if it was one.
fn relay<O: ConsoleObserver + ?Sized>(event: &Event, observer: &mut O) -> bool {
    match ConsoleEntry::from_event(event) {
        Some(entry) => {
            observer.observe(entry);
            true
        }
        None => {
            debug!(method = %event.method, "Event ignored");
            false
        }
    }
}

/// Best description of an `exceptionDetails` object.
fn exception_description(details: &Value) -> String {
    details
        .pointer("/exception/description")
        .and_then(Value::as_str)
        .or_else(|| details.get("text").and_then(Value::as_str))
        .map_or_else(|| details.to_string(), str::to_string)
}

// ============================================================================
// Tests
// ============================================================================
