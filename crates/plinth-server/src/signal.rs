//! OS signal registration.
//!
//! [`SignalListener::register`] installs handlers for every requested signal
//! up front, so a registration failure is reported before the server starts
//! accepting connections. [`SignalListener::recv`] then resolves with the
//! first signal delivered.

use std::fmt;
use std::future::poll_fn;
use std::io;
use std::str::FromStr;
use std::task::Poll;

use serde::{Deserialize, Serialize};

/// A process signal that can stop the server.
///
/// Serialized as its `SIG*` name; deserialized with the same rules as
/// [`FromStr`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Signal {
    /// `SIGINT`, Ctrl+C.
    Interrupt,
    /// `SIGTERM`.
    Terminate,
    /// `SIGHUP`.
    Hangup,
    /// `SIGQUIT`.
    Quit,
}

impl Signal {
    /// The signals the server listens for by default.
    pub const DEFAULT: [Self; 2] = [Self::Interrupt, Self::Terminate];

    /// Returns the conventional `SIG*` name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Interrupt => "SIGINT",
            Self::Terminate => "SIGTERM",
            Self::Hangup => "SIGHUP",
            Self::Quit => "SIGQUIT",
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when parsing an unknown signal name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown signal: {0}")]
pub struct ParseSignalError(String);

impl FromStr for Signal {
    type Err = ParseSignalError;

    /// Accepts `SIGINT`, `INT` and `interrupt` forms, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        let bare = upper.strip_prefix("SIG").unwrap_or(&upper);
        match bare {
            "INT" | "INTERRUPT" => Ok(Self::Interrupt),
            "TERM" | "TERMINATE" => Ok(Self::Terminate),
            "HUP" | "HANGUP" => Ok(Self::Hangup),
            "QUIT" => Ok(Self::Quit),
            _ => Err(ParseSignalError(s.to_string())),
        }
    }
}

impl TryFrom<String> for Signal {
    type Error = ParseSignalError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Signal> for String {
    fn from(signal: Signal) -> Self {
        signal.name().to_string()
    }
}

/// Registered signal handlers.
pub struct SignalListener {
    streams: Vec<(Signal, platform::Stream)>,
}

impl SignalListener {
    /// Registers handlers for every signal in `signals`.
    ///
    /// Duplicates are registered once. An empty list yields a listener that
    /// never fires.
    ///
    /// # Errors
    ///
    /// Returns the I/O error of the first registration that fails.
    pub fn register(signals: &[Signal]) -> io::Result<Self> {
        let mut streams: Vec<(Signal, platform::Stream)> = Vec::with_capacity(signals.len());
        for &signal in signals {
            if streams.iter().any(|(seen, _)| *seen == signal) {
                continue;
            }
            if let Some(stream) = platform::register(signal)? {
                streams.push((signal, stream));
            }
        }
        Ok(Self { streams })
    }

    /// Returns the signals actually being listened for.
    pub fn signals(&self) -> impl Iterator<Item = Signal> + '_ {
        self.streams.iter().map(|(signal, _)| *signal)
    }

    /// Waits for the next delivered signal.
    pub async fn recv(&mut self) -> Signal {
        poll_fn(|cx| {
            for (signal, stream) in &mut self.streams {
                if stream.poll_recv(cx).is_ready() {
                    return Poll::Ready(*signal);
                }
            }
            Poll::Pending
        })
        .await
    }
}

impl fmt::Debug for SignalListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.signals()).finish()
    }
}

#[cfg(unix)]
mod platform {
    use std::io;

    use tokio::signal::unix::{signal, SignalKind};

    use super::Signal;

    pub(super) type Stream = tokio::signal::unix::Signal;

    pub(super) fn register(signal_kind: Signal) -> io::Result<Option<Stream>> {
        let kind = match signal_kind {
            Signal::Interrupt => SignalKind::interrupt(),
            Signal::Terminate => SignalKind::terminate(),
            Signal::Hangup => SignalKind::hangup(),
            Signal::Quit => SignalKind::quit(),
        };
        signal(kind).map(Some)
    }
}

#[cfg(windows)]
mod platform {
    use std::io;

    use super::Signal;

    pub(super) type Stream = tokio::signal::windows::CtrlC;

    pub(super) fn register(signal: Signal) -> io::Result<Option<Stream>> {
        if signal == Signal::Interrupt {
            return tokio::signal::windows::ctrl_c().map(Some);
        }
        tracing::warn!(%signal, "Signal not supported on this platform, ignoring");
        Ok(None)
    }
}
