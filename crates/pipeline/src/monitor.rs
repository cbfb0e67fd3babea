//! [`Monitor`]: the thread-safe control-message queue workers use to report
//! STOP/ERROR conditions to the main thread.

use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, Sender};

/// The default cadence the host application should poll a [`Monitor`] at.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// The kind of condition a worker is reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// A terminal fault occurred (operation failure, I/O error, integrity
    /// failure).
    Error,
    /// The run ended normally (source or sink reached EOF).
    Stop,
}

/// A single control message posted by a worker thread.
#[derive(Debug, Clone)]
pub struct Message {
    /// Whether this is a STOP or an ERROR.
    pub kind: MessageKind,
    /// A short human-readable tag, e.g. `"End of file in source"`.
    pub tag: String,
}

/// A handle workers clone to post messages; the main thread keeps the
/// [`Monitor`] itself and drains it.
#[derive(Clone)]
pub struct MonitorHandle {
    tx: Sender<Message>,
}

impl MonitorHandle {
    /// Posts an ERROR message.
    pub fn post_error(&self, tag: impl Into<String>) {
        let _ = self.tx.send(Message {
            kind: MessageKind::Error,
            tag: tag.into(),
        });
    }

    /// Posts a STOP message.
    pub fn post_stop(&self, tag: impl Into<String>) {
        let _ = self.tx.send(Message {
            kind: MessageKind::Stop,
            tag: tag.into(),
        });
    }
}

/// A thread-safe FIFO of [`Message`]s, drained by the main thread on a fixed
/// cadence ([`POLL_INTERVAL`] by default).
///
/// The pipeline never stops itself on error; delivering a message is purely
/// informative; it is the host application's delivery callback that decides
/// whether to call `Stream::stop`.
pub struct Monitor {
    tx: Sender<Message>,
    rx: Receiver<Message>,
}

impl Default for Monitor {
    fn default() -> Self {
        Self::new()
    }
}

impl Monitor {
    /// Builds an empty monitor.
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Monitor { tx, rx }
    }

    /// Returns a cloneable handle workers can use to post messages.
    pub fn handle(&self) -> MonitorHandle {
        MonitorHandle {
            tx: self.tx.clone(),
        }
    }

    /// Dequeues and returns a single pending message, if any, without
    /// blocking.
    pub fn poll_once(&self) -> Option<Message> {
        self.rx.try_recv().ok()
    }

    /// Drains every currently pending message, invoking `f` for each in
    /// order. Intended to be called from the host application's own 1s
    /// timer loop.
    pub fn drain_with<F: FnMut(Message)>(&self, mut f: F) {
        while let Some(message) = self.poll_once() {
            f(message);
        }
    }

    /// Discards any pending messages without delivering them. Called when a
    /// `Stream` restarts a fresh run.
    pub fn clear(&self) {
        while self.rx.try_recv().is_ok() {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poll_once_returns_none_when_empty() {
        let monitor = Monitor::new();
        assert!(monitor.poll_once().is_none());
    }

    #[test]
    fn handle_posts_are_observed_in_order() {
        let monitor = Monitor::new();
        let handle = monitor.handle();
        handle.post_stop("eof");
        handle.post_error("boom");

        let first = monitor.poll_once().unwrap();
        assert_eq!(first.kind, MessageKind::Stop);
        let second = monitor.poll_once().unwrap();
        assert_eq!(second.kind, MessageKind::Error);
        assert_eq!(second.tag, "boom");
        assert!(monitor.poll_once().is_none());
    }

    #[test]
    fn clear_discards_pending_messages() {
        let monitor = Monitor::new();
        monitor.handle().post_stop("eof");
        monitor.clear();
        assert!(monitor.poll_once().is_none());
    }

    #[test]
    fn drain_with_delivers_every_pending_message_once() {
        let monitor = Monitor::new();
        let handle = monitor.handle();
        handle.post_stop("a");
        handle.post_error("b");
        let mut seen = Vec::new();
        monitor.drain_with(|m| seen.push(m.tag));
        assert_eq!(seen, vec!["a".to_string(), "b".to_string()]);
    }
}
