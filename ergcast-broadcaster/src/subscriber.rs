//! Delivery backends
//!
//! A [`Subscriber`] accepts an already-serialized message without blocking.
//! Anything slow (sockets, files) sits behind a bounded queue drained by its
//! own task; see [`ChannelSubscriber`].

use std::io::Write;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tokio::sync::mpsc::{self, error::TrySendError};

use crate::error::{BroadcasterError, DeliveryError};

/// Opaque registry key handed out by the broadcaster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub(crate) u64);

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One consumer of the broadcast stream.
///
/// `try_deliver` must return promptly. An `Err` removes the subscriber.
pub trait Subscriber: Send + Sync {
    fn try_deliver(&self, message: &Arc<str>) -> Result<(), DeliveryError>;

    /// Short label for logs
    fn describe(&self) -> String {
        "subscriber".to_string()
    }
}

/// Per-subscriber bounded queue. A full queue means the consumer is lagging.
pub struct ChannelSubscriber {
    tx: mpsc::Sender<Arc<str>>,
    label: String,
}

impl ChannelSubscriber {
    /// Create the subscriber and the receiving half its consumer drains.
    pub fn new(capacity: usize, label: impl Into<String>) -> (Self, mpsc::Receiver<Arc<str>>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            Self {
                tx,
                label: label.into(),
            },
            rx,
        )
    }
}

impl Subscriber for ChannelSubscriber {
    fn try_deliver(&self, message: &Arc<str>) -> Result<(), DeliveryError> {
        self.tx.try_send(Arc::clone(message)).map_err(|e| match e {
            TrySendError::Full(_) => DeliveryError::Lagging,
            TrySendError::Closed(_) => DeliveryError::Closed,
        })
    }

    fn describe(&self) -> String {
        self.label.clone()
    }
}

/// Invokes a function inline for each message. Runs under the registry read
/// lock, so the callback must not subscribe or unsubscribe.
pub struct CallbackSubscriber<F> {
    callback: F,
    label: String,
}

impl<F> CallbackSubscriber<F>
where
    F: Fn(&str) -> Result<(), DeliveryError> + Send + Sync,
{
    pub fn new(label: impl Into<String>, callback: F) -> Self {
        Self {
            callback,
            label: label.into(),
        }
    }
}

impl<F> Subscriber for CallbackSubscriber<F>
where
    F: Fn(&str) -> Result<(), DeliveryError> + Send + Sync,
{
    fn try_deliver(&self, message: &Arc<str>) -> Result<(), DeliveryError> {
        (self.callback)(&**message)
    }

    fn describe(&self) -> String {
        self.label.clone()
    }
}

/// Newline-delimited messages written by a dedicated thread.
///
/// The thread owns `writer` and does every blocking write, so a stalled reader
/// only fills the queue and the subscriber is then dropped as lagging. The
/// thread exits once the subscriber is removed and the queue is drained, or on
/// the first write error.
pub fn writer_subscriber<W>(
    capacity: usize,
    label: impl Into<String>,
    mut writer: W,
) -> Result<(ChannelSubscriber, JoinHandle<()>), BroadcasterError>
where
    W: Write + Send + 'static,
{
    let label = label.into();
    let (subscriber, mut rx) = ChannelSubscriber::new(capacity, label.clone());

    let handle = thread::Builder::new()
        .name(format!("ergcast-{}", label))
        .spawn(move || {
            while let Some(message) = rx.blocking_recv() {
                if let Err(e) = writeln!(writer, "{}", message).and_then(|_| writer.flush()) {
                    tracing::warn!("Writer for {} failed: {}", label, e);
                    break;
                }
            }
            tracing::debug!("Writer for {} finished", label);
        })?;

    Ok((subscriber, handle))
}

/// One JSON message per line on stdout
pub fn stdout_subscriber(
    capacity: usize,
) -> Result<(ChannelSubscriber, JoinHandle<()>), BroadcasterError> {
    writer_subscriber(capacity, "stdout", std::io::stdout())
}
