//! Event fan-out for ErgCast
//!
//! [`EventBroadcaster`] serializes each detection [`Event`](ergcast_detect::Event)
//! into a [`WireMessage`] once and offers it to every registered
//! [`Subscriber`]. Subscribers that cannot take a message right away are
//! removed, so one stalled consumer never holds up the sampling loop or the
//! other consumers.
//!
//! # Backends
//!
//! - [`ChannelSubscriber`] - bounded per-subscriber queue
//! - [`CallbackSubscriber`] - inline function call
//! - [`stdout_subscriber`] - newline-delimited JSON on stdout, written from its
//!   own thread ([`writer_subscriber`] for any other writer)
//! - [`WebSocketServer`] - one channel subscriber per WebSocket client
//!
//! # Wire format
//!
//! ```text
//! {"type": "STROKE_FORCE", "content": {"erg_id": "430", "stroke_id": 0, "forceplot": [1.0, 2.0], "time": 3.2}}
//! ```
//!
//! # Example
//!
//! ```
//! use ergcast_broadcaster::{ChannelSubscriber, EventBroadcaster};
//! use ergcast_detect::Event;
//!
//! let broadcaster = EventBroadcaster::new();
//! let (subscriber, mut rx) = ChannelSubscriber::new(16, "example");
//! broadcaster.subscribe(subscriber);
//!
//! broadcaster.publish(&Event::notice("hello")).unwrap();
//! assert_eq!(&*rx.try_recv().unwrap(), r#"{"type":"TXT","content":"hello"}"#);
//! ```

pub mod broadcaster;
pub mod error;
pub mod message;
pub mod server;
pub mod subscriber;

// Re-exports
pub use broadcaster::{EventBroadcaster, PublishReport};
pub use error::{BroadcasterError, DeliveryError, Result};
pub use message::{WireMessage, WAITING_TEXT};
pub use server::{ServerConfig, WebSocketServer, WELCOME_TEXT};
pub use subscriber::{
    stdout_subscriber, writer_subscriber, CallbackSubscriber, ChannelSubscriber, Subscriber, SubscriptionId,
};
