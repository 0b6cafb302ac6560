//! Cross-thread signaling from worker threads to a single host loop.
//!
//! Worker threads cannot touch host-side state directly. Instead each stream
//! owns a [`Message`] bound to a shared [`MailboxContext`]; sending the message
//! schedules one drain on the host loop, which runs the message's handler on
//! the host thread. Workers that need the host to consume a result before they
//! continue block on [`Message::wait`].
//!
//! # Features
//!
//! - **Coalesced wake-ups**: at most one drain is scheduled no matter how many
//!   messages are sent before it runs
//! - **Exactly-once delivery**: a message that is already pending is never
//!   queued a second time
//! - **Lazy wake primitive**: opened on the first registered sender and closed
//!   on the host thread when the last one leaves
//!
//! # Example
//!
//! ```rust,ignore
//! use audio_relay::mailbox::*;
//!
//! let events = EventLoop::new();
//! let context = MailboxContext::new(events.wake_source());
//! let message = Message::new(&context, || println!("on the host thread"));
//! message.register()?;
//!
//! let worker = {
//!     let message = message.clone();
//!     std::thread::spawn(move || {
//!         message.send().ok();
//!         message.wait();
//!     })
//! };
//!
//! events.run_until(Duration::from_secs(1), || worker.is_finished());
//! ```

pub mod context;
pub mod error;
pub mod host;
pub mod message;

pub use context::{MailboxConfig, MailboxContext};
pub use error::{MailboxError, MailboxResult};
pub use host::{EventLoop, WakeSource, Waker};
pub use message::{Message, MessageHandler};

#[cfg(test)]
mod tests;
