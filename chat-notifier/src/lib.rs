//! Slack delivery of canonical pull requests.
//!
//! Flow per delivery:
//!   render (pure) -> pointer lookup -> chat.postMessage | chat.update -> pointer insert
//!
//! No async-trait, no Box<dyn ...>; storage backends are enum-dispatched.

pub mod blocks;
pub mod errors;
pub mod render;
pub mod slack;
pub mod store;
pub mod upsert;

#[cfg(test)]
mod fixtures;

pub use blocks::{Block, SlackMessage};
pub use errors::{DeliveryError, NotifierError, NotifierResult, StoreError};
pub use render::{APPROVE_ACTION_ID, approve_value, parse_approve_value, render};
pub use slack::{DEFAULT_SLACK_API_BASE, PostedMessage, SlackClient, SlackConfig};
pub use store::{IN_MEMORY, NotificationPointer, NotifyStore};
pub use upsert::{NotifyOutcome, Notifier};
