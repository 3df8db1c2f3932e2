//! The gift assistant: commands, the subscription gate, admin flows and broadcasts.

pub mod admin;
pub mod broadcast;
pub mod context;
pub mod gate;
pub mod platform;
pub mod router;
pub mod state;
pub mod store;
pub mod telegram;
pub mod templates;

#[cfg(test)]
mod mock;

pub use context::AppContext;
pub use router::{Event, Inbound, Sender};
pub use telegram::TelegramPlatform;
