pub mod calls;
pub mod error;
pub mod history;
pub mod time;

pub use calls::{CallManager, CallState, MediaSession, SignalSink};
pub use error::CallError;
pub use history::{open_message, OpenedMessage};

#[cfg(test)]
mod tests;
