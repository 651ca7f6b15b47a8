//! Live fan-out of reply progress to connected clients

pub mod events;
pub mod hub;

pub use events::{MessageEvent, StreamEvent};
pub use hub::{StreamHub, Subscriber};
