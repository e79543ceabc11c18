//! Controller link: connect, run a session, queue outbound commands.

pub mod connector;
pub mod queue;
pub mod session;

pub use connector::{Connector, retry_delay};
pub use queue::{OutboundQueue, OutboundReceiver, outbound_queue};
pub use session::Session;
