pub mod connection;
pub mod retry;

pub use connection::{LinkPhase, publish};
pub use retry::{RetryDecision, RetryPolicy};
