//! Alert side of the engine: deciding whether a move is alert-worthy,
//! rate-limiting side effects per target, and delivering the alert.

pub mod chart;
pub mod dispatcher;
pub mod gate;
pub mod payload;
pub mod platform;
pub mod target;
pub mod threshold;

pub use dispatcher::{DispatchOutcome, NotificationDispatcher};
pub use gate::{CooldownGate, RateGate, RenameThrottler};
pub use platform::{Platform, ResolvedTarget};
pub use target::{ChannelId, TargetId, UserId};
pub use threshold::{Evaluation, evaluate};
