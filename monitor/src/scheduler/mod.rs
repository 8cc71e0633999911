pub mod rename;
#[allow(clippy::module_inception)]
pub mod scheduler;

pub use scheduler::{Scheduler, TickReport};
