pub mod book;
pub mod model;
pub mod repository;
pub mod repository_sqlx;

pub use book::{SubscriptionBook, SubscriptionSnapshot, SubscriptionSource};
pub use model::{AlertRule, ChannelSubscription, PersonalSubscription, Subscription};
pub use repository::SubscriptionRepository;
pub use repository_sqlx::SqlxSubscriptionRepository;
