//! Postgres 实现
mod customers;
mod stores;
mod subscribers;
mod validation;

pub use customers::{find_customer_by_email, find_customer_by_token};
pub use stores::{PgNewsletterConfig, Store, find_store_by_code, is_guest_subscription_allowed};
pub use subscribers::{
    PgSubscriberRepository, confirm_subscriber, find_subscriber_status,
    get_pending_subscriber,
};
pub use validation::PgSubscriptionValidator;
