pub mod context;
pub mod graphql;
pub mod health_check;
pub mod newsletter_confirm;
