mod caller_context;
mod confirmation_code;
mod subscriber;
mod subscriber_email;
mod subscription_status;

pub use caller_context::{CallerContext, SubscriptionRequest};
pub use confirmation_code::ConfirmationCode;
pub use subscriber::Subscriber;
pub use subscriber_email::SubscriberEmail;
pub use subscription_status::SubscriptionStatus;
