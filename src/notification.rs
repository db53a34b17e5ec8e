use anyhow::Context;
use async_trait::async_trait;

use crate::{
    domain::{Subscriber, SubscriptionStatus},
    email_client::{EmailClient, EmailMessage},
    subscription::StatusChangeNotifier,
};

/// 订阅状态变化后给订阅者发邮件
pub struct EmailStatusNotifier {
    email_client: EmailClient,
    base_url: String,
}

impl EmailStatusNotifier {
    pub fn new(email_client: EmailClient, base_url: String) -> Self {
        Self {
            email_client,
            base_url,
        }
    }

    fn confirmation_link(&self, subscriber: &Subscriber) -> String {
        format!(
            "{}/newsletter/confirm?id={}&code={}",
            self.base_url,
            subscriber.id,
            subscriber.confirmation_code.as_ref()
        )
    }

    /// 只有等待确认和订阅成功两种状态需要发邮件
    fn message_for(&self, subscriber: &Subscriber) -> Option<EmailMessage> {
        match subscriber.status {
            SubscriptionStatus::NotActive => {
                let link = self.confirmation_link(subscriber);
                Some(EmailMessage {
                    subject: "Newsletter subscription confirmation".into(),
                    html_body: format!(
                        "Thank you for subscribing to our newsletter!<br />\
                        Click <a href=\"{}\">here</a> to confirm your subscription.",
                        link
                    ),
                    text_body: format!(
                        "Thank you for subscribing to our newsletter!\n\
                        Visit {} to confirm your subscription.",
                        link
                    ),
                })
            }
            SubscriptionStatus::Subscribed => Some(EmailMessage {
                subject: "Newsletter subscription success".into(),
                html_body: "You have been successfully subscribed to our newsletter.".into(),
                text_body: "You have been successfully subscribed to our newsletter.".into(),
            }),
            SubscriptionStatus::Unsubscribed | SubscriptionStatus::Unconfirmed => None,
        }
    }
}

#[async_trait]
impl StatusChangeNotifier for EmailStatusNotifier {
    #[tracing::instrument(
        name = "Notifying a subscriber about a status change",
        skip(self, subscriber),
        fields(subscriber_id = %subscriber.id, status = subscriber.status.as_str())
    )]
    async fn notify_status_change(&self, subscriber: &Subscriber) -> Result<(), anyhow::Error> {
        let Some(message) = self.message_for(subscriber) else {
            return Ok(());
        };
        self.email_client
            .send_email(&subscriber.email, &message)
            .await
            .with_context(|| {
                format!(
                    "Failed to send `{}` email to {}",
                    message.subject, subscriber.email
                )
            })
    }
}
