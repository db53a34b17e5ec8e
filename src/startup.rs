use std::{net::TcpListener, sync::Arc};

use actix_web::{App, HttpServer, dev::Server, web};
use anyhow::Context;
use sqlx::{PgPool, postgres::PgPoolOptions};
use tracing_actix_web::TracingLogger;

use crate::{
    configuration::{DatabaseSettings, Settings},
    email_client::EmailClient,
    notification::EmailStatusNotifier,
    routes::{
        context::DefaultStoreCode, graphql::graphql, health_check::health_check,
        newsletter_confirm::confirm,
    },
    storage::{PgNewsletterConfig, PgSubscriberRepository, PgSubscriptionValidator},
    subscription::{StatusChangeNotifier, SubscribeEmailToNewsletter},
};

pub struct Application {
    port: u16,
    server: Server,
}

impl Application {
    pub async fn build(config: &Settings) -> Result<Self, anyhow::Error> {
        let connection_pool = get_connection_pool(&config.database);

        let sender = config
            .email_client
            .sender()
            .map_err(|e| anyhow::anyhow!(e))
            .context("Invalid sender email address")?;
        let email_client = EmailClient::new(
            config.email_client.base_url.clone(),
            sender,
            config.email_client.authorization_token.clone(),
            config.email_client.timeout(),
        )
        .context("Failed to build the email client")?;

        let address = format!("{}:{}", config.application.host, config.application.port);
        let listener = TcpListener::bind(address)?;
        let port = listener.local_addr()?.port();

        let server = run(
            listener,
            connection_pool,
            email_client,
            config.application.base_url.clone(),
            config.newsletter.default_store_code.clone(),
        )?;
        Ok(Self { port, server })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> Result<(), std::io::Error> {
        self.server.await
    }
}

pub fn get_connection_pool(database_config: &DatabaseSettings) -> PgPool {
    PgPoolOptions::new()
        .acquire_timeout(std::time::Duration::from_secs(2))
        .connect_lazy_with(database_config.with_db())
}

pub fn run(
    listener: TcpListener,
    db_pool: PgPool,
    email_client: EmailClient,
    base_url: String,
    default_store_code: String,
) -> Result<Server, std::io::Error> {
    // 协作者在启动时注入,处理器本身不持有可变状态
    let notifier: Arc<dyn StatusChangeNotifier> =
        Arc::new(EmailStatusNotifier::new(email_client, base_url));
    let handler = web::Data::new(SubscribeEmailToNewsletter::new(
        Arc::new(PgSubscriptionValidator::new(db_pool.clone())),
        Arc::new(PgNewsletterConfig::new(db_pool.clone())),
        Arc::new(PgSubscriberRepository::new(db_pool.clone())),
        notifier.clone(),
    ));
    let notifier: web::Data<dyn StatusChangeNotifier> = web::Data::from(notifier);
    let db_pool = web::Data::new(db_pool);
    let default_store = web::Data::new(DefaultStoreCode(default_store_code));

    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .route("/health_check", web::get().to(health_check))
            .route("/graphql", web::post().to(graphql))
            .route("/newsletter/confirm", web::get().to(confirm))
            .app_data(db_pool.clone())
            .app_data(handler.clone())
            .app_data(notifier.clone())
            .app_data(default_store.clone())
    })
    .listen(listener)?
    .run();

    Ok(server)
}
