use newsletter_graphql::authentication::CustomerToken;
use newsletter_graphql::configuration::{DatabaseSettings, get_configuration};
use newsletter_graphql::startup::{Application, get_connection_pool};
use newsletter_graphql::telemetry::{get_subscriber, init_subscriber};
use once_cell::sync::Lazy;
use serde_json::json;
use sqlx::{Connection, Executor, PgConnection, PgPool};
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const SUBSCRIBE_MUTATION: &str = r#"
    mutation SubscribeEmailToNewsletter($email: String) {
        subscribeEmailToNewsletter(email: $email) {
            status
        }
    }
"#;

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub db_pool: PgPool,
    // 模拟 Postmark API
    pub email_server: MockServer,
}

pub struct ConfirmationLinks {
    pub html: reqwest::Url,
    pub plain_text: reqwest::Url,
}

impl TestApp {
    pub async fn post_graphql(
        &self,
        body: &serde_json::Value,
        headers: &[(&str, &str)],
    ) -> reqwest::Response {
        let mut request = reqwest::Client::new()
            .post(format!("{}/graphql", &self.address))
            .json(body);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        request.send().await.expect("Failed to execute request.")
    }

    /// 以访客身份在默认店铺订阅
    pub async fn subscribe(&self, email: Option<&str>) -> serde_json::Value {
        self.subscribe_with_headers(email, &[]).await
    }

    pub async fn subscribe_with_headers(
        &self,
        email: Option<&str>,
        headers: &[(&str, &str)],
    ) -> serde_json::Value {
        let body = json!({
            "query": SUBSCRIBE_MUTATION,
            "operationName": "SubscribeEmailToNewsletter",
            "variables": { "email": email },
        });
        let response = self.post_graphql(&body, headers).await;
        assert_eq!(response.status().as_u16(), 200);
        response.json().await.expect("Response was not JSON.")
    }

    /// 创建客户并返回可以放在 `Authorization` 头里的 token
    pub async fn create_customer(&self, email: &str, website_id: i64) -> (i64, String) {
        let customer_id: i64 = sqlx::query_scalar(
            "INSERT INTO customers (website_id, email) VALUES ($1, $2) RETURNING id",
        )
        .bind(website_id)
        .bind(email)
        .fetch_one(&self.db_pool)
        .await
        .expect("Failed to create customer.");

        let token = Uuid::new_v4().simple().to_string();
        sqlx::query("INSERT INTO customer_tokens (token_hash, customer_id) VALUES ($1, $2)")
            .bind(CustomerToken::new(token.clone()).hash())
            .bind(customer_id)
            .execute(&self.db_pool)
            .await
            .expect("Failed to store customer token.");
        (customer_id, token)
    }

    pub async fn configure_store(&self, store_id: i64, confirm: bool, allow_guest: bool) {
        sqlx::query(
            "UPDATE stores SET newsletter_confirm = $2, newsletter_allow_guest = $3 WHERE id = $1",
        )
        .bind(store_id)
        .bind(confirm)
        .bind(allow_guest)
        .execute(&self.db_pool)
        .await
        .expect("Failed to update store settings.");
    }

    pub async fn create_store(&self, store_id: i64, code: &str, website_id: i64) {
        sqlx::query("INSERT INTO stores (id, code, website_id) VALUES ($1, $2, $3)")
            .bind(store_id)
            .bind(code)
            .bind(website_id)
            .execute(&self.db_pool)
            .await
            .expect("Failed to create store.");
    }

    pub async fn subscriber_status(&self, email: &str, website_id: i64) -> Option<String> {
        sqlx::query_scalar(
            "SELECT status FROM newsletter_subscribers WHERE email = $1 AND website_id = $2",
        )
        .bind(email)
        .bind(website_id)
        .fetch_optional(&self.db_pool)
        .await
        .expect("Failed to fetch subscriber status.")
    }

    /// 所有发往 Postmark 的请求都返回 200
    pub async fn accept_emails(&self) {
        Mock::given(path("/email"))
            .and(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&self.email_server)
            .await;
    }

    pub fn get_confirmation_links(&self, email_request: &wiremock::Request) -> ConfirmationLinks {
        let body: serde_json::Value = serde_json::from_slice(&email_request.body).unwrap();
        let get_link = |s: &str| {
            let links: Vec<_> = linkify::LinkFinder::new()
                .links(s)
                .filter(|l| *l.kind() == linkify::LinkKind::Url)
                .collect();
            assert_eq!(links.len(), 1);
            let mut confirmation_link = reqwest::Url::parse(links[0].as_str()).unwrap();
            // 只允许指向本机
            assert_eq!(confirmation_link.host_str().unwrap(), "127.0.0.1");
            confirmation_link.set_port(Some(self.port)).unwrap();
            confirmation_link
        };

        let html = get_link(body["HtmlBody"].as_str().unwrap());
        let plain_text = get_link(body["TextBody"].as_str().unwrap());
        ConfirmationLinks { html, plain_text }
    }
}

// tracing 订阅器只能初始化一次
static TRACING: Lazy<()> = Lazy::new(|| {
    let default_filter_level = "info";
    let subscriber_name = "test";

    if std::env::var("TEST_LOG").is_ok() {
        let subscriber = get_subscriber(subscriber_name, default_filter_level, std::io::stdout);
        init_subscriber(subscriber);
    } else {
        let subscriber = get_subscriber(subscriber_name, default_filter_level, std::io::sink);
        init_subscriber(subscriber);
    }
});

pub async fn spawn_app() -> TestApp {
    Lazy::force(&TRACING);

    let email_server = MockServer::start().await;
    let configuration = {
        let mut c = get_configuration().expect("Failed to read configuration.");
        // 每个测试使用独立的数据库
        c.database.database_name = Uuid::new_v4().to_string();
        c.application.port = 0;
        c.email_client.base_url = email_server.uri();
        c
    };

    configure_database(&configuration.database).await;

    let application = Application::build(&configuration)
        .await
        .expect("Failed to build application.");
    let port = application.port();
    let address = format!("http://127.0.0.1:{}", port);
    let _ = tokio::spawn(application.run_until_stopped());

    TestApp {
        address,
        port,
        db_pool: get_connection_pool(&configuration.database),
        email_server,
    }
}

async fn configure_database(config: &DatabaseSettings) -> PgPool {
    let mut connection = PgConnection::connect_with(&config.without_db())
        .await
        .expect("Failed to connect to Postgres");
    connection
        .execute(format!(r#"CREATE DATABASE "{}";"#, config.database_name).as_str())
        .await
        .expect("Failed to create database.");

    let connection_pool = PgPool::connect_with(config.with_db())
        .await
        .expect("Failed to connect to Postgres.");
    sqlx::migrate!("./migrations")
        .run(&connection_pool)
        .await
        .expect("Failed to migrate the database");
    connection_pool
}
