use serde_json::json;
use wiremock::matchers::{any, method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::helpers::{SUBSCRIBE_MUTATION, spawn_app};

fn first_error_message(body: &serde_json::Value) -> &str {
    body["errors"][0]["message"].as_str().unwrap()
}

#[tokio::test]
async fn guest_subscription_without_confirmation_returns_subscribed() {
    let app = spawn_app().await;
    Mock::given(path("/email"))
        .and(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&app.email_server)
        .await;

    let body = app.subscribe(Some("ursula_le_guin@gmail.com")).await;

    assert_eq!(
        body,
        json!({ "data": { "subscribeEmailToNewsletter": { "status": "SUBSCRIBED" } } })
    );
    assert_eq!(
        app.subscriber_status("ursula_le_guin@gmail.com", 1).await.as_deref(),
        Some("subscribed")
    );
}

#[tokio::test]
async fn subscription_requiring_confirmation_returns_not_active_and_sends_a_link() {
    let app = spawn_app().await;
    app.configure_store(1, true, true).await;
    Mock::given(path("/email"))
        .and(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&app.email_server)
        .await;

    let body = app.subscribe(Some("ursula_le_guin@gmail.com")).await;

    assert_eq!(body["data"]["subscribeEmailToNewsletter"]["status"], "NOT_ACTIVE");
    assert_eq!(
        app.subscriber_status("ursula_le_guin@gmail.com", 1).await.as_deref(),
        Some("not_active")
    );
    let email_request = &app.email_server.received_requests().await.unwrap()[0];
    let links = app.get_confirmation_links(email_request);
    assert_eq!(links.html, links.plain_text);
}

#[tokio::test]
async fn alias_is_used_as_the_response_key() {
    let app = spawn_app().await;
    app.accept_emails().await;

    let response = app
        .post_graphql(
            &json!({
                "query": r#"mutation { sub: subscribeEmailToNewsletter(email: "le_guin@gmail.com") { status } }"#
            }),
            &[],
        )
        .await;

    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["data"]["sub"]["status"], "SUBSCRIBED");
}

#[tokio::test]
async fn missing_or_blank_email_is_rejected() {
    let app = spawn_app().await;
    let test_cases = vec![(None, "null email"), (Some(""), "empty email"), (Some("   "), "blank email")];

    for (email, description) in test_cases {
        let body = app.subscribe(email).await;

        assert_eq!(
            first_error_message(&body),
            "You must specify an email address to subscribe to a newsletter.",
            "The API did not reject the request when the payload had a {}.",
            description
        );
        assert_eq!(body["errors"][0]["extensions"]["category"], "graphql-input");
        assert_eq!(body["errors"][0]["path"], json!(["subscribeEmailToNewsletter"]));
        assert!(body["data"]["subscribeEmailToNewsletter"].is_null());
    }
}

#[tokio::test]
async fn malformed_email_is_rejected() {
    let app = spawn_app().await;

    for email in ["definitely-not-an-email", "missing-at.example.com", "@domain.com"] {
        let body = app.subscribe(Some(email)).await;

        assert_eq!(first_error_message(&body), "Enter a valid email address.");
        assert_eq!(app.subscriber_status(email, 1).await, None);
    }
}

#[tokio::test]
async fn email_already_subscribed_is_rejected() {
    let app = spawn_app().await;
    app.accept_emails().await;
    app.subscribe(Some("ursula_le_guin@gmail.com")).await;

    let body = app.subscribe(Some("ursula_le_guin@gmail.com")).await;

    assert_eq!(
        first_error_message(&body),
        "This email address is already subscribed."
    );
}

#[tokio::test]
async fn pending_subscription_can_be_requested_again() {
    let app = spawn_app().await;
    app.configure_store(1, true, true).await;
    app.accept_emails().await;
    app.subscribe(Some("ursula_le_guin@gmail.com")).await;

    let body = app.subscribe(Some("ursula_le_guin@gmail.com")).await;

    assert_eq!(body["data"]["subscribeEmailToNewsletter"]["status"], "NOT_ACTIVE");
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM newsletter_subscribers")
        .fetch_one(&app.db_pool)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn guests_are_rejected_when_the_store_disallows_them() {
    let app = spawn_app().await;
    app.configure_store(1, false, false).await;

    let body = app.subscribe(Some("ursula_le_guin@gmail.com")).await;

    assert_eq!(
        first_error_message(&body),
        "Guests can not subscribe to the newsletter. You must create an account to subscribe."
    );
    assert_eq!(app.subscriber_status("ursula_le_guin@gmail.com", 1).await, None);
}

#[tokio::test]
async fn customers_can_subscribe_when_guests_are_disallowed() {
    let app = spawn_app().await;
    app.configure_store(1, false, false).await;
    app.accept_emails().await;
    let (customer_id, token) = app.create_customer("customer@example.com", 1).await;
    let authorization = format!("Bearer {}", token);

    let body = app
        .subscribe_with_headers(
            Some("customer@example.com"),
            &[("Authorization", authorization.as_str())],
        )
        .await;

    assert_eq!(body["data"]["subscribeEmailToNewsletter"]["status"], "SUBSCRIBED");
    let stored: Option<i64> = sqlx::query_scalar(
        "SELECT customer_id FROM newsletter_subscribers WHERE email = $1",
    )
    .bind("customer@example.com")
    .fetch_one(&app.db_pool)
    .await
    .unwrap();
    assert_eq!(stored, Some(customer_id));
}

#[tokio::test]
async fn email_owned_by_another_customer_is_rejected() {
    let app = spawn_app().await;
    app.create_customer("owner@example.com", 1).await;
    let (_, token) = app.create_customer("someone.else@example.com", 1).await;
    let authorization = format!("Bearer {}", token);

    let body = app
        .subscribe_with_headers(
            Some("owner@example.com"),
            &[("Authorization", authorization.as_str())],
        )
        .await;

    assert_eq!(
        first_error_message(&body),
        "This email address is already assigned to another user."
    );
}

#[tokio::test]
async fn guests_may_use_an_email_that_belongs_to_a_customer() {
    let app = spawn_app().await;
    app.accept_emails().await;
    app.create_customer("owner@example.com", 1).await;

    let body = app.subscribe(Some("owner@example.com")).await;

    assert_eq!(body["data"]["subscribeEmailToNewsletter"]["status"], "SUBSCRIBED");
}

#[tokio::test]
async fn store_header_selects_the_store_settings() {
    let app = spawn_app().await;
    app.create_store(2, "german", 1).await;
    app.configure_store(2, true, true).await;
    app.accept_emails().await;

    let body = app
        .subscribe_with_headers(Some("ursula_le_guin@gmail.com"), &[("Store", "german")])
        .await;

    assert_eq!(body["data"]["subscribeEmailToNewsletter"]["status"], "NOT_ACTIVE");
    let store_id: i64 =
        sqlx::query_scalar("SELECT store_id FROM newsletter_subscribers WHERE email = $1")
            .bind("ursula_le_guin@gmail.com")
            .fetch_one(&app.db_pool)
            .await
            .unwrap();
    assert_eq!(store_id, 2);
}

#[tokio::test]
async fn unknown_store_returns_a_400() {
    let app = spawn_app().await;

    let response = app
        .post_graphql(
            &json!({ "query": SUBSCRIBE_MUTATION, "variables": { "email": "a@b.com" } }),
            &[("Store", "does-not-exist")],
        )
        .await;

    assert_eq!(response.status().as_u16(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(first_error_message(&body), "Requested store is not found");
    assert_eq!(body["errors"][0]["extensions"]["category"], "graphql-no-such-entity");
}

#[tokio::test]
async fn unknown_customer_token_returns_a_401() {
    let app = spawn_app().await;

    let response = app
        .post_graphql(
            &json!({ "query": SUBSCRIBE_MUTATION, "variables": { "email": "a@b.com" } }),
            &[("Authorization", "Bearer not-a-real-token")],
        )
        .await;

    assert_eq!(response.status().as_u16(), 401);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["errors"][0]["extensions"]["category"], "graphql-authorization");
}

#[tokio::test]
async fn invalid_documents_return_a_400() {
    let app = spawn_app().await;
    let test_cases = vec![
        ("query { subscribeEmailToNewsletter(email: \"a@b.com\") { status } }", "a query"),
        ("mutation { deleteEverything { ok } }", "an unknown field"),
        ("mutation { subscribeEmailToNewsletter(email: ", "a truncated document"),
        (
            "mutation { subscribeEmailToNewsletter(email: \"a@b.com\")",
            "missing its selection set and closing brace",
        ),
        (
            "mutation { subscribeEmailToNewsletter(email: \"a@b.com\") { status } deleteEverything { ok } }",
            "selecting a second field",
        ),
        (
            "mutation { subscribeEmailToNewsletter(email: \"a@b.com\") { status } } }}} trailing",
            "followed by junk",
        ),
    ];

    for (query, description) in test_cases {
        let response = app.post_graphql(&json!({ "query": query }), &[]).await;

        assert_eq!(
            response.status().as_u16(),
            400,
            "The API did not fail with 400 Bad Request when the document was {}.",
            description
        );
    }
    // 被拒绝的请求不能留下订阅记录
    assert_eq!(app.subscriber_status("a@b.com", 1).await, None);
}

#[tokio::test]
async fn subscription_fails_if_the_notification_cannot_be_sent() {
    let app = spawn_app().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(500))
        .mount(&app.email_server)
        .await;

    let body = app.subscribe(Some("ursula_le_guin@gmail.com")).await;

    assert_eq!(
        first_error_message(&body),
        "Cannot create a newsletter subscription."
    );
}

#[tokio::test]
async fn subscription_fails_if_the_database_is_broken() {
    let app = spawn_app().await;
    sqlx::query("ALTER TABLE newsletter_subscribers DROP COLUMN confirmation_code;")
        .execute(&app.db_pool)
        .await
        .unwrap();

    let body = app.subscribe(Some("ursula_le_guin@gmail.com")).await;

    assert!(body["data"]["subscribeEmailToNewsletter"].is_null());
    assert_eq!(body["errors"][0]["extensions"]["category"], "graphql-input");
}
