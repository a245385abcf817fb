use std::time::Duration;

use assert_matches::assert_matches;
use serde_json::json;
use storefront_api::services::commerce::{
    AuthorizationError, AuthorizationRequest, PaymentAuthorizer, StripePaymentAuthorizer,
};
use wiremock::{
    matchers::{body_string_contains, header, method, path},
    Mock, MockServer, ResponseTemplate,
};

fn request() -> AuthorizationRequest {
    AuthorizationRequest {
        amount_cents: 4317,
        currency: "usd".into(),
        user_id: 7,
    }
}

fn authorizer(server: &MockServer, timeout: Duration) -> StripePaymentAuthorizer {
    StripePaymentAuthorizer::new(server.uri(), Some("sk_test_123".into()), timeout).unwrap()
}

#[tokio::test]
async fn creates_payment_intent_for_the_total() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/payment_intents"))
        .and(header("authorization", "Bearer sk_test_123"))
        .and(body_string_contains("amount=4317"))
        .and(body_string_contains("currency=usd"))
        .and(body_string_contains("metadata%5BuserId%5D=7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "pi_abc",
            "object": "payment_intent",
            "amount": 4317,
            "client_secret": "pi_abc_secret_xyz",
            "status": "requires_payment_method"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let auth = authorizer(&server, Duration::from_secs(5))
        .authorize(&request())
        .await
        .unwrap();

    assert_eq!(auth.id, "pi_abc");
    assert_eq!(auth.client_secret, "pi_abc_secret_xyz");
    assert_eq!(auth.amount_cents, 4317);
    assert_eq!(auth.currency, "usd");
}

#[tokio::test]
async fn card_error_is_a_decline() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/payment_intents"))
        .respond_with(ResponseTemplate::new(402).set_body_json(json!({
            "error": {
                "type": "card_error",
                "code": "card_declined",
                "message": "Your card was declined."
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = authorizer(&server, Duration::from_secs(5))
        .authorize(&request())
        .await;

    assert_matches!(
        result,
        Err(AuthorizationError::Declined(ref msg)) if msg == "Your card was declined. (card_declined)"
    );
}

#[tokio::test]
async fn server_error_is_a_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .expect(1)
        .mount(&server)
        .await;

    let result = authorizer(&server, Duration::from_secs(5))
        .authorize(&request())
        .await;

    assert_matches!(result, Err(AuthorizationError::Failed(ref msg)) if msg.contains("500"));
}

#[tokio::test]
async fn slow_provider_is_ambiguous_and_called_once() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"id": "pi_late", "client_secret": "pi_late_secret"}))
                .set_delay(Duration::from_secs(3)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let result = authorizer(&server, Duration::from_millis(200))
        .authorize(&request())
        .await;

    assert_matches!(result, Err(AuthorizationError::Ambiguous(_)));
}

#[tokio::test]
async fn success_without_client_secret_is_ambiguous() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "pi_nosecret"})))
        .mount(&server)
        .await;

    let result = authorizer(&server, Duration::from_secs(5))
        .authorize(&request())
        .await;

    assert_matches!(result, Err(AuthorizationError::Ambiguous(ref msg)) if msg.contains("pi_nosecret"));
}

#[tokio::test]
async fn unreachable_provider_is_a_failure() {
    // Nothing listens on the discard port.
    let authorizer = StripePaymentAuthorizer::new(
        "http://127.0.0.1:9",
        Some("sk_test_123".into()),
        Duration::from_secs(2),
    )
    .unwrap();

    let result = authorizer.authorize(&request()).await;
    assert_matches!(result, Err(AuthorizationError::Failed(_)));
}
