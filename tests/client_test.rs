//! Integration tests for the backend client
//!
//! Tests retry policy, CSRF bootstrap and error classification using
//! wiremock for request/response mocking.

use serde_json::json;
use std::time::{Duration, Instant};
use wiremock::{
    matchers::{body_json, header, method, path},
    Mock, MockServer, ResponseTemplate,
};

use klinik_deutsch::api::ApiClient;
use klinik_deutsch::config::{ApiConfig, RequestConfig};
use klinik_deutsch::error::{ApiError, ErrorKind};

const CSRF_TOKEN: &str = "tok123";

/// Create a test client pointing to mock server
fn create_test_client(base_url: &str, max_retries: u32, retry_delay_ms: u64) -> ApiClient {
    let config = ApiConfig {
        base_url: base_url.to_string(),
        username: None,
        password: None,
    };

    let request_config = RequestConfig {
        timeout_ms: 5000,
        max_retries,
        retry_delay_ms,
    };

    ApiClient::new(&config, request_config).expect("Failed to create client")
}

fn profile_json() -> serde_json::Value {
    json!({
        "id": 1,
        "username": "anna",
        "email": "anna@example.com",
        "proficiency_level": "B1"
    })
}

/// Mount the CSRF bootstrap route, expecting exactly `times` calls.
async fn mount_csrf(server: &MockServer, times: u64, delay: Duration) {
    Mock::given(method("GET"))
        .and(path("/api/auth/csrf/"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Set-Cookie", format!("csrftoken={}; Path=/", CSRF_TOKEN).as_str())
                .set_body_json(json!({"csrfToken": CSRF_TOKEN}))
                .set_delay(delay),
        )
        .expect(times)
        .mount(server)
        .await;
}

#[cfg(test)]
mod retry_tests {
    use super::*;

    #[tokio::test]
    async fn test_get_retries_503_then_succeeds() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/auth/me/"))
            .respond_with(ResponseTemplate::new(503).set_body_json(json!({"detail": "busy"})))
            .up_to_n_times(2)
            .expect(2)
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/api/auth/me/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(profile_json()))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server.uri(), 2, 300);
        let start = Instant::now();
        let result = client.me().await;
        let elapsed = start.elapsed();

        assert!(result.is_ok(), "GET should succeed: {:?}", result.err());
        assert_eq!(result.unwrap().username, "anna");
        // 300ms before retry 1, 600ms before retry 2
        assert!(
            elapsed >= Duration::from_millis(900),
            "backoff too short: {:?}",
            elapsed
        );
    }

    #[tokio::test]
    async fn test_get_surfaces_last_error_after_retries() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/study/review/"))
            .respond_with(ResponseTemplate::new(504))
            .expect(3)
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server.uri(), 2, 10);
        let result = client.due_cards().await;

        let err = result.unwrap_err();
        assert!(matches!(err, ApiError::ServiceUnavailable { status: 504, .. }));
        assert_eq!(err.kind(), ErrorKind::ServiceUnavailable);
    }

    #[tokio::test]
    async fn test_get_retries_after_timeout() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/auth/me/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(profile_json())
                    .set_delay(Duration::from_secs(2)),
            )
            .up_to_n_times(1)
            .expect(1)
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/api/auth/me/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(profile_json()))
            .expect(1)
            .mount(&mock_server)
            .await;

        let config = ApiConfig {
            base_url: mock_server.uri(),
            username: None,
            password: None,
        };
        let request_config = RequestConfig {
            timeout_ms: 200,
            max_retries: 2,
            retry_delay_ms: 10,
        };
        let client = ApiClient::new(&config, request_config).unwrap();

        let profile = client.me().await.expect("GET should recover after a timeout");
        assert_eq!(profile.username, "anna");
    }

    #[tokio::test]
    async fn test_get_does_not_retry_client_errors() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/documents/7/"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"detail": "Not found."})))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server.uri(), 2, 10);
        let err = client.document_detail(7).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.user_message(), "Not found.");
    }

    #[tokio::test]
    async fn test_post_500_is_attempted_once() {
        let mock_server = MockServer::start().await;
        mount_csrf(&mock_server, 1, Duration::ZERO).await;

        Mock::given(method("POST"))
            .and(path("/api/documents/"))
            .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server.uri(), 2, 10);
        let err = client
            .create_document("Der Patient ist bewusstlos.", "Texto em alemão")
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Unknown { status: 500, .. }));
        assert_eq!(err.kind(), ErrorKind::Unknown);
    }

    #[tokio::test]
    async fn test_post_503_is_not_retried() {
        let mock_server = MockServer::start().await;
        mount_csrf(&mock_server, 1, Duration::ZERO).await;

        Mock::given(method("POST"))
            .and(path("/api/study/review/5/"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server.uri(), 2, 10);
        let err = client.submit_review(5, 3).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ServiceUnavailable);
    }
}

#[cfg(test)]
mod csrf_tests {
    use super::*;
    use tokio::task::JoinSet;

    #[tokio::test]
    async fn test_concurrent_posts_share_one_csrf_fetch() {
        let mock_server = MockServer::start().await;
        mount_csrf(&mock_server, 1, Duration::from_millis(200)).await;

        Mock::given(method("POST"))
            .and(path("/api/documents/"))
            .and(header("X-CSRFToken", CSRF_TOKEN))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"document_id": 42})))
            .expect(8)
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server.uri(), 0, 10);
        assert!(!client.csrf_ready());

        let mut tasks = JoinSet::new();
        for i in 0..8 {
            let client = client.clone();
            tasks.spawn(async move {
                client
                    .create_document(&format!("Satz {}", i), "Texto em alemão")
                    .await
            });
        }

        while let Some(result) = tasks.join_next().await {
            assert_eq!(result.unwrap().unwrap(), 42);
        }
        assert!(client.csrf_ready());
    }

    #[tokio::test]
    async fn test_post_carries_referer_and_body() {
        let mock_server = MockServer::start().await;
        mount_csrf(&mock_server, 1, Duration::ZERO).await;

        Mock::given(method("POST"))
            .and(path("/api/analysis/lite/"))
            .and(header("Referer", format!("{}/", mock_server.uri()).as_str()))
            .and(body_json(json!({"document_id": 42, "limit": 20})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"tokens": []})))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server.uri(), 0, 10);
        let tokens = client.lite_analysis(42, 20).await.unwrap();
        assert!(tokens.is_empty());
    }

    #[tokio::test]
    async fn test_get_does_not_bootstrap_csrf() {
        let mock_server = MockServer::start().await;
        mount_csrf(&mock_server, 0, Duration::ZERO).await;

        Mock::given(method("GET"))
            .and(path("/api/auth/me/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(profile_json()))
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server.uri(), 0, 10);
        client.me().await.unwrap();
        assert!(!client.csrf_ready());
    }

    #[tokio::test]
    async fn test_csrf_failure_is_retried_on_next_post() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/auth/csrf/"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(1)
            .mount(&mock_server)
            .await;
        mount_csrf(&mock_server, 1, Duration::ZERO).await;

        Mock::given(method("POST"))
            .and(path("/api/auth/login/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(profile_json()))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server.uri(), 0, 10);
        assert!(client.login("anna", "secret").await.is_err());
        assert!(!client.csrf_ready());

        let profile = client.login("anna", "secret").await.unwrap();
        assert_eq!(profile.username, "anna");
    }

    #[tokio::test]
    async fn test_rotated_cookie_wins_over_bootstrap_token() {
        let mock_server = MockServer::start().await;
        mount_csrf(&mock_server, 1, Duration::ZERO).await;

        Mock::given(method("POST"))
            .and(path("/api/auth/login/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("Set-Cookie", "csrftoken=rotated; Path=/")
                    .set_body_json(profile_json()),
            )
            .mount(&mock_server)
            .await;

        Mock::given(method("POST"))
            .and(path("/api/auth/logout/"))
            .and(header("X-CSRFToken", "rotated"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"detail": "Logged out."})))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server.uri(), 0, 10);
        client.login("anna", "secret").await.unwrap();
        assert_eq!(client.cookie_value("csrftoken").as_deref(), Some("rotated"));

        let detail = client.logout().await.unwrap();
        assert_eq!(detail, "Logged out.");
    }
}

#[cfg(test)]
mod classification_tests {
    use super::*;

    async fn get_me_with_status(status: u16, body: serde_json::Value) -> ApiError {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/auth/me/"))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server.uri(), 0, 10);
        client.me().await.unwrap_err()
    }

    #[tokio::test]
    async fn test_401_is_auth_error() {
        let err = get_me_with_status(
            401,
            json!({"detail": "Authentication credentials were not provided."}),
        )
        .await;

        assert!(matches!(err, ApiError::NotAuthenticated { .. }));
        assert_eq!(err.kind(), ErrorKind::Auth);
        assert!(!err.user_message().is_empty());
    }

    #[tokio::test]
    async fn test_429_is_rate_limit_error() {
        let err = get_me_with_status(429, json!({"detail": "Request was throttled."})).await;
        assert_eq!(err.kind(), ErrorKind::RateLimit);
    }

    #[tokio::test]
    async fn test_503_is_service_unavailable() {
        let err = get_me_with_status(503, json!({})).await;
        assert_eq!(err.kind(), ErrorKind::ServiceUnavailable);
        assert_eq!(err.status(), Some(503));
    }

    #[tokio::test]
    async fn test_400_carries_server_detail() {
        let err = get_me_with_status(400, json!({"detail": "Texto vazio."})).await;
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.user_message(), "Texto vazio.");
    }

    #[tokio::test]
    async fn test_malformed_body_is_invalid_response() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/auth/me/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server.uri(), 0, 10);
        let err = client.me().await.unwrap_err();

        assert!(matches!(err, ApiError::InvalidResponse { .. }));
        assert_eq!(err.kind(), ErrorKind::Unknown);
    }

    #[tokio::test]
    async fn test_slow_response_times_out() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/auth/me/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(profile_json())
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&mock_server)
            .await;

        let config = ApiConfig {
            base_url: mock_server.uri(),
            username: None,
            password: None,
        };
        let request_config = RequestConfig {
            timeout_ms: 200,
            max_retries: 0,
            retry_delay_ms: 10,
        };
        let client = ApiClient::new(&config, request_config).unwrap();

        let err = client.me().await.unwrap_err();
        assert!(matches!(err, ApiError::Timeout { timeout_ms: 200 }));
        assert_eq!(err.kind(), ErrorKind::Network);
    }

    #[tokio::test]
    async fn test_unreachable_server_is_network_error() {
        // Port 9 (discard) is not listening in test environments.
        let client = create_test_client("http://127.0.0.1:9", 0, 10);
        let err = client.me().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Network);
    }
}
