//! Protection SDK over the Developer Edition REST API

use super::sdk::{ProtectionSdk, ProtectionSession};
use crate::config::{Credentials, ProtectionConfig};
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const API_KEY_HEADER: &str = "x-api-key";

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    jwt_token: String,
}

#[derive(Serialize)]
struct ProtectRequest<'a> {
    policy_user: &'a str,
    data_element: &'a str,
    data: [&'a str; 1],
}

#[derive(Deserialize)]
struct ProtectResponse {
    results: Vec<String>,
}

/// REST-backed protection SDK.
///
/// Holds the credentials read at startup; each session logs in once and
/// reuses its bearer token.
pub struct HttpProtectionSdk {
    base_url: String,
    credentials: Credentials,
    client: reqwest::Client,
}

impl HttpProtectionSdk {
    pub fn new(config: &ProtectionConfig, credentials: Credentials) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("Failed to build protection HTTP client: {}", e)))?;

        Ok(Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            credentials,
            client,
        })
    }
}

#[async_trait]
impl ProtectionSdk for HttpProtectionSdk {
    async fn create_session(&self, policy_user: &str) -> Result<Box<dyn ProtectionSession>> {
        let url = format!("{}/auth/login", self.base_url);
        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, &self.credentials.api_key)
            .json(&LoginRequest {
                email: &self.credentials.email,
                password: &self.credentials.password,
            })
            .send()
            .await
            .map_err(|e| transport_error("login", &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::protection(format!(
                "login rejected with status {}",
                status.as_u16()
            )));
        }

        let login: LoginResponse = response
            .json()
            .await
            .map_err(|_| Error::protection("login response did not contain a token"))?;

        tracing::debug!(policy_user, "Protection session created");

        Ok(Box::new(HttpSession {
            base_url: self.base_url.clone(),
            api_key: self.credentials.api_key.clone(),
            token: login.jwt_token,
            policy_user: policy_user.to_string(),
            client: self.client.clone(),
        }))
    }

    fn name(&self) -> &str {
        "developer-edition"
    }
}

struct HttpSession {
    base_url: String,
    api_key: String,
    token: String,
    policy_user: String,
    client: reqwest::Client,
}

impl HttpSession {
    async fn call(&self, operation: &str, data_element: &str, input: &str) -> Result<String> {
        let url = format!("{}/{}", self.base_url, operation);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&ProtectRequest {
                policy_user: &self.policy_user,
                data_element,
                data: [input],
            })
            .send()
            .await
            .map_err(|e| transport_error(operation, &e))?;

        let status = response.status();
        if !status.is_success() {
            // Response bodies may echo the payload; only the status is reported
            return Err(Error::protection(format!(
                "{} of data element '{}' failed with status {}",
                operation,
                data_element,
                status.as_u16()
            )));
        }

        let parsed: ProtectResponse = response.json().await.map_err(|_| {
            Error::protection(format!("{} response could not be parsed", operation))
        })?;

        parsed
            .results
            .into_iter()
            .next()
            .ok_or_else(|| Error::protection(format!("{} response contained no result", operation)))
    }
}

#[async_trait]
impl ProtectionSession for HttpSession {
    async fn protect(&self, data_element: &str, input: &str) -> Result<String> {
        self.call("protect", data_element, input).await
    }

    async fn unprotect(&self, data_element: &str, input: &str) -> Result<String> {
        self.call("unprotect", data_element, input).await
    }
}

fn transport_error(operation: &str, err: &reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::protection(format!("{} request timed out", operation))
    } else {
        Error::protection(format!("{} request could not be sent", operation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        http::{HeaderMap, StatusCode},
        routing::post,
        Json, Router,
    };
    use serde_json::{json, Value};

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}/v1", addr)
    }

    fn credentials(password: &str) -> Credentials {
        Credentials {
            email: "dev@example.com".to_string(),
            password: password.to_string(),
            api_key: "key-123".to_string(),
        }
    }

    fn fake_service() -> Router {
        Router::new()
            .route(
                "/v1/auth/login",
                post(|headers: HeaderMap, Json(body): Json<Value>| async move {
                    if headers[API_KEY_HEADER] != "key-123" || body["password"] != "hunter2" {
                        return Err(StatusCode::UNAUTHORIZED);
                    }
                    Ok(Json(json!({"jwt_token": "jwt-abc"})))
                }),
            )
            .route(
                "/v1/protect",
                post(|headers: HeaderMap, Json(body): Json<Value>| async move {
                    assert_eq!(headers["authorization"], "Bearer jwt-abc");
                    let value = body["data"][0].as_str().unwrap_or_default();
                    let token: String = value.chars().rev().collect();
                    Json(json!({"results": [format!("{}:{}", body["data_element"].as_str().unwrap_or_default(), token)]}))
                }),
            )
            .route(
                "/v1/unprotect",
                post(|Json(body): Json<Value>| async move {
                    let value = body["data"][0].as_str().unwrap_or_default();
                    let token = value.split_once(':').map(|(_, t)| t).unwrap_or(value);
                    Json(json!({"results": [token.chars().rev().collect::<String>()]}))
                }),
            )
    }

    fn config(url: String) -> ProtectionConfig {
        ProtectionConfig {
            url,
            timeout_secs: 5,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_protect_unprotect_roundtrip() {
        let url = serve(fake_service()).await;
        let sdk = HttpProtectionSdk::new(&config(url), credentials("hunter2")).unwrap();
        let session = sdk.create_session("superuser").await.unwrap();

        let token = session.protect("ssn", "234-23-2344").await.unwrap();
        assert_eq!(token, "ssn:4432-32-432");
        let restored = session.unprotect("ssn", &token).await.unwrap();
        assert_eq!(restored, "234-23-2344");
    }

    #[tokio::test]
    async fn test_login_rejected() {
        let url = serve(fake_service()).await;
        let sdk = HttpProtectionSdk::new(&config(url), credentials("wrong")).unwrap();

        let err = sdk.create_session("superuser").await.err().unwrap();
        assert_eq!(err.kind(), "protection_error");
        assert!(err.to_string().contains("401"));
        assert!(!err.to_string().contains("wrong"));
    }

    #[tokio::test]
    async fn test_protect_failure_does_not_echo_payload() {
        let router = fake_service().route(
            "/v1/fail/protect",
            post(|| async { (StatusCode::BAD_REQUEST, "cannot protect 234-23-2344") }),
        );
        let url = serve(router).await;
        let session = HttpSession {
            base_url: format!("{}/fail", url),
            api_key: "key-123".to_string(),
            token: "jwt-abc".to_string(),
            policy_user: "superuser".to_string(),
            client: reqwest::Client::new(),
        };

        let err = session.protect("ssn", "234-23-2344").await.unwrap_err();
        assert!(err.to_string().contains("400"));
        assert!(!err.to_string().contains("234-23-2344"));
    }
}
