use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::{
    config::Config,
    error::{AppError, Result},
    models::moderation::{ActionResponse, ContentKind},
};

/// 后端提供的破坏性操作接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ModerationApi: Send + Sync {
    /// DELETE /account/{userName}
    async fn delete_account(&self, user_name: &str) -> Result<ActionResponse>;

    /// DELETE /{contentType}s/{contentId}/{ownerId}
    async fn delete_content(&self, kind: ContentKind, content_id: &str, owner_id: &str) -> Result<ActionResponse>;

    /// DELETE /report/admin/reports/{reportId}
    async fn delete_report(&self, report_id: &str) -> Result<ActionResponse>;
}

/// 后端REST客户端，所有请求都带上会话Cookie
#[derive(Clone)]
pub struct ApiClient {
    base_url: Url,
    http_client: Client,
    session_cookie: Option<String>,
}

impl ApiClient {
    pub fn new(config: &Config) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url: Url::parse(&config.api_base_url)?,
            http_client,
            session_cookie: config.session_cookie.clone(),
        })
    }

    /// 拼接接口地址，每一段都会做百分号编码
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| AppError::config("API base URL cannot be a base"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn delete(&self, url: Url) -> Result<ActionResponse> {
        debug!("DELETE {}", url);

        let mut request = self.http_client.delete(url.clone());
        if let Some(cookie) = &self.session_cookie {
            request = request.header(header::COOKIE, cookie);
        }

        let response = request.send().await.map_err(|e| {
            error!("DELETE {} failed: {}", url, e);
            AppError::Request(e)
        })?;

        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            // 204 等空响应体视为成功
            if body.trim().is_empty() {
                info!("DELETE {} -> {} (empty body)", url, status);
                return Ok(ActionResponse { success: true, deleted_media: None, error: None });
            }

            let parsed: ActionResponse = serde_json::from_str(&body)?;
            info!("DELETE {} -> {} (success: {})", url, status, parsed.success);
            return Ok(parsed);
        }

        warn!("DELETE {} returned error status: {}", url, status);
        let server_message = serde_json::from_str::<ActionResponse>(&body)
            .ok()
            .and_then(|r| r.error)
            .filter(|m| !m.trim().is_empty());

        Err(match (status, server_message) {
            (_, Some(message)) => AppError::Server {
                status: status.as_u16(),
                message,
            },
            (StatusCode::UNAUTHORIZED, None) => AppError::unauthorized("Session expired"),
            (StatusCode::FORBIDDEN, None) => AppError::forbidden("Not allowed"),
            (StatusCode::NOT_FOUND, None) => AppError::not_found("Resource"),
            (_, None) => AppError::Server {
                status: status.as_u16(),
                message: format!("Request failed with status {}", status.as_u16()),
            },
        })
    }
}

#[async_trait]
impl ModerationApi for ApiClient {
    async fn delete_account(&self, user_name: &str) -> Result<ActionResponse> {
        let url = self.endpoint(&["account", user_name])?;
        self.delete(url).await
    }

    async fn delete_content(&self, kind: ContentKind, content_id: &str, owner_id: &str) -> Result<ActionResponse> {
        let collection = format!("{}s", kind.as_str());
        let url = self.endpoint(&[collection.as_str(), content_id, owner_id])?;
        self.delete(url).await
    }

    async fn delete_report(&self, report_id: &str) -> Result<ActionResponse> {
        let url = self.endpoint(&["report", "admin", "reports", report_id])?;
        self.delete(url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::{
        matchers::{header as header_matcher, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    fn client_for(server: &MockServer, cookie: Option<&str>) -> ApiClient {
        let config = Config {
            api_base_url: server.uri(),
            session_cookie: cookie.map(str::to_string),
            ..Config::default()
        };
        ApiClient::new(&config).unwrap()
    }

    #[test]
    fn test_endpoint_encodes_segments() {
        let config = Config {
            api_base_url: "http://localhost:5000/api/".to_string(),
            ..Config::default()
        };
        let client = ApiClient::new(&config).unwrap();

        let url = client.endpoint(&["account", "ali ce/x"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:5000/api/account/ali%20ce%2Fx");
    }

    #[tokio::test]
    async fn test_delete_account_sends_cookie() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/account/alice"))
            .and(header_matcher("cookie", "sid=abc123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "deletedMedia": 4
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Some("sid=abc123"));
        let response = client.delete_account("alice").await.unwrap();

        assert!(response.success);
        assert_eq!(response.deleted_media, Some(4));
    }

    #[tokio::test]
    async fn test_delete_content_path() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/videos/v1/u9"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        let response = client.delete_content(ContentKind::Video, "v1", "u9").await.unwrap();
        assert!(response.success);
    }

    #[tokio::test]
    async fn test_error_body_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/report/admin/reports/r1"))
            .respond_with(ResponseTemplate::new(409).set_body_json(json!({
                "success": false,
                "error": "Report is already being handled"
            })))
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        let err = client.delete_report("r1").await.unwrap_err();

        assert!(matches!(err, AppError::Server { status: 409, .. }));
        assert_eq!(err.user_message(), "Report is already being handled");
    }

    #[tokio::test]
    async fn test_status_without_body_maps_to_error_kind() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/posts/p1/u1"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        let err = client.delete_content(ContentKind::Post, "p1", "u1").await.unwrap_err();
        assert!(matches!(err, AppError::Authorization(_)));
    }

    #[tokio::test]
    async fn test_empty_success_body_counts_as_success() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/account/alice"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        let response = client.delete_account("alice").await.unwrap();

        assert!(response.success);
        assert_eq!(response.deleted_media, None);
    }
}
