//! API 客户端
//!
//! 所有后端调用都经过 `ApiClient::fetch`：统一附加 JSON 与 Bearer 头，
//! 并把成功/失败响应规整成 `ApiResult<Value>`。

use crate::error::{ApiError, ApiResult};
use crate::request::{HttpClient, HttpRequest, HttpResponse};
use edusync_shared::protocol::{ApiRequest, HttpMethod};
use edusync_shared::{CONTENT_TYPE_JSON, HEADER_AUTHORIZATION, HEADER_CONTENT_TYPE};
use serde_json::{Map, Value};

const GENERIC_FAILURE: &str = "Request failed";

#[derive(Clone, Debug)]
pub struct ApiClient<C: HttpClient> {
    base_url: String,
    client: C,
}

impl<C: HttpClient> ApiClient<C> {
    pub fn new(base_url: impl Into<String>, client: C) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url, client }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// 发出一次请求
    ///
    /// 只做一次网络尝试。成功响应：空体得到 `{}`，非 JSON 体得到 `ApiError::Parse`。
    /// 失败响应：得到 `ApiError::Http`，消息依次取自 `error.message`、`message`、
    /// 原始响应文本，最后是通用消息。
    pub async fn fetch(
        &self,
        path: &str,
        method: HttpMethod,
        token: Option<&str>,
        body: Option<&Value>,
    ) -> ApiResult<Value> {
        let mut req = HttpRequest::new(&self.url(path), method)
            .with_header(HEADER_CONTENT_TYPE, CONTENT_TYPE_JSON);
        if let Some(token) = token {
            req = req.with_header(HEADER_AUTHORIZATION, &format!("Bearer {}", token));
        }
        if let Some(body) = body {
            req = req.with_body(body);
        }

        tracing::debug!(
            method = method.as_str(),
            path,
            payload = ?body,
            headers = ?redacted_headers(&req),
            "api request"
        );

        let resp = match self.client.send(req).await {
            Ok(resp) => resp,
            Err(e) => {
                tracing::error!(method = method.as_str(), path, error = %e, "api request failed");
                return Err(e);
            }
        };

        let result = interpret_response(resp);
        match &result {
            Ok(value) => tracing::debug!(method = method.as_str(), path, response = %value, "api response"),
            Err(e) => tracing::warn!(method = method.as_str(), path, error = %e, "api error"),
        }
        result
    }

    /// 发送类型化请求并解码响应
    ///
    /// 响应 JSON 与约定结构不符时返回 `ApiError::InvalidResponse`。
    pub async fn send<R: ApiRequest>(&self, req: &R, token: Option<&str>) -> ApiResult<R::Response> {
        let body = if R::METHOD.has_body() {
            Some(serde_json::to_value(req).map_err(|e| ApiError::validation(e.to_string()))?)
        } else {
            None
        };

        let path = req.path();
        let value = self.fetch(&path, R::METHOD, token, body.as_ref()).await?;

        serde_json::from_value(value).map_err(|e| {
            tracing::warn!(path = %path, error = %e, "unexpected response shape");
            ApiError::invalid_response(format!("{}: {}", path, e))
        })
    }
}

fn redacted_headers(req: &HttpRequest) -> Vec<(String, String)> {
    req.headers
        .iter()
        .map(|(k, v)| {
            if k.eq_ignore_ascii_case(HEADER_AUTHORIZATION) {
                (k.clone(), "Bearer <redacted>".to_string())
            } else {
                (k.clone(), v.clone())
            }
        })
        .collect()
}

fn interpret_response(resp: HttpResponse) -> ApiResult<Value> {
    if resp.is_success() {
        if resp.body.trim().is_empty() {
            return Ok(Value::Object(Map::new()));
        }
        return serde_json::from_str(&resp.body).map_err(|_| ApiError::Parse);
    }

    Err(ApiError::Http {
        status: resp.status,
        message: error_message(&resp.body),
    })
}

fn error_message(body: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(json) => json
            .pointer("/error/message")
            .and_then(Value::as_str)
            .or_else(|| json.get("message").and_then(Value::as_str))
            .or_else(|| json.get("error").and_then(Value::as_str))
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(GENERIC_FAILURE)
            .to_string(),
        Err(_) if !body.trim().is_empty() => body.trim().to_string(),
        Err(_) => GENERIC_FAILURE.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::MockHttpClient;
    use edusync_shared::protocol::{GetClassroom, UpdateSubmissionRequest};
    use serde_json::json;

    const BASE: &str = "http://api.test";

    fn setup() -> (MockHttpClient, ApiClient<MockHttpClient>) {
        let mock = MockHttpClient::new();
        let api = ApiClient::new(format!("{}/", BASE), mock.clone());
        (mock, api)
    }

    #[tokio::test]
    async fn attaches_json_and_bearer_headers() {
        let (mock, api) = setup();
        mock.mock_response(HttpMethod::Get, "http://api.test/profile", 200, json!({"id": 1}));

        api.fetch("/profile", HttpMethod::Get, Some("tok"), None)
            .await
            .unwrap();

        let req = &mock.requests()[0];
        assert_eq!(req.url, "http://api.test/profile");
        assert_eq!(req.header("Content-Type"), Some("application/json"));
        assert_eq!(req.header("Authorization"), Some("Bearer tok"));
        assert!(req.body.is_none());
    }

    #[tokio::test]
    async fn omits_authorization_without_token() {
        let (mock, api) = setup();
        mock.mock_response(HttpMethod::Post, "http://api.test/login", 200, json!({}));

        api.fetch("login", HttpMethod::Post, None, Some(&json!({"email": "a"})))
            .await
            .unwrap();

        let req = &mock.requests()[0];
        assert_eq!(req.header("Authorization"), None);
        assert_eq!(req.json_body(), Some(json!({"email": "a"})));
    }

    #[tokio::test]
    async fn not_found_message_is_extracted() {
        let (mock, api) = setup();
        mock.mock_response(
            HttpMethod::Get,
            "http://api.test/classrooms/1",
            404,
            json!({"message": "not found"}),
        );

        let err = api
            .fetch("/classrooms/1", HttpMethod::Get, None, None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not found (Status: 404)"));
    }

    #[tokio::test]
    async fn nested_error_message_wins() {
        let (mock, api) = setup();
        mock.mock_response(
            HttpMethod::Post,
            "http://api.test/enroll",
            400,
            json!({"error": {"message": "no classroom exists"}, "message": "outer"}),
        );

        let err = api
            .fetch("/enroll", HttpMethod::Post, None, None)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "no classroom exists (Status: 400)");
    }

    #[tokio::test]
    async fn raw_text_and_generic_fallbacks() {
        let (mock, api) = setup();
        mock.mock_raw(HttpMethod::Get, "http://api.test/a", 502, "Bad Gateway");
        mock.mock_raw(HttpMethod::Get, "http://api.test/b", 500, "");

        let a = api.fetch("/a", HttpMethod::Get, None, None).await.unwrap_err();
        assert_eq!(a.to_string(), "Bad Gateway (Status: 502)");

        let b = api.fetch("/b", HttpMethod::Get, None, None).await.unwrap_err();
        assert_eq!(b.to_string(), "Request failed (Status: 500)");
        assert_eq!(b.status(), Some(500));
    }

    #[tokio::test]
    async fn empty_success_body_is_empty_object() {
        let (mock, api) = setup();
        mock.mock_raw(HttpMethod::Delete, "http://api.test/materials/3", 200, "");

        let value = api
            .fetch("/materials/3", HttpMethod::Delete, Some("t"), None)
            .await
            .unwrap();
        assert_eq!(value, json!({}));
    }

    #[tokio::test]
    async fn non_json_success_body_is_parse_error() {
        let (mock, api) = setup();
        mock.mock_raw(HttpMethod::Get, "http://api.test/stats", 200, "<html>");

        let err = api.fetch("/stats", HttpMethod::Get, None, None).await.unwrap_err();
        assert_eq!(err, ApiError::Parse);
        assert_eq!(err.to_string(), "Failed to parse response as JSON");
    }

    #[tokio::test]
    async fn network_failure_passes_through() {
        let (mock, api) = setup();
        mock.mock_network_failure(HttpMethod::Get, "http://api.test/stats");

        let err = api.fetch("/stats", HttpMethod::Get, None, None).await.unwrap_err();
        assert!(matches!(err, ApiError::Network(_)));
        assert_eq!(mock.request_count(), 1);
    }

    #[tokio::test]
    async fn typed_send_skips_body_for_get_and_decodes() {
        let (mock, api) = setup();
        mock.mock_response(
            HttpMethod::Get,
            "http://api.test/classrooms/5",
            200,
            json!({"id": 5, "title": "Chemistry", "assignments": [{"id": 1, "course_id": 5, "title": "Lab"}]}),
        );

        let detail = api.send(&GetClassroom(5), Some("t")).await.unwrap();
        assert_eq!(detail.course.title, "Chemistry");
        assert_eq!(detail.assignments.len(), 1);
        assert!(mock.requests()[0].body.is_none());
    }

    #[tokio::test]
    async fn typed_send_serializes_body_without_path_id() {
        let (mock, api) = setup();
        mock.mock_response(HttpMethod::Put, "http://api.test/submissions/8", 200, json!({}));

        let req = UpdateSubmissionRequest {
            id: 8,
            content: "final".into(),
        };
        api.send(&req, Some("t")).await.unwrap();
        assert_eq!(mock.requests()[0].json_body(), Some(json!({"content": "final"})));
    }

    #[tokio::test]
    async fn typed_send_flags_shape_mismatch() {
        let (mock, api) = setup();
        mock.mock_response(HttpMethod::Get, "http://api.test/classrooms/5", 200, json!({"id": "x"}));

        let err = api.send(&GetClassroom(5), None).await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidResponse(_)));
    }
}
