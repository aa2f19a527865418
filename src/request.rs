use crate::error::{ApiError, ApiResult};
use edusync_shared::protocol::HttpMethod;
use std::time::Duration;

#[cfg(test)]
use std::{
    cell::{Cell, RefCell},
    collections::HashMap,
    rc::Rc,
};

// =========================================================
// 核心抽象层 (HTTP Interface Abstraction)
// =========================================================

/// 通用 HTTP 请求结构
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub url: String,
    pub method: HttpMethod,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    pub fn new(url: &str, method: HttpMethod) -> Self {
        Self {
            url: url.to_string(),
            method,
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn with_header(mut self, key: &str, value: &str) -> Self {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(key));
        self.headers.push((key.to_string(), value.to_string()));
        self
    }

    pub fn with_body(mut self, body: &serde_json::Value) -> Self {
        self.body = Some(body.to_string());
        self
    }

    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }
}

/// 通用 HTTP 响应结构
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP 客户端特性 (Trait)
///
/// 只做一次网络尝试：无重试。网络层失败返回 `ApiError::Network`，
/// 任何收到的响应（包括非 2xx）都原样返回给上层解释。
/// 使用 `?Send`，因为浏览器环境下的 future 不是 Send 的。
#[async_trait::async_trait(?Send)]
pub trait HttpClient {
    async fn send(&self, req: HttpRequest) -> ApiResult<HttpResponse>;
}

// =========================================================
// 实现层: reqwest 客户端 (native + wasm32)
// =========================================================

#[derive(Clone, Debug)]
pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    /// 创建客户端
    ///
    /// 超时只在 native 目标上生效；两个目标上丢弃 future 都会取消请求。
    pub fn new(timeout: Option<Duration>) -> ApiResult<Self> {
        #[cfg(not(target_arch = "wasm32"))]
        let client = {
            let mut builder = reqwest::Client::builder();
            if let Some(timeout) = timeout {
                builder = builder.timeout(timeout);
            }
            builder
                .build()
                .map_err(|e| ApiError::network(format!("failed to build HTTP client: {}", e)))?
        };

        #[cfg(target_arch = "wasm32")]
        let client = {
            if timeout.is_some() {
                tracing::debug!("request timeout is not supported by the browser transport");
            }
            reqwest::Client::new()
        };

        Ok(Self { client })
    }
}

#[async_trait::async_trait(?Send)]
impl HttpClient for ReqwestHttpClient {
    async fn send(&self, req: HttpRequest) -> ApiResult<HttpResponse> {
        let method = match req.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self.client.request(method, &req.url);
        for (k, v) in &req.headers {
            builder = builder.header(k.as_str(), v.as_str());
        }
        if let Some(body) = req.body {
            builder = builder.body(body);
        }

        let resp = builder.send().await.map_err(|e| ApiError::network(e.to_string()))?;
        let status = resp.status().as_u16();
        let body = resp.text().await.map_err(|e| ApiError::network(e.to_string()))?;

        Ok(HttpResponse { status, body })
    }
}

// =========================================================
// 测试工具: MockHttpClient
// =========================================================

#[cfg(test)]
#[derive(Debug, Clone)]
pub enum MockReply {
    Status(u16, String),
    NetworkFailure(String),
}

/// 记录下来的请求 (Method, URL, Headers, Body)
#[cfg(test)]
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

#[cfg(test)]
impl RecordedRequest {
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    pub fn json_body(&self) -> Option<serde_json::Value> {
        self.body.as_deref().and_then(|b| serde_json::from_str(b).ok())
    }
}

#[cfg(test)]
#[derive(Default)]
struct MockState {
    // ((Method, URL), Reply)
    responses: RefCell<HashMap<(HttpMethod, String), MockReply>>,
    requests: RefCell<Vec<RecordedRequest>>,
    in_flight: Cell<usize>,
    peak_in_flight: Cell<usize>,
}

/// 可克隆的 mock：克隆体共享同一份状态，测试保留一份用于断言
#[cfg(test)]
#[derive(Clone, Default)]
pub struct MockHttpClient {
    state: Rc<MockState>,
}

#[cfg(test)]
impl MockHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mock_response(&self, method: HttpMethod, url: &str, status: u16, body: serde_json::Value) {
        self.mock_raw(method, url, status, &body.to_string());
    }

    pub fn mock_raw(&self, method: HttpMethod, url: &str, status: u16, body: &str) {
        self.state.responses.borrow_mut().insert(
            (method, url.to_string()),
            MockReply::Status(status, body.to_string()),
        );
    }

    pub fn mock_network_failure(&self, method: HttpMethod, url: &str) {
        self.state.responses.borrow_mut().insert(
            (method, url.to_string()),
            MockReply::NetworkFailure("connection refused".to_string()),
        );
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.borrow().clone()
    }

    pub fn request_count(&self) -> usize {
        self.state.requests.borrow().len()
    }

    pub fn count_for(&self, method: HttpMethod, url: &str) -> usize {
        self.state
            .requests
            .borrow()
            .iter()
            .filter(|r| r.method == method && r.url == url)
            .count()
    }

    pub fn peak_in_flight(&self) -> usize {
        self.state.peak_in_flight.get()
    }
}

#[cfg(test)]
#[async_trait::async_trait(?Send)]
impl HttpClient for MockHttpClient {
    async fn send(&self, req: HttpRequest) -> ApiResult<HttpResponse> {
        self.state.requests.borrow_mut().push(RecordedRequest {
            method: req.method,
            url: req.url.clone(),
            headers: req.headers.clone(),
            body: req.body.clone(),
        });

        let now = self.state.in_flight.get() + 1;
        self.state.in_flight.set(now);
        if now > self.state.peak_in_flight.get() {
            self.state.peak_in_flight.set(now);
        }

        // 让出一次执行权，使并发发出的请求能够同时处于 in-flight 状态
        tokio::task::yield_now().await;

        self.state.in_flight.set(self.state.in_flight.get() - 1);

        let reply = self
            .state
            .responses
            .borrow()
            .get(&(req.method, req.url.clone()))
            .cloned();

        match reply {
            Some(MockReply::Status(status, body)) => Ok(HttpResponse { status, body }),
            Some(MockReply::NetworkFailure(msg)) => Err(ApiError::network(msg)),
            None => Ok(HttpResponse {
                status: 404,
                body: "Not Found".to_string(),
            }),
        }
    }
}
