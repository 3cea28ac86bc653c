use std::time::Duration;

/// 未被请求或连接覆盖时的默认 HTTP 超时
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP/HTTPS 服务连接
///
/// 无需显式拨号, 每个请求自带截止时间。客户端在连接创建时构建,
/// 生命周期与 Suite 相同。
#[derive(Debug, Clone)]
pub struct HttpConnection {
    name: String,
    base_url: String,
    timeout: Option<Duration>,
    client: reqwest::Client,
}

impl HttpConnection {
    pub fn new(name: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            timeout: None,
            client: reqwest::Client::new(),
        }
    }

    /// 覆盖该连接上所有请求的默认超时
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// 使用自定义 reqwest 客户端
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub(crate) fn client(&self) -> &reqwest::Client {
        &self.client
    }
}
