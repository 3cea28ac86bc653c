use std::collections::HashMap;
use std::time::Duration;

use crate::error::Result;
use crate::http::connection::{DEFAULT_HTTP_TIMEOUT, HttpConnection};
use crate::variable::VarStore;

/// 一次出站 HTTP 请求
///
/// 构建后不可变; 路径、查询参数、请求头和请求体中的字符串字段都可
/// 携带 `{name}` 占位符, 执行时从变量存储插值。
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub(crate) method: reqwest::Method,
    pub(crate) path: String,
    pub(crate) body: Vec<u8>,
    pub(crate) headers: HashMap<String, String>,
    pub(crate) query: HashMap<String, String>,
    pub(crate) timeout: Option<Duration>,
}

impl HttpRequest {
    pub fn new(method: reqwest::Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: Vec::new(),
            headers: HashMap::new(),
            query: HashMap::new(),
            timeout: None,
        }
    }

    pub fn method(&self) -> &reqwest::Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// 执行请求并返回未读取响应体的原始响应
    ///
    /// 超时解析顺序: 请求覆盖 → 连接覆盖 → 默认 30 秒。
    pub(crate) async fn run(
        &self,
        conn: &HttpConnection,
        vars: &VarStore,
    ) -> Result<reqwest::Response> {
        let path = vars.interpolate(&self.path);
        let url = format!(
            "{}/{}",
            conn.base_url().trim_end_matches('/'),
            path.trim_start_matches('/')
        );

        let timeout = self
            .timeout
            .or(conn.timeout())
            .unwrap_or(DEFAULT_HTTP_TIMEOUT);

        let mut request = conn
            .client()
            .request(self.method.clone(), &url)
            .timeout(timeout);

        if !self.query.is_empty() {
            let pairs: Vec<(&str, String)> = self
                .query
                .iter()
                .map(|(k, v)| (k.as_str(), vars.interpolate(v)))
                .collect();
            request = request.query(&pairs);
        }

        for (key, value) in &self.headers {
            request = request.header(key, vars.interpolate(value));
        }

        if !self.body.is_empty() {
            request = request.body(vars.interpolate_bytes(&self.body));
        }

        let response = request.send().await?;
        Ok(response)
    }
}
