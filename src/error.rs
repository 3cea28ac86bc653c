use thiserror::Error;

use crate::assertion::MatchError;

/// 引擎统一错误类型
///
/// 错误按类别划分: 连接建立 / 方法解析 / 传输 / 断言校验 / 钩子 / 加载。
/// 步骤级错误由 Scenario 捕获记录, 不会向上穿透到 Suite 之外。
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("http transport: {0}")]
    Http(#[from] reqwest::Error),

    #[error("grpc dial {addr:?}: {source}")]
    Dial {
        addr: String,
        #[source]
        source: tonic::transport::Error,
    },

    #[error("resolve {method:?}: {reason}")]
    Resolve { method: String, reason: String },

    #[error("invalid grpc metadata key/value {0:?}")]
    Metadata(String),

    #[error("{0}")]
    Validation(#[from] MatchError),

    #[error("no connection named {0:?} and no default connection")]
    UnknownConnection(String),

    #[error("mismatched connection: {0}")]
    ConnectionMismatch(String),

    #[error("hook failed: {0}")]
    Hook(#[source] anyhow::Error),

    #[error("unknown connection type {0:?}")]
    UnknownConnectionType(String),

    #[error("invalid http method {0:?}")]
    InvalidMethod(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for the ruxpect crate
pub type Result<T> = std::result::Result<T, Error>;
