use std::fmt;

use crate::grpc::GrpcConnection;
use crate::http::HttpConnection;

/// 连接的协议类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Http,
    Grpc,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Http => write!(f, "http"),
            Protocol::Grpc => write!(f, "grpc"),
        }
    }
}

/// 被测服务的命名连接
///
/// 协议集合是封闭的: 请求执行、期望校验和连接解析都只在这一个
/// 分发点上按变体派发。
#[derive(Debug)]
pub enum Connection {
    Http(HttpConnection),
    Grpc(GrpcConnection),
}

impl Connection {
    /// HTTP 连接的便捷构造
    pub fn http(name: impl Into<String>, base_url: impl Into<String>) -> Self {
        Connection::Http(HttpConnection::new(name, base_url))
    }

    /// gRPC 连接的便捷构造
    pub fn grpc(name: impl Into<String>, addr: impl Into<String>) -> Self {
        Connection::Grpc(GrpcConnection::new(name, addr))
    }

    pub fn name(&self) -> &str {
        match self {
            Connection::Http(conn) => conn.name(),
            Connection::Grpc(conn) => conn.name(),
        }
    }

    pub fn protocol(&self) -> Protocol {
        match self {
            Connection::Http(_) => Protocol::Http,
            Connection::Grpc(_) => Protocol::Grpc,
        }
    }

    /// 释放连接持有的传输资源
    ///
    /// HTTP 连接无需显式拆除; gRPC 连接丢弃缓存的通道, 之后再次
    /// 使用会重新拨号。
    pub async fn close(&self) {
        match self {
            Connection::Http(_) => {}
            Connection::Grpc(conn) => conn.close().await,
        }
    }
}

impl From<HttpConnection> for Connection {
    fn from(conn: HttpConnection) -> Self {
        Connection::Http(conn)
    }
}

impl From<GrpcConnection> for Connection {
    fn from(conn: GrpcConnection) -> Self {
        Connection::Grpc(conn)
    }
}
