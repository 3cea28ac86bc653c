use tonic::Code;

use crate::assertion::MatchError;
use crate::connection::Connection;
use crate::error::{Error, Result};
use crate::grpc::{GrpcExpect, GrpcRequest, code_name};
use crate::http::{HttpExpect, HttpRequest};
use crate::variable::VarStore;

/// 协议特定请求
#[derive(Debug, Clone)]
pub enum RequestSpec {
    Http(HttpRequest),
    Grpc(GrpcRequest),
}

/// 协议特定期望
#[derive(Debug, Clone)]
pub enum ExpectSpec {
    Http(HttpExpect),
    Grpc(GrpcExpect),
}

/// 场景中的单个请求/期望对
///
/// 绑定到一个命名连接 (缺省时使用 Suite 默认连接)。没有请求的步骤
/// 是空操作。请求协议与解析出的连接协议不一致时, 作为步骤级错误
/// 记录, 不会 panic。
#[derive(Debug, Default)]
pub struct Step {
    pub(crate) connection: Option<String>,
    pub(crate) request: Option<RequestSpec>,
    pub(crate) expect: Option<ExpectSpec>,
}

impl Step {
    pub fn connection_name(&self) -> Option<&str> {
        self.connection.as_deref()
    }

    /// 在给定连接上执行请求并校验期望
    pub(crate) async fn run(&self, conn: &Connection, vars: &mut VarStore) -> Result<()> {
        let Some(request) = &self.request else {
            return Ok(());
        };

        match (request, conn) {
            (RequestSpec::Http(request), Connection::Http(conn)) => {
                let response = request.run(conn, vars).await?;
                match &self.expect {
                    Some(ExpectSpec::Http(expect)) => expect.validate(response, vars).await,
                    Some(ExpectSpec::Grpc(_)) => Err(Error::ConnectionMismatch(
                        "gRPC expectation on an HTTP step".to_string(),
                    )),
                    None => Ok(()),
                }
            }

            (RequestSpec::Grpc(request), Connection::Grpc(conn)) => {
                let outcome = request.run(conn, vars).await?;
                match &self.expect {
                    Some(ExpectSpec::Grpc(expect)) => expect.validate(&outcome, vars),
                    Some(ExpectSpec::Http(_)) => Err(Error::ConnectionMismatch(
                        "HTTP expectation on a gRPC step".to_string(),
                    )),
                    None => {
                        if outcome.code != Code::Ok {
                            return Err(MatchError::new(format!(
                                "unexpected grpc error: {}: {}",
                                code_name(outcome.code),
                                outcome.message
                            ))
                            .into());
                        }
                        Ok(())
                    }
                }
            }

            (RequestSpec::Http(_), Connection::Grpc(conn)) => Err(Error::ConnectionMismatch(
                format!("HTTP request cannot run on gRPC connection {:?}", conn.name()),
            )),

            (RequestSpec::Grpc(_), Connection::Http(conn)) => Err(Error::ConnectionMismatch(
                format!("gRPC request cannot run on HTTP connection {:?}", conn.name()),
            )),
        }
    }

    /// 报告用标签: 序号加协议相关描述
    pub(crate) fn label(&self, index: usize) -> String {
        match &self.request {
            None => format!("[{}] (no request)", index + 1),
            Some(RequestSpec::Http(request)) => {
                format!("[{}] {} {}", index + 1, request.method(), request.path())
            }
            Some(RequestSpec::Grpc(request)) => {
                format!("[{}] grpc {}", index + 1, request.full_method())
            }
        }
    }
}
