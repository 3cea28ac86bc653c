use tonic::Code;

use crate::assertion::{BodyExpect, MatchError, SaveEntry, save_from_json};
use crate::error::Result;
use crate::grpc::request::GrpcOutcome;
use crate::variable::VarStore;

/// 期望的 gRPC 响应
///
/// `code` 为期望的状态码名 (如 "OK", "NOT_FOUND"); 未设置时任何
/// 非 OK 结果本身即为失败。响应体断言与字段提取和 HTTP 行为一致。
#[derive(Debug, Clone, Default)]
pub struct GrpcExpect {
    pub(crate) code: Option<String>,
    pub(crate) body: Option<BodyExpect>,
    pub(crate) save: Vec<SaveEntry>,
}

impl GrpcExpect {
    pub(crate) fn validate(&self, outcome: &GrpcOutcome, vars: &mut VarStore) -> Result<()> {
        match &self.code {
            Some(expected) => {
                let actual = code_name(outcome.code);
                if actual != expected {
                    return Err(MatchError::new(format!("unexpected grpc code: {actual}")).into());
                }
            }
            None => {
                if outcome.code != Code::Ok {
                    return Err(MatchError::new(format!(
                        "unexpected grpc error: {}: {}",
                        code_name(outcome.code),
                        outcome.message
                    ))
                    .into());
                }
            }
        }

        if let Some(bytes) = &outcome.body {
            if let Some(body) = &self.body {
                body.validate(bytes)?;
            }
            save_from_json(bytes, &self.save, vars);
        }

        Ok(())
    }
}

/// gRPC 状态码的规范名称
pub fn code_name(code: Code) -> &'static str {
    match code {
        Code::Ok => "OK",
        Code::Cancelled => "CANCELLED",
        Code::Unknown => "UNKNOWN",
        Code::InvalidArgument => "INVALID_ARGUMENT",
        Code::DeadlineExceeded => "DEADLINE_EXCEEDED",
        Code::NotFound => "NOT_FOUND",
        Code::AlreadyExists => "ALREADY_EXISTS",
        Code::PermissionDenied => "PERMISSION_DENIED",
        Code::ResourceExhausted => "RESOURCE_EXHAUSTED",
        Code::FailedPrecondition => "FAILED_PRECONDITION",
        Code::Aborted => "ABORTED",
        Code::OutOfRange => "OUT_OF_RANGE",
        Code::Unimplemented => "UNIMPLEMENTED",
        Code::Internal => "INTERNAL",
        Code::Unavailable => "UNAVAILABLE",
        Code::DataLoss => "DATA_LOSS",
        Code::Unauthenticated => "UNAUTHENTICATED",
    }
}
