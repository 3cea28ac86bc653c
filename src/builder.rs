use std::time::Duration;

use serde::Serialize;

use crate::assertion::{AnyOf, BodyExpect, Pattern, SaveEntry};
use crate::grpc::{GrpcBody, GrpcExpect, GrpcRequest};
use crate::http::{HttpExpect, HttpRequest};
use crate::step::{ExpectSpec, RequestSpec, Step};

/// Step 的流式构造器
///
/// 协议由构造函数决定: `get`/`post`/... 构造 HTTP 步骤, `grpc`/
/// `grpc_message` 构造 gRPC 步骤。协议不适用的组合子是空操作,
/// 例如对 gRPC 步骤调用 `with_query`。
#[derive(Debug)]
pub struct StepBuilder {
    step: Step,
}

impl StepBuilder {
    /// 任意方法的 HTTP 步骤
    pub fn http_step(method: reqwest::Method, path: impl Into<String>) -> Self {
        Self {
            step: Step {
                connection: None,
                request: Some(RequestSpec::Http(HttpRequest::new(method, path))),
                expect: Some(ExpectSpec::Http(HttpExpect::default())),
            },
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::http_step(reqwest::Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::http_step(reqwest::Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::http_step(reqwest::Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::http_step(reqwest::Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::http_step(reqwest::Method::DELETE, path)
    }

    /// 动态 gRPC 步骤: 只需要完整方法路径, 请求体用 `with_body` 或
    /// `with_json` 提供原始 JSON, 缺省为空对象
    pub fn grpc(full_method: impl Into<String>) -> Self {
        Self {
            step: Step {
                connection: None,
                request: Some(RequestSpec::Grpc(GrpcRequest::new(full_method))),
                expect: Some(ExpectSpec::Grpc(GrpcExpect::default())),
            },
        }
    }

    /// 类型化 gRPC 步骤: 请求来自编译期 prost 消息
    pub fn grpc_message<M: prost::Message>(full_method: impl Into<String>, message: &M) -> Self {
        Self {
            step: Step {
                connection: None,
                request: Some(RequestSpec::Grpc(GrpcRequest::from_message(
                    full_method,
                    message,
                ))),
                expect: Some(ExpectSpec::Grpc(GrpcExpect::default())),
            },
        }
    }

    /// 指定步骤使用的命名连接
    pub fn with_connection(mut self, name: impl Into<String>) -> Self {
        self.step.connection = Some(name.into());
        self
    }

    /// 添加请求头 (HTTP) 或出站 metadata (gRPC)
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        match &mut self.step.request {
            Some(RequestSpec::Http(request)) => {
                request.headers.insert(key.into(), value.into());
            }
            Some(RequestSpec::Grpc(request)) => {
                request.metadata.insert(key.into(), value.into());
            }
            None => {}
        }
        self
    }

    /// 添加查询参数
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        if let Some(RequestSpec::Http(request)) = &mut self.step.request {
            request.query.insert(key.into(), value.into());
        }
        self
    }

    /// 设置原始请求体
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        match &mut self.step.request {
            Some(RequestSpec::Http(request)) => request.body = body.into(),
            Some(RequestSpec::Grpc(request)) => request.body = GrpcBody::Json(body.into()),
            None => {}
        }
        self
    }

    /// 序列化 value 为 JSON 请求体; HTTP 步骤同时设置 Content-Type
    pub fn with_json<T: Serialize>(self, value: &T) -> Self {
        let body = serde_json::to_vec(value).expect("serialize JSON request body");
        let is_http = matches!(self.step.request, Some(RequestSpec::Http(_)));
        let builder = self.with_body(body);
        if is_http {
            builder.with_header("Content-Type", "application/json")
        } else {
            builder
        }
    }

    /// 覆盖该请求的超时
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        if let Some(RequestSpec::Http(request)) = &mut self.step.request {
            request.timeout = Some(timeout);
        }
        self
    }

    /// 期望的 HTTP 状态码
    pub fn expect_status(mut self, code: u16) -> Self {
        if let Some(ExpectSpec::Http(expect)) = &mut self.step.expect {
            expect.status = Some(code);
        }
        self
    }

    /// 期望状态码属于给定集合, 优先于精确状态码
    pub fn expect_status_any(mut self, codes: impl Into<AnyOf>) -> Self {
        if let Some(ExpectSpec::Http(expect)) = &mut self.step.expect {
            expect.status_any = codes.into();
        }
        self
    }

    /// 期望的响应头
    pub fn expect_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        if let Some(ExpectSpec::Http(expect)) = &mut self.step.expect {
            expect.headers.push((key.into(), value.into()));
        }
        self
    }

    /// 期望的 gRPC 状态码名, 如 "OK", "NOT_FOUND"
    pub fn expect_code(mut self, name: impl Into<String>) -> Self {
        if let Some(ExpectSpec::Grpc(expect)) = &mut self.step.expect {
            expect.code = Some(name.into());
        }
        self
    }

    /// 期望的原始响应体字节
    pub fn expect_body(self, body: impl Into<Vec<u8>>) -> Self {
        self.set_body_expect(BodyExpect::Bytes(body.into()))
    }

    /// 期望的结构化 JSON 响应体, 按部分匹配比较
    pub fn expect_json(self, value: serde_json::Value) -> Self {
        self.set_body_expect(BodyExpect::Pattern(value.into()))
    }

    /// 期望的响应体模式, 可嵌入自定义匹配器
    pub fn expect_pattern(self, pattern: Pattern) -> Self {
        self.set_body_expect(BodyExpect::Pattern(pattern))
    }

    /// 从响应 JSON 中提取字段存入变量, 供后续步骤插值
    pub fn save(mut self, field: impl Into<String>, var: impl Into<String>) -> Self {
        let entry = SaveEntry::new(field, var);
        match &mut self.step.expect {
            Some(ExpectSpec::Http(expect)) => expect.save.push(entry),
            Some(ExpectSpec::Grpc(expect)) => expect.save.push(entry),
            None => {}
        }
        self
    }

    pub fn build(self) -> Step {
        self.step
    }

    fn set_body_expect(mut self, body: BodyExpect) -> Self {
        match &mut self.step.expect {
            Some(ExpectSpec::Http(expect)) => expect.body = Some(body),
            Some(ExpectSpec::Grpc(expect)) => expect.body = Some(body),
            None => {}
        }
        self
    }
}

impl From<StepBuilder> for Step {
    fn from(builder: StepBuilder) -> Self {
        builder.build()
    }
}
