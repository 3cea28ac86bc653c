use std::collections::HashMap;

use http::uri::PathAndQuery;
use prost_reflect::{DynamicMessage, SerializeOptions};
use tonic::Code;
use tonic::metadata::{AsciiMetadataKey, AsciiMetadataValue};

use crate::error::{Error, Result};
use crate::grpc::codec::DynamicCodec;
use crate::grpc::connection::GrpcConnection;
use crate::variable::VarStore;

/// gRPC 请求负载
///
/// `Json` 为原始 JSON 字节, 调用时按解析出的输入描述符反序列化,
/// 不需要任何编译期消息类型; `Encoded` 为编译期 prost 消息预先编码
/// 的线格式字节 (类型化调用), 调用时按同一描述符重新解码。
#[derive(Debug, Clone)]
pub enum GrpcBody {
    Json(Vec<u8>),
    Encoded(Vec<u8>),
}

/// 一次 unary gRPC 调用
///
/// 完整方法路径形如 `/package.Service/Method`, 路径与 metadata 值
/// 都支持 `{name}` 占位符插值。
#[derive(Debug, Clone)]
pub struct GrpcRequest {
    pub(crate) full_method: String,
    pub(crate) body: GrpcBody,
    pub(crate) metadata: HashMap<String, String>,
}

impl GrpcRequest {
    pub fn new(full_method: impl Into<String>) -> Self {
        Self {
            full_method: full_method.into(),
            body: GrpcBody::Json(Vec::new()),
            metadata: HashMap::new(),
        }
    }

    /// 类型化调用: 预编译消息在构建期编码为线格式
    pub fn from_message<M: prost::Message>(full_method: impl Into<String>, message: &M) -> Self {
        Self {
            full_method: full_method.into(),
            body: GrpcBody::Encoded(message.encode_to_vec()),
            metadata: HashMap::new(),
        }
    }

    pub fn full_method(&self) -> &str {
        &self.full_method
    }

    /// 调用方法并返回状态码与 JSON 编码的响应
    pub(crate) async fn run(&self, conn: &GrpcConnection, vars: &VarStore) -> Result<GrpcOutcome> {
        let full_method = vars.interpolate(&self.full_method);
        let descriptor = conn.resolve_method(&full_method).await?;
        let channel = conn.channel().await?;

        let message = match &self.body {
            GrpcBody::Json(raw) => {
                let raw = vars.interpolate_bytes(raw);
                // 空请求体默认为空 JSON 对象
                let raw = if raw.is_empty() { b"{}".to_vec() } else { raw };
                let mut de = serde_json::Deserializer::from_slice(&raw);
                let message = DynamicMessage::deserialize(descriptor.input(), &mut de)?;
                de.end()?;
                message
            }
            GrpcBody::Encoded(bytes) => DynamicMessage::decode(descriptor.input(), bytes.as_slice())
                .map_err(|e| Error::Resolve {
                    method: full_method.clone(),
                    reason: format!("decode typed request: {e}"),
                })?,
        };

        let mut request = tonic::Request::new(message);
        for (key, value) in &self.metadata {
            let name = AsciiMetadataKey::from_bytes(key.as_bytes())
                .map_err(|_| Error::Metadata(key.clone()))?;
            let value = AsciiMetadataValue::try_from(vars.interpolate(value).as_str())
                .map_err(|_| Error::Metadata(key.clone()))?;
            request.metadata_mut().insert(name, value);
        }

        let path: PathAndQuery = full_method.parse().map_err(|_| Error::Resolve {
            method: full_method.clone(),
            reason: "invalid method path".to_string(),
        })?;

        let mut grpc = tonic::client::Grpc::new(channel);
        grpc.ready().await.map_err(|e| Error::Dial {
            addr: conn.addr().to_string(),
            source: e,
        })?;

        match grpc.unary(request, path, DynamicCodec::new(descriptor)).await {
            Ok(response) => Ok(GrpcOutcome {
                code: Code::Ok,
                message: String::new(),
                body: Some(encode_response_json(response.get_ref())?),
            }),
            Err(status) => Ok(GrpcOutcome {
                code: status.code(),
                message: status.message().to_string(),
                body: None,
            }),
        }
    }
}

/// gRPC 调用结果: 状态码名 + 消息, 成功时附带 JSON 编码的响应体
#[derive(Debug, Clone)]
pub struct GrpcOutcome {
    pub code: Code,
    pub message: String,
    pub body: Option<Vec<u8>>,
}

/// 响应消息编码为规范 JSON, 默认值字段也输出, 保证 `{"count": 0}` 可断言
fn encode_response_json(message: &DynamicMessage) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let mut serializer = serde_json::Serializer::new(&mut buf);
    let options = SerializeOptions::new().skip_default_fields(false);
    message.serialize_with_options(&mut serializer, &options)?;
    Ok(buf)
}
