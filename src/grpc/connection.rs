use std::collections::{HashMap, HashSet};

use prost::Message;
use prost_reflect::{DescriptorPool, MethodDescriptor};
use prost_types::{FileDescriptorProto, FileDescriptorSet};
use tokio::sync::Mutex;
use tonic::transport::{Channel, Endpoint};
use tonic_reflection::pb::v1::{
    ServerReflectionRequest, server_reflection_client::ServerReflectionClient,
    server_reflection_request::MessageRequest, server_reflection_response::MessageResponse,
};

use crate::error::{Error, Result};

/// gRPC 服务连接
///
/// 通道在首次使用时建立, 幂等且可安全并发竞争 (先到者建立, 后续
/// 调用复用)。方法描述符通过服务端反射协议解析, 每个方法每个连接
/// 只解析一次, 结果缓存在锁保护的映射中。
#[derive(Debug)]
pub struct GrpcConnection {
    name: String,
    addr: String,
    channel: Mutex<Option<Channel>>,
    methods: Mutex<HashMap<String, MethodDescriptor>>,
}

impl GrpcConnection {
    pub fn new(name: impl Into<String>, addr: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            addr: addr.into(),
            channel: Mutex::new(None),
            methods: Mutex::new(HashMap::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// 返回底层通道, 必要时先建立连接
    pub async fn channel(&self) -> Result<Channel> {
        let mut guard = self.channel.lock().await;
        if let Some(channel) = guard.as_ref() {
            return Ok(channel.clone());
        }

        // 无 scheme 的目标地址补全为 http://
        let target = if self.addr.contains("://") {
            self.addr.clone()
        } else {
            format!("http://{}", self.addr)
        };
        let endpoint = Endpoint::from_shared(target).map_err(|e| Error::Dial {
            addr: self.addr.clone(),
            source: e,
        })?;
        let channel = endpoint.connect().await.map_err(|e| Error::Dial {
            addr: self.addr.clone(),
            source: e,
        })?;

        *guard = Some(channel.clone());
        Ok(channel)
    }

    /// 断开连接, 下次使用时重新拨号
    pub async fn close(&self) {
        self.channel.lock().await.take();
    }

    /// 通过服务端反射协议解析方法描述符, 结果按连接缓存
    pub(crate) async fn resolve_method(&self, full_method: &str) -> Result<MethodDescriptor> {
        let mut methods = self.methods.lock().await;
        if let Some(descriptor) = methods.get(full_method) {
            return Ok(descriptor.clone());
        }

        let (service, method) = split_full_method(full_method)?;
        let channel = self.channel().await?;

        let request = ServerReflectionRequest {
            host: String::new(),
            message_request: Some(MessageRequest::FileContainingSymbol(service.to_string())),
        };
        let mut client = ServerReflectionClient::new(channel);
        let mut stream = client
            .server_reflection_info(tokio_stream::iter(vec![request]))
            .await
            .map_err(|status| {
                resolve_error(full_method, format!("reflection stream: {}", status.message()))
            })?
            .into_inner();

        let response = stream
            .message()
            .await
            .map_err(|status| {
                resolve_error(full_method, format!("reflection recv: {}", status.message()))
            })?
            .ok_or_else(|| resolve_error(full_method, "reflection stream closed".to_string()))?;

        let files = match response.message_response {
            Some(MessageResponse::FileDescriptorResponse(resp)) => resp.file_descriptor_proto,
            Some(MessageResponse::ErrorResponse(err)) => {
                return Err(resolve_error(
                    full_method,
                    format!("reflection error: {}", err.error_message),
                ));
            }
            _ => {
                return Err(resolve_error(
                    full_method,
                    "unexpected reflection response".to_string(),
                ));
            }
        };

        // 返回的文件包含传递依赖, 可能重复, 按文件名去重
        let mut seen = HashSet::new();
        let mut set = FileDescriptorSet::default();
        for encoded in &files {
            let file = FileDescriptorProto::decode(&encoded[..]).map_err(|e| {
                resolve_error(full_method, format!("decode file descriptor: {e}"))
            })?;
            if seen.insert(file.name().to_string()) {
                set.file.push(file);
            }
        }

        let pool = DescriptorPool::from_file_descriptor_set(set)
            .map_err(|e| resolve_error(full_method, format!("build descriptor pool: {e}")))?;
        let service_desc = pool
            .get_service_by_name(service)
            .ok_or_else(|| resolve_error(full_method, format!("service {service:?} not found")))?;
        let descriptor = service_desc
            .methods()
            .find(|m| m.name() == method)
            .ok_or_else(|| {
                resolve_error(
                    full_method,
                    format!("method {method:?} not found in service {service:?}"),
                )
            })?;

        tracing::debug!(method = full_method, "resolved method descriptor");
        methods.insert(full_method.to_string(), descriptor.clone());
        Ok(descriptor)
    }
}

fn resolve_error(method: &str, reason: String) -> Error {
    Error::Resolve {
        method: method.to_string(),
        reason,
    }
}

/// 拆分 "/package.Service/Method" 形式的完整方法路径
fn split_full_method(full_method: &str) -> Result<(&str, &str)> {
    let trimmed = full_method.strip_prefix('/').unwrap_or(full_method);
    trimmed
        .split_once('/')
        .filter(|(service, method)| !service.is_empty() && !method.is_empty())
        .ok_or_else(|| {
            resolve_error(full_method, "expected /package.Service/Method".to_string())
        })
}
