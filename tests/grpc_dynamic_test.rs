use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicI32, Ordering};

use serde_json::json;
use tokio_stream::wrappers::TcpListenerStream;

use ruxpect::{Connection, Error, Gt, Pattern, Scenario, StepBuilder, Suite, loader};

/// 计数器服务的消息类型
mod pb {
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct AddRequest {
        #[prost(int32, tag = "1")]
        pub n: i32,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct ZeroRequest {}

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct CounterReply {
        #[prost(int32, tag = "1")]
        pub count: i32,
    }
}

/// 被测计数器服务
#[derive(Clone)]
struct CounterService {
    count: Arc<AtomicI32>,
}

impl CounterService {
    async fn add(
        &self,
        request: tonic::Request<pb::AddRequest>,
    ) -> Result<tonic::Response<pb::CounterReply>, tonic::Status> {
        let n = request.get_ref().n;
        if n < 0 {
            return Err(tonic::Status::invalid_argument("n must be non-negative"));
        }
        let count = self.count.fetch_add(n, Ordering::SeqCst) + n;
        Ok(tonic::Response::new(pb::CounterReply { count }))
    }

    async fn zero(
        &self,
        _request: tonic::Request<pb::ZeroRequest>,
    ) -> Result<tonic::Response<pb::CounterReply>, tonic::Status> {
        self.count.store(0, Ordering::SeqCst);
        Ok(tonic::Response::new(pb::CounterReply { count: 0 }))
    }
}

/// 按 tonic 生成代码的形状手写的 gRPC 服务, 不依赖 protoc
#[derive(Clone)]
struct CounterServer {
    inner: CounterService,
}

impl tonic::codegen::Service<tonic::codegen::http::Request<tonic::body::BoxBody>>
    for CounterServer
{
    type Response = tonic::codegen::http::Response<tonic::body::BoxBody>;
    type Error = std::convert::Infallible;
    type Future = tonic::codegen::BoxFuture<Self::Response, Self::Error>;

    fn poll_ready(
        &mut self,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        std::task::Poll::Ready(Ok(()))
    }

    fn call(
        &mut self,
        req: tonic::codegen::http::Request<tonic::body::BoxBody>,
    ) -> Self::Future {
        let inner = self.inner.clone();
        match req.uri().path() {
            "/counter.v1.CounterService/Add" => Box::pin(async move {
                struct AddSvc(CounterService);
                impl tonic::server::UnaryService<pb::AddRequest> for AddSvc {
                    type Response = pb::CounterReply;
                    type Future =
                        tonic::codegen::BoxFuture<tonic::Response<Self::Response>, tonic::Status>;
                    fn call(&mut self, request: tonic::Request<pb::AddRequest>) -> Self::Future {
                        let inner = self.0.clone();
                        Box::pin(async move { inner.add(request).await })
                    }
                }
                let codec = tonic::codec::ProstCodec::default();
                let mut grpc = tonic::server::Grpc::new(codec);
                Ok(grpc.unary(AddSvc(inner), req).await)
            }),
            "/counter.v1.CounterService/Zero" => Box::pin(async move {
                struct ZeroSvc(CounterService);
                impl tonic::server::UnaryService<pb::ZeroRequest> for ZeroSvc {
                    type Response = pb::CounterReply;
                    type Future =
                        tonic::codegen::BoxFuture<tonic::Response<Self::Response>, tonic::Status>;
                    fn call(&mut self, request: tonic::Request<pb::ZeroRequest>) -> Self::Future {
                        let inner = self.0.clone();
                        Box::pin(async move { inner.zero(request).await })
                    }
                }
                let codec = tonic::codec::ProstCodec::default();
                let mut grpc = tonic::server::Grpc::new(codec);
                Ok(grpc.unary(ZeroSvc(inner), req).await)
            }),
            _ => Box::pin(async move {
                Ok(tonic::codegen::http::Response::builder()
                    .status(200)
                    .header("grpc-status", (tonic::Code::Unimplemented as i32).to_string())
                    .header("content-type", "application/grpc")
                    .body(tonic::codegen::empty_body())
                    .unwrap())
            }),
        }
    }
}

impl tonic::server::NamedService for CounterServer {
    const NAME: &'static str = "counter.v1.CounterService";
}

/// 手工组装的文件描述符, 提供给反射服务
fn counter_file_descriptor_set() -> prost_types::FileDescriptorSet {
    use prost_types::field_descriptor_proto::{Label, Type};
    use prost_types::{
        DescriptorProto, FieldDescriptorProto, FileDescriptorProto, FileDescriptorSet,
        MethodDescriptorProto, ServiceDescriptorProto,
    };

    fn int32_field(name: &str, number: i32) -> FieldDescriptorProto {
        FieldDescriptorProto {
            name: Some(name.to_string()),
            number: Some(number),
            label: Some(Label::Optional as i32),
            r#type: Some(Type::Int32 as i32),
            json_name: Some(name.to_string()),
            ..Default::default()
        }
    }

    fn message(name: &str, fields: Vec<FieldDescriptorProto>) -> DescriptorProto {
        DescriptorProto {
            name: Some(name.to_string()),
            field: fields,
            ..Default::default()
        }
    }

    fn unary(name: &str, input: &str, output: &str) -> MethodDescriptorProto {
        MethodDescriptorProto {
            name: Some(name.to_string()),
            input_type: Some(input.to_string()),
            output_type: Some(output.to_string()),
            ..Default::default()
        }
    }

    let file = FileDescriptorProto {
        name: Some("counter.proto".to_string()),
        package: Some("counter.v1".to_string()),
        syntax: Some("proto3".to_string()),
        message_type: vec![
            message("AddRequest", vec![int32_field("n", 1)]),
            message("ZeroRequest", vec![]),
            message("CounterReply", vec![int32_field("count", 1)]),
        ],
        service: vec![ServiceDescriptorProto {
            name: Some("CounterService".to_string()),
            method: vec![
                unary("Add", ".counter.v1.AddRequest", ".counter.v1.CounterReply"),
                unary("Zero", ".counter.v1.ZeroRequest", ".counter.v1.CounterReply"),
            ],
            ..Default::default()
        }],
        ..Default::default()
    };

    FileDescriptorSet { file: vec![file] }
}

/// 启动带反射服务的计数器服务端, 返回监听地址和计数器
async fn spawn_counter_server() -> (SocketAddr, Arc<AtomicI32>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let count = Arc::new(AtomicI32::new(0));

    let reflection = tonic_reflection::server::Builder::configure()
        .register_file_descriptor_set(counter_file_descriptor_set())
        .build_v1()
        .unwrap();

    let service = CounterServer {
        inner: CounterService {
            count: Arc::clone(&count),
        },
    };

    tokio::spawn(async move {
        let _ = tonic::transport::Server::builder()
            .add_service(reflection)
            .add_service(service)
            .serve_with_incoming(TcpListenerStream::new(listener))
            .await;
    });

    (addr, count)
}

/// 只凭方法路径和 JSON 负载完成动态调用, 响应满足 Gt(0) 匹配器
#[tokio::test]
async fn test_dynamic_call_without_compiled_types() {
    let (addr, _) = spawn_counter_server().await;

    let suite = Suite::new()
        .with_connection(Connection::grpc("grpc", addr.to_string()))
        .with_scenario(
            Scenario::new("dynamic counter")
                .step(
                    StepBuilder::grpc("/counter.v1.CounterService/Add")
                        .with_json(&json!({"n": 5}))
                        .expect_pattern(Pattern::object([("count", Pattern::matcher(Gt(0.0)))])),
                )
                .step(
                    StepBuilder::grpc("/counter.v1.CounterService/Add")
                        .with_json(&json!({"n": 3}))
                        .expect_json(json!({"count": 8})),
                )
                // 空请求体默认为 {}
                .step(
                    StepBuilder::grpc("/counter.v1.CounterService/Zero")
                        .expect_json(json!({"count": 0})),
                ),
        );

    suite.run().await.unwrap();
}

/// 期望状态码名匹配; 无期望码时非 OK 结果本身就是失败
#[tokio::test]
async fn test_expected_status_code_name() {
    let (addr, _) = spawn_counter_server().await;

    let suite = Suite::new()
        .with_connection(Connection::grpc("grpc", addr.to_string()))
        .with_scenario(
            Scenario::new("expected failure").step(
                StepBuilder::grpc("/counter.v1.CounterService/Add")
                    .with_json(&json!({"n": -1}))
                    .expect_code("INVALID_ARGUMENT"),
            ),
        )
        .with_scenario(
            Scenario::new("unexpected failure").step(
                StepBuilder::grpc("/counter.v1.CounterService/Add").with_json(&json!({"n": -1})),
            ),
        );

    let err = suite.run().await.unwrap_err();
    assert_eq!(err.len(), 1);
    assert_eq!(err.failures[0].scenario, "unexpected failure");
    assert!(
        err.failures[0].cause.to_string().contains("INVALID_ARGUMENT"),
        "got: {}",
        err.failures[0].cause
    );
}

/// 类型化调用: 编译期 prost 消息经同一动态描述符路径往返
#[tokio::test]
async fn test_typed_message_invocation() {
    let (addr, _) = spawn_counter_server().await;

    let suite = Suite::new()
        .with_connection(Connection::grpc("grpc", addr.to_string()))
        .with_scenario(
            Scenario::new("typed call").step(
                StepBuilder::grpc_message(
                    "/counter.v1.CounterService/Add",
                    &pb::AddRequest { n: 2 },
                )
                .expect_code("OK")
                .expect_json(json!({"count": 2})),
            ),
        );

    suite.run().await.unwrap();
}

/// gRPC 响应字段保存后可插值进后续请求体
#[tokio::test]
async fn test_save_across_grpc_steps() {
    let (addr, count) = spawn_counter_server().await;

    let suite = Suite::new()
        .with_connection(Connection::grpc("grpc", addr.to_string()))
        .with_scenario(
            Scenario::new("accumulate")
                .step(
                    StepBuilder::grpc("/counter.v1.CounterService/Add")
                        .with_json(&json!({"n": 4}))
                        .save("count", "total"),
                )
                // 规范 JSON 映射允许字符串形式的整数
                .step(
                    StepBuilder::grpc("/counter.v1.CounterService/Add")
                        .with_body(br#"{"n": "{total}"}"#.to_vec())
                        .expect_json(json!({"count": 8})),
                ),
        );

    suite.run().await.unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 8);
}

/// 未知方法与畸形路径都是该步骤的解析错误
#[tokio::test]
async fn test_resolution_failures() {
    let (addr, _) = spawn_counter_server().await;

    let suite = Suite::new()
        .with_connection(Connection::grpc("grpc", addr.to_string()))
        .with_scenario(
            Scenario::new("bad targets")
                .step(StepBuilder::grpc("/counter.v1.CounterService/Nope"))
                .step(StepBuilder::grpc("no-slash"))
                .step(StepBuilder::grpc("/unknown.Service/Method")),
        );

    let err = suite.run().await.unwrap_err();
    assert_eq!(err.len(), 3);
    for failure in &err.failures {
        assert!(
            matches!(failure.cause, Error::Resolve { .. }),
            "got: {}",
            failure.cause
        );
    }
}

/// 出站 metadata 插值并随调用发送
#[tokio::test]
async fn test_metadata_attached() {
    let (addr, _) = spawn_counter_server().await;

    let suite = Suite::new()
        .with_connection(Connection::grpc("grpc", addr.to_string()))
        .with_scenario(
            Scenario::new("with metadata").step(
                StepBuilder::grpc("/counter.v1.CounterService/Add")
                    .with_header("x-request-id", "req-1")
                    .with_json(&json!({"n": 1}))
                    .expect_json(json!({"count": 1})),
            ),
        );

    suite.run().await.unwrap();
}

/// close 丢弃通道后再次运行会重新拨号
#[tokio::test]
async fn test_close_then_redial() {
    let (addr, _) = spawn_counter_server().await;

    let suite = Suite::new()
        .with_connection(Connection::grpc("grpc", addr.to_string()))
        .with_scenario(
            Scenario::new("first run").step(
                StepBuilder::grpc("/counter.v1.CounterService/Add")
                    .with_json(&json!({"n": 1}))
                    .expect_code("OK"),
            ),
        );

    suite.run().await.unwrap();
    suite.close().await;
    suite.run().await.unwrap();
}

/// YAML 定义的 gRPC 套件走同一条动态调用路径
#[tokio::test]
async fn test_yaml_grpc_suite() {
    let (addr, _) = spawn_counter_server().await;

    let yaml = format!(
        r#"
connections:
  - name: grpc
    type: grpc
    url: {addr}

scenarios:
  - name: yaml counter
    steps:
      - request:
          endpoint: /counter.v1.CounterService/Add
          body:
            n: 7
        expect:
          code: OK
          body:
            count: 7
          save:
            - field: count
              as: total
      - request:
          endpoint: /counter.v1.CounterService/Zero
        expect:
          body:
            count: 0
"#
    );

    let suite = loader::from_yaml(yaml.as_bytes()).unwrap();
    suite.run().await.unwrap();
}
