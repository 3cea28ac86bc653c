//! 场景定义加载器
//!
//! 把人写的 YAML/JSON 套件定义解析为内存中的 Suite, 使用与程序化
//! 构造相同的公开 API。连接采用两遍构建: 先收集所有文件的连接,
//! 再构建场景, 这样每个文件的场景都能引用其他文件的连接。

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use crate::builder::StepBuilder;
use crate::connection::{Connection, Protocol};
use crate::error::{Error, Result};
use crate::scenario::Scenario;
use crate::suite::Suite;

/// 单个套件定义文件
#[derive(Debug, Clone, Deserialize)]
pub struct SuiteFile {
    #[serde(default)]
    pub connections: Vec<ConnectionDef>,
    #[serde(default)]
    pub scenarios: Vec<ScenarioDef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionDef {
    #[serde(default)]
    pub name: String,
    /// http / https / 空 ⇒ HTTP, grpc ⇒ gRPC
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioDef {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub steps: Vec<StepDef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StepDef {
    pub request: Option<RequestDef>,
    pub expect: Option<ExpectDef>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequestDef {
    #[serde(default)]
    pub connection: String,
    #[serde(default)]
    pub method: String,
    /// HTTP 路径或 gRPC 完整方法路径
    #[serde(default)]
    pub endpoint: String,
    pub body: Option<Value>,
    #[serde(default)]
    pub header: HashMap<String, String>,
    #[serde(default)]
    pub query: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExpectDef {
    pub status: Option<u16>,
    #[serde(default)]
    pub status_any: Vec<u16>,
    /// gRPC 状态码名
    pub code: Option<String>,
    #[serde(default)]
    pub header: HashMap<String, String>,
    pub body: Option<Value>,
    #[serde(default)]
    pub save: Vec<SaveDef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SaveDef {
    pub field: String,
    #[serde(rename = "as")]
    pub var: String,
}

/// 解析 YAML 字节并构建 Suite
pub fn from_yaml(data: &[u8]) -> Result<Suite> {
    let file: SuiteFile = serde_yaml::from_slice(data)?;
    build_suite(vec![file])
}

/// 解析 JSON 字节并构建 Suite
pub fn from_json(data: &[u8]) -> Result<Suite> {
    let file: SuiteFile = serde_json::from_slice(data)?;
    build_suite(vec![file])
}

/// 按扩展名加载单个 YAML 或 JSON 文件
pub fn from_file(path: impl AsRef<Path>) -> Result<Suite> {
    build_suite(vec![read_file(path.as_ref())?])
}

/// 递归加载目录下所有 *.yaml / *.yml / *.json 文件
pub fn from_dir(path: impl AsRef<Path>) -> Result<Suite> {
    let mut files = Vec::new();
    collect_files(path.as_ref(), &mut files)?;
    build_suite(files)
}

fn read_file(path: &Path) -> Result<SuiteFile> {
    let data = std::fs::read(path)?;
    let file = if path.extension().and_then(|e| e.to_str()) == Some("json") {
        serde_json::from_slice(&data)?
    } else {
        serde_yaml::from_slice(&data)?
    };
    Ok(file)
}

fn collect_files(dir: &Path, files: &mut Vec<SuiteFile>) -> Result<()> {
    let mut entries: Vec<_> = std::fs::read_dir(dir)?.collect::<std::io::Result<_>>()?;
    entries.sort_by_key(|e| e.path());

    for entry in entries {
        let path = entry.path();
        if path.is_dir() {
            collect_files(&path, files)?;
            continue;
        }
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") | Some("json") => files.push(read_file(&path)?),
            _ => {}
        }
    }
    Ok(())
}

/// 两遍构建: 先全部连接, 后全部场景
fn build_suite(files: Vec<SuiteFile>) -> Result<Suite> {
    let mut suite = Suite::new();
    for file in &files {
        for def in &file.connections {
            suite = suite.with_connection(build_connection(def)?);
        }
    }
    for file in &files {
        for def in &file.scenarios {
            let scenario = build_scenario(def, &suite)?;
            suite = suite.with_scenario(scenario);
        }
    }
    Ok(suite)
}

fn build_connection(def: &ConnectionDef) -> Result<Connection> {
    match def.kind.as_str() {
        "http" | "https" | "" => {
            // 基础 URL 必须在加载期就是合法的
            url::Url::parse(&def.url)?;
            Ok(Connection::http(def.name.clone(), def.url.clone()))
        }
        "grpc" => Ok(Connection::grpc(def.name.clone(), def.url.clone())),
        other => Err(Error::UnknownConnectionType(other.to_string())),
    }
}

fn build_scenario(def: &ScenarioDef, suite: &Suite) -> Result<Scenario> {
    let mut scenario = Scenario::new(def.name.clone());
    for step in &def.steps {
        // 没有请求的步骤在加载期丢弃
        let Some(request) = &step.request else {
            continue;
        };

        // 步骤的协议由解析出的连接决定
        let conn = suite
            .connection(&request.connection)
            .or_else(|| suite.default_connection())
            .ok_or_else(|| Error::UnknownConnection(request.connection.clone()))?;

        let builder = match conn.protocol() {
            Protocol::Http => build_http_step(request, step.expect.as_ref())?,
            Protocol::Grpc => build_grpc_step(request, step.expect.as_ref()),
        };
        scenario = scenario.step(builder);
    }
    Ok(scenario)
}

fn build_http_step(request: &RequestDef, expect: Option<&ExpectDef>) -> Result<StepBuilder> {
    let method = if request.method.is_empty() {
        reqwest::Method::GET
    } else {
        request
            .method
            .parse()
            .map_err(|_| Error::InvalidMethod(request.method.clone()))?
    };

    let mut builder = StepBuilder::http_step(method, request.endpoint.clone())
        .with_connection(request.connection.clone());

    for (key, value) in &request.header {
        builder = builder.with_header(key.clone(), value.clone());
    }
    for (key, value) in &request.query {
        builder = builder.with_query(key.clone(), value.clone());
    }
    if let Some(body) = &request.body {
        builder = builder.with_json(body);
    }

    if let Some(expect) = expect {
        if let Some(status) = expect.status {
            builder = builder.expect_status(status);
        }
        if !expect.status_any.is_empty() {
            builder = builder.expect_status_any(expect.status_any.clone());
        }
        for (key, value) in &expect.header {
            builder = builder.expect_header(key.clone(), value.clone());
        }
        if let Some(body) = &expect.body {
            builder = builder.expect_json(body.clone());
        }
        for save in &expect.save {
            builder = builder.save(save.field.clone(), save.var.clone());
        }
    }

    Ok(builder)
}

fn build_grpc_step(request: &RequestDef, expect: Option<&ExpectDef>) -> StepBuilder {
    let mut builder =
        StepBuilder::grpc(request.endpoint.clone()).with_connection(request.connection.clone());

    for (key, value) in &request.header {
        builder = builder.with_header(key.clone(), value.clone());
    }
    if let Some(body) = &request.body {
        builder = builder.with_json(body);
    }

    if let Some(expect) = expect {
        if let Some(code) = &expect.code {
            builder = builder.expect_code(code.clone());
        }
        if let Some(body) = &expect.body {
            builder = builder.expect_json(body.clone());
        }
        for save in &expect.save {
            builder = builder.save(save.field.clone(), save.var.clone());
        }
    }

    builder
}
