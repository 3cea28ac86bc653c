use std::collections::HashMap;

use crate::connection::Connection;
use crate::report::SuiteError;
use crate::scenario::Scenario;
use crate::variable::VarStore;

/// 顶层测试套件: 命名连接注册表 + 有序场景集合
///
/// 第一个注册的连接, 或任何名字为空的连接, 成为默认连接。场景顺序
/// 执行, 每个场景使用全新的变量存储, 场景之间不泄漏变量。
#[derive(Debug, Default)]
pub struct Suite {
    connections: HashMap<String, Connection>,
    default_conn: Option<String>,
    scenarios: Vec<Scenario>,
}

impl Suite {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册一个命名连接
    pub fn with_connection(mut self, conn: impl Into<Connection>) -> Self {
        let conn = conn.into();
        let name = conn.name().to_string();
        if self.default_conn.is_none() || name.is_empty() {
            self.default_conn = Some(name.clone());
        }
        self.connections.insert(name, conn);
        self
    }

    /// 注册多个连接
    pub fn with_connections(mut self, conns: impl IntoIterator<Item = Connection>) -> Self {
        for conn in conns {
            self = self.with_connection(conn);
        }
        self
    }

    /// 追加一个场景
    pub fn with_scenario(mut self, scenario: Scenario) -> Self {
        self.scenarios.push(scenario);
        self
    }

    /// 追加多个场景
    pub fn with_scenarios(mut self, scenarios: impl IntoIterator<Item = Scenario>) -> Self {
        self.scenarios.extend(scenarios);
        self
    }

    /// 按名字查找连接
    pub fn connection(&self, name: &str) -> Option<&Connection> {
        self.connections.get(name)
    }

    /// 已注册的场景
    pub fn scenarios(&self) -> &[Scenario] {
        &self.scenarios
    }

    /// 当前的默认连接
    pub fn default_connection(&self) -> Option<&Connection> {
        self.default_conn
            .as_deref()
            .and_then(|name| self.connections.get(name))
    }

    /// 顺序运行所有场景, 聚合全部失败
    ///
    /// 没有任何失败时返回 Ok(())。
    pub async fn run(&self) -> Result<(), SuiteError> {
        let mut failures = Vec::new();
        for scenario in &self.scenarios {
            let mut vars = VarStore::new();
            failures.extend(
                scenario
                    .run(self.default_connection(), &self.connections, &mut vars)
                    .await,
            );
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(SuiteError { failures })
        }
    }

    /// 释放所有连接持有的传输资源
    pub async fn close(&self) {
        for conn in self.connections.values() {
            conn.close().await;
        }
    }
}
