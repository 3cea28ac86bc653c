use std::collections::HashMap;
use std::fmt;

use crate::connection::Connection;
use crate::error::Error;
use crate::report::{Failure, FailureScope};
use crate::step::Step;
use crate::variable::VarStore;

type Hook = Box<dyn Fn() -> anyhow::Result<()> + Send + Sync>;

/// 命名的有序步骤序列, 共享一个变量作用域
///
/// 状态机: before 钩子 → 顺序执行步骤 → after 钩子。before 失败
/// 跳过所有步骤; 步骤失败被记录但不中断后续步骤; after 钩子无论
/// 哪里失败都会执行。
pub struct Scenario {
    name: String,
    steps: Vec<Step>,
    before: Vec<Hook>,
    after: Vec<Hook>,
}

impl Scenario {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
            before: Vec::new(),
            after: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// 追加一个步骤
    pub fn step(mut self, step: impl Into<Step>) -> Self {
        self.steps.push(step.into());
        self
    }

    /// 注册在步骤之前运行的准备钩子
    pub fn before(mut self, hook: impl Fn() -> anyhow::Result<()> + Send + Sync + 'static) -> Self {
        self.before.push(Box::new(hook));
        self
    }

    /// 注册总是在场景结束时运行的清理钩子
    pub fn after(mut self, hook: impl Fn() -> anyhow::Result<()> + Send + Sync + 'static) -> Self {
        self.after.push(Box::new(hook));
        self
    }

    /// 顺序执行所有步骤, 收集每一条失败
    pub(crate) async fn run(
        &self,
        default_conn: Option<&Connection>,
        connections: &HashMap<String, Connection>,
        vars: &mut VarStore,
    ) -> Vec<Failure> {
        tracing::info!(scenario = %self.name, "starting scenario");
        let mut failures = Vec::new();

        for (i, hook) in self.before.iter().enumerate() {
            if let Err(cause) = hook() {
                failures.push(self.failure(
                    FailureScope::Before,
                    format!("before[{}]", i + 1),
                    Error::Hook(cause),
                ));
            }
        }

        // before 失败时直接进入 after 钩子
        if failures.is_empty() {
            for (i, step) in self.steps.iter().enumerate() {
                let label = step.label(i);
                let conn = step
                    .connection_name()
                    .and_then(|name| connections.get(name))
                    .or(default_conn);

                let result = match conn {
                    Some(conn) => step.run(conn, vars).await,
                    None => Err(Error::UnknownConnection(
                        step.connection_name().unwrap_or_default().to_string(),
                    )),
                };

                match result {
                    Ok(()) => {
                        tracing::info!(scenario = %self.name, step = %label, "step passed");
                    }
                    Err(cause) => {
                        tracing::error!(scenario = %self.name, step = %label, error = %cause, "step failed");
                        failures.push(self.failure(FailureScope::Step, label, cause));
                    }
                }
            }
        }

        for (i, hook) in self.after.iter().enumerate() {
            if let Err(cause) = hook() {
                failures.push(self.failure(
                    FailureScope::After,
                    format!("after[{}]", i + 1),
                    Error::Hook(cause),
                ));
            }
        }

        if failures.is_empty() {
            tracing::info!(scenario = %self.name, "scenario passed");
        } else {
            tracing::error!(scenario = %self.name, failures = failures.len(), "scenario failed");
        }
        failures
    }

    fn failure(&self, scope: FailureScope, label: String, cause: Error) -> Failure {
        Failure {
            scenario: self.name.clone(),
            scope,
            label,
            cause,
        }
    }
}

impl fmt::Debug for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scenario")
            .field("name", &self.name)
            .field("steps", &self.steps.len())
            .field("before", &self.before.len())
            .field("after", &self.after.len())
            .finish()
    }
}
