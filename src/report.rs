use std::fmt;

use crate::error::Error;

/// 失败发生的位置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureScope {
    Before,
    Step,
    After,
}

/// 单条结构化失败记录
///
/// Suite 的最终结果是有序失败记录的集合而非拼接文本, 测试可以对
/// 单条记录断言。
#[derive(Debug)]
pub struct Failure {
    pub scenario: String,
    pub scope: FailureScope,
    pub label: String,
    pub cause: Error,
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.scope {
            FailureScope::Step => write!(
                f,
                "scenario {:?}: step {}: {}",
                self.scenario, self.label, self.cause
            ),
            _ => write!(f, "scenario {:?}: {}: {}", self.scenario, self.label, self.cause),
        }
    }
}

/// Suite 运行的聚合错误, 枚举每一条失败
#[derive(Debug)]
pub struct SuiteError {
    pub failures: Vec<Failure>,
}

impl SuiteError {
    pub fn len(&self) -> usize {
        self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }
}

impl fmt::Display for SuiteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failure(s)", self.failures.len())?;
        for failure in &self.failures {
            write!(f, "\n  {failure}")?;
        }
        Ok(())
    }
}

impl std::error::Error for SuiteError {}
