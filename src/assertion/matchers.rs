use regex::Regex;
use serde_json::Value;
use std::fmt;

/// 匹配失败描述, 外层逐级追加字段路径
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct MatchError(pub String);

impl MatchError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    /// 包装为带字段名的错误
    pub(crate) fn in_field(self, key: &str) -> Self {
        Self(format!("field {key:?}: {}", self.0))
    }
}

/// 自定义断言能力
///
/// 实现该 trait 的值可以嵌入期望 Pattern 中, 部分匹配引擎遇到
/// Matcher 节点时完全委托给它, 优先于结构比较。这是引擎唯一的
/// 开放扩展点。
pub trait Matcher: fmt::Debug + Send + Sync {
    /// 校验实际值, 返回违规描述或通过
    fn matches(&self, actual: &Value) -> Result<(), MatchError>;
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn as_str<'a>(actual: &'a Value) -> Result<&'a str, MatchError> {
    actual
        .as_str()
        .ok_or_else(|| MatchError::new(format!("expected string, got {}", type_name(actual))))
}

fn as_number(actual: &Value) -> Result<f64, MatchError> {
    actual
        .as_f64()
        .ok_or_else(|| MatchError::new(format!("expected number, got {}", type_name(actual))))
}

// ---- 字符串匹配器 ----

/// 断言实际字符串包含给定子串
#[derive(Debug, Clone)]
pub struct Contains(pub String);

impl Matcher for Contains {
    fn matches(&self, actual: &Value) -> Result<(), MatchError> {
        let s = as_str(actual)?;
        if !s.contains(&self.0) {
            return Err(MatchError::new(format!(
                "{s:?} does not contain {:?}",
                self.0
            )));
        }
        Ok(())
    }
}

/// 断言实际字符串匹配给定正则表达式
#[derive(Debug, Clone)]
pub struct Matches(pub String);

impl Matcher for Matches {
    fn matches(&self, actual: &Value) -> Result<(), MatchError> {
        let s = as_str(actual)?;
        let re = Regex::new(&self.0)
            .map_err(|e| MatchError::new(format!("invalid regex {:?}: {e}", self.0)))?;
        if !re.is_match(s) {
            return Err(MatchError::new(format!(
                "{s:?} does not match regex {:?}",
                self.0
            )));
        }
        Ok(())
    }
}

/// 断言实际值非空且非零值
#[derive(Debug, Clone, Copy)]
pub struct NotEmpty;

impl Matcher for NotEmpty {
    fn matches(&self, actual: &Value) -> Result<(), MatchError> {
        let empty = match actual {
            Value::Null => true,
            Value::Bool(b) => !b,
            Value::Number(n) => n.as_f64() == Some(0.0),
            Value::String(s) => s.is_empty(),
            Value::Array(items) => items.is_empty(),
            Value::Object(map) => map.is_empty(),
        };
        if empty {
            return Err(MatchError::new(format!(
                "expected non-empty value, got {actual}"
            )));
        }
        Ok(())
    }
}

// ---- 数值匹配器 ----

/// 断言 actual > n
#[derive(Debug, Clone, Copy)]
pub struct Gt(pub f64);

impl Matcher for Gt {
    fn matches(&self, actual: &Value) -> Result<(), MatchError> {
        let f = as_number(actual)?;
        if !(f > self.0) {
            return Err(MatchError::new(format!("expected > {}, got {f}", self.0)));
        }
        Ok(())
    }
}

/// 断言 actual >= n
#[derive(Debug, Clone, Copy)]
pub struct Gte(pub f64);

impl Matcher for Gte {
    fn matches(&self, actual: &Value) -> Result<(), MatchError> {
        let f = as_number(actual)?;
        if !(f >= self.0) {
            return Err(MatchError::new(format!("expected >= {}, got {f}", self.0)));
        }
        Ok(())
    }
}

/// 断言 actual < n
#[derive(Debug, Clone, Copy)]
pub struct Lt(pub f64);

impl Matcher for Lt {
    fn matches(&self, actual: &Value) -> Result<(), MatchError> {
        let f = as_number(actual)?;
        if !(f < self.0) {
            return Err(MatchError::new(format!("expected < {}, got {f}", self.0)));
        }
        Ok(())
    }
}

/// 断言 actual <= n
#[derive(Debug, Clone, Copy)]
pub struct Lte(pub f64);

impl Matcher for Lte {
    fn matches(&self, actual: &Value) -> Result<(), MatchError> {
        let f = as_number(actual)?;
        if !(f <= self.0) {
            return Err(MatchError::new(format!("expected <= {}, got {f}", self.0)));
        }
        Ok(())
    }
}

// ---- 长度匹配器 ----

/// 断言数组 / 字符串 / 对象的长度恰好为 n
#[derive(Debug, Clone, Copy)]
pub struct Length(pub usize);

impl Matcher for Length {
    fn matches(&self, actual: &Value) -> Result<(), MatchError> {
        let len = match actual {
            Value::Array(items) => items.len(),
            Value::String(s) => s.len(),
            Value::Object(map) => map.len(),
            other => {
                return Err(MatchError::new(format!(
                    "expected array/string/object, got {}",
                    type_name(other)
                )));
            }
        };
        if len != self.0 {
            return Err(MatchError::new(format!(
                "expected length {}, got {len}",
                self.0
            )));
        }
        Ok(())
    }
}

// ---- 状态码集合 ----

/// 断言 HTTP 状态码属于给定集合
#[derive(Debug, Clone, Default)]
pub struct AnyOf(pub Vec<u16>);

impl AnyOf {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn match_status(&self, actual: u16) -> Result<(), MatchError> {
        if self.0.contains(&actual) {
            return Ok(());
        }
        Err(MatchError::new(format!(
            "expected status one of {:?}, got {actual}",
            self.0
        )))
    }
}

impl From<Vec<u16>> for AnyOf {
    fn from(codes: Vec<u16>) -> Self {
        Self(codes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_contains() {
        assert!(Contains("ello".into()).matches(&json!("hello world")).is_ok());
        assert!(Contains("xyz".into()).matches(&json!("hello world")).is_err());
        // 非字符串类型直接失败
        assert!(Contains("x".into()).matches(&json!(42)).is_err());
    }

    #[test]
    fn test_matches_regex() {
        assert!(Matches(r"^\d+$".into()).matches(&json!("12345")).is_ok());
        assert!(Matches(r"^\d+$".into()).matches(&json!("abc")).is_err());
        assert!(Matches(r"[".into()).matches(&json!("abc")).is_err());
    }

    #[test]
    fn test_not_empty() {
        assert!(NotEmpty.matches(&json!("hello")).is_ok());
        assert!(NotEmpty.matches(&json!(3)).is_ok());
        assert!(NotEmpty.matches(&json!([1])).is_ok());

        assert!(NotEmpty.matches(&json!("")).is_err());
        assert!(NotEmpty.matches(&json!(0)).is_err());
        assert!(NotEmpty.matches(&json!(null)).is_err());
        assert!(NotEmpty.matches(&json!([])).is_err());
        assert!(NotEmpty.matches(&json!({})).is_err());
    }

    #[test]
    fn test_numeric_matchers() {
        assert!(Gt(1.0).matches(&json!(2)).is_ok());
        assert!(Gt(5.0).matches(&json!(2)).is_err());
        assert!(Gte(2.0).matches(&json!(2)).is_ok());
        assert!(Lt(5.0).matches(&json!(2)).is_ok());
        assert!(Lte(2.0).matches(&json!(2)).is_ok());
        assert!(Lte(1.0).matches(&json!(2)).is_err());
        assert!(Gt(1.0).matches(&json!("2")).is_err());
    }

    #[test]
    fn test_length() {
        assert!(Length(3).matches(&json!([1, 2, 3])).is_ok());
        assert!(Length(2).matches(&json!([1, 2, 3])).is_err());
        assert!(Length(5).matches(&json!("hello")).is_ok());
        assert!(Length(1).matches(&json!({"a": 1})).is_ok());
        assert!(Length(1).matches(&json!(7)).is_err());
    }

    #[test]
    fn test_any_of() {
        assert!(AnyOf(vec![200, 201]).match_status(201).is_ok());
        assert!(AnyOf(vec![200, 201]).match_status(404).is_err());
    }
}
