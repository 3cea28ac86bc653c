use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::matchers::{MatchError, Matcher};

/// 期望值树
///
/// 结构节点描述 *部分* 期望: 对象只要求列出的键存在且匹配, 数组只
/// 要求每个期望元素能在实际数组中找到匹配项。`Check` 节点嵌入自定
/// 义匹配器, 匹配时完全委托。
#[derive(Debug, Clone)]
pub enum Pattern {
    /// 普通 JSON 值, 按部分匹配语义比较
    Exact(Value),
    /// 对象: 子集匹配, 实际对象中多余的键被忽略
    Object(BTreeMap<String, Pattern>),
    /// 数组: 存在性匹配, 与顺序无关
    Array(Vec<Pattern>),
    /// 自定义匹配器节点
    Check(Arc<dyn Matcher>),
}

impl Pattern {
    /// 嵌入一个自定义匹配器
    pub fn matcher(m: impl Matcher + 'static) -> Self {
        Pattern::Check(Arc::new(m))
    }

    /// 构造对象模式
    pub fn object<K, I>(fields: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Pattern)>,
    {
        Pattern::Object(
            fields
                .into_iter()
                .map(|(k, v)| (k.into(), v))
                .collect(),
        )
    }

    /// 构造数组模式
    pub fn array<I: IntoIterator<Item = Pattern>>(items: I) -> Self {
        Pattern::Array(items.into_iter().collect())
    }
}

impl From<Value> for Pattern {
    fn from(value: Value) -> Self {
        Pattern::Exact(value)
    }
}

impl From<&Value> for Pattern {
    fn from(value: &Value) -> Self {
        Pattern::Exact(value.clone())
    }
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

/// 递归校验 actual 是否满足 expected
///
/// 遇到第一个违规即终止, 错误信息带字段 / 下标路径。
pub fn partial_match(expected: &Pattern, actual: &Value) -> Result<(), MatchError> {
    match expected {
        Pattern::Check(m) => m.matches(actual),

        Pattern::Object(fields) => {
            let map = actual
                .as_object()
                .ok_or_else(|| MatchError::new(format!("expected object, got {}", type_name(actual))))?;
            for (key, sub) in fields {
                let value = map
                    .get(key)
                    .ok_or_else(|| MatchError::new(format!("missing field {key:?}")))?;
                partial_match(sub, value).map_err(|e| e.in_field(key))?;
            }
            Ok(())
        }

        Pattern::Array(items) => {
            let actual_items = actual
                .as_array()
                .ok_or_else(|| MatchError::new(format!("expected array, got {}", type_name(actual))))?;
            // 空期望数组匹配任意实际数组
            for (i, sub) in items.iter().enumerate() {
                let found = actual_items
                    .iter()
                    .any(|candidate| partial_match(sub, candidate).is_ok());
                if !found {
                    return Err(MatchError::new(format!(
                        "array element [{i}] not found in actual"
                    )));
                }
            }
            Ok(())
        }

        Pattern::Exact(value) => value_match(value, actual),
    }
}

/// 普通 JSON 值之间的部分匹配: 对象子集、数组存在性、标量深度相等
fn value_match(expected: &Value, actual: &Value) -> Result<(), MatchError> {
    match expected {
        Value::Object(fields) => {
            let map = actual
                .as_object()
                .ok_or_else(|| MatchError::new(format!("expected object, got {}", type_name(actual))))?;
            for (key, sub) in fields {
                let value = map
                    .get(key)
                    .ok_or_else(|| MatchError::new(format!("missing field {key:?}")))?;
                value_match(sub, value).map_err(|e| e.in_field(key))?;
            }
            Ok(())
        }

        Value::Array(items) => {
            let actual_items = actual
                .as_array()
                .ok_or_else(|| MatchError::new(format!("expected array, got {}", type_name(actual))))?;
            for (i, sub) in items.iter().enumerate() {
                let found = actual_items
                    .iter()
                    .any(|candidate| value_match(sub, candidate).is_ok());
                if !found {
                    return Err(MatchError::new(format!(
                        "array element [{i}] not found in actual"
                    )));
                }
            }
            Ok(())
        }

        scalar => {
            if scalar != actual {
                return Err(MatchError::new(format!("expected {scalar}, got {actual}")));
            }
            Ok(())
        }
    }
}

/// 响应体期望
///
/// `Bytes` 来自原始字节: 当期望和实际都能解析为 JSON 对象时走结构
/// 化部分匹配, 否则回退到逐字节相等, 这样纯文本响应也能精确断言。
/// `Pattern` 用于程序化构造的结构期望, 可以嵌入匹配器。
#[derive(Debug, Clone)]
pub enum BodyExpect {
    Bytes(Vec<u8>),
    Pattern(Pattern),
}

impl BodyExpect {
    pub fn validate(&self, actual: &[u8]) -> Result<(), MatchError> {
        match self {
            BodyExpect::Bytes(expected) => {
                if let (Some(exp), Some(act)) = (as_json_object(expected), as_json_object(actual)) {
                    return value_match(&exp, &act);
                }
                if expected != actual {
                    return Err(MatchError::new(format!(
                        "unexpected body: {}",
                        String::from_utf8_lossy(actual)
                    )));
                }
                Ok(())
            }
            BodyExpect::Pattern(pattern) => {
                let actual: Value = serde_json::from_slice(actual)
                    .map_err(|e| MatchError::new(format!("body is not valid JSON: {e}")))?;
                partial_match(pattern, &actual)
            }
        }
    }
}

impl From<Pattern> for BodyExpect {
    fn from(pattern: Pattern) -> Self {
        BodyExpect::Pattern(pattern)
    }
}

impl From<Value> for BodyExpect {
    fn from(value: Value) -> Self {
        BodyExpect::Pattern(Pattern::Exact(value))
    }
}

/// 尝试把字节串解析为 JSON 对象
fn as_json_object(data: &[u8]) -> Option<Value> {
    match serde_json::from_slice::<Value>(data) {
        Ok(v @ Value::Object(_)) => Some(v),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assertion::matchers::{Contains, Gt, Gte};
    use serde_json::json;

    #[test]
    fn test_object_subset_match() {
        let expected = Pattern::from(json!({"id": "abc"}));
        let actual = json!({"id": "abc", "name": "alice", "extra": [1, 2]});

        // 实际对象中多余的键不影响匹配
        assert!(partial_match(&expected, &actual).is_ok());
    }

    #[test]
    fn test_missing_field() {
        let expected = Pattern::from(json!({"id": "abc"}));
        let err = partial_match(&expected, &json!({"name": "alice"})).unwrap_err();
        assert!(err.0.contains("missing field"), "got: {}", err.0);
    }

    #[test]
    fn test_nested_mismatch_reports_path() {
        let expected = Pattern::from(json!({"user": {"id": 1}}));
        let err = partial_match(&expected, &json!({"user": {"id": 2}})).unwrap_err();
        assert!(err.0.contains(r#"field "user""#), "got: {}", err.0);
    }

    #[test]
    fn test_array_existential_match() {
        let expected = Pattern::from(json!([{"id": 2}]));
        let actual = json!([{"id": 1}, {"id": 2, "name": "bob"}, {"id": 3}]);

        // 顺序无关, 多余元素无关
        assert!(partial_match(&expected, &actual).is_ok());
    }

    #[test]
    fn test_empty_expected_array_matches_any() {
        let expected = Pattern::from(json!([]));
        assert!(partial_match(&expected, &json!([1, 2, 3])).is_ok());
        assert!(partial_match(&expected, &json!([])).is_ok());
    }

    #[test]
    fn test_array_element_not_found() {
        let expected = Pattern::from(json!([{"id": 9}]));
        let err = partial_match(&expected, &json!([{"id": 1}])).unwrap_err();
        assert!(err.0.contains("array element [0]"), "got: {}", err.0);
    }

    #[test]
    fn test_type_mismatch() {
        let expected = Pattern::from(json!({"a": 1}));
        assert!(partial_match(&expected, &json!([1])).is_err());

        let expected = Pattern::from(json!([1]));
        assert!(partial_match(&expected, &json!({"a": 1})).is_err());
    }

    #[test]
    fn test_matcher_delegation() {
        let expected = Pattern::object([
            ("count", Pattern::matcher(Gte(3.0))),
            ("name", Pattern::matcher(Contains("ali".into()))),
        ]);
        let actual = json!({"count": 5, "name": "alice"});

        assert!(partial_match(&expected, &actual).is_ok());
    }

    #[test]
    fn test_matcher_delegation_failure() {
        let expected = Pattern::object([("count", Pattern::matcher(Gt(10.0)))]);
        let err = partial_match(&expected, &json!({"count": 1})).unwrap_err();
        assert!(err.0.contains("expected > 10"), "got: {}", err.0);
    }

    #[test]
    fn test_body_partial_json() {
        let body = BodyExpect::Bytes(br#"{"count": 1}"#.to_vec());
        assert!(body.validate(br#"{"count": 1, "extra": true}"#).is_ok());
        assert!(body.validate(br#"{"count": 2}"#).is_err());
    }

    #[test]
    fn test_body_exact_bytes_fallback() {
        // 任一侧不是 JSON 对象时回退到逐字节比较
        let body = BodyExpect::Bytes(b"plain text".to_vec());
        assert!(body.validate(b"plain text").is_ok());
        assert!(body.validate(b"other text").is_err());

        let numeric = BodyExpect::Bytes(b"12345".to_vec());
        assert!(numeric.validate(b"12345").is_ok());
    }

    #[test]
    fn test_body_pattern_requires_json() {
        let body = BodyExpect::Pattern(Pattern::object([("n", Pattern::matcher(Gt(0.0)))]));
        assert!(body.validate(b"not json").is_err());
        assert!(body.validate(br#"{"n": 4}"#).is_ok());
    }
}
