use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;
use std::collections::HashMap;

/// `{name}` 占位符, 变量名限定为标识符形式
static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([a-zA-Z_][a-zA-Z0-9_]*)\}").unwrap());

/// 变量存储, 作用域为单个 Scenario 运行
///
/// 由 save 指令写入, 由 `{name}` 占位符插值读取。
/// 每次 Scenario 运行都从一个空的存储开始, 场景之间不共享变量。
#[derive(Debug, Clone, Default)]
pub struct VarStore {
    vars: HashMap<String, Value>,
}

impl VarStore {
    /// 创建新的空变量存储
    pub fn new() -> Self {
        Self::default()
    }

    /// 插入变量
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.vars.insert(key.into(), value.into());
    }

    /// 获取变量值
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.vars.get(key)
    }

    /// 变量数量
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// 替换文本中所有已知变量的 {name} 占位符
    ///
    /// 未知变量保持原样, 不报错。
    pub fn interpolate(&self, text: &str) -> String {
        PLACEHOLDER
            .replace_all(text, |caps: &Captures| {
                let name = &caps[1];
                match self.vars.get(name) {
                    Some(value) => stringify(value),
                    None => caps[0].to_string(),
                }
            })
            .to_string()
    }

    /// 对字节串执行占位符替换
    ///
    /// 非 UTF-8 内容原样返回。
    pub fn interpolate_bytes(&self, body: &[u8]) -> Vec<u8> {
        match std::str::from_utf8(body) {
            Ok(text) => self.interpolate(text).into_bytes(),
            Err(_) => body.to_vec(),
        }
    }
}

/// 变量值转换为替换文本: 字符串不带引号, 其余按 JSON 形式
fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_interpolate_simple() {
        let mut vars = VarStore::new();
        vars.insert("user_id", "abc");

        assert_eq!(vars.interpolate("/users/{user_id}"), "/users/abc");
    }

    #[test]
    fn test_interpolate_multiple() {
        let mut vars = VarStore::new();
        vars.insert("host", "example.com");
        vars.insert("port", 8080);

        assert_eq!(
            vars.interpolate("https://{host}:{port}/api"),
            "https://example.com:8080/api"
        );
    }

    #[test]
    fn test_interpolate_unknown_left_as_is() {
        let vars = VarStore::new();

        // 未知变量保持原样
        assert_eq!(vars.interpolate("/users/{missing}"), "/users/{missing}");
    }

    #[test]
    fn test_interpolate_non_string_values() {
        let mut vars = VarStore::new();
        vars.insert("count", 5);
        vars.insert("flag", true);
        vars.insert("data", json!({"a": 1}));

        assert_eq!(vars.interpolate("{count}-{flag}"), "5-true");
        assert_eq!(vars.interpolate("{data}"), r#"{"a":1}"#);
    }

    #[test]
    fn test_interpolate_bytes() {
        let mut vars = VarStore::new();
        vars.insert("token", "secret");

        let body = vars.interpolate_bytes(br#"{"auth":"{token}"}"#);
        assert_eq!(body, br#"{"auth":"secret"}"#);
    }

    #[test]
    fn test_saved_value_keeps_type() {
        let mut vars = VarStore::new();
        vars.insert("id", json!(42));

        assert_eq!(vars.get("id"), Some(&json!(42)));
    }
}
