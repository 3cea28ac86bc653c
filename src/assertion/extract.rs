use serde_json::Value;

use crate::variable::VarStore;

/// 字段提取指令: 从响应 JSON 中取出 `field` 路径的值, 存入变量 `var`
///
/// 路径语法为点号分隔: 普通段按对象键访问, 能解析为非负整数的段
/// 在数组上按下标访问。示例: `id`, `user.name`, `items.0.id`。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveEntry {
    pub field: String,
    pub var: String,
}

impl SaveEntry {
    pub fn new(field: impl Into<String>, var: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            var: var.into(),
        }
    }
}

/// 按点号路径在 JSON 值中查找
pub fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => {
                let index: usize = segment.parse().ok()?;
                items.get(index)?
            }
            _ => return None,
        };
    }
    Some(current)
}

/// 执行所有提取指令, 把找到的值写入变量存储
///
/// 响应体不是合法 JSON 或路径不存在时静默跳过。
pub fn save_from_json(data: &[u8], entries: &[SaveEntry], vars: &mut VarStore) {
    if entries.is_empty() {
        return;
    }
    let Ok(value) = serde_json::from_slice::<Value>(data) else {
        return;
    };
    for entry in entries {
        if let Some(found) = lookup(&value, &entry.field) {
            vars.insert(entry.var.clone(), found.clone());
        }
    }
}
