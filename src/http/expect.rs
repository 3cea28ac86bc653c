use crate::assertion::{AnyOf, BodyExpect, MatchError, SaveEntry, save_from_json};
use crate::error::Result;
use crate::variable::VarStore;

/// 期望的 HTTP 响应
///
/// 校验顺序: 状态码 → 响应头 → 响应体 → 字段提取。状态码集合与精确
/// 状态码互斥, 集合非空时优先。响应体只读取一次, 响应体断言和字段
/// 提取共用同一份字节。
#[derive(Debug, Clone, Default)]
pub struct HttpExpect {
    pub(crate) status: Option<u16>,
    pub(crate) status_any: AnyOf,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) body: Option<BodyExpect>,
    pub(crate) save: Vec<SaveEntry>,
}

impl HttpExpect {
    /// 校验响应, 提取的字段写入变量存储
    pub(crate) async fn validate(
        &self,
        response: reqwest::Response,
        vars: &mut VarStore,
    ) -> Result<()> {
        let status = response.status().as_u16();
        if !self.status_any.is_empty() {
            self.status_any.match_status(status)?;
        } else if let Some(expected) = self.status {
            if status != expected {
                return Err(MatchError::new(format!("unexpected status code: {status}")).into());
            }
        }

        for (key, expected) in &self.headers {
            let actual = response
                .headers()
                .get(key)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default();
            if actual != expected {
                return Err(
                    MatchError::new(format!("unexpected header {key}: {actual:?}")).into(),
                );
            }
        }

        // 仅在断言需要时读取响应体, 状态码断言不触发读取
        if self.body.is_some() || !self.save.is_empty() {
            let bytes = response.bytes().await?;

            if let Some(body) = &self.body {
                body.validate(&bytes)?;
            }

            save_from_json(&bytes, &self.save, vars);
        }

        Ok(())
    }
}
