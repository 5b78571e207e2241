//! 规则加载管理器
//! 负责读取规则文件，并严格按文件中的声明顺序产出 (品牌名, 规则定义) 序列
//!
//! 顶层 key 的顺序决定匹配优先级，因此这里从不经过无序 HashMap：
//! YAML 读入 `serde_yaml::Mapping`（保持插入顺序），JSON 依赖 serde_json 的 `preserve_order`

use std::path::Path;
use std::time::Instant;

use serde_json::Value as JsonValue;
use serde_yaml::Value as YamlValue;
use tracing::debug;

use super::model::{DeviceRuleDef, RawRuleList};
use crate::config::RuleFileFormat;
use crate::error::{DdResult, DeviceDetectorError};

/// 规则加载管理器
pub struct RuleLoader;

impl RuleLoader {
    /// 从本地文件加载规则（只读一次文件，读失败直接返回错误）
    pub fn load(path: &Path, format: RuleFileFormat) -> DdResult<RawRuleList> {
        let start = Instant::now();
        let content = std::fs::read_to_string(path).map_err(|e| {
            DeviceDetectorError::RuleLoadError(format!("{}: {}", path.display(), e))
        })?;

        let rules = Self::parse_str(&content, format.resolve(path))?;
        debug!(
            "规则文件加载完成：{}，品牌规则数：{}，耗时：{:?}",
            path.display(),
            rules.len(),
            start.elapsed()
        );
        Ok(rules)
    }

    /// 异步加载（I/O 放到 tokio，解析逻辑与同步版共用）
    #[cfg(feature = "async-io")]
    pub async fn load_async(path: &Path, format: RuleFileFormat) -> DdResult<RawRuleList> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            DeviceDetectorError::RuleLoadError(format!("{}: {}", path.display(), e))
        })?;

        let rules = Self::parse_str(&content, format.resolve(path))?;
        debug!("规则文件异步加载完成：{}，品牌规则数：{}", path.display(), rules.len());
        Ok(rules)
    }

    /// 从内存文本解析规则；`Auto` 在无路径可参考时按 YAML 处理
    pub fn parse_str(content: &str, format: RuleFileFormat) -> DdResult<RawRuleList> {
        match format {
            RuleFileFormat::Json => Self::parse_json(content),
            RuleFileFormat::Yaml | RuleFileFormat::Auto => Self::parse_yaml(content),
        }
    }

    /// 解析 YAML 规则文件
    fn parse_yaml(content: &str) -> DdResult<RawRuleList> {
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        let mapping = match serde_yaml::from_str::<YamlValue>(content)? {
            YamlValue::Mapping(mapping) => mapping,
            YamlValue::Null => return Ok(Vec::new()),
            other => {
                return Err(DeviceDetectorError::RuleParseError(format!(
                    "top level must be a mapping of brand -> rule, got {}",
                    yaml_kind(&other)
                )))
            }
        };

        let mut rules = Vec::with_capacity(mapping.len());
        for (key, value) in mapping {
            let brand = yaml_key_to_string(&key)?;
            let rule: DeviceRuleDef = serde_yaml::from_value(value).map_err(|e| {
                DeviceDetectorError::RuleParseError(format!("brand [{}]: {}", brand, e))
            })?;
            rules.push((brand, rule));
        }
        Ok(rules)
    }

    /// 解析 JSON 规则文件
    fn parse_json(content: &str) -> DdResult<RawRuleList> {
        let map = match serde_json::from_str::<JsonValue>(content)? {
            JsonValue::Object(map) => map,
            other => {
                return Err(DeviceDetectorError::RuleParseError(format!(
                    "top level must be an object of brand -> rule, got {}",
                    json_kind(&other)
                )))
            }
        };

        let mut rules = Vec::with_capacity(map.len());
        for (brand, value) in map {
            let rule: DeviceRuleDef = serde_json::from_value(value).map_err(|e| {
                DeviceDetectorError::RuleParseError(format!("brand [{}]: {}", brand, e))
            })?;
            rules.push((brand, rule));
        }
        Ok(rules)
    }
}

/// YAML 允许数字/布尔作为 key（如品牌 `3Q`、`360`），统一转成字符串
fn yaml_key_to_string(key: &YamlValue) -> DdResult<String> {
    match key {
        YamlValue::String(s) => Ok(s.clone()),
        YamlValue::Number(n) => Ok(n.to_string()),
        YamlValue::Bool(b) => Ok(b.to_string()),
        other => Err(DeviceDetectorError::RuleParseError(format!(
            "unsupported brand key type: {}",
            yaml_kind(other)
        ))),
    }
}

fn yaml_kind(value: &YamlValue) -> &'static str {
    match value {
        YamlValue::Null => "null",
        YamlValue::Bool(_) => "bool",
        YamlValue::Number(_) => "number",
        YamlValue::String(_) => "string",
        YamlValue::Sequence(_) => "sequence",
        YamlValue::Mapping(_) => "mapping",
        YamlValue::Tagged(_) => "tagged value",
    }
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "bool",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}
