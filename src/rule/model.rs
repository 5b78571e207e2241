//! 规则数据模型定义
//! 仅存储规则数据，无任何业务逻辑，支持序列化/反序列化

use serde::{Deserialize, Serialize};
use std::fmt;

/// "无具体品牌" 哨兵值，命中该分组的规则不做品牌校验
pub const UNKNOWN_BRAND: &str = "Unknown";

/// 设备检测结果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceMatchResult {
    #[serde(rename = "type")]
    pub device_type: String,
    pub brand: String,
    pub model: String,
}

impl DeviceMatchResult {
    pub fn new(device_type: impl Into<String>) -> Self {
        Self {
            device_type: device_type.into(),
            ..Self::default()
        }
    }
}

// ======== 为 DeviceMatchResult 实现 Display trait（用于日志 / Report 输出） ========
impl fmt::Display for DeviceMatchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.device_type)?;
        if !self.brand.is_empty() {
            write!(f, " {}", self.brand)?;
        }
        if !self.model.is_empty() {
            write!(f, " {}", self.model)?;
        }
        Ok(())
    }
}

/// 品牌级规则定义（品牌名是文件中的分组 key，不在规则体内）
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DeviceRuleDef {
    pub regex: String,
    #[serde(default)]
    pub device: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub models: Vec<ModelRuleDef>,
}

/// 型号级子规则定义
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ModelRuleDef {
    pub regex: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub device: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
}

/// 按文件声明顺序排列的原始规则（品牌名, 规则定义）
pub type RawRuleList = Vec<(String, DeviceRuleDef)>;
