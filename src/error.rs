//! 全局错误类型定义
//! 结构性错误（文件缺失、格式错误、正则非法）在加载期直接上抛；
//! "未匹配" 不是错误，由 `parse` 返回 `None` 表达

use fancy_regex::Error as FancyRegexError;
use regex::Error as RegexError;
use serde_json::Error as SerdeJsonError;
use serde_yaml::Error as SerdeYamlError;
use std::io::Error as IoError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeviceDetectorError {
    // 规则相关错误
    #[error("Rule load failed: {0}")]
    RuleLoadError(String),
    #[error("Rule parse failed: {0}")]
    RuleParseError(String),

    // 编译相关错误
    #[error("Regex compilation failed for brand [{brand}], pattern `{pattern}`: {source}")]
    RegexCompileError {
        brand: String,
        pattern: String,
        #[source]
        source: PatternError,
    },

    // 检测器相关错误
    #[error("Detector not initialized: {0}")]
    DetectorNotInitialized(String),
    #[error("Detector initialization failed: {source}")]
    DetectorInitError {
        #[source]
        source: Box<DeviceDetectorError>,
    },

    // 序列化/反序列化错误
    #[error("YAML parse failed: {0}")]
    YamlError(#[from] SerdeYamlError),
    #[error("JSON parse failed: {0}")]
    JsonError(#[from] SerdeJsonError),

    // 基础错误
    #[error("IO operation failed: {0}")]
    IoError(#[from] IoError),
}

impl DeviceDetectorError {
    /// 是否为加载期的结构性错误（读文件 / 解析 / 编译），初始化错误按内部错误判断
    pub fn is_load_failure(&self) -> bool {
        match self {
            Self::RuleLoadError(_)
            | Self::RuleParseError(_)
            | Self::RegexCompileError { .. }
            | Self::YamlError(_)
            | Self::JsonError(_)
            | Self::IoError(_) => true,
            Self::DetectorInitError { source } => source.is_load_failure(),
            Self::DetectorNotInitialized(_) => false,
        }
    }

    /// 包装初始化阶段的内部错误
    pub fn init_failed(source: DeviceDetectorError) -> Self {
        Self::DetectorInitError {
            source: Box::new(source),
        }
    }
}

/// 正则编译错误（标准引擎或回溯引擎）
#[derive(Error, Debug)]
pub enum PatternError {
    #[error(transparent)]
    Standard(#[from] RegexError),
    #[error(transparent)]
    Backtracking(#[from] FancyRegexError),
}

// 全局Result类型
pub type DdResult<T> = Result<T, DeviceDetectorError>;
