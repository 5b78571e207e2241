//! 全局配置管理，存储检测器的所有可配置项

use std::path::{Path, PathBuf};

/// 规则文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RuleFileFormat {
    /// 按扩展名判断：`.json` 为 JSON，其余按 YAML 处理
    #[default]
    Auto,
    Yaml,
    Json,
}

impl RuleFileFormat {
    /// 将 Auto 解析为具体格式
    pub fn resolve(self, path: &Path) -> Self {
        match self {
            RuleFileFormat::Auto => {
                let is_json = path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
                if is_json {
                    RuleFileFormat::Json
                } else {
                    RuleFileFormat::Yaml
                }
            }
            other => other,
        }
    }
}

/// 检测器配置
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    // 规则文件路径
    pub rule_path: PathBuf,
    // 规则文件格式
    pub format: RuleFileFormat,
    // 正则是否忽略大小写
    pub case_insensitive: bool,
    // 是否为每条规则加上 UA 词边界前缀
    pub ua_boundary: bool,
    // 是否在加载结束时立即构建预匹配门控
    pub eager_gate: bool,
    // 单个正则（含合并门控）编译后的大小上限（字节）
    pub regex_size_limit: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            rule_path: PathBuf::from("regexes/device/mobiles.yml"),
            format: RuleFileFormat::Auto,
            case_insensitive: true,
            ua_boundary: true,
            eager_gate: true,
            regex_size_limit: 64 * (1 << 20),
        }
    }
}

impl DetectorConfig {
    /// 指定规则文件，其余取默认值
    pub fn with_rule_path(path: impl Into<PathBuf>) -> Self {
        Self {
            rule_path: path.into(),
            ..Self::default()
        }
    }
}

/// 配置管理器
pub struct ConfigManager;

impl ConfigManager {
    /// 获取默认配置
    pub fn get_default() -> DetectorConfig {
        DetectorConfig::default()
    }

    /// 自定义配置
    pub fn custom() -> CustomConfigBuilder {
        CustomConfigBuilder::new()
    }
}

/// 配置构建器（链式 API）
#[derive(Debug, Clone, Default)]
pub struct CustomConfigBuilder {
    config: DetectorConfig,
}

impl CustomConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rule_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.rule_path = path.into();
        self
    }

    pub fn format(mut self, format: RuleFileFormat) -> Self {
        self.config.format = format;
        self
    }

    pub fn case_insensitive(mut self, enabled: bool) -> Self {
        self.config.case_insensitive = enabled;
        self
    }

    pub fn ua_boundary(mut self, enabled: bool) -> Self {
        self.config.ua_boundary = enabled;
        self
    }

    pub fn eager_gate(mut self, eager: bool) -> Self {
        self.config.eager_gate = eager;
        self
    }

    pub fn regex_size_limit(mut self, bytes: usize) -> Self {
        self.config.regex_size_limit = bytes;
        self
    }

    pub fn build(self) -> DetectorConfig {
        self.config
    }
}
