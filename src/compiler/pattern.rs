//! 编译后模式模型
//! 正则编译后的结构，品牌规则与型号子规则共用同一个 `CompiledPattern`
//!
//! 优先使用 `regex`（线性时间）；`regex` 不支持的语法（环视、反向引用）交给 `fancy-regex` 回溯执行

use regex::RegexBuilder;
use tracing::debug;

use crate::config::DetectorConfig;
use crate::error::PatternError;

/// UA 词边界前缀：规则只在 UA 的分词边界处生效
pub const UA_BOUNDARY_PREFIX: &str = r"(?:^|[^A-Z0-9\-_]|[^A-Z0-9\-]_|sprd-|MZ-)";

/// 正则编译选项
#[derive(Debug, Clone, Copy)]
pub struct PatternOptions {
    pub case_insensitive: bool,
    pub ua_boundary: bool,
    pub size_limit: usize,
}

impl From<&DetectorConfig> for PatternOptions {
    fn from(config: &DetectorConfig) -> Self {
        Self {
            case_insensitive: config.case_insensitive,
            ua_boundary: config.ua_boundary,
            size_limit: config.regex_size_limit,
        }
    }
}

impl Default for PatternOptions {
    fn default() -> Self {
        Self::from(&DetectorConfig::default())
    }
}

impl PatternOptions {
    /// 为原始规则加上边界前缀，得到实际参与编译的正则文本
    pub fn effective_source(&self, raw: &str) -> String {
        if self.ua_boundary {
            format!("{}(?:{})", UA_BOUNDARY_PREFIX, raw)
        } else {
            raw.to_string()
        }
    }

    /// 按选项编译任意正则文本（不再加前缀）
    /// 标准引擎报语法错误时改用回溯引擎；超出大小限制等其他错误直接返回
    pub fn build_regex(&self, source: &str) -> Result<RegexEngine, PatternError> {
        match self.build_standard(source) {
            Err(PatternError::Standard(regex::Error::Syntax(_))) => self.build_backtracking(source),
            other => other,
        }
    }

    /// 只用标准引擎编译
    pub fn build_standard(&self, source: &str) -> Result<RegexEngine, PatternError> {
        let regex = RegexBuilder::new(source)
            .case_insensitive(self.case_insensitive)
            .size_limit(self.size_limit)
            .build()?;
        Ok(RegexEngine::Standard(regex))
    }

    /// 只用回溯引擎编译
    pub fn build_backtracking(&self, source: &str) -> Result<RegexEngine, PatternError> {
        let source = if self.case_insensitive {
            format!("(?i){}", source)
        } else {
            source.to_string()
        };
        let regex = fancy_regex::RegexBuilder::new(&source)
            .delegate_size_limit(self.size_limit)
            .build()?;
        Ok(RegexEngine::Backtracking(regex))
    }
}

/// 编译后的正则引擎
#[derive(Debug, Clone)]
pub enum RegexEngine {
    /// `regex` crate，无回溯
    Standard(regex::Regex),
    /// `fancy-regex`，支持环视与反向引用
    Backtracking(fancy_regex::Regex),
}

impl RegexEngine {
    pub fn as_str(&self) -> &str {
        match self {
            RegexEngine::Standard(regex) => regex.as_str(),
            RegexEngine::Backtracking(regex) => regex.as_str(),
        }
    }

    pub fn is_backtracking(&self) -> bool {
        matches!(self, RegexEngine::Backtracking(_))
    }

    /// 回溯引擎超出回溯上限时返回错误，标准引擎不会失败
    pub fn try_is_match(&self, text: &str) -> Result<bool, fancy_regex::Error> {
        match self {
            RegexEngine::Standard(regex) => Ok(regex.is_match(text)),
            RegexEngine::Backtracking(regex) => regex.is_match(text),
        }
    }

    pub fn try_captures<'t>(
        &self,
        text: &'t str,
    ) -> Result<Option<PatternCaptures<'t>>, fancy_regex::Error> {
        match self {
            RegexEngine::Standard(regex) => Ok(regex.captures(text).map(PatternCaptures::from)),
            RegexEngine::Backtracking(regex) => {
                Ok(regex.captures(text)?.map(PatternCaptures::from))
            }
        }
    }
}

/// 两种引擎统一的捕获结果
#[derive(Debug)]
pub enum PatternCaptures<'t> {
    Standard(regex::Captures<'t>),
    Backtracking(fancy_regex::Captures<'t>),
}

impl<'t> PatternCaptures<'t> {
    /// 分组数（含 0 号整体匹配）
    pub fn len(&self) -> usize {
        match self {
            PatternCaptures::Standard(captures) => captures.len(),
            PatternCaptures::Backtracking(captures) => captures.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 第 `index` 组的文本；分组不存在或未参与匹配时为 `None`
    pub fn get(&self, index: usize) -> Option<&'t str> {
        match self {
            PatternCaptures::Standard(captures) => captures.get(index).map(|m| m.as_str()),
            PatternCaptures::Backtracking(captures) => captures.get(index).map(|m| m.as_str()),
        }
    }
}

impl<'t> From<regex::Captures<'t>> for PatternCaptures<'t> {
    fn from(captures: regex::Captures<'t>) -> Self {
        PatternCaptures::Standard(captures)
    }
}

impl<'t> From<fancy_regex::Captures<'t>> for PatternCaptures<'t> {
    fn from(captures: fancy_regex::Captures<'t>) -> Self {
        PatternCaptures::Backtracking(captures)
    }
}

/// 编译后的正则模式
/// 加载期编译一次，之后只读
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    // 规则文件中的原始正则
    source: String,
    // 加前缀后实际编译的正则
    effective: String,
    engine: RegexEngine,
}

impl CompiledPattern {
    pub fn compile(source: &str, options: &PatternOptions) -> Result<Self, PatternError> {
        let effective = options.effective_source(source);
        let engine = options.build_regex(&effective)?;
        Ok(Self {
            source: source.to_string(),
            effective,
            engine,
        })
    }

    /// 全文搜索，返回捕获结果；回溯超限按未命中处理
    #[inline]
    pub fn match_captures<'t>(&self, text: &'t str) -> Option<PatternCaptures<'t>> {
        self.engine.try_captures(text).unwrap_or_else(|e| {
            debug!("正则匹配中止，按未命中处理：{}，{}", self.source, e);
            None
        })
    }

    #[inline]
    pub fn is_match(&self, text: &str) -> bool {
        self.engine.try_is_match(text).unwrap_or_else(|e| {
            debug!("正则匹配中止，按未命中处理：{}，{}", self.source, e);
            false
        })
    }

    /// 规则文件中的原始正则
    pub fn source(&self) -> &str {
        &self.source
    }

    /// 实际编译的正则文本
    pub fn effective_source(&self) -> &str {
        &self.effective
    }

    /// 是否需要回溯引擎
    pub fn is_backtracking(&self) -> bool {
        self.engine.is_backtracking()
    }
}

/// 型号子规则（编译后）
#[derive(Debug, Clone)]
pub struct CompiledModelRule {
    pub pattern: CompiledPattern,
    pub model: Option<String>,
    pub brand: Option<String>,
    pub device: Option<String>,
}

/// 品牌规则（编译后）
#[derive(Debug, Clone)]
pub struct CompiledDeviceRule {
    // 规则文件中的分组 key
    pub brand: String,
    pub pattern: CompiledPattern,
    pub device: String,
    pub model: Option<String>,
    pub models: Vec<CompiledModelRule>,
}
