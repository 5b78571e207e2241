//! 预匹配门控
//! 把所有品牌规则合并成一条 `(?:p_n)|…|(?:p_1)` 正则，用于快速排除不可能命中任何规则的 UA
//!
//! 门控只回答 "是否至少有一条规则能匹配"，是 `parse` 有结果的必要条件而非充分条件

use std::sync::Arc;

use once_cell::sync::OnceCell;
use tracing::{debug, warn};

use super::pattern::{CompiledDeviceRule, PatternOptions, RegexEngine};

/// 门控构建后的状态
#[derive(Debug, Clone)]
pub enum GateState {
    /// 没有任何规则，恒为 false
    Empty,
    /// 合并后的单条正则（任一规则需要回溯引擎时整体用回溯引擎）
    Combined(RegexEngine),
    /// 合并正则无法编译时逐条判断（超出大小限制、跨规则重名分组等），结果与合并正则等价
    PerRule,
}

/// 合并顺序（布尔并集，对结果无影响）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AssemblyOrder {
    #[cfg_attr(not(test), allow(dead_code))]
    Forward,
    Reversed,
}

/// 预匹配门控
#[derive(Debug, Clone)]
pub struct PreMatchGate {
    rules: Arc<Vec<CompiledDeviceRule>>,
    options: PatternOptions,
    // 只构建一次，所有调用方看到同一份结果
    state: OnceCell<GateState>,
}

impl PreMatchGate {
    pub fn new(rules: Arc<Vec<CompiledDeviceRule>>, options: PatternOptions) -> Self {
        Self {
            rules,
            options,
            state: OnceCell::new(),
        }
    }

    /// 构建门控（幂等，并发首次调用时只有一个线程执行构建）
    pub fn build(&self) -> &GateState {
        self.state.get_or_init(|| {
            if self.rules.is_empty() {
                debug!("规则列表为空，预匹配门控恒为 false");
                return GateState::Empty;
            }

            let source = assemble_source(&self.rules, AssemblyOrder::Reversed);
            let needs_backtracking = self.rules.iter().any(|rule| rule.pattern.is_backtracking());
            let built = if needs_backtracking {
                self.options.build_backtracking(&source)
            } else {
                self.options.build_standard(&source)
            };
            match built {
                Ok(engine) => {
                    debug!(
                        "预匹配门控构建完成，合并规则数：{}，正则长度：{}，回溯引擎：{}",
                        self.rules.len(),
                        source.len(),
                        needs_backtracking
                    );
                    GateState::Combined(engine)
                }
                Err(e) => {
                    warn!("合并门控正则编译失败，退化为逐条预匹配：{}", e);
                    GateState::PerRule
                }
            }
        })
    }

    pub fn is_built(&self) -> bool {
        self.state.get().is_some()
    }

    /// 是否至少有一条规则可能匹配
    pub fn pre_match(&self, text: &str) -> bool {
        match self.build() {
            GateState::Empty => false,
            // 回溯超限时无法排除，按可能命中处理
            GateState::Combined(engine) => engine.try_is_match(text).unwrap_or(true),
            GateState::PerRule => self.rules.iter().any(|rule| rule.pattern.is_match(text)),
        }
    }

    /// 合并后的正则文本（仅 Combined 状态可用）
    pub fn combined_source(&self) -> Option<&str> {
        match self.build() {
            GateState::Combined(engine) => Some(engine.as_str()),
            _ => None,
        }
    }
}

/// 拼接合并正则；每条规则单独包一层非捕获组，防止内联标志跨分支生效
pub(crate) fn assemble_source(rules: &[CompiledDeviceRule], order: AssemblyOrder) -> String {
    let mut ordered: Vec<&CompiledDeviceRule> = rules.iter().collect();
    if order == AssemblyOrder::Reversed {
        ordered.reverse();
    }

    let mut source = String::new();
    for (i, rule) in ordered.into_iter().enumerate() {
        if i > 0 {
            source.push('|');
        }
        source.push_str("(?:");
        source.push_str(rule.pattern.effective_source());
        source.push(')');
    }
    source
}
