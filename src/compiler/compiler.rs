//! 规则编译器核心
//! 负责将原始规则编译为可执行的正则模式；任何一条正则非法都会让整个加载失败

use std::time::Instant;
use tracing::debug;

use super::pattern::{CompiledDeviceRule, CompiledModelRule, CompiledPattern, PatternOptions};
use crate::error::{DdResult, DeviceDetectorError};
use crate::rule::{DeviceRuleDef, ModelRuleDef, RawRuleList};

/// 规则编译器
pub struct RuleCompiler;

impl RuleCompiler {
    /// 编译规则列表，保持原始声明顺序
    pub fn compile(raw_rules: RawRuleList, options: &PatternOptions) -> DdResult<Vec<CompiledDeviceRule>> {
        let start = Instant::now();
        let mut stats = CompileStats::default();
        let mut compiled = Vec::with_capacity(raw_rules.len());

        for (brand, rule_def) in raw_rules {
            compiled.push(Self::compile_device_rule(brand, rule_def, options, &mut stats)?);
        }

        debug!(
            "规则编译完成，总耗时{:?}，品牌规则{}条、型号子规则{}条",
            start.elapsed(),
            stats.rule_count,
            stats.model_rule_count
        );
        Ok(compiled)
    }

    /// 编译单个品牌规则（品牌名来自分组 key，在这里挂到规则上）
    fn compile_device_rule(
        brand: String,
        rule_def: DeviceRuleDef,
        options: &PatternOptions,
        stats: &mut CompileStats,
    ) -> DdResult<CompiledDeviceRule> {
        let pattern = Self::compile_single_pattern(&brand, &rule_def.regex, options)?;

        let mut models = Vec::with_capacity(rule_def.models.len());
        for model_def in rule_def.models {
            models.push(Self::compile_model_rule(&brand, model_def, options)?);
        }

        stats.rule_count += 1;
        stats.model_rule_count += models.len();

        Ok(CompiledDeviceRule {
            brand,
            pattern,
            device: rule_def.device,
            model: rule_def.model.filter(|m| !m.is_empty()),
            models,
        })
    }

    /// 编译型号子规则
    fn compile_model_rule(
        brand: &str,
        model_def: ModelRuleDef,
        options: &PatternOptions,
    ) -> DdResult<CompiledModelRule> {
        let pattern = Self::compile_single_pattern(brand, &model_def.regex, options)?;
        Ok(CompiledModelRule {
            pattern,
            model: model_def.model,
            brand: model_def.brand.filter(|b| !b.is_empty()),
            device: model_def.device.filter(|d| !d.is_empty()),
        })
    }

    /// 编译单个正则，错误带上品牌与原始正则
    fn compile_single_pattern(
        brand: &str,
        raw_pattern: &str,
        options: &PatternOptions,
    ) -> DdResult<CompiledPattern> {
        CompiledPattern::compile(raw_pattern, options).map_err(|source| {
            DeviceDetectorError::RegexCompileError {
                brand: brand.to_string(),
                pattern: raw_pattern.to_string(),
                source,
            }
        })
    }
}

/// 编译统计信息
#[derive(Debug, Clone, Default)]
struct CompileStats {
    rule_count: usize,
    model_rule_count: usize,
}
