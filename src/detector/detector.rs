//! 设备检测器核心
//! 核心职责：
//! 1. 加载并编译规则文件（一次性，之后只读）
//! 2. 预匹配门控：快速排除不可能命中的 UA
//! 3. 按声明顺序匹配品牌规则，应用型号子规则的型号/品牌/设备类型覆盖

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use crate::compiler::{CompiledDeviceRule, PatternOptions, PreMatchGate, RuleCompiler};
use crate::config::{DetectorConfig, RuleFileFormat};
use crate::error::DdResult;
use crate::rule::{DeviceMatchResult, RawRuleList, RuleLoader, UNKNOWN_BRAND};
use crate::utils::{BrandLookup, ModelBuilder};

/// 设备解析接口
pub trait DeviceParser: Send + Sync {
    /// 是否至少有一条规则可能匹配（必要不充分条件）
    fn pre_match(&self, user_agent: &str) -> bool;
    /// 完整解析；未命中返回 `None`
    fn parse(&self, user_agent: &str) -> Option<DeviceMatchResult>;
}

/// 设备检测器
/// 设计说明：
/// - rules: 编译后的规则列表（按文件声明顺序，Arc 共享给门控）
/// - gate: 预匹配门控（默认在加载结束时构建）
/// - brands: 外部品牌查找
#[derive(Clone)]
pub struct DeviceDetector {
    rules: Arc<Vec<CompiledDeviceRule>>,
    gate: Arc<PreMatchGate>,
    brands: Arc<dyn BrandLookup>,
    config: DetectorConfig,
}

impl fmt::Debug for DeviceDetector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceDetector")
            .field("rule_count", &self.rules.len())
            .field("gate_built", &self.gate.is_built())
            .field("config", &self.config)
            .finish()
    }
}

impl DeviceDetector {
    /// 使用默认配置加载指定规则文件
    pub fn load(path: impl AsRef<Path>, brands: Arc<dyn BrandLookup>) -> DdResult<Self> {
        Self::load_with_config(DetectorConfig::with_rule_path(path.as_ref()), brands)
    }

    /// 按配置加载规则文件
    pub fn load_with_config(config: DetectorConfig, brands: Arc<dyn BrandLookup>) -> DdResult<Self> {
        let raw_rules = RuleLoader::load(&config.rule_path, config.format)?;
        Self::from_rules(raw_rules, brands, config)
    }

    /// 异步加载规则文件（仅 I/O 异步，编译仍在当前线程完成）
    #[cfg(feature = "async-io")]
    pub async fn load_async(config: DetectorConfig, brands: Arc<dyn BrandLookup>) -> DdResult<Self> {
        let raw_rules = RuleLoader::load_async(&config.rule_path, config.format).await?;
        Self::from_rules(raw_rules, brands, config)
    }

    /// 从内存中的规则文本创建检测器
    pub fn from_rule_str(
        content: &str,
        format: RuleFileFormat,
        brands: Arc<dyn BrandLookup>,
        config: DetectorConfig,
    ) -> DdResult<Self> {
        let raw_rules = RuleLoader::parse_str(content, format)?;
        Self::from_rules(raw_rules, brands, config)
    }

    /// 从已读取的原始规则创建检测器
    pub fn from_rules(
        raw_rules: RawRuleList,
        brands: Arc<dyn BrandLookup>,
        config: DetectorConfig,
    ) -> DdResult<Self> {
        let start = Instant::now();
        let options = PatternOptions::from(&config);

        let rules = Arc::new(RuleCompiler::compile(raw_rules, &options)?);
        let gate = Arc::new(PreMatchGate::new(rules.clone(), options));
        if config.eager_gate {
            gate.build();
        }

        info!(
            "DeviceDetector ready: {} rules from {}, elapsed {:?}",
            rules.len(),
            config.rule_path.display(),
            start.elapsed()
        );

        Ok(Self {
            rules,
            gate,
            brands,
            config,
        })
    }

    /// 预匹配：是否至少有一条规则可能命中
    pub fn pre_match(&self, user_agent: &str) -> bool {
        self.gate.pre_match(user_agent)
    }

    /// 解析 UA，返回设备类型/品牌/型号
    ///
    /// 只取声明顺序中第一条命中的品牌规则；品牌查找失败时整体返回 `None`
    pub fn parse(&self, user_agent: &str) -> Option<DeviceMatchResult> {
        let (rule, captures) = self.rules.iter().find_map(|rule| {
            rule.pattern
                .match_captures(user_agent)
                .map(|captures| (rule, captures))
        })?;

        let mut result = DeviceMatchResult::new(rule.device.as_str());

        if rule.brand != UNKNOWN_BRAND {
            let Some(brand_code) = self.brands.brand_code(&rule.brand) else {
                debug!("品牌规则命中但品牌未知，丢弃结果：brand={}", rule.brand);
                return None;
            };
            result.brand = brand_code;
        }

        if let Some(template) = &rule.model {
            result.model = ModelBuilder::build(template, &captures);
        }

        // 第一条命中的子规则生效，使用子规则自己的捕获组
        for model_rule in &rule.models {
            let Some(model_captures) = model_rule.pattern.match_captures(user_agent) else {
                continue;
            };

            result.model = model_rule
                .model
                .as_deref()
                .map(|template| ModelBuilder::build(template, &model_captures).trim().to_string())
                .unwrap_or_default();

            if let Some(brand) = &model_rule.brand {
                // 子规则品牌未知时保留品牌规则的结果
                if let Some(brand_code) = self.brands.brand_code(brand) {
                    result.brand = brand_code;
                }
            }

            if let Some(device) = &model_rule.device {
                result.device_type = device.clone();
            }

            return Some(result);
        }

        Some(result)
    }

    /// 编译后的规则（按声明顺序）
    pub fn rules(&self) -> &[CompiledDeviceRule] {
        &self.rules
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    pub fn gate(&self) -> &PreMatchGate {
        &self.gate
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }
}

impl DeviceParser for DeviceDetector {
    fn pre_match(&self, user_agent: &str) -> bool {
        DeviceDetector::pre_match(self, user_agent)
    }

    fn parse(&self, user_agent: &str) -> Option<DeviceMatchResult> {
        DeviceDetector::parse(self, user_agent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::BrandTable;
    use proptest::prelude::*;
    use std::io::Write;

    const MOBILE_RULES: &str = r#"
Google:
  regex: 'Android ([0-9.]+)'
  device: 'smartphone'
  model: 'Pixel $1'
Samsung:
  regex: 'SAMSUNG|SM-[A-Z]'
  device: 'smartphone'
  model: 'Galaxy'
  models:
    - regex: 'SM-T([0-9]+)'
      model: ' Galaxy Tab $1 '
      device: 'tablet'
    - regex: 'SM-([A-Z][0-9]+)'
      model: 'Galaxy $1'
    - regex: 'SM-X200'
      model: 'never reached'
      device: 'wearable'
Acer:
  regex: 'Acer'
  device: 'tablet'
  models:
    - regex: 'Acer ?Liquid'
      model: 'Liquid'
      brand: 'Gateway'
      device: 'smartphone'
    - regex: 'Acer ?Nitro'
      model: 'Nitro'
      brand: 'Lenovo'
Unknown:
  regex: 'Googlebot|bingbot'
  device: 'bot'
Nokia:
  regex: 'Nokia'
  device: 'feature phone'
  model: 'Lumia'
"#;

    fn brands() -> Arc<dyn BrandLookup> {
        Arc::new(BrandTable::from_pairs([
            ("GO", "Google"),
            ("SA", "Samsung"),
            ("AC", "Acer"),
            ("LE", "Lenovo"),
        ]))
    }

    fn detector() -> DeviceDetector {
        DeviceDetector::from_rule_str(
            MOBILE_RULES,
            RuleFileFormat::Yaml,
            brands(),
            DetectorConfig::default(),
        )
        .unwrap()
    }

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    #[test]
    fn test_rule_level_model_from_template() {
        init_tracing();
        let result = detector()
            .parse("Mozilla/5.0 (Linux; Android 10; K) AppleWebKit/537.36")
            .unwrap();
        assert_eq!(
            result,
            DeviceMatchResult {
                device_type: "smartphone".into(),
                brand: "GO".into(),
                model: "Pixel 10".into(),
            }
        );
    }

    #[test]
    fn test_unknown_brand_rejects_match_but_gate_passes() {
        let detector = DeviceDetector::from_rule_str(
            MOBILE_RULES,
            RuleFileFormat::Yaml,
            Arc::new(BrandTable::new()),
            DetectorConfig::default(),
        )
        .unwrap();
        let ua = "Mozilla/5.0 (Linux; Android 10; K)";
        assert!(detector.pre_match(ua));
        assert_eq!(detector.parse(ua), None);
    }

    #[test]
    fn test_sentinel_brand_skips_lookup() {
        let result = detector()
            .parse("Mozilla/5.0 (compatible; Googlebot/2.1)")
            .unwrap();
        assert_eq!(result, DeviceMatchResult::new("bot"));
    }

    #[test]
    fn test_sub_rule_overrides_device_type_and_trims_model() {
        let result = detector().parse("Linux; SM-T510 Build/PPR1").unwrap();
        assert_eq!(result.device_type, "tablet");
        assert_eq!(result.brand, "SA");
        assert_eq!(result.model, "Galaxy Tab 510");
    }

    #[test]
    fn test_first_matching_sub_rule_wins() {
        // SM-X200 同时命中第 2、3 条子规则，只取第 2 条
        let result = detector().parse("Linux; SM-X200").unwrap();
        assert_eq!(result.model, "Galaxy X200");
        assert_eq!(result.device_type, "smartphone");
    }

    #[test]
    fn test_rule_template_used_when_no_sub_rule_matches() {
        let result = detector().parse("SAMSUNG-GT-I9505").unwrap();
        assert_eq!(result.model, "Galaxy");
        assert_eq!(result.device_type, "smartphone");
    }

    #[test]
    fn test_sub_rule_brand_override() {
        // Gateway 不在品牌表中：保留 Acer，但型号和设备类型仍被覆盖
        let liquid = detector().parse("Acer Liquid Z6").unwrap();
        assert_eq!(liquid.brand, "AC");
        assert_eq!(liquid.model, "Liquid");
        assert_eq!(liquid.device_type, "smartphone");

        let nitro = detector().parse("Acer Nitro 5").unwrap();
        assert_eq!(nitro.brand, "LE");
        assert_eq!(nitro.model, "Nitro");
        assert_eq!(nitro.device_type, "tablet");
    }

    #[test]
    fn test_sub_rule_without_template_clears_model() {
        let detector = DeviceDetector::from_rule_str(
            r#"
Nokia:
  regex: 'Nokia'
  device: 'smartphone'
  model: 'Lumia'
  models:
    - regex: 'Nokia Asha'
      device: 'feature phone'
"#,
            RuleFileFormat::Yaml,
            Arc::new(BrandTable::from_pairs([("NK", "Nokia")])),
            DetectorConfig::default(),
        )
        .unwrap();

        let result = detector.parse("Nokia Asha 501").unwrap();
        assert_eq!(result.model, "");
        assert_eq!(result.device_type, "feature phone");
    }

    #[test]
    fn test_first_rule_wins_over_later_rules() {
        // 同时命中 Google 与 Samsung，Google 在前
        let result = detector().parse("Linux; Android 9; SM-T510").unwrap();
        assert_eq!(result.brand, "GO");
        assert_eq!(result.model, "Pixel 9");
        assert_eq!(result.device_type, "smartphone");
    }

    #[test]
    fn test_later_rule_failing_brand_is_never_reached() {
        // Nokia 不在品牌表中，但 Google 先命中
        let result = detector().parse("Android 8; Nokia 7").unwrap();
        assert_eq!(result.brand, "GO");
        // 只有 Nokia 命中时才因品牌未知返回 None
        assert_eq!(detector().parse("Nokia 3310"), None);
    }

    #[test]
    fn test_no_rule_matches() {
        let detector = detector();
        assert!(!detector.pre_match("curl/8.4.0"));
        assert_eq!(detector.parse("curl/8.4.0"), None);
        assert_eq!(detector.parse(""), None);
    }

    #[test]
    fn test_parse_is_idempotent_and_engines_agree() {
        let first = detector();
        let second = detector();
        for ua in [
            "Linux; SM-T510",
            "Acer Liquid",
            "Googlebot",
            "Nokia 3310",
            "curl/8.4.0",
        ] {
            let once = first.parse(ua);
            assert_eq!(first.parse(ua), once);
            assert_eq!(second.parse(ua), once);
        }
    }

    #[test]
    fn test_invalid_rule_fails_load() {
        let err = DeviceDetector::from_rule_str(
            "Acer:\n  regex: 'Acer ['\n  device: 'tablet'\n",
            RuleFileFormat::Yaml,
            brands(),
            DetectorConfig::default(),
        )
        .unwrap_err();
        assert!(err.is_load_failure());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".yml").tempfile().unwrap();
        file.write_all(MOBILE_RULES.as_bytes()).unwrap();

        let detector = DeviceDetector::load(file.path(), brands()).unwrap();
        assert_eq!(detector.rule_count(), 5);
        assert_eq!(detector.rules()[3].brand, UNKNOWN_BRAND);
        assert!(detector.gate().is_built());
        assert_eq!(detector.parse("Acer Nitro").unwrap().brand, "LE");

        let missing = DeviceDetector::load(file.path().with_extension("missing"), brands());
        assert!(missing.is_err());
    }

    #[test]
    fn test_lookahead_rules_load_and_match() {
        let mut file = tempfile::Builder::new().suffix(".yml").tempfile().unwrap();
        file.write_all(
            br#"
Samsung:
  regex: 'SM-[A-Z0-9]+(?!.*Build)'
  device: 'smartphone'
  models:
    - regex: 'SM-T([0-9]+)(?![0-9])'
      model: 'Galaxy Tab $1'
      device: 'tablet'
    - regex: 'SM-([A-Z][0-9]+)'
      model: 'Galaxy $1'
Google:
  regex: 'Android ([0-9.]+)'
  device: 'smartphone'
  model: 'Pixel $1'
"#,
        )
        .unwrap();

        let detector = DeviceDetector::load(file.path(), brands()).unwrap();
        assert!(detector.rules()[0].pattern.is_backtracking());
        assert!(!detector.rules()[1].pattern.is_backtracking());

        let tablet = detector.parse("Linux; SM-T510) AppleWebKit").unwrap();
        assert_eq!(tablet.brand, "SA");
        assert_eq!(tablet.model, "Galaxy Tab 510");
        assert_eq!(tablet.device_type, "tablet");

        let phone = detector.parse("Linux; SM-G960F) AppleWebKit").unwrap();
        assert_eq!(phone.model, "Galaxy G960");

        // 前瞻排除 Build 后，落到下一条规则
        let ua = "Linux; Android 9; SM-G960F Build/PPR1";
        assert!(detector.pre_match(ua));
        let fallback = detector.parse(ua).unwrap();
        assert_eq!(fallback.brand, "GO");
        assert_eq!(fallback.model, "Pixel 9");

        assert!(!detector.pre_match("Linux; SM-G960F Build/PPR1"));
        assert_eq!(detector.parse("Linux; SM-G960F Build/PPR1"), None);
    }

    #[test]
    fn test_lazy_gate_is_built_once_under_concurrency() {
        let config = DetectorConfig {
            eager_gate: false,
            ..DetectorConfig::default()
        };
        let detector =
            DeviceDetector::from_rule_str(MOBILE_RULES, RuleFileFormat::Yaml, brands(), config)
                .unwrap();
        assert!(!detector.gate().is_built());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let detector = detector.clone();
                std::thread::spawn(move || {
                    let ua = if i % 2 == 0 { "Android 11" } else { "curl/8.4.0" };
                    (i, detector.pre_match(ua))
                })
            })
            .collect();

        for handle in handles {
            let (i, matched) = handle.join().unwrap();
            assert_eq!(matched, i % 2 == 0);
        }
        assert!(detector.gate().is_built());
    }

    fn ua_strategy() -> impl Strategy<Value = String> {
        let tokens = vec![
            "Mozilla/5.0", "Linux", "Android 10", "SM-T510", "SM-X200", "SAMSUNG", "Acer",
            "Liquid", "Nitro", "Googlebot", "Nokia", "XNokia", "curl/8.4.0", "(", ";",
        ];
        prop::collection::vec(prop::sample::select(tokens), 0..5)
            .prop_map(|parts| parts.join(" "))
    }

    proptest! {
        #[test]
        fn prop_parse_result_implies_gate(ua in ua_strategy()) {
            let detector = detector();
            if detector.parse(&ua).is_some() {
                prop_assert!(detector.pre_match(&ua));
            }
        }

        #[test]
        fn prop_result_comes_from_first_matching_rule(ua in ua_strategy()) {
            let detector = detector();
            let first = detector.rules().iter().find(|rule| rule.pattern.is_match(&ua));
            match (first, detector.parse(&ua)) {
                (None, parsed) => prop_assert_eq!(parsed, None),
                (Some(rule), Some(parsed)) if rule.brand == UNKNOWN_BRAND => {
                    prop_assert_eq!(parsed.brand, "");
                }
                (Some(rule), Some(parsed)) => {
                    // 子规则可以覆盖品牌，但结果一定来自第一条命中的品牌规则
                    let expected = brands().brand_code(&rule.brand).unwrap();
                    let overrides: Vec<String> = rule
                        .models
                        .iter()
                        .filter_map(|m| m.brand.as_deref())
                        .filter_map(|b| brands().brand_code(b))
                        .collect();
                    prop_assert!(parsed.brand == expected || overrides.contains(&parsed.brand));
                }
                (Some(rule), None) => {
                    prop_assert!(brands().brand_code(&rule.brand).is_none());
                }
            }
        }
    }
}
