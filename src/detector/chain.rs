//! 检测器链：按固定顺序串联多个规则文件（手机、游戏机、电视等）
//! 第一个给出结果的检测器生效

use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use super::detector::{DeviceDetector, DeviceParser};
use crate::config::DetectorConfig;
use crate::error::DdResult;
use crate::rule::DeviceMatchResult;
use crate::utils::BrandLookup;

/// 检测器链
#[derive(Debug, Clone, Default)]
pub struct DetectorChain {
    members: Vec<(String, DeviceDetector)>,
}

impl DetectorChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一个检测器（追加顺序即匹配顺序）
    pub fn push(&mut self, name: impl Into<String>, detector: DeviceDetector) -> &mut Self {
        self.members.push((name.into(), detector));
        self
    }

    /// 按给定顺序加载目录下的规则文件；任一文件失败则整体失败
    ///
    /// `base` 里的 `rule_path` 会被逐个文件覆盖，其余选项共用
    pub fn load_dir(
        dir: &Path,
        file_names: &[&str],
        brands: Arc<dyn BrandLookup>,
        base: &DetectorConfig,
    ) -> DdResult<Self> {
        let mut chain = Self::new();
        for &file_name in file_names {
            let config = DetectorConfig {
                rule_path: dir.join(file_name),
                ..base.clone()
            };
            let detector = DeviceDetector::load_with_config(config, brands.clone())?;
            let name = Path::new(file_name)
                .file_stem()
                .and_then(|stem| stem.to_str())
                .unwrap_or(file_name);
            chain.push(name, detector);
        }
        debug!("检测器链加载完成，成员数：{}", chain.len());
        Ok(chain)
    }

    /// 解析并返回命中的检测器名称
    pub fn parse_named(&self, user_agent: &str) -> Option<(&str, DeviceMatchResult)> {
        self.members.iter().find_map(|(name, detector)| {
            if !detector.pre_match(user_agent) {
                return None;
            }
            detector
                .parse(user_agent)
                .map(|result| (name.as_str(), result))
        })
    }

    pub fn get(&self, name: &str) -> Option<&DeviceDetector> {
        self.members
            .iter()
            .find(|(member, _)| member == name)
            .map(|(_, detector)| detector)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.members.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl DeviceParser for DetectorChain {
    fn pre_match(&self, user_agent: &str) -> bool {
        self.members
            .iter()
            .any(|(_, detector)| detector.pre_match(user_agent))
    }

    fn parse(&self, user_agent: &str) -> Option<DeviceMatchResult> {
        self.parse_named(user_agent).map(|(_, result)| result)
    }
}
