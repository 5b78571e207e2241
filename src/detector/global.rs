//! 全局检测器单例管理
//! 维护进程生命周期内唯一的 DeviceDetector 实例；初始化幂等，之后只读

use std::sync::Arc;

use once_cell::sync::OnceCell;
use tracing::{debug, info};

use super::detector::DeviceDetector;
use crate::config::DetectorConfig;
use crate::error::{DdResult, DeviceDetectorError};
use crate::rule::RawRuleList;
use crate::utils::BrandLookup;

/// 全局检测器实例
static GLOBAL_DETECTOR: OnceCell<DeviceDetector> = OnceCell::new();

/// 按配置加载规则文件并初始化全局检测器
/// 已初始化则直接返回 Ok(())
pub fn init_global_detector(config: DetectorConfig, brands: Arc<dyn BrandLookup>) -> DdResult<()> {
    init_with(|| DeviceDetector::load_with_config(config, brands))
}

/// 使用预读取的规则初始化全局检测器
pub fn init_global_detector_with_rules(
    raw_rules: RawRuleList,
    brands: Arc<dyn BrandLookup>,
    config: DetectorConfig,
) -> DdResult<()> {
    init_with(|| DeviceDetector::from_rules(raw_rules, brands, config))
}

fn init_with(build: impl FnOnce() -> DdResult<DeviceDetector>) -> DdResult<()> {
    if GLOBAL_DETECTOR.get().is_some() {
        debug!("Global detector already initialized, skip reinitialization");
        return Ok(());
    }

    GLOBAL_DETECTOR
        .get_or_try_init(|| build().map_err(DeviceDetectorError::init_failed))
        .map(|_| info!("Global DeviceDetector initialized successfully"))
}

/// 获取全局检测器（未初始化时返回错误，不做隐式加载）
pub fn global_detector() -> DdResult<&'static DeviceDetector> {
    GLOBAL_DETECTOR.get().ok_or_else(|| {
        DeviceDetectorError::DetectorNotInitialized(
            "Global DeviceDetector not initialized! Please call init_global_detector first"
                .to_string(),
        )
    })
}
