//! 规则模块：负责规则的加载与数据模型定义
pub mod model;
pub mod loader;

// 导出核心接口
pub use self::model::{
    DeviceMatchResult, DeviceRuleDef, ModelRuleDef, RawRuleList, UNKNOWN_BRAND,
};
pub use self::loader::RuleLoader;
