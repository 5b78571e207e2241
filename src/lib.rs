//! rsdevicedetector - 基于 UA 正则规则库的设备类型/品牌/型号检测工具

// 导出全局错误类型
pub use self::error::{DdResult, DeviceDetectorError, PatternError};

// 导出配置模块
pub use self::config::{ConfigManager, CustomConfigBuilder, DetectorConfig, RuleFileFormat};

// 导出规则模块核心接口
pub use self::rule::{
    DeviceMatchResult, DeviceRuleDef, ModelRuleDef, RawRuleList, RuleLoader, UNKNOWN_BRAND,
};

// 导出工具模块核心接口
pub use self::utils::{BrandLookup, BrandTable, ModelBuilder};

// 导出编译模块核心接口
pub use self::compiler::{
    CompiledDeviceRule, CompiledModelRule, CompiledPattern, GateState, PatternCaptures,
    PatternOptions, PreMatchGate, RegexEngine, RuleCompiler,
};

// 导出检测模块核心接口
pub use self::detector::{
    global_detector, init_global_detector, init_global_detector_with_rules, DetectorChain,
    DeviceDetector, DeviceParser,
};

// 声明所有子模块
pub mod config;
pub mod error;
pub mod rule;
pub mod utils;
pub mod compiler;
pub mod detector;
