//! 检测模块：设备检测核心逻辑
pub mod global;
pub mod detector;
pub mod chain;

// 导出核心接口
pub use self::global::{global_detector, init_global_detector, init_global_detector_with_rules};
pub use self::detector::{DeviceDetector, DeviceParser};
pub use self::chain::DetectorChain;
