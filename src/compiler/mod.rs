//! 编译模块：将原始规则编译为可执行的正则模式，并构建预匹配门控
pub mod pattern;
pub mod compiler;
pub mod gate;

pub use self::pattern::{
    CompiledDeviceRule, CompiledModelRule, CompiledPattern, PatternCaptures, PatternOptions,
    RegexEngine, UA_BOUNDARY_PREFIX,
};
pub use self::compiler::RuleCompiler;
pub use self::gate::{GateState, PreMatchGate};
