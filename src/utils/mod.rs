//! 工具模块：提供型号构建与品牌查找
pub mod model_builder;
pub mod brand_lookup;

pub use self::model_builder::ModelBuilder;
pub use self::brand_lookup::{BrandLookup, BrandTable};
