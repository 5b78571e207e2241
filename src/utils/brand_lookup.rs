//! 品牌查找接口
//! 将规则中的品牌名解析为规范品牌码；品牌库本身的内容和更新不在本 crate 范围内

use rustc_hash::FxHashMap;

/// 品牌名 -> 品牌码 解析
pub trait BrandLookup: Send + Sync {
    /// 返回品牌码；未知品牌返回 `None`
    fn brand_code(&self, brand: &str) -> Option<String>;
}

impl<F> BrandLookup for F
where
    F: Fn(&str) -> Option<String> + Send + Sync,
{
    fn brand_code(&self, brand: &str) -> Option<String> {
        self(brand)
    }
}

/// 基于内存映射的品牌表
#[derive(Debug, Clone, Default)]
pub struct BrandTable {
    // 品牌名 -> 品牌码
    by_name: FxHashMap<String, String>,
}

impl BrandTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从 (品牌码, 品牌名) 列表构建；同名品牌以先出现的为准
    pub fn from_pairs<I, C, N>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (C, N)>,
        C: Into<String>,
        N: Into<String>,
    {
        let mut table = Self::new();
        for (code, name) in pairs {
            table.insert(code, name);
        }
        table
    }

    pub fn insert(&mut self, code: impl Into<String>, name: impl Into<String>) {
        self.by_name.entry(name.into()).or_insert_with(|| code.into());
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

impl BrandLookup for BrandTable {
    fn brand_code(&self, brand: &str) -> Option<String> {
        self.by_name.get(brand).cloned()
    }
}
