//! 型号构建工具模块
//! 负责把型号模板中的分组占位符替换为正则捕获值，生成设备型号字符串
//! 支持 \1/\2 或 $1/$2 两种分组引用格式

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::compiler::PatternCaptures;

// 分组占位符：$N 或 \N，N 取完整数字串
static PLACEHOLDER_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"[$\\]([0-9]+)").unwrap());

// 部分厂商在型号后追加的 " TD" 后缀
static TD_SUFFIX_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i) TD$").unwrap());

/// 型号构建工具类
pub struct ModelBuilder;

impl ModelBuilder {
    /// 根据模板和捕获结果构建型号
    ///
    /// # 参数
    /// - `template`: 型号模板，如 `Pixel $1`、`Galaxy \1`
    /// - `captures`: 正则捕获结果，0 号分组为整体匹配，不参与替换；不存在的分组替换为空
    ///
    /// # 返回值
    /// 构建后的型号；结果为 `Build` 时视为无效，返回空串。
    /// 不做首尾空白裁剪，由调用方决定是否 trim
    pub fn build(template: &str, captures: &PatternCaptures) -> String {
        // 单次扫描模板，捕获值原样写入，不会被再次当作占位符处理
        let model = PLACEHOLDER_REGEX.replace_all(template, |placeholder: &Captures| {
            placeholder[1]
                .parse::<usize>()
                .ok()
                .filter(|&index| index > 0)
                .and_then(|index| captures.get(index))
                .unwrap_or("")
                .to_string()
        });

        let model = model.replace('_', " ");
        let model = TD_SUFFIX_REGEX.replace(&model, "");

        if model == "Build" {
            return String::new();
        }
        model.into_owned()
    }
}
