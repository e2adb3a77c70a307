//! 替换服务模块
//!
//! - ReplacementEngine: 按范围应用替换模板，产出结构化差异
//! - 模板展开：$&、$1..$99、$$、$`、$' 的显式记号替换
//! - ResultReconciler: 消费差异，增量调和结果列表与选中集

mod engine;
mod reconcile;
mod template;

pub use engine::{ReplaceReport, ReplacementEngine};
pub use reconcile::{remap_selection, NeedsFullRescan, ResultReconciler};
