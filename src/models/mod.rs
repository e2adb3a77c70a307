//! 数据模型层

pub mod diff;
pub mod options;
pub mod record;
pub mod scope;

pub use diff::ReplacementDiff;
pub use options::MatchOptions;
pub use record::{sort_records, DocumentId, MatchRecord};
pub use scope::{ReplacementScope, SelectionSet};
