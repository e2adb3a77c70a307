//! scour - 文档库全文搜索替换引擎库
//!
//! 模块结构：
//! - models: 数据模型（MatchOptions, MatchRecord, ReplacementScope, ReplacementDiff）
//! - services: 服务层（搜索、替换、文档库 Provider、引擎配置）
//!
//! 结果渲染、快捷键、偏好持久化等属于宿主应用，不在本库范围内；
//! 宿主通过 VaultProvider 提供文档的枚举与读写能力

pub mod models;
pub mod services;
