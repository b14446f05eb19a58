//! Parcel 变更暂存
//!
//! 支持：
//! - 要素传输记录（GeoJSON 几何 + 扁平属性）
//! - 按要素身份去重的待提交变更缓冲区
//! - 待提交变更的 JSON 持久化

pub mod buffer;
pub mod error;
pub mod persist;
pub mod record;

pub use buffer::{ChangeStaging, StagedChange, StagedEntry, StagingBuffer};
pub use error::StagingError;
pub use record::{FeatureData, FeatureKey, TransportGeometry};
