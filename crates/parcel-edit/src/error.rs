//! 编辑错误定义

use parcel_core::feature::LayerId;
use parcel_core::CoreError;
use parcel_staging::StagingError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EditError {
    #[error("No target layer selected for drawing")]
    NoTargetLayer,

    #[error("Unknown layer: {0}")]
    UnknownLayer(LayerId),

    #[error("Tool not active: {0}")]
    ToolNotActive(&'static str),

    #[error("Nothing selected")]
    NothingSelected,

    #[error("Merge rejected: {0}")]
    MergeRejected(String),

    #[error("Split rejected: {0}")]
    SplitRejected(String),

    #[error("Feature conversion failed: {0}")]
    Conversion(String),

    #[error(transparent)]
    Geometry(#[from] CoreError),

    #[error(transparent)]
    Staging(#[from] StagingError),
}

/// 一次性操作的失败原因
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OneShotError {
    /// 用户按下 Escape 或操作被中止
    #[error("Operation cancelled")]
    Cancelled,

    /// 被新的工具或新的一次性操作取代
    #[error("Operation superseded by another tool")]
    Superseded,

    #[error("Operation failed: {0}")]
    Failed(String),
}
