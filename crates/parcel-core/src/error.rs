//! 核心错误定义

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("Need at least {expected} polygons, got {actual}")]
    NotEnoughInputs { expected: usize, actual: usize },

    #[error("Union produced an empty result")]
    EmptyUnion,

    #[error("Union produced {0} disconnected parts")]
    DisconnectedUnion(usize),

    #[error("Split line must cross the polygon boundary exactly twice, found {0} crossings")]
    SplitCrossings(usize),

    #[error("Split not supported: {0}")]
    SplitUnsupported(String),

    #[error("Invalid color: {0}")]
    InvalidColor(String),

    #[error("Backend id already assigned: {existing}")]
    IdentityLocked { existing: i64 },
}
