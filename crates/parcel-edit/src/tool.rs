//! 工具定义

use parcel_core::geometry::GeometryKind;
use serde::{Deserialize, Serialize};

/// 当前激活的工具（同一时刻只有一个）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "tool", rename_all = "snake_case")]
pub enum ActiveTool {
    #[default]
    None,
    Draw { kind: GeometryKind },
    Select { multi: bool },
    Modify,
    Split,
    Merge,
}

impl ActiveTool {
    pub fn name(&self) -> &'static str {
        match self {
            ActiveTool::None => "None",
            ActiveTool::Draw { .. } => "Draw",
            ActiveTool::Select { .. } => "Select",
            ActiveTool::Modify => "Modify",
            ActiveTool::Split => "Split",
            ActiveTool::Merge => "Merge",
        }
    }

    /// 是否使用选择交互
    pub fn uses_selection(&self) -> bool {
        matches!(
            self,
            ActiveTool::Select { .. } | ActiveTool::Modify | ActiveTool::Merge
        )
    }
}

/// 工具状态机的可观察状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolState {
    Idle,
    Drawing(GeometryKind),
    Selecting { multi: bool },
    /// 修改工具且恰好选中一个要素
    Modifying,
    Merging,
    /// 分割线绘制中
    SplitPending,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_serde() {
        let tool: ActiveTool =
            serde_json::from_str(r#"{"tool":"draw","kind":"Polygon"}"#).unwrap();
        assert_eq!(
            tool,
            ActiveTool::Draw {
                kind: GeometryKind::Polygon
            }
        );
        let tool: ActiveTool = serde_json::from_str(r#"{"tool":"select","multi":true}"#).unwrap();
        assert!(tool.uses_selection());
        assert_eq!(ActiveTool::default(), ActiveTool::None);
    }
}
