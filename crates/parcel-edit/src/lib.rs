//! Parcel 交互编辑
//!
//! 在地块图层上绘制、选择、修改、分割、合并和删除要素，
//! 并把每次提交转换为暂存变更：
//! - 工具状态机：同一时刻只有一个工具，切换时先拆后建
//! - 捕捉控制器：单一绑定，换源即重建
//! - 选择跟踪：选择变化广播，清空时额外发出 `Deselected`
//! - 一次性操作：拾取要素、临时画线，结果以 future 交付
//!
//! ```
//! use parcel_edit::prelude::*;
//! use parcel_core::layer::FeatureLayer;
//! use parcel_staging::StagingBuffer;
//!
//! let mut map = MapView::default();
//! map.add_layer(FeatureLayer::new(3, "parcels"));
//! let mut catalog = LayerCatalog::new().with_layer(3, "parcels", Some("#336699"));
//! catalog.set_drawing_layer(Some(3));
//!
//! let mut controller = DrawController::new(
//!     EditorConfig::default(),
//!     map,
//!     StagingBuffer::new(),
//!     NotificationLog::new(),
//!     catalog,
//!     UserSession::default(),
//! );
//! controller
//!     .set_active_tool(ActiveTool::Draw { kind: GeometryKind::Point })
//!     .unwrap();
//! controller.handle_input(&InputEvent::click(1.0, 2.0));
//!
//! assert_eq!(controller.state(), ToolState::Idle);
//! assert_eq!(controller.staging().len(), 1);
//! ```

pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod input;
pub mod interactions;
pub mod map;
pub mod one_shot;
pub mod selection;
pub mod services;
pub mod snapping;
pub mod tool;

pub use controller::{DeleteSummary, DrawController};
pub use error::{EditError, OneShotError};

pub mod prelude {
    //! 常用类型的便捷导入
    pub use crate::config::EditorConfig;
    pub use crate::controller::{DeleteSummary, DrawController};
    pub use crate::error::{EditError, OneShotError};
    pub use crate::events::{EditEvent, EventType, Handler, ListenerTarget};
    pub use crate::input::{InputEvent, Key};
    pub use crate::map::{FeatureRef, InteractionKind, MapView};
    pub use crate::one_shot::OneShot;
    pub use crate::selection::{SelectionInfo, SelectionSet};
    pub use crate::services::{
        LayerCatalog, LayerEntry, LayerRegistry, Notice, NoticeLevel, NotificationLog, Notifier,
        SessionContext, UserSession,
    };
    pub use crate::snapping::{SnapBinding, SnapController};
    pub use crate::tool::{ActiveTool, ToolState};
    pub use parcel_core::geometry::GeometryKind;
}
