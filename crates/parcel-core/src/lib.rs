//! Parcel 核心几何
//!
//! 提供地块编辑所需的矢量几何、量算、集合运算、空间索引和捕捉。
//!
//! # 架构设计
//!
//! - `Geometry`: 点 / 线 / 面 / 多面，坐标为视图投影坐标
//! - `Feature`: 几何 + 属性（uuid、后端 ID、行政区、量算值）+ 样式
//! - `FeatureLayer`: 有序要素集合 + 网格空间索引
//!
//! # 示例
//!
//! ```rust
//! use parcel_core::prelude::*;
//!
//! let square = Geometry::Polygon(Polygon::rectangle(
//!     Point2::new(0.0, 0.0),
//!     Point2::new(10.0, 10.0),
//! ));
//! let m = measure(&square, Projection::Planar, 4);
//! assert_eq!(m.area, Some(100.0));
//! ```

pub mod boolean;
pub mod error;
pub mod feature;
pub mod geometry;
pub mod interop;
pub mod layer;
pub mod math;
pub mod measure;
pub mod snap;
pub mod spatial;
pub mod style;

pub use error::CoreError;

pub mod prelude {
    //! 常用类型的便捷导入
    pub use crate::boolean::{
        geometry_interior_point, interior_point, polygon_contains, split_polygon, GeoUnion,
        UnionStrategy,
    };
    pub use crate::error::CoreError;
    pub use crate::feature::{Feature, FeatureHandle, FeatureProperties, LayerId};
    pub use crate::geometry::{Geometry, GeometryKind, LineString, Polygon, Segment, VertexRef};
    pub use crate::layer::FeatureLayer;
    pub use crate::math::{BoundingBox2, Point2, Vector2};
    pub use crate::measure::{area, length, measure, Measurements, Projection};
    pub use crate::snap::{SnapConfig, SnapEngine, SnapMask, SnapPoint, SnapType};
    pub use crate::spatial::SpatialIndex;
    pub use crate::style::{resolve_style, resolve_style_hex, Color, Style};
}
