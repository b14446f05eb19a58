//! 要素定义
//!
//! 要素 = 几何 + 属性 + 样式。身份由 `{uuid, backend_id}` 组成，
//! `backend_id` 在首次保存后由后端分配，分配后不可再变。

use crate::error::CoreError;
use crate::geometry::{Geometry, GeometryKind};
use crate::style::Style;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// 图层 ID
pub type LayerId = u32;

/// 要素句柄（进程内唯一，用于空间索引和选择集）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FeatureHandle(u64);

impl FeatureHandle {
    /// 分配新句柄
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// 要素属性
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureProperties {
    pub uuid: Option<Uuid>,
    /// 后端 ID，首次保存前为空
    pub backend_id: Option<i64>,
    pub layer_id: LayerId,
    pub area: Option<f64>,
    pub length: Option<f64>,
    /// 所属行政区
    pub gnd_id: Option<String>,
    /// 参考要素（派生来源）
    pub ref_id: Option<String>,
    /// 合并/分割的来源要素
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parent_uuids: Vec<Uuid>,
    pub user_id: Option<i64>,
}

impl FeatureProperties {
    /// 新建要素的属性：生成新 uuid，面积/长度置零占位
    pub fn fresh(layer_id: LayerId, kind: GeometryKind) -> Self {
        Self {
            uuid: Some(Uuid::new_v4()),
            layer_id,
            area: kind.is_polygonal().then_some(0.0),
            length: kind.is_linear().then_some(0.0),
            ..Default::default()
        }
    }

    /// 分配后端 ID。已有不同的 ID 时拒绝
    pub fn assign_backend_id(&mut self, id: i64) -> Result<(), CoreError> {
        match self.backend_id {
            Some(existing) if existing != id => Err(CoreError::IdentityLocked { existing }),
            _ => {
                self.backend_id = Some(id);
                Ok(())
            }
        }
    }

    /// 既无 uuid 也无后端 ID
    pub fn is_anonymous(&self) -> bool {
        self.uuid.is_none() && self.backend_id.is_none()
    }

    /// 对外引用用的标识：优先后端 ID
    pub fn reference_key(&self) -> Option<String> {
        self.backend_id
            .map(|id| id.to_string())
            .or_else(|| self.uuid.map(|u| u.to_string()))
    }
}

/// 要素
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub handle: FeatureHandle,
    /// 地图 ID：`{layer_id}-{uuid}`
    pub map_id: Option<String>,
    pub geometry: Geometry,
    pub properties: FeatureProperties,
    pub style: Option<Style>,
}

impl Feature {
    pub fn new(geometry: Geometry, properties: FeatureProperties) -> Self {
        Self {
            handle: FeatureHandle::next(),
            map_id: None,
            geometry,
            properties,
            style: None,
        }
    }

    pub fn kind(&self) -> GeometryKind {
        self.geometry.kind()
    }

    pub fn layer_id(&self) -> LayerId {
        self.properties.layer_id
    }

    pub fn uuid(&self) -> Option<Uuid> {
        self.properties.uuid
    }

    pub fn backend_id(&self) -> Option<i64> {
        self.properties.backend_id
    }

    /// 按 `{layer_id}-{uuid}` 生成地图 ID
    pub fn assign_map_id(&mut self) {
        let key = self
            .properties
            .uuid
            .map(|u| u.to_string())
            .or_else(|| self.properties.backend_id.map(|id| id.to_string()));
        self.map_id = key.map(|k| format!("{}-{}", self.properties.layer_id, k));
    }

    /// 行政区要素的编码：优先 `gnd_id` 属性，否则用后端 ID
    pub fn boundary_code(&self) -> Option<String> {
        self.properties
            .gnd_id
            .clone()
            .or_else(|| self.properties.backend_id.map(|id| id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Point2;

    #[test]
    fn test_fresh_properties() {
        let props = FeatureProperties::fresh(3, GeometryKind::Polygon);
        assert!(props.uuid.is_some());
        assert_eq!(props.area, Some(0.0));
        assert_eq!(props.length, None);

        let other = FeatureProperties::fresh(3, GeometryKind::Polygon);
        assert_ne!(props.uuid, other.uuid);
    }

    #[test]
    fn test_backend_id_is_immutable() {
        let mut props = FeatureProperties::fresh(1, GeometryKind::Point);
        props.assign_backend_id(42).unwrap();
        props.assign_backend_id(42).unwrap();
        assert_eq!(
            props.assign_backend_id(7),
            Err(CoreError::IdentityLocked { existing: 42 })
        );
        assert_eq!(props.backend_id, Some(42));
    }

    #[test]
    fn test_map_id() {
        let props = FeatureProperties::fresh(3, GeometryKind::Point);
        let uuid = props.uuid.unwrap();
        let mut feature = Feature::new(Geometry::Point(Point2::new(1.0, 2.0)), props);
        feature.assign_map_id();
        assert_eq!(feature.map_id, Some(format!("3-{uuid}")));
    }

    #[test]
    fn test_handles_are_unique() {
        assert_ne!(FeatureHandle::next(), FeatureHandle::next());
    }
}
