//! 要素图层
//!
//! 一个图层 = 有序的要素集合 + 网格空间索引。点击查询先走索引粗筛，
//! 再用几何做精确命中测试。

use crate::feature::{Feature, FeatureHandle, LayerId};
use crate::math::{BoundingBox2, Point2};
use crate::spatial::SpatialIndex;
use uuid::Uuid;

/// 矢量要素图层
#[derive(Debug, Clone)]
pub struct FeatureLayer {
    id: LayerId,
    name: String,
    /// 按加入顺序保存
    features: Vec<Feature>,
    index: SpatialIndex,
}

impl FeatureLayer {
    pub fn new(id: LayerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            features: Vec::new(),
            index: SpatialIndex::default(),
        }
    }

    pub fn id(&self) -> LayerId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 加入要素，`layer_id` 属性会被改写为本图层
    pub fn add_feature(&mut self, mut feature: Feature) -> FeatureHandle {
        feature.properties.layer_id = self.id;
        let handle = feature.handle;
        self.index.insert(handle, feature.geometry.bounding_box());
        self.features.push(feature);
        handle
    }

    pub fn remove_feature(&mut self, handle: FeatureHandle) -> Option<Feature> {
        let pos = self.features.iter().position(|f| f.handle == handle)?;
        self.index.remove(&handle);
        Some(self.features.remove(pos))
    }

    /// 批量移除，返回实际移除的要素
    pub fn remove_features(&mut self, handles: &[FeatureHandle]) -> Vec<Feature> {
        handles
            .iter()
            .filter_map(|h| self.remove_feature(*h))
            .collect()
    }

    pub fn get(&self, handle: FeatureHandle) -> Option<&Feature> {
        self.features.iter().find(|f| f.handle == handle)
    }

    pub fn contains(&self, handle: FeatureHandle) -> bool {
        self.get(handle).is_some()
    }

    /// 修改要素并刷新索引
    pub fn update_feature<R>(
        &mut self,
        handle: FeatureHandle,
        f: impl FnOnce(&mut Feature) -> R,
    ) -> Option<R> {
        let feature = self.features.iter_mut().find(|feat| feat.handle == handle)?;
        let result = f(feature);
        feature.properties.layer_id = self.id;
        self.index.update(handle, feature.geometry.bounding_box());
        Some(result)
    }

    pub fn find_by_uuid(&self, uuid: Uuid) -> Option<&Feature> {
        self.features.iter().find(|f| f.uuid() == Some(uuid))
    }

    /// 命中指定坐标的要素（按加入顺序）
    pub fn features_at_coordinate(&self, point: &Point2, tolerance: f64) -> Vec<&Feature> {
        let candidates = self.index.query_rect(&BoundingBox2::around(point, tolerance));
        self.features
            .iter()
            .filter(|f| candidates.contains(&f.handle))
            .filter(|f| f.geometry.hit_test(point, tolerance))
            .collect()
    }

    /// 包围盒与范围相交的要素
    pub fn features_in_extent(&self, extent: &BoundingBox2) -> Vec<&Feature> {
        let candidates = self.index.query_rect(extent);
        self.features
            .iter()
            .filter(|f| candidates.contains(&f.handle))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Feature> {
        self.features.iter()
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::FeatureProperties;
    use crate::geometry::{Geometry, GeometryKind, Polygon};

    fn square(x0: f64, y0: f64, size: f64) -> Feature {
        Feature::new(
            Geometry::Polygon(Polygon::rectangle(
                Point2::new(x0, y0),
                Point2::new(x0 + size, y0 + size),
            )),
            FeatureProperties::fresh(0, GeometryKind::Polygon),
        )
    }

    #[test]
    fn test_add_overrides_layer_id() {
        let mut layer = FeatureLayer::new(3, "parcels");
        let handle = layer.add_feature(square(0.0, 0.0, 10.0));
        assert_eq!(layer.get(handle).map(|f| f.layer_id()), Some(3));
        assert_eq!(layer.len(), 1);
    }

    #[test]
    fn test_features_at_coordinate() {
        let mut layer = FeatureLayer::new(1, "parcels");
        let a = layer.add_feature(square(0.0, 0.0, 10.0));
        let b = layer.add_feature(square(20.0, 0.0, 10.0));

        let hits: Vec<_> = layer
            .features_at_coordinate(&Point2::new(5.0, 5.0), 0.5)
            .iter()
            .map(|f| f.handle)
            .collect();
        assert_eq!(hits, vec![a]);

        // 边界附近在容差内也命中
        let hits = layer.features_at_coordinate(&Point2::new(30.3, 5.0), 0.5);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].handle, b);

        assert!(layer.features_at_coordinate(&Point2::new(15.0, 5.0), 0.5).is_empty());
    }

    #[test]
    fn test_update_reindexes() {
        let mut layer = FeatureLayer::new(1, "parcels");
        let handle = layer.add_feature(square(0.0, 0.0, 10.0));

        layer.update_feature(handle, |f| {
            f.geometry = Geometry::Polygon(Polygon::rectangle(
                Point2::new(500.0, 500.0),
                Point2::new(510.0, 510.0),
            ));
        });

        assert!(layer.features_at_coordinate(&Point2::new(5.0, 5.0), 0.1).is_empty());
        assert_eq!(layer.features_at_coordinate(&Point2::new(505.0, 505.0), 0.1).len(), 1);
    }

    #[test]
    fn test_remove_features() {
        let mut layer = FeatureLayer::new(1, "parcels");
        let a = layer.add_feature(square(0.0, 0.0, 10.0));
        let b = layer.add_feature(square(20.0, 0.0, 10.0));
        let removed = layer.remove_features(&[a, b, FeatureHandle::next()]);
        assert_eq!(removed.len(), 2);
        assert!(layer.is_empty());
    }
}
