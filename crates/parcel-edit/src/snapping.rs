//! 捕捉控制器
//!
//! 地图上始终最多一个捕捉交互，绑定一个图层。捕捉交互无法原地换绑，
//! 更换图层 = 销毁旧交互 + 创建新交互，并恢复原有的开关状态。

use crate::map::{InteractionId, InteractionKind, MapView};
use parcel_core::feature::{FeatureHandle, LayerId};
use parcel_core::math::{BoundingBox2, Point2};
use parcel_core::snap::{SnapConfig, SnapEngine, SnapPoint};

/// 当前捕捉绑定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapBinding {
    pub interaction: InteractionId,
    /// `None` 表示空数据源
    pub source: Option<LayerId>,
}

#[derive(Debug, Clone)]
pub struct SnapController {
    binding: Option<SnapBinding>,
    enabled: bool,
    engine: SnapEngine,
    rebuilds: usize,
}

impl SnapController {
    pub fn new(config: SnapConfig, enabled: bool) -> Self {
        Self {
            binding: None,
            enabled,
            engine: SnapEngine::new(config),
            rebuilds: 0,
        }
    }

    /// 重建绑定
    pub fn set_source(&mut self, map: &mut MapView, source: Option<LayerId>) {
        if let Some(old) = self.binding.take() {
            map.remove_interaction(old.interaction);
        }

        let interaction = map.add_interaction(InteractionKind::Snap, source);
        map.set_interaction_active(interaction, self.enabled);
        self.binding = Some(SnapBinding {
            interaction,
            source,
        });
        self.rebuilds += 1;

        tracing::debug!("Snap bound to {:?}", source);
    }

    /// 开关捕捉，不重建绑定
    pub fn set_enabled(&mut self, map: &mut MapView, enabled: bool) {
        self.enabled = enabled;
        if let Some(binding) = self.binding {
            map.set_interaction_active(binding.interaction, enabled);
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn binding(&self) -> Option<SnapBinding> {
        self.binding
    }

    pub fn source(&self) -> Option<LayerId> {
        self.binding.and_then(|b| b.source)
    }

    /// 绑定重建次数
    pub fn rebuilds(&self) -> usize {
        self.rebuilds
    }

    /// 在绑定图层中寻找捕捉点
    pub fn find(&mut self, map: &MapView, cursor: Point2) -> Option<SnapPoint> {
        self.find_excluding(map, cursor, None)
    }

    /// 寻找捕捉点，跳过指定要素（正在被修改的要素）
    pub fn find_excluding(
        &mut self,
        map: &MapView,
        cursor: Point2,
        exclude: Option<FeatureHandle>,
    ) -> Option<SnapPoint> {
        if !self.enabled {
            return None;
        }
        let layer = map.layer(self.source()?)?;
        let tolerance = self.engine.config().tolerance;
        let candidates = layer
            .features_in_extent(&BoundingBox2::around(&cursor, tolerance))
            .into_iter()
            .filter(|f| Some(f.handle) != exclude);
        self.engine.find_snap_point(cursor, candidates)
    }

    /// 捕捉后的坐标，无捕捉时原样返回
    pub fn snap(&mut self, map: &MapView, cursor: Point2) -> Point2 {
        self.find(map, cursor).map(|s| s.point).unwrap_or(cursor)
    }

    pub fn snap_excluding(&mut self, map: &MapView, cursor: Point2, exclude: FeatureHandle) -> Point2 {
        self.find_excluding(map, cursor, Some(exclude))
            .map(|s| s.point)
            .unwrap_or(cursor)
    }
}

impl Default for SnapController {
    fn default() -> Self {
        Self::new(SnapConfig::default(), true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parcel_core::feature::{Feature, FeatureProperties};
    use parcel_core::geometry::{Geometry, GeometryKind, Polygon};
    use parcel_core::layer::FeatureLayer;

    fn map_with_square(layer_id: LayerId) -> MapView {
        let mut map = MapView::default();
        let mut layer = FeatureLayer::new(layer_id, "parcels");
        layer.add_feature(Feature::new(
            Geometry::Polygon(Polygon::rectangle(
                Point2::new(0.0, 0.0),
                Point2::new(10.0, 10.0),
            )),
            FeatureProperties::fresh(layer_id, GeometryKind::Polygon),
        ));
        map.add_layer(layer);
        map
    }

    #[test]
    fn test_rebind_keeps_single_binding() {
        let mut map = map_with_square(3);
        map.add_layer(FeatureLayer::new(4, "other"));
        let mut snap = SnapController::default();
        snap.set_enabled(&mut map, false);

        for source in [Some(3), None, Some(4), Some(3)] {
            snap.set_source(&mut map, source);
        }

        assert_eq!(map.interaction_count(InteractionKind::Snap), 1);
        assert_eq!(snap.source(), Some(3));
        assert!(!snap.is_enabled());
        assert_eq!(map.active_interaction_count(InteractionKind::Snap), 0);
        assert_eq!(snap.rebuilds(), 4);
    }

    #[test]
    fn test_snap_to_bound_source_only() {
        let mut map = map_with_square(3);
        let mut snap = SnapController::default();

        snap.set_source(&mut map, Some(3));
        assert_eq!(snap.snap(&map, Point2::new(0.3, 0.2)), Point2::new(0.0, 0.0));

        snap.set_source(&mut map, None);
        assert_eq!(snap.snap(&map, Point2::new(0.3, 0.2)), Point2::new(0.3, 0.2));
    }

    #[test]
    fn test_disabled_snap_passes_through() {
        let mut map = map_with_square(3);
        let mut snap = SnapController::default();
        snap.set_source(&mut map, Some(3));
        snap.set_enabled(&mut map, false);
        assert!(snap.find(&map, Point2::new(0.3, 0.2)).is_none());
        assert_eq!(snap.rebuilds(), 1);
    }
}
