//! 要素捕捉
//!
//! 支持的捕捉类型：
//! - 顶点 (Vertex)
//! - 中点 (Midpoint)
//! - 边 (Edge)：边上最近点
//!
//! 容差内同时有多种候选时，顶点优先于中点，中点优先于边；
//! 同类型取最近的一个。

use crate::feature::{Feature, FeatureHandle};
use crate::math::Point2;
use serde::{Deserialize, Serialize};

/// 捕捉类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SnapType {
    Vertex,
    Midpoint,
    Edge,
}

impl SnapType {
    pub fn name(&self) -> &'static str {
        match self {
            SnapType::Vertex => "顶点",
            SnapType::Midpoint => "中点",
            SnapType::Edge => "边",
        }
    }
}

/// 捕捉点
#[derive(Debug, Clone, PartialEq)]
pub struct SnapPoint {
    pub point: Point2,
    pub snap_type: SnapType,
    pub feature: Option<FeatureHandle>,
    /// 距光标的地图距离
    pub distance: f64,
}

impl SnapPoint {
    pub fn new(point: Point2, snap_type: SnapType, feature: Option<FeatureHandle>, distance: f64) -> Self {
        Self {
            point,
            snap_type,
            feature,
            distance,
        }
    }
}

/// 捕捉掩码
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapMask {
    bits: u8,
}

impl SnapMask {
    pub const VERTEX: u8 = 1 << 0;
    pub const MIDPOINT: u8 = 1 << 1;
    pub const EDGE: u8 = 1 << 2;

    pub const NONE: SnapMask = SnapMask { bits: 0 };
    pub const ALL: SnapMask = SnapMask {
        bits: Self::VERTEX | Self::MIDPOINT | Self::EDGE,
    };

    pub fn new(bits: u8) -> Self {
        Self { bits }
    }

    fn bit(snap_type: SnapType) -> u8 {
        match snap_type {
            SnapType::Vertex => Self::VERTEX,
            SnapType::Midpoint => Self::MIDPOINT,
            SnapType::Edge => Self::EDGE,
        }
    }

    pub fn is_enabled(&self, snap_type: SnapType) -> bool {
        self.bits & Self::bit(snap_type) != 0
    }

    pub fn set(&mut self, snap_type: SnapType, enabled: bool) {
        if enabled {
            self.bits |= Self::bit(snap_type);
        } else {
            self.bits &= !Self::bit(snap_type);
        }
    }
}

impl Default for SnapMask {
    fn default() -> Self {
        Self {
            bits: Self::VERTEX | Self::EDGE,
        }
    }
}

/// 捕捉配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapConfig {
    /// 捕捉容差（地图单位）
    pub tolerance: f64,
    pub enabled_types: SnapMask,
}

impl Default for SnapConfig {
    fn default() -> Self {
        Self {
            tolerance: 1.0,
            enabled_types: SnapMask::default(),
        }
    }
}

/// 捕捉引擎
#[derive(Debug, Clone, Default)]
pub struct SnapEngine {
    config: SnapConfig,
    candidates: Vec<SnapPoint>,
}

impl SnapEngine {
    pub fn new(config: SnapConfig) -> Self {
        Self {
            config,
            candidates: Vec::with_capacity(32),
        }
    }

    pub fn config(&self) -> &SnapConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut SnapConfig {
        &mut self.config
    }

    /// 在候选要素中寻找最佳捕捉点
    pub fn find_snap_point<'a>(
        &mut self,
        cursor: Point2,
        features: impl IntoIterator<Item = &'a Feature>,
    ) -> Option<SnapPoint> {
        self.candidates.clear();
        let tolerance = self.config.tolerance;

        for feature in features {
            self.collect_feature_snap_points(feature, cursor, tolerance);
        }

        self.candidates
            .iter()
            .filter(|c| c.distance <= tolerance)
            .min_by(|a, b| {
                a.snap_type
                    .cmp(&b.snap_type)
                    .then(a.distance.total_cmp(&b.distance))
            })
            .cloned()
    }

    fn collect_feature_snap_points(&mut self, feature: &Feature, cursor: Point2, tolerance: f64) {
        let enabled = self.config.enabled_types;
        let handle = Some(feature.handle);

        for ring in feature.geometry.rings() {
            if enabled.is_enabled(SnapType::Vertex) {
                for v in ring.points {
                    let dist = (v - cursor).norm();
                    if dist <= tolerance {
                        self.candidates
                            .push(SnapPoint::new(*v, SnapType::Vertex, handle, dist));
                    }
                }
            }

            for (_, seg) in ring.segments() {
                if enabled.is_enabled(SnapType::Midpoint) {
                    let mid = seg.midpoint();
                    let dist = (mid - cursor).norm();
                    if dist <= tolerance {
                        self.candidates
                            .push(SnapPoint::new(mid, SnapType::Midpoint, handle, dist));
                    }
                }

                if enabled.is_enabled(SnapType::Edge) {
                    let nearest = seg.nearest_point(&cursor);
                    let dist = (nearest - cursor).norm();
                    if dist <= tolerance {
                        self.candidates
                            .push(SnapPoint::new(nearest, SnapType::Edge, handle, dist));
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::FeatureProperties;
    use crate::geometry::{Geometry, GeometryKind, Polygon};

    fn square() -> Feature {
        Feature::new(
            Geometry::Polygon(Polygon::rectangle(
                Point2::new(0.0, 0.0),
                Point2::new(10.0, 10.0),
            )),
            FeatureProperties::fresh(1, GeometryKind::Polygon),
        )
    }

    #[test]
    fn test_vertex_beats_edge() {
        let feature = square();
        let mut engine = SnapEngine::new(SnapConfig {
            tolerance: 1.0,
            ..Default::default()
        });

        // 边上的点更近，但顶点优先
        let snap = engine
            .find_snap_point(Point2::new(0.6, 0.0), [&feature])
            .unwrap();
        assert_eq!(snap.snap_type, SnapType::Vertex);
        assert_eq!(snap.point, Point2::new(0.0, 0.0));
        assert_eq!(snap.feature, Some(feature.handle));
    }

    #[test]
    fn test_edge_snap() {
        let feature = square();
        let mut engine = SnapEngine::default();
        let snap = engine
            .find_snap_point(Point2::new(5.0, 0.4), [&feature])
            .unwrap();
        assert_eq!(snap.snap_type, SnapType::Edge);
        assert!((snap.point - Point2::new(5.0, 0.0)).norm() < 1e-9);
    }

    #[test]
    fn test_midpoint_when_enabled() {
        let feature = square();
        let mut engine = SnapEngine::new(SnapConfig {
            tolerance: 1.0,
            enabled_types: SnapMask::ALL,
        });
        let snap = engine
            .find_snap_point(Point2::new(5.3, 0.2), [&feature])
            .unwrap();
        assert_eq!(snap.snap_type, SnapType::Midpoint);
        assert_eq!(snap.point, Point2::new(5.0, 0.0));
    }

    #[test]
    fn test_nothing_in_range() {
        let feature = square();
        let mut engine = SnapEngine::default();
        assert!(engine
            .find_snap_point(Point2::new(5.0, 5.0), [&feature])
            .is_none());
    }

    #[test]
    fn test_mask_toggle() {
        let mut mask = SnapMask::NONE;
        assert!(!mask.is_enabled(SnapType::Vertex));
        mask.set(SnapType::Vertex, true);
        assert!(mask.is_enabled(SnapType::Vertex));
        mask.set(SnapType::Vertex, false);
        assert_eq!(mask, SnapMask::NONE);
    }
}
