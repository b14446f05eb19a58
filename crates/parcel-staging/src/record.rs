//! 传输记录
//!
//! 与后端交换的要素格式：GeoJSON 形式的几何 + 扁平属性。
//! 面的环在传输格式中首尾闭合，内存模型中不重复闭合点。

use crate::error::StagingError;
use parcel_core::feature::{Feature, FeatureProperties, LayerId};
use parcel_core::geometry::{Geometry, LineString, Polygon};
use parcel_core::math::Point2;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

type Position = [f64; 2];

/// GeoJSON 几何
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum TransportGeometry {
    Point(Position),
    LineString(Vec<Position>),
    Polygon(Vec<Vec<Position>>),
    MultiPolygon(Vec<Vec<Vec<Position>>>),
}

fn position(p: &Point2) -> Position {
    [p.x, p.y]
}

fn point(pos: &Position) -> Point2 {
    Point2::new(pos[0], pos[1])
}

fn closed_ring(ring: &[Point2]) -> Vec<Position> {
    let mut out: Vec<Position> = ring.iter().map(position).collect();
    if let Some(first) = out.first().copied() {
        out.push(first);
    }
    out
}

fn open_ring(ring: &[Position]) -> Vec<Point2> {
    let mut out: Vec<Point2> = ring.iter().map(point).collect();
    if out.len() > 1 && out.first() == out.last() {
        out.pop();
    }
    out
}

fn polygon_rings(polygon: &Polygon) -> Vec<Vec<Position>> {
    polygon.rings().map(|r| closed_ring(r)).collect()
}

fn polygon_from_rings(rings: &[Vec<Position>]) -> Result<Polygon, StagingError> {
    let (exterior, interiors) = rings
        .split_first()
        .ok_or_else(|| StagingError::Conversion("polygon without rings".to_string()))?;
    Ok(Polygon::with_interiors(
        open_ring(exterior),
        interiors.iter().map(|r| open_ring(r)).collect(),
    ))
}

impl TransportGeometry {
    /// 结构无效的几何返回 `None`
    pub fn from_geometry(geometry: &Geometry) -> Option<Self> {
        if !geometry.is_valid() {
            return None;
        }
        Some(match geometry {
            Geometry::Point(p) => TransportGeometry::Point(position(p)),
            Geometry::LineString(ls) => {
                TransportGeometry::LineString(ls.points.iter().map(position).collect())
            }
            Geometry::Polygon(poly) => TransportGeometry::Polygon(polygon_rings(poly)),
            Geometry::MultiPolygon(polys) => {
                TransportGeometry::MultiPolygon(polys.iter().map(polygon_rings).collect())
            }
        })
    }

    pub fn to_geometry(&self) -> Result<Geometry, StagingError> {
        let geometry = match self {
            TransportGeometry::Point(pos) => Geometry::Point(point(pos)),
            TransportGeometry::LineString(points) => {
                Geometry::LineString(LineString::new(points.iter().map(point).collect()))
            }
            TransportGeometry::Polygon(rings) => Geometry::Polygon(polygon_from_rings(rings)?),
            TransportGeometry::MultiPolygon(polys) => Geometry::MultiPolygon(
                polys
                    .iter()
                    .map(|rings| polygon_from_rings(rings))
                    .collect::<Result<_, _>>()?,
            ),
        };
        if !geometry.is_valid() {
            return Err(StagingError::Conversion(format!(
                "invalid {} geometry",
                geometry.kind().name()
            )));
        }
        Ok(geometry)
    }
}

/// 暂存条目的键：优先 uuid，其次后端 ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum FeatureKey {
    Uuid(Uuid),
    Id(i64),
}

impl std::fmt::Display for FeatureKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeatureKey::Uuid(uuid) => write!(f, "{uuid}"),
            FeatureKey::Id(id) => write!(f, "#{id}"),
        }
    }
}

/// 要素传输记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureData {
    /// 后端 ID
    pub id: Option<i64>,
    pub uuid: Option<Uuid>,
    pub layer_id: LayerId,
    pub geometry: TransportGeometry,
    pub area: Option<f64>,
    pub length: Option<f64>,
    pub gnd_id: Option<String>,
    pub ref_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parent_uuids: Vec<Uuid>,
    pub user_id: Option<i64>,
}

impl FeatureData {
    /// 从地图要素转换；几何无效时返回 `None`
    pub fn from_feature(feature: &Feature) -> Option<Self> {
        let geometry = TransportGeometry::from_geometry(&feature.geometry)?;
        let props = &feature.properties;
        Some(Self {
            id: props.backend_id,
            uuid: props.uuid,
            layer_id: props.layer_id,
            geometry,
            area: props.area,
            length: props.length,
            gnd_id: props.gnd_id.clone(),
            ref_id: props.ref_id.clone(),
            parent_uuids: props.parent_uuids.clone(),
            user_id: props.user_id,
        })
    }

    /// 还原为地图要素（分配新的句柄）
    pub fn to_feature(&self) -> Result<Feature, StagingError> {
        let geometry = self.geometry.to_geometry()?;
        let properties = FeatureProperties {
            uuid: self.uuid,
            backend_id: self.id,
            layer_id: self.layer_id,
            area: self.area,
            length: self.length,
            gnd_id: self.gnd_id.clone(),
            ref_id: self.ref_id.clone(),
            parent_uuids: self.parent_uuids.clone(),
            user_id: self.user_id,
        };
        let mut feature = Feature::new(geometry, properties);
        feature.assign_map_id();
        Ok(feature)
    }

    pub fn key(&self) -> Option<FeatureKey> {
        self.uuid
            .map(FeatureKey::Uuid)
            .or(self.id.map(FeatureKey::Id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parcel_core::geometry::GeometryKind;

    fn square_feature() -> Feature {
        let mut props = FeatureProperties::fresh(3, GeometryKind::Polygon);
        props.gnd_id = Some("GND-042".to_string());
        Feature::new(
            Geometry::Polygon(Polygon::rectangle(
                Point2::new(0.0, 0.0),
                Point2::new(10.0, 10.0),
            )),
            props,
        )
    }

    #[test]
    fn test_polygon_rings_are_closed_on_the_wire() {
        let data = FeatureData::from_feature(&square_feature()).unwrap();
        let TransportGeometry::Polygon(rings) = &data.geometry else {
            panic!("expected polygon");
        };
        assert_eq!(rings[0].len(), 5);
        assert_eq!(rings[0].first(), rings[0].last());
    }

    #[test]
    fn test_json_shape() {
        let data = FeatureData::from_feature(&square_feature()).unwrap();
        let json = serde_json::to_value(&data).unwrap();

        assert_eq!(json["geometry"]["type"], "Polygon");
        assert_eq!(json["layerId"], 3);
        assert_eq!(json["gndId"], "GND-042");
        assert!(json["geometry"]["coordinates"][0].is_array());
        assert!(json.get("parentUuids").is_none());
    }

    #[test]
    fn test_back_to_feature_strips_closing_point() {
        let original = square_feature();
        let data = FeatureData::from_feature(&original).unwrap();
        let restored = data.to_feature().unwrap();

        assert_eq!(restored.geometry, original.geometry);
        assert_eq!(restored.uuid(), original.uuid());
        assert_ne!(restored.handle, original.handle);
        assert!(restored.map_id.is_some());
    }

    #[test]
    fn test_invalid_geometry_is_not_converted() {
        let feature = Feature::new(
            Geometry::LineString(LineString::new(vec![Point2::new(0.0, 0.0)])),
            FeatureProperties::fresh(1, GeometryKind::LineString),
        );
        assert!(FeatureData::from_feature(&feature).is_none());

        let degenerate = TransportGeometry::Polygon(vec![vec![[0.0, 0.0], [1.0, 1.0], [0.0, 0.0]]]);
        assert!(matches!(
            degenerate.to_geometry(),
            Err(StagingError::Conversion(_))
        ));
    }

    #[test]
    fn test_key_prefers_uuid() {
        let mut data = FeatureData::from_feature(&square_feature()).unwrap();
        let uuid = data.uuid.unwrap();
        data.id = Some(7);
        assert_eq!(data.key(), Some(FeatureKey::Uuid(uuid)));
        data.uuid = None;
        assert_eq!(data.key(), Some(FeatureKey::Id(7)));
        data.id = None;
        assert_eq!(data.key(), None);
    }
}
