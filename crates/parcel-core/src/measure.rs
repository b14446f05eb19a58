//! 面积与长度量算
//!
//! 量算总是针对视图投影进行：
//! - `Planar`：投影坐标本身就是米（国家格网等），直接做平面量算
//! - `WebMercator`：先反算经纬度，再做椭球面测地线量算

use crate::geometry::Geometry;
use crate::interop;
use crate::math::{round_to, Point2};
use geo::{Area, EuclideanLength, GeodesicArea, GeodesicLength, MapCoords};
use serde::{Deserialize, Serialize};

/// Web 墨卡托球体半径
const WEB_MERCATOR_RADIUS: f64 = 6_378_137.0;

/// 视图投影
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Projection {
    /// 平面米制投影
    #[default]
    Planar,
    /// EPSG:3857
    WebMercator,
}

impl Projection {
    /// 投影坐标 -> 经纬度（仅 WebMercator 有意义，Planar 原样返回）
    pub fn to_lon_lat(&self, point: &Point2) -> Point2 {
        match self {
            Projection::Planar => *point,
            Projection::WebMercator => {
                let lon = (point.x / WEB_MERCATOR_RADIUS).to_degrees();
                let lat = (2.0 * (point.y / WEB_MERCATOR_RADIUS).exp().atan()
                    - std::f64::consts::FRAC_PI_2)
                    .to_degrees();
                Point2::new(lon, lat)
            }
        }
    }

    /// 经纬度 -> 投影坐标
    pub fn from_lon_lat(&self, lon_lat: &Point2) -> Point2 {
        match self {
            Projection::Planar => *lon_lat,
            Projection::WebMercator => {
                let x = lon_lat.x.to_radians() * WEB_MERCATOR_RADIUS;
                let y = (std::f64::consts::FRAC_PI_4 + lon_lat.y.to_radians() / 2.0)
                    .tan()
                    .ln()
                    * WEB_MERCATOR_RADIUS;
                Point2::new(x, y)
            }
        }
    }
}

/// 面积（平方米）。非面状几何返回 0
pub fn area(geometry: &Geometry, projection: Projection) -> f64 {
    if !geometry.kind().is_polygonal() {
        return 0.0;
    }
    let geo_geom = interop::to_geo_geometry(geometry);
    match projection {
        Projection::Planar => geo_geom.unsigned_area(),
        Projection::WebMercator => {
            let lon_lat = geo_geom.map_coords(|c| {
                let p = projection.to_lon_lat(&Point2::new(c.x, c.y));
                geo::Coord { x: p.x, y: p.y }
            });
            match lon_lat {
                geo::Geometry::Polygon(poly) => poly.geodesic_area_unsigned(),
                geo::Geometry::MultiPolygon(multi) => multi.geodesic_area_unsigned(),
                _ => 0.0,
            }
        }
    }
}

/// 长度（米）。只对折线有意义，其它几何返回 0
pub fn length(geometry: &Geometry, projection: Projection) -> f64 {
    let Geometry::LineString(line) = geometry else {
        return 0.0;
    };
    let geo_line = interop::to_geo_line_string(line);
    match projection {
        Projection::Planar => geo_line.euclidean_length(),
        Projection::WebMercator => geo_line
            .map_coords(|c| {
                let p = projection.to_lon_lat(&Point2::new(c.x, c.y));
                geo::Coord { x: p.x, y: p.y }
            })
            .geodesic_length(),
    }
}

/// 派生量算值
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Measurements {
    pub area: Option<f64>,
    pub length: Option<f64>,
}

/// 按几何类型计算面积或长度，并四舍五入到 `decimals` 位
pub fn measure(geometry: &Geometry, projection: Projection, decimals: u32) -> Measurements {
    let kind = geometry.kind();
    Measurements {
        area: kind
            .is_polygonal()
            .then(|| round_to(area(geometry, projection), decimals)),
        length: kind
            .is_linear()
            .then(|| round_to(length(geometry, projection), decimals)),
    }
}
