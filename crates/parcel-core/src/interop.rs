//! 与 `geo` 几何类型的互相转换
//!
//! 布尔运算和量算都交给 `geo`，这里负责把内部表示转换过去再转回来。
//! `geo` 的环会自动闭合（重复首点），转回时去掉重复的闭合点。

use crate::geometry::{Geometry, LineString, Polygon};
use crate::math::{Point2, EPSILON};

fn to_geo_ring(points: &[Point2]) -> geo::LineString<f64> {
    geo::LineString::from(
        points
            .iter()
            .map(|p| geo::Coord { x: p.x, y: p.y })
            .collect::<Vec<_>>(),
    )
}

fn from_geo_ring(ring: &geo::LineString<f64>) -> Vec<Point2> {
    let mut points: Vec<Point2> = ring.coords().map(|c| Point2::new(c.x, c.y)).collect();
    if points.len() > 1 {
        let first = points[0];
        let last = points[points.len() - 1];
        if (first - last).norm() < EPSILON {
            points.pop();
        }
    }
    points
}

pub fn to_geo_polygon(polygon: &Polygon) -> geo::Polygon<f64> {
    geo::Polygon::new(
        to_geo_ring(&polygon.exterior),
        polygon.interiors.iter().map(|r| to_geo_ring(r)).collect(),
    )
}

pub fn from_geo_polygon(polygon: &geo::Polygon<f64>) -> Polygon {
    Polygon::with_interiors(
        from_geo_ring(polygon.exterior()),
        polygon.interiors().iter().map(from_geo_ring).collect(),
    )
}

pub fn from_geo_multi_polygon(multi: &geo::MultiPolygon<f64>) -> Vec<Polygon> {
    multi.0.iter().map(from_geo_polygon).collect()
}

pub fn to_geo_point(point: &Point2) -> geo::Point<f64> {
    geo::Point::new(point.x, point.y)
}

pub fn from_geo_point(point: &geo::Point<f64>) -> Point2 {
    Point2::new(point.x(), point.y())
}

pub fn to_geo_line_string(line: &LineString) -> geo::LineString<f64> {
    to_geo_ring(&line.points)
}

/// 转换为 `geo::Geometry`
pub fn to_geo_geometry(geometry: &Geometry) -> geo::Geometry<f64> {
    match geometry {
        Geometry::Point(p) => geo::Geometry::Point(to_geo_point(p)),
        Geometry::LineString(ls) => geo::Geometry::LineString(to_geo_line_string(ls)),
        Geometry::Polygon(poly) => geo::Geometry::Polygon(to_geo_polygon(poly)),
        Geometry::MultiPolygon(polys) => geo::Geometry::MultiPolygon(geo::MultiPolygon::new(
            polys.iter().map(to_geo_polygon).collect(),
        )),
    }
}
