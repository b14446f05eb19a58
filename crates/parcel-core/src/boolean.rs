//! 面的集合运算
//!
//! - 合并 (union)：成对迭代求并，结果必须是单个连通多边形
//! - 内点 (interior point)：用于行政区归属查询
//! - 分割 (split)：用一条折线把简单多边形切成两块

use crate::error::CoreError;
use crate::geometry::{Geometry, LineString, Polygon, Segment};
use crate::interop::{
    from_geo_point, from_geo_polygon, to_geo_geometry, to_geo_point, to_geo_polygon,
};
use crate::math::{Point2, EPSILON};
use geo::{Area, BooleanOps, Contains, InteriorPoint};

/// 合并策略
///
/// 控制器通过此 trait 调用合并，便于替换实现或统计调用。
pub trait UnionStrategy {
    fn union(&self, polygons: &[Polygon]) -> Result<Polygon, CoreError>;
}

/// 基于 `geo::BooleanOps` 的默认实现
#[derive(Debug, Clone, Copy, Default)]
pub struct GeoUnion;

impl UnionStrategy for GeoUnion {
    fn union(&self, polygons: &[Polygon]) -> Result<Polygon, CoreError> {
        union_polygons(polygons)
    }
}

/// 合并多个多边形
///
/// 不相交的输入会得到多个部件，视为失败。
pub fn union_polygons(polygons: &[Polygon]) -> Result<Polygon, CoreError> {
    if polygons.len() < 2 {
        return Err(CoreError::NotEnoughInputs {
            expected: 2,
            actual: polygons.len(),
        });
    }

    let mut acc = geo::MultiPolygon::new(vec![to_geo_polygon(&polygons[0])]);
    for polygon in &polygons[1..] {
        let next = geo::MultiPolygon::new(vec![to_geo_polygon(polygon)]);
        acc = acc.union(&next);
    }

    match acc.0.len() {
        0 => Err(CoreError::EmptyUnion),
        1 => {
            let merged = &acc.0[0];
            if merged.unsigned_area() <= EPSILON {
                return Err(CoreError::EmptyUnion);
            }
            Ok(from_geo_polygon(merged))
        }
        n => Err(CoreError::DisconnectedUnion(n)),
    }
}

/// 多边形内部一点（保证落在面内，不一定是质心）
pub fn interior_point(polygon: &Polygon) -> Option<Point2> {
    to_geo_polygon(polygon)
        .interior_point()
        .map(|p| from_geo_point(&p))
}

/// 任意几何上的代表点：点取自身，线取线上一点，面取面内一点
pub fn geometry_interior_point(geometry: &Geometry) -> Option<Point2> {
    to_geo_geometry(geometry)
        .interior_point()
        .map(|p| from_geo_point(&p))
}

/// 严格包含（边界上的点不算）
pub fn polygon_contains(polygon: &Polygon, point: &Point2) -> bool {
    to_geo_polygon(polygon).contains(&to_geo_point(point))
}

/// 分割线与外环的一个交点
#[derive(Debug, Clone, Copy)]
struct Crossing {
    point: Point2,
    /// 外环位置：边序号 + 边上参数
    ring_pos: f64,
    /// 分割线位置：线段序号 + 线段上参数
    line_pos: f64,
}

/// 用折线把不带洞的多边形切成两块
///
/// 分割线必须恰好两次穿过外环。
pub fn split_polygon(polygon: &Polygon, line: &LineString) -> Result<(Polygon, Polygon), CoreError> {
    if !polygon.interiors.is_empty() {
        return Err(CoreError::SplitUnsupported(
            "polygons with holes cannot be split".to_string(),
        ));
    }
    if line.points.len() < 2 {
        return Err(CoreError::InvalidGeometry(
            "split line needs at least two points".to_string(),
        ));
    }

    let ring = &polygon.exterior;
    let n = ring.len();
    if n < 3 {
        return Err(CoreError::InvalidGeometry(
            "polygon needs at least three vertices".to_string(),
        ));
    }

    let mut crossings: Vec<Crossing> = Vec::new();
    for (j, cut) in line.segments().enumerate() {
        for i in 0..n {
            let edge = Segment::new(ring[i], ring[(i + 1) % n]);
            if let Some((u, t)) = cut.intersection_params(&edge) {
                let point = cut.start + (cut.end - cut.start) * u;
                // 穿过顶点时两条相邻边会得到同一个交点
                if crossings.iter().any(|c| (c.point - point).norm() < 1e-7) {
                    continue;
                }
                crossings.push(Crossing {
                    point,
                    ring_pos: i as f64 + t,
                    line_pos: j as f64 + u,
                });
            }
        }
    }

    if crossings.len() != 2 {
        return Err(CoreError::SplitCrossings(crossings.len()));
    }

    crossings.sort_by(|a, b| a.line_pos.total_cmp(&b.line_pos));
    let (first, second) = (crossings[0], crossings[1]);

    // 两个交点之间的分割线内部顶点
    let mut cut: Vec<Point2> = line
        .points
        .iter()
        .enumerate()
        .filter(|(k, _)| {
            let k = *k as f64;
            k > first.line_pos + EPSILON && k < second.line_pos - EPSILON
        })
        .map(|(_, p)| *p)
        .collect();

    // 按外环方向排序：a 在前，b 在后；cut 始终从 a 指向 b
    let (a, b) = if first.ring_pos <= second.ring_pos {
        (first, second)
    } else {
        cut.reverse();
        (second, first)
    };

    let ia = a.ring_pos.floor() as usize % n;
    let ib = b.ring_pos.floor() as usize % n;

    // 第一块：a -> 外环 (ia, ib] -> b -> cut 反向
    let mut part1 = vec![a.point];
    if ia != ib {
        part1.extend((ia + 1..=ib).map(|k| ring[k % n]));
    }
    part1.push(b.point);
    part1.extend(cut.iter().rev().copied());

    // 第二块：b -> 外环 (ib, ia] 绕回 -> a -> cut 正向
    let steps = if ia == ib { n } else { (ia + n - ib) % n };
    let mut part2 = vec![b.point];
    part2.extend((1..=steps).map(|k| ring[(ib + k) % n]));
    part2.push(a.point);
    part2.extend(cut.iter().copied());

    let part1 = dedup_ring(part1);
    let part2 = dedup_ring(part2);
    let (p1, p2) = (Polygon::new(part1), Polygon::new(part2));

    for part in [&p1, &p2] {
        if part.distinct_vertex_count() < 3 || to_geo_polygon(part).unsigned_area() <= EPSILON {
            return Err(CoreError::InvalidGeometry(
                "split produced a degenerate part".to_string(),
            ));
        }
    }

    Ok((p1, p2))
}

/// 去掉相邻重复点（含首尾）
fn dedup_ring(mut points: Vec<Point2>) -> Vec<Point2> {
    points.dedup_by(|a, b| (*a - *b).norm() < 1e-7);
    while points.len() > 1 && (points[0] - points[points.len() - 1]).norm() < 1e-7 {
        points.pop();
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Polygon {
        Polygon::rectangle(Point2::new(x0, y0), Point2::new(x1, y1))
    }

    fn planar_area(polygon: &Polygon) -> f64 {
        to_geo_polygon(polygon).unsigned_area()
    }

    #[test]
    fn test_union_touching_squares() {
        let merged = union_polygons(&[rect(0.0, 0.0, 10.0, 10.0), rect(10.0, 0.0, 20.0, 10.0)])
            .expect("touching squares should merge");
        assert!((planar_area(&merged) - 200.0).abs() < 1e-6);
    }

    #[test]
    fn test_union_overlapping() {
        let merged = union_polygons(&[rect(0.0, 0.0, 10.0, 10.0), rect(5.0, 0.0, 15.0, 10.0)])
            .unwrap();
        assert!((planar_area(&merged) - 150.0).abs() < 1e-6);
    }

    #[test]
    fn test_union_disjoint_fails() {
        let result = union_polygons(&[rect(0.0, 0.0, 10.0, 10.0), rect(20.0, 0.0, 30.0, 10.0)]);
        assert_eq!(result, Err(CoreError::DisconnectedUnion(2)));
    }

    #[test]
    fn test_union_needs_two_inputs() {
        let result = union_polygons(&[rect(0.0, 0.0, 1.0, 1.0)]);
        assert!(matches!(result, Err(CoreError::NotEnoughInputs { actual: 1, .. })));
    }

    #[test]
    fn test_interior_point_is_inside() {
        // L 形：质心落在缺口外
        let l_shape = Polygon::new(vec![
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 0.0),
            Point2::new(10.0, 2.0),
            Point2::new(2.0, 2.0),
            Point2::new(2.0, 10.0),
            Point2::new(0.0, 10.0),
        ]);
        let p = interior_point(&l_shape).unwrap();
        assert!(l_shape.contains_point(&p));
    }

    #[test]
    fn test_geometry_interior_point() {
        let point = Geometry::Point(Point2::new(3.0, 4.0));
        assert_eq!(geometry_interior_point(&point), Some(Point2::new(3.0, 4.0)));

        let square = Geometry::Polygon(rect(0.0, 0.0, 10.0, 10.0));
        let p = geometry_interior_point(&square).unwrap();
        assert!(rect(0.0, 0.0, 10.0, 10.0).contains_point(&p));
    }

    #[test]
    fn test_split_square_in_half() {
        let square = rect(0.0, 0.0, 10.0, 10.0);
        let line = LineString::new(vec![Point2::new(5.0, -1.0), Point2::new(5.0, 11.0)]);

        let (a, b) = split_polygon(&square, &line).unwrap();
        assert!((planar_area(&a) - 50.0).abs() < 1e-6);
        assert!((planar_area(&b) - 50.0).abs() < 1e-6);
    }

    #[test]
    fn test_split_with_bent_line() {
        let square = rect(0.0, 0.0, 10.0, 10.0);
        let line = LineString::new(vec![
            Point2::new(-1.0, 5.0),
            Point2::new(5.0, 5.0),
            Point2::new(5.0, 11.0),
        ]);

        let (a, b) = split_polygon(&square, &line).unwrap();
        let (small, large) = if planar_area(&a) < planar_area(&b) { (a, b) } else { (b, a) };
        assert!((planar_area(&small) - 25.0).abs() < 1e-6);
        assert!((planar_area(&large) - 75.0).abs() < 1e-6);
    }

    #[test]
    fn test_split_line_not_crossing() {
        let square = rect(0.0, 0.0, 10.0, 10.0);
        let line = LineString::new(vec![Point2::new(2.0, 2.0), Point2::new(8.0, 8.0)]);
        assert_eq!(split_polygon(&square, &line), Err(CoreError::SplitCrossings(0)));
    }
}
