//! 几何图元定义
//!
//! 支持的图元：
//! - 点 (Point)
//! - 折线 (LineString)
//! - 多边形 (Polygon，可带内环)
//! - 多多边形 (MultiPolygon)
//!
//! 多边形的环不重复首点，闭合关系是隐式的。

use crate::math::{BoundingBox2, Point2, EPSILON};
use serde::{Deserialize, Serialize};

/// 几何类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GeometryKind {
    Point,
    LineString,
    Polygon,
    MultiPolygon,
}

impl GeometryKind {
    pub fn name(&self) -> &'static str {
        match self {
            GeometryKind::Point => "Point",
            GeometryKind::LineString => "LineString",
            GeometryKind::Polygon => "Polygon",
            GeometryKind::MultiPolygon => "MultiPolygon",
        }
    }

    /// 面状几何（计算面积）
    pub fn is_polygonal(&self) -> bool {
        matches!(self, GeometryKind::Polygon | GeometryKind::MultiPolygon)
    }

    /// 线状几何（计算长度）
    pub fn is_linear(&self) -> bool {
        matches!(self, GeometryKind::LineString)
    }
}

/// 线段
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub start: Point2,
    pub end: Point2,
}

impl Segment {
    pub fn new(start: Point2, end: Point2) -> Self {
        Self { start, end }
    }

    pub fn length(&self) -> f64 {
        (self.end - self.start).norm()
    }

    pub fn midpoint(&self) -> Point2 {
        Point2::new(
            (self.start.x + self.end.x) / 2.0,
            (self.start.y + self.end.y) / 2.0,
        )
    }

    /// 线段上离指定点最近的点
    pub fn nearest_point(&self, point: &Point2) -> Point2 {
        let v = self.end - self.start;
        let w = point - self.start;

        let c1 = w.dot(&v);
        if c1 <= 0.0 {
            return self.start;
        }

        let c2 = v.dot(&v);
        if c2 <= c1 {
            return self.end;
        }

        self.start + v * (c1 / c2)
    }

    pub fn distance_to_point(&self, point: &Point2) -> f64 {
        (point - self.nearest_point(point)).norm()
    }

    /// 两线段交点在各自线段上的参数 (t, u)，均在 [0, 1] 内
    pub fn intersection_params(&self, other: &Segment) -> Option<(f64, f64)> {
        let d1 = self.end - self.start;
        let d2 = other.end - other.start;

        let cross = d1.x * d2.y - d1.y * d2.x;
        if cross.abs() < EPSILON {
            return None;
        }

        let d = other.start - self.start;
        let t = (d.x * d2.y - d.y * d2.x) / cross;
        let u = (d.x * d1.y - d.y * d1.x) / cross;

        let range = -EPSILON..=1.0 + EPSILON;
        (range.contains(&t) && range.contains(&u)).then_some((t.clamp(0.0, 1.0), u.clamp(0.0, 1.0)))
    }

    /// 两线段的交点（平行或不相交时返回 None）
    pub fn intersection(&self, other: &Segment) -> Option<Point2> {
        self.intersection_params(other)
            .map(|(t, _)| self.start + (self.end - self.start) * t)
    }
}

/// 折线
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineString {
    pub points: Vec<Point2>,
}

impl LineString {
    pub fn new(points: Vec<Point2>) -> Self {
        Self { points }
    }

    pub fn segments(&self) -> impl Iterator<Item = Segment> + '_ {
        self.points.windows(2).map(|w| Segment::new(w[0], w[1]))
    }

    /// 平面长度
    pub fn length(&self) -> f64 {
        self.segments().map(|s| s.length()).sum()
    }

    pub fn distance_to_point(&self, point: &Point2) -> f64 {
        match self.points.len() {
            0 => f64::MAX,
            1 => (point - self.points[0]).norm(),
            _ => self
                .segments()
                .map(|s| s.distance_to_point(point))
                .fold(f64::MAX, f64::min),
        }
    }

    pub fn bounding_box(&self) -> BoundingBox2 {
        BoundingBox2::from_points(self.points.iter().copied())
    }
}

/// 多边形
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    /// 外环
    pub exterior: Vec<Point2>,
    /// 内环（洞）
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub interiors: Vec<Vec<Point2>>,
}

impl Polygon {
    pub fn new(exterior: Vec<Point2>) -> Self {
        Self {
            exterior,
            interiors: Vec::new(),
        }
    }

    pub fn with_interiors(exterior: Vec<Point2>, interiors: Vec<Vec<Point2>>) -> Self {
        Self {
            exterior,
            interiors,
        }
    }

    /// 轴对齐矩形
    pub fn rectangle(min: Point2, max: Point2) -> Self {
        Self::new(vec![
            Point2::new(min.x, min.y),
            Point2::new(max.x, min.y),
            Point2::new(max.x, max.y),
            Point2::new(min.x, max.y),
        ])
    }

    pub fn rings(&self) -> impl Iterator<Item = &Vec<Point2>> {
        std::iter::once(&self.exterior).chain(self.interiors.iter())
    }

    /// 所有环的边（含闭合边）
    pub fn segments(&self) -> Vec<Segment> {
        self.rings().flat_map(|ring| ring_segments(ring)).collect()
    }

    /// 射线法判断点是否在多边形内部（洞内视为外部）
    pub fn contains_point(&self, point: &Point2) -> bool {
        if !ring_contains(&self.exterior, point) {
            return false;
        }
        !self.interiors.iter().any(|hole| ring_contains(hole, point))
    }

    pub fn distance_to_boundary(&self, point: &Point2) -> f64 {
        self.segments()
            .iter()
            .map(|s| s.distance_to_point(point))
            .fold(f64::MAX, f64::min)
    }

    pub fn bounding_box(&self) -> BoundingBox2 {
        BoundingBox2::from_points(self.exterior.iter().copied())
    }

    /// 去掉重复的首尾点后的外环顶点数
    pub fn distinct_vertex_count(&self) -> usize {
        let mut count = self.exterior.len();
        if count > 1 {
            let first = self.exterior[0];
            let last = self.exterior[count - 1];
            if (first - last).norm() < EPSILON {
                count -= 1;
            }
        }
        count
    }
}

fn ring_segments(ring: &[Point2]) -> Vec<Segment> {
    let n = ring.len();
    if n < 2 {
        return Vec::new();
    }
    (0..n).map(|i| Segment::new(ring[i], ring[(i + 1) % n])).collect()
}

fn ring_contains(ring: &[Point2], point: &Point2) -> bool {
    let n = ring.len();
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (pi, pj) = (ring[i], ring[j]);
        if (pi.y > point.y) != (pj.y > point.y) {
            let x = (pj.x - pi.x) * (point.y - pi.y) / (pj.y - pi.y) + pi.x;
            if point.x < x {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// 顶点定位：部件 / 环 / 序号
///
/// - Point: 全为 0
/// - LineString: part = 0, ring = 0
/// - Polygon: part = 0, ring 0 为外环
/// - MultiPolygon: part 为多边形序号
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexRef {
    pub part: usize,
    pub ring: usize,
    pub index: usize,
}

impl VertexRef {
    pub fn new(part: usize, ring: usize, index: usize) -> Self {
        Self { part, ring, index }
    }
}

/// 环的只读视图
#[derive(Debug, Clone, Copy)]
pub struct RingView<'a> {
    pub part: usize,
    pub ring: usize,
    pub points: &'a [Point2],
    pub closed: bool,
}

impl RingView<'_> {
    /// 环上的边，附带起点序号
    pub fn segments(&self) -> Vec<(usize, Segment)> {
        let n = self.points.len();
        if n < 2 {
            return Vec::new();
        }
        let count = if self.closed { n } else { n - 1 };
        (0..count)
            .map(|i| (i, Segment::new(self.points[i], self.points[(i + 1) % n])))
            .collect()
    }
}

/// 几何
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Geometry {
    Point(Point2),
    LineString(LineString),
    Polygon(Polygon),
    MultiPolygon(Vec<Polygon>),
}

impl Geometry {
    pub fn kind(&self) -> GeometryKind {
        match self {
            Geometry::Point(_) => GeometryKind::Point,
            Geometry::LineString(_) => GeometryKind::LineString,
            Geometry::Polygon(_) => GeometryKind::Polygon,
            Geometry::MultiPolygon(_) => GeometryKind::MultiPolygon,
        }
    }

    pub fn bounding_box(&self) -> BoundingBox2 {
        match self {
            Geometry::Point(p) => BoundingBox2::new(*p, *p),
            Geometry::LineString(ls) => ls.bounding_box(),
            Geometry::Polygon(poly) => poly.bounding_box(),
            Geometry::MultiPolygon(polys) => {
                BoundingBox2::from_points(polys.iter().flat_map(|p| p.exterior.iter().copied()))
            }
        }
    }

    pub fn as_polygon(&self) -> Option<&Polygon> {
        match self {
            Geometry::Polygon(poly) => Some(poly),
            _ => None,
        }
    }

    /// 所有环（只读）
    pub fn rings(&self) -> Vec<RingView<'_>> {
        match self {
            Geometry::Point(p) => vec![RingView {
                part: 0,
                ring: 0,
                points: std::slice::from_ref(p),
                closed: false,
            }],
            Geometry::LineString(ls) => vec![RingView {
                part: 0,
                ring: 0,
                points: &ls.points,
                closed: false,
            }],
            Geometry::Polygon(poly) => polygon_rings(0, poly),
            Geometry::MultiPolygon(polys) => polys
                .iter()
                .enumerate()
                .flat_map(|(part, poly)| polygon_rings(part, poly))
                .collect(),
        }
    }

    fn ring_mut(&mut self, part: usize, ring: usize) -> Option<&mut Vec<Point2>> {
        let poly = match self {
            Geometry::Point(_) => return None,
            Geometry::LineString(ls) => {
                return (part == 0 && ring == 0).then_some(&mut ls.points);
            }
            Geometry::Polygon(poly) if part == 0 => poly,
            Geometry::Polygon(_) => return None,
            Geometry::MultiPolygon(polys) => polys.get_mut(part)?,
        };
        if ring == 0 {
            Some(&mut poly.exterior)
        } else {
            poly.interiors.get_mut(ring - 1)
        }
    }

    pub fn vertices(&self) -> Vec<Point2> {
        self.rings()
            .iter()
            .flat_map(|r| r.points.iter().copied())
            .collect()
    }

    pub fn vertex(&self, at: VertexRef) -> Option<Point2> {
        if let Geometry::Point(p) = self {
            return (at == VertexRef::new(0, 0, 0)).then_some(*p);
        }
        self.rings()
            .into_iter()
            .find(|r| r.part == at.part && r.ring == at.ring)
            .and_then(|r| r.points.get(at.index).copied())
    }

    /// 移动一个顶点，返回是否成功
    pub fn set_vertex(&mut self, at: VertexRef, point: Point2) -> bool {
        if let Geometry::Point(p) = self {
            if at == VertexRef::new(0, 0, 0) {
                *p = point;
                return true;
            }
            return false;
        }
        match self.ring_mut(at.part, at.ring).and_then(|r| r.get_mut(at.index)) {
            Some(v) => {
                *v = point;
                true
            }
            None => false,
        }
    }

    /// 在 `after` 之后插入顶点，返回新顶点的位置
    pub fn insert_vertex(&mut self, after: VertexRef, point: Point2) -> Option<VertexRef> {
        let ring = self.ring_mut(after.part, after.ring)?;
        if after.index >= ring.len() {
            return None;
        }
        ring.insert(after.index + 1, point);
        Some(VertexRef::new(after.part, after.ring, after.index + 1))
    }

    /// 离指定点最近的顶点
    pub fn nearest_vertex(&self, point: &Point2) -> Option<(VertexRef, f64)> {
        self.rings()
            .iter()
            .flat_map(|r| {
                r.points.iter().enumerate().map(move |(i, v)| {
                    (VertexRef::new(r.part, r.ring, i), (point - v).norm())
                })
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }

    /// 离指定点最近的边，返回边起点、边上最近点和距离
    pub fn nearest_edge(&self, point: &Point2) -> Option<(VertexRef, Point2, f64)> {
        self.rings()
            .iter()
            .flat_map(|r| {
                r.segments().into_iter().map(move |(i, seg)| {
                    let nearest = seg.nearest_point(point);
                    (VertexRef::new(r.part, r.ring, i), nearest, (point - nearest).norm())
                })
            })
            .min_by(|a, b| a.2.total_cmp(&b.2))
    }

    /// 点击测试：面内部或距边界 `tolerance` 以内均算命中
    pub fn hit_test(&self, point: &Point2, tolerance: f64) -> bool {
        match self {
            Geometry::Point(p) => (p - point).norm() <= tolerance,
            Geometry::LineString(ls) => ls.distance_to_point(point) <= tolerance,
            Geometry::Polygon(poly) => {
                poly.contains_point(point) || poly.distance_to_boundary(point) <= tolerance
            }
            Geometry::MultiPolygon(polys) => polys.iter().any(|poly| {
                poly.contains_point(point) || poly.distance_to_boundary(point) <= tolerance
            }),
        }
    }

    /// 结构是否完整：坐标有限，折线至少 2 点，多边形外环至少 3 个不同顶点
    pub fn is_valid(&self) -> bool {
        let finite = self
            .vertices()
            .iter()
            .all(|p| p.x.is_finite() && p.y.is_finite());
        if !finite {
            return false;
        }
        match self {
            Geometry::Point(_) => true,
            Geometry::LineString(ls) => ls.points.len() >= 2,
            Geometry::Polygon(poly) => poly.distinct_vertex_count() >= 3,
            Geometry::MultiPolygon(polys) => {
                !polys.is_empty() && polys.iter().all(|p| p.distinct_vertex_count() >= 3)
            }
        }
    }
}

fn polygon_rings(part: usize, poly: &Polygon) -> Vec<RingView<'_>> {
    poly.rings()
        .enumerate()
        .map(|(ring, points)| RingView {
            part,
            ring,
            points,
            closed: true,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Polygon {
        Polygon::rectangle(Point2::new(0.0, 0.0), Point2::new(10.0, 10.0))
    }

    #[test]
    fn test_polygon_contains_point() {
        let mut poly = square();
        assert!(poly.contains_point(&Point2::new(5.0, 5.0)));
        assert!(!poly.contains_point(&Point2::new(15.0, 5.0)));

        poly.interiors
            .push(Polygon::rectangle(Point2::new(4.0, 4.0), Point2::new(6.0, 6.0)).exterior);
        assert!(!poly.contains_point(&Point2::new(5.0, 5.0)));
        assert!(poly.contains_point(&Point2::new(2.0, 2.0)));
    }

    #[test]
    fn test_segment_intersection() {
        let a = Segment::new(Point2::new(0.0, 0.0), Point2::new(10.0, 10.0));
        let b = Segment::new(Point2::new(0.0, 10.0), Point2::new(10.0, 0.0));
        let p = a.intersection(&b).unwrap();
        assert!((p.x - 5.0).abs() < EPSILON);
        assert!((p.y - 5.0).abs() < EPSILON);

        let c = Segment::new(Point2::new(20.0, 0.0), Point2::new(30.0, 0.0));
        assert!(a.intersection(&c).is_none());
    }

    #[test]
    fn test_nearest_vertex_and_edge() {
        let geom = Geometry::Polygon(square());

        let (v, d) = geom.nearest_vertex(&Point2::new(9.0, 9.5)).unwrap();
        assert_eq!(v, VertexRef::new(0, 0, 2));
        assert!(d < 1.2);

        // 闭合边 (0,10)-(0,0)
        let (edge, nearest, d) = geom.nearest_edge(&Point2::new(-1.0, 5.0)).unwrap();
        assert_eq!(edge, VertexRef::new(0, 0, 3));
        assert!((nearest.y - 5.0).abs() < EPSILON);
        assert!((d - 1.0).abs() < EPSILON);
    }

    #[test]
    fn test_set_and_insert_vertex() {
        let mut geom = Geometry::Polygon(square());
        assert!(geom.set_vertex(VertexRef::new(0, 0, 2), Point2::new(12.0, 12.0)));
        assert_eq!(geom.vertex(VertexRef::new(0, 0, 2)), Some(Point2::new(12.0, 12.0)));

        let inserted = geom
            .insert_vertex(VertexRef::new(0, 0, 0), Point2::new(5.0, -1.0))
            .unwrap();
        assert_eq!(inserted, VertexRef::new(0, 0, 1));
        assert_eq!(geom.vertices().len(), 5);

        assert!(!geom.set_vertex(VertexRef::new(1, 0, 0), Point2::origin()));
    }

    #[test]
    fn test_validity() {
        assert!(Geometry::Polygon(square()).is_valid());

        let degenerate = Polygon::new(vec![Point2::new(0.0, 0.0), Point2::new(1.0, 0.0)]);
        assert!(!Geometry::Polygon(degenerate).is_valid());

        let line = LineString::new(vec![Point2::new(0.0, 0.0)]);
        assert!(!Geometry::LineString(line).is_valid());

        assert!(!Geometry::Point(Point2::new(f64::NAN, 0.0)).is_valid());
    }

    #[test]
    fn test_hit_test() {
        let geom = Geometry::LineString(LineString::new(vec![
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 0.0),
        ]));
        assert!(geom.hit_test(&Point2::new(5.0, 0.5), 1.0));
        assert!(!geom.hit_test(&Point2::new(5.0, 2.0), 1.0));
    }
}
