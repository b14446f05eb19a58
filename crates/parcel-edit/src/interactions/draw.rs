//! 绘制行为
//!
//! - 点：单击即完成
//! - 线/面：单击加点，双击或 Enter 完成，Backspace 撤销最后一点
//! - 面：点击起点闭合
//!
//! 点数不足时完成会产出 `DrawAbort`。

use super::{Behavior, BehaviorContext, BehaviorEvent};
use crate::input::{InputEvent, Key};
use crate::map::InteractionKind;
use parcel_core::geometry::{Geometry, GeometryKind, LineString, Polygon};
use parcel_core::math::Point2;

/// 重合点判定距离
const DUPLICATE_DISTANCE: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    /// 等待第一点
    SetFirstPoint,
    /// 等待下一点
    SetNextPoint,
}

#[derive(Debug, Clone)]
pub struct DrawBehavior {
    kind: GeometryKind,
    status: Status,
    vertices: Vec<Point2>,
    /// 最近一次指针位置（已捕捉）
    cursor: Option<Point2>,
}

impl DrawBehavior {
    pub fn new(kind: GeometryKind) -> Self {
        Self {
            kind,
            status: Status::SetFirstPoint,
            vertices: Vec::new(),
            cursor: None,
        }
    }

    pub fn geometry_kind(&self) -> GeometryKind {
        self.kind
    }

    pub fn vertices(&self) -> &[Point2] {
        &self.vertices
    }

    fn min_vertices(&self) -> usize {
        match self.kind {
            GeometryKind::Point => 1,
            GeometryKind::LineString => 2,
            GeometryKind::Polygon | GeometryKind::MultiPolygon => 3,
        }
    }

    /// 当前草图（含光标位置），用于预览
    pub fn sketch(&self) -> Option<Geometry> {
        let mut points = self.vertices.clone();
        if let Some(cursor) = self.cursor {
            points.push(cursor);
        }
        match self.kind {
            GeometryKind::Point => points.first().map(|p| Geometry::Point(*p)),
            _ if points.len() >= 2 => Some(Geometry::LineString(LineString::new(points))),
            _ => None,
        }
    }

    fn build(&self) -> Geometry {
        match self.kind {
            GeometryKind::Point => Geometry::Point(self.vertices[0]),
            GeometryKind::LineString => Geometry::LineString(LineString::new(self.vertices.clone())),
            GeometryKind::Polygon => Geometry::Polygon(Polygon::new(self.vertices.clone())),
            GeometryKind::MultiPolygon => {
                Geometry::MultiPolygon(vec![Polygon::new(self.vertices.clone())])
            }
        }
    }

    fn finish(&mut self) -> Vec<BehaviorEvent> {
        let event = if self.vertices.len() >= self.min_vertices() {
            BehaviorEvent::DrawEnd(self.build())
        } else {
            BehaviorEvent::DrawAbort
        };
        self.reset();
        vec![event]
    }

    fn add_point(&mut self, point: Point2, hit_tolerance: f64) -> Vec<BehaviorEvent> {
        if self.kind == GeometryKind::Point {
            self.vertices.push(point);
            return self.finish();
        }

        // 点击起点闭合
        if self.kind.is_polygonal() && self.vertices.len() >= 3 {
            if let Some(first) = self.vertices.first() {
                if (point - first).norm() <= hit_tolerance {
                    return self.finish();
                }
            }
        }

        if let Some(last) = self.vertices.last() {
            if (point - last).norm() < DUPLICATE_DISTANCE {
                return Vec::new();
            }
        }
        self.vertices.push(point);
        self.status = Status::SetNextPoint;
        Vec::new()
    }

    fn undo(&mut self) {
        self.vertices.pop();
        if self.vertices.is_empty() {
            self.status = Status::SetFirstPoint;
        }
    }
}

impl Behavior for DrawBehavior {
    fn kind(&self) -> InteractionKind {
        InteractionKind::Draw
    }

    fn reset(&mut self) {
        self.status = Status::SetFirstPoint;
        self.vertices.clear();
        self.cursor = None;
    }

    fn handle_input(&mut self, ctx: &mut BehaviorContext<'_>, input: &InputEvent) -> Vec<BehaviorEvent> {
        match *input {
            InputEvent::PointerMove { at } => {
                self.cursor = Some(ctx.snap.snap(ctx.map, at));
                Vec::new()
            }
            InputEvent::Click { at, .. } => {
                let point = ctx.snap.snap(ctx.map, at);
                self.add_point(point, ctx.hit_tolerance)
            }
            InputEvent::DoubleClick { at } => {
                let point = ctx.snap.snap(ctx.map, at);
                let mut events = self.add_point(point, ctx.hit_tolerance);
                if events.is_empty() && self.status == Status::SetNextPoint {
                    events = self.finish();
                }
                events
            }
            InputEvent::Key { key: Key::Enter } if self.status == Status::SetNextPoint => {
                self.finish()
            }
            InputEvent::Key { key: Key::Backspace } => {
                self.undo();
                Vec::new()
            }
            _ => Vec::new(),
        }
    }

    fn prompt(&self) -> &str {
        match (self.kind, self.status) {
            (GeometryKind::Point, _) => "指定点位置:",
            (_, Status::SetFirstPoint) => "指定起点:",
            (GeometryKind::LineString, Status::SetNextPoint) => "指定下一点 或 [完成(Enter)/放弃(Backspace)]:",
            (_, Status::SetNextPoint) => {
                if self.vertices.len() >= 3 {
                    "指定下一点 或 [闭合(点击起点)/完成(Enter)]:"
                } else {
                    "指定下一点 或 [放弃(Backspace)]:"
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::MapView;
    use crate::snapping::SnapController;

    fn run(behavior: &mut DrawBehavior, inputs: &[InputEvent]) -> Vec<BehaviorEvent> {
        let mut map = MapView::default();
        let mut snap = SnapController::default();
        let mut ctx = BehaviorContext {
            map: &mut map,
            snap: &mut snap,
            hit_tolerance: 0.5,
        };
        inputs
            .iter()
            .flat_map(|input| behavior.handle_input(&mut ctx, input))
            .collect()
    }

    #[test]
    fn test_draw_point() {
        let mut draw = DrawBehavior::new(GeometryKind::Point);
        let events = run(&mut draw, &[InputEvent::click(1.0, 2.0)]);
        assert_eq!(
            events,
            vec![BehaviorEvent::DrawEnd(Geometry::Point(Point2::new(1.0, 2.0)))]
        );
    }

    #[test]
    fn test_polygon_closes_on_first_vertex() {
        let mut draw = DrawBehavior::new(GeometryKind::Polygon);
        let events = run(
            &mut draw,
            &[
                InputEvent::click(0.0, 0.0),
                InputEvent::click(10.0, 0.0),
                InputEvent::click(10.0, 10.0),
                InputEvent::click(0.0, 10.0),
                InputEvent::click(0.1, 0.1),
            ],
        );
        assert_eq!(
            events,
            vec![BehaviorEvent::DrawEnd(Geometry::Polygon(Polygon::rectangle(
                Point2::new(0.0, 0.0),
                Point2::new(10.0, 10.0)
            )))]
        );
        assert!(draw.vertices().is_empty());
    }

    #[test]
    fn test_line_double_click_finishes() {
        let mut draw = DrawBehavior::new(GeometryKind::LineString);
        let events = run(
            &mut draw,
            &[
                InputEvent::click(0.0, 0.0),
                InputEvent::DoubleClick {
                    at: Point2::new(5.0, 0.0),
                },
            ],
        );
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], BehaviorEvent::DrawEnd(Geometry::LineString(ls)) if ls.points.len() == 2));
    }

    #[test]
    fn test_too_few_vertices_aborts() {
        let mut draw = DrawBehavior::new(GeometryKind::Polygon);
        let events = run(
            &mut draw,
            &[
                InputEvent::click(0.0, 0.0),
                InputEvent::click(10.0, 0.0),
                InputEvent::key(Key::Enter),
            ],
        );
        assert_eq!(events, vec![BehaviorEvent::DrawAbort]);
    }

    #[test]
    fn test_backspace_undoes_last_vertex() {
        let mut draw = DrawBehavior::new(GeometryKind::LineString);
        run(
            &mut draw,
            &[
                InputEvent::click(0.0, 0.0),
                InputEvent::click(3.0, 0.0),
                InputEvent::key(Key::Backspace),
            ],
        );
        assert_eq!(draw.vertices(), &[Point2::new(0.0, 0.0)]);
        assert_eq!(draw.prompt(), "指定下一点 或 [完成(Enter)/放弃(Backspace)]:");
    }
}
