//! 顶点修改行为
//!
//! 针对唯一选中的要素：按下时抓取最近的顶点（或在最近的边上插入新顶点），
//! 拖动时移动该顶点，松开时结束。

use super::{Behavior, BehaviorContext, BehaviorEvent};
use crate::input::InputEvent;
use crate::map::{FeatureRef, InteractionKind};
use parcel_core::geometry::VertexRef;
use parcel_core::math::Point2;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Grab {
    Vertex(VertexRef),
    /// 在 `after` 之后插入新顶点
    Edge { after: VertexRef },
}

#[derive(Debug, Clone, Copy)]
struct Drag {
    target: FeatureRef,
    grab: Grab,
    changed: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ModifyBehavior {
    target: Option<FeatureRef>,
    drag: Option<Drag>,
}

impl ModifyBehavior {
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置修改目标，会丢弃进行中的拖动
    pub fn set_target(&mut self, target: Option<FeatureRef>) {
        self.target = target;
        self.drag = None;
    }

    pub fn target(&self) -> Option<FeatureRef> {
        self.target
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// 放弃进行中的拖动，返回被拖动的要素（几何可能已改动）
    pub fn cancel_drag(&mut self) -> Option<FeatureRef> {
        self.drag.take().map(|drag| drag.target)
    }

    fn grab(&self, ctx: &BehaviorContext<'_>, target: FeatureRef, at: &Point2) -> Option<Grab> {
        let geometry = &ctx.map.feature(target)?.geometry;
        if let Some((vertex, dist)) = geometry.nearest_vertex(at) {
            if dist <= ctx.hit_tolerance {
                return Some(Grab::Vertex(vertex));
            }
        }
        match geometry.nearest_edge(at) {
            Some((after, _, dist)) if dist <= ctx.hit_tolerance => Some(Grab::Edge { after }),
            _ => None,
        }
    }

    fn move_to(&mut self, ctx: &mut BehaviorContext<'_>, at: Point2) {
        let Some(drag) = self.drag.as_mut() else {
            return;
        };
        let point = ctx.snap.snap_excluding(ctx.map, at, drag.target.handle);

        let moved = ctx.map.update_feature(drag.target, |feature| match drag.grab {
            Grab::Vertex(vertex) if feature.geometry.vertex(vertex) == Some(point) => None,
            Grab::Vertex(vertex) => feature.geometry.set_vertex(vertex, point).then_some(vertex),
            Grab::Edge { after } => feature.geometry.insert_vertex(after, point),
        });

        if let Some(Some(vertex)) = moved {
            drag.grab = Grab::Vertex(vertex);
            drag.changed = true;
        }
    }
}

impl Behavior for ModifyBehavior {
    fn kind(&self) -> InteractionKind {
        InteractionKind::Modify
    }

    fn reset(&mut self) {
        self.target = None;
        self.drag = None;
    }

    fn handle_input(&mut self, ctx: &mut BehaviorContext<'_>, input: &InputEvent) -> Vec<BehaviorEvent> {
        match *input {
            InputEvent::PointerDown { at } => {
                let Some(target) = self.target else {
                    return Vec::new();
                };
                match self.grab(ctx, target, &at) {
                    Some(grab) => {
                        self.drag = Some(Drag {
                            target,
                            grab,
                            changed: false,
                        });
                        vec![BehaviorEvent::ModifyStart(vec![target])]
                    }
                    None => Vec::new(),
                }
            }
            InputEvent::PointerMove { at } => {
                self.move_to(ctx, at);
                Vec::new()
            }
            InputEvent::PointerUp { at } => {
                self.move_to(ctx, at);
                match self.drag.take() {
                    Some(drag) if drag.changed => vec![BehaviorEvent::ModifyEnd(vec![drag.target])],
                    Some(_) => vec![BehaviorEvent::ModifyEnd(Vec::new())],
                    None => Vec::new(),
                }
            }
            _ => Vec::new(),
        }
    }

    fn prompt(&self) -> &str {
        if self.drag.is_some() {
            "拖动顶点:"
        } else {
            "按住顶点或边拖动:"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::MapView;
    use crate::snapping::SnapController;
    use parcel_core::feature::{Feature, FeatureProperties};
    use parcel_core::geometry::{Geometry, GeometryKind, Polygon};
    use parcel_core::layer::FeatureLayer;

    fn setup() -> (MapView, FeatureRef) {
        let mut map = MapView::default();
        let mut layer = FeatureLayer::new(3, "parcels");
        let handle = layer.add_feature(Feature::new(
            Geometry::Polygon(Polygon::rectangle(
                Point2::new(0.0, 0.0),
                Point2::new(10.0, 10.0),
            )),
            FeatureProperties::fresh(3, GeometryKind::Polygon),
        ));
        map.add_layer(layer);
        (map, FeatureRef::new(3, handle))
    }

    fn drive(map: &mut MapView, modify: &mut ModifyBehavior, inputs: &[InputEvent]) -> Vec<BehaviorEvent> {
        let mut snap = SnapController::default();
        let mut ctx = BehaviorContext {
            map,
            snap: &mut snap,
            hit_tolerance: 0.5,
        };
        inputs
            .iter()
            .flat_map(|input| modify.handle_input(&mut ctx, input))
            .collect()
    }

    #[test]
    fn test_drag_vertex() {
        let (mut map, target) = setup();
        let mut modify = ModifyBehavior::new();
        modify.set_target(Some(target));

        let events = drive(
            &mut map,
            &mut modify,
            &[
                InputEvent::PointerDown {
                    at: Point2::new(10.2, 10.1),
                },
                InputEvent::PointerMove {
                    at: Point2::new(12.0, 12.0),
                },
                InputEvent::PointerUp {
                    at: Point2::new(15.0, 15.0),
                },
            ],
        );

        assert_eq!(
            events,
            vec![
                BehaviorEvent::ModifyStart(vec![target]),
                BehaviorEvent::ModifyEnd(vec![target]),
            ]
        );
        let geometry = &map.feature(target).unwrap().geometry;
        assert_eq!(geometry.vertex(VertexRef::new(0, 0, 2)), Some(Point2::new(15.0, 15.0)));
    }

    #[test]
    fn test_drag_edge_inserts_vertex() {
        let (mut map, target) = setup();
        let mut modify = ModifyBehavior::new();
        modify.set_target(Some(target));

        drive(
            &mut map,
            &mut modify,
            &[
                InputEvent::PointerDown {
                    at: Point2::new(5.0, 0.2),
                },
                InputEvent::PointerUp {
                    at: Point2::new(5.0, -3.0),
                },
            ],
        );

        let geometry = &map.feature(target).unwrap().geometry;
        assert_eq!(geometry.vertices().len(), 5);
        assert_eq!(geometry.vertex(VertexRef::new(0, 0, 1)), Some(Point2::new(5.0, -3.0)));
    }

    #[test]
    fn test_press_away_from_geometry_does_nothing() {
        let (mut map, target) = setup();
        let mut modify = ModifyBehavior::new();
        modify.set_target(Some(target));

        let events = drive(
            &mut map,
            &mut modify,
            &[
                InputEvent::PointerDown {
                    at: Point2::new(5.0, 5.0),
                },
                InputEvent::PointerUp {
                    at: Point2::new(6.0, 6.0),
                },
            ],
        );
        assert!(events.is_empty());
    }

    #[test]
    fn test_click_without_moving_reports_nothing_changed() {
        let (mut map, target) = setup();
        let mut modify = ModifyBehavior::new();
        modify.set_target(Some(target));

        let events = drive(
            &mut map,
            &mut modify,
            &[
                InputEvent::PointerDown {
                    at: Point2::new(0.0, 0.0),
                },
                InputEvent::PointerUp {
                    at: Point2::new(0.0, 0.0),
                },
            ],
        );
        assert_eq!(
            events,
            vec![
                BehaviorEvent::ModifyStart(vec![target]),
                BehaviorEvent::ModifyEnd(vec![]),
            ]
        );
    }
}
