//! 选择行为

use super::{Behavior, BehaviorContext, BehaviorEvent};
use crate::input::InputEvent;
use crate::map::{FeatureRef, InteractionKind};
use parcel_core::feature::LayerId;

/// 点选
///
/// 单选模式下点击替换选择；多选模式或 `toggle` 点击切换该要素；点击空白处清空。
#[derive(Debug, Clone)]
pub struct SelectBehavior {
    multi: bool,
    /// 可选择的图层
    layers: Vec<LayerId>,
    selected: Vec<FeatureRef>,
}

impl SelectBehavior {
    pub fn new(multi: bool, layers: Vec<LayerId>) -> Self {
        Self {
            multi,
            layers,
            selected: Vec::new(),
        }
    }

    pub fn is_multi(&self) -> bool {
        self.multi
    }

    pub fn selected(&self) -> &[FeatureRef] {
        &self.selected
    }

    /// 清空选择，返回被移除的要素
    pub fn clear(&mut self) -> Vec<FeatureRef> {
        std::mem::take(&mut self.selected)
    }

    fn toggle(&mut self, hit: FeatureRef) -> BehaviorEvent {
        if let Some(pos) = self.selected.iter().position(|r| *r == hit) {
            self.selected.remove(pos);
            BehaviorEvent::SelectChange {
                added: Vec::new(),
                removed: vec![hit],
            }
        } else {
            self.selected.push(hit);
            BehaviorEvent::SelectChange {
                added: vec![hit],
                removed: Vec::new(),
            }
        }
    }

    fn replace(&mut self, hit: FeatureRef) -> Option<BehaviorEvent> {
        if self.selected == [hit] {
            return None;
        }
        let removed: Vec<FeatureRef> = self.selected.drain(..).filter(|r| *r != hit).collect();
        let added = vec![hit];
        self.selected = added.clone();
        Some(BehaviorEvent::SelectChange { added, removed })
    }
}

impl Behavior for SelectBehavior {
    fn kind(&self) -> InteractionKind {
        InteractionKind::Select
    }

    fn reset(&mut self) {
        self.selected.clear();
    }

    fn handle_input(&mut self, ctx: &mut BehaviorContext<'_>, input: &InputEvent) -> Vec<BehaviorEvent> {
        let InputEvent::Click { at, toggle } = *input else {
            return Vec::new();
        };

        // 取最上层的命中
        let hit = ctx
            .map
            .features_at_coordinate(&self.layers, &at, ctx.hit_tolerance)
            .last()
            .copied();

        match hit {
            Some(hit) if self.multi || toggle => vec![self.toggle(hit)],
            Some(hit) => self.replace(hit).into_iter().collect(),
            None if toggle || self.selected.is_empty() => Vec::new(),
            None => vec![BehaviorEvent::SelectChange {
                added: Vec::new(),
                removed: self.clear(),
            }],
        }
    }

    fn prompt(&self) -> &str {
        if self.multi {
            "选择对象 (点击切换):"
        } else {
            "选择对象:"
        }
    }
}

/// 一次性拾取：在指定图层上点中一个要素
#[derive(Debug, Clone)]
pub struct PickBehavior {
    layer: LayerId,
}

impl PickBehavior {
    pub fn new(layer: LayerId) -> Self {
        Self { layer }
    }

    pub fn layer(&self) -> LayerId {
        self.layer
    }
}

impl Behavior for PickBehavior {
    fn kind(&self) -> InteractionKind {
        InteractionKind::OneShot
    }

    fn reset(&mut self) {}

    fn handle_input(&mut self, ctx: &mut BehaviorContext<'_>, input: &InputEvent) -> Vec<BehaviorEvent> {
        let InputEvent::Click { at, .. } = *input else {
            return Vec::new();
        };
        ctx.map
            .features_at_coordinate(&[self.layer], &at, ctx.hit_tolerance)
            .last()
            .map(|hit| BehaviorEvent::SelectChange {
                added: vec![*hit],
                removed: Vec::new(),
            })
            .into_iter()
            .collect()
    }

    fn prompt(&self) -> &str {
        "拾取要素 (Esc 取消):"
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
    use parcel_core::math::Point2;

    fn setup() -> (MapView, FeatureRef, FeatureRef) {
        let mut map = MapView::default();
        let mut layer = FeatureLayer::new(3, "parcels");
        let mut add = |x0: f64| {
            layer.add_feature(Feature::new(
                Geometry::Polygon(Polygon::rectangle(
                    Point2::new(x0, 0.0),
                    Point2::new(x0 + 10.0, 10.0),
                )),
                FeatureProperties::fresh(3, GeometryKind::Polygon),
            ))
        };
        let a = add(0.0);
        let b = add(20.0);
        map.add_layer(layer);
        (map, FeatureRef::new(3, a), FeatureRef::new(3, b))
    }

    fn click(map: &mut MapView, behavior: &mut impl Behavior, x: f64, toggle: bool) -> Vec<BehaviorEvent> {
        let mut snap = SnapController::default();
        let mut ctx = BehaviorContext {
            map,
            snap: &mut snap,
            hit_tolerance: 0.5,
        };
        behavior.handle_input(
            &mut ctx,
            &InputEvent::Click {
                at: Point2::new(x, 5.0),
                toggle,
            },
        )
    }

    #[test]
    fn test_single_select_replaces() {
        let (mut map, a, b) = setup();
        let mut select = SelectBehavior::new(false, vec![3]);

        click(&mut map, &mut select, 5.0, false);
        let events = click(&mut map, &mut select, 25.0, false);

        assert_eq!(
            events,
            vec![BehaviorEvent::SelectChange {
                added: vec![b],
                removed: vec![a]
            }]
        );
        assert_eq!(select.selected(), &[b]);

        // 再次点中同一要素不产生事件
        assert!(click(&mut map, &mut select, 25.0, false).is_empty());
    }

    #[test]
    fn test_multi_select_toggles() {
        let (mut map, a, b) = setup();
        let mut select = SelectBehavior::new(true, vec![3]);

        click(&mut map, &mut select, 5.0, false);
        click(&mut map, &mut select, 25.0, false);
        assert_eq!(select.selected(), &[a, b]);

        click(&mut map, &mut select, 5.0, false);
        assert_eq!(select.selected(), &[b]);
    }

    #[test]
    fn test_empty_click_clears() {
        let (mut map, a, _) = setup();
        let mut select = SelectBehavior::new(false, vec![3]);
        click(&mut map, &mut select, 5.0, false);

        let events = click(&mut map, &mut select, 15.0, false);
        assert_eq!(
            events,
            vec![BehaviorEvent::SelectChange {
                added: vec![],
                removed: vec![a]
            }]
        );
        assert!(select.selected().is_empty());
    }

    #[test]
    fn test_unselectable_layer_ignored() {
        let (mut map, _, _) = setup();
        let mut select = SelectBehavior::new(false, vec![9]);
        assert!(click(&mut map, &mut select, 5.0, false).is_empty());
    }

    #[test]
    fn test_pick() {
        let (mut map, a, _) = setup();
        let mut pick = PickBehavior::new(3);
        assert_eq!(
            click(&mut map, &mut pick, 5.0, false),
            vec![BehaviorEvent::SelectChange {
                added: vec![a],
                removed: vec![]
            }]
        );
        assert!(click(&mut map, &mut pick, 15.0, false).is_empty());
    }
}
