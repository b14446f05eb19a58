//! 地图模型
//!
//! 图层（空间索引）+ 交互注册表 + 监听器表。渲染不在此处理。

use crate::events::ListenerRegistry;
use parcel_core::feature::{Feature, FeatureHandle, LayerId};
use parcel_core::layer::FeatureLayer;
use parcel_core::math::Point2;
use parcel_core::measure::Projection;
use std::collections::BTreeMap;

/// 交互类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InteractionKind {
    Draw,
    Select,
    Modify,
    Snap,
    OneShot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InteractionId(u64);

/// 地图上的一个交互
#[derive(Debug, Clone, PartialEq)]
pub struct Interaction {
    pub id: InteractionId,
    pub kind: InteractionKind,
    pub active: bool,
    /// 绑定的图层
    pub source: Option<LayerId>,
}

/// 图层内的要素定位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FeatureRef {
    pub layer: LayerId,
    pub handle: FeatureHandle,
}

impl FeatureRef {
    pub fn new(layer: LayerId, handle: FeatureHandle) -> Self {
        Self { layer, handle }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MapView {
    layers: BTreeMap<LayerId, FeatureLayer>,
    interactions: Vec<Interaction>,
    listeners: ListenerRegistry,
    projection: Projection,
    next_interaction: u64,
}

impl MapView {
    pub fn new(projection: Projection) -> Self {
        Self {
            projection,
            ..Default::default()
        }
    }

    pub fn projection(&self) -> Projection {
        self.projection
    }

    // ========== 图层 ==========

    /// 加入图层，返回被替换的同 ID 图层
    pub fn add_layer(&mut self, layer: FeatureLayer) -> Option<FeatureLayer> {
        self.layers.insert(layer.id(), layer)
    }

    pub fn layer(&self, id: LayerId) -> Option<&FeatureLayer> {
        self.layers.get(&id)
    }

    pub fn layer_mut(&mut self, id: LayerId) -> Option<&mut FeatureLayer> {
        self.layers.get_mut(&id)
    }

    pub fn layer_ids(&self) -> Vec<LayerId> {
        self.layers.keys().copied().collect()
    }

    pub fn feature(&self, r: FeatureRef) -> Option<&Feature> {
        self.layers.get(&r.layer)?.get(r.handle)
    }

    pub fn update_feature<R>(&mut self, r: FeatureRef, f: impl FnOnce(&mut Feature) -> R) -> Option<R> {
        self.layers.get_mut(&r.layer)?.update_feature(r.handle, f)
    }

    /// 指定图层中命中坐标的要素，按图层顺序返回
    pub fn features_at_coordinate(&self, layers: &[LayerId], point: &Point2, tolerance: f64) -> Vec<FeatureRef> {
        layers
            .iter()
            .filter_map(|id| self.layers.get(id))
            .flat_map(|layer| {
                layer
                    .features_at_coordinate(point, tolerance)
                    .into_iter()
                    .map(|f| FeatureRef::new(layer.id(), f.handle))
            })
            .collect()
    }

    pub fn feature_count(&self) -> usize {
        self.layers.values().map(|l| l.len()).sum()
    }

    // ========== 交互 ==========

    pub fn add_interaction(&mut self, kind: InteractionKind, source: Option<LayerId>) -> InteractionId {
        self.next_interaction += 1;
        let id = InteractionId(self.next_interaction);
        self.interactions.push(Interaction {
            id,
            kind,
            active: true,
            source,
        });
        tracing::debug!("Added {:?} interaction {:?}", kind, id);
        id
    }

    pub fn remove_interaction(&mut self, id: InteractionId) -> bool {
        let before = self.interactions.len();
        self.interactions.retain(|i| i.id != id);
        before != self.interactions.len()
    }

    pub fn set_interaction_active(&mut self, id: InteractionId, active: bool) -> bool {
        match self.interactions.iter_mut().find(|i| i.id == id) {
            Some(interaction) => {
                interaction.active = active;
                true
            }
            None => false,
        }
    }

    pub fn interaction(&self, id: InteractionId) -> Option<&Interaction> {
        self.interactions.iter().find(|i| i.id == id)
    }

    pub fn interactions(&self) -> &[Interaction] {
        &self.interactions
    }

    pub fn interaction_count(&self, kind: InteractionKind) -> usize {
        self.interactions.iter().filter(|i| i.kind == kind).count()
    }

    pub fn active_interaction_count(&self, kind: InteractionKind) -> usize {
        self.interactions
            .iter()
            .filter(|i| i.kind == kind && i.active)
            .count()
    }

    // ========== 监听器 ==========

    pub fn listeners(&self) -> &ListenerRegistry {
        &self.listeners
    }

    pub fn listeners_mut(&mut self) -> &mut ListenerRegistry {
        &mut self.listeners
    }
}
