//! 选择集

use crate::map::{FeatureRef, MapView};
use parcel_core::feature::{Feature, FeatureHandle, LayerId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 选中要素的摘要
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionInfo {
    /// 后端 ID
    pub feature_id: Option<i64>,
    pub layer_id: LayerId,
    pub uuid: Option<Uuid>,
    pub gnd_id: Option<String>,
    #[serde(skip)]
    pub handle: Option<FeatureHandle>,
}

impl SelectionInfo {
    pub fn from_feature(feature: &Feature) -> Self {
        Self {
            feature_id: feature.backend_id(),
            layer_id: feature.layer_id(),
            uuid: feature.uuid(),
            gnd_id: feature.properties.gnd_id.clone(),
            handle: Some(feature.handle),
        }
    }
}

/// 有序选择集
#[derive(Debug, Clone, Default)]
pub struct SelectionSet {
    items: Vec<FeatureRef>,
    infos: Vec<SelectionInfo>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// 按选择交互的当前结果重建，地图上已不存在的要素被忽略
    pub fn rebuild(&mut self, map: &MapView, refs: &[FeatureRef]) {
        self.items.clear();
        self.infos.clear();
        for r in refs {
            if let Some(feature) = map.feature(*r) {
                self.items.push(*r);
                self.infos.push(SelectionInfo::from_feature(feature));
            }
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.infos.clear();
    }

    pub fn items(&self) -> &[FeatureRef] {
        &self.items
    }

    pub fn infos(&self) -> &[SelectionInfo] {
        &self.infos
    }

    /// 选中要素的快照
    pub fn features(&self, map: &MapView) -> Vec<Feature> {
        self.items
            .iter()
            .filter_map(|r| map.feature(*r).cloned())
            .collect()
    }

    /// 唯一选中的要素
    pub fn single(&self) -> Option<FeatureRef> {
        match self.items.as_slice() {
            [only] => Some(*only),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
