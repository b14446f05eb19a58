//! 变更暂存缓冲区
//!
//! 记录尚未提交到后端的新增、修改、删除和合并。每个要素身份最多一条待提交变更，
//! 后到的变更按固定规则覆盖先前的变更；一次合并会同时结束多个身份。

use crate::record::{FeatureData, FeatureKey};
use chrono::{DateTime, Utc};
use parcel_core::feature::{Feature, LayerId};
use serde::{Deserialize, Serialize};

/// 待提交变更
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum StagedChange {
    Add {
        new: FeatureData,
        original: Option<FeatureData>,
    },
    Update {
        new: FeatureData,
        original: FeatureData,
    },
    Delete {
        id: Option<i64>,
        layer_id: LayerId,
        original: FeatureData,
    },
    Merge {
        source_ids: Vec<i64>,
        new: FeatureData,
        originals: Vec<FeatureData>,
    },
}

impl StagedChange {
    pub fn name(&self) -> &'static str {
        match self {
            StagedChange::Add { .. } => "add",
            StagedChange::Update { .. } => "update",
            StagedChange::Delete { .. } => "delete",
            StagedChange::Merge { .. } => "merge",
        }
    }

    /// 该变更所属的要素身份
    pub fn key(&self) -> Option<FeatureKey> {
        match self {
            StagedChange::Add { new, .. }
            | StagedChange::Update { new, .. }
            | StagedChange::Merge { new, .. } => new.key(),
            StagedChange::Delete { id, original, .. } => {
                original.key().or(id.map(FeatureKey::Id))
            }
        }
    }
}

/// 带时间戳的暂存条目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StagedEntry {
    pub change: StagedChange,
    pub staged_at: DateTime<Utc>,
}

/// 暂存接口
///
/// 编辑控制器只通过此 trait 写入暂存区，调用即返回，不等待后端。
pub trait ChangeStaging {
    fn stage_addition(&mut self, new: FeatureData, original: Option<FeatureData>);

    fn stage_update(&mut self, new: FeatureData, original: FeatureData);

    fn stage_deletion(&mut self, id: Option<i64>, layer_id: LayerId, original: FeatureData);

    fn stage_merge(&mut self, source_ids: Vec<i64>, new: FeatureData, originals: Vec<FeatureData>);

    /// 要素 -> 传输记录，几何无效时返回 `None`
    fn convert_feature_to_feature_data(&self, feature: &Feature) -> Option<FeatureData> {
        FeatureData::from_feature(feature)
    }
}

/// 内存暂存缓冲区（按暂存顺序保存）
#[derive(Debug, Clone, Default)]
pub struct StagingBuffer {
    entries: Vec<StagedEntry>,
}

impl StagingBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_entries(entries: Vec<StagedEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[StagedEntry] {
        &self.entries
    }

    pub fn pending(&self) -> impl Iterator<Item = &StagedChange> {
        self.entries.iter().map(|e| &e.change)
    }

    /// 指定身份的待提交变更
    pub fn get(&self, key: FeatureKey) -> Option<&StagedChange> {
        self.entries
            .iter()
            .map(|e| &e.change)
            .find(|c| c.key() == Some(key))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 取出全部待提交变更
    pub fn drain(&mut self) -> Vec<StagedChange> {
        self.entries.drain(..).map(|e| e.change).collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn position(&self, key: Option<FeatureKey>) -> Option<usize> {
        let key = key?;
        self.entries.iter().position(|e| e.change.key() == Some(key))
    }

    fn take(&mut self, key: Option<FeatureKey>) -> Option<StagedChange> {
        let pos = self.position(key)?;
        Some(self.entries.remove(pos).change)
    }

    fn push(&mut self, change: StagedChange) {
        tracing::debug!(
            "Staged {} for {}",
            change.name(),
            change
                .key()
                .map(|k| k.to_string())
                .unwrap_or_else(|| "<anonymous>".to_string())
        );
        self.entries.push(StagedEntry {
            change,
            staged_at: Utc::now(),
        });
    }

    /// 原地替换，保留原条目的位置
    fn replace(&mut self, pos: usize, change: StagedChange) {
        self.entries[pos] = StagedEntry {
            change,
            staged_at: Utc::now(),
        };
    }
}

impl ChangeStaging for StagingBuffer {
    fn stage_addition(&mut self, new: FeatureData, original: Option<FeatureData>) {
        let key = new.key();
        match self.position(key) {
            Some(pos) => self.replace(pos, StagedChange::Add { new, original }),
            None => self.push(StagedChange::Add { new, original }),
        }
    }

    fn stage_update(&mut self, new: FeatureData, original: FeatureData) {
        let Some(pos) = self.position(new.key()) else {
            self.push(StagedChange::Update { new, original });
            return;
        };

        let merged = match self.entries[pos].change.clone() {
            StagedChange::Add { original: first, .. } => StagedChange::Add {
                new,
                original: first,
            },
            StagedChange::Update { original: first, .. } => StagedChange::Update {
                new,
                original: first,
            },
            StagedChange::Merge {
                source_ids,
                originals,
                ..
            } => StagedChange::Merge {
                source_ids,
                new,
                originals,
            },
            StagedChange::Delete { .. } => {
                tracing::warn!("Update staged for a deleted feature, replacing the deletion");
                StagedChange::Update { new, original }
            }
        };
        self.replace(pos, merged);
    }

    fn stage_deletion(&mut self, id: Option<i64>, layer_id: LayerId, original: FeatureData) {
        let key = original.key().or(id.map(FeatureKey::Id));
        match self.take(key) {
            // 从未到达后端
            Some(StagedChange::Add { .. }) => {}
            Some(StagedChange::Update {
                original: first, ..
            }) => self.push(StagedChange::Delete {
                id,
                layer_id,
                original: first,
            }),
            Some(StagedChange::Merge { originals, .. }) => {
                for source in originals.into_iter().filter(|o| o.id.is_some()) {
                    self.push(StagedChange::Delete {
                        id: source.id,
                        layer_id: source.layer_id,
                        original: source,
                    });
                }
            }
            Some(StagedChange::Delete { .. }) | None => self.push(StagedChange::Delete {
                id,
                layer_id,
                original,
            }),
        }
    }

    fn stage_merge(&mut self, source_ids: Vec<i64>, new: FeatureData, originals: Vec<FeatureData>) {
        let mut kept_originals = Vec::with_capacity(originals.len());
        let mut source_ids = source_ids;

        for source in originals {
            match self.take(source.key()) {
                Some(StagedChange::Add { .. }) => {
                    if let Some(id) = source.id {
                        source_ids.retain(|s| *s != id);
                    }
                }
                Some(StagedChange::Merge {
                    source_ids: inner_ids,
                    originals: inner,
                    ..
                }) => {
                    // 合并结果再参与合并：展开为其来源
                    source_ids.extend(inner_ids);
                    kept_originals.extend(inner);
                }
                // 后端保存的是首次修改前的状态
                Some(StagedChange::Update { original, .. }) => kept_originals.push(original),
                _ => kept_originals.push(source),
            }
        }

        source_ids.sort_unstable();
        source_ids.dedup();

        if source_ids.is_empty() {
            self.push(StagedChange::Add {
                new,
                original: None,
            });
        } else {
            self.push(StagedChange::Merge {
                source_ids,
                new,
                originals: kept_originals,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::TransportGeometry;
    use uuid::Uuid;

    fn record(id: Option<i64>, area: f64) -> FeatureData {
        FeatureData {
            id,
            uuid: Some(Uuid::new_v4()),
            layer_id: 3,
            geometry: TransportGeometry::Point([0.0, 0.0]),
            area: Some(area),
            length: None,
            gnd_id: None,
            ref_id: None,
            parent_uuids: Vec::new(),
            user_id: None,
        }
    }

    fn with_area(data: &FeatureData, area: f64) -> FeatureData {
        FeatureData {
            area: Some(area),
            ..data.clone()
        }
    }

    #[test]
    fn test_add_then_update_stays_add() {
        let mut buffer = StagingBuffer::new();
        let a = record(None, 1.0);
        buffer.stage_addition(a.clone(), None);
        buffer.stage_update(with_area(&a, 2.0), a.clone());

        assert_eq!(buffer.len(), 1);
        match buffer.get(a.key().unwrap()).unwrap() {
            StagedChange::Add { new, original } => {
                assert_eq!(new.area, Some(2.0));
                assert!(original.is_none());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_add_then_delete_vanishes() {
        let mut buffer = StagingBuffer::new();
        let a = record(None, 1.0);
        buffer.stage_addition(a.clone(), None);
        buffer.stage_deletion(None, 3, a);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_update_chain_keeps_first_original() {
        let mut buffer = StagingBuffer::new();
        let v0 = record(Some(10), 1.0);
        let v1 = with_area(&v0, 2.0);
        let v2 = with_area(&v0, 3.0);

        buffer.stage_update(v1.clone(), v0.clone());
        buffer.stage_update(v2.clone(), v1);

        assert_eq!(
            buffer.pending().collect::<Vec<_>>(),
            vec![&StagedChange::Update {
                new: v2.clone(),
                original: v0.clone()
            }]
        );

        buffer.stage_deletion(Some(10), 3, v2);
        assert_eq!(
            buffer.drain(),
            vec![StagedChange::Delete {
                id: Some(10),
                layer_id: 3,
                original: v0
            }]
        );
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_merge_closes_sources() {
        let mut buffer = StagingBuffer::new();
        let saved = record(Some(1), 10.0);
        let fresh = record(None, 20.0);
        let modified = with_area(&saved, 11.0);
        buffer.stage_update(modified.clone(), saved.clone());
        buffer.stage_addition(fresh.clone(), None);

        let merged = record(None, 31.0);
        buffer.stage_merge(vec![1], merged.clone(), vec![modified, fresh]);

        assert_eq!(buffer.len(), 1);
        match &buffer.entries()[0].change {
            StagedChange::Merge {
                source_ids,
                new,
                originals,
            } => {
                assert_eq!(source_ids, &vec![1]);
                assert_eq!(new, &merged);
                assert_eq!(originals, &vec![saved]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_merge_of_unsaved_features_is_an_add() {
        let mut buffer = StagingBuffer::new();
        let a = record(None, 1.0);
        let b = record(None, 2.0);
        buffer.stage_addition(a.clone(), None);
        buffer.stage_addition(b.clone(), None);

        let merged = record(None, 3.0);
        buffer.stage_merge(Vec::new(), merged.clone(), vec![a, b]);

        assert_eq!(
            buffer.drain(),
            vec![StagedChange::Add {
                new: merged,
                original: None
            }]
        );
    }

    #[test]
    fn test_delete_of_pending_merge_deletes_sources() {
        let mut buffer = StagingBuffer::new();
        let s1 = record(Some(1), 1.0);
        let s2 = record(Some(2), 1.0);
        let merged = record(None, 2.0);
        buffer.stage_merge(vec![1, 2], merged.clone(), vec![s1, s2]);

        buffer.stage_deletion(None, 3, merged);

        let ids: Vec<_> = buffer
            .pending()
            .map(|c| match c {
                StagedChange::Delete { id, .. } => *id,
                _ => None,
            })
            .collect();
        assert_eq!(ids, vec![Some(1), Some(2)]);
    }

    #[test]
    fn test_change_serializes_with_op_tag() {
        let change = StagedChange::Delete {
            id: Some(5),
            layer_id: 3,
            original: record(Some(5), 1.0),
        };
        let json = serde_json::to_value(&change).unwrap();
        assert_eq!(json["op"], "delete");
        assert_eq!(json["id"], 5);
    }
}
