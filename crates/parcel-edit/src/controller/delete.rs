//! 删除选中要素

use super::DrawController;
use crate::error::EditError;
use crate::services::{LayerRegistry, Notifier, SessionContext};
use parcel_staging::ChangeStaging;
use serde::Serialize;

/// 批量删除的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DeleteSummary {
    pub deleted: usize,
    /// 无身份而跳过的要素
    pub skipped: usize,
}

impl<S, N, R, C> DrawController<S, N, R, C>
where
    S: ChangeStaging,
    N: Notifier,
    R: LayerRegistry,
    C: SessionContext,
{
    /// 删除所有选中要素并暂存删除
    ///
    /// 没有身份的要素跳过，批量继续；结束时给出一条汇总提示并清空选择。
    pub fn delete_selected_features(&mut self) -> Result<DeleteSummary, EditError> {
        if self.selection.is_empty() {
            self.notifier.warning("Nothing selected to delete");
            return Err(EditError::NothingSelected);
        }

        let mut summary = DeleteSummary::default();
        for r in self.selection.items().to_vec() {
            let Some(feature) = self.map.feature(r).cloned() else {
                continue;
            };
            if feature.properties.is_anonymous() {
                tracing::warn!("Feature {:?} has no identity, skipping deletion", feature.handle);
                summary.skipped += 1;
                continue;
            }
            let Some(original) = self.staging.convert_feature_to_feature_data(&feature) else {
                tracing::warn!("Feature {:?} could not be converted, skipping deletion", feature.handle);
                summary.skipped += 1;
                continue;
            };

            self.staging
                .stage_deletion(feature.backend_id(), feature.layer_id(), original);
            if let Some(layer) = self.map.layer_mut(r.layer) {
                layer.remove_feature(r.handle);
            }
            summary.deleted += 1;
        }

        self.deselect_all();

        if summary.skipped == 0 {
            self.notifier
                .success(&format!("Deleted {} feature(s)", summary.deleted));
        } else {
            self.notifier.warning(&format!(
                "Deleted {} feature(s), skipped {} without identity",
                summary.deleted, summary.skipped
            ));
        }
        Ok(summary)
    }
}
