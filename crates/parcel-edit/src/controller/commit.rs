//! 绘制提交与修改提交

use super::DrawController;
use crate::error::EditError;
use crate::map::FeatureRef;
use crate::services::{LayerRegistry, Notifier, SessionContext};
use crate::tool::ActiveTool;
use parcel_core::boolean::geometry_interior_point;
use parcel_core::feature::{Feature, FeatureProperties, LayerId};
use parcel_core::geometry::Geometry;
use parcel_core::measure::measure;
use parcel_core::CoreError;
use parcel_staging::ChangeStaging;

impl<S, N, R, C> DrawController<S, N, R, C>
where
    S: ChangeStaging,
    N: Notifier,
    R: LayerRegistry,
    C: SessionContext,
{
    /// 绘制结束：生成要素、加入图层并暂存新增，然后回到空闲
    pub(super) fn on_draw_end(&mut self, geometry: Geometry) {
        if !matches!(self.active_tool, ActiveTool::Draw { .. }) {
            tracing::warn!("Draw end received while not drawing, ignoring");
            self.set_idle();
            return;
        }

        match self.commit_drawn(geometry) {
            Ok(feature) => {
                tracing::info!("Feature drawn on layer {}", feature.layer);
                self.notifier
                    .success(&format!("Feature added to layer {}", feature.layer));
            }
            Err(err) => self.notifier.error(&format!("Failed to add feature: {err}")),
        }

        self.reference = None;
        self.set_idle();
    }

    /// 绘制开始时绑定的图层，不受绘制期间目标图层切换影响
    fn draw_source_layer(&self) -> Result<LayerId, EditError> {
        let bound = self
            .draw
            .as_ref()
            .and_then(|handle| self.map.interaction(handle.interaction()))
            .and_then(|interaction| interaction.source);
        match bound {
            Some(layer) => Ok(layer),
            None => self.drawing_layer(),
        }
    }

    fn commit_drawn(&mut self, geometry: Geometry) -> Result<FeatureRef, EditError> {
        let layer_id = self.draw_source_layer()?;
        if !geometry.is_valid() {
            return Err(CoreError::InvalidGeometry(format!(
                "drawn {} is degenerate",
                geometry.kind().name()
            ))
            .into());
        }

        let mut properties = FeatureProperties::fresh(layer_id, geometry.kind());
        properties.ref_id = self.reference_key();
        properties.user_id = self.session.user_id();
        properties.gnd_id = self.lookup_boundary(&geometry);

        let mut feature = Feature::new(geometry, properties);
        self.finish_feature(&mut feature);

        // 转换失败时要素仍留在地图上
        let record = self.staging.convert_feature_to_feature_data(&feature);
        let handle = self
            .map
            .layer_mut(layer_id)
            .ok_or(EditError::UnknownLayer(layer_id))?
            .add_feature(feature);

        match record {
            Some(record) => {
                self.staging.stage_addition(record, None);
                Ok(FeatureRef::new(layer_id, handle))
            }
            None => {
                tracing::error!(
                    "Drawn feature {:?} on layer {} could not be converted; it stays on the map unstaged",
                    handle,
                    layer_id
                );
                Err(EditError::Conversion("drawn feature".to_string()))
            }
        }
    }

    /// 所属行政区编码：取几何内部一点，在行政区图层中查找包含它的面
    fn lookup_boundary(&self, geometry: &Geometry) -> Option<String> {
        let boundary_layer = self.config.boundary_layer?;
        if !geometry.kind().is_polygonal() && !self.config.boundary_lookup_for_points_and_lines {
            return None;
        }

        let point = geometry_interior_point(geometry)?;
        let layer = self.map.layer(boundary_layer)?;
        layer
            .features_at_coordinate(&point, 0.0)
            .into_iter()
            .filter(|f| f.kind().is_polygonal())
            .find_map(Feature::boundary_code)
    }

    pub(super) fn on_draw_abort(&mut self) {
        self.notifier.info("Drawing cancelled");
        self.set_idle();
    }

    /// 修改开始：保存修改前的快照
    pub(super) fn on_modify_start(&mut self, refs: &[FeatureRef]) {
        for r in refs {
            if let Some(feature) = self.map.feature(*r) {
                self.snapshots.insert(r.handle, feature.clone());
            }
        }
    }

    /// 修改结束：重新量算并暂存更新
    pub(super) fn on_modify_end(&mut self, refs: &[FeatureRef]) {
        let projection = self.map.projection();
        let decimals = self.config.area_decimals;
        let mut updated = 0;

        for r in refs {
            let Some(original) = self.snapshots.remove(&r.handle) else {
                tracing::warn!("No snapshot for modified feature {:?}, skipping", r.handle);
                continue;
            };

            let modified = self.map.update_feature(*r, |feature| {
                let measured = measure(&feature.geometry, projection, decimals);
                feature.properties.area = measured.area;
                feature.properties.length = measured.length;
                feature.clone()
            });
            let Some(modified) = modified else {
                tracing::warn!("Modified feature {:?} is no longer on the map, skipping", r.handle);
                continue;
            };

            let new = self.staging.convert_feature_to_feature_data(&modified);
            let old = self.staging.convert_feature_to_feature_data(&original);
            match (new, old) {
                (Some(new), Some(old)) => {
                    self.staging.stage_update(new, old);
                    updated += 1;
                }
                _ => tracing::error!("Modified feature {:?} could not be converted", r.handle),
            }
        }

        if updated > 0 {
            self.notifier
                .success(&format!("Updated {updated} feature(s)"));
        }
    }
}
