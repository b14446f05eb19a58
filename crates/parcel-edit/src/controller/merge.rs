//! 合并选中的面

use super::DrawController;
use crate::error::EditError;
use crate::map::FeatureRef;
use crate::services::{LayerRegistry, Notifier, SessionContext};
use crate::tool::ActiveTool;
use parcel_core::feature::{Feature, FeatureHandle, FeatureProperties};
use parcel_core::geometry::{Geometry, GeometryKind, Polygon};
use parcel_staging::{ChangeStaging, FeatureData};

/// 合并前置条件：至少两个面，同一行政区，同一图层
fn check_merge_sources(sources: &[Feature]) -> Result<(), EditError> {
    if sources.len() < 2 {
        return Err(EditError::MergeRejected(format!(
            "select at least two polygons (selected {})",
            sources.len()
        )));
    }
    if sources.iter().any(|f| f.kind() != GeometryKind::Polygon) {
        return Err(EditError::MergeRejected(
            "only polygons can be merged".to_string(),
        ));
    }

    let first = &sources[0];
    if sources
        .iter()
        .any(|f| f.properties.gnd_id != first.properties.gnd_id)
    {
        return Err(EditError::MergeRejected(
            "polygons belong to different administrative areas".to_string(),
        ));
    }
    if sources.iter().any(|f| f.layer_id() != first.layer_id()) {
        return Err(EditError::MergeRejected(
            "polygons belong to different layers".to_string(),
        ));
    }
    Ok(())
}

impl<S, N, R, C> DrawController<S, N, R, C>
where
    S: ChangeStaging,
    N: Notifier,
    R: LayerRegistry,
    C: SessionContext,
{
    /// 合并选中的面
    ///
    /// 前置条件不满足时不调用合并运算；运算或转换失败时地图和暂存区都不变。
    /// 成功后暂存一条合并变更，用新要素替换来源要素并回到空闲。
    pub fn merge_selected_polygons(&mut self) -> Result<FeatureRef, EditError> {
        if self.active_tool != ActiveTool::Merge {
            let err = EditError::ToolNotActive("Merge");
            self.notifier.error(&err.to_string());
            return Err(err);
        }

        let sources = self.selection.features(&self.map);
        if let Err(err) = check_merge_sources(&sources) {
            self.notifier.error(&err.to_string());
            return Err(err);
        }

        let polygons: Vec<Polygon> = sources
            .iter()
            .filter_map(|f| f.geometry.as_polygon().cloned())
            .collect();
        let merged = match self.union.union(&polygons) {
            Ok(merged) => merged,
            Err(err) => {
                tracing::warn!("Union of {} polygons failed: {}", polygons.len(), err);
                self.notifier.error(&format!("Merge failed: {err}"));
                self.deselect_all();
                return Err(err.into());
            }
        };

        let feature = self.build_merged_feature(&sources, merged);
        let (record, originals) = match self.convert_merge(&feature, &sources) {
            Ok(converted) => converted,
            Err(err) => {
                tracing::error!("Merged feature could not be converted: {}", err);
                self.notifier.error(&format!("Merge failed: {err}"));
                self.deselect_all();
                return Err(err);
            }
        };

        let source_ids: Vec<i64> = sources.iter().filter_map(Feature::backend_id).collect();
        self.staging.stage_merge(source_ids, record, originals);

        let layer_id = feature.layer_id();
        let handles: Vec<FeatureHandle> = sources.iter().map(|f| f.handle).collect();
        let layer = self
            .map
            .layer_mut(layer_id)
            .ok_or(EditError::UnknownLayer(layer_id))?;
        layer.remove_features(&handles);
        let handle = layer.add_feature(feature);

        tracing::info!("Merged {} polygons on layer {}", sources.len(), layer_id);
        self.notifier
            .success(&format!("Merged {} polygons", sources.len()));

        self.reference = None;
        self.set_idle();
        Ok(FeatureRef::new(layer_id, handle))
    }

    fn build_merged_feature(&self, sources: &[Feature], merged: Polygon) -> Feature {
        let first = &sources[0];
        let mut properties = FeatureProperties::fresh(first.layer_id(), GeometryKind::Polygon);
        for source in sources.iter().filter(|f| f.uuid().is_none()) {
            tracing::warn!("Merge source {:?} has no uuid, left out of parent_uuids", source.handle);
        }
        properties.parent_uuids = sources.iter().filter_map(Feature::uuid).collect();
        properties.gnd_id = first.properties.gnd_id.clone();
        properties.ref_id = self.reference_key();
        properties.user_id = self.session.user_id();

        let mut feature = Feature::new(Geometry::Polygon(merged), properties);
        self.finish_feature(&mut feature);
        feature
    }

    fn convert_merge(
        &self,
        feature: &Feature,
        sources: &[Feature],
    ) -> Result<(FeatureData, Vec<FeatureData>), EditError> {
        let record = self
            .staging
            .convert_feature_to_feature_data(feature)
            .ok_or_else(|| EditError::Conversion("merged feature".to_string()))?;
        let originals = sources
            .iter()
            .map(|f| self.staging.convert_feature_to_feature_data(f))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| EditError::Conversion("merge source".to_string()))?;
        Ok((record, originals))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parcel_core::math::Point2;

    fn parcel(gnd: Option<&str>, layer: u32) -> Feature {
        let mut props = FeatureProperties::fresh(layer, GeometryKind::Polygon);
        props.gnd_id = gnd.map(str::to_string);
        Feature::new(
            Geometry::Polygon(Polygon::rectangle(
                Point2::new(0.0, 0.0),
                Point2::new(1.0, 1.0),
            )),
            props,
        )
    }

    #[test]
    fn test_merge_source_checks() {
        let a = parcel(Some("GND-042"), 3);
        let b = parcel(Some("GND-042"), 3);
        assert!(check_merge_sources(&[a.clone(), b.clone()]).is_ok());
        assert!(check_merge_sources(&[a.clone()]).is_err());
        assert!(check_merge_sources(&[a.clone(), parcel(Some("GND-043"), 3)]).is_err());
        assert!(check_merge_sources(&[a, parcel(Some("GND-042"), 4)]).is_err());

        // 都没有行政区也算同一行政区
        assert!(check_merge_sources(&[parcel(None, 3), parcel(None, 3)]).is_ok());
    }

    #[test]
    fn test_merge_rejects_points() {
        let point = Feature::new(
            Geometry::Point(Point2::new(0.0, 0.0)),
            FeatureProperties::fresh(3, GeometryKind::Point),
        );
        let result = check_merge_sources(&[parcel(None, 3), point]);
        assert!(matches!(result, Err(EditError::MergeRejected(_))));
    }
}
