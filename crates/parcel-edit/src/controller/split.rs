//! 分割
//!
//! 选中一个不带洞的面后启动分割：临时绘制一条分割线，线结束时把面切成两块。

use super::DrawController;
use crate::error::EditError;
use crate::map::FeatureRef;
use crate::one_shot::{Completion, OneShotBehavior, OneShotSession};
use crate::services::{LayerRegistry, Notifier, SessionContext};
use parcel_core::boolean::split_polygon;
use parcel_core::feature::{Feature, FeatureProperties};
use parcel_core::geometry::{Geometry, GeometryKind, LineString, Polygon};
use parcel_staging::ChangeStaging;

impl<S, N, R, C> DrawController<S, N, R, C>
where
    S: ChangeStaging,
    N: Notifier,
    R: LayerRegistry,
    C: SessionContext,
{
    /// 要分割的要素：恰好选中一个不带洞的面
    pub(super) fn split_target(&self) -> Result<FeatureRef, EditError> {
        let target = self.selection.single().ok_or_else(|| {
            EditError::SplitRejected(format!(
                "select exactly one polygon (selected {})",
                self.selection.len()
            ))
        })?;
        let feature = self
            .map
            .feature(target)
            .ok_or_else(|| EditError::SplitRejected("selected feature no longer exists".to_string()))?;

        match &feature.geometry {
            Geometry::Polygon(polygon) if polygon.interiors.is_empty() => Ok(target),
            Geometry::Polygon(_) => Err(EditError::SplitRejected(
                "polygons with holes cannot be split".to_string(),
            )),
            other => Err(EditError::SplitRejected(format!(
                "cannot split a {}",
                other.kind().name()
            ))),
        }
    }

    /// 进入分割等待状态，开始临时绘制分割线
    pub(super) fn start_split(&mut self, target: FeatureRef) {
        self.snap.set_source(&mut self.map, Some(target.layer));
        self.one_shot = Some(OneShotSession::start(
            &mut self.map,
            OneShotBehavior::line(),
            Some(target.layer),
            Completion::Split { target },
        ));
    }

    /// 分割线完成
    pub(super) fn finish_split(&mut self, target: FeatureRef, line: LineString) {
        match self.commit_split(target, &line) {
            Ok(_) => self.notifier.success("Feature split into 2 parts"),
            Err(err) => self.notifier.error(&format!("Split failed: {err}")),
        }
        self.set_idle();
    }

    pub(super) fn cancel_split(&mut self) {
        self.notifier.info("Split cancelled");
        self.set_idle();
    }

    fn commit_split(&mut self, target: FeatureRef, line: &LineString) -> Result<[FeatureRef; 2], EditError> {
        let original = self
            .map
            .feature(target)
            .cloned()
            .ok_or_else(|| EditError::SplitRejected("feature no longer exists".to_string()))?;
        let polygon = original
            .geometry
            .as_polygon()
            .ok_or_else(|| EditError::SplitRejected("feature is not a polygon".to_string()))?;

        let (a, b) = split_polygon(polygon, line)?;
        let parts = [self.build_part(&original, a), self.build_part(&original, b)];

        let convert = |f: &Feature| {
            self.staging
                .convert_feature_to_feature_data(f)
                .ok_or_else(|| EditError::Conversion("split part".to_string()))
        };
        let original_record = convert(&original)?;
        let part_records = [convert(&parts[0])?, convert(&parts[1])?];

        self.staging
            .stage_deletion(original.backend_id(), original.layer_id(), original_record);
        for record in part_records {
            self.staging.stage_addition(record, None);
        }

        let layer = self
            .map
            .layer_mut(target.layer)
            .ok_or(EditError::UnknownLayer(target.layer))?;
        layer.remove_feature(target.handle);
        let [first, second] = parts;
        let handles = [layer.add_feature(first), layer.add_feature(second)];

        tracing::info!("Split feature {:?} on layer {}", target.handle, target.layer);
        Ok(handles.map(|h| FeatureRef::new(target.layer, h)))
    }

    /// 分割出的部件继承行政区和参考，来源指向原要素
    fn build_part(&self, original: &Feature, polygon: Polygon) -> Feature {
        let mut properties = FeatureProperties::fresh(original.layer_id(), GeometryKind::Polygon);
        properties.gnd_id = original.properties.gnd_id.clone();
        properties.ref_id = original.properties.ref_id.clone();
        properties.parent_uuids = original.uuid().into_iter().collect();
        properties.user_id = self.session.user_id();

        let mut part = Feature::new(Geometry::Polygon(polygon), properties);
        self.finish_feature(&mut part);
        part
    }
}
