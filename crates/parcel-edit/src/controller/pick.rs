//! 一次性操作的入口与结束

use super::DrawController;
use crate::error::OneShotError;
use crate::interactions::{BehaviorEvent, PickBehavior};
use crate::one_shot::{Completion, OneShot, OneShotBehavior, OneShotSession};
use crate::services::{LayerRegistry, Notifier, SessionContext};
use parcel_core::feature::{Feature, LayerId};
use parcel_core::geometry::{Geometry, LineString};
use parcel_staging::ChangeStaging;

impl<S, N, R, C> DrawController<S, N, R, C>
where
    S: ChangeStaging,
    N: Notifier,
    R: LayerRegistry,
    C: SessionContext,
{
    /// 在指定图层上拾取一个要素
    pub fn pick_feature(&mut self, layer: LayerId) -> OneShot<Feature> {
        self.start_pick(layer, false)
    }

    /// 拾取参考要素，其标识写入下一个绘制或合并出的要素
    pub fn pick_reference_feature(&mut self, layer: LayerId) -> OneShot<Feature> {
        self.start_pick(layer, true)
    }

    fn start_pick(&mut self, layer: LayerId, reference: bool) -> OneShot<Feature> {
        self.set_idle();
        if self.map.layer(layer).is_none() {
            tracing::warn!("Pick requested on unknown layer {}", layer);
            return OneShot::failed(OneShotError::Failed(format!("Unknown layer: {layer}")));
        }

        let (tx, one_shot) = OneShot::channel();
        self.one_shot = Some(OneShotSession::start(
            &mut self.map,
            OneShotBehavior::Pick(PickBehavior::new(layer)),
            Some(layer),
            Completion::Pick { tx, reference },
        ));
        one_shot
    }

    /// 临时绘制一条线
    pub fn draw_line(&mut self) -> OneShot<LineString> {
        self.set_idle();
        let source = self.registry.default_interaction_source();
        self.snap.set_source(&mut self.map, source);

        let (tx, one_shot) = OneShot::channel();
        self.one_shot = Some(OneShotSession::start(
            &mut self.map,
            OneShotBehavior::line(),
            source,
            Completion::Line { tx },
        ));
        one_shot
    }

    /// 调用方丢弃了结果：释放临时交互
    pub(super) fn release_abandoned_one_shot(&mut self) {
        if !self.one_shot.as_ref().is_some_and(|s| s.is_abandoned()) {
            return;
        }
        if let Some(session) = self.one_shot.take() {
            tracing::debug!("One-shot result dropped by caller, releasing");
            session.release(&mut self.map);
        }
    }

    pub(super) fn cancel_one_shot(&mut self) {
        let Some(session) = self.one_shot.take() else {
            return;
        };
        match session.release(&mut self.map) {
            Completion::Split { .. } => self.cancel_split(),
            completion => {
                tracing::debug!("One-shot operation cancelled");
                completion.fail(OneShotError::Cancelled);
            }
        }
    }

    pub(super) fn complete_one_shot(&mut self, event: &BehaviorEvent) {
        let Some(session) = self.one_shot.take() else {
            return;
        };

        match (session.release(&mut self.map), event) {
            (Completion::Pick { tx, reference }, BehaviorEvent::SelectChange { added, .. }) => {
                let picked = added
                    .first()
                    .and_then(|r| self.map.feature(*r).cloned())
                    .ok_or_else(|| OneShotError::Failed("picked feature not found".to_string()));
                if let (true, Ok(feature)) = (reference, &picked) {
                    tracing::info!("Reference feature set: {:?}", feature.properties.reference_key());
                    self.reference = Some(feature.clone());
                }
                if tx.send(picked).is_err() {
                    tracing::debug!("Pick result dropped by caller");
                }
            }
            (Completion::Line { tx }, BehaviorEvent::DrawEnd(Geometry::LineString(line))) => {
                if tx.send(Ok(line.clone())).is_err() {
                    tracing::debug!("Line result dropped by caller");
                }
            }
            (Completion::Split { target }, BehaviorEvent::DrawEnd(Geometry::LineString(line))) => {
                self.finish_split(target, line.clone());
            }
            (Completion::Split { .. }, _) => self.cancel_split(),
            (completion, event) => {
                tracing::warn!("Unexpected one-shot result {:?}", event.event_type());
                completion.fail(OneShotError::Failed("unexpected result".to_string()));
            }
        }
    }
}
