//! 编辑控制器
//!
//! 持有唯一的当前工具，互斥地激活绘制、选择、修改、分割和合并；
//! 把几何生命周期事件（绘制结束、修改结束、合并、删除）转换为暂存变更。
//!
//! 切换工具总是先拆除上一个工具的全部副作用（监听器、交互、选择），
//! 再为新工具绑定捕捉并创建新的交互。

mod commit;
mod delete;
mod merge;
mod pick;
mod split;


pub use delete::DeleteSummary;

use crate::config::EditorConfig;
use crate::error::{EditError, OneShotError};
use crate::events::{EditEvent, EventBus, EventType, Handler, ListenerTarget};
use crate::input::{InputEvent, Key};
use crate::interactions::{
    Behavior, BehaviorContext, BehaviorEvent, BehaviorHandle, DrawBehavior, ModifyBehavior,
    SelectBehavior,
};
use crate::map::{FeatureRef, MapView};
use crate::one_shot::OneShotSession;
use crate::selection::SelectionSet;
use crate::services::{LayerRegistry, Notifier, SessionContext};
use crate::snapping::SnapController;
use crate::tool::{ActiveTool, ToolState};
use futures::channel::mpsc;
use parcel_core::boolean::{GeoUnion, UnionStrategy};
use parcel_core::feature::{Feature, FeatureHandle, LayerId};
use parcel_core::geometry::GeometryKind;
use parcel_core::measure::measure;
use parcel_core::snap::SnapConfig;
use parcel_core::style::resolve_style_hex;
use parcel_staging::{ChangeStaging, FeatureData};
use std::collections::HashMap;

pub struct DrawController<S, N, R, C> {
    config: EditorConfig,
    map: MapView,
    snap: SnapController,
    staging: S,
    notifier: N,
    registry: R,
    session: C,
    union: Box<dyn UnionStrategy>,

    active_tool: ActiveTool,
    draw: Option<BehaviorHandle<DrawBehavior>>,
    select: Option<BehaviorHandle<SelectBehavior>>,
    modify: Option<BehaviorHandle<ModifyBehavior>>,
    one_shot: Option<OneShotSession>,

    selection: SelectionSet,
    /// 修改开始时的要素快照
    snapshots: HashMap<FeatureHandle, Feature>,
    /// 参考要素，写入下一个新要素的 `ref_id`
    reference: Option<Feature>,

    bus: EventBus,
}

/// 工具激活时作用的目标
#[derive(Debug, Clone, Copy)]
enum ToolTarget {
    None,
    Layer(LayerId),
    Feature(FeatureRef),
}

impl<S, N, R, C> DrawController<S, N, R, C>
where
    S: ChangeStaging,
    N: Notifier,
    R: LayerRegistry,
    C: SessionContext,
{
    pub fn new(
        config: EditorConfig,
        mut map: MapView,
        staging: S,
        notifier: N,
        registry: R,
        session: C,
    ) -> Self {
        let snap = SnapController::new(
            SnapConfig {
                tolerance: config.snap_tolerance,
                ..SnapConfig::default()
            },
            config.snap_enabled,
        );
        map.listeners_mut()
            .listen(EventType::KeyDown, ListenerTarget::Map, Handler::GlobalEscape);

        Self {
            config,
            map,
            snap,
            staging,
            notifier,
            registry,
            session,
            union: Box::new(GeoUnion),
            active_tool: ActiveTool::None,
            draw: None,
            select: None,
            modify: None,
            one_shot: None,
            selection: SelectionSet::new(),
            snapshots: HashMap::new(),
            reference: None,
            bus: EventBus::new(),
        }
    }

    /// 替换合并实现
    pub fn with_union_strategy(mut self, union: impl UnionStrategy + 'static) -> Self {
        self.union = Box::new(union);
        self
    }

    // ========== 访问器 ==========

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn map(&self) -> &MapView {
        &self.map
    }

    pub fn map_mut(&mut self) -> &mut MapView {
        &mut self.map
    }

    pub fn staging(&self) -> &S {
        &self.staging
    }

    pub fn staging_mut(&mut self) -> &mut S {
        &mut self.staging
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn notifier_mut(&mut self) -> &mut N {
        &mut self.notifier
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut R {
        &mut self.registry
    }

    pub fn snap(&self) -> &SnapController {
        &self.snap
    }

    pub fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    pub fn active_tool(&self) -> ActiveTool {
        self.active_tool
    }

    pub fn reference(&self) -> Option<&Feature> {
        self.reference.as_ref()
    }

    pub fn has_pending_one_shot(&self) -> bool {
        self.one_shot.is_some()
    }

    /// 订阅工具切换和选择变化
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<EditEvent> {
        self.bus.subscribe()
    }

    pub fn state(&self) -> ToolState {
        match self.active_tool {
            ActiveTool::None => ToolState::Idle,
            ActiveTool::Draw { kind } => ToolState::Drawing(kind),
            ActiveTool::Select { multi } => ToolState::Selecting { multi },
            ActiveTool::Modify => {
                let modifying = self
                    .modify
                    .as_ref()
                    .is_some_and(|handle| handle.is_active(&self.map));
                if modifying {
                    ToolState::Modifying
                } else {
                    ToolState::Selecting { multi: false }
                }
            }
            ActiveTool::Merge => ToolState::Merging,
            ActiveTool::Split => ToolState::SplitPending,
        }
    }

    /// 当前交互的提示文本
    pub fn prompt(&self) -> &str {
        if let Some(session) = &self.one_shot {
            return session.handle.behavior.prompt();
        }
        if let Some(draw) = &self.draw {
            return draw.behavior.prompt();
        }
        if let Some(modify) = self.modify.as_ref().filter(|h| h.is_active(&self.map)) {
            return modify.behavior.prompt();
        }
        if let Some(select) = &self.select {
            return select.behavior.prompt();
        }
        "命令:"
    }

    // ========== 工具切换 ==========

    /// 切换当前工具
    ///
    /// 前置条件不满足时给出警告，回到空闲状态并返回错误。
    pub fn set_active_tool(&mut self, tool: ActiveTool) -> Result<(), EditError> {
        let target = match self.resolve_target(tool) {
            Ok(target) => target,
            Err(err) => {
                self.notifier.warning(&err.to_string());
                self.set_idle();
                return Err(err);
            }
        };

        self.deactivate_all();
        self.active_tool = tool;

        match (tool, target) {
            (ActiveTool::Draw { kind }, ToolTarget::Layer(layer)) => self.activate_draw(kind, layer),
            (ActiveTool::Select { multi }, _) => self.activate_select(multi),
            (ActiveTool::Modify, _) => {
                self.activate_select(false);
                self.activate_modify();
            }
            (ActiveTool::Merge, _) => self.activate_select(true),
            (ActiveTool::Split, ToolTarget::Feature(feature)) => self.start_split(feature),
            _ => {}
        }

        tracing::info!("Active tool: {}", tool.name());
        self.bus.publish(EditEvent::ToolChanged(tool));
        Ok(())
    }

    /// 检查前置条件，得到工具作用的目标
    fn resolve_target(&self, tool: ActiveTool) -> Result<ToolTarget, EditError> {
        match tool {
            ActiveTool::Draw { .. } => self.drawing_layer().map(ToolTarget::Layer),
            ActiveTool::Split => self.split_target().map(ToolTarget::Feature),
            _ => Ok(ToolTarget::None),
        }
    }

    fn drawing_layer(&self) -> Result<LayerId, EditError> {
        let layer = self
            .registry
            .current_drawing_layer()
            .ok_or(EditError::NoTargetLayer)?;
        if self.map.layer(layer).is_none() {
            return Err(EditError::UnknownLayer(layer));
        }
        Ok(layer)
    }

    pub(crate) fn set_idle(&mut self) {
        self.deactivate_all();
        if self.active_tool != ActiveTool::None {
            self.active_tool = ActiveTool::None;
            tracing::info!("Active tool: {}", ActiveTool::None.name());
            self.bus.publish(EditEvent::ToolChanged(ActiveTool::None));
        }
    }

    /// 拆除所有交互：先清空并广播选择，再移除行为和监听器
    fn deactivate_all(&mut self) {
        if !self.selection.is_empty() {
            self.selection.clear();
            self.bus.publish(EditEvent::SelectionChanged(Vec::new()));
            self.bus.publish(EditEvent::Deselected);
        }

        if let Some(session) = self.one_shot.take() {
            tracing::debug!("Pending one-shot operation superseded");
            session.release(&mut self.map).fail(OneShotError::Superseded);
        }
        if let Some(handle) = self.draw.take() {
            handle.dispose(&mut self.map);
        }
        self.rollback_modify_drag();
        if let Some(handle) = self.modify.take() {
            handle.dispose(&mut self.map);
        }
        if let Some(handle) = self.select.take() {
            handle.dispose(&mut self.map);
        }
        self.snapshots.clear();
    }

    fn activate_draw(&mut self, kind: GeometryKind, layer: LayerId) {
        self.snap.set_source(&mut self.map, Some(layer));
        self.draw = Some(BehaviorHandle::attach(
            &mut self.map,
            DrawBehavior::new(kind),
            Some(layer),
            &[
                (EventType::DrawEnd, Handler::DrawEnd),
                (EventType::DrawAbort, Handler::DrawAbort),
            ],
        ));
    }

    fn activate_select(&mut self, multi: bool) {
        let source = self.registry.default_interaction_source();
        self.snap.set_source(&mut self.map, source);

        let layers: Vec<LayerId> = self
            .map
            .layer_ids()
            .into_iter()
            .filter(|id| self.registry.is_selectable(*id))
            .collect();
        self.select = Some(BehaviorHandle::attach(
            &mut self.map,
            SelectBehavior::new(multi, layers),
            source,
            &[(EventType::SelectChange, Handler::SelectionTracking)],
        ));
    }

    /// 修改交互只在恰好选中一个要素时激活
    fn activate_modify(&mut self) {
        let source = self.registry.default_interaction_source();
        let handle = BehaviorHandle::attach(
            &mut self.map,
            ModifyBehavior::new(),
            source,
            &[
                (EventType::ModifyStart, Handler::ModifyStart),
                (EventType::ModifyEnd, Handler::ModifyEnd),
            ],
        );
        handle.set_active(&mut self.map, false);
        self.modify = Some(handle);
    }

    pub fn set_snap_enabled(&mut self, enabled: bool) {
        self.snap.set_enabled(&mut self.map, enabled);
    }

    // ========== 输入分发 ==========

    /// 处理一条用户输入
    ///
    /// Escape 交给地图级键盘监听；其余输入交给一次性操作、绘制、选择或修改交互。
    pub fn handle_input(&mut self, input: &InputEvent) {
        self.release_abandoned_one_shot();

        if let InputEvent::Key { key: Key::Escape } = input {
            self.dispatch(ListenerTarget::Map, vec![BehaviorEvent::Key(Key::Escape)]);
            return;
        }

        let mut ctx = BehaviorContext {
            map: &mut self.map,
            snap: &mut self.snap,
            hit_tolerance: self.config.hit_tolerance,
        };

        let (target, events) = if let Some(session) = self.one_shot.as_mut() {
            (session.handle.target(), session.handle.handle_input(&mut ctx, input))
        } else if let Some(draw) = self.draw.as_mut() {
            (draw.target(), draw.handle_input(&mut ctx, input))
        } else {
            match input {
                InputEvent::Click { .. } => match self.select.as_mut() {
                    Some(select) => (select.target(), select.handle_input(&mut ctx, input)),
                    None => return,
                },
                InputEvent::PointerDown { .. }
                | InputEvent::PointerMove { .. }
                | InputEvent::PointerUp { .. } => match self.modify.as_mut() {
                    Some(modify) => (modify.target(), modify.handle_input(&mut ctx, input)),
                    None => return,
                },
                _ => return,
            }
        };

        self.dispatch(target, events);
    }

    /// 按监听器表把行为事件交给处理函数
    fn dispatch(&mut self, target: ListenerTarget, events: Vec<BehaviorEvent>) {
        for event in events {
            let handlers = self.map.listeners().handlers_for(event.event_type(), target);
            for handler in handlers {
                self.run_handler(handler, &event);
            }
        }
    }

    fn run_handler(&mut self, handler: Handler, event: &BehaviorEvent) {
        match (handler, event) {
            (Handler::GlobalEscape, _) => self.on_global_escape(),
            (Handler::DrawEnd, BehaviorEvent::DrawEnd(geometry)) => self.on_draw_end(geometry.clone()),
            (Handler::DrawAbort, _) => self.on_draw_abort(),
            (Handler::SelectionTracking, _) => self.on_selection_changed(),
            (Handler::ModifyStart, BehaviorEvent::ModifyStart(refs)) => self.on_modify_start(refs),
            (Handler::ModifyEnd, BehaviorEvent::ModifyEnd(refs)) => self.on_modify_end(refs),
            (Handler::OneShotEscape, _) => self.cancel_one_shot(),
            (Handler::OneShotResult, event) => self.complete_one_shot(event),
            (handler, event) => {
                tracing::debug!("{:?} ignored {:?}", handler, event.event_type());
            }
        }
    }

    /// 全局 Escape：一次性操作进行中时由它自己处理
    fn on_global_escape(&mut self) {
        if self.one_shot.is_some() || self.active_tool == ActiveTool::Split {
            return;
        }
        if let ActiveTool::Draw { .. } = self.active_tool {
            self.notifier.info("Drawing cancelled");
        }
        self.set_idle();
    }

    // ========== 选择 ==========

    /// 选择变化后重建选择集，更新修改交互
    fn on_selection_changed(&mut self) {
        let refs = self
            .select
            .as_ref()
            .map(|handle| handle.behavior.selected().to_vec())
            .unwrap_or_default();

        let was_empty = self.selection.is_empty();
        self.selection.rebuild(&self.map, &refs);
        self.update_modify_target();

        self.bus
            .publish(EditEvent::SelectionChanged(self.selection.infos().to_vec()));
        if !was_empty && self.selection.is_empty() {
            self.bus.publish(EditEvent::Deselected);
        }
    }

    fn update_modify_target(&mut self) {
        if self.modify.as_ref().map(|h| h.behavior.target()) != Some(self.selection.single()) {
            self.rollback_modify_drag();
        }
        if let Some(modify) = self.modify.as_mut() {
            let target = self.selection.single();
            modify.behavior.set_target(target);
            modify.set_active(&mut self.map, target.is_some());
        }
    }

    /// 拖动中途被打断：把要素恢复为修改前的快照
    fn rollback_modify_drag(&mut self) {
        let Some(target) = self.modify.as_mut().and_then(|h| h.behavior.cancel_drag()) else {
            return;
        };
        let Some(snapshot) = self.snapshots.remove(&target.handle) else {
            tracing::warn!("No snapshot for interrupted drag on {:?}", target.handle);
            return;
        };
        let restored = self.map.update_feature(target, |feature| {
            feature.geometry = snapshot.geometry;
            feature.properties = snapshot.properties;
        });
        if restored.is_some() {
            tracing::info!("Modification of {:?} interrupted, geometry restored", target.handle);
        }
    }

    /// 取消全部选择
    pub fn deselect_all(&mut self) {
        if let Some(select) = self.select.as_mut() {
            select.behavior.clear();
        }
        self.on_selection_changed();
    }

    // ========== 公共辅助 ==========

    /// 补齐新要素的地图 ID、样式和量算值
    fn finish_feature(&self, feature: &mut Feature) {
        feature.assign_map_id();
        let color = self.registry.layer_color(feature.layer_id());
        feature.style = Some(resolve_style_hex(color.as_deref(), feature.kind()));
        let measured = measure(
            &feature.geometry,
            self.map.projection(),
            self.config.area_decimals,
        );
        feature.properties.area = measured.area;
        feature.properties.length = measured.length;
    }

    fn reference_key(&self) -> Option<String> {
        self.reference
            .as_ref()
            .and_then(|f| f.properties.reference_key())
    }

    /// 载入已有要素（已保存的地块、行政区等），不产生暂存变更
    pub fn load_features(&mut self, records: &[FeatureData]) -> Result<usize, EditError> {
        let mut loaded = 0;
        for record in records {
            let mut feature = record.to_feature()?;
            let color = self.registry.layer_color(feature.layer_id());
            feature.style = Some(resolve_style_hex(color.as_deref(), feature.kind()));
            let layer_id = feature.layer_id();
            self.map
                .layer_mut(layer_id)
                .ok_or(EditError::UnknownLayer(layer_id))?
                .add_feature(feature);
            loaded += 1;
        }
        tracing::info!("Loaded {} features", loaded);
        Ok(loaded)
    }
}
