//! 地图交互行为
//!
//! 每个交互是一个独立的状态机，接收输入事件并产出行为事件；
//! 由 `BehaviorHandle` 挂到地图上（交互 + 监听器），用完整体销毁。

mod draw;
mod modify;
mod select;

pub use draw::DrawBehavior;
pub use modify::ModifyBehavior;
pub use select::{PickBehavior, SelectBehavior};

use crate::events::{EventType, Handler, ListenerKey, ListenerTarget};
use crate::input::{InputEvent, Key};
use crate::map::{FeatureRef, InteractionId, InteractionKind, MapView};
use crate::snapping::SnapController;
use parcel_core::feature::LayerId;
use parcel_core::geometry::Geometry;

/// 行为运行时上下文
pub struct BehaviorContext<'a> {
    pub map: &'a mut MapView,
    pub snap: &'a mut SnapController,
    /// 命中容差（地图单位）
    pub hit_tolerance: f64,
}

/// 行为产出的事件
#[derive(Debug, Clone, PartialEq)]
pub enum BehaviorEvent {
    DrawEnd(Geometry),
    DrawAbort,
    SelectChange {
        added: Vec<FeatureRef>,
        removed: Vec<FeatureRef>,
    },
    /// 修改开始前的要素（尚未改动）
    ModifyStart(Vec<FeatureRef>),
    /// 修改结束，列出几何已改变的要素
    ModifyEnd(Vec<FeatureRef>),
    Key(Key),
}

impl BehaviorEvent {
    pub fn event_type(&self) -> EventType {
        match self {
            BehaviorEvent::DrawEnd(_) => EventType::DrawEnd,
            BehaviorEvent::DrawAbort => EventType::DrawAbort,
            BehaviorEvent::SelectChange { .. } => EventType::SelectChange,
            BehaviorEvent::ModifyStart(_) => EventType::ModifyStart,
            BehaviorEvent::ModifyEnd(_) => EventType::ModifyEnd,
            BehaviorEvent::Key(_) => EventType::KeyDown,
        }
    }
}

/// 交互行为接口
pub trait Behavior {
    fn kind(&self) -> InteractionKind;

    /// 重置内部状态
    fn reset(&mut self);

    fn handle_input(&mut self, ctx: &mut BehaviorContext<'_>, input: &InputEvent) -> Vec<BehaviorEvent>;

    /// 当前状态的提示文本
    fn prompt(&self) -> &str;
}

/// 挂在地图上的行为：交互 + 监听器
///
/// 每次激活创建一个新的 handle，停用时 `dispose` 整体移除。
#[derive(Debug)]
pub struct BehaviorHandle<B> {
    interaction: InteractionId,
    listeners: Vec<ListenerKey>,
    pub behavior: B,
}

impl<B: Behavior> BehaviorHandle<B> {
    /// 注册交互及其事件监听
    pub fn attach(
        map: &mut MapView,
        behavior: B,
        source: Option<LayerId>,
        handlers: &[(EventType, Handler)],
    ) -> Self {
        let interaction = map.add_interaction(behavior.kind(), source);
        let target = ListenerTarget::Interaction(interaction);
        let listeners = handlers
            .iter()
            .map(|(event, handler)| map.listeners_mut().listen(*event, target, *handler))
            .collect();
        Self {
            interaction,
            listeners,
            behavior,
        }
    }

    /// 额外监听地图级事件（随 handle 一起移除）
    pub fn listen_map(&mut self, map: &mut MapView, event: EventType, handler: Handler) {
        let key = map.listeners_mut().listen(event, ListenerTarget::Map, handler);
        self.listeners.push(key);
    }

    pub fn interaction(&self) -> InteractionId {
        self.interaction
    }

    pub fn target(&self) -> ListenerTarget {
        ListenerTarget::Interaction(self.interaction)
    }

    pub fn set_active(&self, map: &mut MapView, active: bool) {
        map.set_interaction_active(self.interaction, active);
    }

    pub fn is_active(&self, map: &MapView) -> bool {
        map.interaction(self.interaction).is_some_and(|i| i.active)
    }

    /// 交给行为处理输入；交互未激活时忽略
    pub fn handle_input(&mut self, ctx: &mut BehaviorContext<'_>, input: &InputEvent) -> Vec<BehaviorEvent> {
        if !self.is_active(ctx.map) {
            return Vec::new();
        }
        self.behavior.handle_input(ctx, input)
    }

    /// 移除监听器和交互
    pub fn dispose(mut self, map: &mut MapView) -> B {
        map.listeners_mut().unlisten_all(&mut self.listeners);
        map.remove_interaction(self.interaction);
        self.behavior.reset();
        self.behavior
    }
}
