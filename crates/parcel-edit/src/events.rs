//! 事件监听与广播
//!
//! - `ListenerRegistry`: 地图/交互上的监听器表，按事件类型和目标分发
//! - `EventBus`: 编辑器对外广播（工具切换、选择变化、取消选择）

use crate::map::InteractionId;
use crate::selection::SelectionInfo;
use crate::tool::ActiveTool;
use futures::channel::mpsc;
use std::collections::BTreeMap;

/// 监听的事件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    KeyDown,
    DrawEnd,
    DrawAbort,
    SelectChange,
    ModifyStart,
    ModifyEnd,
}

/// 监听目标
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListenerTarget {
    /// 整个地图（键盘事件）
    Map,
    Interaction(InteractionId),
}

/// 处理函数标识，由控制器解释
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Handler {
    GlobalEscape,
    DrawEnd,
    DrawAbort,
    SelectionTracking,
    ModifyStart,
    ModifyEnd,
    OneShotEscape,
    OneShotResult,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerKey(u64);

#[derive(Debug, Clone, Copy)]
struct Listener {
    event: EventType,
    target: ListenerTarget,
    handler: Handler,
}

/// 监听器表
///
/// 记录峰值数量，用于验证切换工具时先拆后建。
#[derive(Debug, Clone, Default)]
pub struct ListenerRegistry {
    next: u64,
    /// 键按注册顺序递增
    listeners: BTreeMap<ListenerKey, Listener>,
    peak: usize,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn listen(&mut self, event: EventType, target: ListenerTarget, handler: Handler) -> ListenerKey {
        self.next += 1;
        let key = ListenerKey(self.next);
        self.listeners.insert(
            key,
            Listener {
                event,
                target,
                handler,
            },
        );
        self.peak = self.peak.max(self.listeners.len());
        key
    }

    pub fn unlisten(&mut self, key: ListenerKey) -> bool {
        self.listeners.remove(&key).is_some()
    }

    /// 移除一组监听器并清空列表
    pub fn unlisten_all(&mut self, keys: &mut Vec<ListenerKey>) {
        for key in keys.drain(..) {
            self.unlisten(key);
        }
    }

    /// 某个目标上某类事件的处理函数（按注册顺序）
    pub fn handlers_for(&self, event: EventType, target: ListenerTarget) -> Vec<Handler> {
        self.listeners
            .values()
            .filter(|l| l.event == event && l.target == target)
            .map(|l| l.handler)
            .collect()
    }

    pub fn count(&self) -> usize {
        self.listeners.len()
    }

    pub fn count_for(&self, event: EventType) -> usize {
        self.listeners.values().filter(|l| l.event == event).count()
    }

    pub fn count_handler(&self, handler: Handler) -> usize {
        self.listeners.values().filter(|l| l.handler == handler).count()
    }

    pub fn peak(&self) -> usize {
        self.peak
    }

    pub fn reset_peak(&mut self) {
        self.peak = self.listeners.len();
    }
}

/// 编辑器广播事件
#[derive(Debug, Clone, PartialEq)]
pub enum EditEvent {
    ToolChanged(ActiveTool),
    SelectionChanged(Vec<SelectionInfo>),
    /// 选择数量变为 0
    Deselected,
}

/// 广播通道
#[derive(Debug, Default)]
pub struct EventBus {
    subscribers: Vec<mpsc::UnboundedSender<EditEvent>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<EditEvent> {
        let (tx, rx) = mpsc::unbounded();
        self.subscribers.push(tx);
        rx
    }

    /// 发送给所有订阅者，丢弃已关闭的订阅
    pub fn publish(&mut self, event: EditEvent) {
        self.subscribers
            .retain(|tx| tx.unbounded_send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listen_and_dispatch_order() {
        let mut registry = ListenerRegistry::new();
        let target = ListenerTarget::Map;
        let a = registry.listen(EventType::KeyDown, target, Handler::GlobalEscape);
        registry.listen(EventType::KeyDown, target, Handler::OneShotEscape);

        assert_eq!(
            registry.handlers_for(EventType::KeyDown, target),
            vec![Handler::GlobalEscape, Handler::OneShotEscape]
        );
        assert!(registry.unlisten(a));
        assert!(!registry.unlisten(a));
        assert_eq!(registry.count(), 1);
    }

    #[test]
    fn test_peak_tracking() {
        let mut registry = ListenerRegistry::new();
        let mut keys = vec![
            registry.listen(EventType::DrawEnd, ListenerTarget::Map, Handler::DrawEnd),
            registry.listen(EventType::DrawAbort, ListenerTarget::Map, Handler::DrawAbort),
        ];
        registry.unlisten_all(&mut keys);
        assert!(keys.is_empty());
        assert_eq!(registry.peak(), 2);

        registry.reset_peak();
        assert_eq!(registry.peak(), 0);
    }

    #[test]
    fn test_bus_drops_closed_subscribers() {
        let mut bus = EventBus::new();
        let mut rx = bus.subscribe();
        let dropped = bus.subscribe();
        drop(dropped);

        bus.publish(EditEvent::Deselected);
        assert_eq!(bus.subscriber_count(), 1);
        assert_eq!(rx.try_next().unwrap(), Some(EditEvent::Deselected));
    }
}
