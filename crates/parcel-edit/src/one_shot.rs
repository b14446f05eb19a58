//! 一次性操作
//!
//! 拾取一个要素或临时画一条线。每次操作创建临时交互和临时 Escape 监听，
//! 无论成功、取消还是被取代，结束时都整体移除。
//! 结果通过 `futures::channel::oneshot` 交付给调用方。

use crate::error::OneShotError;
use crate::events::{EventType, Handler};
use crate::input::InputEvent;
use crate::interactions::{
    Behavior, BehaviorContext, BehaviorEvent, BehaviorHandle, DrawBehavior, PickBehavior,
};
use crate::map::{FeatureRef, InteractionKind, MapView};
use futures::channel::oneshot;
use parcel_core::feature::{Feature, LayerId};
use parcel_core::geometry::{GeometryKind, LineString};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

type ResultSender<T> = oneshot::Sender<Result<T, OneShotError>>;

/// 一次性操作的结果
///
/// 发送端被丢弃（会话异常结束）时解析为 `Cancelled`。
#[derive(Debug)]
pub struct OneShot<T> {
    rx: oneshot::Receiver<Result<T, OneShotError>>,
}

impl<T> OneShot<T> {
    pub(crate) fn channel() -> (ResultSender<T>, Self) {
        let (tx, rx) = oneshot::channel();
        (tx, Self { rx })
    }

    /// 立即失败的操作
    pub(crate) fn failed(err: OneShotError) -> Self {
        let (tx, one_shot) = Self::channel();
        // 接收端就在这里，发送不会失败
        let _ = tx.send(Err(err));
        one_shot
    }

    /// 非阻塞地查看结果，尚未结束时返回 `None`
    pub fn try_result(&mut self) -> Option<Result<T, OneShotError>> {
        match self.rx.try_recv() {
            Ok(result) => result,
            Err(oneshot::Canceled) => Some(Err(OneShotError::Cancelled)),
        }
    }
}

impl<T> Future for OneShot<T> {
    type Output = Result<T, OneShotError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(oneshot::Canceled)) => Poll::Ready(Err(OneShotError::Cancelled)),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// 临时交互的行为
#[derive(Debug, Clone)]
pub enum OneShotBehavior {
    Pick(PickBehavior),
    Line(DrawBehavior),
}

impl OneShotBehavior {
    pub fn line() -> Self {
        OneShotBehavior::Line(DrawBehavior::new(GeometryKind::LineString))
    }

    fn handlers(&self) -> &'static [(EventType, Handler)] {
        match self {
            OneShotBehavior::Pick(_) => &[(EventType::SelectChange, Handler::OneShotResult)],
            OneShotBehavior::Line(_) => &[
                (EventType::DrawEnd, Handler::OneShotResult),
                (EventType::DrawAbort, Handler::OneShotEscape),
            ],
        }
    }
}

impl Behavior for OneShotBehavior {
    fn kind(&self) -> InteractionKind {
        InteractionKind::OneShot
    }

    fn reset(&mut self) {
        match self {
            OneShotBehavior::Pick(pick) => pick.reset(),
            OneShotBehavior::Line(draw) => draw.reset(),
        }
    }

    fn handle_input(&mut self, ctx: &mut BehaviorContext<'_>, input: &InputEvent) -> Vec<BehaviorEvent> {
        match self {
            OneShotBehavior::Pick(pick) => pick.handle_input(ctx, input),
            OneShotBehavior::Line(draw) => draw.handle_input(ctx, input),
        }
    }

    fn prompt(&self) -> &str {
        match self {
            OneShotBehavior::Pick(pick) => pick.prompt(),
            OneShotBehavior::Line(_) => "绘制临时线 (Enter 完成, Esc 取消):",
        }
    }
}

/// 操作结束时如何交付结果
#[derive(Debug)]
pub(crate) enum Completion {
    Pick {
        tx: ResultSender<Feature>,
        /// 拾取结果作为后续绘制/合并的参考要素
        reference: bool,
    },
    Line {
        tx: ResultSender<LineString>,
    },
    /// 分割线，由控制器直接消费
    Split { target: FeatureRef },
}

impl Completion {
    /// 调用方已丢弃结果
    pub(crate) fn is_abandoned(&self) -> bool {
        match self {
            Completion::Pick { tx, .. } => tx.is_canceled(),
            Completion::Line { tx } => tx.is_canceled(),
            Completion::Split { .. } => false,
        }
    }

    pub(crate) fn fail(self, err: OneShotError) {
        let delivered = match self {
            Completion::Pick { tx, .. } => tx.send(Err(err)).is_ok(),
            Completion::Line { tx } => tx.send(Err(err)).is_ok(),
            Completion::Split { .. } => true,
        };
        if !delivered {
            tracing::debug!("One-shot receiver already dropped");
        }
    }
}

/// 进行中的一次性操作
#[derive(Debug)]
pub(crate) struct OneShotSession {
    pub(crate) handle: BehaviorHandle<OneShotBehavior>,
    pub(crate) completion: Completion,
}

impl OneShotSession {
    /// 挂上临时交互和临时 Escape 监听
    pub(crate) fn start(
        map: &mut MapView,
        behavior: OneShotBehavior,
        source: Option<LayerId>,
        completion: Completion,
    ) -> Self {
        let handlers = behavior.handlers();
        let mut handle = BehaviorHandle::attach(map, behavior, source, handlers);
        handle.listen_map(map, EventType::KeyDown, Handler::OneShotEscape);
        Self { handle, completion }
    }

    pub(crate) fn is_abandoned(&self) -> bool {
        self.completion.is_abandoned()
    }

    /// 移除临时交互和监听，交出结果通道
    pub(crate) fn release(self, map: &mut MapView) -> Completion {
        self.handle.dispose(map);
        self.completion
    }
}
