//! 编辑器依赖的外部服务
//!
//! - `Notifier`: 用户提示
//! - `LayerRegistry`: 图层配置（当前绘制图层、颜色、可选择性）
//! - `SessionContext`: 当前用户

use parcel_core::feature::LayerId;
use serde::{Deserialize, Serialize};

/// 提示级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// 一条用户提示
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

/// 提示输出
pub trait Notifier {
    fn notify(&mut self, level: NoticeLevel, message: &str);

    fn info(&mut self, message: &str) {
        self.notify(NoticeLevel::Info, message);
    }

    fn success(&mut self, message: &str) {
        self.notify(NoticeLevel::Success, message);
    }

    fn warning(&mut self, message: &str) {
        self.notify(NoticeLevel::Warning, message);
    }

    fn error(&mut self, message: &str) {
        self.notify(NoticeLevel::Error, message);
    }
}

/// 记录所有提示，同时写入日志
#[derive(Debug, Clone, Default)]
pub struct NotificationLog {
    notices: Vec<Notice>,
}

impl NotificationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn count(&self, level: NoticeLevel) -> usize {
        self.notices.iter().filter(|n| n.level == level).count()
    }

    pub fn last(&self) -> Option<&Notice> {
        self.notices.last()
    }

    pub fn len(&self) -> usize {
        self.notices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notices.is_empty()
    }

    pub fn clear(&mut self) {
        self.notices.clear();
    }
}

impl Notifier for NotificationLog {
    fn notify(&mut self, level: NoticeLevel, message: &str) {
        match level {
            NoticeLevel::Info | NoticeLevel::Success => tracing::info!("{message}"),
            NoticeLevel::Warning => tracing::warn!("{message}"),
            NoticeLevel::Error => tracing::error!("{message}"),
        }
        self.notices.push(Notice {
            level,
            message: message.to_string(),
        });
    }
}

/// 图层配置查询
pub trait LayerRegistry {
    /// 当前绘制目标图层
    fn current_drawing_layer(&self) -> Option<LayerId>;

    /// 图层颜色（十六进制）
    fn layer_color(&self, layer: LayerId) -> Option<String>;

    /// 修改、捕捉等交互的默认图层
    fn default_interaction_source(&self) -> Option<LayerId>;

    fn is_selectable(&self, _layer: LayerId) -> bool {
        true
    }
}

/// 图层条目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerEntry {
    pub id: LayerId,
    pub name: String,
    pub color: Option<String>,
    #[serde(default = "default_selectable")]
    pub selectable: bool,
}

fn default_selectable() -> bool {
    true
}

/// 内存中的图层目录
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerCatalog {
    pub layers: Vec<LayerEntry>,
    pub drawing_layer: Option<LayerId>,
    pub default_source: Option<LayerId>,
}

impl LayerCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_layer(mut self, id: LayerId, name: &str, color: Option<&str>) -> Self {
        self.layers.push(LayerEntry {
            id,
            name: name.to_string(),
            color: color.map(str::to_string),
            selectable: true,
        });
        self
    }

    pub fn entry(&self, id: LayerId) -> Option<&LayerEntry> {
        self.layers.iter().find(|l| l.id == id)
    }

    pub fn set_drawing_layer(&mut self, layer: Option<LayerId>) {
        self.drawing_layer = layer;
    }

    pub fn set_default_source(&mut self, layer: Option<LayerId>) {
        self.default_source = layer;
    }

    pub fn set_selectable(&mut self, id: LayerId, selectable: bool) {
        if let Some(entry) = self.layers.iter_mut().find(|l| l.id == id) {
            entry.selectable = selectable;
        }
    }
}

impl LayerRegistry for LayerCatalog {
    fn current_drawing_layer(&self) -> Option<LayerId> {
        self.drawing_layer
    }

    fn layer_color(&self, layer: LayerId) -> Option<String> {
        self.entry(layer).and_then(|l| l.color.clone())
    }

    fn default_interaction_source(&self) -> Option<LayerId> {
        self.default_source.or(self.drawing_layer)
    }

    fn is_selectable(&self, layer: LayerId) -> bool {
        self.entry(layer).is_some_and(|l| l.selectable)
    }
}

/// 会话上下文
pub trait SessionContext {
    /// 写入新要素的用户 ID
    fn user_id(&self) -> Option<i64>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSession {
    pub user_id: Option<i64>,
}

impl SessionContext for UserSession {
    fn user_id(&self) -> Option<i64> {
        self.user_id
    }
}
