//! 输入事件

use parcel_core::math::Point2;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Key {
    Escape,
    Enter,
    Backspace,
}

/// 地图坐标下的用户输入
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputEvent {
    PointerMove { at: Point2 },
    PointerDown { at: Point2 },
    PointerUp { at: Point2 },
    /// `toggle` 对应按住 Shift 点击
    Click {
        at: Point2,
        #[serde(default)]
        toggle: bool,
    },
    DoubleClick { at: Point2 },
    Key { key: Key },
}

impl InputEvent {
    pub fn click(x: f64, y: f64) -> Self {
        InputEvent::Click {
            at: Point2::new(x, y),
            toggle: false,
        }
    }

    pub fn key(key: Key) -> Self {
        InputEvent::Key { key }
    }
}
