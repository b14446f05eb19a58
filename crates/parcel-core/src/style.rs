//! 样式解析
//!
//! 图层颜色 + 几何类型 -> 绘制样式，纯函数，无状态。

use crate::error::CoreError;
use crate::geometry::GeometryKind;
use serde::{Deserialize, Serialize};

/// RGBA 颜色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    /// 图层未配置颜色时使用
    pub const DEFAULT: Color = Color::rgb(0x33, 0x99, 0xcc);
    pub const WHITE: Color = Color::rgb(0xff, 0xff, 0xff);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }

    /// 解析 `#rrggbb` / `#rgb`（`#` 可省略）
    pub fn from_hex(hex: &str) -> Result<Self, CoreError> {
        let digits = hex.trim().trim_start_matches('#');
        let invalid = || CoreError::InvalidColor(hex.to_string());
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }

        let expanded: String = match digits.len() {
            3 => digits.chars().flat_map(|c| [c, c]).collect(),
            6 => digits.to_string(),
            _ => return Err(invalid()),
        };

        let channel = |i: usize| u8::from_str_radix(&expanded[i..i + 2], 16).map_err(|_| invalid());
        Ok(Self::rgb(channel(0)?, channel(2)?, channel(4)?))
    }

    /// 输出 `#rrggbb`（忽略透明度）
    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// 绘制样式
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Style {
    pub stroke: Color,
    pub stroke_width: f64,
    pub fill: Option<Color>,
    /// 点符号半径
    pub point_radius: Option<f64>,
}

/// 面填充透明度
const POLYGON_FILL_ALPHA: u8 = 0x33;

/// 根据图层颜色和几何类型解析样式
pub fn resolve_style(color: Color, kind: GeometryKind) -> Style {
    match kind {
        GeometryKind::Point => Style {
            stroke: Color::WHITE,
            stroke_width: 1.5,
            fill: Some(color),
            point_radius: Some(6.0),
        },
        GeometryKind::LineString => Style {
            stroke: color,
            stroke_width: 3.0,
            fill: None,
            point_radius: None,
        },
        GeometryKind::Polygon | GeometryKind::MultiPolygon => Style {
            stroke: color,
            stroke_width: 2.0,
            fill: Some(color.with_alpha(POLYGON_FILL_ALPHA)),
            point_radius: None,
        },
    }
}

/// 从十六进制颜色解析样式，颜色无效时回退到默认颜色
pub fn resolve_style_hex(hex: Option<&str>, kind: GeometryKind) -> Style {
    let color = match hex.map(Color::from_hex) {
        Some(Ok(color)) => color,
        Some(Err(e)) => {
            tracing::warn!("{e}, falling back to default layer color");
            Color::DEFAULT
        }
        None => Color::DEFAULT,
    };
    resolve_style(color, kind)
}
