//! 编辑器配置

use parcel_core::feature::LayerId;
use parcel_core::measure::Projection;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// 视图投影，决定面积/长度的量算方式
    pub projection: Projection,
    /// 捕捉容差（地图单位）
    pub snap_tolerance: f64,
    /// 点击命中容差（地图单位）
    pub hit_tolerance: f64,
    /// 面积/长度保留的小数位
    pub area_decimals: u32,
    /// 行政区图层
    pub boundary_layer: Option<LayerId>,
    /// 点/线要素是否也查询所属行政区
    pub boundary_lookup_for_points_and_lines: bool,
    /// 启动时是否开启捕捉
    pub snap_enabled: bool,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            projection: Projection::Planar,
            snap_tolerance: 1.0,
            hit_tolerance: 0.5,
            area_decimals: 4,
            boundary_layer: None,
            boundary_lookup_for_points_and_lines: false,
            snap_enabled: true,
        }
    }
}

impl EditorConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn load(path: &Path) -> Result<Self, std::io::Error> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text).map_err(std::io::Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = EditorConfig::from_json(r#"{"projection":"web_mercator","boundary_layer":9}"#)
            .unwrap();
        assert_eq!(config.projection, Projection::WebMercator);
        assert_eq!(config.boundary_layer, Some(9));
        assert_eq!(config.area_decimals, 4);
        assert!(!config.boundary_lookup_for_points_and_lines);
    }

    #[test]
    fn test_unknown_projection_rejected() {
        assert!(EditorConfig::from_json(r#"{"projection":"lambert"}"#).is_err());
    }
}
