//! 空间索引
//!
//! 基于均匀网格，支持：
//! - 范围查询
//! - 点查询（包围盒级别，精确判断由调用方完成）
//! - 最近邻查询

use crate::feature::FeatureHandle;
use crate::math::{BoundingBox2, Point2};
use std::collections::{HashMap, HashSet};

/// 默认网格大小（地图单位）
const DEFAULT_CELL_SIZE: f64 = 100.0;

/// 简单的网格空间索引
#[derive(Debug, Clone)]
pub struct SpatialIndex {
    /// 网格单元大小
    cell_size: f64,

    /// 网格坐标 -> 要素列表
    grid: HashMap<(i64, i64), Vec<FeatureHandle>>,

    /// 要素包围盒缓存
    bboxes: HashMap<FeatureHandle, BoundingBox2>,
}

impl SpatialIndex {
    pub fn new(cell_size: f64) -> Self {
        Self {
            cell_size,
            grid: HashMap::new(),
            bboxes: HashMap::new(),
        }
    }

    /// 使用默认网格大小创建
    pub fn default_grid() -> Self {
        Self::new(DEFAULT_CELL_SIZE)
    }

    fn to_grid_coord(&self, x: f64, y: f64) -> (i64, i64) {
        (
            (x / self.cell_size).floor() as i64,
            (y / self.cell_size).floor() as i64,
        )
    }

    /// 包围盒覆盖的所有网格单元
    fn cells_for_bbox(&self, bbox: &BoundingBox2) -> Vec<(i64, i64)> {
        if bbox.is_empty() {
            return Vec::new();
        }
        let (min_gx, min_gy) = self.to_grid_coord(bbox.min.x, bbox.min.y);
        let (max_gx, max_gy) = self.to_grid_coord(bbox.max.x, bbox.max.y);

        let mut cells = Vec::new();
        for gx in min_gx..=max_gx {
            for gy in min_gy..=max_gy {
                cells.push((gx, gy));
            }
        }
        cells
    }

    /// 插入要素（已存在时先移除旧记录）
    pub fn insert(&mut self, handle: FeatureHandle, bbox: BoundingBox2) {
        self.remove(&handle);

        for cell in self.cells_for_bbox(&bbox) {
            self.grid.entry(cell).or_default().push(handle);
        }

        self.bboxes.insert(handle, bbox);
    }

    pub fn remove(&mut self, handle: &FeatureHandle) -> bool {
        let Some(bbox) = self.bboxes.remove(handle) else {
            return false;
        };
        for cell in self.cells_for_bbox(&bbox) {
            if let Some(handles) = self.grid.get_mut(&cell) {
                handles.retain(|h| h != handle);
                if handles.is_empty() {
                    self.grid.remove(&cell);
                }
            }
        }
        true
    }

    pub fn update(&mut self, handle: FeatureHandle, new_bbox: BoundingBox2) {
        self.insert(handle, new_bbox);
    }

    /// 范围查询：与指定矩形相交的所有要素
    pub fn query_rect(&self, rect: &BoundingBox2) -> Vec<FeatureHandle> {
        let mut result = Vec::new();
        let mut seen = HashSet::new();

        for cell in self.cells_for_bbox(rect) {
            let Some(handles) = self.grid.get(&cell) else {
                continue;
            };
            for handle in handles {
                if seen.insert(*handle)
                    && self.bboxes.get(handle).is_some_and(|b| b.intersects(rect))
                {
                    result.push(*handle);
                }
            }
        }

        result
    }

    /// 点查询：包围盒包含该点的所有要素
    pub fn query_point(&self, point: &Point2) -> Vec<FeatureHandle> {
        let cell = self.to_grid_coord(point.x, point.y);

        self.grid
            .get(&cell)
            .map(|handles| {
                handles
                    .iter()
                    .filter(|h| self.bboxes.get(*h).is_some_and(|b| b.contains(point)))
                    .copied()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// 包围盒中心离指定点最近的要素
    pub fn query_nearest(&self, point: &Point2, max_distance: f64) -> Option<FeatureHandle> {
        let search = BoundingBox2::around(point, max_distance);

        self.query_rect(&search)
            .into_iter()
            .filter_map(|handle| {
                self.bboxes
                    .get(&handle)
                    .map(|bbox| (handle, (bbox.center() - point).norm()))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(handle, _)| handle)
    }

    pub fn clear(&mut self) {
        self.grid.clear();
        self.bboxes.clear();
    }

    pub fn len(&self) -> usize {
        self.bboxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bboxes.is_empty()
    }

    pub fn get_bbox(&self, handle: &FeatureHandle) -> Option<&BoundingBox2> {
        self.bboxes.get(handle)
    }
}

impl Default for SpatialIndex {
    fn default() -> Self {
        Self::default_grid()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spatial_index() {
        let mut index = SpatialIndex::new(10.0);

        let h1 = FeatureHandle::next();
        let h2 = FeatureHandle::next();
        let h3 = FeatureHandle::next();

        index.insert(h1, BoundingBox2::new(Point2::new(0.0, 0.0), Point2::new(5.0, 5.0)));
        index.insert(h2, BoundingBox2::new(Point2::new(10.0, 10.0), Point2::new(15.0, 15.0)));
        index.insert(
            h3,
            BoundingBox2::new(Point2::new(100.0, 100.0), Point2::new(105.0, 105.0)),
        );

        let result = index.query_rect(&BoundingBox2::new(
            Point2::new(0.0, 0.0),
            Point2::new(20.0, 20.0),
        ));

        assert_eq!(result.len(), 2);
        assert!(result.contains(&h1));
        assert!(result.contains(&h2));
        assert!(!result.contains(&h3));
    }

    #[test]
    fn test_update_moves_entry() {
        let mut index = SpatialIndex::new(10.0);
        let h = FeatureHandle::next();

        index.insert(h, BoundingBox2::new(Point2::new(0.0, 0.0), Point2::new(1.0, 1.0)));
        index.update(h, BoundingBox2::new(Point2::new(50.0, 50.0), Point2::new(51.0, 51.0)));

        assert!(index.query_point(&Point2::new(0.5, 0.5)).is_empty());
        assert_eq!(index.query_point(&Point2::new(50.5, 50.5)), vec![h]);
        assert_eq!(index.len(), 1);

        assert!(index.remove(&h));
        assert!(!index.remove(&h));
        assert!(index.is_empty());
    }

    #[test]
    fn test_query_nearest() {
        let mut index = SpatialIndex::new(10.0);
        let near = FeatureHandle::next();
        let far = FeatureHandle::next();
        index.insert(near, BoundingBox2::new(Point2::new(0.0, 0.0), Point2::new(2.0, 2.0)));
        index.insert(far, BoundingBox2::new(Point2::new(8.0, 8.0), Point2::new(10.0, 10.0)));

        assert_eq!(index.query_nearest(&Point2::new(2.0, 2.0), 20.0), Some(near));
        assert_eq!(index.query_nearest(&Point2::new(100.0, 100.0), 5.0), None);
    }
}
