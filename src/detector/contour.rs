// 该文件是 Pinxiang （品相） 项目的一部分。
// src/detector/contour.rs - 轮廓提取与外接矩形
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use image::GrayImage;
use imageproc::{
  contours::{BorderType, Contour, find_contours},
  point::Point,
};
use tracing::debug;

use crate::detector::Region;

/// 从二值掩码中提取最外层轮廓，转换为外接矩形，并丢弃面积低于 `min_area` 的区域。
///
/// 返回顺序即轮廓的发现顺序。
pub fn regions_from_mask(mask: &GrayImage, min_area: f64) -> Vec<Region> {
  let contours: Vec<Contour<i32>> = find_contours(mask);
  debug!("轮廓总数: {}", contours.len());

  contours
    .iter()
    // 只保留最外层轮廓，不进入孔洞
    .filter(|contour| contour.border_type == BorderType::Outer && contour.parent.is_none())
    .filter_map(bounding_region)
    .filter(|region| region.area >= min_area)
    .collect()
}

fn bounding_region(contour: &Contour<i32>) -> Option<Region> {
  let first = contour.points.first()?;
  let (mut x_min, mut y_min, mut x_max, mut y_max) = (first.x, first.y, first.x, first.y);
  for point in &contour.points {
    x_min = x_min.min(point.x);
    y_min = y_min.min(point.y);
    x_max = x_max.max(point.x);
    y_max = y_max.max(point.y);
  }

  Some(Region {
    x: x_min.max(0) as u32,
    y: y_min.max(0) as u32,
    width: (x_max - x_min + 1) as u32,
    height: (y_max - y_min + 1) as u32,
    area: polygon_area(&contour.points),
  })
}

// 鞋带公式，轮廓点按边界顺序排列
fn polygon_area(points: &[Point<i32>]) -> f64 {
  if points.len() < 3 {
    return 0.0;
  }
  let twice: i64 = points
    .iter()
    .zip(points.iter().cycle().skip(1))
    .map(|(a, b)| i64::from(a.x) * i64::from(b.y) - i64::from(b.x) * i64::from(a.y))
    .sum();
  (twice.abs() as f64) / 2.0
}
