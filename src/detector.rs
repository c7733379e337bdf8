// 该文件是 Pinxiang （品相） 项目的一部分。
// src/detector.rs - 差异区域检测
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

use image::{GrayImage, Luma};
use imageproc::{
  contrast::otsu_level,
  distance_transform::Norm,
  morphology::{dilate, erode},
};
use serde::Serialize;
use tracing::debug;

use crate::similarity::DifferenceMap;

mod contour;
pub use self::contour::regions_from_mask;

const REGION_MIN_AREA: f64 = 500.0;
const MORPH_KERNEL_RADIUS: u8 = 2; // 5x5 方形结构元
const MORPH_OPEN_ITERATIONS: usize = 2;
const MORPH_DILATE_ITERATIONS: usize = 1;

/// 轴对齐的差异区域，坐标以差异图像素为单位
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Region {
  pub x: u32,
  pub y: u32,
  pub width: u32,
  pub height: u32,
  /// 轮廓所围面积
  pub area: f64,
}

impl Region {
  pub fn bbox_area(&self) -> u64 {
    u64::from(self.width) * u64::from(self.height)
  }

  pub fn contains(&self, x: u32, y: u32) -> bool {
    x >= self.x && y >= self.y && x < self.x + self.width && y < self.y + self.height
  }

  /// 按比例映射到另一分辨率（例如用户原图）
  pub fn scaled(&self, sx: f32, sy: f32) -> Region {
    let x0 = (self.x as f32 * sx).floor();
    let y0 = (self.y as f32 * sy).floor();
    let x1 = ((self.x + self.width) as f32 * sx).ceil();
    let y1 = ((self.y + self.height) as f32 * sy).ceil();
    Region {
      x: x0 as u32,
      y: y0 as u32,
      width: ((x1 - x0) as u32).max(1),
      height: ((y1 - y0) as u32).max(1),
      area: self.area * f64::from(sx) * f64::from(sy),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionConfig {
  /// 结构元半径，方形边长为 2r+1
  pub kernel_radius: u8,
  pub open_iterations: usize,
  pub dilate_iterations: usize,
  /// 噪声下限：面积低于该值的区域被丢弃
  pub min_area: f64,
}

impl Default for RegionConfig {
  fn default() -> Self {
    Self {
      kernel_radius: MORPH_KERNEL_RADIUS,
      open_iterations: MORPH_OPEN_ITERATIONS,
      dilate_iterations: MORPH_DILATE_ITERATIONS,
      min_area: REGION_MIN_AREA,
    }
  }
}

#[derive(Debug, Clone, Default)]
pub struct DifferenceRegionDetector {
  config: RegionConfig,
}

impl DifferenceRegionDetector {
  pub fn new(config: RegionConfig) -> Self {
    Self { config }
  }

  pub fn config(&self) -> &RegionConfig {
    &self.config
  }

  pub fn detect(&self, difference: &DifferenceMap) -> Vec<Region> {
    // 全图取值一致时 Otsu 阈值无意义，也不存在局部差异
    if difference.is_uniform() {
      debug!("差异图取值一致，无差异区域");
      return Vec::new();
    }

    let mask = self.binarize(difference.as_image());
    let mask = self.clean(mask);
    let regions = regions_from_mask(&mask, self.config.min_area);
    debug!("检测到 {} 个差异区域", regions.len());
    regions
  }

  /// Otsu 自适应阈值，高于阈值的像素为前景（差异）
  pub fn binarize(&self, image: &GrayImage) -> GrayImage {
    let level = otsu_level(image);
    debug!("Otsu 阈值: {}", level);
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
      if image.get_pixel(x, y)[0] > level {
        Luma([255])
      } else {
        Luma([0])
      }
    })
  }

  /// 开运算去除孤立噪点，再膨胀使相邻区域连通
  pub fn clean(&self, mask: GrayImage) -> GrayImage {
    let k = self.config.kernel_radius;
    let mut mask = mask;
    for _ in 0..self.config.open_iterations {
      mask = erode(&mask, Norm::LInf, k);
    }
    for _ in 0..self.config.open_iterations + self.config.dilate_iterations {
      mask = dilate(&mask, Norm::LInf, k);
    }
    mask
  }
}
