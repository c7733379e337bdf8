// 该文件是 Pinxiang （品相） 项目的一部分。
// src/output/draw.rs - 差异区域可视化
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use image::{Rgb, RgbImage};
use imageproc::{drawing::draw_hollow_rect_mut, rect::Rect};

use crate::detector::Region;

const REGION_COLOR: [u8; 3] = [255, 0, 0]; // 红色
const REGION_THICKNESS: u32 = 2;

pub struct Draw {
  color: [u8; 3],
  thickness: u32,
}

impl Default for Draw {
  fn default() -> Self {
    Self {
      color: REGION_COLOR,
      thickness: REGION_THICKNESS,
    }
  }
}

impl Draw {
  pub fn new(color: [u8; 3], thickness: u32) -> Self {
    Self {
      color,
      thickness: thickness.max(1),
    }
  }

  // 在图像上绘制矩形边框，超出图像的部分被裁剪
  fn draw_region(&self, image: &mut RgbImage, region: &Region) {
    let (w, h) = (image.width(), image.height());
    if region.x >= w || region.y >= h {
      return;
    }

    let width = region.width.min(w - region.x);
    let height = region.height.min(h - region.y);
    if width == 0 || height == 0 {
      return;
    }

    // 逐层向内绘制以加粗边框
    for t in 0..self.thickness {
      if 2 * t >= width || 2 * t >= height {
        break;
      }
      let rect = Rect::at((region.x + t) as i32, (region.y + t) as i32)
        .of_size(width - 2 * t, height - 2 * t);
      draw_hollow_rect_mut(image, rect, Rgb(self.color));
    }
  }
}

pub trait DrawRegionsOnImage {
  fn draw_regions_on_image(&self, image: &mut RgbImage, regions: &[Region]);

  /// 在副本上绘制，原图保持不变
  fn annotate(&self, image: &RgbImage, regions: &[Region]) -> RgbImage {
    let mut annotated = image.clone();
    self.draw_regions_on_image(&mut annotated, regions);
    annotated
  }
}

impl DrawRegionsOnImage for Draw {
  fn draw_regions_on_image(&self, image: &mut RgbImage, regions: &[Region]) {
    for region in regions {
      self.draw_region(image, region);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn region(x: u32, y: u32, width: u32, height: u32) -> Region {
    Region {
      x,
      y,
      width,
      height,
      area: f64::from(width * height),
    }
  }

  #[test]
  fn annotate_draws_outline_on_a_copy() {
    let image = RgbImage::from_pixel(50, 50, Rgb([10, 20, 30]));
    let annotated = Draw::default().annotate(&image, &[region(10, 10, 20, 20)]);

    assert_eq!(image.get_pixel(10, 10), &Rgb([10, 20, 30]));
    assert_eq!(annotated.get_pixel(10, 10), &Rgb(REGION_COLOR));
    assert_eq!(annotated.get_pixel(11, 11), &Rgb(REGION_COLOR));
    assert_eq!(annotated.get_pixel(29, 20), &Rgb(REGION_COLOR));
    // 内部不填充
    assert_eq!(annotated.get_pixel(20, 20), &Rgb([10, 20, 30]));
  }

  #[test]
  fn regions_past_the_border_are_clipped() {
    let image = RgbImage::new(20, 20);
    let annotated =
      Draw::default().annotate(&image, &[region(15, 15, 30, 30), region(40, 2, 5, 5)]);
    assert_eq!(annotated.get_pixel(15, 15), &Rgb(REGION_COLOR));
    assert_eq!(annotated.get_pixel(19, 19), &Rgb(REGION_COLOR));
  }

  #[test]
  fn no_regions_leaves_image_unchanged() {
    let image = RgbImage::from_pixel(8, 8, Rgb([1, 2, 3]));
    assert_eq!(Draw::new([0, 255, 0], 3).annotate(&image, &[]), image);
  }
}
