// 该文件是 Pinxiang （品相） 项目的一部分。
// src/frame.rs - 归一化 NCHW 帧定义
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

use image::{ImageBuffer, Rgb, RgbImage};

pub const RGB_CHANNELS: usize = 3;

// BT.601 亮度系数，与常见的 RGB 转灰度一致
const LUMA_WEIGHTS: [f32; RGB_CHANNELS] = [0.299, 0.587, 0.114];

/// 平面排列（NCHW）的 RGB 帧，像素值归一化到 [0, 1]
#[derive(Debug, Clone, PartialEq)]
pub struct RgbNchwFrame {
  width: usize,
  height: usize,
  data: Box<[f32]>,
}

impl RgbNchwFrame {
  pub fn with_shape(height: usize, width: usize) -> Self {
    Self {
      width,
      height,
      data: vec![0.0; RGB_CHANNELS * width * height].into_boxed_slice(),
    }
  }

  pub fn height(&self) -> usize {
    self.height
  }

  pub fn width(&self) -> usize {
    self.width
  }

  pub fn channels(&self) -> usize {
    RGB_CHANNELS
  }

  pub fn dimensions(&self) -> (usize, usize) {
    (self.width, self.height)
  }

  pub fn plane_size(&self) -> usize {
    self.width * self.height
  }

  /// 第 `channel` 个通道的像素平面
  pub fn plane(&self, channel: usize) -> &[f32] {
    let size = self.plane_size();
    &self.data[channel * size..(channel + 1) * size]
  }

  /// 亮度投影，结果与单个通道平面同尺寸
  pub fn luma(&self) -> Vec<f32> {
    let (r, g, b) = (self.plane(0), self.plane(1), self.plane(2));
    r.iter()
      .zip(g)
      .zip(b)
      .map(|((&r, &g), &b)| LUMA_WEIGHTS[0] * r + LUMA_WEIGHTS[1] * g + LUMA_WEIGHTS[2] * b)
      .collect()
  }

  pub fn to_rgb_image(&self) -> RgbImage {
    let width = self.width;
    let plane = self.plane_size();
    let to_u8 = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;

    ImageBuffer::from_fn(self.width as u32, self.height as u32, |x, y| {
      let idx = y as usize * width + x as usize;
      Rgb([
        to_u8(self.data[idx]),
        to_u8(self.data[plane + idx]),
        to_u8(self.data[2 * plane + idx]),
      ])
    })
  }
}

impl AsRef<[f32]> for RgbNchwFrame {
  fn as_ref(&self) -> &[f32] {
    &self.data
  }
}

impl AsMut<[f32]> for RgbNchwFrame {
  fn as_mut(&mut self) -> &mut [f32] {
    &mut self.data
  }
}

impl From<&RgbImage> for RgbNchwFrame {
  fn from(image: &RgbImage) -> Self {
    let mut frame = {
      let (width, height) = image.dimensions();
      RgbNchwFrame::with_shape(height as usize, width as usize)
    };

    let width = frame.width();
    let plane = frame.plane_size();
    let slice = frame.as_mut();

    for (x, y, pixel) in image.enumerate_pixels() {
      let idx = y as usize * width + x as usize;
      for c in 0..RGB_CHANNELS {
        slice[c * plane + idx] = f32::from(pixel[c]) / 255.0;
      }
    }
    frame
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn rgb_image_is_normalized_into_planes() {
    let mut image = RgbImage::new(2, 1);
    image.put_pixel(0, 0, Rgb([255, 0, 51]));
    image.put_pixel(1, 0, Rgb([0, 255, 102]));

    let frame = RgbNchwFrame::from(&image);
    assert_eq!(frame.dimensions(), (2, 1));
    assert_eq!(frame.plane(0), &[1.0, 0.0]);
    assert_eq!(frame.plane(1), &[0.0, 1.0]);
    assert!((frame.plane(2)[0] - 0.2).abs() < 1e-6);
    assert!(frame.as_ref().iter().all(|v| (0.0..=1.0).contains(v)));
  }

  #[test]
  fn luma_of_white_is_one() {
    let image = RgbImage::from_pixel(3, 3, Rgb([255, 255, 255]));
    let frame = RgbNchwFrame::from(&image);
    assert!(frame.luma().iter().all(|v| (v - 1.0).abs() < 1e-5));
  }

  #[test]
  fn round_trips_through_rgb_image() {
    let image = RgbImage::from_fn(4, 3, |x, y| Rgb([(x * 60) as u8, (y * 80) as u8, 7]));
    let frame = RgbNchwFrame::from(&image);
    assert_eq!(frame.to_rgb_image(), image);
  }
}
