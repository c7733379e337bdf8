// 该文件是 Pinxiang （品相） 项目的一部分。
// src/input.rs - 图像输入与解码
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

use std::io::Cursor;

use image::{ImageReader, Limits, RgbImage, imageops::FilterType};
use thiserror::Error;
use tracing::{debug, warn};

use crate::frame::RgbNchwFrame;

mod read_image_file;
pub use self::read_image_file::ImageFileInput;

#[derive(Error, Debug)]
pub enum ImageLoadError {
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("图像解码错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("输入为空")]
  EmptyInput,
  #[error("图像尺寸为零: {width}x{height}")]
  ZeroSized { width: u32, height: u32 },
}

/// 解码限制，避免单个请求的开销无上限
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputLimits {
  pub max_width: u32,
  pub max_height: u32,
  pub max_alloc: u64,
}

impl Default for InputLimits {
  fn default() -> Self {
    Self {
      max_width: 8192,
      max_height: 8192,
      max_alloc: 256 * 1024 * 1024,
    }
  }
}

impl From<InputLimits> for Limits {
  fn from(value: InputLimits) -> Self {
    let mut limits = Limits::default();
    limits.max_image_width = Some(value.max_width);
    limits.max_image_height = Some(value.max_height);
    limits.max_alloc = Some(value.max_alloc);
    limits
  }
}

/// 解码后的图像：原始分辨率的 RGB 图像，以及缩放到目标分辨率的归一化帧
#[derive(Debug, Clone)]
pub struct LoadedImage {
  pub original: RgbImage,
  pub frame: RgbNchwFrame,
}

impl LoadedImage {
  /// 目标分辨率坐标到原始分辨率坐标的缩放系数 (sx, sy)
  pub fn scale_to_original(&self) -> (f32, f32) {
    (
      self.original.width() as f32 / self.frame.width() as f32,
      self.original.height() as f32 / self.frame.height() as f32,
    )
  }
}

#[derive(Debug, Clone)]
pub struct ImageLoader {
  width: u32,
  height: u32,
  filter: FilterType,
  limits: InputLimits,
}

impl ImageLoader {
  pub fn new(width: u32, height: u32) -> Result<Self, ImageLoadError> {
    if width == 0 || height == 0 {
      return Err(ImageLoadError::ZeroSized { width, height });
    }
    Ok(Self {
      width,
      height,
      filter: FilterType::Nearest,
      limits: InputLimits::default(),
    })
  }

  pub fn with_filter(mut self, filter: FilterType) -> Self {
    self.filter = filter;
    self
  }

  pub fn with_limits(mut self, limits: InputLimits) -> Self {
    self.limits = limits;
    self
  }

  pub fn resolution(&self) -> (u32, u32) {
    (self.width, self.height)
  }

  /// 按原始分辨率解码
  pub fn decode(&self, bytes: &[u8]) -> Result<RgbImage, ImageLoadError> {
    decode_with_limits(bytes, self.limits)
  }

  pub fn load_bytes(&self, bytes: &[u8]) -> Result<LoadedImage, ImageLoadError> {
    let original = self.decode(bytes)?;
    self.load_image(original)
  }

  /// 将已解码的图像缩放到目标分辨率并归一化
  pub fn load_image(&self, original: RgbImage) -> Result<LoadedImage, ImageLoadError> {
    let resized = align_to(&original, self.width, self.height, self.filter)?;
    let frame = RgbNchwFrame::from(&resized);
    Ok(LoadedImage { original, frame })
  }
}

/// 在解码限制内按原始分辨率解码为 RGB 图像
pub fn decode_with_limits(bytes: &[u8], limits: InputLimits) -> Result<RgbImage, ImageLoadError> {
  if bytes.is_empty() {
    warn!("输入图像数据为空");
    return Err(ImageLoadError::EmptyInput);
  }

  let mut reader = ImageReader::new(Cursor::new(bytes)).with_guessed_format()?;
  reader.limits(limits.into());
  let image = reader.decode()?;

  let (width, height) = (image.width(), image.height());
  if width == 0 || height == 0 {
    return Err(ImageLoadError::ZeroSized { width, height });
  }
  debug!("图像解码完成: {}x{}", width, height);

  Ok(image.to_rgb8())
}

/// 将 `image` 重采样到给定尺寸；尺寸一致时直接复制
pub fn align_to(
  image: &RgbImage,
  width: u32,
  height: u32,
  filter: FilterType,
) -> Result<RgbImage, ImageLoadError> {
  if image.width() == 0 || image.height() == 0 {
    return Err(ImageLoadError::ZeroSized {
      width: image.width(),
      height: image.height(),
    });
  }
  if width == 0 || height == 0 {
    return Err(ImageLoadError::ZeroSized { width, height });
  }

  if image.dimensions() == (width, height) {
    return Ok(image.clone());
  }

  debug!(
    "重采样图像: {}x{} -> {}x{}",
    image.width(),
    image.height(),
    width,
    height
  );
  Ok(image::imageops::resize(image, width, height, filter))
}

#[cfg(test)]
pub(crate) mod tests {
  use super::*;
  use image::{DynamicImage, ImageFormat, Rgb};

  pub(crate) fn encode_png(image: &RgbImage) -> Vec<u8> {
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(image.clone())
      .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
      .unwrap();
    bytes
  }

  #[test]
  fn decodes_and_resizes_to_target_resolution() {
    let image = RgbImage::from_fn(40, 20, |x, y| Rgb([x as u8 * 5, y as u8 * 10, 128]));
    let loader = ImageLoader::new(16, 16).unwrap();

    let loaded = loader.load_bytes(&encode_png(&image)).unwrap();
    assert_eq!(loaded.original.dimensions(), (40, 20));
    assert_eq!(loaded.frame.dimensions(), (16, 16));
    assert!(loaded.frame.as_ref().iter().all(|v| (0.0..=1.0).contains(v)));
    assert_eq!(loaded.scale_to_original(), (2.5, 1.25));
  }

  #[test]
  fn empty_and_garbage_input_fail_to_decode() {
    let loader = ImageLoader::new(8, 8).unwrap();
    assert!(matches!(
      loader.load_bytes(&[]),
      Err(ImageLoadError::EmptyInput)
    ));
    assert!(matches!(
      loader.load_bytes(b"definitely not an image"),
      Err(ImageLoadError::ImageError(_))
    ));
  }

  #[test]
  fn zero_target_resolution_is_rejected() {
    assert!(matches!(
      ImageLoader::new(0, 224),
      Err(ImageLoadError::ZeroSized { .. })
    ));
  }

  #[test]
  fn oversized_input_hits_decode_limits() {
    let image = RgbImage::new(64, 64);
    let loader = ImageLoader::new(8, 8).unwrap().with_limits(InputLimits {
      max_width: 32,
      max_height: 32,
      ..InputLimits::default()
    });
    assert!(matches!(
      loader.load_bytes(&encode_png(&image)),
      Err(ImageLoadError::ImageError(_))
    ));
  }

  #[test]
  fn align_keeps_matching_dimensions() {
    let image = RgbImage::from_pixel(10, 12, Rgb([1, 2, 3]));
    let aligned = align_to(&image, 10, 12, FilterType::Triangle).unwrap();
    assert_eq!(aligned, image);
    let resized = align_to(&image, 5, 6, FilterType::Nearest).unwrap();
    assert_eq!(resized.dimensions(), (5, 6));
  }
}
