// 该文件是 Pinxiang （品相） 项目的一部分。
// src/config.rs - 比对流程配置
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

use image::imageops::FilterType;

use crate::{
  classifier::{ClassifierKind, DualThresholds, StructuralThresholds},
  detector::RegionConfig,
  error::ComparisonError,
  input::InputLimits,
  similarity::SsimConfig,
};

/// 对齐分辨率
pub const DEFAULT_RESOLUTION: (u32, u32) = (224, 224);

/// 缩放时使用的插值方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ResizeFilter {
  #[default]
  Nearest,
  Triangle,
  CatmullRom,
  Gaussian,
  Lanczos3,
}

impl From<ResizeFilter> for FilterType {
  fn from(value: ResizeFilter) -> Self {
    match value {
      ResizeFilter::Nearest => FilterType::Nearest,
      ResizeFilter::Triangle => FilterType::Triangle,
      ResizeFilter::CatmullRom => FilterType::CatmullRom,
      ResizeFilter::Gaussian => FilterType::Gaussian,
      ResizeFilter::Lanczos3 => FilterType::Lanczos3,
    }
  }
}

/// 整个比对流程的静态配置，进程启动时确定
#[derive(Debug, Clone)]
pub struct ComparisonConfig {
  /// (宽, 高)
  pub resolution: (u32, u32),
  pub filter: ResizeFilter,
  pub ssim: SsimConfig,
  pub regions: RegionConfig,
  pub classifier: ClassifierKind,
  pub structural_thresholds: StructuralThresholds,
  pub dual_thresholds: DualThresholds,
  pub limits: InputLimits,
}

impl Default for ComparisonConfig {
  fn default() -> Self {
    Self {
      resolution: DEFAULT_RESOLUTION,
      filter: ResizeFilter::default(),
      ssim: SsimConfig::default(),
      regions: RegionConfig::default(),
      classifier: ClassifierKind::default(),
      structural_thresholds: StructuralThresholds::default(),
      dual_thresholds: DualThresholds::default(),
      limits: InputLimits::default(),
    }
  }
}

impl ComparisonConfig {
  /// 检查配置之间的约束
  pub fn validate(&self) -> Result<(), ComparisonError> {
    let (width, height) = self.resolution;
    if width == 0 || height == 0 {
      return Err(ComparisonError::config(format!(
        "对齐分辨率不能为 0: {}x{}",
        width, height
      )));
    }

    let window = self.ssim.window_size as u32;
    if width < window || height < window {
      return Err(ComparisonError::config(format!(
        "对齐分辨率 {}x{} 小于 SSIM 窗口 {}",
        width, height, window
      )));
    }

    if self.regions.min_area.is_nan() || self.regions.min_area < 0.0 {
      return Err(ComparisonError::config(format!(
        "最小区域面积无效: {}",
        self.regions.min_area
      )));
    }

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::error::ErrorKind;

  #[test]
  fn defaults_are_valid() {
    let config = ComparisonConfig::default();
    assert_eq!(config.resolution, (224, 224));
    assert_eq!(config.filter, ResizeFilter::Nearest);
    assert_eq!(config.classifier, ClassifierKind::Structural);
    assert_eq!(config.regions.min_area, 500.0);
    assert!(config.validate().is_ok());
  }

  #[test]
  fn resolution_below_window_is_rejected() {
    let config = ComparisonConfig {
      resolution: (8, 224),
      ..ComparisonConfig::default()
    };
    let err = config.validate().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
  }

  #[test]
  fn negative_area_is_rejected() {
    let mut config = ComparisonConfig::default();
    config.regions.min_area = -1.0;
    assert!(config.validate().is_err());
  }
}
