// 该文件是 Pinxiang （品相） 项目的一部分。
// src/similarity/ssim.rs - 结构相似度（SSIM）
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
use tracing::{debug, error};

use crate::{
  frame::{RGB_CHANNELS, RgbNchwFrame},
  similarity::ScoringError,
};

const SSIM_WINDOW_SIZE: usize = 11;
const SSIM_SIGMA: f32 = 1.5;
const SSIM_K1: f32 = 0.01;
const SSIM_K2: f32 = 0.03;
const SSIM_DATA_RANGE: f32 = 1.0; // 输入已归一化到 [0, 1]

/// 在哪些平面上计算 SSIM
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum SsimMode {
  /// 逐通道（R、G、B）计算后取平均
  #[default]
  PerChannel,
  /// 仅在亮度投影上计算
  Luminance,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SsimConfig {
  pub window_size: usize,
  pub sigma: f32,
  pub k1: f32,
  pub k2: f32,
  pub data_range: f32,
  pub mode: SsimMode,
}

impl Default for SsimConfig {
  fn default() -> Self {
    Self {
      window_size: SSIM_WINDOW_SIZE,
      sigma: SSIM_SIGMA,
      k1: SSIM_K1,
      k2: SSIM_K2,
      data_range: SSIM_DATA_RANGE,
      mode: SsimMode::default(),
    }
  }
}

/// 逐像素差异图，0 表示完全一致，255 表示完全不同
#[derive(Debug, Clone, PartialEq)]
pub struct DifferenceMap(GrayImage);

impl DifferenceMap {
  pub fn as_image(&self) -> &GrayImage {
    &self.0
  }

  pub fn into_image(self) -> GrayImage {
    self.0
  }

  pub fn width(&self) -> u32 {
    self.0.width()
  }

  pub fn height(&self) -> u32 {
    self.0.height()
  }

  /// 所有像素取值相同（例如两幅图完全一致时全为 0）
  pub fn is_uniform(&self) -> bool {
    let mut pixels = self.0.as_raw().iter();
    match pixels.next() {
      Some(first) => pixels.all(|v| v == first),
      None => true,
    }
  }
}

impl From<GrayImage> for DifferenceMap {
  fn from(image: GrayImage) -> Self {
    Self(image)
  }
}

#[derive(Debug, Clone)]
pub struct SsimResult {
  /// 各平面平均 SSIM，截断到 [0, 1]
  pub score: f32,
  /// 逐平面的平均 SSIM（亮度模式下只有一个）
  pub channel_scores: Vec<f32>,
  pub difference: DifferenceMap,
}

#[derive(Debug, Clone)]
pub struct StructuralSimilarity {
  config: SsimConfig,
  kernel: Box<[f32]>,
}

impl StructuralSimilarity {
  pub fn new(config: SsimConfig) -> Result<Self, ScoringError> {
    if config.window_size < 3 || config.window_size % 2 == 0 {
      return Err(ScoringError::InvalidWindow(config.window_size));
    }
    let kernel = gaussian_kernel(config.window_size, config.sigma);
    Ok(Self { config, kernel })
  }

  pub fn config(&self) -> &SsimConfig {
    &self.config
  }

  /// 计算 `candidate` 相对 `reference` 的 SSIM 分数与差异图
  pub fn score(
    &self,
    reference: &RgbNchwFrame,
    candidate: &RgbNchwFrame,
  ) -> Result<SsimResult, ScoringError> {
    if reference.dimensions() != candidate.dimensions() {
      error!(
        "SSIM 输入尺寸不一致: {:?} vs {:?}",
        reference.dimensions(),
        candidate.dimensions()
      );
      return Err(ScoringError::DimensionMismatch {
        expected: reference.dimensions(),
        found: candidate.dimensions(),
      });
    }

    let (width, height) = reference.dimensions();
    let window = self.kernel.len();
    if width < window || height < window {
      return Err(ScoringError::TooSmall {
        width,
        height,
        window,
      });
    }

    let maps: Vec<Vec<f32>> = match self.config.mode {
      SsimMode::PerChannel => (0..RGB_CHANNELS)
        .map(|c| self.similarity_map(reference.plane(c), candidate.plane(c), width, height))
        .collect(),
      SsimMode::Luminance => vec![self.similarity_map(
        &reference.luma(),
        &candidate.luma(),
        width,
        height,
      )],
    };

    let channel_scores: Vec<f32> = maps
      .iter()
      .map(|map| self.interior_mean(map, width, height))
      .collect();
    let score = channel_scores.iter().sum::<f32>() / channel_scores.len() as f32;
    if !score.is_finite() {
      error!("SSIM 分数不是有限数值: {:?}", channel_scores);
      return Err(ScoringError::NonFinite);
    }

    let difference = difference_map(&maps, width, height);
    debug!("SSIM 分数: {:.4}, 各平面: {:?}", score, channel_scores);

    Ok(SsimResult {
      score: score.clamp(0.0, 1.0),
      channel_scores,
      difference,
    })
  }

  // 局部窗口 SSIM：亮度、对比度、结构三项的乘积
  fn similarity_map(&self, x: &[f32], y: &[f32], width: usize, height: usize) -> Vec<f32> {
    let c1 = (self.config.k1 * self.config.data_range).powi(2);
    let c2 = (self.config.k2 * self.config.data_range).powi(2);

    let xx: Vec<f32> = x.iter().map(|v| v * v).collect();
    let yy: Vec<f32> = y.iter().map(|v| v * v).collect();
    let xy: Vec<f32> = x.iter().zip(y).map(|(a, b)| a * b).collect();

    let mu_x = self.blur(x, width, height);
    let mu_y = self.blur(y, width, height);
    let e_xx = self.blur(&xx, width, height);
    let e_yy = self.blur(&yy, width, height);
    let e_xy = self.blur(&xy, width, height);

    (0..width * height)
      .map(|i| {
        let (mx, my) = (mu_x[i], mu_y[i]);
        let var_x = e_xx[i] - mx * mx;
        let var_y = e_yy[i] - my * my;
        let cov = e_xy[i] - mx * my;

        let numerator = (2.0 * mx * my + c1) * (2.0 * cov + c2);
        let denominator = (mx * mx + my * my + c1) * (var_x + var_y + c2);
        numerator / denominator
      })
      .collect()
  }

  // 可分离高斯滤波，边界按最近像素延拓
  fn blur(&self, plane: &[f32], width: usize, height: usize) -> Vec<f32> {
    let radius = self.kernel.len() / 2;
    let mut horizontal = vec![0.0f32; width * height];
    for y in 0..height {
      let row = &plane[y * width..(y + 1) * width];
      for x in 0..width {
        horizontal[y * width + x] = self
          .kernel
          .iter()
          .enumerate()
          .map(|(k, weight)| weight * row[(x + k).saturating_sub(radius).min(width - 1)])
          .sum();
      }
    }

    let mut output = vec![0.0f32; width * height];
    for y in 0..height {
      for x in 0..width {
        output[y * width + x] = self
          .kernel
          .iter()
          .enumerate()
          .map(|(k, weight)| {
            let sy = (y + k).saturating_sub(radius).min(height - 1);
            weight * horizontal[sy * width + x]
          })
          .sum();
      }
    }
    output
  }

  // 只在窗口完整覆盖的内部区域取平均
  fn interior_mean(&self, map: &[f32], width: usize, height: usize) -> f32 {
    let pad = self.kernel.len() / 2;
    let mut sum = 0.0f64;
    let mut count = 0usize;
    for y in pad..height - pad {
      for x in pad..width - pad {
        sum += f64::from(map[y * width + x]);
        count += 1;
      }
    }
    (sum / count as f64) as f32
  }
}

fn gaussian_kernel(size: usize, sigma: f32) -> Box<[f32]> {
  let center = (size / 2) as f32;
  let weights: Vec<f32> = (0..size)
    .map(|i| {
      let d = i as f32 - center;
      (-(d * d) / (2.0 * sigma * sigma)).exp()
    })
    .collect();
  let total: f32 = weights.iter().sum();
  weights.into_iter().map(|w| w / total).collect()
}

fn difference_map(maps: &[Vec<f32>], width: usize, height: usize) -> DifferenceMap {
  let planes = maps.len() as f32;
  let image = GrayImage::from_fn(width as u32, height as u32, |x, y| {
    let i = y as usize * width + x as usize;
    let similarity = maps.iter().map(|m| m[i]).sum::<f32>() / planes;
    let dissimilarity = if similarity.is_finite() {
      (1.0 - similarity).clamp(0.0, 1.0)
    } else {
      1.0
    };
    Luma([(dissimilarity * 255.0).round() as u8])
  });
  DifferenceMap(image)
}
