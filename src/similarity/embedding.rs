// 该文件是 Pinxiang （品相） 项目的一部分。
// src/similarity/embedding.rs - 特征嵌入与余弦相似度
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

use image::RgbImage;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EmbeddingError {
  #[error("特征提取失败: {0}")]
  Extractor(String),
  #[error("特征向量为空")]
  Empty,
  #[error("特征向量长度不一致: {left} vs {right}")]
  LengthMismatch { left: usize, right: usize },
  #[error("特征向量范数为零或不是有限数值")]
  DegenerateNorm,
}

/// 图像的全局特征向量
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding(Box<[f32]>);

impl Embedding {
  pub fn new(values: Vec<f32>) -> Result<Self, EmbeddingError> {
    if values.is_empty() {
      return Err(EmbeddingError::Empty);
    }
    Ok(Self(values.into_boxed_slice()))
  }

  pub fn as_slice(&self) -> &[f32] {
    &self.0
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn norm(&self) -> f32 {
    self.0.iter().map(|v| v * v).sum::<f32>().sqrt()
  }

  /// L2 归一化
  pub fn normalized(&self) -> Result<Self, EmbeddingError> {
    let norm = self.norm();
    if norm == 0.0 || !norm.is_finite() {
      return Err(EmbeddingError::DegenerateNorm);
    }
    Ok(Self(self.0.iter().map(|v| v / norm).collect()))
  }

  /// 归一化点积，取值 [-1, 1]
  pub fn cosine_similarity(&self, other: &Embedding) -> Result<f32, EmbeddingError> {
    if self.len() != other.len() {
      return Err(EmbeddingError::LengthMismatch {
        left: self.len(),
        right: other.len(),
      });
    }

    let (a, b) = (self.norm(), other.norm());
    let dot: f32 = self.0.iter().zip(other.0.iter()).map(|(x, y)| x * y).sum();
    let similarity = dot / (a * b);
    if a == 0.0 || b == 0.0 || !similarity.is_finite() {
      return Err(EmbeddingError::DegenerateNorm);
    }
    Ok(similarity.clamp(-1.0, 1.0))
  }
}

/// 图像特征提取器（例如预训练 CNN 的全局池化输出）
pub trait FeatureExtractor: Send + Sync {
  fn extract(&self, image: &RgbImage) -> Result<Embedding, EmbeddingError>;

  fn name(&self) -> &str;
}

#[cfg(feature = "color_histogram")]
mod color_histogram {
  use super::*;

  const DEFAULT_BINS_PER_CHANNEL: usize = 16;

  /// 逐通道颜色直方图拼接成的特征向量，无需外部模型
  #[derive(Debug, Clone)]
  pub struct ColorHistogramExtractor {
    bins: usize,
  }

  impl Default for ColorHistogramExtractor {
    fn default() -> Self {
      Self {
        bins: DEFAULT_BINS_PER_CHANNEL,
      }
    }
  }

  impl ColorHistogramExtractor {
    pub fn with_bins(bins: usize) -> Self {
      Self {
        bins: bins.clamp(1, 256),
      }
    }
  }

  impl FeatureExtractor for ColorHistogramExtractor {
    fn extract(&self, image: &RgbImage) -> Result<Embedding, EmbeddingError> {
      let pixels = (image.width() as usize) * (image.height() as usize);
      if pixels == 0 {
        return Err(EmbeddingError::Empty);
      }

      let mut histogram = vec![0u32; 3 * self.bins];
      for pixel in image.pixels() {
        for (c, value) in pixel.0.iter().enumerate() {
          let bin = usize::from(*value) * self.bins / 256;
          histogram[c * self.bins + bin] += 1;
        }
      }

      let values = histogram
        .into_iter()
        .map(|count| count as f32 / pixels as f32)
        .collect();
      Embedding::new(values)?.normalized()
    }

    fn name(&self) -> &str {
      "color-histogram"
    }
  }
}

#[cfg(feature = "color_histogram")]
pub use self::color_histogram::ColorHistogramExtractor;
