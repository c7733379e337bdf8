// 该文件是 Pinxiang （品相） 项目的一部分。
// src/similarity.rs - 相似度信号
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

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScoringError {
  #[error("图像尺寸不一致: 参考 {expected:?}, 实际 {found:?}")]
  DimensionMismatch {
    expected: (usize, usize),
    found: (usize, usize),
  },
  #[error("图像 {width}x{height} 小于 SSIM 窗口 {window}")]
  TooSmall {
    width: usize,
    height: usize,
    window: usize,
  },
  #[error("SSIM 窗口必须为不小于 3 的奇数, 实际为 {0}")]
  InvalidWindow(usize),
  #[error("相似度计算结果不是有限数值")]
  NonFinite,
}

mod embedding;
mod ssim;

#[cfg(feature = "color_histogram")]
pub use self::embedding::ColorHistogramExtractor;
pub use self::embedding::{Embedding, EmbeddingError, FeatureExtractor};
pub use self::ssim::{DifferenceMap, SsimConfig, SsimMode, SsimResult, StructuralSimilarity};
