// 该文件是 Pinxiang （品相） 项目的一部分。
// src/error.rs - 比对流水线错误定义
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

use crate::{
  classifier::ClassifyError,
  input::ImageLoadError,
  output::OutputError,
  similarity::{EmbeddingError, ScoringError},
};

/// 报告给调用方的错误类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
  /// 图像不可读或已损坏
  Decode,
  /// 尺寸无法对齐（例如零尺寸图像）
  Alignment,
  /// 视角标签不是 front/back
  InvalidViewTag,
  /// 数值计算异常或信号集合不一致
  InternalScoring,
  /// 标注图像保存失败
  Persistence,
  /// 流水线配置错误（参考图像、分类器与特征提取器不匹配等）
  Configuration,
}

impl ErrorKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      ErrorKind::Decode => "DecodeError",
      ErrorKind::Alignment => "AlignmentError",
      ErrorKind::InvalidViewTag => "InvalidViewTag",
      ErrorKind::InternalScoring => "InternalScoringError",
      ErrorKind::Persistence => "PersistenceError",
      ErrorKind::Configuration => "ConfigurationError",
    }
  }
}

impl std::fmt::Display for ErrorKind {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Error, Debug)]
pub enum ComparisonError {
  #[error("图像加载错误: {0}")]
  Load(#[from] ImageLoadError),
  #[error("相似度计算错误: {0}")]
  Scoring(#[from] ScoringError),
  #[error("特征嵌入错误: {0}")]
  Embedding(#[from] EmbeddingError),
  #[error("无效的视角标签: '{0}'（只接受 front 或 back）")]
  InvalidViewTag(String),
  #[error("分类错误: {0}")]
  Classify(#[from] ClassifyError),
  #[error("输出错误: {0}")]
  Output(#[from] OutputError),
  #[error("配置错误: {0}")]
  Config(String),
}

impl ComparisonError {
  pub fn kind(&self) -> ErrorKind {
    match self {
      ComparisonError::Load(err) => match err {
        ImageLoadError::ZeroSized { .. } => ErrorKind::Alignment,
        _ => ErrorKind::Decode,
      },
      ComparisonError::Scoring(err) => match err {
        ScoringError::DimensionMismatch { .. } | ScoringError::TooSmall { .. } => {
          ErrorKind::Alignment
        }
        ScoringError::InvalidWindow(_) => ErrorKind::Configuration,
        ScoringError::NonFinite => ErrorKind::InternalScoring,
      },
      ComparisonError::Embedding(_) => ErrorKind::InternalScoring,
      ComparisonError::InvalidViewTag(_) => ErrorKind::InvalidViewTag,
      ComparisonError::Classify(_) => ErrorKind::InternalScoring,
      ComparisonError::Output(_) => ErrorKind::Persistence,
      ComparisonError::Config(_) => ErrorKind::Configuration,
    }
  }

  /// 是否由调用方的输入导致（对应 HTTP 4xx）
  pub fn is_client_error(&self) -> bool {
    matches!(
      self.kind(),
      ErrorKind::Decode | ErrorKind::Alignment | ErrorKind::InvalidViewTag
    )
  }

  pub fn config(msg: impl Into<String>) -> Self {
    ComparisonError::Config(msg.into())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn kinds_map_to_transport_classes() {
    let err = ComparisonError::InvalidViewTag("side".to_string());
    assert_eq!(err.kind(), ErrorKind::InvalidViewTag);
    assert!(err.is_client_error());

    let err = ComparisonError::from(ImageLoadError::EmptyInput);
    assert_eq!(err.kind(), ErrorKind::Decode);
    assert!(err.is_client_error());

    let err = ComparisonError::from(ImageLoadError::ZeroSized {
      width: 0,
      height: 10,
    });
    assert_eq!(err.kind(), ErrorKind::Alignment);

    let err = ComparisonError::from(ScoringError::NonFinite);
    assert_eq!(err.kind(), ErrorKind::InternalScoring);
    assert!(!err.is_client_error());

    let err = ComparisonError::config("缺少参考图像");
    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert!(!err.is_client_error());
  }
}
