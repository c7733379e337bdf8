// 该文件是 Pinxiang （品相） 项目的一部分。
// src/args.rs - 项目参数配置
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use clap::Args;
use tracing::info;
use url::Url;

use crate::{
  classifier::ClassifierKind,
  config::{ComparisonConfig, ResizeFilter},
  error::ComparisonError,
  pipeline::{ComparisonPipeline, ComparisonPipelineBuilder},
  session::View,
  similarity::SsimMode,
};

/// 各个可执行程序共用的比对流程参数
#[derive(Args, Debug, Clone)]
pub struct PipelineArgs {
  /// 正面参考图像
  #[arg(long, value_name = "REFERENCE")]
  pub front_reference: Url,

  /// 背面参考图像
  #[arg(long, value_name = "REFERENCE")]
  pub back_reference: Url,

  /// 标注图像输出（image://<文件> 或 folder://<目录>），不指定则不保存
  #[arg(long, value_name = "OUTPUT")]
  pub output: Option<Url>,

  /// 分类器变体
  #[arg(long, value_enum, default_value_t = ClassifierKind::Structural)]
  pub classifier: ClassifierKind,

  /// SSIM 计算方式
  #[arg(long, value_enum, default_value_t = SsimMode::PerChannel)]
  pub ssim_mode: SsimMode,

  /// 对齐宽度
  #[arg(long, default_value = "224", value_name = "PIXELS")]
  pub width: u32,

  /// 对齐高度
  #[arg(long, default_value = "224", value_name = "PIXELS")]
  pub height: u32,

  /// 缩放插值方式
  #[arg(long, value_enum, default_value_t = ResizeFilter::Nearest)]
  pub filter: ResizeFilter,

  /// 差异区域的最小面积（噪声下限）
  #[arg(long, default_value = "500", value_name = "AREA")]
  pub min_area: f64,

  /// 颜色直方图每通道的分箱数（仅双信号分类器）
  #[cfg(feature = "color_histogram")]
  #[arg(long, default_value = "16", value_name = "BINS")]
  pub histogram_bins: usize,
}

impl PipelineArgs {
  pub fn to_config(&self) -> ComparisonConfig {
    let mut config = ComparisonConfig {
      resolution: (self.width, self.height),
      filter: self.filter,
      classifier: self.classifier,
      ..ComparisonConfig::default()
    };
    config.ssim.mode = self.ssim_mode;
    config.regions.min_area = self.min_area;
    config
  }

  /// 按参数组装流水线构建器：读取参考图像，打开输出，按需挂载特征提取器
  pub fn builder(&self) -> Result<ComparisonPipelineBuilder, ComparisonError> {
    info!("正面参考图像: {}", self.front_reference);
    info!("背面参考图像: {}", self.back_reference);

    let mut builder = ComparisonPipeline::builder(self.to_config())
      .with_reference_url(View::Front, &self.front_reference)?
      .with_reference_url(View::Back, &self.back_reference)?;

    if let Some(output) = &self.output {
      builder = builder.with_output_url(output)?;
    }

    #[cfg(feature = "color_histogram")]
    if self.classifier == ClassifierKind::Dual {
      builder = builder.with_extractor(
        crate::similarity::ColorHistogramExtractor::with_bins(self.histogram_bins),
      );
    }

    Ok(builder)
  }

  pub fn build_pipeline(&self) -> Result<ComparisonPipeline, ComparisonError> {
    self.builder()?.build()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use clap::Parser;

  #[derive(Parser, Debug)]
  struct Cli {
    #[command(flatten)]
    pipeline: PipelineArgs,
  }

  #[test]
  fn defaults_match_config_defaults() {
    let cli = Cli::try_parse_from([
      "pinxiang",
      "--front-reference",
      "image:///refs/front.png",
      "--back-reference",
      "image:///refs/back.png",
    ])
    .unwrap();

    let config = cli.pipeline.to_config();
    let defaults = ComparisonConfig::default();
    assert_eq!(config.resolution, defaults.resolution);
    assert_eq!(config.filter, defaults.filter);
    assert_eq!(config.classifier, defaults.classifier);
    assert_eq!(config.ssim, defaults.ssim);
    assert_eq!(config.regions, defaults.regions);
    assert!(cli.pipeline.output.is_none());
  }

  #[test]
  fn flags_override_config() {
    let cli = Cli::try_parse_from([
      "pinxiang",
      "--front-reference",
      "image:///refs/front.png",
      "--back-reference",
      "image:///refs/back.png",
      "--classifier",
      "dual",
      "--ssim-mode",
      "luminance",
      "--min-area",
      "120",
      "--width",
      "128",
      "--output",
      "folder:///tmp/records",
    ])
    .unwrap();

    let config = cli.pipeline.to_config();
    assert_eq!(config.classifier, ClassifierKind::Dual);
    assert_eq!(config.ssim.mode, SsimMode::Luminance);
    assert_eq!(config.regions.min_area, 120.0);
    assert_eq!(config.resolution, (128, 224));
    assert_eq!(cli.pipeline.output.unwrap().scheme(), "folder");
  }

  #[test]
  fn missing_reference_file_is_reported() {
    let cli = Cli::try_parse_from([
      "pinxiang",
      "--front-reference",
      "image:///nonexistent/pinxiang/front.png",
      "--back-reference",
      "image:///nonexistent/pinxiang/back.png",
    ])
    .unwrap();
    assert!(cli.pipeline.build_pipeline().is_err());
  }
}
