// 该文件是 Pinxiang （品相） 项目的一部分。
// src/bin/highlight_differences.rs - 标出两张图像的差异区域
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use anyhow::Result;
use clap::Parser;
use url::Url;

use pinxiang::{
  FromUrl,
  config::ResizeFilter,
  detector::{DifferenceRegionDetector, RegionConfig},
  frame::RgbNchwFrame,
  input::{ImageFileInput, InputLimits, align_to, decode_with_limits},
  output::{
    SaveImageFileOutput,
    draw::{Draw, DrawRegionsOnImage},
  },
  similarity::{SsimConfig, SsimMode, StructuralSimilarity},
};
use tracing::info;

/// 以第一张图像的分辨率比较两张图像，并在第二张图像上框出差异
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 第一张图像（决定比对分辨率）
  #[arg(long, value_name = "IMAGE")]
  pub first: Url,
  /// 第二张图像（缩放到第一张图像的尺寸后绘制）
  #[arg(long, value_name = "IMAGE")]
  pub second: Url,
  /// 输出路径
  #[arg(long, value_name = "OUTPUT")]
  pub output: Url,
  /// 差异区域的最小面积
  #[arg(long, default_value = "500", value_name = "AREA")]
  pub min_area: f64,
  /// 缩放插值方式
  #[arg(long, value_enum, default_value_t = ResizeFilter::Triangle)]
  pub filter: ResizeFilter,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("第一张图像: {}", args.first);
  info!("第二张图像: {}", args.second);
  info!("输出路径: {}", args.output);

  let limits = InputLimits::default();
  let first = decode_with_limits(ImageFileInput::from_url(&args.first)?.bytes(), limits)?;
  let second = decode_with_limits(ImageFileInput::from_url(&args.second)?.bytes(), limits)?;
  let output = SaveImageFileOutput::from_url(&args.output)?;

  let (width, height) = first.dimensions();
  let second = align_to(&second, width, height, args.filter.into())?;

  let scorer = StructuralSimilarity::new(SsimConfig {
    mode: SsimMode::Luminance,
    ..SsimConfig::default()
  })?;
  let now = std::time::Instant::now();
  let result = scorer.score(&RgbNchwFrame::from(&first), &RgbNchwFrame::from(&second))?;

  let detector = DifferenceRegionDetector::new(RegionConfig {
    min_area: args.min_area,
    ..RegionConfig::default()
  });
  let regions = detector.detect(&result.difference);
  info!(
    "SSIM: {:.4}, 差异区域: {} 个, 耗时: {:.2?}",
    result.score,
    regions.len(),
    now.elapsed()
  );

  let annotated = Draw::default().annotate(&second, &regions);
  let path = output.save_exact(&annotated)?;

  println!("SSIM: {:.4}", result.score);
  for region in &regions {
    println!(
      "  - ({}, {}, {}x{}) 面积 {:.0}",
      region.x, region.y, region.width, region.height, region.area
    );
  }
  println!("输出文件: {}", path.display());

  Ok(())
}
