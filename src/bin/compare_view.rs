// 该文件是 Pinxiang （品相） 项目的一部分。
// src/bin/compare_view.rs - 单视角比对
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
  View,
  args::PipelineArgs,
  task::{OneShotTask, Submission, Task},
};
use tracing::info;

/// 比对单个视角的用户图像
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  #[command(flatten)]
  pub pipeline: PipelineArgs,
  /// 视角标签（front 或 back）
  #[arg(long, value_name = "VIEW")]
  pub view: String,
  /// 用户图像
  #[arg(long, value_name = "IMAGE")]
  pub input: Url,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("视角: {}", args.view);
  info!("输入图像: {}", args.input);

  let view: View = args.view.parse()?;
  let pipeline = args.pipeline.build_pipeline()?;
  let submission = Submission::from_url(view, &args.input)?;

  let report = OneShotTask.run_task([submission], &pipeline)?;
  println!("{}", report.to_json()?);

  Ok(())
}
