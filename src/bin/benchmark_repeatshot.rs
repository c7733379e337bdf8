// 该文件是 Pinxiang （品相） 项目的一部分。
// src/bin/benchmark_repeatshot.rs - 重复比对测速
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

use anyhow::Result;
use clap::Parser;
use url::Url;

use pinxiang::{
  args::PipelineArgs,
  task::{RepeatShotTask, SubmissionPair, Task},
};
use tracing::info;

/// 反复比对同一对正反面图像，统计平均耗时
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  #[command(flatten)]
  pub pipeline: PipelineArgs,
  /// 用户正面图像
  #[arg(long, value_name = "IMAGE")]
  pub front: Url,
  /// 用户背面图像
  #[arg(long, value_name = "IMAGE")]
  pub back: Url,
  /// 重复次数（前两次作为预热不计入平均）
  #[arg(long, default_value = "100", value_name = "COUNT")]
  pub repeat: usize,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("正面图像: {}", args.front);
  info!("背面图像: {}", args.back);
  info!("重复次数: {}", args.repeat);

  let pipeline = args.pipeline.build_pipeline()?;
  let pair = SubmissionPair::from_urls(&args.front, &args.back)?;

  let report = RepeatShotTask::with_repeat(args.repeat).run_task(pair, &pipeline)?;
  println!("{}", report.to_json()?);

  Ok(())
}
