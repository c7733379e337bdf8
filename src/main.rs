// 该文件是 Pinxiang （品相） 项目的一部分。
// src/main.rs - 项目主程序
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
  args::PipelineArgs,
  report::ErrorReport,
  task::{PairTask, SubmissionPair, Task, TaskError},
};
use tracing::info;

/// Pinxiang 品相评估：正反面与参考图像比对
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
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("正面图像: {}", args.front);
  info!("背面图像: {}", args.back);

  let pipeline = args.pipeline.build_pipeline()?;
  let pair = SubmissionPair::from_urls(&args.front, &args.back)?;

  match PairTask.run_task(pair, &pipeline) {
    Ok(report) => {
      println!("{}", report.to_json()?);
      Ok(())
    }
    Err(TaskError::Comparison(err)) => {
      println!("{}", serde_json::to_string_pretty(&ErrorReport::from(&err))?);
      Err(err.into())
    }
    Err(err) => Err(err.into()),
  }
}
