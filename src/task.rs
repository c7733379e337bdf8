// 该文件是 Pinxiang （品相） 项目的一部分。
// src/task.rs - 比对任务
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

use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{info, warn};
use url::Url;

use crate::{
  FromUrl,
  error::ComparisonError,
  input::ImageFileInput,
  pipeline::{ComparisonOutcome, ComparisonPipeline},
  report::ComparisonReport,
  session::{SessionState, View},
};

#[derive(Error, Debug)]
pub enum TaskError {
  #[error("比对失败: {0}")]
  Comparison(#[from] ComparisonError),
  #[error("没有输入图像")]
  NoInput,
  #[error("正反面提交后没有得到汇总结果")]
  MissingAggregate,
  #[error("重复次数至少为 {0}")]
  TooFewRepeats(usize),
}

/// 一次用户提交：视角 + 原始图像字节
#[derive(Debug, Clone)]
pub struct Submission {
  pub view: View,
  pub bytes: Vec<u8>,
}

impl Submission {
  pub fn new(view: View, bytes: Vec<u8>) -> Self {
    Self { view, bytes }
  }

  pub fn from_url(view: View, url: &Url) -> Result<Self, ComparisonError> {
    let input = ImageFileInput::from_url(url)?;
    info!("{}视角输入: {}", view, input.path().display());
    Ok(Self::new(view, input.into_bytes()))
  }
}

/// 同一物品的正反面
#[derive(Debug, Clone)]
pub struct SubmissionPair {
  pub front: Vec<u8>,
  pub back: Vec<u8>,
}

impl SubmissionPair {
  pub fn from_urls(front: &Url, back: &Url) -> Result<Self, ComparisonError> {
    Ok(Self {
      front: Submission::from_url(View::Front, front)?.bytes,
      back: Submission::from_url(View::Back, back)?.bytes,
    })
  }
}

pub trait Task<I>: Sized {
  type Error;
  fn run_task(
    self,
    input: I,
    pipeline: &ComparisonPipeline,
  ) -> Result<ComparisonReport, Self::Error>;
}

/// 提交单个视角，返回该视角（或恰好补齐时的汇总）报告
pub struct OneShotTask;

impl<I: IntoIterator<Item = Submission>> Task<I> for OneShotTask {
  type Error = TaskError;

  fn run_task(
    self,
    input: I,
    pipeline: &ComparisonPipeline,
  ) -> Result<ComparisonReport, Self::Error> {
    info!("开始任务...");
    let submission = input.into_iter().next().ok_or(TaskError::NoInput)?;
    let now = Instant::now();
    let outcome = pipeline.compare_view(&submission.bytes, submission.view)?;
    info!("比对完成，耗时: {:.2?}", now.elapsed());
    Ok(ComparisonReport::from(&outcome))
  }
}

/// 依次提交正面与背面，要求得到汇总结果
pub struct PairTask;

fn run_pair(
  pipeline: &ComparisonPipeline,
  pair: &SubmissionPair,
) -> Result<ComparisonOutcome, TaskError> {
  if let SessionState::OnePending(view) = pipeline.session().state() {
    warn!("会话中残留{}视角的结果，重新开始", view);
    pipeline.session().reset();
  }

  let front = pipeline.compare_view(&pair.front, View::Front)?;
  if front.aggregate().is_some() {
    return Err(TaskError::MissingAggregate);
  }
  let back = pipeline.compare_view(&pair.back, View::Back)?;
  match back.aggregate() {
    Some(_) => Ok(back),
    None => Err(TaskError::MissingAggregate),
  }
}

impl Task<SubmissionPair> for PairTask {
  type Error = TaskError;

  fn run_task(
    self,
    input: SubmissionPair,
    pipeline: &ComparisonPipeline,
  ) -> Result<ComparisonReport, Self::Error> {
    info!("开始任务...");
    let now = Instant::now();
    let outcome = run_pair(pipeline, &input)?;
    info!("正反面比对完成，耗时: {:.2?}", now.elapsed());
    Ok(ComparisonReport::from(&outcome))
  }
}

/// 反复比对同一对图像，统计平均耗时
pub struct RepeatShotTask {
  repeat: usize,
}

const WARMUP_ROUNDS: usize = 2;

impl Default for RepeatShotTask {
  fn default() -> Self {
    Self { repeat: 100 }
  }
}

impl RepeatShotTask {
  pub fn with_repeat(repeat: usize) -> Self {
    Self { repeat }
  }
}

impl Task<SubmissionPair> for RepeatShotTask {
  type Error = TaskError;

  fn run_task(
    self,
    input: SubmissionPair,
    pipeline: &ComparisonPipeline,
  ) -> Result<ComparisonReport, Self::Error> {
    if self.repeat <= WARMUP_ROUNDS {
      return Err(TaskError::TooFewRepeats(WARMUP_ROUNDS + 1));
    }

    info!("开始任务...");
    let mut times = Vec::with_capacity(self.repeat);
    let mut last = None;
    for i in 0..self.repeat {
      let now = Instant::now();
      let outcome = run_pair(pipeline, &input)?;
      let elapsed = now.elapsed();
      info!("({})正反面比对完成，耗时: {:.2?}", i, elapsed);
      times.push(elapsed);
      last = Some(outcome);
    }

    // 前几轮包含缓存预热，不计入平均
    let measured = &times[WARMUP_ROUNDS..];
    warn!(
      "平均比对时间: {:.2?}",
      measured.iter().sum::<Duration>() / measured.len() as u32
    );

    let outcome = last.ok_or(TaskError::NoInput)?;
    Ok(ComparisonReport::from(&outcome))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{config::ComparisonConfig, input::tests::encode_png};
  use image::{Rgb, RgbImage};

  fn pipeline() -> ComparisonPipeline {
    let reference = RgbImage::from_pixel(32, 32, Rgb([90, 120, 150]));
    ComparisonPipeline::builder(ComparisonConfig {
      resolution: (32, 32),
      ..ComparisonConfig::default()
    })
    .with_reference(View::Front, reference.clone())
    .with_reference(View::Back, reference)
    .build()
    .unwrap()
  }

  fn pair() -> SubmissionPair {
    let bytes = encode_png(&RgbImage::from_pixel(32, 32, Rgb([90, 120, 150])));
    SubmissionPair {
      front: bytes.clone(),
      back: bytes,
    }
  }

  #[test]
  fn one_shot_reports_single_view() {
    let pipeline = pipeline();
    let report = OneShotTask
      .run_task(vec![Submission::new(View::Back, pair().back)], &pipeline)
      .unwrap();
    assert!(matches!(report, ComparisonReport::View(ref r) if r.summary.view == View::Back));
  }

  #[test]
  fn one_shot_without_input_fails() {
    let pipeline = pipeline();
    assert!(matches!(
      OneShotTask.run_task(Vec::<Submission>::new(), &pipeline),
      Err(TaskError::NoInput)
    ));
  }

  #[test]
  fn pair_task_discards_stale_pending_view() {
    let pipeline = pipeline();
    pipeline.compare_view(&pair().back, View::Back).unwrap();

    let report = PairTask.run_task(pair(), &pipeline).unwrap();
    assert!(matches!(report, ComparisonReport::Aggregate(_)));
    assert_eq!(pipeline.session().state(), SessionState::Empty);
  }

  #[test]
  fn repeat_shot_needs_more_than_warmup() {
    let pipeline = pipeline();
    assert!(matches!(
      RepeatShotTask::with_repeat(2).run_task(pair(), &pipeline),
      Err(TaskError::TooFewRepeats(3))
    ));
    assert!(matches!(
      RepeatShotTask::with_repeat(4).run_task(pair(), &pipeline),
      Ok(ComparisonReport::Aggregate(_))
    ));
  }
}
