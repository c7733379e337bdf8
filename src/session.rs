// 该文件是 Pinxiang （品相） 项目的一部分。
// src/session.rs - 正反面比对会话
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

use std::{
  path::PathBuf,
  str::FromStr,
  sync::{Mutex, MutexGuard, PoisonError},
};

use serde::Serialize;
use tracing::{info, warn};

use crate::{
  classifier::{ClassifyError, ConditionClassifier, ConditionLabel, Signals},
  error::ComparisonError,
};

/// 物品的拍摄视角
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
  Front,
  Back,
}

impl View {
  pub fn as_str(&self) -> &'static str {
    match self {
      View::Front => "front",
      View::Back => "back",
    }
  }

  pub fn complement(&self) -> View {
    match self {
      View::Front => View::Back,
      View::Back => View::Front,
    }
  }
}

impl std::fmt::Display for View {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for View {
  type Err = ComparisonError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "front" => Ok(View::Front),
      "back" => Ok(View::Back),
      other => Err(ComparisonError::InvalidViewTag(other.to_string())),
    }
  }
}

/// 单个视角的比对结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewResult {
  pub view: View,
  pub signals: Signals,
  pub label: ConditionLabel,
  pub region_count: usize,
  /// 标注图像的保存位置
  #[serde(skip_serializing_if = "Option::is_none")]
  pub annotated: Option<PathBuf>,
}

/// 正反面都到齐后的汇总结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateResult {
  /// 正反面信号（各自保留两位小数）的算术平均
  pub signals: Signals,
  /// 由平均信号重新分类得到，不由两个视角的标签组合而来
  pub label: ConditionLabel,
  pub front: ViewResult,
  pub back: ViewResult,
}

/// 一次记录的结果
#[derive(Debug, Clone, PartialEq)]
pub enum RecordOutcome {
  /// 写入空槽位，等待对侧视角
  Pending,
  /// 覆盖了同视角的旧结果，附带被覆盖的结果
  Replaced(ViewResult),
  /// 与等待中的对侧视角完成汇总，会话已清空
  Aggregated(AggregateResult),
}

impl RecordOutcome {
  pub fn into_aggregate(self) -> Option<AggregateResult> {
    match self {
      RecordOutcome::Aggregated(aggregate) => Some(aggregate),
      _ => None,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
  Empty,
  OnePending(View),
}

#[derive(Debug, Default)]
struct Slots {
  front: Option<ViewResult>,
  back: Option<ViewResult>,
}

impl Slots {
  fn get(&self, view: View) -> Option<&ViewResult> {
    match view {
      View::Front => self.front.as_ref(),
      View::Back => self.back.as_ref(),
    }
  }

  fn set(&mut self, result: ViewResult) -> Option<ViewResult> {
    match result.view {
      View::Front => self.front.replace(result),
      View::Back => self.back.replace(result),
    }
  }
}

/// 进程内唯一的比对会话，所有读改写都在同一把锁内完成
#[derive(Debug, Default)]
pub struct ComparisonSession {
  slots: Mutex<Slots>,
}

impl ComparisonSession {
  pub fn new() -> Self {
    Self::default()
  }

  fn lock(&self) -> MutexGuard<'_, Slots> {
    self.slots.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// 记录一个视角的结果。
  ///
  /// 对侧视角已在等待时立即汇总，并清空两个槽位；否则覆盖同视角的旧结果。
  /// 汇总失败时会话保持调用前的状态。
  pub fn record<C>(
    &self,
    result: ViewResult,
    classifier: &C,
  ) -> Result<RecordOutcome, ClassifyError>
  where
    C: ConditionClassifier + ?Sized,
  {
    let mut slots = self.lock();

    let aggregate = match slots.get(result.view.complement()) {
      Some(pending) => aggregate(pending, &result, classifier)?,
      None => {
        return Ok(match slots.set(result) {
          Some(replaced) => {
            warn!("同一视角重复提交，覆盖等待中的结果");
            RecordOutcome::Replaced(replaced)
          }
          None => RecordOutcome::Pending,
        });
      }
    };

    *slots = Slots::default();
    info!(
      "正反面汇总完成: {} (结构相似度 {:.4})",
      aggregate.label, aggregate.signals.structural
    );
    Ok(RecordOutcome::Aggregated(aggregate))
  }

  pub fn state(&self) -> SessionState {
    let slots = self.lock();
    match (&slots.front, &slots.back) {
      (Some(_), None) => SessionState::OnePending(View::Front),
      (None, Some(_)) => SessionState::OnePending(View::Back),
      // 两个槽位不会同时有值
      _ => SessionState::Empty,
    }
  }

  pub fn pending(&self, view: View) -> Option<ViewResult> {
    self.lock().get(view).cloned()
  }

  pub fn reset(&self) {
    *self.lock() = Slots::default();
  }
}

fn aggregate<C>(
  pending: &ViewResult,
  incoming: &ViewResult,
  classifier: &C,
) -> Result<AggregateResult, ClassifyError>
where
  C: ConditionClassifier + ?Sized,
{
  // 先按两位小数取整再平均
  let signals = pending.signals.rounded().mean(&incoming.signals.rounded())?;
  let label = classifier.classify(&signals)?;

  let (front, back) = match incoming.view {
    View::Front => (incoming.clone(), pending.clone()),
    View::Back => (pending.clone(), incoming.clone()),
  };

  Ok(AggregateResult {
    signals,
    label,
    front,
    back,
  })
}

#[cfg(test)]
mod tests {
  use std::{sync::Arc, thread};

  use super::*;
  use crate::classifier::{DualSignalClassifier, StructuralClassifier};

  fn view_result(view: View, structural: f32) -> ViewResult {
    let classifier = StructuralClassifier::default();
    let signals = Signals::structural(structural);
    ViewResult {
      view,
      signals,
      label: classifier.classify(&signals).unwrap(),
      region_count: 0,
      annotated: None,
    }
  }

  #[test]
  fn view_tags_parse_strictly() {
    assert_eq!("front".parse::<View>().unwrap(), View::Front);
    assert_eq!("back".parse::<View>().unwrap(), View::Back);
    assert!(matches!(
      "Front".parse::<View>(),
      Err(ComparisonError::InvalidViewTag(tag)) if tag == "Front"
    ));
    assert!("side".parse::<View>().is_err());
  }

  #[test]
  fn front_then_back_aggregates_and_resets() {
    let session = ComparisonSession::new();
    let classifier = StructuralClassifier::default();

    let front = view_result(View::Front, 0.9);
    assert_eq!(front.label, ConditionLabel::Damaged);
    assert_eq!(
      session.record(front, &classifier).unwrap(),
      RecordOutcome::Pending
    );
    assert_eq!(session.state(), SessionState::OnePending(View::Front));

    let back = view_result(View::Back, 0.55);
    assert_eq!(back.label, ConditionLabel::Different);
    let aggregate = session
      .record(back, &classifier)
      .unwrap()
      .into_aggregate()
      .unwrap();

    assert!((aggregate.signals.structural - 0.725).abs() < 1e-6);
    assert_eq!(aggregate.label, ConditionLabel::BrandNew);
    assert_eq!(aggregate.front.view, View::Front);
    assert_eq!(aggregate.back.view, View::Back);
    assert_eq!(session.state(), SessionState::Empty);
  }

  #[test]
  fn third_submission_starts_fresh() {
    let session = ComparisonSession::new();
    let classifier = StructuralClassifier::default();

    session.record(view_result(View::Back, 0.7), &classifier).unwrap();
    assert!(matches!(
      session.record(view_result(View::Front, 0.7), &classifier),
      Ok(RecordOutcome::Aggregated(_))
    ));

    assert_eq!(
      session.record(view_result(View::Front, 0.95), &classifier).unwrap(),
      RecordOutcome::Pending
    );
    assert_eq!(session.state(), SessionState::OnePending(View::Front));
    assert_eq!(session.pending(View::Back), None);
  }

  #[test]
  fn resubmitting_same_view_keeps_last() {
    let session = ComparisonSession::new();
    let classifier = StructuralClassifier::default();

    session.record(view_result(View::Front, 0.3), &classifier).unwrap();
    assert!(matches!(
      session.record(view_result(View::Front, 0.8), &classifier),
      Ok(RecordOutcome::Replaced(old)) if old.signals.structural == 0.3
    ));

    let pending = session.pending(View::Front).unwrap();
    assert_eq!(pending.signals.structural, 0.8);
    assert_eq!(session.state(), SessionState::OnePending(View::Front));

    let aggregate = session
      .record(view_result(View::Back, 0.8), &classifier)
      .unwrap()
      .into_aggregate()
      .unwrap();
    assert!((aggregate.signals.structural - 0.8).abs() < 1e-6);
  }

  #[test]
  fn failed_aggregation_leaves_session_untouched() {
    let session = ComparisonSession::new();
    let classifier = StructuralClassifier::default();
    session.record(view_result(View::Front, 0.9), &classifier).unwrap();

    let mut back = view_result(View::Back, 0.9);
    back.signals = Signals::with_embedding(0.9, 0.9);
    assert!(matches!(
      session.record(back, &classifier),
      Err(ClassifyError::InconsistentSignals { .. })
    ));
    assert_eq!(session.state(), SessionState::OnePending(View::Front));
    assert_eq!(session.pending(View::Front).unwrap().signals.structural, 0.9);
  }

  #[test]
  fn classifier_mismatch_during_aggregation_is_fatal() {
    let session = ComparisonSession::new();
    let structural = StructuralClassifier::default();
    session.record(view_result(View::Front, 0.9), &structural).unwrap();

    let dual = DualSignalClassifier::default();
    assert!(session.record(view_result(View::Back, 0.9), &dual).is_err());
    assert_eq!(session.state(), SessionState::OnePending(View::Front));
  }

  #[test]
  fn rounded_views_are_averaged() {
    let session = ComparisonSession::new();
    let classifier = StructuralClassifier::default();

    let front = view_result(View::Front, 0.853);
    assert_eq!(front.label, ConditionLabel::Damaged);
    session.record(front, &classifier).unwrap();

    let aggregate = session
      .record(view_result(View::Back, 0.849), &classifier)
      .unwrap()
      .into_aggregate()
      .unwrap();
    assert_eq!(aggregate.signals.structural, 0.85);
    assert_eq!(aggregate.label, ConditionLabel::ExcellentCondition);
    // 单视角结果保留完整精度
    assert_eq!(aggregate.front.signals.structural, 0.853);
  }

  #[test]
  fn concurrent_records_account_for_every_submission() {
    let session = Arc::new(ComparisonSession::new());
    let workers = 4;
    let rounds = 100;

    // 以标注路径作为每次提交的唯一标识
    let handles: Vec<_> = (0..workers)
      .flat_map(|worker| [(worker, View::Front), (worker, View::Back)])
      .map(|(worker, view)| {
        let session = Arc::clone(&session);
        thread::spawn(move || {
          let classifier = StructuralClassifier::default();
          let mut aggregated = Vec::new();
          let mut replaced = Vec::new();
          for round in 0..rounds {
            let mut result = view_result(view, 0.8);
            result.annotated = Some(PathBuf::from(format!("{view}-{worker}-{round}")));
            match session.record(result, &classifier).unwrap() {
              RecordOutcome::Pending => {}
              RecordOutcome::Replaced(old) => replaced.push(old),
              RecordOutcome::Aggregated(aggregate) => aggregated.push(aggregate),
            }
          }
          (aggregated, replaced)
        })
      })
      .collect();

    let mut seen = Vec::new();
    for handle in handles {
      let (aggregated, replaced) = handle.join().unwrap();
      for aggregate in aggregated {
        assert_eq!(aggregate.front.view, View::Front);
        assert_eq!(aggregate.back.view, View::Back);
        seen.push(aggregate.front);
        seen.push(aggregate.back);
      }
      seen.extend(replaced);
    }
    let front = session.pending(View::Front);
    let back = session.pending(View::Back);
    assert!(front.is_none() || back.is_none());
    seen.extend(front);
    seen.extend(back);

    let mut ids: Vec<PathBuf> = seen.into_iter().filter_map(|r| r.annotated).collect();
    assert_eq!(ids.len(), 2 * workers * rounds);
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 2 * workers * rounds);
  }

  #[test]
  fn reset_clears_pending() {
    let session = ComparisonSession::new();
    session
      .record(view_result(View::Back, 0.6), &StructuralClassifier::default())
      .unwrap();
    session.reset();
    assert_eq!(session.state(), SessionState::Empty);
  }
}
