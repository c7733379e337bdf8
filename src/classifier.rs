// 该文件是 Pinxiang （品相） 项目的一部分。
// src/classifier.rs - 品相分类
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

use serde::Serialize;
use thiserror::Error;

mod rules;
pub use self::rules::{Bounds, Rule, RuleTest, evaluate_rules};

/// 品相标签（有序封闭集合）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ConditionLabel {
  #[serde(rename = "Non-Functional")]
  NonFunctional,
  #[serde(rename = "Different")]
  Different,
  #[serde(rename = "Brand New")]
  BrandNew,
  #[serde(rename = "Excellent Condition")]
  ExcellentCondition,
  #[serde(rename = "Damaged")]
  Damaged,
}

impl ConditionLabel {
  pub fn as_str(&self) -> &'static str {
    match self {
      ConditionLabel::NonFunctional => "Non-Functional",
      ConditionLabel::Different => "Different",
      ConditionLabel::BrandNew => "Brand New",
      ConditionLabel::ExcellentCondition => "Excellent Condition",
      ConditionLabel::Damaged => "Damaged",
    }
  }
}

impl std::fmt::Display for ConditionLabel {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

/// 参与分类的信号组合
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalSet {
  StructuralOnly,
  StructuralAndEmbedding,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Signals {
  /// 结构相似度，[0, 1]
  pub structural: f32,
  /// 嵌入余弦相似度，[-1, 1]
  #[serde(skip_serializing_if = "Option::is_none")]
  pub embedding: Option<f32>,
}

impl Signals {
  pub fn structural(structural: f32) -> Self {
    Self {
      structural,
      embedding: None,
    }
  }

  pub fn with_embedding(structural: f32, embedding: f32) -> Self {
    Self {
      structural,
      embedding: Some(embedding),
    }
  }

  pub fn signal_set(&self) -> SignalSet {
    match self.embedding {
      Some(_) => SignalSet::StructuralAndEmbedding,
      None => SignalSet::StructuralOnly,
    }
  }

  /// 保留两位小数，与报告中展示的数值一致
  pub fn rounded(&self) -> Signals {
    Signals {
      structural: round2(self.structural),
      embedding: self.embedding.map(round2),
    }
  }

  /// 逐信号算术平均；两侧信号集合必须一致
  pub fn mean(&self, other: &Signals) -> Result<Signals, ClassifyError> {
    if self.signal_set() != other.signal_set() {
      return Err(ClassifyError::InconsistentSignals {
        expected: self.signal_set(),
        found: other.signal_set(),
      });
    }
    Ok(Signals {
      structural: (self.structural + other.structural) / 2.0,
      embedding: self
        .embedding
        .zip(other.embedding)
        .map(|(a, b)| (a + b) / 2.0),
    })
  }
}

pub(crate) fn round2(value: f32) -> f32 {
  (value * 100.0).round() / 100.0
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClassifyError {
  #[error("信号集合不一致: 期望 {expected:?}, 实际 {found:?}")]
  InconsistentSignals { expected: SignalSet, found: SignalSet },
  #[error("缺少信号: {0}")]
  MissingSignal(&'static str),
  #[error("没有规则命中")]
  NoRuleMatched,
}

/// 固定信号集合的分类能力
pub trait ConditionClassifier {
  fn signal_set(&self) -> SignalSet;

  /// 按优先级排列的规则表
  fn rules(&self) -> &[Rule];

  fn classify(&self, signals: &Signals) -> Result<ConditionLabel, ClassifyError> {
    let found = signals.signal_set();
    if found != self.signal_set() {
      return Err(ClassifyError::InconsistentSignals {
        expected: self.signal_set(),
        found,
      });
    }
    evaluate_rules(self.rules(), signals)
  }
}

/// 仅结构相似度的阈值表
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StructuralThresholds {
  pub non_functional_below: f32,
  pub damaged_above: f32,
  pub excellent_above: f32,
  pub brand_new_above: f32,
}

impl Default for StructuralThresholds {
  fn default() -> Self {
    Self {
      non_functional_below: 0.5,
      damaged_above: 0.85,
      excellent_above: 0.75,
      brand_new_above: 0.6,
    }
  }
}

#[derive(Debug, Clone)]
pub struct StructuralClassifier {
  thresholds: StructuralThresholds,
  rules: [Rule; 5],
}

impl StructuralClassifier {
  pub fn new(thresholds: StructuralThresholds) -> Self {
    let t = thresholds;
    let rules = [
      Rule::new(
        ConditionLabel::NonFunctional,
        RuleTest::AnyBelow(Bounds::structural(t.non_functional_below)),
      ),
      Rule::new(
        ConditionLabel::Damaged,
        RuleTest::AllAbove(Bounds::structural(t.damaged_above)),
      ),
      Rule::new(
        ConditionLabel::ExcellentCondition,
        RuleTest::AllAbove(Bounds::structural(t.excellent_above)),
      ),
      Rule::new(
        ConditionLabel::BrandNew,
        RuleTest::AllAbove(Bounds::structural(t.brand_new_above)),
      ),
      Rule::new(ConditionLabel::Different, RuleTest::Otherwise),
    ];
    Self { thresholds, rules }
  }

  pub fn thresholds(&self) -> &StructuralThresholds {
    &self.thresholds
  }
}

impl Default for StructuralClassifier {
  fn default() -> Self {
    Self::new(StructuralThresholds::default())
  }
}

impl ConditionClassifier for StructuralClassifier {
  fn signal_set(&self) -> SignalSet {
    SignalSet::StructuralOnly
  }

  fn rules(&self) -> &[Rule] {
    &self.rules
  }
}

/// 结构相似度 + 嵌入相似度的阈值表
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DualThresholds {
  pub non_functional_below: Bounds,
  pub damaged_above: Bounds,
  pub excellent_above: Bounds,
  pub brand_new_above: Bounds,
}

impl Default for DualThresholds {
  fn default() -> Self {
    Self {
      non_functional_below: Bounds::both(0.4, 0.5),
      damaged_above: Bounds::both(0.85, 0.7),
      excellent_above: Bounds::both(0.75, 0.6),
      brand_new_above: Bounds::both(0.6, 0.5),
    }
  }
}

#[derive(Debug, Clone)]
pub struct DualSignalClassifier {
  thresholds: DualThresholds,
  rules: [Rule; 5],
}

impl DualSignalClassifier {
  pub fn new(thresholds: DualThresholds) -> Self {
    let t = thresholds;
    let rules = [
      Rule::new(
        ConditionLabel::NonFunctional,
        RuleTest::AnyBelow(t.non_functional_below),
      ),
      Rule::new(ConditionLabel::Damaged, RuleTest::AllAbove(t.damaged_above)),
      Rule::new(
        ConditionLabel::ExcellentCondition,
        RuleTest::AllAbove(t.excellent_above),
      ),
      Rule::new(ConditionLabel::BrandNew, RuleTest::AllAbove(t.brand_new_above)),
      Rule::new(ConditionLabel::Different, RuleTest::Otherwise),
    ];
    Self { thresholds, rules }
  }

  pub fn thresholds(&self) -> &DualThresholds {
    &self.thresholds
  }
}

impl Default for DualSignalClassifier {
  fn default() -> Self {
    Self::new(DualThresholds::default())
  }
}

impl ConditionClassifier for DualSignalClassifier {
  fn signal_set(&self) -> SignalSet {
    SignalSet::StructuralAndEmbedding
  }

  fn rules(&self) -> &[Rule] {
    &self.rules
  }
}

/// 配置时选择的分类器变体
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ClassifierKind {
  #[default]
  Structural,
  Dual,
}

#[derive(Debug, Clone)]
pub enum ClassifierWrapper {
  Structural(StructuralClassifier),
  DualSignal(DualSignalClassifier),
}

impl ClassifierWrapper {
  pub fn with_kind(
    kind: ClassifierKind,
    structural: StructuralThresholds,
    dual: DualThresholds,
  ) -> Self {
    match kind {
      ClassifierKind::Structural => {
        ClassifierWrapper::Structural(StructuralClassifier::new(structural))
      }
      ClassifierKind::Dual => ClassifierWrapper::DualSignal(DualSignalClassifier::new(dual)),
    }
  }
}

impl ConditionClassifier for ClassifierWrapper {
  fn signal_set(&self) -> SignalSet {
    match self {
      ClassifierWrapper::Structural(classifier) => classifier.signal_set(),
      ClassifierWrapper::DualSignal(classifier) => classifier.signal_set(),
    }
  }

  fn rules(&self) -> &[Rule] {
    match self {
      ClassifierWrapper::Structural(classifier) => classifier.rules(),
      ClassifierWrapper::DualSignal(classifier) => classifier.rules(),
    }
  }
}
