// 该文件是 Pinxiang （品相） 项目的一部分。
// src/classifier/rules.rs - 有序阈值规则
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

use crate::classifier::{ClassifyError, ConditionLabel, Signals};

/// 各信号的阈值；`None` 表示该规则不检查此信号
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Bounds {
  pub structural: Option<f32>,
  pub embedding: Option<f32>,
}

impl Bounds {
  pub fn structural(value: f32) -> Self {
    Self {
      structural: Some(value),
      embedding: None,
    }
  }

  pub fn both(embedding: f32, structural: f32) -> Self {
    Self {
      structural: Some(structural),
      embedding: Some(embedding),
    }
  }

  // (信号值, 阈值) 对；规则要求的信号缺失时报错
  fn pairs(&self, signals: &Signals) -> Result<Vec<(f32, f32)>, ClassifyError> {
    let mut pairs = Vec::with_capacity(2);
    if let Some(bound) = self.embedding {
      let value = signals
        .embedding
        .ok_or(ClassifyError::MissingSignal("embedding"))?;
      pairs.push((value, bound));
    }
    if let Some(bound) = self.structural {
      pairs.push((signals.structural, bound));
    }
    Ok(pairs)
  }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RuleTest {
  /// 任一信号严格低于阈值
  AnyBelow(Bounds),
  /// 所有信号严格高于阈值
  AllAbove(Bounds),
  /// 兜底
  Otherwise,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rule {
  pub label: ConditionLabel,
  pub test: RuleTest,
}

impl Rule {
  pub const fn new(label: ConditionLabel, test: RuleTest) -> Self {
    Self { label, test }
  }

  pub fn matches(&self, signals: &Signals) -> Result<bool, ClassifyError> {
    Ok(match &self.test {
      RuleTest::AnyBelow(bounds) => bounds
        .pairs(signals)?
        .into_iter()
        .any(|(value, bound)| value < bound),
      RuleTest::AllAbove(bounds) => {
        let pairs = bounds.pairs(signals)?;
        !pairs.is_empty() && pairs.into_iter().all(|(value, bound)| value > bound)
      }
      RuleTest::Otherwise => true,
    })
  }
}

/// 按优先级依次检查规则，第一条命中的规则决定标签
pub fn evaluate_rules(rules: &[Rule], signals: &Signals) -> Result<ConditionLabel, ClassifyError> {
  for rule in rules {
    if rule.matches(signals)? {
      return Ok(rule.label);
    }
  }
  Err(ClassifyError::NoRuleMatched)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn first_matching_rule_wins() {
    let rules = [
      Rule::new(
        ConditionLabel::NonFunctional,
        RuleTest::AnyBelow(Bounds::structural(0.5)),
      ),
      Rule::new(
        ConditionLabel::Damaged,
        RuleTest::AllAbove(Bounds::structural(0.1)),
      ),
      Rule::new(ConditionLabel::Different, RuleTest::Otherwise),
    ];
    assert_eq!(
      evaluate_rules(&rules, &Signals::structural(0.3)),
      Ok(ConditionLabel::NonFunctional)
    );
    assert_eq!(
      evaluate_rules(&rules, &Signals::structural(0.6)),
      Ok(ConditionLabel::Damaged)
    );
  }

  #[test]
  fn comparisons_are_strict() {
    let below = Rule::new(
      ConditionLabel::NonFunctional,
      RuleTest::AnyBelow(Bounds::structural(0.5)),
    );
    let above = Rule::new(
      ConditionLabel::BrandNew,
      RuleTest::AllAbove(Bounds::structural(0.5)),
    );
    let at = Signals::structural(0.5);
    assert_eq!(below.matches(&at), Ok(false));
    assert_eq!(above.matches(&at), Ok(false));
  }

  #[test]
  fn missing_required_signal_is_an_error() {
    let rule = Rule::new(
      ConditionLabel::Damaged,
      RuleTest::AllAbove(Bounds::both(0.85, 0.7)),
    );
    assert_eq!(
      rule.matches(&Signals::structural(0.9)),
      Err(ClassifyError::MissingSignal("embedding"))
    );
  }

  #[test]
  fn no_rule_matched_without_fallback() {
    let rules = [Rule::new(
      ConditionLabel::Damaged,
      RuleTest::AllAbove(Bounds::structural(0.9)),
    )];
    assert_eq!(
      evaluate_rules(&rules, &Signals::structural(0.2)),
      Err(ClassifyError::NoRuleMatched)
    );
  }
}
