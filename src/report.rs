// 该文件是 Pinxiang （品相） 项目的一部分。
// src/report.rs - 比对结果报告
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

use crate::{
  classifier::{ConditionLabel, round2},
  detector::Region,
  error::ComparisonError,
  pipeline::ComparisonOutcome,
  session::{AggregateResult, View, ViewResult},
};

// 报告中的分数保留两位小数；单视角判定使用完整精度

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewSummary {
  pub view: View,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub similarity: Option<f32>,
  pub ssi: f32,
  pub condition: ConditionLabel,
  pub regions: usize,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub annotated: Option<String>,
}

impl From<&ViewResult> for ViewSummary {
  fn from(result: &ViewResult) -> Self {
    Self {
      view: result.view,
      similarity: result.signals.embedding.map(round2),
      ssi: round2(result.signals.structural),
      condition: result.label,
      regions: result.region_count,
      annotated: result
        .annotated
        .as_ref()
        .map(|path| path.display().to_string()),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SingleViewReport {
  pub message: String,
  #[serde(flatten)]
  pub summary: ViewSummary,
  /// 用户原图坐标下的差异区域
  pub boxes: Vec<Region>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateReport {
  pub message: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub overall_similarity: Option<f32>,
  pub overall_ssi: f32,
  pub overall_condition: ConditionLabel,
  pub front: ViewSummary,
  pub back: ViewSummary,
}

impl From<&AggregateResult> for AggregateReport {
  fn from(aggregate: &AggregateResult) -> Self {
    Self {
      message: "Comparison successful.".to_string(),
      overall_similarity: aggregate.signals.embedding.map(round2),
      overall_ssi: round2(aggregate.signals.structural),
      overall_condition: aggregate.label,
      front: ViewSummary::from(&aggregate.front),
      back: ViewSummary::from(&aggregate.back),
    }
  }
}

/// 返回给调用方的结构化结果
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ComparisonReport {
  View(SingleViewReport),
  Aggregate(AggregateReport),
}

impl From<&ComparisonOutcome> for ComparisonReport {
  fn from(outcome: &ComparisonOutcome) -> Self {
    match outcome {
      ComparisonOutcome::View(report) => {
        let summary = ViewSummary::from(&report.result);
        let message = match summary.view {
          View::Front => "Front image processed.",
          View::Back => "Back image processed.",
        };
        ComparisonReport::View(SingleViewReport {
          message: message.to_string(),
          summary,
          boxes: report.regions.clone(),
        })
      }
      ComparisonOutcome::Aggregate { aggregate, .. } => {
        ComparisonReport::Aggregate(AggregateReport::from(aggregate))
      }
    }
  }
}

impl ComparisonReport {
  pub fn to_json(&self) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(self)
  }
}

/// 失败时返回给调用方的信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorReport {
  pub error: String,
  pub kind: &'static str,
  pub client_error: bool,
}

impl From<&ComparisonError> for ErrorReport {
  fn from(err: &ComparisonError) -> Self {
    Self {
      error: err.to_string(),
      kind: err.kind().as_str(),
      client_error: err.is_client_error(),
    }
  }
}
