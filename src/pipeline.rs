// 该文件是 Pinxiang （品相） 项目的一部分。
// src/pipeline.rs - 单视角比对流程编排
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

use image::RgbImage;
use tracing::{debug, info, warn};
use url::Url;

use crate::{
  FromUrl,
  classifier::{ClassifierKind, ClassifierWrapper, ConditionClassifier, Signals},
  config::ComparisonConfig,
  detector::{DifferenceRegionDetector, Region},
  error::ComparisonError,
  frame::RgbNchwFrame,
  input::{ImageFileInput, ImageLoader, decode_with_limits},
  output::{
    OutputWrapper, Render,
    draw::{Draw, DrawRegionsOnImage},
  },
  session::{AggregateResult, ComparisonSession, View, ViewResult},
  similarity::{Embedding, FeatureExtractor, StructuralSimilarity},
};

/// 某个视角的固定参考图像，构建时已对齐到比对分辨率
struct Reference {
  frame: RgbNchwFrame,
  embedding: Option<Embedding>,
}

impl Reference {
  fn prepare(
    loader: &ImageLoader,
    image: RgbImage,
    extractor: Option<&dyn FeatureExtractor>,
  ) -> Result<Self, ComparisonError> {
    let loaded = loader.load_image(image)?;
    let embedding = match extractor {
      Some(extractor) => Some(extractor.extract(&loaded.frame.to_rgb_image())?),
      None => None,
    };
    Ok(Self {
      frame: loaded.frame,
      embedding,
    })
  }
}

/// 一次单视角比对的完整产物
#[derive(Debug, Clone)]
pub struct ViewReport {
  pub result: ViewResult,
  /// 用户原始分辨率下的差异区域
  pub regions: Vec<Region>,
  /// 在用户原图副本上绘制了差异区域
  pub annotated: RgbImage,
  pub channel_scores: Vec<f32>,
}

#[derive(Debug, Clone)]
pub enum ComparisonOutcome {
  /// 对侧视角尚未提交
  View(ViewReport),
  /// 本次提交补齐了正反面
  Aggregate {
    latest: ViewReport,
    aggregate: AggregateResult,
  },
}

impl ComparisonOutcome {
  pub fn latest(&self) -> &ViewReport {
    match self {
      ComparisonOutcome::View(report) => report,
      ComparisonOutcome::Aggregate { latest, .. } => latest,
    }
  }

  pub fn aggregate(&self) -> Option<&AggregateResult> {
    match self {
      ComparisonOutcome::View(_) => None,
      ComparisonOutcome::Aggregate { aggregate, .. } => Some(aggregate),
    }
  }
}

pub struct ComparisonPipelineBuilder {
  config: ComparisonConfig,
  front: Option<RgbImage>,
  back: Option<RgbImage>,
  extractor: Option<Box<dyn FeatureExtractor>>,
  output: Option<OutputWrapper>,
}

impl ComparisonPipelineBuilder {
  pub fn new(config: ComparisonConfig) -> Self {
    Self {
      config,
      front: None,
      back: None,
      extractor: None,
      output: None,
    }
  }

  pub fn with_reference(mut self, view: View, image: RgbImage) -> Self {
    match view {
      View::Front => self.front = Some(image),
      View::Back => self.back = Some(image),
    }
    self
  }

  /// 从 `image://` 读取参考图像，解码时使用与用户图像相同的限制
  pub fn with_reference_url(self, view: View, url: &Url) -> Result<Self, ComparisonError> {
    let input = ImageFileInput::from_url(url)?;
    let image = decode_with_limits(input.bytes(), self.config.limits)?;
    info!(
      "加载{}参考图像: {} ({}x{})",
      view,
      input.path().display(),
      image.width(),
      image.height()
    );
    Ok(self.with_reference(view, image))
  }

  pub fn with_extractor(mut self, extractor: impl FeatureExtractor + 'static) -> Self {
    self.extractor = Some(Box::new(extractor));
    self
  }

  pub fn with_output(mut self, output: OutputWrapper) -> Self {
    self.output = Some(output);
    self
  }

  pub fn with_output_url(self, url: &Url) -> Result<Self, ComparisonError> {
    let output = OutputWrapper::from_url(url)?;
    info!("标注图像输出: {}", url);
    Ok(self.with_output(output))
  }

  pub fn build(self) -> Result<ComparisonPipeline, ComparisonError> {
    let config = self.config;
    config.validate()?;

    let (width, height) = config.resolution;
    let loader = ImageLoader::new(width, height)?
      .with_filter(config.filter.into())
      .with_limits(config.limits);
    let scorer = StructuralSimilarity::new(config.ssim)?;
    let detector = DifferenceRegionDetector::new(config.regions);
    let classifier = ClassifierWrapper::with_kind(
      config.classifier,
      config.structural_thresholds,
      config.dual_thresholds,
    );

    let extractor = match (config.classifier, self.extractor) {
      (ClassifierKind::Dual, Some(extractor)) => Some(extractor),
      (ClassifierKind::Dual, None) => {
        return Err(ComparisonError::config("双信号分类器需要特征提取器"));
      }
      (ClassifierKind::Structural, Some(extractor)) => {
        warn!("结构分类器不使用嵌入信号，忽略特征提取器 {}", extractor.name());
        None
      }
      (ClassifierKind::Structural, None) => None,
    };

    let front = self
      .front
      .ok_or_else(|| ComparisonError::config("缺少正面参考图像"))?;
    let back = self
      .back
      .ok_or_else(|| ComparisonError::config("缺少背面参考图像"))?;
    let front = Reference::prepare(&loader, front, extractor.as_deref())?;
    let back = Reference::prepare(&loader, back, extractor.as_deref())?;

    info!(
      "比对流程就绪: {}x{}, 分类器 {:?}",
      width, height, config.classifier
    );

    Ok(ComparisonPipeline {
      loader,
      scorer,
      detector,
      classifier,
      draw: Draw::default(),
      front,
      back,
      extractor,
      output: self.output,
      session: ComparisonSession::new(),
    })
  }
}

/// 可在多个线程间共享；会话状态由内部的 [`ComparisonSession`] 保护
pub struct ComparisonPipeline {
  loader: ImageLoader,
  scorer: StructuralSimilarity,
  detector: DifferenceRegionDetector,
  classifier: ClassifierWrapper,
  draw: Draw,
  front: Reference,
  back: Reference,
  extractor: Option<Box<dyn FeatureExtractor>>,
  output: Option<OutputWrapper>,
  session: ComparisonSession,
}

impl ComparisonPipeline {
  pub fn builder(config: ComparisonConfig) -> ComparisonPipelineBuilder {
    ComparisonPipelineBuilder::new(config)
  }

  pub fn session(&self) -> &ComparisonSession {
    &self.session
  }

  pub fn classifier(&self) -> &ClassifierWrapper {
    &self.classifier
  }

  fn reference(&self, view: View) -> &Reference {
    match view {
      View::Front => &self.front,
      View::Back => &self.back,
    }
  }

  /// 以字符串视角标签提交一张用户图像
  pub fn compare(&self, bytes: &[u8], tag: &str) -> Result<ComparisonOutcome, ComparisonError> {
    let view = tag.parse::<View>().inspect_err(|err| warn!("{}", err))?;
    self.compare_view(bytes, view)
  }

  /// 比对并更新会话；任何一步失败时会话保持不变
  pub fn compare_view(
    &self,
    bytes: &[u8],
    view: View,
  ) -> Result<ComparisonOutcome, ComparisonError> {
    let mut report = self.evaluate(bytes, view)?;

    if let Some(output) = &self.output {
      let path = output.render_result(view, &report.annotated)?;
      report.result.annotated = Some(path);
    }

    let recorded = self.session.record(report.result.clone(), &self.classifier)?;
    match recorded.into_aggregate() {
      Some(aggregate) => Ok(ComparisonOutcome::Aggregate {
        latest: report,
        aggregate,
      }),
      None => {
        info!("{}视角已记录，等待{}视角", view, view.complement());
        Ok(ComparisonOutcome::View(report))
      }
    }
  }

  /// 只做比对与分类，不写输出也不触碰会话
  pub fn evaluate(&self, bytes: &[u8], view: View) -> Result<ViewReport, ComparisonError> {
    info!("开始比对{}视角 ({} 字节)", view, bytes.len());
    let now = std::time::Instant::now();

    let loaded = self.loader.load_bytes(bytes)?;
    let reference = self.reference(view);

    let ssim = self.scorer.score(&reference.frame, &loaded.frame)?;
    let detected = self.detector.detect(&ssim.difference);

    let (sx, sy) = loaded.scale_to_original();
    let regions: Vec<Region> = detected.iter().map(|r| r.scaled(sx, sy)).collect();
    let annotated = self.draw.annotate(&loaded.original, &regions);

    let signals = match (&self.extractor, &reference.embedding) {
      (Some(extractor), Some(reference_embedding)) => {
        let embedding = extractor.extract(&loaded.frame.to_rgb_image())?;
        let similarity = reference_embedding.cosine_similarity(&embedding)?;
        debug!("嵌入余弦相似度 ({}): {:.4}", extractor.name(), similarity);
        Signals::with_embedding(ssim.score, similarity)
      }
      _ => Signals::structural(ssim.score),
    };
    let label = self.classifier.classify(&signals)?;

    info!(
      "{}视角比对完成: SSIM {:.4}, {} 个差异区域, 品相 {}, 耗时 {:.2?}",
      view,
      ssim.score,
      regions.len(),
      label,
      now.elapsed()
    );

    Ok(ViewReport {
      result: ViewResult {
        view,
        signals,
        label,
        region_count: regions.len(),
        annotated: None,
      },
      regions,
      annotated,
      channel_scores: ssim.channel_scores,
    })
  }
}
