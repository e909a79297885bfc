// 该文件是 Tanwu （探物） 项目的一部分。
// src/task.rs - 检测与检索任务
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

use std::time::Instant;

use image::{DynamicImage, RgbImage};
use tracing::{info, warn};

use crate::{
  config::{EMBEDDING_SIZE, PipelineConfig},
  error::Error,
  frame::RgbNchwFrame,
  model::{Detector, EMBEDDING_INPUT_SIZE, Embedder},
  normalize::normalize,
  output::Render,
  postprocess::{Crop, DetectionReport, crop_detections},
  search::SearchClient,
};

pub trait Task<I, M, O>: Sized {
  type Output;
  type Error;
  fn run_task(self, input: I, model: M, output: O) -> Result<Self::Output, Self::Error>;
}

/// 归一化 → 检测 → 裁剪 → 渲染
#[derive(Debug, Clone, Default)]
pub struct DetectTask {
  config: PipelineConfig,
}

impl DetectTask {
  pub fn new(config: PipelineConfig) -> Self {
    Self { config }
  }

  pub fn config(&self) -> &PipelineConfig {
    &self.config
  }

  /// 返回检测所用的归一化图像及检测结果，裁剪坐标相对于该图像
  pub fn detect<M: Detector>(
    &self,
    input: &DynamicImage,
    model: &M,
  ) -> Result<(RgbImage, DetectionReport), Error> {
    let image = normalize(input, Some(&self.config.detection_size))?;
    info!(
      "输入图像 {}x{} 归一化为 {}x{}，开始推理...",
      input.width(),
      input.height(),
      image.width(),
      image.height()
    );

    let now = Instant::now();
    let detections = model.infer(&image)?;
    info!(
      "推理完成，耗时: {:.2?}，检测到 {} 个目标",
      now.elapsed(),
      detections.len()
    );

    let crops = crop_detections(&image, &detections.items, self.config.orientation);
    if crops.len() < detections.len() {
      warn!(
        "{} 个检测结果无法裁剪，已丢弃",
        detections.len() - crops.len()
      );
    }

    let report = DetectionReport {
      orientation: self.config.orientation,
      detections,
      crops,
    };
    Ok((image, report))
  }
}

impl<M, O> Task<DynamicImage, M, O> for DetectTask
where
  M: Detector,
  O: Render<DetectionReport>,
  Error: From<O::Error>,
{
  type Output = DetectionReport;
  type Error = Error;

  fn run_task(self, input: DynamicImage, model: M, output: O) -> Result<Self::Output, Self::Error> {
    info!("开始检测任务...");
    let (image, report) = self.detect(&input, &model)?;
    let now = Instant::now();
    output.render_result(&image, &report)?;
    info!("渲染完成，耗时: {:.2?}", now.elapsed());
    Ok(report)
  }
}

/// 检索任务的结果
#[derive(Debug, Clone)]
pub struct SearchOutcome {
  pub report: DetectionReport,
  /// 用于检索的裁剪在 `report.crops` 中的序号
  pub crop_index: usize,
  /// 检索服务的原始响应
  pub response: String,
}

/// 在检测任务之后，选取一个裁剪，嵌入并调用远端检索
pub struct SearchTask {
  detect: DetectTask,
  client: SearchClient,
}

impl SearchTask {
  pub fn new(config: PipelineConfig, client: SearchClient) -> Self {
    Self {
      detect: DetectTask::new(config),
      client,
    }
  }

  fn select_crop<'a>(&self, report: &'a DetectionReport) -> Result<(usize, &'a Crop), Error> {
    let selected = match self.detect.config().crop_index {
      Some(index) => report.crops.get(index).map(|crop| (index, crop)),
      None => report
        .crops
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.confidence.total_cmp(&b.confidence)),
    };
    selected.ok_or(Error::NoCrop)
  }

  pub fn embed<E: Embedder>(crop: &Crop, embedder: &E) -> Result<Vec<f32>, Error> {
    let image = normalize(
      &DynamicImage::ImageRgb8(crop.image.clone()),
      Some(&EMBEDDING_SIZE),
    )?;
    let frame = RgbNchwFrame::<EMBEDDING_INPUT_SIZE, EMBEDDING_INPUT_SIZE>::try_from(&image)?;
    let now = Instant::now();
    let vector = embedder.infer(&frame)?;
    info!("嵌入完成，耗时: {:.2?}", now.elapsed());
    Ok(vector)
  }
}

impl<D, E, O> Task<DynamicImage, (D, E), O> for SearchTask
where
  D: Detector,
  E: Embedder,
  O: Render<DetectionReport>,
  Error: From<O::Error>,
{
  type Output = SearchOutcome;
  type Error = Error;

  fn run_task(
    self,
    input: DynamicImage,
    (detector, embedder): (D, E),
    output: O,
  ) -> Result<Self::Output, Self::Error> {
    info!("开始检索任务...");
    let (image, report) = self.detect.detect(&input, &detector)?;
    output.render_result(&image, &report)?;

    let (crop_index, crop) = self.select_crop(&report)?;
    info!(
      "选取第 {} 个裁剪 ({}, 置信度 {:.2}) 用于检索",
      crop_index, crop.label, crop.confidence
    );
    let vector = Self::embed(crop, &embedder)?;
    let response = self.client.search(&[vector])?;

    Ok(SearchOutcome {
      report,
      crop_index,
      response,
    })
  }
}

#[cfg(test)]
mod tests {
  use std::convert::Infallible;

  use super::*;
  use crate::{
    FromUrl,
    geometry::NormalizedRect,
    model::{Detection, ModelError, ReplayDetector},
  };

  /// 只记录调用的输出端
  struct Discard;

  impl Render<DetectionReport> for Discard {
    type Error = Infallible;

    fn render_result(&self, _: &RgbImage, _: &DetectionReport) -> Result<(), Self::Error> {
      Ok(())
    }
  }

  impl From<Infallible> for Error {
    fn from(e: Infallible) -> Self {
      match e {}
    }
  }

  fn replay() -> ReplayDetector {
    ReplayDetector::new(vec![
      Detection {
        rect: NormalizedRect::new(0.0, 0.0, 0.5, 0.5),
        label: "cup".to_string(),
        confidence: 0.3,
      },
      Detection {
        rect: NormalizedRect::new(0.5, 0.5, 0.5, 0.5),
        label: "bottle".to_string(),
        confidence: 0.8,
      },
    ])
  }

  #[test]
  fn detect_task_crops_on_the_detection_view() {
    let input = DynamicImage::ImageRgb8(RgbImage::new(300, 200));
    let report = DetectTask::default()
      .run_task(input, replay(), Discard)
      .unwrap();

    assert_eq!(report.detections.len(), 2);
    assert_eq!(report.crops.len(), 2);
    // 默认检测视图为 384x640
    assert_eq!(report.crops[0].image.dimensions(), (192, 320));
  }

  #[test]
  fn selects_highest_confidence_crop_by_default() {
    let client =
      SearchClient::from_url(&url::Url::parse("http://127.0.0.1:9/search").unwrap()).unwrap();
    let task = SearchTask::new(PipelineConfig::default(), client);
    let (_, report) = task
      .detect
      .detect(&DynamicImage::ImageRgb8(RgbImage::new(64, 64)), &replay())
      .unwrap();

    let (index, crop) = task.select_crop(&report).unwrap();
    assert_eq!(index, 1);
    assert_eq!(crop.label, "bottle");
  }

  #[test]
  fn out_of_range_crop_index_is_not_found() {
    let client =
      SearchClient::from_url(&url::Url::parse("http://127.0.0.1:9/search").unwrap()).unwrap();
    let config = PipelineConfig {
      crop_index: Some(5),
      ..PipelineConfig::default()
    };
    let task = SearchTask::new(config, client);
    let (_, report) = task
      .detect
      .detect(&DynamicImage::ImageRgb8(RgbImage::new(64, 64)), &replay())
      .unwrap();

    assert!(matches!(task.select_crop(&report), Err(Error::NoCrop)));
  }

  struct ShapeEmbedder;

  impl crate::model::Model for ShapeEmbedder {
    type Input = RgbNchwFrame<EMBEDDING_INPUT_SIZE, EMBEDDING_INPUT_SIZE>;
    type Output = Vec<f32>;
    type Error = ModelError;

    fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
      Ok(vec![
        input.width() as f32,
        input.height() as f32,
        input.channels() as f32,
      ])
    }
  }

  #[test]
  fn crops_are_embedded_at_model_size() {
    let crop = Crop {
      image: RgbImage::new(37, 91),
      label: "cup".to_string(),
      confidence: 0.5,
      rect: crate::geometry::PixelRect {
        x: 0,
        y: 0,
        width: 37,
        height: 91,
      },
    };
    let vector = SearchTask::embed(&crop, &ShapeEmbedder).unwrap();
    assert_eq!(vector, vec![224.0, 224.0, 3.0]);
  }
}
