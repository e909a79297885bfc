// 该文件是 Tanwu （探物） 项目的一部分。
// src/model.rs - 模型
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

use std::path::Path;

use image::RgbImage;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::{
  FromUrl,
  frame::{FrameError, RgbNchwFrame},
  geometry::NormalizedRect,
};

/// 嵌入模型输入边长
pub const EMBEDDING_INPUT_SIZE: u32 = 224;

pub trait Model {
  type Input;
  type Output;
  type Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error>;
}

#[derive(Error, Debug)]
pub enum ModelError {
  #[error("模型加载错误: {path}: {reason}")]
  Load { path: String, reason: String },
  #[error("模型输入形状不匹配: {0}")]
  Shape(#[from] FrameError),
  #[error("推理错误: {0}")]
  Inference(String),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("不支持的模型方案: {0}")]
  Unsupported(String),
}

impl ModelError {
  pub fn load(path: impl AsRef<Path>, reason: impl ToString) -> Self {
    ModelError::Load {
      path: path.as_ref().display().to_string(),
      reason: reason.to_string(),
    }
  }
}

/// 单个检测结果，矩形为归一化坐标，原点在左下角
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
  pub rect: NormalizedRect,
  pub label: String,
  pub confidence: f32,
}

#[derive(Debug, Clone, Default)]
pub struct DetectResult {
  pub items: Box<[Detection]>,
}

impl DetectResult {
  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  pub fn len(&self) -> usize {
    self.items.len()
  }
}

impl From<Vec<Detection>> for DetectResult {
  fn from(items: Vec<Detection>) -> Self {
    Self {
      items: items.into_boxed_slice(),
    }
  }
}

/// 检测模型：输入任意尺寸图像，输出相对该图像的归一化矩形
pub trait Detector: Model<Input = RgbImage, Output = DetectResult, Error = ModelError> {}

impl<M> Detector for M where M: Model<Input = RgbImage, Output = DetectResult, Error = ModelError> {}

/// 输入 224x224 的 NCHW 帧，输出一条嵌入向量
pub trait Embedder:
  Model<
    Input = RgbNchwFrame<EMBEDDING_INPUT_SIZE, EMBEDDING_INPUT_SIZE>,
    Output = Vec<f32>,
    Error = ModelError,
  >
{
}

impl<M> Embedder for M where
  M: Model<
      Input = RgbNchwFrame<EMBEDDING_INPUT_SIZE, EMBEDDING_INPUT_SIZE>,
      Output = Vec<f32>,
      Error = ModelError,
    >
{
}

mod labels;
pub use self::labels::Labels;

mod yolo26;
pub use self::yolo26::{YOLO26_INPUT_SIZE, decode_yolo26};

mod replay;
pub use self::replay::ReplayDetector;

#[cfg(feature = "onnx")]
mod onnx;
#[cfg(feature = "onnx")]
pub use self::onnx::{OnnxEmbedder, OnnxYolo26};

/// 按 URI 方案选择的检测模型
pub enum DetectorWrapper {
  Replay(ReplayDetector),
  #[cfg(feature = "onnx")]
  Yolo26(Box<OnnxYolo26>),
}

impl FromUrl for DetectorWrapper {
  type Error = ModelError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    use crate::FromUrlWithScheme;

    match url.scheme() {
      ReplayDetector::SCHEME => Ok(DetectorWrapper::Replay(ReplayDetector::from_url(url)?)),
      #[cfg(feature = "onnx")]
      OnnxYolo26::SCHEME => Ok(DetectorWrapper::Yolo26(Box::new(OnnxYolo26::from_url(url)?))),
      other => Err(ModelError::Unsupported(other.to_string())),
    }
  }
}

impl Model for DetectorWrapper {
  type Input = RgbImage;
  type Output = DetectResult;
  type Error = ModelError;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    match self {
      DetectorWrapper::Replay(model) => model.infer(input),
      #[cfg(feature = "onnx")]
      DetectorWrapper::Yolo26(model) => model.infer(input),
    }
  }
}
