// 该文件是 Tanwu （探物） 项目的一部分。
// src/model/onnx.rs - ONNX Runtime 模型后端
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

use std::{path::Path, sync::Mutex};

use image::{RgbImage, imageops::FilterType};
use ndarray::Array4;
use ort::{
  session::{Session, builder::GraphOptimizationLevel},
  value::Value,
};
use tracing::{debug, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::RgbNchwFrame,
  model::{
    DetectResult, EMBEDDING_INPUT_SIZE, Labels, Model, ModelError, YOLO26_INPUT_SIZE,
    decode_yolo26, yolo26::YOLO26_NUM_OUTPUTS,
  },
};

const DEFAULT_THRESHOLD: f32 = 0.5;
const INTRA_THREADS: usize = 4;

fn inference_error(e: impl ToString) -> ModelError {
  ModelError::Inference(e.to_string())
}

fn load_session(path: &Path) -> Result<Session, ModelError> {
  info!("加载模型文件: {}", path.display());
  if !path.exists() {
    return Err(ModelError::load(path, "文件不存在"));
  }

  let session = Session::builder()
    .map_err(|e| ModelError::load(path, e))?
    .with_optimization_level(GraphOptimizationLevel::Level3)
    .map_err(|e| ModelError::load(path, e))?
    .with_intra_threads(INTRA_THREADS)
    .map_err(|e| ModelError::load(path, e))?
    .commit_from_file(path)
    .map_err(|e| ModelError::load(path, e))?;
  info!("模型加载完成");
  Ok(session)
}

/// 在互斥锁保护下运行会话，返回每个输出展平后的数据
fn run_session(
  session: &Mutex<Session>,
  input: Array4<f32>,
  num_outputs: usize,
) -> Result<Vec<Vec<f32>>, ModelError> {
  let mut session = session
    .lock()
    .map_err(|_| ModelError::Inference("会话锁已损坏".to_string()))?;
  let value = Value::from_array(input).map_err(inference_error)?;
  let outputs = session
    .run(ort::inputs![value])
    .map_err(inference_error)?;

  let mut tensors = Vec::with_capacity(num_outputs);
  for i in 0..num_outputs {
    let array = outputs[i]
      .try_extract_array::<f32>()
      .map_err(inference_error)?;
    tensors.push(array.iter().copied().collect());
  }
  Ok(tensors)
}

/// YOLO26 检测模型，输入被拉伸到 640x640，检测框因此相对原图归一化
pub struct OnnxYolo26 {
  session: Mutex<Session>,
  labels: Labels,
  threshold: f32,
}

impl FromUrlWithScheme for OnnxYolo26 {
  const SCHEME: &'static str = "yolo26";
}

impl FromUrl for OnnxYolo26 {
  type Error = ModelError;

  /// `yolo26:///path/model.onnx?labels=/path/labels.txt&threshold=0.5`
  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(ModelError::SchemeMismatch(url.scheme().to_string()));
    }

    let mut labels = Labels::coco();
    let mut threshold = DEFAULT_THRESHOLD;
    for (k, v) in url.query_pairs() {
      match k.as_ref() {
        "labels" => {
          let file: &str = &v;
          let file = Path::new(file);
          labels = Labels::from_file(file).map_err(|e| ModelError::load(file, e))?;
        }
        "threshold" => {
          threshold = v
            .parse()
            .map_err(|_| ModelError::load(crate::url_path(url), format!("无效的阈值: {}", v)))?;
        }
        _ => {}
      }
    }

    let path = crate::url_path(url);
    let session = load_session(&path)?;
    if session.outputs.len() != YOLO26_NUM_OUTPUTS {
      return Err(ModelError::load(
        &path,
        format!(
          "预期模型输出数量为 {}, 实际为 {}",
          YOLO26_NUM_OUTPUTS,
          session.outputs.len()
        ),
      ));
    }

    Ok(Self {
      session: Mutex::new(session),
      labels,
      threshold,
    })
  }
}

impl Model for OnnxYolo26 {
  type Input = RgbImage;
  type Output = DetectResult;
  type Error = ModelError;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    let stretched = image::imageops::resize(
      input,
      YOLO26_INPUT_SIZE,
      YOLO26_INPUT_SIZE,
      FilterType::Triangle,
    );
    let frame = RgbNchwFrame::<YOLO26_INPUT_SIZE, YOLO26_INPUT_SIZE>::try_from(&stretched)?;
    let size = YOLO26_INPUT_SIZE as usize;
    let tensor = Array4::from_shape_vec((1, 3, size, size), frame.to_unit_f32())
      .map_err(|e| ModelError::Inference(e.to_string()))?;

    debug!("执行模型推理");
    let outputs = run_session(&self.session, tensor, YOLO26_NUM_OUTPUTS)?;
    Ok(DetectResult::from(decode_yolo26(
      &outputs,
      self.threshold,
      &self.labels,
    )))
  }
}

/// 嵌入模型，输入 1x3x224x224，输出第一个张量展平后的向量
pub struct OnnxEmbedder {
  session: Mutex<Session>,
}

impl FromUrlWithScheme for OnnxEmbedder {
  const SCHEME: &'static str = "embed";
}

impl FromUrl for OnnxEmbedder {
  type Error = ModelError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(ModelError::SchemeMismatch(url.scheme().to_string()));
    }
    Ok(Self {
      session: Mutex::new(load_session(&crate::url_path(url))?),
    })
  }
}

impl Model for OnnxEmbedder {
  type Input = RgbNchwFrame<EMBEDDING_INPUT_SIZE, EMBEDDING_INPUT_SIZE>;
  type Output = Vec<f32>;
  type Error = ModelError;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    let size = EMBEDDING_INPUT_SIZE as usize;
    let tensor = Array4::from_shape_vec((1, 3, size, size), input.to_unit_f32())
      .map_err(|e| ModelError::Inference(e.to_string()))?;
    let mut outputs = run_session(&self.session, tensor, 1)?;
    let vector = outputs.pop().unwrap_or_default();
    debug!("嵌入向量维度: {}", vector.len());
    Ok(vector)
  }
}
