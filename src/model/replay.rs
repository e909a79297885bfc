// 该文件是 Tanwu （探物） 项目的一部分。
// src/model/replay.rs - 回放预先计算的检测结果
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
use tracing::{debug, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  model::{DetectResult, Detection, Model, ModelError},
};

/// 从 JSON 文件读取检测结果，对任何输入都返回同一组结果
///
/// 文件内容为 `Detection` 数组，矩形原点在左下角。
#[derive(Debug, Clone)]
pub struct ReplayDetector {
  detections: Vec<Detection>,
}

impl FromUrlWithScheme for ReplayDetector {
  const SCHEME: &'static str = "replay";
}

impl FromUrl for ReplayDetector {
  type Error = ModelError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(ModelError::SchemeMismatch(url.scheme().to_string()));
    }

    let path = crate::url_path(url);
    info!("加载回放检测结果: {}", path.display());
    let text = std::fs::read_to_string(&path).map_err(|e| ModelError::load(&path, e))?;
    Self::from_json(&text).map_err(|e| ModelError::load(&path, e))
  }
}

impl ReplayDetector {
  pub fn new(detections: Vec<Detection>) -> Self {
    Self { detections }
  }

  pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
    Ok(Self::new(serde_json::from_str(text)?))
  }
}

impl Model for ReplayDetector {
  type Input = RgbImage;
  type Output = DetectResult;
  type Error = ModelError;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    debug!(
      "回放 {} 个检测结果 (输入 {}x{})",
      self.detections.len(),
      input.width(),
      input.height()
    );
    Ok(DetectResult::from(self.detections.clone()))
  }
}
