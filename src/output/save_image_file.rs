// 该文件是 Tanwu （探物） 项目的一部分。
// src/output/save_image_file.rs - 保存带检测框的图像文件
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

use std::path::PathBuf;

use image::RgbImage;
use thiserror::Error;
use tracing::info;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  output::{Render, draw::Draw},
  postprocess::DetectionReport,
};

pub struct DrawOutput {
  path: PathBuf,
  draw: Draw,
}

#[derive(Error, Debug)]
pub enum DrawOutputError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

impl FromUrlWithScheme for DrawOutput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for DrawOutput {
  type Error = DrawOutputError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(DrawOutputError::SchemeMismatch(format!(
        "期望保存方式 '{}', 实际保存方式 '{}'",
        Self::SCHEME,
        uri.scheme()
      )));
    }

    Ok(DrawOutput {
      path: crate::url_path(uri),
      draw: Draw::default(),
    })
  }
}

impl DrawOutput {
  pub fn path(&self) -> &PathBuf {
    &self.path
  }

  fn save_image(&self, image: &RgbImage) -> Result<(), DrawOutputError> {
    if let Some(parent) = self.path.parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent)?;
    }

    image.save(&self.path)?;
    info!("保存图像到文件: {}", self.path.display());

    Ok(())
  }
}

impl Render<DetectionReport> for DrawOutput {
  type Error = DrawOutputError;

  fn render_result(&self, image: &RgbImage, result: &DetectionReport) -> Result<(), Self::Error> {
    let mut canvas = image.clone();
    self.draw.draw_report(&mut canvas, result);
    self.save_image(&canvas)
  }
}
