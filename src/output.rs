// 该文件是 Tanwu （探物） 项目的一部分。
// src/output.rs - 输出定义
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
use thiserror::Error;
use url::Url;

#[cfg(any(feature = "save_image_file", feature = "directory_record"))]
use crate::FromUrlWithScheme;
use crate::{FromUrl, postprocess::DetectionReport};

pub trait Render<R> {
  type Error;
  fn render_result(&self, image: &RgbImage, result: &R) -> Result<(), Self::Error>;
}

#[cfg(feature = "save_image_file")]
pub mod draw;

#[cfg(feature = "save_image_file")]
mod save_image_file;
#[cfg(feature = "save_image_file")]
pub use self::save_image_file::{DrawOutput, DrawOutputError};

#[cfg(feature = "directory_record")]
mod directory_record;
#[cfg(feature = "directory_record")]
pub use self::directory_record::{
  CropDirectoryOutput, CropDirectoryOutputError, RECORD_FILE, RecordLabel,
};

#[derive(Error, Debug)]
pub enum OutputError {
  #[cfg(feature = "save_image_file")]
  #[error("保存图像文件错误: {0}")]
  DrawOutputError(#[from] DrawOutputError),
  #[cfg(feature = "directory_record")]
  #[error("目录记录输出错误: {0}")]
  CropDirectoryOutputError(#[from] CropDirectoryOutputError),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

pub enum OutputWrapper {
  #[cfg(feature = "save_image_file")]
  DrawOutput(DrawOutput),
  #[cfg(feature = "directory_record")]
  CropDirectoryOutput(CropDirectoryOutput),
}

impl FromUrl for OutputWrapper {
  type Error = OutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    match url.scheme() {
      #[cfg(feature = "save_image_file")]
      DrawOutput::SCHEME => {
        let output = DrawOutput::from_url(url)?;
        Ok(OutputWrapper::DrawOutput(output))
      }
      #[cfg(feature = "directory_record")]
      CropDirectoryOutput::SCHEME => {
        let output = CropDirectoryOutput::from_url(url)?;
        Ok(OutputWrapper::CropDirectoryOutput(output))
      }
      other => Err(OutputError::SchemeMismatch(other.to_string())),
    }
  }
}

impl Render<DetectionReport> for OutputWrapper {
  type Error = OutputError;

  fn render_result(&self, image: &RgbImage, result: &DetectionReport) -> Result<(), Self::Error> {
    match self {
      #[cfg(feature = "save_image_file")]
      OutputWrapper::DrawOutput(output) => output
        .render_result(image, result)
        .map_err(OutputError::from),
      #[cfg(feature = "directory_record")]
      OutputWrapper::CropDirectoryOutput(output) => output
        .render_result(image, result)
        .map_err(OutputError::from),
    }
  }
}
