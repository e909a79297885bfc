// 该文件是 Tanwu （探物） 项目的一部分。
// src/normalize.rs - 图像尺寸归一化
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

use std::str::FromStr;

use image::{DynamicImage, Rgb, RgbImage, imageops::FilterType};
use thiserror::Error;
use tracing::debug;

use crate::geometry::{GeometryParseError, Size};

const RESIZE_FILTER: FilterType = FilterType::CatmullRom;

#[derive(Error, Debug)]
pub enum NormalizeError {
  #[error("图像尺寸为空: {0}x{1}")]
  Empty(u32, u32),
  #[error("无效的尺寸策略: {0}")]
  InvalidPolicy(String),
  #[error(transparent)]
  Size(#[from] GeometryParseError),
}

/// 目标尺寸策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetSize {
  /// 保持宽高比，仅当源图超出该尺寸时缩小
  Max(Size),
  /// 输出恰好为该尺寸：保持宽高比缩放后居中，空白处填充背景色
  Fill(Size),
}

impl TargetSize {
  pub fn size(&self) -> Size {
    match self {
      TargetSize::Max(size) | TargetSize::Fill(size) => *size,
    }
  }
}

impl FromStr for TargetSize {
  type Err = NormalizeError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let (kind, size) = s
      .split_once(':')
      .ok_or_else(|| NormalizeError::InvalidPolicy(s.to_string()))?;
    let size: Size = size.parse()?;
    match kind {
      "max" => Ok(TargetSize::Max(size)),
      "fill" => Ok(TargetSize::Fill(size)),
      _ => Err(NormalizeError::InvalidPolicy(s.to_string())),
    }
  }
}

impl std::fmt::Display for TargetSize {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      TargetSize::Max(size) => write!(f, "max:{}", size),
      TargetSize::Fill(size) => write!(f, "fill:{}", size),
    }
  }
}

/// 将图像按策略归一化为不透明 RGB 图像
///
/// 未给出策略时仅按原尺寸重绘到不透明画布上。
pub fn normalize(image: &DynamicImage, target: Option<&TargetSize>) -> Result<RgbImage, NormalizeError> {
  let (width, height) = (image.width(), image.height());
  if width == 0 || height == 0 {
    return Err(NormalizeError::Empty(width, height));
  }

  let opaque = flatten_alpha(image);

  let Some(target) = target else {
    return Ok(opaque);
  };

  let output = match target {
    TargetSize::Max(max) => {
      let multiplier = f64::max(
        height as f64 / max.height as f64,
        width as f64 / max.width as f64,
      );
      if multiplier > 1.0 {
        let scaled_w = scale_dimension(width, 1.0 / multiplier);
        let scaled_h = scale_dimension(height, 1.0 / multiplier);
        debug!(
          "缩小图像: {}x{} -> {}x{}",
          width, height, scaled_w, scaled_h
        );
        image::imageops::resize(&opaque, scaled_w, scaled_h, RESIZE_FILTER)
      } else {
        opaque
      }
    }
    TargetSize::Fill(size) => {
      let ratio = f64::min(
        size.width as f64 / width as f64,
        size.height as f64 / height as f64,
      );
      let scaled_w = scale_dimension(width, ratio).min(size.width);
      let scaled_h = scale_dimension(height, ratio).min(size.height);
      let scaled = image::imageops::resize(&opaque, scaled_w, scaled_h, RESIZE_FILTER);

      let mut canvas = RgbImage::from_pixel(size.width, size.height, Rgb([0, 0, 0]));
      let offset_x = (size.width - scaled_w) / 2;
      let offset_y = (size.height - scaled_h) / 2;
      debug!(
        "居中缩放图像: {}x{} -> {}x{} 于画布 {} 偏移 ({}, {})",
        width, height, scaled_w, scaled_h, size, offset_x, offset_y
      );
      image::imageops::overlay(&mut canvas, &scaled, offset_x as i64, offset_y as i64);
      canvas
    }
  };

  Ok(output)
}

fn scale_dimension(value: u32, factor: f64) -> u32 {
  ((value as f64 * factor).round() as u32).max(1)
}

/// 不透明渲染：透明像素与黑色背景合成
fn flatten_alpha(image: &DynamicImage) -> RgbImage {
  if !image.color().has_alpha() {
    return image.to_rgb8();
  }

  let rgba = image.to_rgba8();
  let mut rgb = RgbImage::new(rgba.width(), rgba.height());
  for (x, y, pixel) in rgba.enumerate_pixels() {
    let [r, g, b, a] = pixel.0;
    let alpha = a as f32 / 255.0;
    rgb.put_pixel(
      x,
      y,
      Rgb([
        (r as f32 * alpha).round() as u8,
        (g as f32 * alpha).round() as u8,
        (b as f32 * alpha).round() as u8,
      ]),
    );
  }
  rgb
}
