// 该文件是 Tanwu （探物） 项目的一部分。
// src/encode.rs - 限定体积的图像编码
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

use image::{ExtendedColorType, ImageEncoder, RgbImage, codecs::jpeg::JpegEncoder};
use thiserror::Error;
use tracing::{debug, warn};

pub const DEFAULT_START_QUALITY: u8 = 90;
pub const DEFAULT_QUALITY_STEP: u8 = 10;
pub const DEFAULT_QUALITY_FLOOR: u8 = 20;

#[derive(Error, Debug)]
pub enum EncodeError {
  #[error("编码结果为空 (质量 {0})")]
  Empty(u8),
  #[error("图像编码错误: {0}")]
  Image(#[from] image::ImageError),
  #[error("无效的质量参数: 起始 {start}, 步长 {step}, 下限 {floor}")]
  InvalidQuality { start: u8, step: u8, floor: u8 },
}

/// 按给定质量（百分比）编码图像
pub trait QualityEncoder {
  fn encode(&self, image: &RgbImage, quality: u8) -> Result<Vec<u8>, EncodeError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Jpeg;

impl QualityEncoder for Jpeg {
  fn encode(&self, image: &RgbImage, quality: u8) -> Result<Vec<u8>, EncodeError> {
    let mut buffer = Vec::new();
    JpegEncoder::new_with_quality(&mut buffer, quality).write_image(
      image.as_raw(),
      image.width(),
      image.height(),
      ExtendedColorType::Rgb8,
    )?;
    Ok(buffer)
  }
}

/// 编码结果
#[derive(Debug, Clone)]
pub struct EncodedImage {
  pub data: Vec<u8>,
  /// 产生该结果的质量（百分比）
  pub quality: u8,
  /// 编码尝试次数
  pub attempts: usize,
}

impl EncodedImage {
  pub fn len(&self) -> usize {
    self.data.len()
  }

  pub fn is_empty(&self) -> bool {
    self.data.is_empty()
  }
}

/// 逐步降低质量重新编码，直到体积不超过上限或质量到达下限
///
/// 到达下限后无论体积多大都直接返回，由服务端决定是否接受。
#[derive(Debug, Clone)]
pub struct SizeConstrainedEncoder<E = Jpeg> {
  encoder: E,
  max_bytes: usize,
  start: u8,
  step: u8,
  floor: u8,
}

impl SizeConstrainedEncoder<Jpeg> {
  pub fn jpeg(max_bytes: usize) -> Self {
    Self::with_encoder(Jpeg, max_bytes)
  }
}

impl<E: QualityEncoder> SizeConstrainedEncoder<E> {
  pub fn with_encoder(encoder: E, max_bytes: usize) -> Self {
    Self {
      encoder,
      max_bytes,
      start: DEFAULT_START_QUALITY,
      step: DEFAULT_QUALITY_STEP,
      floor: DEFAULT_QUALITY_FLOOR,
    }
  }

  pub fn quality(mut self, start: u8, step: u8, floor: u8) -> Self {
    self.start = start;
    self.step = step;
    self.floor = floor;
    self
  }

  pub fn max_bytes(&self) -> usize {
    self.max_bytes
  }

  /// 最多尝试的编码次数
  pub fn max_attempts(&self) -> usize {
    if self.step == 0 || self.start <= self.floor {
      return 1;
    }
    (self.start - self.floor).div_ceil(self.step) as usize + 1
  }

  pub fn encode(&self, image: &RgbImage) -> Result<EncodedImage, EncodeError> {
    if self.step == 0 || self.floor == 0 || self.start > 100 || self.floor > self.start {
      return Err(EncodeError::InvalidQuality {
        start: self.start,
        step: self.step,
        floor: self.floor,
      });
    }

    let mut quality = self.start;
    let mut data = self.encoder.encode(image, quality)?;
    let mut attempts = 1;
    if data.is_empty() {
      return Err(EncodeError::Empty(quality));
    }

    while data.len() > self.max_bytes && quality > self.floor {
      quality = quality.saturating_sub(self.step).max(self.floor);
      data = self.encoder.encode(image, quality)?;
      attempts += 1;
      debug!(
        "重新编码: 质量 {}, 大小 {} 字节, 上限 {} 字节",
        quality,
        data.len(),
        self.max_bytes
      );
    }

    if data.len() > self.max_bytes {
      warn!(
        "质量已降至下限 {}, 大小 {} 字节仍超过上限 {} 字节",
        quality,
        data.len(),
        self.max_bytes
      );
    }

    Ok(EncodedImage {
      data,
      quality,
      attempts,
    })
  }
}
