// 该文件是 Tanwu （探物） 项目的一部分。
// src/frame.rs - 模型输入帧定义
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

const RGB_CHANNELS: usize = 3;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
  #[error("数据长度不匹配: 期望长度 {expected}, 实际长度 {actual}")]
  LengthMismatch { expected: usize, actual: usize },
  #[error("图像尺寸不匹配: 期望 {expected_w}x{expected_h}, 实际 {actual_w}x{actual_h}")]
  ShapeMismatch {
    expected_w: u32,
    expected_h: u32,
    actual_w: u32,
    actual_h: u32,
  },
}

/// 按 NCHW 排列的 RGB 帧，尺寸在类型中固定
#[derive(Debug, Clone)]
pub struct RgbNchwFrame<const W: u32, const H: u32> {
  data: Box<[u8]>,
}

impl<const W: u32, const H: u32> TryFrom<Vec<u8>> for RgbNchwFrame<W, H> {
  type Error = FrameError;

  fn try_from(data: Vec<u8>) -> Result<Self, Self::Error> {
    let expected = RGB_CHANNELS * W as usize * H as usize;
    if data.len() != expected {
      return Err(FrameError::LengthMismatch {
        expected,
        actual: data.len(),
      });
    }
    Ok(Self {
      data: data.into_boxed_slice(),
    })
  }
}

impl<const W: u32, const H: u32> TryFrom<&RgbImage> for RgbNchwFrame<W, H> {
  type Error = FrameError;

  fn try_from(image: &RgbImage) -> Result<Self, Self::Error> {
    let (actual_w, actual_h) = image.dimensions();
    if (actual_w, actual_h) != (W, H) {
      return Err(FrameError::ShapeMismatch {
        expected_w: W,
        expected_h: H,
        actual_w,
        actual_h,
      });
    }

    let plane = W as usize * H as usize;
    let mut data = vec![0u8; plane * RGB_CHANNELS];
    for (x, y, pixel) in image.enumerate_pixels() {
      let idx = y as usize * W as usize + x as usize;
      data[idx] = pixel[0];
      data[plane + idx] = pixel[1];
      data[2 * plane + idx] = pixel[2];
    }
    Self::try_from(data)
  }
}

impl<const W: u32, const H: u32> RgbNchwFrame<W, H> {
  pub fn height(&self) -> usize {
    H as usize
  }

  pub fn width(&self) -> usize {
    W as usize
  }

  pub fn channels(&self) -> usize {
    RGB_CHANNELS
  }

  /// 转为 [0, 1] 区间的浮点张量数据，排列不变
  pub fn to_unit_f32(&self) -> Vec<f32> {
    self.data.iter().map(|&v| v as f32 / 255.0).collect()
  }
}

#[cfg(test)]
mod tests {
  use image::Rgb;

  use super::*;

  fn gradient(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| Rgb([x as u8, y as u8, (x + y) as u8]))
  }

  #[test]
  fn wrong_length_is_a_shape_error() {
    let err = RgbNchwFrame::<4, 4>::try_from(vec![0u8; 10]).unwrap_err();
    assert_eq!(
      err,
      FrameError::LengthMismatch {
        expected: 48,
        actual: 10
      }
    );
  }

  #[test]
  fn wrong_image_size_is_a_shape_error() {
    let image = gradient(5, 4);
    assert!(matches!(
      RgbNchwFrame::<4, 4>::try_from(&image),
      Err(FrameError::ShapeMismatch { actual_w: 5, .. })
    ));
  }

  #[test]
  fn nchw_planes_are_channel_major() {
    let image = gradient(3, 2);
    let frame = RgbNchwFrame::<3, 2>::try_from(&image).unwrap();
    let data = frame.to_unit_f32();
    // 像素 (2, 1)
    assert_eq!(data[5], 2.0 / 255.0);
    assert_eq!(data[6 + 5], 1.0 / 255.0);
    assert_eq!(data[12 + 5], 3.0 / 255.0);
  }

  #[test]
  fn unit_f32_scales_to_one() {
    let frame = RgbNchwFrame::<1, 1>::try_from(vec![0u8, 255, 51]).unwrap();
    assert_eq!(frame.to_unit_f32(), vec![0.0, 1.0, 0.2]);
  }
}
