// 该文件是 Tanwu （探物） 项目的一部分。
// src/geometry.rs - 归一化矩形与方向变换
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

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GeometryParseError {
  #[error("无效的方向: {0}")]
  InvalidOrientation(String),
  #[error("无效的尺寸: {0}, 期望格式为 WIDTHxHEIGHT")]
  InvalidSize(String),
}

/// 像素尺寸
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Size {
  pub width: u32,
  pub height: u32,
}

impl Size {
  pub const fn new(width: u32, height: u32) -> Self {
    Self { width, height }
  }
}

impl FromStr for Size {
  type Err = GeometryParseError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let invalid = || GeometryParseError::InvalidSize(s.to_string());
    let (w, h) = s
      .split_once(|c: char| c == 'x' || c == 'X')
      .ok_or_else(invalid)?;
    let width: u32 = w.trim().parse().map_err(|_| invalid())?;
    let height: u32 = h.trim().parse().map_err(|_| invalid())?;
    if width == 0 || height == 0 {
      return Err(invalid());
    }
    Ok(Size { width, height })
  }
}

impl std::fmt::Display for Size {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}x{}", self.width, self.height)
  }
}

/// 设备/图像方向，每次调用时由调用方提供
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Orientation {
  #[default]
  Up,
  Down,
  Left,
  Right,
  Unknown,
}

impl Orientation {
  /// 与之互逆的方向：左右互逆，上下各自自逆
  pub fn inverse(self) -> Self {
    match self {
      Orientation::Left => Orientation::Right,
      Orientation::Right => Orientation::Left,
      other => other,
    }
  }
}

impl FromStr for Orientation {
  type Err = GeometryParseError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "up" | "portrait" => Ok(Orientation::Up),
      "down" | "upside-down" => Ok(Orientation::Down),
      "left" => Ok(Orientation::Left),
      "right" => Ok(Orientation::Right),
      "unknown" => Ok(Orientation::Unknown),
      _ => Err(GeometryParseError::InvalidOrientation(s.to_string())),
    }
  }
}

impl std::fmt::Display for Orientation {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let name = match self {
      Orientation::Up => "up",
      Orientation::Down => "down",
      Orientation::Left => "left",
      Orientation::Right => "right",
      Orientation::Unknown => "unknown",
    };
    f.write_str(name)
  }
}

/// 归一化矩形，坐标取值 [0, 1]，原点在左下角
///
/// `x + width <= 1` 与 `y + height <= 1` 由调用方保证，这里不做截断。
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NormalizedRect {
  pub x: f32,
  pub y: f32,
  pub width: f32,
  pub height: f32,
}

impl NormalizedRect {
  pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
    Self {
      x,
      y,
      width,
      height,
    }
  }

  /// 从左上角原点的 [x_min, y_min, x_max, y_max] 转换
  pub fn from_top_left_corners(bbox: [f32; 4]) -> Self {
    let [x_min, y_min, x_max, y_max] = bbox;
    Self {
      x: x_min,
      y: 1.0 - y_max,
      width: x_max - x_min,
      height: y_max - y_min,
    }
  }

  /// 将模型坐标系下的矩形映射到给定方向所对应的坐标系
  pub fn oriented(&self, orientation: Orientation) -> Self {
    let Self {
      x,
      y,
      width: w,
      height: h,
    } = *self;
    match orientation {
      Orientation::Up => *self,
      Orientation::Unknown => {
        warn!("设备方向未知，检测结果可能受到影响");
        *self
      }
      Orientation::Down => Self::new(1.0 - x - w, 1.0 - y - h, w, h),
      Orientation::Left => Self::new(y, 1.0 - x - w, h, w),
      Orientation::Right => Self::new(1.0 - y - h, x, h, w),
    }
  }

  /// 转为像素坐标（原点在左上角），两条边各自取整
  pub fn to_pixel_rect(&self, image_width: u32, image_height: u32) -> Option<PixelRect> {
    let (iw, ih) = (image_width as f32, image_height as f32);
    let left = (self.x * iw).round();
    let right = ((self.x + self.width) * iw).round();
    let top = ((1.0 - self.y - self.height) * ih).round();
    let bottom = ((1.0 - self.y) * ih).round();

    if !(left.is_finite() && right.is_finite() && top.is_finite() && bottom.is_finite()) {
      return None;
    }
    if left < 0.0 || top < 0.0 || right > iw || bottom > ih || right <= left || bottom <= top {
      return None;
    }

    Some(PixelRect {
      x: left as u32,
      y: top as u32,
      width: (right - left) as u32,
      height: (bottom - top) as u32,
    })
  }

  pub fn approx_eq(&self, other: &Self, tolerance: f32) -> bool {
    (self.x - other.x).abs() <= tolerance
      && (self.y - other.y).abs() <= tolerance
      && (self.width - other.width).abs() <= tolerance
      && (self.height - other.height).abs() <= tolerance
  }
}

/// 像素矩形，原点在左上角
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
  pub x: u32,
  pub y: u32,
  pub width: u32,
  pub height: u32,
}

#[cfg(test)]
mod tests {
  use super::*;

  const EPS: f32 = 1e-5;

  #[test]
  fn down_is_self_symmetric_at_center() {
    let rect = NormalizedRect::new(0.25, 0.25, 0.5, 0.5);
    assert!(rect.oriented(Orientation::Down).approx_eq(&rect, EPS));
  }

  #[test]
  fn left_swaps_axes() {
    let rect = NormalizedRect::new(0.0, 0.0, 0.2, 0.3);
    let expected = NormalizedRect::new(0.0, 0.8, 0.3, 0.2);
    assert!(rect.oriented(Orientation::Left).approx_eq(&expected, EPS));
  }

  #[test]
  fn right_swaps_axes_opposite_sense() {
    let rect = NormalizedRect::new(0.1, 0.2, 0.3, 0.4);
    let expected = NormalizedRect::new(0.4, 0.1, 0.4, 0.3);
    assert!(rect.oriented(Orientation::Right).approx_eq(&expected, EPS));
  }

  #[test]
  fn up_and_unknown_are_identity() {
    let rect = NormalizedRect::new(0.1, 0.2, 0.3, 0.4);
    assert_eq!(rect.oriented(Orientation::Up), rect);
    assert_eq!(rect.oriented(Orientation::Unknown), rect);
  }

  #[test]
  fn inverse_orientation_round_trips() {
    let rects = [
      NormalizedRect::new(0.0, 0.0, 0.2, 0.3),
      NormalizedRect::new(0.1, 0.6, 0.5, 0.25),
      NormalizedRect::new(0.7, 0.05, 0.3, 0.9),
    ];
    for rect in rects {
      for orientation in [
        Orientation::Up,
        Orientation::Down,
        Orientation::Left,
        Orientation::Right,
      ] {
        let back = rect
          .oriented(orientation)
          .oriented(orientation.inverse());
        assert!(
          back.approx_eq(&rect, EPS),
          "{orientation}: {rect:?} -> {back:?}"
        );
      }
    }
  }

  #[test]
  fn transform_stays_in_unit_square() {
    let rect = NormalizedRect::new(0.6, 0.1, 0.4, 0.8);
    for orientation in [Orientation::Down, Orientation::Left, Orientation::Right] {
      let r = rect.oriented(orientation);
      assert!(r.x >= -EPS && r.y >= -EPS, "{orientation}: {r:?}");
      assert!(r.x + r.width <= 1.0 + EPS, "{orientation}: {r:?}");
      assert!(r.y + r.height <= 1.0 + EPS, "{orientation}: {r:?}");
    }
  }

  #[test]
  fn pixel_rect_flips_y() {
    let rect = NormalizedRect::new(0.25, 0.0, 0.5, 0.25);
    let pixel = rect.to_pixel_rect(100, 200).unwrap();
    assert_eq!(
      pixel,
      PixelRect {
        x: 25,
        y: 150,
        width: 50,
        height: 50
      }
    );
  }

  #[test]
  fn pixel_rect_rejects_degenerate_and_out_of_bounds() {
    assert!(
      NormalizedRect::new(0.5, 0.5, 0.0, 0.2)
        .to_pixel_rect(100, 100)
        .is_none()
    );
    assert!(
      NormalizedRect::new(0.8, 0.0, 0.5, 0.5)
        .to_pixel_rect(100, 100)
        .is_none()
    );
    assert!(
      NormalizedRect::new(f32::NAN, 0.0, 0.5, 0.5)
        .to_pixel_rect(100, 100)
        .is_none()
    );
  }

  #[test]
  fn top_left_corners_convert_to_lower_left_origin() {
    let rect = NormalizedRect::from_top_left_corners([0.1, 0.2, 0.5, 0.6]);
    assert!(rect.approx_eq(&NormalizedRect::new(0.1, 0.4, 0.4, 0.4), EPS));
  }

  #[test]
  fn parse_size_and_orientation() {
    assert_eq!("384x640".parse::<Size>().unwrap(), Size::new(384, 640));
    assert!("384".parse::<Size>().is_err());
    assert!("0x10".parse::<Size>().is_err());
    assert_eq!("Left".parse::<Orientation>().unwrap(), Orientation::Left);
    assert!("sideways".parse::<Orientation>().is_err());
  }
}
