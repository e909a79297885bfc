// 该文件是 Tanwu （探物） 项目的一部分。
// src/output/draw.rs - 检测结果可视化
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

use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;

use crate::{geometry::PixelRect, postprocess::DetectionReport};

const PALETTE_SIZE: usize = 12;
const TAG_HEIGHT: u32 = 6;

/// 在图像上绘制裁剪区域，颜色按标签区分
pub struct Draw {
  colors: Vec<Rgb<u8>>,
}

impl Default for Draw {
  fn default() -> Self {
    let colors = (0..PALETTE_SIZE)
      .map(|i| hsv_to_rgb(i as f32 * 360.0 / PALETTE_SIZE as f32, 0.9, 1.0))
      .collect();
    Self { colors }
  }
}

fn hsv_to_rgb(h: f32, s: f32, v: f32) -> Rgb<u8> {
  let c = v * s;
  let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
  let m = v - c;

  let (r, g, b) = match h {
    h if h < 60.0 => (c, x, 0.0),
    h if h < 120.0 => (x, c, 0.0),
    h if h < 180.0 => (0.0, c, x),
    h if h < 240.0 => (0.0, x, c),
    h if h < 300.0 => (x, 0.0, c),
    _ => (c, 0.0, x),
  };

  Rgb([
    ((r + m) * 255.0) as u8,
    ((g + m) * 255.0) as u8,
    ((b + m) * 255.0) as u8,
  ])
}

impl Draw {
  pub fn color_for(&self, label: &str) -> Rgb<u8> {
    let hash = label
      .bytes()
      .fold(0usize, |acc, b| acc.wrapping_mul(31).wrapping_add(b as usize));
    self.colors[hash % self.colors.len()]
  }

  fn draw_rect(&self, image: &mut RgbImage, rect: &PixelRect, color: Rgb<u8>) {
    let (x, y) = (rect.x as i32, rect.y as i32);
    draw_hollow_rect_mut(image, Rect::at(x, y).of_size(rect.width, rect.height), color);

    // 加粗一圈
    if rect.width > 2 && rect.height > 2 {
      let inner = Rect::at(x + 1, y + 1).of_size(rect.width - 2, rect.height - 2);
      draw_hollow_rect_mut(image, inner, color);
    }

    // 左上角的色块标记
    let tag_height = TAG_HEIGHT.min(rect.height);
    draw_filled_rect_mut(image, Rect::at(x, y).of_size(rect.width, tag_height), color);
  }

  pub fn draw_report(&self, image: &mut RgbImage, report: &DetectionReport) {
    for crop in report.crops.iter() {
      self.draw_rect(image, &crop.rect, self.color_for(&crop.label));
    }
  }
}
