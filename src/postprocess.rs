// 该文件是 Tanwu （探物） 项目的一部分。
// src/postprocess.rs - 检测结果裁剪
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
use tracing::debug;

use crate::{
  geometry::{Orientation, PixelRect},
  model::{DetectResult, Detection},
};

/// 从源图中裁剪出的检测目标
#[derive(Debug, Clone)]
pub struct Crop {
  pub image: RgbImage,
  pub label: String,
  pub confidence: f32,
  /// 裁剪区域在源图中的像素坐标
  pub rect: PixelRect,
}

/// 一次检测的完整结果，供输出端渲染
#[derive(Debug, Clone)]
pub struct DetectionReport {
  pub orientation: Orientation,
  pub detections: DetectResult,
  pub crops: Vec<Crop>,
}

impl DetectionReport {
  /// 置信度最高的裁剪
  pub fn best_crop(&self) -> Option<&Crop> {
    self
      .crops
      .iter()
      .max_by(|a, b| a.confidence.total_cmp(&b.confidence))
  }
}

/// 计算检测结果在源图中的像素区域，无法裁剪时返回 None
pub fn locate(detection: &Detection, orientation: Orientation, image: &RgbImage) -> Option<PixelRect> {
  detection
    .rect
    .oriented(orientation)
    .to_pixel_rect(image.width(), image.height())
}

/// 将检测结果转为裁剪图
///
/// 每个检测独立处理，无效区域（面积为零或越界）直接丢弃，输出保持输入顺序。
pub fn crop_detections(
  image: &RgbImage,
  detections: &[Detection],
  orientation: Orientation,
) -> Vec<Crop> {
  detections
    .iter()
    .enumerate()
    .filter_map(|(index, detection)| {
      let Some(rect) = locate(detection, orientation, image) else {
        debug!(
          "丢弃检测 {} ({}): 区域无效 {:?}",
          index, detection.label, detection.rect
        );
        return None;
      };
      let cropped = image::imageops::crop_imm(image, rect.x, rect.y, rect.width, rect.height);
      Some(Crop {
        image: cropped.to_image(),
        label: detection.label.clone(),
        confidence: detection.confidence,
        rect,
      })
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use image::Rgb;

  use super::*;
  use crate::geometry::NormalizedRect;

  fn detection(rect: NormalizedRect, label: &str) -> Detection {
    Detection {
      rect,
      label: label.to_string(),
      confidence: 0.8,
    }
  }

  /// 上半部分红色，下半部分蓝色
  fn two_tone(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |_, y| {
      if y < height / 2 {
        Rgb([255, 0, 0])
      } else {
        Rgb([0, 0, 255])
      }
    })
  }

  #[test]
  fn lower_left_rect_maps_to_bottom_of_image() {
    let image = two_tone(100, 100);
    let detections = [detection(NormalizedRect::new(0.0, 0.0, 1.0, 0.5), "bottom")];
    let crops = crop_detections(&image, &detections, Orientation::Up);

    assert_eq!(crops.len(), 1);
    assert_eq!(crops[0].image.dimensions(), (100, 50));
    assert_eq!(*crops[0].image.get_pixel(10, 10), Rgb([0, 0, 255]));
  }

  #[test]
  fn upside_down_flips_the_region() {
    let image = two_tone(100, 100);
    let detections = [detection(NormalizedRect::new(0.0, 0.0, 1.0, 0.5), "top")];
    let crops = crop_detections(&image, &detections, Orientation::Down);

    assert_eq!(*crops[0].image.get_pixel(10, 10), Rgb([255, 0, 0]));
  }

  #[test]
  fn landscape_swaps_crop_dimensions() {
    let image = two_tone(100, 100);
    let detections = [detection(NormalizedRect::new(0.0, 0.0, 0.2, 0.3), "a")];
    let crops = crop_detections(&image, &detections, Orientation::Left);
    assert_eq!(crops[0].image.dimensions(), (30, 20));
    assert_eq!(
      crops[0].rect,
      PixelRect {
        x: 0,
        y: 0,
        width: 30,
        height: 20
      }
    );
  }

  #[test]
  fn locate_rejects_regions_outside_the_image() {
    let image = two_tone(100, 100);
    let inside = detection(NormalizedRect::new(0.1, 0.1, 0.2, 0.2), "in");
    let outside = detection(NormalizedRect::new(0.9, 0.1, 0.5, 0.2), "out");
    assert!(locate(&inside, Orientation::Up, &image).is_some());
    assert_eq!(locate(&outside, Orientation::Up, &image), None);
  }

  #[test]
  fn best_crop_has_highest_confidence() {
    let image = two_tone(100, 100);
    let mut detections = vec![
      detection(NormalizedRect::new(0.1, 0.1, 0.2, 0.2), "low"),
      detection(NormalizedRect::new(0.5, 0.5, 0.2, 0.2), "high"),
    ];
    detections[1].confidence = 0.95;
    let crops = crop_detections(&image, &detections, Orientation::Up);
    let report = DetectionReport {
      orientation: Orientation::Up,
      detections: DetectResult::from(detections),
      crops,
    };
    assert_eq!(report.best_crop().map(|c| c.label.as_str()), Some("high"));
  }

  #[test]
  fn invalid_rects_are_dropped_and_order_kept() {
    let image = two_tone(100, 100);
    let detections = [
      detection(NormalizedRect::new(0.1, 0.1, 0.2, 0.2), "first"),
      detection(NormalizedRect::new(0.5, 0.5, 0.0, 0.1), "empty"),
      detection(NormalizedRect::new(0.9, 0.1, 0.5, 0.2), "outside"),
      detection(NormalizedRect::new(0.6, 0.6, 0.3, 0.3), "last"),
    ];
    let crops = crop_detections(&image, &detections, Orientation::Up);

    assert!(crops.len() <= detections.len());
    let labels: Vec<_> = crops.iter().map(|c| c.label.as_str()).collect();
    assert_eq!(labels, vec!["first", "last"]);
  }
}
