// 该文件是 Tanwu （探物） 项目的一部分。
// src/model/yolo26.rs - YOLO26 检测头解码
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

use tracing::{debug, error};

use crate::{
  geometry::NormalizedRect,
  model::{Detection, Labels},
};

pub const YOLO26_INPUT_SIZE: u32 = 640;
pub(crate) const YOLO26_NUM_OUTPUTS: usize = 6;
const YOLO26_INPUT_W: f32 = YOLO26_INPUT_SIZE as f32;
const YOLO26_INPUT_H: f32 = YOLO26_INPUT_SIZE as f32;
const YOLO26_HEAD_SIZES: [(usize, usize); 3] = [(80, 80), (40, 40), (20, 20)];
const YOLO26_STRIDES: [f32; 3] = [8.0, 16.0, 32.0];

/// 根据张量大小匹配回归和分类输出，类别数由分类张量大小推出
///
/// 回归输出恰为 `4 * spatial`，分类输出为 `classes * spatial`；两者都为 `4 * spatial` 时按给定顺序。
/// 返回 (reg, cls, classes)，如果大小不匹配则返回 None
fn match_reg_cls_tensors<'a>(
  tensor1: &'a [f32],
  tensor2: &'a [f32],
  spatial: usize,
  head_idx: usize,
) -> Option<(&'a [f32], &'a [f32], usize)> {
  let reg_expected = 4 * spatial;
  let is_cls = |t: &[f32]| !t.is_empty() && t.len() % spatial == 0;

  if tensor1.len() == reg_expected && is_cls(tensor2) {
    Some((tensor1, tensor2, tensor2.len() / spatial))
  } else if tensor2.len() == reg_expected && is_cls(tensor1) {
    debug!("检测头 {}: 输出顺序交换", head_idx);
    Some((tensor2, tensor1, tensor1.len() / spatial))
  } else {
    error!(
      "检测头 {}: 输出大小不匹配 - 张量1: {}, 张量2: {}, 期望回归: {}, 分类应为 {} 的倍数",
      head_idx,
      tensor1.len(),
      tensor2.len(),
      reg_expected,
      spatial
    );
    None
  }
}

/// 解码 YOLO26 的三组 (回归, 分类) 输出
///
/// 回归输出为各网格点到框四边的距离（以步长为单位），分类输出为未经 sigmoid 的 logit。
/// 输出框相对整幅输入图像归一化，原点在左下角。
pub fn decode_yolo26<T: AsRef<[f32]>>(
  outputs: &[T],
  threshold: f32,
  labels: &Labels,
) -> Vec<Detection> {
  let mut items = Vec::new();

  if outputs.len() != YOLO26_NUM_OUTPUTS {
    error!(
      "预期模型输出数量为 {}, 实际为 {}",
      YOLO26_NUM_OUTPUTS,
      outputs.len()
    );
    return items;
  }

  for (head_idx, (&(map_h, map_w), stride)) in
    YOLO26_HEAD_SIZES.iter().zip(YOLO26_STRIDES).enumerate()
  {
    let spatial = map_h * map_w;

    // 输出顺序可能不同，根据张量大小判断哪个是回归，哪个是分类
    let Some((reg, cls, classes)) = match_reg_cls_tensors(
      outputs[head_idx * 2].as_ref(),
      outputs[head_idx * 2 + 1].as_ref(),
      spatial,
      head_idx,
    ) else {
      continue;
    };
    if classes != labels.len() {
      debug!(
        "检测头 {}: 模型类别数 {} 与标签数 {} 不一致",
        head_idx,
        classes,
        labels.len()
      );
    }

    for h in 0..map_h {
      for w in 0..map_w {
        let idx = h * map_w + w;

        let (score, class_id) = {
          let mut max_logit = f32::MIN;
          let mut cls_idx = 0usize;
          for c in 0..classes {
            let logit = cls[c * spatial + idx];
            if logit > max_logit {
              max_logit = logit;
              cls_idx = c;
            }
          }
          (sigmoid(max_logit), cls_idx as u32)
        };

        if score <= threshold {
          continue;
        }

        let left = reg[idx];
        let top = reg[spatial + idx];
        let right = reg[2 * spatial + idx];
        let bottom = reg[3 * spatial + idx];

        let grid_x = (w as f32) + 0.5;
        let grid_y = (h as f32) + 0.5;

        let xmin = ((grid_x - left) * stride).clamp(0.0, YOLO26_INPUT_W);
        let ymin = ((grid_y - top) * stride).clamp(0.0, YOLO26_INPUT_H);
        let xmax = ((grid_x + right) * stride).clamp(0.0, YOLO26_INPUT_W);
        let ymax = ((grid_y + bottom) * stride).clamp(0.0, YOLO26_INPUT_H);

        if xmax <= xmin || ymax <= ymin {
          continue;
        }

        items.push(Detection {
          rect: NormalizedRect::from_top_left_corners([
            xmin / YOLO26_INPUT_W,
            ymin / YOLO26_INPUT_H,
            xmax / YOLO26_INPUT_W,
            ymax / YOLO26_INPUT_H,
          ]),
          label: labels.name(class_id),
          confidence: score,
        });
      }
    }
  }

  debug!("检测到 {} 个物体", items.len());
  items
}

fn sigmoid(x: f32) -> f32 {
  1.0 / (1.0 + (-x).exp())
}

#[cfg(test)]
mod tests {
  use super::*;

  const LOW_LOGIT: f32 = -10.0;

  const COCO_CLASSES: usize = 80;

  fn outputs_with_classes(classes: usize) -> Vec<Vec<f32>> {
    let mut outputs = Vec::new();
    for (h, w) in YOLO26_HEAD_SIZES {
      outputs.push(vec![0.0; 4 * h * w]);
      outputs.push(vec![LOW_LOGIT; classes * h * w]);
    }
    outputs
  }

  fn empty_outputs() -> Vec<Vec<f32>> {
    outputs_with_classes(COCO_CLASSES)
  }

  /// 在 20x20 检测头 (h=10, w=5) 处放置一个类别 3 的目标，四边距离均为 1
  fn place_object(outputs: &mut [Vec<f32>]) {
    let spatial = 20 * 20;
    let idx = 10 * 20 + 5;
    for side in 0..4 {
      outputs[4][side * spatial + idx] = 1.0;
    }
    outputs[5][3 * spatial + idx] = 5.0;
  }

  #[test]
  fn no_confident_cells_yields_nothing() {
    let detections = decode_yolo26(&empty_outputs(), 0.5, &Labels::coco());
    assert!(detections.is_empty());
  }

  #[test]
  fn decodes_single_object() {
    let mut outputs = empty_outputs();
    place_object(&mut outputs);

    let detections = decode_yolo26(&outputs, 0.5, &Labels::coco());
    assert_eq!(detections.len(), 1);
    let det = &detections[0];
    assert_eq!(det.label, "motorcycle");
    assert!(det.confidence > 0.99);

    // 左上角坐标 (144, 304) - (208, 368)
    let expected = NormalizedRect::from_top_left_corners([
      144.0 / 640.0,
      304.0 / 640.0,
      208.0 / 640.0,
      368.0 / 640.0,
    ]);
    assert!(det.rect.approx_eq(&expected, 1e-5), "{:?}", det.rect);
  }

  #[test]
  fn swapped_head_outputs_are_matched_by_size() {
    let mut outputs = empty_outputs();
    place_object(&mut outputs);
    outputs.swap(4, 5);

    let detections = decode_yolo26(&outputs, 0.5, &Labels::coco());
    assert_eq!(detections.len(), 1);
  }

  #[test]
  fn wrong_output_count_yields_nothing() {
    let outputs = empty_outputs();
    assert!(decode_yolo26(&outputs[..4], 0.5, &Labels::coco()).is_empty());
  }

  #[test]
  fn class_count_follows_the_model() {
    let mut outputs = outputs_with_classes(3);
    let spatial = 20 * 20;
    let idx = 10 * 20 + 5;
    for side in 0..4 {
      outputs[4][side * spatial + idx] = 1.0;
    }
    outputs[5][2 * spatial + idx] = 5.0;

    let labels = Labels::parse("shoe\nbag\nhat");
    let detections = decode_yolo26(&outputs, 0.5, &labels);
    assert_eq!(detections.len(), 1);
    assert_eq!(detections[0].label, "hat");
  }

  #[test]
  fn ragged_class_tensor_is_rejected() {
    let mut outputs = outputs_with_classes(3);
    outputs[5][2 * 20 * 20 + 10 * 20 + 5] = 5.0;
    outputs[5].pop();
    assert!(decode_yolo26(&outputs, 0.5, &Labels::coco()).is_empty());
  }
}
