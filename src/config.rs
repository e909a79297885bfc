// 该文件是 Tanwu （探物） 项目的一部分。
// src/config.rs - 流程配置
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

use crate::{
  geometry::{Orientation, Size},
  model::EMBEDDING_INPUT_SIZE,
  normalize::TargetSize,
};

pub const DEFAULT_FILE_MAX_MB: usize = 2;
pub const DEFAULT_SELECTION_LIMIT: usize = 10;
pub const DEFAULT_MAX_INPUT_BYTES: usize = 50 * 1_000_000;
pub const DEFAULT_IMAGE_SIZE: TargetSize = TargetSize::Max(Size::new(1280, 1280));
pub const DEFAULT_DETECTION_SIZE: TargetSize = TargetSize::Fill(Size::new(384, 640));
pub const EMBEDDING_SIZE: TargetSize =
  TargetSize::Fill(Size::new(EMBEDDING_INPUT_SIZE, EMBEDDING_INPUT_SIZE));

/// 选图加载配置
#[derive(Debug, Clone)]
pub struct PickerConfig {
  /// 压缩后单个文件的体积上限（以 1,000,000 字节为一 MB）
  pub file_max_mb: usize,
  /// 超出该尺寸的图像会被缩放
  pub image_size: TargetSize,
  /// 一次最多处理的图像数量
  pub selection_limit: usize,
  /// 原始输入的硬上限，超出时直接拒绝
  pub max_input_bytes: usize,
}

impl Default for PickerConfig {
  fn default() -> Self {
    Self {
      file_max_mb: DEFAULT_FILE_MAX_MB,
      image_size: DEFAULT_IMAGE_SIZE,
      selection_limit: DEFAULT_SELECTION_LIMIT,
      max_input_bytes: DEFAULT_MAX_INPUT_BYTES,
    }
  }
}

impl PickerConfig {
  pub fn max_file_bytes(&self) -> usize {
    self.file_max_mb * 1_000_000
  }
}

/// 检测与检索流程配置
#[derive(Debug, Clone)]
pub struct PipelineConfig {
  /// 检测前的图像归一化策略
  pub detection_size: TargetSize,
  pub orientation: Orientation,
  /// 用于检索的裁剪序号，未指定时取置信度最高者
  pub crop_index: Option<usize>,
}

impl Default for PipelineConfig {
  fn default() -> Self {
    Self {
      detection_size: DEFAULT_DETECTION_SIZE,
      orientation: Orientation::Up,
      crop_index: None,
    }
  }
}
