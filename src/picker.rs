// 该文件是 Tanwu （探物） 项目的一部分。
// src/picker.rs - 选图结果的并发加载与压缩
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

use std::{sync::mpsc, thread};

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::{
  config::PickerConfig,
  encode::{EncodeError, SizeConstrainedEncoder},
  normalize::{NormalizeError, normalize},
};

#[derive(Error, Debug)]
pub enum PickError {
  #[error("文件过大: {size} 字节, 上限 {limit} 字节")]
  OversizedFile { size: usize, limit: usize },
  #[error("图像解码失败: {0}")]
  DecodeFailure(#[from] image::ImageError),
  #[error("图像归一化失败: {0}")]
  Normalize(#[from] NormalizeError),
  #[error("图像编码失败: {0}")]
  Encoding(#[from] EncodeError),
  #[error("加载任务异常退出")]
  WorkerPanicked,
}

/// 选图器交给我们的原始数据
#[derive(Debug, Clone)]
pub struct PickedItem {
  pub id: Option<String>,
  pub data: Vec<u8>,
}

/// 归一化并压缩后的图像
#[derive(Debug, Clone)]
pub struct PickedMedia {
  pub id: Option<String>,
  /// JPEG 数据
  pub data: Vec<u8>,
  pub width: u32,
  pub height: u32,
  /// 编码质量（百分比）
  pub quality: u8,
}

pub type PickedResult = Result<PickedMedia, PickError>;

#[derive(Debug)]
pub enum PickOutcome {
  /// 没有选择任何图像
  Cancelled,
  /// 与输入顺序一致的逐项结果
  Picked(Vec<PickedResult>),
}

pub struct MediaLoader {
  config: PickerConfig,
}

impl MediaLoader {
  pub fn new(config: PickerConfig) -> Self {
    Self { config }
  }

  pub fn config(&self) -> &PickerConfig {
    &self.config
  }

  /// 每项在独立线程上加载，全部结束后按原始顺序返回
  ///
  /// 单项失败不影响其他项。
  pub fn load(&self, mut items: Vec<PickedItem>) -> PickOutcome {
    if items.is_empty() {
      info!("未选择任何图像，视为取消");
      return PickOutcome::Cancelled;
    }

    if items.len() > self.config.selection_limit {
      warn!(
        "选择了 {} 张图像，超过上限 {}，多余的将被忽略",
        items.len(),
        self.config.selection_limit
      );
      items.truncate(self.config.selection_limit);
    }

    let count = items.len();
    let mut slots: Vec<Option<PickedResult>> = (0..count).map(|_| None).collect();
    let (tx, rx) = mpsc::channel();

    thread::scope(|scope| {
      let handles: Vec<_> = items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
          let tx = tx.clone();
          scope.spawn(move || {
            let result = self.load_one(item);
            if let Err(e) = &result {
              error!("第 {} 张图像加载失败: {}", index, e);
            }
            let _ = tx.send((index, result));
          })
        })
        .collect();

      // 屏障：全部任务结束后才读取结果
      for handle in handles {
        if handle.join().is_err() {
          error!("图像加载任务异常退出");
        }
      }
    });
    drop(tx);

    for (index, result) in rx {
      slots[index] = Some(result);
    }

    let results: Vec<PickedResult> = slots
      .into_iter()
      .map(|slot| slot.unwrap_or(Err(PickError::WorkerPanicked)))
      .collect();
    info!(
      "加载完成: {} 成功, {} 失败",
      results.iter().filter(|r| r.is_ok()).count(),
      results.iter().filter(|r| r.is_err()).count()
    );
    PickOutcome::Picked(results)
  }

  /// 解码、归一化并压缩单张图像
  pub fn load_one(&self, item: PickedItem) -> PickedResult {
    let limit = self.config.max_input_bytes;
    if item.data.len() > limit {
      return Err(PickError::OversizedFile {
        size: item.data.len(),
        limit,
      });
    }

    let decoded = image::load_from_memory(&item.data)?;
    let normalized = normalize(&decoded, Some(&self.config.image_size))?;
    let encoder = SizeConstrainedEncoder::jpeg(self.config.max_file_bytes());
    let encoded = encoder.encode(&normalized)?;
    debug!(
      "图像 {:?}: {}x{} -> {}x{}, {} 字节, 质量 {}",
      item.id,
      decoded.width(),
      decoded.height(),
      normalized.width(),
      normalized.height(),
      encoded.len(),
      encoded.quality
    );

    Ok(PickedMedia {
      id: item.id,
      data: encoded.data,
      width: normalized.width(),
      height: normalized.height(),
      quality: encoded.quality,
    })
  }
}

#[cfg(test)]
mod tests {
  use std::io::Cursor;

  use image::{ImageFormat, Rgb, RgbImage};

  use super::*;
  use crate::{geometry::Size, normalize::TargetSize};

  fn png(width: u32, height: u32) -> Vec<u8> {
    let image = RgbImage::from_fn(width, height, |x, y| Rgb([x as u8, y as u8, 7]));
    let mut bytes = Vec::new();
    image
      .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
      .unwrap();
    bytes
  }

  fn item(id: &str, data: Vec<u8>) -> PickedItem {
    PickedItem {
      id: Some(id.to_string()),
      data,
    }
  }

  #[test]
  fn empty_selection_is_cancel() {
    let loader = MediaLoader::new(PickerConfig::default());
    assert!(matches!(loader.load(Vec::new()), PickOutcome::Cancelled));
  }

  #[test]
  fn results_keep_input_order_and_isolate_failures() {
    let loader = MediaLoader::new(PickerConfig {
      image_size: TargetSize::Max(Size::new(64, 64)),
      ..PickerConfig::default()
    });
    let items = vec![
      item("a", png(200, 100)),
      item("broken", b"not an image".to_vec()),
      item("c", png(10, 30)),
    ];

    let PickOutcome::Picked(results) = loader.load(items) else {
      panic!("expected picked results");
    };
    assert_eq!(results.len(), 3);

    let first = results[0].as_ref().unwrap();
    assert_eq!(first.id.as_deref(), Some("a"));
    assert_eq!((first.width, first.height), (64, 32));
    assert_eq!(&first.data[..2], &[0xFF, 0xD8]);

    assert!(matches!(results[1], Err(PickError::DecodeFailure(_))));

    let third = results[2].as_ref().unwrap();
    assert_eq!(third.id.as_deref(), Some("c"));
    assert_eq!((third.width, third.height), (10, 30));
  }

  #[test]
  fn selection_limit_truncates() {
    let loader = MediaLoader::new(PickerConfig {
      selection_limit: 2,
      ..PickerConfig::default()
    });
    let items = (0..5).map(|i| item(&i.to_string(), png(8, 8))).collect();
    let PickOutcome::Picked(results) = loader.load(items) else {
      panic!("expected picked results");
    };
    assert_eq!(results.len(), 2);
  }

  #[test]
  fn oversized_input_is_rejected_before_decoding() {
    let loader = MediaLoader::new(PickerConfig {
      max_input_bytes: 16,
      ..PickerConfig::default()
    });
    assert!(matches!(
      loader.load_one(item("big", png(32, 32))),
      Err(PickError::OversizedFile { limit: 16, .. })
    ));
  }
}
