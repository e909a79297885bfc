// 该文件是 Tanwu （探物） 项目的一部分。
// src/output/directory_record.rs - 裁剪结果目录记录输出
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

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU16, Ordering};

use chrono::{Datelike, Utc};
use image::RgbImage;
use thiserror::Error;
use tracing::{debug, info};

use crate::{
  FromUrl, FromUrlWithScheme,
  encode::{DEFAULT_START_QUALITY, EncodeError, Jpeg, QualityEncoder},
  output::Render,
  postprocess::DetectionReport,
};

pub const RECORD_FILE: &str = "detections.txt";

#[derive(Error, Debug)]
pub enum CropDirectoryOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("编码错误: {0}")]
  EncodeError(#[from] EncodeError),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
}

/// 记录文件中标签的写法
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordLabel {
  Name,
  /// 以裁剪序号代替标签名
  Index,
}

pub struct Record {
  pub label: RecordLabel,
}

impl Record {
  fn label_of(&self, index: usize, label: &str) -> String {
    match self.label {
      RecordLabel::Name => label.to_string(),
      RecordLabel::Index => index.to_string(),
    }
  }

  /// 每行一个裁剪: `label, confidence, x, y, w, h`，坐标为源图像素
  pub fn record(&self, report: &DetectionReport, path: &Path) -> Result<(), std::io::Error> {
    let records: Vec<String> = report
      .crops
      .iter()
      .enumerate()
      .map(|(index, crop)| {
        format!(
          "{}, {:.4}, {}, {}, {}, {}",
          self.label_of(index, &crop.label),
          crop.confidence,
          crop.rect.x,
          crop.rect.y,
          crop.rect.width,
          crop.rect.height
        )
      })
      .collect();
    std::fs::write(path, records.join("\n"))
  }
}

/// 把每次检测的裁剪写入 `<dir>/YYYY/MM/DD/HH-MM-SS-NNNN/`
pub struct CropDirectoryOutput {
  directory: PathBuf,
  record: Record,
  counter: AtomicU16,
  always: bool,
}

impl FromUrlWithScheme for CropDirectoryOutput {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for CropDirectoryOutput {
  type Error = CropDirectoryOutputError;

  /// `folder:///dir?record=name|id&always`
  fn from_url(uri: &url::Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(CropDirectoryOutputError::SchemeMismatch);
    }

    let label = uri
      .query_pairs()
      .find(|(k, _)| k == "record")
      .map(|(_, v)| match v.as_ref() {
        "id" => RecordLabel::Index,
        _ => RecordLabel::Name,
      })
      .unwrap_or(RecordLabel::Name);

    let always = uri.query_pairs().any(|(k, _)| k == "always");

    Ok(CropDirectoryOutput {
      directory: crate::url_path(uri),
      record: Record { label },
      counter: AtomicU16::new(0),
      always,
    })
  }
}

/// 标签中不适合出现在文件名里的字符替换为下划线
fn file_label(label: &str) -> String {
  label
    .chars()
    .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '_' })
    .collect()
}

impl CropDirectoryOutput {
  fn run_id(&self) -> u16 {
    self.counter.fetch_add(1, Ordering::Relaxed).wrapping_add(1)
  }

  fn run_directory(&self) -> Result<PathBuf, std::io::Error> {
    let now = Utc::now();
    let directory = self
      .directory
      .join(now.year().to_string())
      .join(format!("{:02}", now.month()))
      .join(format!("{:02}", now.day()))
      .join(format!("{}-{:04X}", now.format("%H-%M-%S"), self.run_id()));
    std::fs::create_dir_all(&directory)?;
    Ok(directory)
  }

  /// 写出一次检测的全部裁剪，返回本次使用的目录；没有裁剪且未设置 `always` 时返回 `None`
  pub fn write_report(
    &self,
    report: &DetectionReport,
  ) -> Result<Option<PathBuf>, CropDirectoryOutputError> {
    if report.crops.is_empty() && !self.always {
      debug!("没有裁剪结果，跳过写出");
      return Ok(None);
    }

    let directory = self.run_directory()?;
    for (index, crop) in report.crops.iter().enumerate() {
      let name = match self.record.label {
        RecordLabel::Name => format!("{:03}-{}.jpg", index, file_label(&crop.label)),
        RecordLabel::Index => format!("{:03}.jpg", index),
      };
      let data = Jpeg.encode(&crop.image, DEFAULT_START_QUALITY)?;
      std::fs::write(directory.join(&name), data)?;
    }
    self.record.record(report, &directory.join(RECORD_FILE))?;

    info!(
      "写出 {} 个裁剪到 {}",
      report.crops.len(),
      directory.display()
    );
    Ok(Some(directory))
  }
}

impl Render<DetectionReport> for CropDirectoryOutput {
  type Error = CropDirectoryOutputError;

  fn render_result(&self, _image: &RgbImage, result: &DetectionReport) -> Result<(), Self::Error> {
    self.write_report(result).map(|_| ())
  }
}
