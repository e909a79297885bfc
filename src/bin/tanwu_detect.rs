// 该文件是 Tanwu （探物） 项目的一部分。
// src/bin/tanwu_detect.rs - 检测并裁剪图像中的目标
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

use anyhow::Result;
use clap::Parser;
use tracing::info;
use url::Url;

use tanwu::{
  FromUrl,
  config::PipelineConfig,
  geometry::Orientation,
  input::InputWrapper,
  model::DetectorWrapper,
  normalize::TargetSize,
  output::OutputWrapper,
  task::{DetectTask, Task},
};

/// 检测参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 检测模型，如 yolo26:///path/model.onnx 或 replay:///path/detections.json
  #[arg(long, value_name = "MODEL")]
  pub model: Url,
  /// 输入图像
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 输出，如 folder:///dir?record=name 或 image:///path/out.png
  #[arg(long, value_name = "OUTPUT")]
  pub output: Url,
  /// 图像方向: up, down, left, right
  #[arg(long, default_value = "up", value_name = "ORIENTATION")]
  pub orientation: Orientation,
  /// 检测视图尺寸
  #[arg(long, default_value = "fill:384x640", value_name = "POLICY")]
  pub detection_size: TargetSize,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("模型: {}", args.model);
  info!("输入来源: {}", args.input);
  info!("输出路径: {}", args.output);

  let item = InputWrapper::from_url(&args.input)?.into_item();
  let image = image::load_from_memory(&item.data)?;
  let model = DetectorWrapper::from_url(&args.model)?;
  let output = OutputWrapper::from_url(&args.output)?;

  let task = DetectTask::new(PipelineConfig {
    detection_size: args.detection_size,
    orientation: args.orientation,
    ..PipelineConfig::default()
  });
  let report = task.run_task(image, model, output)?;

  for (index, crop) in report.crops.iter().enumerate() {
    info!(
      "{}: {} {:.2} @ ({}, {}) {}x{}",
      index,
      crop.label,
      crop.confidence,
      crop.rect.x,
      crop.rect.y,
      crop.rect.width,
      crop.rect.height
    );
  }

  Ok(())
}
