// 该文件是 Tanwu （探物） 项目的一部分。
// src/bin/tanwu_search.rs - 检测、嵌入并调用远端检索
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
  model::{DetectorWrapper, OnnxEmbedder},
  normalize::TargetSize,
  output::OutputWrapper,
  search::SearchClient,
  task::{SearchTask, Task},
};

/// 检索参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 检测模型
  #[arg(long, value_name = "MODEL")]
  pub model: Url,
  /// 嵌入模型，如 embed:///path/embedding.onnx
  #[arg(long, value_name = "MODEL")]
  pub embedder: Url,
  /// 检索服务地址
  #[arg(long, value_name = "ENDPOINT")]
  pub search: Url,
  /// 输入图像
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 输出
  #[arg(long, value_name = "OUTPUT")]
  pub output: Url,
  /// 图像方向: up, down, left, right
  #[arg(long, default_value = "up", value_name = "ORIENTATION")]
  pub orientation: Orientation,
  /// 检测视图尺寸
  #[arg(long, default_value = "fill:384x640", value_name = "POLICY")]
  pub detection_size: TargetSize,
  /// 用于检索的裁剪序号，默认取置信度最高者
  #[arg(long, value_name = "INDEX")]
  pub crop: Option<usize>,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("检测模型: {}", args.model);
  info!("嵌入模型: {}", args.embedder);
  info!("检索服务: {}", args.search);

  let item = InputWrapper::from_url(&args.input)?.into_item();
  let image = image::load_from_memory(&item.data)?;
  let detector = DetectorWrapper::from_url(&args.model)?;
  let embedder = OnnxEmbedder::from_url(&args.embedder)?;
  let output = OutputWrapper::from_url(&args.output)?;
  let client = SearchClient::from_url(&args.search)?;

  let task = SearchTask::new(
    PipelineConfig {
      detection_size: args.detection_size,
      orientation: args.orientation,
      crop_index: args.crop,
    },
    client,
  );
  let outcome = task.run_task(image, (detector, embedder), output)?;

  info!(
    "使用第 {} 个裁剪完成检索",
    outcome.crop_index
  );
  println!("{}", outcome.response);

  Ok(())
}
