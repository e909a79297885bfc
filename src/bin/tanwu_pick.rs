// 该文件是 Tanwu （探物） 项目的一部分。
// src/bin/tanwu_pick.rs - 批量加载、缩放并压缩图像
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

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};
use url::Url;

use tanwu::{
  config::{DEFAULT_FILE_MAX_MB, DEFAULT_MAX_INPUT_BYTES, DEFAULT_SELECTION_LIMIT, PickerConfig},
  input::read_items,
  normalize::TargetSize,
  picker::{MediaLoader, PickOutcome},
};

/// 选图参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 输入图像，可重复指定，如 image:///path/a.jpg
  #[arg(long, value_name = "SOURCE")]
  pub input: Vec<Url>,
  /// 输出目录
  #[arg(long, value_name = "DIR")]
  pub output: PathBuf,
  /// 尺寸策略，max:WxH 或 fill:WxH
  #[arg(long, default_value = "max:1280x1280", value_name = "POLICY")]
  pub image_size: TargetSize,
  /// 单个文件体积上限（MB）
  #[arg(long, default_value_t = DEFAULT_FILE_MAX_MB, value_name = "MB")]
  pub file_max_mb: usize,
  /// 一次最多处理的图像数量
  #[arg(long, default_value_t = DEFAULT_SELECTION_LIMIT, value_name = "COUNT")]
  pub selection_limit: usize,
  /// 原始输入体积上限（字节）
  #[arg(long, default_value_t = DEFAULT_MAX_INPUT_BYTES, value_name = "BYTES")]
  pub max_input_bytes: usize,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("输入数量: {}", args.input.len());
  info!("输出目录: {}", args.output.display());
  info!("尺寸策略: {}", args.image_size);

  let items = read_items(&args.input)?;
  let loader = MediaLoader::new(PickerConfig {
    file_max_mb: args.file_max_mb,
    image_size: args.image_size,
    selection_limit: args.selection_limit,
    max_input_bytes: args.max_input_bytes,
  });

  let now = std::time::Instant::now();
  let results = match loader.load(items) {
    PickOutcome::Cancelled => {
      info!("没有输入，退出");
      return Ok(());
    }
    PickOutcome::Picked(results) => results,
  };
  info!("加载完成，耗时: {:.2?}", now.elapsed());

  std::fs::create_dir_all(&args.output)?;
  for (index, result) in results.into_iter().enumerate() {
    match result {
      Ok(media) => {
        let stem = media
          .id
          .as_deref()
          .and_then(|id| std::path::Path::new(id).file_stem())
          .map(|stem| stem.to_string_lossy().into_owned())
          .unwrap_or_else(|| "image".to_string());
        let path = args.output.join(format!("{:03}-{}.jpg", index, stem));
        std::fs::write(&path, &media.data)?;
        info!(
          "{}: {}x{}, {} 字节, 质量 {}",
          path.display(),
          media.width,
          media.height,
          media.data.len(),
          media.quality
        );
      }
      Err(e) => error!("第 {} 张图像失败: {}", index, tanwu::Error::from(e)),
    }
  }

  Ok(())
}
