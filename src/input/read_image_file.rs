// 该文件是 Tanwu （探物） 项目的一部分。
// src/input/read_image_file.rs - 图像文件输入
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

use thiserror::Error;
use tracing::{debug, error};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, picker::PickedItem};

#[derive(Error, Debug)]
pub enum ImageFileInputError {
  #[error("URI schema mismatch")]
  SchemaMismatch,
  #[error("I/O error: {0}")]
  IoError(#[from] std::io::Error),
}

/// 原样读取图像文件的字节，解码留给加载流程
pub struct ImageFileInput {
  id: Option<String>,
  data: Vec<u8>,
}

impl FromUrlWithScheme for ImageFileInput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for ImageFileInput {
  type Error = ImageFileInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(ImageFileInputError::SchemaMismatch);
    }

    let path = crate::url_path(url);
    let data = std::fs::read(&path)?;
    debug!("读取图像文件 {}: {} 字节", path.display(), data.len());

    Ok(ImageFileInput {
      id: path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned()),
      data,
    })
  }
}

impl ImageFileInput {
  pub fn into_item(self) -> PickedItem {
    PickedItem {
      id: self.id,
      data: self.data,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn reads_bytes_and_uses_file_name_as_id() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("photo.jpg");
    std::fs::write(&path, b"bytes").unwrap();

    let url = Url::from_file_path(&path)
      .map(|u| Url::parse(&format!("image://{}", u.path())).unwrap())
      .unwrap();
    let item = ImageFileInput::from_url(&url).unwrap().into_item();
    assert_eq!(item.id.as_deref(), Some("photo.jpg"));
    assert_eq!(item.data, b"bytes");
  }

  #[test]
  fn wrong_scheme_is_rejected() {
    let url = Url::parse("folder:///tmp").unwrap();
    assert!(matches!(
      ImageFileInput::from_url(&url),
      Err(ImageFileInputError::SchemaMismatch)
    ));
  }
}
