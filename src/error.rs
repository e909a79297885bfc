// 该文件是 Tanwu （探物） 项目的一部分。
// src/error.rs - 错误汇总
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

use crate::{
  encode::EncodeError, frame::FrameError, input::InputError, model::ModelError,
  normalize::NormalizeError, output::OutputError, picker::PickError, search::SearchError,
};

#[derive(Error, Debug)]
pub enum Error {
  #[error("归一化错误: {0}")]
  Normalize(#[from] NormalizeError),
  #[error("帧错误: {0}")]
  Frame(#[from] FrameError),
  #[error("模型错误: {0}")]
  Model(#[from] ModelError),
  #[error("编码错误: {0}")]
  Encode(#[from] EncodeError),
  #[error("加载错误: {0}")]
  Pick(#[from] PickError),
  #[error("检索错误: {0}")]
  Search(#[from] SearchError),
  #[error("输入错误: {0}")]
  Input(#[from] InputError),
  #[error("输出错误: {0}")]
  Output(#[from] OutputError),
  #[error("没有可用于检索的裁剪")]
  NoCrop,
}

/// 调用方关心的错误类别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  OversizedFile,
  DecodeFailure,
  ShapeMismatch,
  ModelLoadFailure,
  RemoteCallFailure,
  EncodingFailure,
  InferenceFailure,
  InvalidArgument,
  Io,
  NotFound,
}

impl Error {
  pub fn kind(&self) -> ErrorKind {
    match self {
      Error::Normalize(NormalizeError::Empty(..)) => ErrorKind::DecodeFailure,
      Error::Normalize(_) => ErrorKind::InvalidArgument,
      Error::Frame(_) => ErrorKind::ShapeMismatch,
      Error::Model(e) => match e {
        ModelError::Load { .. } => ErrorKind::ModelLoadFailure,
        ModelError::Shape(_) => ErrorKind::ShapeMismatch,
        ModelError::Inference(_) => ErrorKind::InferenceFailure,
        ModelError::SchemeMismatch(_) | ModelError::Unsupported(_) => ErrorKind::InvalidArgument,
      },
      Error::Encode(_) => ErrorKind::EncodingFailure,
      Error::Pick(e) => match e {
        PickError::OversizedFile { .. } => ErrorKind::OversizedFile,
        PickError::DecodeFailure(_) => ErrorKind::DecodeFailure,
        PickError::Normalize(_) => ErrorKind::DecodeFailure,
        PickError::Encoding(_) => ErrorKind::EncodingFailure,
        PickError::WorkerPanicked => ErrorKind::EncodingFailure,
      },
      Error::Search(SearchError::SchemeMismatch(_)) => ErrorKind::InvalidArgument,
      Error::Search(_) => ErrorKind::RemoteCallFailure,
      Error::Input(_) | Error::Output(_) => ErrorKind::Io,
      Error::NoCrop => ErrorKind::NotFound,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn kinds_follow_the_source_error() {
    let oversized: Error = PickError::OversizedFile { size: 10, limit: 5 }.into();
    assert_eq!(oversized.kind(), ErrorKind::OversizedFile);

    let load: Error = ModelError::load("/nowhere.onnx", "文件不存在").into();
    assert_eq!(load.kind(), ErrorKind::ModelLoadFailure);

    let shape: Error = FrameError::LengthMismatch {
      expected: 12,
      actual: 3,
    }
    .into();
    assert_eq!(shape.kind(), ErrorKind::ShapeMismatch);

    let remote: Error = SearchError::Status(502).into();
    assert_eq!(remote.kind(), ErrorKind::RemoteCallFailure);

    let encode: Error = EncodeError::Empty(20).into();
    assert_eq!(encode.kind(), ErrorKind::EncodingFailure);
  }

  #[test]
  fn undecodable_bytes_are_decode_failures() {
    let err = match image::load_from_memory(b"not an image") {
      Err(e) => Error::from(PickError::from(e)),
      Ok(_) => panic!("decoded garbage"),
    };
    assert_eq!(err.kind(), ErrorKind::DecodeFailure);
  }
}
