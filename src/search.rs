// 该文件是 Tanwu （探物） 项目的一部分。
// src/search.rs - 向量检索客户端
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

use serde::Serialize;
use thiserror::Error;
use tracing::{error, info};
use url::Url;

use crate::FromUrl;

#[derive(Error, Debug)]
pub enum SearchError {
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("检索服务返回状态 {0}")]
  Status(u16),
  #[error("检索请求失败: {0}")]
  Transport(String),
  #[error("检索响应无法读取: {0}")]
  Body(#[from] std::io::Error),
}

#[derive(Serialize)]
struct SearchRequest<'a> {
  vectors: &'a [Vec<f32>],
}

/// 以 JSON POST `{"vectors": [[...]]}` 调用远端检索服务
pub struct SearchClient {
  endpoint: Url,
  agent: ureq::Agent,
}

impl FromUrl for SearchClient {
  type Error = SearchError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    match url.scheme() {
      "http" | "https" => Ok(Self {
        endpoint: url.clone(),
        // 3xx 视为成功，不跟随跳转
        agent: ureq::AgentBuilder::new().redirects(0).build(),
      }),
      other => Err(SearchError::SchemeMismatch(other.to_string())),
    }
  }
}

impl SearchClient {
  pub fn endpoint(&self) -> &Url {
    &self.endpoint
  }

  /// 发送一次请求，2xx 与 3xx 视为成功并原样返回响应体，不做重试
  pub fn search(&self, vectors: &[Vec<f32>]) -> Result<String, SearchError> {
    info!(
      "发送检索请求: {} 个向量 -> {}",
      vectors.len(),
      self.endpoint
    );

    let response = self
      .agent
      .post(self.endpoint.as_str())
      .send_json(SearchRequest { vectors })
      .map_err(|e| match e {
        ureq::Error::Status(code, _) => {
          error!("检索服务返回错误状态: {}", code);
          SearchError::Status(code)
        }
        ureq::Error::Transport(t) => {
          error!("检索请求失败: {}", t);
          SearchError::Transport(t.to_string())
        }
      })?;

    let status = response.status();
    if !(200..400).contains(&status) {
      error!("检索服务返回错误状态: {}", status);
      return Err(SearchError::Status(status));
    }

    let body = response.into_string()?;
    info!("检索完成: 状态 {}, 响应 {} 字节", status, body.len());
    Ok(body)
  }
}
