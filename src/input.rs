// 该文件是 D2Go Detect 项目的一部分。
// src/input.rs - 原始输出缓冲区输入
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

use std::{
  collections::VecDeque,
  marker::PhantomData,
  path::{Path, PathBuf},
};

use thiserror::Error;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, frame::RawOutput, geometry::Size, query_value};

mod json_buffer_file;
mod raw_buffer_file;

pub use self::json_buffer_file::{JsonBuffer, JsonBufferError};
pub use self::raw_buffer_file::{RawBuffer, RawBufferError};

/// 缓冲区文件格式
pub trait BufferFormat {
  type Error: std::error::Error;
  const SCHEME: &'static str;
  const EXTENSION: &'static str;

  fn read(path: &Path, params: &BufferParams) -> Result<RawOutput, Self::Error>;
}

/// 来自 URL 查询参数的补充信息
#[derive(Debug, Clone, Default)]
pub struct BufferParams {
  /// `?width=W&height=H`，缓冲区坐标所在的像素空间
  pub size: Option<Size>,
  /// `?image=PATH`，对应的原始图像
  pub image: Option<PathBuf>,
}

impl BufferParams {
  fn from_url(url: &Url) -> Result<Self, InputError> {
    let dimension = |key: &'static str| {
      query_value(url, key)
        .map(|v| {
          v.parse::<f32>()
            .map_err(|_| InputError::InvalidParameter(key, v))
        })
        .transpose()
    };

    let size = match (dimension("width")?, dimension("height")?) {
      (Some(width), Some(height)) => Some(Size::new(width, height)),
      (None, None) => None,
      _ => {
        return Err(InputError::InvalidParameter(
          "size",
          "width 与 height 必须同时给出".to_string(),
        ));
      }
    };

    Ok(Self {
      size,
      image: query_value(url, "image").map(PathBuf::from),
    })
  }
}

#[derive(Error, Debug)]
pub enum InputError {
  #[error("JSON 缓冲区错误: {0}")]
  JsonBufferError(#[from] JsonBufferError),
  #[error("二进制缓冲区错误: {0}")]
  RawBufferError(#[from] RawBufferError),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("参数 {0} 无效: {1}")]
  InvalidParameter(&'static str, String),
  #[error("URI scheme mismatch")]
  SchemeMismatch,
}

/// 从单个文件或目录读取缓冲区
///
/// 目录中按文件名排序，只读取扩展名匹配的文件。
pub struct BufferFileInput<F: BufferFormat> {
  paths: VecDeque<PathBuf>,
  params: BufferParams,
  _phantom: PhantomData<F>,
}

impl<F: BufferFormat> FromUrlWithScheme for BufferFileInput<F> {
  const SCHEME: &'static str = F::SCHEME;
}

impl<F: BufferFormat> FromUrl for BufferFileInput<F> {
  type Error = InputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(InputError::SchemeMismatch);
    }

    let params = BufferParams::from_url(url)?;
    let path = PathBuf::from(url.path());
    let paths = if path.is_dir() {
      let mut entries = std::fs::read_dir(&path)?
        .filter_map(|entry| match entry {
          Ok(entry) => Some(entry.path()),
          Err(e) => {
            warn!("读取目录 {} 中的条目失败: {}", path.display(), e);
            None
          }
        })
        .filter(|p| p.extension().is_some_and(|ext| ext == F::EXTENSION))
        .collect::<Vec<_>>();
      entries.sort();
      info!("目录 {} 中找到 {} 个缓冲区文件", path.display(), entries.len());
      entries
    } else {
      vec![path]
    };

    Ok(Self {
      paths: paths.into(),
      params,
      _phantom: PhantomData,
    })
  }
}

impl<F: BufferFormat> Iterator for BufferFileInput<F> {
  type Item = RawOutput;

  fn next(&mut self) -> Option<Self::Item> {
    while let Some(path) = self.paths.pop_front() {
      match F::read(&path, &self.params) {
        Ok(output) => {
          debug!("读取缓冲区 {}: {} 个数值", path.display(), output.values().len());
          return Some(output);
        }
        Err(e) => {
          error!("读取缓冲区 {} 失败: {}", path.display(), e);
        }
      }
    }
    None
  }
}

pub enum InputWrapper {
  Json(BufferFileInput<JsonBuffer>),
  Raw(BufferFileInput<RawBuffer>),
}

impl FromUrl for InputWrapper {
  type Error = InputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    match url.scheme() {
      JsonBuffer::SCHEME => Ok(InputWrapper::Json(BufferFileInput::from_url(url)?)),
      RawBuffer::SCHEME => Ok(InputWrapper::Raw(BufferFileInput::from_url(url)?)),
      _ => Err(InputError::SchemeMismatch),
    }
  }
}

impl Iterator for InputWrapper {
  type Item = RawOutput;

  fn next(&mut self) -> Option<Self::Item> {
    match self {
      InputWrapper::Json(input) => input.next(),
      InputWrapper::Raw(input) => input.next(),
    }
  }
}
