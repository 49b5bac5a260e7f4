// 该文件是 D2Go Detect 项目的一部分。
// src/output/directory_record.rs - 目录记录输出
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
  path::PathBuf,
  sync::atomic::{AtomicU32, Ordering},
};

use chrono::{DateTime, Datelike, Utc};
use thiserror::Error;
use tracing::debug;

#[cfg(feature = "save_image_file")]
use crate::output::{SaveImageFileError, draw::Draw, save_image_file::save_rgb};
use crate::{
  FromUrl, FromUrlWithScheme,
  frame::RawOutput,
  labels::LabelSet,
  model::DetectResult,
  output::{Render, ResultRecord},
};

#[derive(Error, Debug)]
pub enum DirectoryRecordOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("JSON 序列化错误: {0}")]
  SerializeError(#[from] serde_json::Error),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[cfg(feature = "save_image_file")]
  #[error("图像错误: {0}")]
  ImageError(#[from] SaveImageFileError),
}

/// 按日期分目录保存每次结果：`<dir>/YYYY/MM/DD/HH-MM-SS-XXXX.json`
///
/// 查询参数 `always` 同时记录空结果，`draw` 额外保存绘制后的图像。
pub struct DirectoryRecordOutput {
  directory: PathBuf,
  frame_counter: AtomicU32,
  always: bool,
  #[cfg(feature = "save_image_file")]
  draw: Option<Draw>,
  labels: Option<LabelSet>,
}

impl FromUrlWithScheme for DirectoryRecordOutput {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn from_url(uri: &url::Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(DirectoryRecordOutputError::SchemeMismatch);
    }

    let always = uri.query_pairs().any(|(k, _)| k == "always");
    #[cfg(feature = "save_image_file")]
    let draw = uri
      .query_pairs()
      .any(|(k, _)| k == "draw")
      .then(Draw::default);

    Ok(DirectoryRecordOutput {
      directory: PathBuf::from(uri.path()),
      frame_counter: AtomicU32::new(0),
      always,
      #[cfg(feature = "save_image_file")]
      draw,
      labels: None,
    })
  }
}

impl DirectoryRecordOutput {
  pub fn with_labels(mut self, labels: Option<LabelSet>) -> Self {
    self.labels = labels;
    self
  }

  fn frame_id(&self) -> u32 {
    (self.frame_counter.fetch_add(1, Ordering::Relaxed) + 1) & 0xFFFF
  }

  /// 不带扩展名的记录路径
  fn frame_stem(&self, now: DateTime<Utc>) -> Result<PathBuf, DirectoryRecordOutputError> {
    let directory = self
      .directory
      .join(now.year().to_string())
      .join(format!("{:02}", now.month()))
      .join(format!("{:02}", now.day()));
    std::fs::create_dir_all(&directory)?;

    Ok(directory.join(format!(
      "{}-{:04X}",
      now.format("%H-%M-%S"),
      self.frame_id()
    )))
  }
}

impl Render<RawOutput, DetectResult> for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn render_result(&self, frame: &RawOutput, result: &DetectResult) -> Result<(), Self::Error> {
    if !self.always && result.is_empty() {
      return Ok(());
    }

    let stem = self.frame_stem(Utc::now())?;
    let record = ResultRecord::new(frame, result, self.labels.as_ref());
    let json_path = stem.with_extension("json");
    std::fs::write(&json_path, serde_json::to_vec_pretty(&record)?)?;
    debug!("记录结果到 {}", json_path.display());

    #[cfg(feature = "save_image_file")]
    if let Some(draw) = &self.draw {
      let image = draw.render(frame, result).map_err(SaveImageFileError::from)?;
      save_rgb(image, &stem.with_extension("png"))?;
    }

    Ok(())
  }
}
