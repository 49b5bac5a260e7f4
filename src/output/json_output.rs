// 该文件是 D2Go Detect 项目的一部分。
// src/output/json_output.rs - JSON Lines 输出
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
  fs::File,
  io::{BufWriter, Write},
  path::{Path, PathBuf},
  sync::Mutex,
};

use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::RawOutput,
  labels::LabelSet,
  model::DetectResult,
  output::{Render, ResultRecord},
};

#[derive(Error, Debug)]
pub enum JsonOutputError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("JSON 序列化错误: {0}")]
  SerializeError(#[from] serde_json::Error),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("输出文件锁已失效")]
  Poisoned,
}

/// 每个结果打印一行 JSON 到标准输出
#[derive(Debug, Default)]
pub struct StdoutOutput {
  labels: Option<LabelSet>,
}

impl StdoutOutput {
  pub fn with_labels(mut self, labels: Option<LabelSet>) -> Self {
    self.labels = labels;
    self
  }
}

impl FromUrlWithScheme for StdoutOutput {
  const SCHEME: &'static str = "stdout";
}

impl FromUrl for StdoutOutput {
  type Error = JsonOutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(JsonOutputError::SchemeMismatch(url.scheme().to_string()));
    }
    Ok(Self::default())
  }
}

impl Render<RawOutput, DetectResult> for StdoutOutput {
  type Error = JsonOutputError;

  fn render_result(&self, frame: &RawOutput, result: &DetectResult) -> Result<(), Self::Error> {
    let record = ResultRecord::new(frame, result, self.labels.as_ref());
    let line = serde_json::to_string(&record)?;
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{}", line)?;
    Ok(())
  }
}

/// 写入 JSON Lines 文件，创建时清空已有内容
pub struct JsonFileOutput {
  path: PathBuf,
  writer: Mutex<BufWriter<File>>,
  labels: Option<LabelSet>,
}

impl JsonFileOutput {
  pub fn create(path: impl AsRef<Path>) -> Result<Self, JsonOutputError> {
    let path = path.as_ref().to_path_buf();
    if let Some(parent) = path.parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent)?;
    }

    let file = File::create(&path)?;
    info!("结果写入 {}", path.display());
    Ok(Self {
      path,
      writer: Mutex::new(BufWriter::new(file)),
      labels: None,
    })
  }

  pub fn with_labels(mut self, labels: Option<LabelSet>) -> Self {
    self.labels = labels;
    self
  }
}

impl FromUrlWithScheme for JsonFileOutput {
  const SCHEME: &'static str = "json";
}

impl FromUrl for JsonFileOutput {
  type Error = JsonOutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(JsonOutputError::SchemeMismatch(url.scheme().to_string()));
    }
    Self::create(url.path())
  }
}

impl Render<RawOutput, DetectResult> for JsonFileOutput {
  type Error = JsonOutputError;

  fn render_result(&self, frame: &RawOutput, result: &DetectResult) -> Result<(), Self::Error> {
    let record = ResultRecord::new(frame, result, self.labels.as_ref());
    let mut writer = self.writer.lock().map_err(|_| JsonOutputError::Poisoned)?;
    serde_json::to_writer(&mut *writer, &record)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    debug!("写入 {} 个检测到 {}", result.len(), self.path.display());
    Ok(())
  }
}
