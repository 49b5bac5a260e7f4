// 该文件是 D2Go Detect 项目的一部分。
// src/output.rs - 输出定义
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

use std::path::Path;

use serde::Serialize;
use thiserror::Error;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::RawOutput,
  geometry::{Rect, Size},
  labels::LabelSet,
  model::DetectResult,
};

pub trait Render<Frame, Output>: Sized {
  type Error;
  fn render_result(&self, frame: &Frame, result: &Output) -> Result<(), Self::Error>;
}

#[cfg(feature = "save_image_file")]
pub mod draw;

mod json_output;
pub use self::json_output::{JsonFileOutput, JsonOutputError, StdoutOutput};

#[cfg(feature = "save_image_file")]
mod save_image_file;
#[cfg(feature = "save_image_file")]
pub use self::save_image_file::{SaveImageFileError, SaveImageFileOutput};

#[cfg(feature = "directory_record")]
mod directory_record;
#[cfg(feature = "directory_record")]
pub use self::directory_record::{DirectoryRecordOutput, DirectoryRecordOutputError};

/// 单个检测的序列化形式
#[derive(Serialize, Debug, PartialEq)]
pub struct DetectionRecord<'a> {
  pub class_index: i32,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub label: Option<&'a str>,
  pub score: f32,
  pub rect: Rect,
}

/// 一次后处理结果的序列化形式
#[derive(Serialize, Debug, PartialEq)]
pub struct ResultRecord<'a> {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub image: Option<&'a Path>,
  pub source_size: Size,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub photo_size: Option<Size>,
  pub space: Size,
  pub detections: Vec<DetectionRecord<'a>>,
}

impl<'a> ResultRecord<'a> {
  pub fn new(frame: &'a RawOutput, result: &'a DetectResult, labels: Option<&'a LabelSet>) -> Self {
    Self {
      image: frame.image().map(|p| p.as_path()),
      source_size: frame.source_size(),
      photo_size: frame.photo_size(),
      space: result.space,
      detections: result
        .items
        .iter()
        .map(|d| DetectionRecord {
          class_index: d.class_index,
          label: labels.and_then(|l| l.label_for(d)),
          score: d.score,
          rect: d.rect,
        })
        .collect(),
    }
  }
}

#[derive(Error, Debug)]
pub enum OutputError {
  #[error("JSON 输出错误: {0}")]
  JsonOutputError(#[from] JsonOutputError),
  #[cfg(feature = "save_image_file")]
  #[error("保存图像文件错误: {0}")]
  SaveImageFileError(#[from] SaveImageFileError),
  #[cfg(feature = "directory_record")]
  #[error("目录记录输出错误: {0}")]
  DirectoryRecordOutputError(#[from] DirectoryRecordOutputError),
  #[error("URI 方案不匹配")]
  SchemeMismatch,
}

pub enum OutputWrapper {
  Stdout(StdoutOutput),
  JsonFile(JsonFileOutput),
  #[cfg(feature = "save_image_file")]
  SaveImageFile(SaveImageFileOutput),
  #[cfg(feature = "directory_record")]
  DirectoryRecord(DirectoryRecordOutput),
}

impl FromUrl for OutputWrapper {
  type Error = OutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    match url.scheme() {
      StdoutOutput::SCHEME => Ok(OutputWrapper::Stdout(StdoutOutput::from_url(url)?)),
      JsonFileOutput::SCHEME => Ok(OutputWrapper::JsonFile(JsonFileOutput::from_url(url)?)),
      #[cfg(feature = "save_image_file")]
      SaveImageFileOutput::SCHEME => Ok(OutputWrapper::SaveImageFile(
        SaveImageFileOutput::from_url(url)?,
      )),
      #[cfg(feature = "directory_record")]
      DirectoryRecordOutput::SCHEME => Ok(OutputWrapper::DirectoryRecord(
        DirectoryRecordOutput::from_url(url)?,
      )),
      _ => Err(OutputError::SchemeMismatch),
    }
  }
}

impl OutputWrapper {
  /// 为输出附加类别名称
  pub fn with_labels(self, labels: Option<LabelSet>) -> Self {
    match self {
      OutputWrapper::Stdout(output) => OutputWrapper::Stdout(output.with_labels(labels)),
      OutputWrapper::JsonFile(output) => OutputWrapper::JsonFile(output.with_labels(labels)),
      #[cfg(feature = "save_image_file")]
      OutputWrapper::SaveImageFile(output) => OutputWrapper::SaveImageFile(output),
      #[cfg(feature = "directory_record")]
      OutputWrapper::DirectoryRecord(output) => {
        OutputWrapper::DirectoryRecord(output.with_labels(labels))
      }
    }
  }
}

impl Render<RawOutput, DetectResult> for OutputWrapper {
  type Error = OutputError;

  fn render_result(&self, frame: &RawOutput, result: &DetectResult) -> Result<(), Self::Error> {
    match self {
      OutputWrapper::Stdout(output) => output
        .render_result(frame, result)
        .map_err(OutputError::from),
      OutputWrapper::JsonFile(output) => output
        .render_result(frame, result)
        .map_err(OutputError::from),
      #[cfg(feature = "save_image_file")]
      OutputWrapper::SaveImageFile(output) => output
        .render_result(frame, result)
        .map_err(OutputError::from),
      #[cfg(feature = "directory_record")]
      OutputWrapper::DirectoryRecord(output) => output
        .render_result(frame, result)
        .map_err(OutputError::from),
    }
  }
}
