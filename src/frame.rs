// 该文件是 D2Go Detect 项目的一部分。
// src/frame.rs - 推理引擎原始输出定义
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

use crate::geometry::Size;

/// 每条记录的字段数：left, top, right, bottom, confidence, classId
pub const RECORD_WIDTH: usize = 6;

pub const FIELD_LEFT: usize = 0;
pub const FIELD_TOP: usize = 1;
pub const FIELD_RIGHT: usize = 2;
pub const FIELD_BOTTOM: usize = 3;
pub const FIELD_CONFIDENCE: usize = 4;
pub const FIELD_CLASS: usize = 5;

/// 模型默认输入尺寸
pub const DEFAULT_INPUT_SIZE: Size = Size::new(640.0, 640.0);

/// 一次推理的原始输出
///
/// `values` 为扁平的记录序列，坐标位于 `source_size` 描述的像素空间内。
/// 若给出了 `photo_size`（原图尺寸），实际空间由解码器按其模型输入尺寸换算，
/// 此时 `source_size` 只是按默认输入尺寸得到的近似值。
#[derive(Debug, Clone)]
pub struct RawOutput {
  values: Box<[f32]>,
  source_size: Size,
  photo_size: Option<Size>,
  image: Option<PathBuf>,
}

impl RawOutput {
  pub fn new(values: impl Into<Box<[f32]>>, source_size: Size) -> Self {
    Self {
      values: values.into(),
      source_size,
      photo_size: None,
      image: None,
    }
  }

  pub fn with_photo_size(mut self, photo_size: Option<Size>) -> Self {
    self.photo_size = photo_size;
    self
  }

  pub fn with_image(mut self, image: Option<PathBuf>) -> Self {
    self.image = image;
    self
  }

  pub fn values(&self) -> &[f32] {
    &self.values
  }

  pub fn source_size(&self) -> Size {
    self.source_size
  }

  pub fn photo_size(&self) -> Option<Size> {
    self.photo_size
  }

  /// 产生该输出的原始图像路径（若已知）
  pub fn image(&self) -> Option<&PathBuf> {
    self.image.as_ref()
  }
}

impl AsRef<[f32]> for RawOutput {
  fn as_ref(&self) -> &[f32] {
    &self.values
  }
}
