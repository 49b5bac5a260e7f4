// 该文件是 D2Go Detect 项目的一部分。
// src/model.rs - 检测结果与后处理模型
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

use crate::geometry::{Rect, Size};

pub trait Model {
  type Input;
  type Output;
  type Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error>;
}

/// 解码并过滤后的单个检测
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Detection {
  pub class_index: i32,
  pub score: f32,
  pub rect: Rect,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectResult {
  /// 检测框所在坐标空间的范围（原图像素或视口）
  pub space: Size,
  pub items: Box<[Detection]>,
}

impl DetectResult {
  pub fn new(space: Size, items: impl Into<Box<[Detection]>>) -> Self {
    Self {
      space,
      items: items.into(),
    }
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  pub fn len(&self) -> usize {
    self.items.len()
  }
}

/// 类别索引的取值方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassIndexPolicy {
  /// 忽略模型的类别字段，固定输出该值
  Fixed(i32),
  /// 将记录中的类别字段视为从 1 开始的编号，输出 `classId - 1`
  FromRecord,
}

/// 单类别模型沿用的固定类别
pub const SENTINEL_CLASS_INDEX: i32 = 1;

impl Default for ClassIndexPolicy {
  fn default() -> Self {
    ClassIndexPolicy::Fixed(SENTINEL_CLASS_INDEX)
  }
}

mod decoder;
mod nms;
mod pipeline;
mod remap;

pub use self::decoder::{Decoder, DecoderBuilder, DecoderConfig, DecoderConfigError, decode};
pub use self::nms::{NmsStage, non_max_suppression};
pub use self::pipeline::{DetectionPipeline, DetectionPipelineBuilder};
pub use self::remap::{ViewportRemap, remap_to_viewport};
