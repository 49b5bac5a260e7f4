// 该文件是 D2Go Detect 项目的一部分。
// src/geometry.rs - 尺寸、矩形与等比适配
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

use serde::{Deserialize, Serialize};

/// 二维尺寸（像素）
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
  pub width: f32,
  pub height: f32,
}

impl Size {
  pub const fn new(width: f32, height: f32) -> Self {
    Self { width, height }
  }

  /// 宽高比，零高度时得到 inf 或 NaN
  pub fn aspect(&self) -> f32 {
    self.width / self.height
  }

  pub fn is_degenerate(&self) -> bool {
    self.width == 0.0 || self.height == 0.0
  }
}

/// 轴对齐矩形，左上角 + 宽高
///
/// 宽高可能为负（模型输出的角点顺序颠倒时），这里不做修正。
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
  pub x: f32,
  pub y: f32,
  pub width: f32,
  pub height: f32,
}

impl Rect {
  pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
    Self {
      x,
      y,
      width,
      height,
    }
  }

  /// 由 [left, top, right, bottom] 构造，不交换角点
  pub fn from_corners(left: f32, top: f32, right: f32, bottom: f32) -> Self {
    Self::new(left, top, right - left, bottom - top)
  }

  pub fn right(&self) -> f32 {
    self.x + self.width
  }

  pub fn bottom(&self) -> f32 {
    self.y + self.height
  }

  pub fn area(&self) -> f32 {
    self.width * self.height
  }

  /// 计算两个矩形的 IoU
  pub fn iou(&self, other: &Rect) -> f32 {
    let x1 = self.x.max(other.x);
    let y1 = self.y.max(other.y);
    let x2 = self.right().min(other.right());
    let y2 = self.bottom().min(other.bottom());

    let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    let union = self.area() + other.area() - intersection;

    if union > 0.0 {
      intersection / union
    } else {
      0.0
    }
  }
}

/// 等比适配（aspect-fit）并居中的布局参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AspectFit {
  /// 图像在视口中实际显示的尺寸
  pub display: Size,
  pub offset_x: f32,
  pub offset_y: f32,
  pub scale_x: f32,
  pub scale_y: f32,
}

impl AspectFit {
  pub fn compute(source: Size, viewport: Size) -> Self {
    let (display, offset_x, offset_y) = if source.aspect() > viewport.aspect() {
      // 宽度受限，上下留白
      let height = source.height / source.width * viewport.width;
      (
        Size::new(viewport.width, height),
        0.0,
        (viewport.height - height) * 0.5,
      )
    } else {
      // 高度受限，左右留白
      let width = source.width * viewport.height / source.height;
      (
        Size::new(width, viewport.height),
        (viewport.width - width) * 0.5,
        0.0,
      )
    };

    Self {
      display,
      offset_x,
      offset_y,
      scale_x: display.width / source.width,
      scale_y: display.height / source.height,
    }
  }

  pub fn apply(&self, rect: &Rect) -> Rect {
    Rect::new(
      rect.x * self.scale_x + self.offset_x,
      rect.y * self.scale_y + self.offset_y,
      rect.width * self.scale_x,
      rect.height * self.scale_y,
    )
  }
}

/// 推理前的缩放策略：宽度固定为模型输入宽度，高度按原图比例缩放
pub fn model_input_size(source: Size, input_width: f32, input_height: f32) -> Size {
  Size::new(input_width, input_height * source.height / source.width)
}
