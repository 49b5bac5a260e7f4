// 该文件是 D2Go Detect 项目的一部分。
// src/model/remap.rs - 检测框映射到显示视口
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

use std::convert::Infallible;

use tracing::{debug, warn};

use crate::{
  geometry::{AspectFit, Size},
  model::{ClassIndexPolicy, DetectResult, Detection, Model},
};

/// 将原图像素坐标下的检测框映射到等比适配并居中显示的视口坐标
///
/// 输出与输入等长同序。固定类别策略下类别索引再次被置为该固定值。
/// 原图尺寸为零时不做保护，结果中会出现 NaN 或 inf。
pub fn remap_to_viewport(
  detections: &[Detection],
  source: Size,
  viewport: Size,
  class_policy: ClassIndexPolicy,
) -> Vec<Detection> {
  if source.is_degenerate() {
    warn!(
      "原图尺寸退化 {}x{}，映射结果将不是有限值",
      source.width, source.height
    );
  }

  let fit = AspectFit::compute(source, viewport);
  debug!("视口适配参数: {:?}", fit);

  detections
    .iter()
    .map(|detection| Detection {
      class_index: match class_policy {
        ClassIndexPolicy::Fixed(index) => index,
        ClassIndexPolicy::FromRecord => detection.class_index,
      },
      score: detection.score,
      rect: fit.apply(&detection.rect),
    })
    .collect()
}

/// 视口映射阶段
#[derive(Debug, Clone, Copy)]
pub struct ViewportRemap {
  pub viewport: Size,
  pub class_policy: ClassIndexPolicy,
}

impl ViewportRemap {
  pub fn new(viewport: Size) -> Self {
    Self {
      viewport,
      class_policy: ClassIndexPolicy::default(),
    }
  }

  pub fn with_class_policy(mut self, class_policy: ClassIndexPolicy) -> Self {
    self.class_policy = class_policy;
    self
  }
}

impl Model for ViewportRemap {
  type Input = DetectResult;
  type Output = DetectResult;
  type Error = Infallible;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    Ok(DetectResult::new(
      self.viewport,
      remap_to_viewport(&input.items, input.space, self.viewport, self.class_policy),
    ))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::geometry::Rect;

  fn detection(rect: Rect) -> Detection {
    Detection {
      class_index: 1,
      score: 0.9,
      rect,
    }
  }

  #[test]
  fn same_aspect_scales_uniformly() {
    let items = [detection(Rect::new(10.0, 20.0, 100.0, 200.0))];
    let remapped = remap_to_viewport(
      &items,
      Size::new(640.0, 640.0),
      Size::new(320.0, 320.0),
      ClassIndexPolicy::default(),
    );
    assert_eq!(remapped, vec![detection(Rect::new(5.0, 10.0, 50.0, 100.0))]);
  }

  #[test]
  fn narrow_source_gets_horizontal_offset() {
    let items = [detection(Rect::new(0.0, 0.0, 300.0, 600.0))];
    let remapped = remap_to_viewport(
      &items,
      Size::new(300.0, 600.0),
      Size::new(400.0, 400.0),
      ClassIndexPolicy::default(),
    );
    assert_eq!(remapped[0].rect, Rect::new(100.0, 0.0, 200.0, 400.0));
  }

  #[test]
  fn wide_source_gets_vertical_offset() {
    let items = [detection(Rect::new(0.0, 0.0, 800.0, 400.0))];
    let remapped = remap_to_viewport(
      &items,
      Size::new(800.0, 400.0),
      Size::new(400.0, 400.0),
      ClassIndexPolicy::default(),
    );
    assert_eq!(remapped[0].rect, Rect::new(0.0, 100.0, 400.0, 200.0));
  }

  #[test]
  fn length_order_and_scores_are_kept() {
    let items = [
      Detection {
        class_index: 1,
        score: 0.7,
        rect: Rect::new(0.0, 0.0, 10.0, 10.0),
      },
      Detection {
        class_index: 1,
        score: 0.95,
        rect: Rect::new(20.0, 20.0, 10.0, 10.0),
      },
    ];
    let remapped = remap_to_viewport(
      &items,
      Size::new(100.0, 100.0),
      Size::new(200.0, 200.0),
      ClassIndexPolicy::default(),
    );
    let scores: Vec<f32> = remapped.iter().map(|d| d.score).collect();
    assert_eq!(scores, vec![0.7, 0.95]);
    assert_eq!(remapped[1].rect, Rect::new(40.0, 40.0, 20.0, 20.0));
  }

  #[test]
  fn fixed_policy_forces_sentinel() {
    let items = [Detection {
      class_index: 7,
      score: 0.9,
      rect: Rect::new(0.0, 0.0, 1.0, 1.0),
    }];
    let source = Size::new(10.0, 10.0);
    let viewport = Size::new(10.0, 10.0);

    let fixed = remap_to_viewport(&items, source, viewport, ClassIndexPolicy::default());
    assert_eq!(fixed[0].class_index, crate::model::SENTINEL_CLASS_INDEX);

    let kept = remap_to_viewport(&items, source, viewport, ClassIndexPolicy::FromRecord);
    assert_eq!(kept[0].class_index, 7);
  }

  #[test]
  fn zero_sized_source_is_not_guarded() {
    let items = [detection(Rect::new(1.0, 1.0, 1.0, 1.0))];
    let remapped = remap_to_viewport(
      &items,
      Size::new(0.0, 0.0),
      Size::new(320.0, 320.0),
      ClassIndexPolicy::default(),
    );
    assert_eq!(remapped.len(), 1);
    assert!(remapped[0].rect.x.is_nan());
  }

  #[test]
  fn stage_reports_viewport_space() {
    let stage = ViewportRemap::new(Size::new(320.0, 320.0));
    let input = DetectResult::new(
      Size::new(640.0, 640.0),
      vec![detection(Rect::new(10.0, 20.0, 100.0, 200.0))],
    );
    let Ok(output) = stage.infer(&input);
    assert_eq!(output.space, Size::new(320.0, 320.0));
    assert_eq!(output.items[0].rect, Rect::new(5.0, 10.0, 50.0, 100.0));
  }
}
