// 该文件是 D2Go Detect 项目的一部分。
// src/model/nms.rs - 可选的非极大值抑制
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

use tracing::debug;

use crate::model::{DetectResult, Detection, Model};

/// 贪心非极大值抑制，只在同类别内比较 IoU
///
/// 输出按置信度降序排列。解码器本身不做抑制，只有显式启用该阶段时才会调用。
pub fn non_max_suppression(detections: &[Detection], iou_threshold: f32) -> Vec<Detection> {
  let mut candidates = detections.to_vec();
  candidates.sort_by(|a, b| b.score.total_cmp(&a.score));

  let mut kept: Vec<Detection> = Vec::with_capacity(candidates.len());
  for candidate in candidates {
    let suppressed = kept.iter().any(|best| {
      best.class_index == candidate.class_index && best.rect.iou(&candidate.rect) >= iou_threshold
    });
    if !suppressed {
      kept.push(candidate);
    }
  }

  debug!("NMS: {} -> {}", detections.len(), kept.len());
  kept
}

#[derive(Debug, Clone, Copy)]
pub struct NmsStage {
  pub iou_threshold: f32,
}

impl NmsStage {
  pub fn new(iou_threshold: f32) -> Self {
    Self { iou_threshold }
  }
}

impl Model for NmsStage {
  type Input = DetectResult;
  type Output = DetectResult;
  type Error = Infallible;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    Ok(DetectResult::new(
      input.space,
      non_max_suppression(&input.items, self.iou_threshold),
    ))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::geometry::Rect;

  fn det(class_index: i32, score: f32, x: f32) -> Detection {
    Detection {
      class_index,
      score,
      rect: Rect::new(x, 0.0, 10.0, 10.0),
    }
  }

  #[test]
  fn overlapping_boxes_of_same_class_are_suppressed() {
    let items = [det(1, 0.6, 1.0), det(1, 0.9, 0.0), det(1, 0.8, 50.0)];
    let kept = non_max_suppression(&items, 0.45);
    assert_eq!(kept, vec![det(1, 0.9, 0.0), det(1, 0.8, 50.0)]);
  }

  #[test]
  fn different_classes_do_not_suppress_each_other() {
    let items = [det(1, 0.9, 0.0), det(2, 0.8, 0.0)];
    assert_eq!(non_max_suppression(&items, 0.45).len(), 2);
  }

  #[test]
  fn nan_scores_do_not_break_ordering() {
    let items = [det(1, f32::NAN, 0.0), det(1, 0.7, 50.0), det(1, 0.9, 100.0)];
    let kept = non_max_suppression(&items, 0.45);
    assert_eq!(kept.len(), 3);
    assert_eq!(kept[1].score, 0.9);
    assert_eq!(kept[2].score, 0.7);
  }

  #[test]
  fn empty_input() {
    assert!(non_max_suppression(&[], 0.5).is_empty());
  }
}
