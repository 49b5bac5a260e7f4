// 该文件是 D2Go Detect 项目的一部分。
// src/labels.rs - 类别标签
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

use thiserror::Error;
use tracing::{debug, error};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, model::Detection};

/// COCO 数据集类别名称
pub const COCO_CLASSES: [&str; 80] = [
  "person",
  "bicycle",
  "car",
  "motorcycle",
  "airplane",
  "bus",
  "train",
  "truck",
  "boat",
  "traffic light",
  "fire hydrant",
  "stop sign",
  "parking meter",
  "bench",
  "bird",
  "cat",
  "dog",
  "horse",
  "sheep",
  "cow",
  "elephant",
  "bear",
  "zebra",
  "giraffe",
  "backpack",
  "umbrella",
  "handbag",
  "tie",
  "suitcase",
  "frisbee",
  "skis",
  "snowboard",
  "sports ball",
  "kite",
  "baseball bat",
  "baseball glove",
  "skateboard",
  "surfboard",
  "tennis racket",
  "bottle",
  "wine glass",
  "cup",
  "fork",
  "knife",
  "spoon",
  "bowl",
  "banana",
  "apple",
  "sandwich",
  "orange",
  "broccoli",
  "carrot",
  "hot dog",
  "pizza",
  "donut",
  "cake",
  "chair",
  "couch",
  "potted plant",
  "bed",
  "dining table",
  "toilet",
  "tv",
  "laptop",
  "mouse",
  "remote",
  "keyboard",
  "cell phone",
  "microwave",
  "oven",
  "toaster",
  "sink",
  "refrigerator",
  "book",
  "clock",
  "vase",
  "scissors",
  "teddy bear",
  "hair drier",
  "toothbrush",
];

#[derive(Error, Debug)]
pub enum LabelError {
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("未知的内置标签集: {0}")]
  UnknownBuiltin(String),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
}

/// 有序的类别名称列表，按 `class_index` 索引
#[derive(Debug, Clone, PartialEq)]
pub struct LabelSet {
  names: Vec<String>,
}

impl LabelSet {
  pub fn new(names: Vec<String>) -> Self {
    Self { names }
  }

  pub fn coco() -> Self {
    Self::new(COCO_CLASSES.iter().map(|s| s.to_string()).collect())
  }

  /// 每行一个类别名，忽略空行与首尾空白
  pub fn parse(text: &str) -> Self {
    Self::new(
      text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect(),
    )
  }

  pub fn len(&self) -> usize {
    self.names.len()
  }

  pub fn is_empty(&self) -> bool {
    self.names.is_empty()
  }

  /// 越界或负数索引返回 None
  pub fn get(&self, index: i32) -> Option<&str> {
    usize::try_from(index)
      .ok()
      .and_then(|i| self.names.get(i))
      .map(String::as_str)
  }

  pub fn label_for(&self, detection: &Detection) -> Option<&str> {
    self.get(detection.class_index)
  }
}

impl FromUrlWithScheme for LabelSet {
  const SCHEME: &'static str = "labels";
}

impl FromUrl for LabelSet {
  type Error = LabelError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(LabelError::SchemeMismatch(url.scheme().to_string()));
    }

    // labels:coco 为内置列表，其余视为文件路径
    if url.cannot_be_a_base() {
      return match url.path() {
        "coco" => Ok(Self::coco()),
        other => Err(LabelError::UnknownBuiltin(other.to_string())),
      };
    }

    let text = std::fs::read_to_string(url.path())?;
    let labels = Self::parse(&text);
    debug!("从 {} 读取 {} 个类别", url.path(), labels.len());
    Ok(labels)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parse_skips_blank_lines() {
    let labels = LabelSet::parse("__background__\n person \n\nbicycle\n");
    assert_eq!(labels.len(), 3);
    assert_eq!(labels.get(1), Some("person"));
  }

  #[test]
  fn out_of_range_index_is_none() {
    let labels = LabelSet::coco();
    assert_eq!(labels.get(0), Some("person"));
    assert_eq!(labels.get(80), None);
    assert_eq!(labels.get(-1), None);
  }

  #[test]
  fn builtin_from_url() {
    let url = Url::parse("labels:coco").unwrap();
    assert_eq!(LabelSet::from_url(&url).unwrap().len(), 80);

    let url = Url::parse("labels:voc").unwrap();
    assert!(matches!(
      LabelSet::from_url(&url),
      Err(LabelError::UnknownBuiltin(_))
    ));
  }

  #[test]
  fn file_from_url() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("classes.txt");
    std::fs::write(&path, "cat\ndog\n").unwrap();

    let url = Url::from_file_path(&path).unwrap();
    let url = Url::parse(&url.as_str().replacen("file", "labels", 1)).unwrap();
    let labels = LabelSet::from_url(&url).unwrap();
    assert_eq!(labels, LabelSet::new(vec!["cat".into(), "dog".into()]));
  }

  #[test]
  fn wrong_scheme_is_rejected() {
    let url = Url::parse("json:///tmp/labels.txt").unwrap();
    assert!(matches!(
      LabelSet::from_url(&url),
      Err(LabelError::SchemeMismatch(_))
    ));
  }
}
