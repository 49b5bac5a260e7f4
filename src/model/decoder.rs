// 该文件是 D2Go Detect 项目的一部分。
// src/model/decoder.rs - 原始输出解码
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

use thiserror::Error;
use tracing::{debug, error, warn};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::{
    DEFAULT_INPUT_SIZE, FIELD_BOTTOM, FIELD_CLASS, FIELD_CONFIDENCE, FIELD_LEFT, FIELD_RIGHT,
    FIELD_TOP, RECORD_WIDTH, RawOutput,
  },
  geometry::{Rect, Size, model_input_size},
  model::{ClassIndexPolicy, DetectResult, Detection, Model},
  query_value,
};

const D2GO_OBJECT_THRESH: f32 = 0.5;

/// 解码参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecoderConfig {
  /// 模型输入尺寸
  pub input_size: Size,
  pub record_width: usize,
  /// 置信度阈值（严格大于才保留）
  pub threshold: f32,
  pub class_policy: ClassIndexPolicy,
}

impl DecoderConfig {
  /// 原图在送入模型前被缩放到的尺寸，即输出坐标所在的空间
  pub fn input_size_for(&self, photo: Size) -> Size {
    model_input_size(photo, self.input_size.width, self.input_size.height)
  }
}

impl Default for DecoderConfig {
  fn default() -> Self {
    Self {
      input_size: DEFAULT_INPUT_SIZE,
      record_width: RECORD_WIDTH,
      threshold: D2GO_OBJECT_THRESH,
      class_policy: ClassIndexPolicy::default(),
    }
  }
}

/// 将扁平的输出缓冲区解码为检测列表
///
/// 记录数按整数除法计算，尾部不完整的记录被静默忽略。只保留
/// `confidence > threshold` 的记录，输出顺序与输入记录顺序一致。
pub fn decode(values: &[f32], config: &DecoderConfig) -> Vec<Detection> {
  if config.record_width < RECORD_WIDTH {
    warn!(
      "记录宽度 {} 小于 {}，无法解码",
      config.record_width, RECORD_WIDTH
    );
    return Vec::new();
  }

  let items: Vec<Detection> = values
    .chunks_exact(config.record_width)
    .filter(|record| record[FIELD_CONFIDENCE] > config.threshold)
    .map(|record| Detection {
      class_index: match config.class_policy {
        ClassIndexPolicy::Fixed(index) => index,
        ClassIndexPolicy::FromRecord => (record[FIELD_CLASS] as i32).saturating_sub(1),
      },
      score: record[FIELD_CONFIDENCE],
      rect: Rect::from_corners(
        record[FIELD_LEFT],
        record[FIELD_TOP],
        record[FIELD_RIGHT],
        record[FIELD_BOTTOM],
      ),
    })
    .collect();

  debug!(
    "解码 {} 条记录，保留 {} 个检测",
    values.len() / config.record_width,
    items.len()
  );

  items
}

#[derive(Error, Debug)]
pub enum DecoderConfigError {
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("参数 {0} 无效: {1}")]
  InvalidParameter(&'static str, String),
}

/// 解码器
#[derive(Debug, Clone, Default)]
pub struct Decoder {
  config: DecoderConfig,
}

impl Decoder {
  pub fn new(config: DecoderConfig) -> Self {
    Self { config }
  }

  pub fn config(&self) -> &DecoderConfig {
    &self.config
  }

  pub fn decode(&self, values: &[f32]) -> Vec<Detection> {
    decode(values, &self.config)
  }

  /// 输出坐标所在的空间：只知道原图尺寸时按本解码器的输入尺寸换算
  pub fn space_for(&self, input: &RawOutput) -> Size {
    match input.photo_size() {
      Some(photo) => {
        let space = self.config.input_size_for(photo);
        debug!(
          "原图 {}x{} 对应模型输入 {}x{}",
          photo.width, photo.height, space.width, space.height
        );
        space
      }
      None => input.source_size(),
    }
  }
}

impl Model for Decoder {
  type Input = RawOutput;
  type Output = DetectResult;
  type Error = Infallible;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    Ok(DetectResult::new(
      self.space_for(input),
      self.decode(input.values()),
    ))
  }
}

#[derive(Debug, Clone, Default)]
pub struct DecoderBuilder {
  config: DecoderConfig,
}

impl FromUrlWithScheme for DecoderBuilder {
  const SCHEME: &'static str = "d2go";
}

fn parse_param<T: std::str::FromStr>(
  url: &Url,
  key: &'static str,
) -> Result<Option<T>, DecoderConfigError> {
  query_value(url, key)
    .map(|v| {
      v.parse::<T>()
        .map_err(|_| DecoderConfigError::InvalidParameter(key, v))
    })
    .transpose()
}

impl FromUrl for DecoderBuilder {
  type Error = DecoderConfigError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(DecoderConfigError::SchemeMismatch(url.scheme().to_string()));
    }

    let mut builder = DecoderBuilder::default();

    if let Some(threshold) = parse_param::<f32>(url, "threshold")? {
      builder = builder.threshold(threshold);
    }
    if let Some(record_width) = parse_param::<usize>(url, "record_width")? {
      builder = builder.record_width(record_width);
    }
    if let Some(width) = parse_param::<f32>(url, "input_width")? {
      builder.config.input_size.width = width;
    }
    if let Some(height) = parse_param::<f32>(url, "input_height")? {
      builder.config.input_size.height = height;
    }
    if let Some(class) = query_value(url, "class") {
      let policy = match class.split_once(':') {
        None if class == "record" => ClassIndexPolicy::FromRecord,
        None if class == "fixed" => ClassIndexPolicy::default(),
        Some(("fixed", index)) => index
          .parse()
          .map(ClassIndexPolicy::Fixed)
          .map_err(|_| DecoderConfigError::InvalidParameter("class", class.clone()))?,
        _ => return Err(DecoderConfigError::InvalidParameter("class", class.clone())),
      };
      builder = builder.class_policy(policy);
    }

    Ok(builder)
  }
}

impl DecoderBuilder {
  pub fn threshold(mut self, threshold: f32) -> Self {
    self.config.threshold = threshold;
    self
  }

  pub fn record_width(mut self, record_width: usize) -> Self {
    self.config.record_width = record_width;
    self
  }

  pub fn input_size(mut self, input_size: Size) -> Self {
    self.config.input_size = input_size;
    self
  }

  pub fn class_policy(mut self, class_policy: ClassIndexPolicy) -> Self {
    self.config.class_policy = class_policy;
    self
  }

  pub fn build(self) -> Result<Decoder, DecoderConfigError> {
    let config = self.config;

    if !(0.0..=1.0).contains(&config.threshold) {
      return Err(DecoderConfigError::InvalidParameter(
        "threshold",
        config.threshold.to_string(),
      ));
    }
    if config.record_width < RECORD_WIDTH {
      return Err(DecoderConfigError::InvalidParameter(
        "record_width",
        config.record_width.to_string(),
      ));
    }
    if config.input_size.is_degenerate() {
      return Err(DecoderConfigError::InvalidParameter(
        "input_size",
        format!("{}x{}", config.input_size.width, config.input_size.height),
      ));
    }

    debug!("解码器参数: {:?}", config);
    Ok(Decoder::new(config))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn records(rows: &[[f32; 6]]) -> Vec<f32> {
    rows.iter().flatten().copied().collect()
  }

  #[test]
  fn keeps_only_records_above_threshold() {
    let values = records(&[
      [10.0, 20.0, 110.0, 220.0, 0.9, 0.0],
      [0.0, 0.0, 0.0, 0.0, 0.1, 0.0],
    ]);
    let items = decode(&values, &DecoderConfig::default());

    assert_eq!(
      items,
      vec![Detection {
        class_index: 1,
        score: 0.9,
        rect: Rect::new(10.0, 20.0, 100.0, 200.0),
      }]
    );
  }

  #[test]
  fn threshold_is_strict() {
    let config = DecoderConfig::default();
    let values = records(&[
      [0.0, 0.0, 1.0, 1.0, 0.5, 0.0],
      [0.0, 0.0, 1.0, 1.0, 0.5 + f32::EPSILON, 0.0],
    ]);
    let items = decode(&values, &config);
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].score, 0.5 + f32::EPSILON);
  }

  #[test]
  fn preserves_record_order() {
    let values = records(&[
      [1.0, 0.0, 2.0, 1.0, 0.6, 3.0],
      [2.0, 0.0, 3.0, 1.0, 0.2, 3.0],
      [3.0, 0.0, 4.0, 1.0, 0.99, 3.0],
      [4.0, 0.0, 5.0, 1.0, 0.7, 3.0],
    ]);
    let xs: Vec<f32> = decode(&values, &DecoderConfig::default())
      .iter()
      .map(|d| d.rect.x)
      .collect();
    assert_eq!(xs, vec![1.0, 3.0, 4.0]);
  }

  #[test]
  fn trailing_partial_record_is_ignored() {
    let full = records(&[
      [10.0, 20.0, 110.0, 220.0, 0.9, 0.0],
      [5.0, 5.0, 6.0, 6.0, 0.8, 0.0],
    ]);
    let config = DecoderConfig::default();
    let expected = decode(&full, &config);

    for extra in 1..RECORD_WIDTH {
      let mut values = full.clone();
      values.extend(std::iter::repeat_n(0.95, extra));
      assert_eq!(decode(&values, &config), expected);
    }
  }

  #[test]
  fn empty_buffer_yields_nothing() {
    assert!(decode(&[], &DecoderConfig::default()).is_empty());
  }

  #[test]
  fn unordered_corners_give_negative_extent() {
    let values = records(&[[100.0, 100.0, 40.0, 70.0, 0.9, 0.0]]);
    let items = decode(&values, &DecoderConfig::default());
    assert_eq!(items[0].rect, Rect::new(100.0, 100.0, -60.0, -30.0));
  }

  #[test]
  fn class_field_is_ignored_by_default() {
    let values = records(&[[0.0, 0.0, 1.0, 1.0, 0.9, 17.0]]);
    assert_eq!(decode(&values, &DecoderConfig::default())[0].class_index, 1);

    let config = DecoderConfig {
      class_policy: ClassIndexPolicy::FromRecord,
      ..DecoderConfig::default()
    };
    assert_eq!(decode(&values, &config)[0].class_index, 16);
  }

  #[test]
  fn non_finite_class_field_does_not_overflow() {
    let config = DecoderConfig {
      class_policy: ClassIndexPolicy::FromRecord,
      ..DecoderConfig::default()
    };
    let values = records(&[
      [0.0, 0.0, 1.0, 1.0, 0.9, f32::NEG_INFINITY],
      [0.0, 0.0, 1.0, 1.0, 0.9, f32::NAN],
      [0.0, 0.0, 1.0, 1.0, 0.9, f32::INFINITY],
    ]);
    let classes: Vec<i32> = decode(&values, &config)
      .iter()
      .map(|d| d.class_index)
      .collect();
    assert_eq!(classes, vec![i32::MIN, -1, i32::MAX - 1]);
  }

  #[test]
  fn wider_records_use_leading_fields() {
    let config = DecoderConfig {
      record_width: 7,
      ..DecoderConfig::default()
    };
    let values = vec![
      1.0, 2.0, 3.0, 4.0, 0.9, 0.0, 42.0, //
      1.0, 2.0, 3.0, 4.0, 0.1, 0.0, 42.0,
    ];
    let items = decode(&values, &config);
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].rect, Rect::new(1.0, 2.0, 2.0, 2.0));
  }

  #[test]
  fn narrow_record_width_decodes_nothing() {
    let config = DecoderConfig {
      record_width: 4,
      ..DecoderConfig::default()
    };
    assert!(decode(&[0.0, 0.0, 1.0, 1.0, 0.9, 0.0], &config).is_empty());
  }

  #[test]
  fn input_size_follows_photo_aspect() {
    let config = DecoderConfig::default();
    let size = config.input_size_for(Size::new(3024.0, 4032.0));
    assert_eq!(size.width, 640.0);
    assert!((size.height - 853.333).abs() < 1e-2);
  }

  #[test]
  fn builder_from_url() {
    let url = Url::parse("d2go:?threshold=0.25&record_width=7&class=record").unwrap();
    let decoder = DecoderBuilder::from_url(&url).unwrap().build().unwrap();
    assert_eq!(decoder.config().threshold, 0.25);
    assert_eq!(decoder.config().record_width, 7);
    assert_eq!(decoder.config().class_policy, ClassIndexPolicy::FromRecord);

    let url = Url::parse("d2go:?class=fixed:3").unwrap();
    let decoder = DecoderBuilder::from_url(&url).unwrap().build().unwrap();
    assert_eq!(decoder.config().class_policy, ClassIndexPolicy::Fixed(3));
    assert_eq!(decoder.config().threshold, 0.5);
  }

  #[test]
  fn builder_rejects_bad_parameters() {
    let bad = [
      "d2go:?threshold=abc",
      "d2go:?class=softmax",
      "onnx:///model.onnx",
    ];
    for raw in bad {
      let url = Url::parse(raw).unwrap();
      assert!(DecoderBuilder::from_url(&url).is_err(), "{raw}");
    }

    assert!(DecoderBuilder::default().threshold(1.5).build().is_err());
    assert!(DecoderBuilder::default().record_width(5).build().is_err());
  }

  #[test]
  fn photo_size_is_resolved_with_configured_input_size() {
    let raw = RawOutput::new(
      records(&[[0.0, 0.0, 10.0, 10.0, 0.9, 0.0]]),
      Size::new(640.0, 480.0),
    )
    .with_photo_size(Some(Size::new(1280.0, 960.0)));

    let Ok(result) = Decoder::default().infer(&raw);
    assert_eq!(result.space, Size::new(640.0, 480.0));

    let url = Url::parse("d2go:?input_width=320&input_height=320").unwrap();
    let decoder = DecoderBuilder::from_url(&url).unwrap().build().unwrap();
    let Ok(result) = decoder.infer(&raw);
    assert_eq!(result.space, Size::new(320.0, 240.0));
  }

  #[test]
  fn decoder_keeps_source_space() {
    let decoder = Decoder::default();
    let raw = RawOutput::new(
      records(&[[10.0, 20.0, 110.0, 220.0, 0.9, 0.0]]),
      Size::new(640.0, 480.0),
    );
    let Ok(result) = decoder.infer(&raw);
    assert_eq!(result.space, Size::new(640.0, 480.0));
    assert_eq!(result.len(), 1);
  }
}
