// 该文件是 D2Go Detect 项目的一部分。
// src/model/pipeline.rs - 解码、抑制与视口映射的组合
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

use tracing::{debug, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::RawOutput,
  geometry::Size,
  model::{
    DetectResult, Model,
    decoder::{Decoder, DecoderBuilder, DecoderConfigError},
    nms::NmsStage,
    remap::ViewportRemap,
  },
  query_value,
};

/// 完整的后处理流程：解码 -> 可选 NMS -> 可选视口映射
#[derive(Debug, Clone, Default)]
pub struct DetectionPipeline {
  decoder: Decoder,
  nms: Option<NmsStage>,
  remap: Option<ViewportRemap>,
}

impl DetectionPipeline {
  pub fn decoder(&self) -> &Decoder {
    &self.decoder
  }
}

impl Model for DetectionPipeline {
  type Input = RawOutput;
  type Output = DetectResult;
  type Error = Infallible;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    let mut result = self.decoder.infer(input)?;
    if let Some(nms) = &self.nms {
      result = nms.infer(&result)?;
    }
    if let Some(remap) = &self.remap {
      result = remap.infer(&result)?;
    }
    debug!("后处理结果: {:?}", result);
    Ok(result)
  }
}

#[derive(Debug, Clone, Default)]
pub struct DetectionPipelineBuilder {
  decoder: DecoderBuilder,
  nms_threshold: Option<f32>,
  viewport: Option<Size>,
}

impl FromUrlWithScheme for DetectionPipelineBuilder {
  const SCHEME: &'static str = DecoderBuilder::SCHEME;
}

/// 解析形如 `320x480` 的尺寸
fn parse_size(value: &str) -> Option<Size> {
  let (w, h) = value.split_once('x')?;
  Some(Size::new(w.trim().parse().ok()?, h.trim().parse().ok()?))
}

impl FromUrl for DetectionPipelineBuilder {
  type Error = DecoderConfigError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    let decoder = DecoderBuilder::from_url(url)?;

    let nms_threshold = query_value(url, "nms")
      .map(|v| {
        v.parse::<f32>()
          .map_err(|_| DecoderConfigError::InvalidParameter("nms", v))
      })
      .transpose()?;

    let viewport = query_value(url, "viewport")
      .map(|v| parse_size(&v).ok_or(DecoderConfigError::InvalidParameter("viewport", v)))
      .transpose()?;

    Ok(Self {
      decoder,
      nms_threshold,
      viewport,
    })
  }
}

impl DetectionPipelineBuilder {
  pub fn decoder(mut self, decoder: DecoderBuilder) -> Self {
    self.decoder = decoder;
    self
  }

  pub fn nms(mut self, iou_threshold: Option<f32>) -> Self {
    self.nms_threshold = iou_threshold;
    self
  }

  pub fn viewport(mut self, viewport: Option<Size>) -> Self {
    self.viewport = viewport;
    self
  }

  pub fn build(self) -> Result<DetectionPipeline, DecoderConfigError> {
    let decoder = self.decoder.build()?;

    if let Some(threshold) = self.nms_threshold
      && !(0.0..=1.0).contains(&threshold)
    {
      return Err(DecoderConfigError::InvalidParameter(
        "nms",
        threshold.to_string(),
      ));
    }

    if let Some(viewport) = self.viewport
      && viewport.is_degenerate()
    {
      return Err(DecoderConfigError::InvalidParameter(
        "viewport",
        format!("{}x{}", viewport.width, viewport.height),
      ));
    }

    let class_policy = decoder.config().class_policy;
    info!(
      "后处理流程: 阈值 {}, NMS {:?}, 视口 {:?}",
      decoder.config().threshold,
      self.nms_threshold,
      self.viewport
    );

    Ok(DetectionPipeline {
      decoder,
      nms: self.nms_threshold.map(NmsStage::new),
      remap: self
        .viewport
        .map(|viewport| ViewportRemap::new(viewport).with_class_policy(class_policy)),
    })
  }
}
