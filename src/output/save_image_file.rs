// 该文件是 D2Go Detect 项目的一部分。
// src/output/save_image_file.rs - 保存图像文件
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

use image::{DynamicImage, RgbaImage};
use thiserror::Error;
use tracing::warn;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::RawOutput,
  model::DetectResult,
  output::{
    Render,
    draw::{Draw, DrawError},
  },
};

pub struct SaveImageFileOutput {
  path: String,
  draw: Draw,
}

#[derive(Error, Debug)]
pub enum SaveImageFileError {
  #[error("I/O 错误: {0}")]
  IoError(std::io::Error),
  #[error("图像错误: {0}")]
  ImageError(image::ImageError),
  #[error("绘制错误: {0}")]
  DrawError(#[from] DrawError),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

impl FromUrlWithScheme for SaveImageFileOutput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for SaveImageFileOutput {
  type Error = SaveImageFileError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(SaveImageFileError::SchemeMismatch(format!(
        "期望保存方式 '{}', 实际保存方式 '{}'",
        Self::SCHEME,
        uri.scheme()
      )));
    }

    Ok(SaveImageFileOutput {
      path: uri.path().to_string(),
      draw: Draw::default(),
    })
  }
}

/// 去掉透明通道后保存，JPEG 不支持 RGBA
pub(crate) fn save_rgb(image: RgbaImage, path: &Path) -> Result<(), SaveImageFileError> {
  if let Some(parent) = path.parent()
    && !parent.as_os_str().is_empty()
  {
    std::fs::create_dir_all(parent).map_err(SaveImageFileError::IoError)?;
  }

  DynamicImage::ImageRgba8(image)
    .to_rgb8()
    .save(path)
    .map_err(SaveImageFileError::ImageError)
}

impl Render<RawOutput, DetectResult> for SaveImageFileOutput {
  type Error = SaveImageFileError;

  fn render_result(&self, frame: &RawOutput, result: &DetectResult) -> Result<(), Self::Error> {
    let image = self.draw.render(frame, result)?;
    save_rgb(image, Path::new(&self.path))?;
    warn!("保存图像到文件: {}", self.path);
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::geometry::{Rect, Size};
  use crate::model::Detection;

  #[test]
  fn draws_over_source_image() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("photo.png");
    image::RgbImage::from_pixel(64, 32, image::Rgb([0, 0, 255]))
      .save(&source)
      .unwrap();

    let target = dir.path().join("out").join("result.png");
    let url = Url::from_file_path(&target).unwrap();
    let url = Url::parse(&url.as_str().replacen("file", "image", 1)).unwrap();
    let output = SaveImageFileOutput::from_url(&url).unwrap();

    let frame = RawOutput::new(vec![], Size::new(64.0, 32.0)).with_image(Some(source));
    let result = DetectResult::new(
      Size::new(128.0, 128.0),
      vec![Detection {
        class_index: 1,
        score: 0.9,
        rect: Rect::new(10.0, 40.0, 20.0, 20.0),
      }],
    );
    output.render_result(&frame, &result).unwrap();

    let saved = image::open(&target).unwrap().to_rgb8();
    assert_eq!(saved.dimensions(), (128, 128));
    // 64x32 等比放入 128x128：上下各留 32 像素
    assert_eq!(*saved.get_pixel(100, 10), image::Rgb([0, 0, 0]));
    let inside = saved.get_pixel(100, 64);
    assert!(inside[2] > 200 && inside[0] < 50);
    assert_eq!(*saved.get_pixel(10, 40), image::Rgb([255, 255, 0]));
  }
}
