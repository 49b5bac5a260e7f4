// 该文件是 D2Go Detect 项目的一部分。
// src/output/draw.rs - 目标检测结果可视化
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

use image::{ImageReader, Pixel, Rgba, RgbaImage, imageops::FilterType};
use imageproc::{drawing::draw_hollow_rect_mut, rect::Rect as DrawRect};
use thiserror::Error;
use tracing::debug;

use crate::{
  frame::RawOutput,
  geometry::{AspectFit, Size},
  model::{DetectResult, Detection},
};

// 半透明红色填充，黄色 2 像素边框
const FILL_COLOR: [u8; 4] = [255, 0, 0, 51];
const OUTLINE_COLOR: [u8; 4] = [255, 255, 0, 255];
const OUTLINE_THICKNESS: i32 = 2;
const BACKGROUND_COLOR: [u8; 4] = [0, 0, 0, 255];

#[derive(Error, Debug)]
pub enum DrawError {
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("画布尺寸无效: {0}x{1}")]
  InvalidCanvas(f32, f32),
}

pub struct Draw {
  fill: Rgba<u8>,
  outline: Rgba<u8>,
  background: Rgba<u8>,
}

impl Default for Draw {
  fn default() -> Self {
    Self {
      fill: Rgba(FILL_COLOR),
      outline: Rgba(OUTLINE_COLOR),
      background: Rgba(BACKGROUND_COLOR),
    }
  }
}

fn to_pixels(value: f32) -> u32 {
  value.round().max(0.0) as u32
}

impl Draw {
  /// 按显示方式生成画布：原图等比缩放后居中放入 `space`
  ///
  /// 没有原图时只生成背景色画布。
  pub fn compose(&self, frame: &RawOutput, space: Size) -> Result<RgbaImage, DrawError> {
    let (width, height) = (to_pixels(space.width), to_pixels(space.height));
    if width == 0 || height == 0 {
      return Err(DrawError::InvalidCanvas(space.width, space.height));
    }

    let mut canvas = RgbaImage::from_pixel(width, height, self.background);

    if let Some(path) = frame.image() {
      let image = ImageReader::open(path)?.decode()?.to_rgba8();
      let fit = AspectFit::compute(frame.source_size(), space);
      let (display_w, display_h) = (
        to_pixels(fit.display.width).max(1),
        to_pixels(fit.display.height).max(1),
      );
      debug!(
        "合成画布 {}x{}，图像显示为 {}x{}",
        width, height, display_w, display_h
      );
      let resized = image::imageops::resize(&image, display_w, display_h, FilterType::Triangle);
      image::imageops::overlay(
        &mut canvas,
        &resized,
        fit.offset_x.round() as i64,
        fit.offset_y.round() as i64,
      );
    }

    Ok(canvas)
  }

  /// 在画布上绘制检测框，角点颠倒的框按实际覆盖区域绘制
  pub fn draw_detections(&self, canvas: &mut RgbaImage, detections: &[Detection]) {
    let (cw, ch) = (canvas.width() as i32, canvas.height() as i32);

    for detection in detections {
      let rect = detection.rect;
      if ![rect.x, rect.y, rect.width, rect.height]
        .iter()
        .all(|v| v.is_finite())
      {
        continue;
      }

      let x_min = (rect.x.min(rect.right()).floor() as i32).clamp(0, cw);
      let y_min = (rect.y.min(rect.bottom()).floor() as i32).clamp(0, ch);
      let x_max = (rect.x.max(rect.right()).ceil() as i32).clamp(0, cw);
      let y_max = (rect.y.max(rect.bottom()).ceil() as i32).clamp(0, ch);

      if x_min >= x_max || y_min >= y_max {
        continue;
      }

      for y in y_min..y_max {
        for x in x_min..x_max {
          canvas.get_pixel_mut(x as u32, y as u32).blend(&self.fill);
        }
      }

      for t in 0..OUTLINE_THICKNESS {
        let w = x_max - x_min - 2 * t;
        let h = y_max - y_min - 2 * t;
        if w <= 0 || h <= 0 {
          break;
        }
        let outline = DrawRect::at(x_min + t, y_min + t).of_size(w as u32, h as u32);
        draw_hollow_rect_mut(canvas, outline, self.outline);
      }
    }
  }

  pub fn render(&self, frame: &RawOutput, result: &DetectResult) -> Result<RgbaImage, DrawError> {
    let mut canvas = self.compose(frame, result.space)?;
    self.draw_detections(&mut canvas, &result.items);
    Ok(canvas)
  }
}
