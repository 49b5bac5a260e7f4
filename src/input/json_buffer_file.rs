// 该文件是 D2Go Detect 项目的一部分。
// src/input/json_buffer_file.rs - JSON 格式的缓冲区文件
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

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::{
  frame::{DEFAULT_INPUT_SIZE, RawOutput},
  geometry::{Size, model_input_size},
  input::{BufferFormat, BufferParams},
};

#[derive(Error, Debug)]
pub enum JsonBufferError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("JSON 解析错误: {0}")]
  ParseError(#[from] serde_json::Error),
}

/// ```json
/// {"image_size": [640, 480], "outputs": [10, 20, 110, 220, 0.9, 0], "image": "photo.jpg"}
/// ```
///
/// `image_size` 为输出坐标所在的模型输入空间；只知道原图尺寸时可以给出
/// `photo_size`，按模型的缩放方式换算。也接受直接的数值数组。
#[derive(Deserialize, Debug)]
#[serde(untagged)]
enum JsonBufferDocument {
  Full {
    image_size: Option<[f32; 2]>,
    photo_size: Option<[f32; 2]>,
    outputs: Vec<f32>,
    image: Option<PathBuf>,
  },
  Bare(Vec<f32>),
}

pub struct JsonBuffer;

impl BufferFormat for JsonBuffer {
  type Error = JsonBufferError;
  const SCHEME: &'static str = "json";
  const EXTENSION: &'static str = "json";

  fn read(path: &Path, params: &BufferParams) -> Result<RawOutput, Self::Error> {
    let text = std::fs::read_to_string(path)?;
    let document: JsonBufferDocument = serde_json::from_str(&text)?;

    let (values, size, photo, image) = match document {
      JsonBufferDocument::Full {
        image_size,
        photo_size,
        outputs,
        image,
      } => {
        let size = image_size.map(|[w, h]| Size::new(w, h));
        // image_size 优先，给出时不再按原图换算
        let photo = photo_size
          .filter(|_| size.is_none())
          .map(|[w, h]| Size::new(w, h));
        // 相对路径以 JSON 文件所在目录为基准
        let image = image.map(|p| match path.parent() {
          Some(parent) if p.is_relative() => parent.join(p),
          _ => p,
        });
        (outputs, size, photo, image)
      }
      JsonBufferDocument::Bare(outputs) => (outputs, None, None, None),
    };

    let size = size
      .or_else(|| {
        photo.map(|p| model_input_size(p, DEFAULT_INPUT_SIZE.width, DEFAULT_INPUT_SIZE.height))
      })
      .or(params.size)
      .unwrap_or(DEFAULT_INPUT_SIZE);
    let image = image.or_else(|| params.image.clone());
    Ok(
      RawOutput::new(values, size)
        .with_photo_size(photo)
        .with_image(image),
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn full_document() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.json");
    std::fs::write(
      &path,
      r#"{"image_size": [640, 480], "outputs": [10, 20, 110, 220, 0.9, 0], "image": "photo.jpg"}"#,
    )
    .unwrap();

    let raw = JsonBuffer::read(&path, &BufferParams::default()).unwrap();
    assert_eq!(raw.values(), &[10.0, 20.0, 110.0, 220.0, 0.9, 0.0]);
    assert_eq!(raw.source_size(), Size::new(640.0, 480.0));
    assert_eq!(raw.image(), Some(&dir.path().join("photo.jpg")));
  }

  #[test]
  fn bare_array_uses_query_size() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.json");
    std::fs::write(&path, "[1, 2, 3, 4, 0.7, 1, 9]").unwrap();

    let params = BufferParams {
      size: Some(Size::new(320.0, 240.0)),
      image: None,
    };
    let raw = JsonBuffer::read(&path, &params).unwrap();
    assert_eq!(raw.values().len(), 7);
    assert_eq!(raw.photo_size(), None);
    assert_eq!(raw.source_size(), Size::new(320.0, 240.0));
  }

  #[test]
  fn photo_size_is_scaled_to_model_input() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.json");
    std::fs::write(&path, r#"{"photo_size": [1280, 960], "outputs": []}"#).unwrap();

    let raw = JsonBuffer::read(&path, &BufferParams::default()).unwrap();
    assert_eq!(raw.source_size(), Size::new(640.0, 480.0));
    assert_eq!(raw.photo_size(), Some(Size::new(1280.0, 960.0)));
    assert!(raw.values().is_empty());
  }

  #[test]
  fn image_size_wins_over_photo_size() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.json");
    std::fs::write(
      &path,
      r#"{"image_size": [320, 320], "photo_size": [1280, 960], "outputs": []}"#,
    )
    .unwrap();

    let raw = JsonBuffer::read(&path, &BufferParams::default()).unwrap();
    assert_eq!(raw.source_size(), Size::new(320.0, 320.0));
    assert_eq!(raw.photo_size(), None);
  }

  #[test]
  fn malformed_document_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.json");
    std::fs::write(&path, r#"{"outputs": "nope"}"#).unwrap();

    assert!(matches!(
      JsonBuffer::read(&path, &BufferParams::default()),
      Err(JsonBufferError::ParseError(_))
    ));
  }
}
