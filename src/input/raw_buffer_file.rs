// 该文件是 D2Go Detect 项目的一部分。
// src/input/raw_buffer_file.rs - 小端 f32 二进制缓冲区文件
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

use thiserror::Error;
use tracing::warn;

use crate::{
  frame::RawOutput,
  geometry::Size,
  input::{BufferFormat, BufferParams},
};

const F32_BYTES: usize = std::mem::size_of::<f32>();

#[derive(Error, Debug)]
pub enum RawBufferError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("缺少尺寸参数，需要 ?width=W&height=H")]
  MissingSize,
}

/// 推理引擎直接导出的张量内存
pub struct RawBuffer;

impl BufferFormat for RawBuffer {
  type Error = RawBufferError;
  const SCHEME: &'static str = "raw";
  const EXTENSION: &'static str = "bin";

  fn read(path: &Path, params: &BufferParams) -> Result<RawOutput, Self::Error> {
    let size: Size = params.size.ok_or(RawBufferError::MissingSize)?;
    let bytes = std::fs::read(path)?;

    if bytes.len() % F32_BYTES != 0 {
      warn!(
        "{} 的长度 {} 不是 {} 的整数倍，忽略尾部字节",
        path.display(),
        bytes.len(),
        F32_BYTES
      );
    }

    let values: Vec<f32> = bytes
      .chunks_exact(F32_BYTES)
      .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
      .collect();

    Ok(RawOutput::new(values, size).with_image(params.image.clone()))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn write_f32(path: &Path, values: &[f32]) {
    let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
    std::fs::write(path, bytes).unwrap();
  }

  #[test]
  fn reads_little_endian_values() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.bin");
    write_f32(&path, &[10.0, 20.0, 110.0, 220.0, 0.9, 0.0]);

    let params = BufferParams {
      size: Some(Size::new(640.0, 640.0)),
      image: None,
    };
    let raw = RawBuffer::read(&path, &params).unwrap();
    assert_eq!(raw.values(), &[10.0, 20.0, 110.0, 220.0, 0.9, 0.0]);
  }

  #[test]
  fn trailing_bytes_are_dropped() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.bin");
    let mut bytes: Vec<u8> = [1.0f32, 2.0].iter().flat_map(|v| v.to_le_bytes()).collect();
    bytes.push(0xff);
    std::fs::write(&path, bytes).unwrap();

    let params = BufferParams {
      size: Some(Size::new(1.0, 1.0)),
      image: None,
    };
    assert_eq!(RawBuffer::read(&path, &params).unwrap().values(), &[1.0, 2.0]);
  }

  #[test]
  fn size_is_required() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.bin");
    write_f32(&path, &[0.0; 6]);

    assert!(matches!(
      RawBuffer::read(&path, &BufferParams::default()),
      Err(RawBufferError::MissingSize)
    ));
  }
}
