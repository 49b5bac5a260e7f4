// 该文件是 D2Go Detect 项目的一部分。
// src/bin/simple_continueshot.rs - 连续后处理
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

use anyhow::Result;
use clap::Parser;
use url::Url;

use d2go_detect::{
  FromUrl,
  input::InputWrapper,
  labels::LabelSet,
  model::DetectionPipelineBuilder,
  output::OutputWrapper,
  task::{ContinuousTask, Task},
};
use tracing::info;

/// D2Go Detect 参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 后处理参数
  #[arg(long, value_name = "PIPELINE", default_value = "d2go:")]
  pub pipeline: Url,
  /// 输入来源，路径为目录时依次处理其中的文件
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 输出路径
  #[arg(long, value_name = "OUTPUT", default_value = "stdout:")]
  pub output: Url,
  /// 类别标签
  #[arg(long, value_name = "LABELS")]
  pub labels: Option<Url>,

  #[arg(long, value_name = "FRAME_NUMBER")]
  pub frame_number: Option<usize>,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("后处理参数: {}", args.pipeline);
  info!("输入来源: {}", args.input);
  info!("输出路径: {}", args.output);

  let labels = args.labels.as_ref().map(LabelSet::from_url).transpose()?;
  let input = InputWrapper::from_url(&args.input)?;
  let pipeline = DetectionPipelineBuilder::from_url(&args.pipeline)?.build()?;
  let output = OutputWrapper::from_url(&args.output)?.with_labels(labels);

  let report = ContinuousTask::default()
    .with_frame_number(args.frame_number)
    .run_task(input, pipeline, output)?;

  if let Some(average) = report.average() {
    info!("共 {} 个缓冲区，平均耗时 {:.2?}", report.frames, average);
  }

  Ok(())
}
