// 该文件是 D2Go Detect 项目的一部分。
// src/task.rs - 任务执行
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

use std::{
  sync::mpsc,
  time::{Duration, Instant},
};
use tracing::{info, warn};

use crate::{model::Model, output::Render};

/// 任务执行统计
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskReport {
  /// 处理的输入数
  pub frames: usize,
  /// 后处理总耗时（不含输出）
  pub elapsed: Duration,
}

impl TaskReport {
  pub fn average(&self) -> Option<Duration> {
    u32::try_from(self.frames)
      .ok()
      .filter(|&n| n > 0)
      .map(|n| self.elapsed / n)
  }
}

pub trait Task<I, M, O>: Sized {
  type Error;
  fn run_task(self, input: I, model: M, output: O) -> Result<TaskReport, Self::Error>;
}

/// 只处理第一个输入
pub struct OneShotTask;

impl<
  F,
  D,
  ME: std::error::Error + Sync + Send + 'static,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = F>,
  M: Model<Input = F, Output = D, Error = ME>,
  O: Render<F, D, Error = RE>,
> Task<I, M, O> for OneShotTask
{
  type Error = anyhow::Error;

  fn run_task(self, mut input: I, model: M, output: O) -> Result<TaskReport, Self::Error> {
    info!("开始任务...");
    let frame = input.next().ok_or_else(|| anyhow::anyhow!("没有输入缓冲区"))?;
    let now = Instant::now();
    let result = model.infer(&frame)?;
    let elapsed = now.elapsed();
    info!("后处理完成，耗时: {:.2?}", elapsed);
    output.render_result(&frame, &result)?;
    info!("输出完成");

    Ok(TaskReport { frames: 1, elapsed })
  }
}

/// 对同一个输入重复处理，统计平均耗时
pub struct RepeatShotTask {
  repeat: usize,
}

impl Default for RepeatShotTask {
  fn default() -> Self {
    Self { repeat: 1000 }
  }
}

impl RepeatShotTask {
  pub fn with_repeat(mut self, repeat: usize) -> Self {
    self.repeat = repeat.max(1);
    self
  }
}

impl<
  F,
  D,
  ME: std::error::Error + Sync + Send + 'static,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = F>,
  M: Model<Input = F, Output = D, Error = ME>,
  O: Render<F, D, Error = RE>,
> Task<I, M, O> for RepeatShotTask
{
  type Error = anyhow::Error;

  fn run_task(self, mut input: I, model: M, output: O) -> Result<TaskReport, Self::Error> {
    info!("开始任务，重复 {} 次...", self.repeat);
    let frame = input.next().ok_or_else(|| anyhow::anyhow!("没有输入缓冲区"))?;

    let mut times = Vec::with_capacity(self.repeat);
    let mut last = None;
    for i in 0..self.repeat {
      let now = Instant::now();
      let result = model.infer(&frame)?;
      let elapsed = now.elapsed();
      tracing::debug!("({})后处理完成，耗时: {:.2?}", i, elapsed);
      times.push(elapsed);
      last = Some(result);
    }

    if let Some(result) = last {
      output.render_result(&frame, &result)?;
    }

    // 前两次视为预热
    let warm = if times.len() > 2 { &times[2..] } else { &times[..] };
    let report = TaskReport {
      frames: warm.len(),
      elapsed: warm.iter().sum(),
    };
    if let Some(average) = report.average() {
      warn!("平均后处理时间: {:.2?}", average);
    }

    Ok(report)
  }
}

/// 依次处理所有输入，直到输入耗尽、达到帧数上限或收到 Ctrl-C
#[derive(Default, Debug)]
pub struct ContinuousTask {
  frame_number: Option<usize>,
}

impl ContinuousTask {
  pub fn with_frame_number(mut self, frame_number: Option<usize>) -> Self {
    self.frame_number = frame_number;
    self
  }
}

impl<
  F,
  D,
  ME: std::error::Error + Sync + Send + 'static,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = F>,
  M: Model<Input = F, Output = D, Error = ME>,
  O: Render<F, D, Error = RE>,
> Task<I, M, O> for ContinuousTask
{
  type Error = anyhow::Error;

  fn run_task(self, input: I, model: M, output: O) -> Result<TaskReport, Self::Error> {
    info!("开始任务...");
    let (tx, rx) = mpsc::channel();

    if let Err(e) = ctrlc::set_handler(move || {
      info!("收到中断信号，准备退出...");
      let _ = tx.send(());
    }) {
      warn!("无法设置 Ctrl-C 处理函数: {}", e);
    }

    let mut report = TaskReport::default();
    for frame in input {
      report.frames += 1;
      info!("处理第 {} 个缓冲区", report.frames);
      let now = Instant::now();
      let result = model.infer(&frame)?;
      let elapsed = now.elapsed();
      report.elapsed += elapsed;
      output.render_result(&frame, &result)?;
      info!("后处理完成，耗时: {:.2?}", elapsed);

      if self.frame_number.is_some_and(|n| report.frames >= n) {
        info!("达到指定帧数 {}, 退出任务循环", report.frames);
        break;
      }
      if rx.try_recv().is_ok() {
        warn!("中断信号接收，退出任务循环");
        break;
      }
    }

    info!("任务完成，共处理 {} 个缓冲区", report.frames);
    Ok(report)
  }
}
