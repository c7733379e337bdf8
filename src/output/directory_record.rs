// 该文件是 Pinxiang （品相） 项目的一部分。
// src/output/directory_record.rs - 目录记录输出
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use chrono::{DateTime, Datelike, Utc};
use image::RgbImage;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};
use thiserror::Error;
use tracing::info;

use crate::{FromUrl, FromUrlWithScheme, output::Render, session::View, url_file_path};

#[derive(Error, Debug)]
pub enum DirectoryRecordOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
}

/// 按日期分目录保存：`<dir>/YYYY/MM/DD/user_<view>_<YYYYmmdd_HHMMSS>-<序号>.png`
pub struct DirectoryRecordOutput {
  directory: PathBuf,
  frame_counter: Mutex<u16>,
}

impl FromUrlWithScheme for DirectoryRecordOutput {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn from_url(uri: &url::Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(DirectoryRecordOutputError::SchemeMismatch);
    }

    Ok(DirectoryRecordOutput::new(url_file_path(uri)))
  }
}

impl DirectoryRecordOutput {
  pub fn new(directory: impl Into<PathBuf>) -> Self {
    Self {
      directory: directory.into(),
      frame_counter: Mutex::new(0),
    }
  }

  fn frame_id(&self) -> u16 {
    let mut counter = self
      .frame_counter
      .lock()
      .unwrap_or_else(PoisonError::into_inner);
    *counter = counter.wrapping_add(1);
    *counter
  }

  fn frame_path(
    &self,
    view: View,
    now: DateTime<Utc>,
  ) -> Result<PathBuf, DirectoryRecordOutputError> {
    let directory = self
      .directory
      .join(now.year().to_string())
      .join(format!("{:02}", now.month()))
      .join(format!("{:02}", now.day()));
    if !directory.exists() {
      std::fs::create_dir_all(&directory)?;
    }

    let filename = format!(
      "user_{}_{}-{:04X}.png",
      view.as_str(),
      now.format("%Y%m%d_%H%M%S"),
      self.frame_id()
    );

    Ok(directory.join(filename))
  }
}

impl Render for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn render_result(&self, view: View, annotated: &RgbImage) -> Result<PathBuf, Self::Error> {
    let path = self.frame_path(view, Utc::now())?;
    annotated.save(&path)?;
    info!("记录标注图像: {}", path.display());
    Ok(path)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;

  #[test]
  fn paths_are_dated_and_unique() {
    let dir = std::env::temp_dir().join(format!("pinxiang-record-{}", std::process::id()));
    let output = DirectoryRecordOutput::new(&dir);
    let now = Utc.with_ymd_and_hms(2026, 3, 7, 9, 5, 1).unwrap();

    let first = output.frame_path(View::Front, now).unwrap();
    let second = output.frame_path(View::Front, now).unwrap();
    assert_eq!(
      first,
      dir.join("2026/03/07/user_front_20260307_090501-0001.png")
    );
    assert_ne!(first, second);

    let saved = output
      .render_result(View::Back, &RgbImage::new(3, 3))
      .unwrap();
    assert!(saved.exists());
    assert!(
      saved
        .file_name()
        .unwrap()
        .to_string_lossy()
        .starts_with("user_back_")
    );

    std::fs::remove_dir_all(&dir).unwrap();
  }
}
