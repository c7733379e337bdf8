// 该文件是 Pinxiang （品相） 项目的一部分。
// src/input/read_image_file.rs - 图像文件输入
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

use tracing::{debug, error};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, input::ImageLoadError, url_file_path};

/// `image://<path>` 指向的单个图像文件，读取后保留原始字节
#[derive(Debug, Clone)]
pub struct ImageFileInput {
  path: PathBuf,
  bytes: Vec<u8>,
}

impl FromUrlWithScheme for ImageFileInput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for ImageFileInput {
  type Error = ImageLoadError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(ImageLoadError::SchemeMismatch(format!(
        "期望输入方式 '{}', 实际输入方式 '{}'",
        Self::SCHEME,
        url.scheme()
      )));
    }

    Self::open(url_file_path(url))
  }
}

impl ImageFileInput {
  pub fn open(path: impl Into<PathBuf>) -> Result<Self, ImageLoadError> {
    let path = path.into();
    let bytes = std::fs::read(&path)?;
    debug!("读取图像文件: {} ({} 字节)", path.display(), bytes.len());
    Ok(Self { path, bytes })
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  pub fn bytes(&self) -> &[u8] {
    &self.bytes
  }

  pub fn into_bytes(self) -> Vec<u8> {
    self.bytes
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn rejects_foreign_scheme() {
    let url = Url::parse("folder:///tmp/out").unwrap();
    assert!(matches!(
      ImageFileInput::from_url(&url),
      Err(ImageLoadError::SchemeMismatch(_))
    ));
  }

  #[test]
  fn reads_file_bytes() {
    let dir = std::env::temp_dir().join(format!("pinxiang-input-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("reference.bin");
    std::fs::write(&path, b"abc").unwrap();

    let url = Url::parse(&format!("image://{}", path.display())).unwrap();
    let input = ImageFileInput::from_url(&url).unwrap();
    assert_eq!(input.bytes(), b"abc");
    assert_eq!(input.path(), path.as_path());

    std::fs::remove_dir_all(&dir).unwrap();
  }

  #[test]
  fn missing_file_is_io_error() {
    let url = Url::parse("image:///nonexistent/pinxiang/front.jpg").unwrap();
    assert!(matches!(
      ImageFileInput::from_url(&url),
      Err(ImageLoadError::IoError(_))
    ));
  }
}
