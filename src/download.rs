//! 処理済み動画のダウンロード
//!
//! 取得したバイト列は保存先ディレクトリ内の一時ファイルに書き込み、
//! 書き込み完了後に最終ファイル名へリネームする。一時ファイルは
//! `NamedTempFile` のDropで削除されるため、どの経路で抜けても残らない。
//!
//! 既存のファイルは上書きしない。同名がある場合は `name (1).mp4` のように
//! 番号付きの名前で保存する。

use crate::client::AnalysisService;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use vehicle_vision_common::{artifact_file_name, Error, Result};

const TEMP_PREFIX: &str = ".vehicle-vision-";
const TEMP_SUFFIX: &str = ".part";
/// 番号付きの別名を試す上限
const MAX_RENAME_ATTEMPTS: u32 = 100;

#[derive(Debug, Clone)]
pub struct DownloadCoordinator {
    dest_dir: PathBuf,
}

impl DownloadCoordinator {
    pub fn new(dest_dir: impl Into<PathBuf>) -> Self {
        Self {
            dest_dir: dest_dir.into(),
        }
    }

    pub fn dest_dir(&self) -> &Path {
        &self.dest_dir
    }

    /// 成果物を取得して保存し、保存先パスを返す
    pub async fn download<S: AnalysisService>(&self, service: &S, reference: &str) -> Result<PathBuf> {
        let file_name = artifact_file_name(reference).ok_or(Error::NoArtifact)?;

        let bytes = service.fetch_artifact(reference).await?;
        debug!(reference, bytes = bytes.len(), "成果物を取得");

        self.save(file_name, &bytes)
    }

    /// バイト列を `dest_dir/file_name` に保存（既存ファイルは上書きしない）
    pub fn save(&self, file_name: &str, bytes: &[u8]) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dest_dir)?;

        let mut staged = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .suffix(TEMP_SUFFIX)
            .tempfile_in(&self.dest_dir)?;
        staged.write_all(bytes)?;
        staged.as_file().sync_all()?;

        for attempt in 0..=MAX_RENAME_ATTEMPTS {
            let target = self.dest_dir.join(numbered_name(file_name, attempt));
            match staged.persist_noclobber(&target) {
                Ok(_) => {
                    if attempt > 0 {
                        warn!(
                            requested = file_name,
                            path = %target.display(),
                            "同名のファイルがあるため別名で保存"
                        );
                    }
                    info!(path = %target.display(), "成果物を保存");
                    return Ok(target);
                }
                Err(e) if e.error.kind() == ErrorKind::AlreadyExists => staged = e.file,
                Err(e) => return Err(Error::Io(e.error)),
            }
        }

        Err(Error::Io(std::io::Error::new(
            ErrorKind::AlreadyExists,
            format!("{} と同名のファイルが多すぎます", file_name),
        )))
    }
}

/// `out.mp4` → `out (n).mp4`（n = 0 はそのまま）
fn numbered_name(file_name: &str, n: u32) -> String {
    if n == 0 {
        return file_name.to_string();
    }
    let path = Path::new(file_name);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_name.to_string());
    match path.extension() {
        Some(ext) => format!("{} ({}).{}", stem, n, ext.to_string_lossy()),
        None => format!("{} ({})", stem, n),
    }
}

/// 保存先に残った一時ファイル数（診断用）
pub fn leftover_temp_files(dir: &Path) -> usize {
    std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .flatten()
                .filter(|entry| {
                    let name = entry.file_name();
                    let name = name.to_string_lossy();
                    name.starts_with(TEMP_PREFIX) && name.ends_with(TEMP_SUFFIX)
                })
                .count()
        })
        .unwrap_or(0)
}
