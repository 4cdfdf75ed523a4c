//! 入力ファイルの読み込み

use crate::error::{Result, VisionError};
use std::path::Path;
use vehicle_vision_common::Subject;

/// パスから `Subject` を作る
///
/// `mime` はファイル選択時に宣言されたContent-Type。なければ拡張子で判定される。
pub fn load_subject(path: &Path, mime: Option<&str>) -> Result<Subject> {
    if !path.is_file() {
        return Err(VisionError::FileNotFound(path.display().to_string()));
    }

    let bytes = std::fs::read(path)?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());

    Ok(Subject::new(name, mime.map(str::to_string), bytes))
}

/// 複数パスをまとめて読み込む（件数チェックは呼び出し側）
pub fn load_subjects(paths: &[impl AsRef<Path>], mime: Option<&str>) -> Result<Vec<Subject>> {
    paths
        .iter()
        .map(|path| load_subject(path.as_ref(), mime))
        .collect()
}
