//! 解析結果のテキスト表示とプレビュー保存

use crate::error::Result;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use vehicle_vision_common::{DetectionRecord, PreviewImage, ResultProjection};

/// 車種ラベル（未知のクラス名はそのまま表示）
pub fn vehicle_label(class_name: &str) -> String {
    let label = match class_name.to_lowercase().as_str() {
        "car" => "🚗 乗用車",
        "truck" => "🚚 トラック",
        "bus" => "🚌 バス",
        "motorcycle" => "🏍 バイク",
        "bicycle" => "🚲 自転車",
        _ => return format!("🚙 {}", class_name),
    };
    label.to_string()
}

/// 表示状態をテキストに変換
pub fn render(projection: &ResultProjection) -> String {
    let mut out = String::new();

    match projection {
        ResultProjection::Empty => {
            out.push_str("結果はありません\n");
        }
        ResultProjection::Pending { operation } => {
            let _ = writeln!(out, "{}を実行中...", operation);
        }
        ResultProjection::Detections { preview, rows } => {
            let _ = writeln!(out, "検出結果: {}件", rows.len());
            out.push_str(&detection_table(rows));
            push_preview_line(&mut out, preview.as_ref());
        }
        ResultProjection::NoDetections { preview } => {
            out.push_str("車両は検出されませんでした\n");
            push_preview_line(&mut out, preview.as_ref());
        }
        ResultProjection::Counts {
            preview,
            total,
            counts,
            artifact,
        } => {
            let _ = writeln!(out, "通過台数: 合計 {}台", total);
            for (class_name, count) in counts {
                let _ = writeln!(out, "  {:<14} {:>5}台", vehicle_label(class_name), count);
            }
            push_preview_line(&mut out, preview.as_ref());
            push_artifact_line(&mut out, artifact.as_deref());
        }
        ResultProjection::NoVehicles { preview, artifact } => {
            out.push_str("ラインを通過した車両はありませんでした（合計 0台）\n");
            push_preview_line(&mut out, preview.as_ref());
            push_artifact_line(&mut out, artifact.as_deref());
        }
        ResultProjection::Summary { preview, artifact } => {
            out.push_str("動画の処理が完了しました（台数情報なし）\n");
            push_preview_line(&mut out, preview.as_ref());
            push_artifact_line(&mut out, artifact.as_deref());
        }
        ResultProjection::Failed { reason } => {
            let _ = writeln!(out, "失敗: {}", reason);
        }
    }

    out
}

fn detection_table(rows: &[DetectionRecord]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "  {:>3}  {:<14} {:>7}  {:<28} {}",
        "#", "車種", "信頼度", "座標 (x1, y1, x2, y2)", "ID"
    );
    for (i, row) in rows.iter().enumerate() {
        let bbox = format!(
            "({:.0}, {:.0}, {:.0}, {:.0})",
            row.bbox.x1, row.bbox.y1, row.bbox.x2, row.bbox.y2
        );
        let tracker = row
            .tracker_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "-".to_string());
        let _ = writeln!(
            out,
            "  {:>3}  {:<14} {:>6.1}%  {:<28} {}",
            i + 1,
            vehicle_label(&row.class_name),
            row.confidence * 100.0,
            bbox,
            tracker
        );
    }
    out
}

fn push_preview_line(out: &mut String, preview: Option<&PreviewImage>) {
    if let Some(preview) = preview {
        let _ = writeln!(
            out,
            "プレビュー: {} ({} bytes)",
            preview.mime_type(),
            preview.len()
        );
    }
}

fn push_artifact_line(out: &mut String, artifact: Option<&str>) {
    match artifact {
        Some(artifact) => {
            let _ = writeln!(out, "処理済み動画: {}（ダウンロード可能）", artifact);
        }
        None => out.push_str("処理済み動画: なし\n"),
    }
}

/// プレビュー画像を保存
///
/// 拡張子が指定されていなければ画像形式から補う。
pub fn write_preview(preview: &PreviewImage, path: &Path) -> Result<PathBuf> {
    let target = if path.extension().is_some() {
        path.to_path_buf()
    } else {
        path.with_extension(preview.extension())
    };

    if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&target, preview.bytes())?;
    Ok(target)
}
