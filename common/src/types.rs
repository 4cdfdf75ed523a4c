//! 解析結果の型定義
//!
//! CLIと各フロントエンドで共有される型:
//! - DetectionRecord: バウンディングボックス1件の観測
//! - DetectionResult: 単一フレーム解析の正規化結果
//! - TrackingResult: 追跡・カウント解析の正規化結果
//! - AnalysisResult: 上記2種のタグ付きユニオン

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

/// 車種ごとの台数（キーの昇順で表示順が安定する）
pub type VehicleCounts = BTreeMap<String, u64>;

/// バウンディングボックス（x1, y1, x2, y2 の順で固定）
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundingBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl BoundingBox {
    /// `[x1, y1, x2, y2]` から生成（要素数が4でなければNone）
    pub fn from_slice(coords: &[f64]) -> Option<Self> {
        match coords {
            [x1, y1, x2, y2] => Some(Self {
                x1: *x1,
                y1: *y1,
                x2: *x2,
                y2: *y2,
            }),
            _ => None,
        }
    }

    pub fn width(&self) -> f64 {
        (self.x2 - self.x1).abs()
    }

    pub fn height(&self) -> f64 {
        (self.y2 - self.y1).abs()
    }
}

/// 検出1件
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionRecord {
    pub class_name: String,
    /// 信頼度 (0.0-1.0)
    pub confidence: f64,
    pub bbox: BoundingBox,
    /// 追跡ID（追跡を行う解析のみ）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracker_id: Option<u64>,
}

/// サーバーが描画したプレビュー画像
#[derive(Clone, PartialEq, Eq)]
pub struct PreviewImage {
    bytes: Vec<u8>,
}

impl PreviewImage {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Base64テキスト（`data:` URL形式も可）からデコード
    pub fn from_base64(text: &str) -> Result<Self, base64::DecodeError> {
        let payload = match text.split_once("base64,") {
            Some((prefix, data)) if prefix.starts_with("data:") => data,
            _ => text,
        };
        let bytes = STANDARD.decode(payload.trim())?;
        Ok(Self { bytes })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// 画像形式を先頭バイトから推定（不明ならJPEG扱い）
    pub fn format(&self) -> image::ImageFormat {
        image::guess_format(&self.bytes).unwrap_or(image::ImageFormat::Jpeg)
    }

    pub fn mime_type(&self) -> &'static str {
        self.format().to_mime_type()
    }

    /// 保存時の拡張子
    pub fn extension(&self) -> &'static str {
        self.format().extensions_str().first().copied().unwrap_or("jpg")
    }

    /// `<img src>` に渡せるData URL
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type(), STANDARD.encode(&self.bytes))
    }
}

impl std::fmt::Debug for PreviewImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreviewImage")
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl Serialize for PreviewImage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(&self.bytes))
    }
}

/// 単一フレーム解析の結果（検出一覧 + プレビュー）
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DetectionResult {
    pub records: Vec<DetectionRecord>,
    pub preview: Option<PreviewImage>,
}

impl DetectionResult {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 検出一覧を車種ごとに集計
    pub fn class_counts(&self) -> VehicleCounts {
        let mut counts = VehicleCounts::new();
        for record in &self.records {
            *counts.entry(record.class_name.clone()).or_insert(0) += 1;
        }
        counts
    }
}

/// 追跡・カウント解析の結果
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrackingResult {
    pub preview: Option<PreviewImage>,
    /// サーバー側の処理済み動画（ダウンロード用の参照）
    pub artifact: Option<String>,
    /// 合計台数。動画検出で台数情報がない場合は `None`（0台とは区別する）
    pub total: Option<u64>,
    pub counts: VehicleCounts,
}

impl TrackingResult {
    /// 空でない成果物参照
    pub fn artifact(&self) -> Option<&str> {
        self.artifact.as_deref().filter(|a| !a.trim().is_empty())
    }

    /// 台数が0と確定しているか
    pub fn is_empty(&self) -> bool {
        self.total == Some(0)
    }
}

/// 正規化済みの解析結果
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnalysisResult {
    Detection(DetectionResult),
    Tracking(TrackingResult),
}

impl AnalysisResult {
    /// 検出件数（追跡結果は合計台数、不明なら `None`）
    pub fn finding_count(&self) -> Option<u64> {
        match self {
            AnalysisResult::Detection(result) => Some(result.len() as u64),
            AnalysisResult::Tracking(result) => result.total,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.finding_count() == Some(0)
    }

    pub fn preview(&self) -> Option<&PreviewImage> {
        match self {
            AnalysisResult::Detection(result) => result.preview.as_ref(),
            AnalysisResult::Tracking(result) => result.preview.as_ref(),
        }
    }

    /// ダウンロード可能な成果物参照（追跡結果のみ）
    pub fn artifact(&self) -> Option<&str> {
        match self {
            AnalysisResult::Detection(_) => None,
            AnalysisResult::Tracking(result) => result.artifact(),
        }
    }
}

/// 成果物参照から保存用ファイル名を取り出す
///
/// サーバーが返す参照はファイル名だが、パス区切りを含む場合は
/// 最後の要素だけを使う。
pub fn artifact_file_name(reference: &str) -> Option<&str> {
    reference
        .trim()
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .filter(|name| !name.is_empty() && *name != "." && *name != "..")
}

#[cfg(test)]
mod tests {
    use super::*;

    const JPEG_BASE64: &str = "/9j/4AAQSkZJRgAB";
    const PNG_BASE64: &str = "iVBORw0KGgoAAAANSUhEUg==";

    #[test]
    fn test_bounding_box_from_slice() {
        let bbox = BoundingBox::from_slice(&[10.0, 20.0, 110.0, 70.0]).unwrap();
        assert_eq!(bbox.x1, 10.0);
        assert_eq!(bbox.y2, 70.0);
        assert_eq!(bbox.width(), 100.0);
        assert_eq!(bbox.height(), 50.0);

        assert!(BoundingBox::from_slice(&[1.0, 2.0, 3.0]).is_none());
        assert!(BoundingBox::from_slice(&[1.0, 2.0, 3.0, 4.0, 5.0]).is_none());
    }

    #[test]
    fn test_preview_format_detection() {
        let jpeg = PreviewImage::from_base64(JPEG_BASE64).unwrap();
        assert_eq!(jpeg.mime_type(), "image/jpeg");
        assert!(jpeg.data_url().starts_with("data:image/jpeg;base64,"));

        let png = PreviewImage::from_base64(PNG_BASE64).unwrap();
        assert_eq!(png.mime_type(), "image/png");
        assert_eq!(png.extension(), "png");
    }

    #[test]
    fn test_preview_accepts_data_url() {
        let url = format!("data:image/jpeg;base64,{}", JPEG_BASE64);
        let preview = PreviewImage::from_base64(&url).unwrap();
        assert_eq!(preview.bytes()[..3], [0xFF, 0xD8, 0xFF]);
    }

    #[test]
    fn test_preview_rejects_invalid_base64() {
        assert!(PreviewImage::from_base64("***not base64***").is_err());
    }

    #[test]
    fn test_detection_class_counts() {
        let record = |class: &str| DetectionRecord {
            class_name: class.to_string(),
            confidence: 0.8,
            bbox: BoundingBox { x1: 0.0, y1: 0.0, x2: 1.0, y2: 1.0 },
            tracker_id: None,
        };
        let result = DetectionResult {
            records: vec![record("car"), record("truck"), record("car")],
            preview: None,
        };
        let counts = result.class_counts();
        assert_eq!(counts.get("car"), Some(&2));
        assert_eq!(counts.get("truck"), Some(&1));
    }

    #[test]
    fn test_tracking_artifact_blank_is_none() {
        let result = TrackingResult {
            artifact: Some("  ".to_string()),
            ..Default::default()
        };
        assert_eq!(result.artifact(), None);
        assert!(AnalysisResult::Tracking(result).artifact().is_none());
    }

    #[test]
    fn test_detection_result_has_no_artifact() {
        let result = AnalysisResult::Detection(DetectionResult::default());
        assert!(result.artifact().is_none());
        assert!(result.is_empty());
    }

    #[test]
    fn test_unknown_total_is_not_empty() {
        let unknown = TrackingResult {
            artifact: Some("det_1.mp4".to_string()),
            ..Default::default()
        };
        assert!(!unknown.is_empty());
        let result = AnalysisResult::Tracking(unknown);
        assert_eq!(result.finding_count(), None);
        assert!(!result.is_empty());

        let zero = TrackingResult {
            total: Some(0),
            ..Default::default()
        };
        assert!(zero.is_empty());
    }

    #[test]
    fn test_artifact_file_name() {
        assert_eq!(artifact_file_name("out_123.mp4"), Some("out_123.mp4"));
        assert_eq!(artifact_file_name("static/out_123.mp4"), Some("out_123.mp4"));
        assert_eq!(artifact_file_name("..\\..\\evil.mp4"), Some("evil.mp4"));
        assert_eq!(artifact_file_name(""), None);
        assert_eq!(artifact_file_name("videos/"), None);
        assert_eq!(artifact_file_name(".."), None);
    }

    #[test]
    fn test_analysis_result_serialize_tagged() {
        let result = AnalysisResult::Tracking(TrackingResult {
            total: Some(5),
            counts: [("car".to_string(), 3), ("truck".to_string(), 2)].into_iter().collect(),
            artifact: Some("out_123.mp4".to_string()),
            preview: None,
        });
        let json = serde_json::to_string(&result).expect("シリアライズ失敗");
        assert!(json.contains("\"kind\":\"tracking\""));
        assert!(json.contains("\"total\":5"));
        assert!(json.contains("\"artifact\":\"out_123.mp4\""));
    }
}
