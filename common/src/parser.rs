//! APIレスポンスの正規化
//!
//! 3種類の解析エンドポイントが返すJSONを `AnalysisResult` に変換する。
//!
//! 判定順序:
//! 1. JSONオブジェクトでなければ `MalformedResponse`
//! 2. `error` フィールド（または `success: false`）があれば `ServiceError`
//! 3. 操作ごとの形に当てはめる。必須フィールドの欠落は `MalformedResponse`
//!
//! 欠落した必須フィールドを0とみなすことはしない。

use crate::error::{Error, Result};
use crate::state::Operation;
use crate::types::{
    AnalysisResult, BoundingBox, DetectionRecord, DetectionResult, PreviewImage, TrackingResult,
    VehicleCounts,
};
use serde::Deserialize;
use serde_json::{Map, Value};

/// `success: false` でメッセージがない場合の理由
const UNSPECIFIED_SERVICE_FAILURE: &str = "サーバーが処理の失敗を返しました";

#[derive(Debug, Deserialize)]
struct WireDetection {
    class_name: String,
    confidence: f64,
    bbox: Vec<f64>,
    #[serde(default)]
    tracker_id: Option<u64>,
}

/// `/process-image` のレスポンス
#[derive(Debug, Deserialize)]
struct ImagePayload {
    #[serde(default)]
    detections: Option<Vec<WireDetection>>,
    #[serde(default)]
    processed_image: Option<String>,
}

/// `/process-video` と `/process-video-tracking` のレスポンス
#[derive(Debug, Deserialize)]
struct VideoPayload {
    #[serde(default)]
    detections: Option<Vec<WireDetection>>,
    #[serde(default)]
    preview_image: Option<String>,
    #[serde(default)]
    processed_video: Option<String>,
    #[serde(default)]
    total_vehicles: Option<u64>,
    #[serde(default)]
    final_counts: Option<VehicleCounts>,
}

/// レスポンス本文を正規化
///
/// # Arguments
/// * `operation` - リクエストした解析操作
/// * `body` - レスポンス本文（JSON）
///
/// # Returns
/// * `Ok(AnalysisResult)` - 正規化成功（検出0件も成功）
/// * `Err(ServiceError)` - サーバーが明示的にエラーを返した
/// * `Err(MalformedResponse)` - 既知の形に当てはまらない
pub fn normalize(operation: Operation, body: &[u8]) -> Result<AnalysisResult> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| Error::MalformedResponse(format!("JSONとして読めません: {}", e)))?;
    normalize_value(operation, &value)
}

/// パース済みJSONを正規化（入力は変更しない）
pub fn normalize_value(operation: Operation, value: &Value) -> Result<AnalysisResult> {
    let object = value
        .as_object()
        .ok_or_else(|| Error::MalformedResponse("JSONオブジェクトではありません".into()))?;

    check_service_error(object)?;

    match operation {
        Operation::ImageDetection => normalize_image(value),
        Operation::VideoDetection => normalize_video_detection(value),
        Operation::VideoTracking => normalize_video_tracking(value),
    }
}

/// 明示的なエラー表示を検出
///
/// `error` フィールドは他のフィールドより優先する。
fn check_service_error(object: &Map<String, Value>) -> Result<()> {
    match object.get("error") {
        None | Some(Value::Null) => {}
        Some(Value::String(message)) if message.trim().is_empty() => {
            return Err(Error::ServiceError(UNSPECIFIED_SERVICE_FAILURE.into()));
        }
        Some(Value::String(message)) => return Err(Error::ServiceError(message.clone())),
        Some(other) => return Err(Error::ServiceError(other.to_string())),
    }

    if object.get("success") == Some(&Value::Bool(false)) {
        return Err(Error::ServiceError(UNSPECIFIED_SERVICE_FAILURE.into()));
    }

    Ok(())
}

fn parse_payload<'a, T: Deserialize<'a>>(value: &'a Value, operation: Operation) -> Result<T> {
    T::deserialize(value)
        .map_err(|e| Error::MalformedResponse(format!("{}のレスポンス形式が不正です: {}", operation, e)))
}

fn normalize_image(value: &Value) -> Result<AnalysisResult> {
    let payload: ImagePayload = parse_payload(value, Operation::ImageDetection)?;

    let detections = payload
        .detections
        .ok_or_else(|| Error::MalformedResponse("detections がありません".into()))?;

    Ok(AnalysisResult::Detection(DetectionResult {
        records: convert_records(detections)?,
        preview: decode_preview(payload.processed_image.as_deref())?,
    }))
}

/// 動画検出は形が一定しない
///
/// - 台数情報あり → TrackingResult（成果物参照は任意）
/// - 検出一覧のみ → DetectionResult
/// - プレビューか成果物だけ → 合計不明の TrackingResult
/// - どれもなし → MalformedResponse
fn normalize_video_detection(value: &Value) -> Result<AnalysisResult> {
    let payload: VideoPayload = parse_payload(value, Operation::VideoDetection)?;
    let preview = decode_preview(payload.preview_image.as_deref())?;

    if payload.total_vehicles.is_some() || payload.final_counts.is_some() {
        let counts = payload.final_counts.unwrap_or_default();
        let total = match payload.total_vehicles {
            Some(total) => total,
            None => sum_counts(&counts)?,
        };
        return Ok(AnalysisResult::Tracking(TrackingResult {
            preview,
            artifact: payload.processed_video,
            total: Some(total),
            counts,
        }));
    }

    if let Some(detections) = payload.detections {
        return Ok(AnalysisResult::Detection(DetectionResult {
            records: convert_records(detections)?,
            preview,
        }));
    }

    let artifact = payload
        .processed_video
        .filter(|name| !name.trim().is_empty());
    if preview.is_none() && artifact.is_none() {
        return Err(Error::MalformedResponse(
            "台数情報・検出一覧・プレビュー・処理済み動画のいずれもありません".into(),
        ));
    }

    Ok(AnalysisResult::Tracking(TrackingResult {
        preview,
        artifact,
        total: None,
        counts: VehicleCounts::new(),
    }))
}

/// 車種別台数の合計（桁あふれは不正な応答とみなす）
fn sum_counts(counts: &VehicleCounts) -> Result<u64> {
    counts
        .values()
        .try_fold(0u64, |sum, count| sum.checked_add(*count))
        .ok_or_else(|| Error::MalformedResponse("final_counts の合計が大きすぎます".into()))
}

fn normalize_video_tracking(value: &Value) -> Result<AnalysisResult> {
    let payload: VideoPayload = parse_payload(value, Operation::VideoTracking)?;

    let total = payload
        .total_vehicles
        .ok_or_else(|| Error::MalformedResponse("total_vehicles がありません".into()))?;
    let counts = payload
        .final_counts
        .ok_or_else(|| Error::MalformedResponse("final_counts がありません".into()))?;
    let artifact = payload
        .processed_video
        .ok_or_else(|| Error::MalformedResponse("processed_video がありません".into()))?;

    Ok(AnalysisResult::Tracking(TrackingResult {
        preview: decode_preview(payload.preview_image.as_deref())?,
        artifact: Some(artifact),
        total: Some(total),
        counts,
    }))
}

fn convert_records(detections: Vec<WireDetection>) -> Result<Vec<DetectionRecord>> {
    detections
        .into_iter()
        .enumerate()
        .map(|(i, d)| {
            let bbox = BoundingBox::from_slice(&d.bbox).ok_or_else(|| {
                Error::MalformedResponse(format!(
                    "検出{}のbboxは4要素が必要です（{}要素）",
                    i + 1,
                    d.bbox.len()
                ))
            })?;
            if !(0.0..=1.0).contains(&d.confidence) {
                return Err(Error::MalformedResponse(format!(
                    "検出{}の信頼度が範囲外です: {}",
                    i + 1,
                    d.confidence
                )));
            }
            Ok(DetectionRecord {
                class_name: d.class_name,
                confidence: d.confidence,
                bbox,
                tracker_id: d.tracker_id,
            })
        })
        .collect()
}

/// プレビュー画像をデコード（null・空文字はプレビューなし）
fn decode_preview(encoded: Option<&str>) -> Result<Option<PreviewImage>> {
    match encoded.map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) => PreviewImage::from_base64(text)
            .map(Some)
            .map_err(|e| Error::MalformedResponse(format!("プレビュー画像のBase64が不正です: {}", e))),
    }
}
