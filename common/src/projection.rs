//! 表示用の状態（ResultProjection）
//!
//! `OperationState` から毎回導出する読み取り専用のビュー。
//! フロントエンドはこれだけを見て描画すればよい。

use crate::state::{Operation, OperationState};
use crate::types::{AnalysisResult, DetectionRecord, PreviewImage};

/// 描画可能な状態
#[derive(Debug, Clone, PartialEq)]
pub enum ResultProjection {
    /// 結果なし（未実行・ファイル選択直後）
    Empty,
    /// 解析中
    Pending { operation: Operation },
    /// 検出一覧（1件以上）
    Detections {
        preview: Option<PreviewImage>,
        rows: Vec<DetectionRecord>,
    },
    /// 検出0件
    NoDetections { preview: Option<PreviewImage> },
    /// 車種別台数
    Counts {
        preview: Option<PreviewImage>,
        total: u64,
        counts: Vec<(String, u64)>,
        artifact: Option<String>,
    },
    /// 車両0台（エラーではない）
    NoVehicles {
        preview: Option<PreviewImage>,
        artifact: Option<String>,
    },
    /// 台数情報なしの集計結果（プレビュー・成果物のみ）
    Summary {
        preview: Option<PreviewImage>,
        artifact: Option<String>,
    },
    /// 失敗
    Failed { reason: String },
}

impl ResultProjection {
    pub fn from_state(state: &OperationState) -> Self {
        match state {
            OperationState::Idle => ResultProjection::Empty,
            OperationState::Busy { operation, .. } => ResultProjection::Pending {
                operation: *operation,
            },
            OperationState::Failed { reason, .. } => ResultProjection::Failed {
                reason: reason.clone(),
            },
            OperationState::Succeeded { result, .. } => Self::from_result(result),
        }
    }

    pub fn from_result(result: &AnalysisResult) -> Self {
        match result {
            AnalysisResult::Detection(detection) if detection.is_empty() => {
                ResultProjection::NoDetections {
                    preview: detection.preview.clone(),
                }
            }
            AnalysisResult::Detection(detection) => ResultProjection::Detections {
                preview: detection.preview.clone(),
                rows: detection.records.clone(),
            },
            AnalysisResult::Tracking(tracking) => match tracking.total {
                None => ResultProjection::Summary {
                    preview: tracking.preview.clone(),
                    artifact: tracking.artifact().map(str::to_string),
                },
                Some(0) => ResultProjection::NoVehicles {
                    preview: tracking.preview.clone(),
                    artifact: tracking.artifact().map(str::to_string),
                },
                Some(total) => ResultProjection::Counts {
                    preview: tracking.preview.clone(),
                    total,
                    counts: tracking
                        .counts
                        .iter()
                        .map(|(class, count)| (class.clone(), *count))
                        .collect(),
                    artifact: tracking.artifact().map(str::to_string),
                },
            },
        }
    }

    pub fn preview(&self) -> Option<&PreviewImage> {
        match self {
            ResultProjection::Detections { preview, .. }
            | ResultProjection::NoDetections { preview }
            | ResultProjection::Counts { preview, .. }
            | ResultProjection::NoVehicles { preview, .. }
            | ResultProjection::Summary { preview, .. } => preview.as_ref(),
            _ => None,
        }
    }

    pub fn artifact(&self) -> Option<&str> {
        match self {
            ResultProjection::Counts { artifact, .. }
            | ResultProjection::NoVehicles { artifact, .. }
            | ResultProjection::Summary { artifact, .. } => artifact.as_deref(),
            _ => None,
        }
    }

    /// ダウンロードボタンを有効にするか
    pub fn download_enabled(&self) -> bool {
        self.artifact().is_some()
    }
}
