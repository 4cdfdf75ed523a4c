//! 解析操作と操作状態

use crate::subject::MediaKind;
use crate::types::AnalysisResult;
use serde::Serialize;

/// リモート解析操作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// 画像1枚の車両検出
    ImageDetection,
    /// 動画の全フレーム検出（追跡なし）
    VideoDetection,
    /// 動画の追跡・カウント
    VideoTracking,
}

impl Operation {
    pub const ALL: [Operation; 3] = [
        Operation::ImageDetection,
        Operation::VideoDetection,
        Operation::VideoTracking,
    ];

    /// APIベースURLからの相対パス
    pub fn endpoint(&self) -> &'static str {
        match self {
            Operation::ImageDetection => "process-image",
            Operation::VideoDetection => "process-video",
            Operation::VideoTracking => "process-video-tracking",
        }
    }

    /// この操作が受け付けるメディア種別
    pub fn required_kind(&self) -> MediaKind {
        match self {
            Operation::ImageDetection => MediaKind::Image,
            Operation::VideoDetection | Operation::VideoTracking => MediaKind::Video,
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::ImageDetection => write!(f, "画像検出"),
            Operation::VideoDetection => write!(f, "動画検出"),
            Operation::VideoTracking => write!(f, "動画追跡"),
        }
    }
}

/// 操作状態
///
/// 常にどれか1つだけが有効。`Busy` 中の新規リクエストは拒否される。
#[derive(Debug, Clone, Default, PartialEq)]
pub enum OperationState {
    #[default]
    Idle,
    Busy {
        operation: Operation,
        request_id: u64,
    },
    Succeeded {
        operation: Operation,
        result: AnalysisResult,
    },
    Failed {
        operation: Option<Operation>,
        reason: String,
    },
}

impl OperationState {
    pub fn is_busy(&self) -> bool {
        matches!(self, OperationState::Busy { .. })
    }

    pub fn result(&self) -> Option<&AnalysisResult> {
        match self {
            OperationState::Succeeded { result, .. } => Some(result),
            _ => None,
        }
    }

    /// 現在ダウンロード可能な成果物参照
    pub fn artifact(&self) -> Option<&str> {
        self.result().and_then(AnalysisResult::artifact)
    }
}

/// 現在実行できる操作
///
/// 処理中は全操作が無効。種別が不明なファイルでは種別依存の操作がすべて無効になる。
pub fn available_operations(kind: Option<MediaKind>, busy: bool) -> Vec<Operation> {
    if busy {
        return Vec::new();
    }
    match kind {
        Some(kind) => Operation::ALL
            .into_iter()
            .filter(|op| op.required_kind() == kind)
            .collect(),
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DetectionResult, TrackingResult};

    #[test]
    fn test_endpoints() {
        assert_eq!(Operation::ImageDetection.endpoint(), "process-image");
        assert_eq!(Operation::VideoDetection.endpoint(), "process-video");
        assert_eq!(Operation::VideoTracking.endpoint(), "process-video-tracking");
    }

    #[test]
    fn test_available_operations_by_kind() {
        assert_eq!(
            available_operations(Some(MediaKind::Image), false),
            vec![Operation::ImageDetection]
        );
        assert_eq!(
            available_operations(Some(MediaKind::Video), false),
            vec![Operation::VideoDetection, Operation::VideoTracking]
        );
        assert!(available_operations(Some(MediaKind::Unknown), false).is_empty());
        assert!(available_operations(None, false).is_empty());
    }

    #[test]
    fn test_available_operations_when_busy() {
        assert!(available_operations(Some(MediaKind::Video), true).is_empty());
    }

    #[test]
    fn test_artifact_only_from_tracking_success() {
        let detection = OperationState::Succeeded {
            operation: Operation::ImageDetection,
            result: AnalysisResult::Detection(DetectionResult::default()),
        };
        assert!(detection.artifact().is_none());

        let tracking = OperationState::Succeeded {
            operation: Operation::VideoTracking,
            result: AnalysisResult::Tracking(TrackingResult {
                artifact: Some("out_1.mp4".into()),
                ..Default::default()
            }),
        };
        assert_eq!(tracking.artifact(), Some("out_1.mp4"));

        let failed = OperationState::Failed {
            operation: Some(Operation::VideoTracking),
            reason: "x".into(),
        };
        assert!(failed.artifact().is_none());
        assert!(!failed.is_busy());
    }
}
