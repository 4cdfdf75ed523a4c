//! 解析操作のオーケストレーター
//!
//! 選択中のファイルと操作状態は `watch::Sender<Session>` が唯一の書き手として保持する。
//! 状態遷移は `send_if_modified` の中で判定と更新を同時に行うため、
//! 購読側から中間状態が見えることはない。
//!
//! 処理中（`Busy`）の新規リクエストは待たせずに即座に拒否する。

use crate::client::AnalysisService;
use crate::download::DownloadCoordinator;
use crate::notify::{Notifier, NotifyKind};
use std::path::PathBuf;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use vehicle_vision_common::{
    normalize, single_selection, AnalysisResult, Error, Operation, OperationState, Result,
    ResultProjection, Subject,
};

/// 選択中のファイルと操作状態
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub subject: Option<Subject>,
    pub state: OperationState,
    next_request_id: u64,
}

pub struct Orchestrator<S, N> {
    service: S,
    notifier: N,
    downloads: DownloadCoordinator,
    session: watch::Sender<Session>,
}

impl<S: AnalysisService, N: Notifier> Orchestrator<S, N> {
    pub fn new(service: S, notifier: N, downloads: DownloadCoordinator) -> Self {
        let (session, _) = watch::channel(Session::default());
        Self {
            service,
            notifier,
            downloads,
            session,
        }
    }

    /// 状態変更の購読
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.session.subscribe()
    }

    pub fn state(&self) -> OperationState {
        self.session.borrow().state.clone()
    }

    pub fn subject(&self) -> Option<Subject> {
        self.session.borrow().subject.clone()
    }

    pub fn projection(&self) -> ResultProjection {
        ResultProjection::from_state(&self.session.borrow().state)
    }

    pub fn is_busy(&self) -> bool {
        self.session.borrow().state.is_busy()
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn downloads(&self) -> &DownloadCoordinator {
        &self.downloads
    }

    // ========================================
    // ファイル選択
    // ========================================

    /// ファイルを選択する
    ///
    /// 以前の結果はすべて破棄され `Idle` に戻る。処理中は選択できない。
    pub fn select(&self, subject: Subject) -> Result<()> {
        let name = subject.name().to_string();
        let kind = subject.kind();
        let mut pending = Some(subject);

        let accepted = self.session.send_if_modified(|session| {
            if session.state.is_busy() {
                return false;
            }
            session.subject = pending.take();
            session.state = OperationState::Idle;
            true
        });

        if !accepted {
            return Err(self.reject(Error::Busy));
        }

        info!(file = %name, %kind, "ファイルを選択");
        Ok(())
    }

    /// 複数ファイルの選択（ドロップ等）。1件以外は拒否する
    pub fn select_files(&self, files: Vec<Subject>) -> Result<()> {
        match single_selection(files) {
            Ok(subject) => self.select(subject),
            Err(err) => Err(self.reject(err)),
        }
    }

    // ========================================
    // 解析操作
    // ========================================

    pub async fn run_image_detection(&self) -> Result<AnalysisResult> {
        self.run(Operation::ImageDetection).await
    }

    pub async fn run_video_detection(&self) -> Result<AnalysisResult> {
        self.run(Operation::VideoDetection).await
    }

    pub async fn run_video_tracking(&self) -> Result<AnalysisResult> {
        self.run(Operation::VideoTracking).await
    }

    async fn run(&self, operation: Operation) -> Result<AnalysisResult> {
        let (subject, request_id) = match self.begin(operation) {
            Ok(started) => started,
            Err(Error::Busy) => return Err(self.reject(Error::Busy)),
            Err(err) => return Err(self.fail_before_call(operation, err)),
        };

        debug!(%operation, request_id, file = subject.name(), "解析開始");

        let outcome = match self.service.analyze(operation, &subject).await {
            Ok(body) => normalize(operation, &body),
            Err(err) => Err(err),
        };

        self.finish(operation, request_id, outcome)
    }

    /// 前提条件を確認して `Busy` に遷移する
    fn begin(&self, operation: Operation) -> Result<(Subject, u64)> {
        let mut started = Err(Error::NoSubject);

        self.session.send_if_modified(|session| {
            if session.state.is_busy() {
                started = Err(Error::Busy);
                return false;
            }
            let Some(subject) = session.subject.clone() else {
                started = Err(Error::NoSubject);
                return false;
            };
            let expected = operation.required_kind();
            if subject.kind() != expected {
                started = Err(Error::WrongMediaType {
                    operation,
                    expected,
                    actual: subject.kind(),
                });
                return false;
            }

            session.next_request_id += 1;
            let request_id = session.next_request_id;
            session.state = OperationState::Busy {
                operation,
                request_id,
            };
            started = Ok((subject, request_id));
            true
        });

        started
    }

    /// 呼び出し結果を状態に反映して1回だけ通知する
    fn finish(
        &self,
        operation: Operation,
        request_id: u64,
        outcome: Result<AnalysisResult>,
    ) -> Result<AnalysisResult> {
        let next = match &outcome {
            Ok(result) => OperationState::Succeeded {
                operation,
                result: result.clone(),
            },
            Err(err) => OperationState::Failed {
                operation: Some(operation),
                reason: err.to_string(),
            },
        };

        let applied = self.session.send_if_modified(|session| match session.state {
            OperationState::Busy {
                request_id: current,
                ..
            } if current == request_id => {
                session.state = next;
                true
            }
            _ => false,
        });
        if !applied {
            warn!(%operation, request_id, "古いリクエストの結果を破棄");
        }

        match &outcome {
            Ok(result) => {
                info!(%operation, request_id, findings = ?result.finding_count(), "解析完了");
                let (kind, message) = success_message(result);
                self.notifier
                    .notify(kind, &format!("{}完了", operation), &message);
            }
            Err(err) => {
                warn!(%operation, request_id, error = %err, "解析失敗");
                self.notifier
                    .notify(NotifyKind::Error, err.title(), &err.to_string());
            }
        }

        outcome
    }

    /// 通信前に判明したエラーを `Failed` にして通知
    fn fail_before_call(&self, operation: Operation, err: Error) -> Error {
        let reason = err.to_string();
        self.session.send_if_modified(|session| {
            if session.state.is_busy() {
                return false;
            }
            session.state = OperationState::Failed {
                operation: Some(operation),
                reason,
            };
            true
        });
        self.reject(err)
    }

    /// 状態を変えずにエラーを通知
    fn reject(&self, err: Error) -> Error {
        debug!(error = %err, precondition = err.is_precondition(), "リクエストを拒否");
        self.notifier
            .notify(NotifyKind::Error, err.title(), &err.to_string());
        err
    }

    // ========================================
    // ダウンロード
    // ========================================

    /// 処理済み動画をダウンロードする
    ///
    /// 現在の結果が `reference` を成果物として持つ追跡結果の場合のみ有効。
    /// 成否にかかわらず操作状態は変更しない。
    pub async fn download_artifact(&self, reference: &str) -> Result<PathBuf> {
        let checked = {
            let session = self.session.borrow();
            if session.state.is_busy() {
                Err(Error::Busy)
            } else if session.state.artifact() == Some(reference) {
                Ok(())
            } else {
                Err(Error::NoArtifact)
            }
        };
        if let Err(err) = checked {
            return Err(self.reject(err));
        }

        match self.downloads.download(&self.service, reference).await {
            Ok(path) => {
                self.notifier.notify(
                    NotifyKind::Success,
                    "ダウンロード完了",
                    &format!("{} に保存しました", path.display()),
                );
                Ok(path)
            }
            Err(err) => {
                warn!(reference, error = %err, "ダウンロード失敗");
                self.notifier.notify(
                    NotifyKind::Error,
                    "ダウンロード失敗",
                    &format!("{}: {}", err.title(), err),
                );
                Err(err)
            }
        }
    }

    /// 現在の結果の成果物をダウンロード
    pub async fn download_current(&self) -> Result<PathBuf> {
        let reference = self
            .session
            .borrow()
            .state
            .artifact()
            .map(str::to_string)
            .unwrap_or_default();
        self.download_artifact(&reference).await
    }
}

/// 成功通知の種別とメッセージ（検出あり/0件は排他）
fn success_message(result: &AnalysisResult) -> (NotifyKind, String) {
    match result {
        AnalysisResult::Detection(detection) if detection.is_empty() => (
            NotifyKind::Info,
            "車両は検出されませんでした".to_string(),
        ),
        AnalysisResult::Detection(detection) => (
            NotifyKind::Success,
            format!("{}台の車両を検出しました", detection.len()),
        ),
        AnalysisResult::Tracking(tracking) if tracking.is_empty() => (
            NotifyKind::Info,
            "ラインを通過した車両はありませんでした".to_string(),
        ),
        AnalysisResult::Tracking(tracking) => match tracking.total {
            Some(total) => (
                NotifyKind::Success,
                format!("合計{}台の車両をカウントしました", total),
            ),
            None => (
                NotifyKind::Success,
                "動画の処理が完了しました（台数情報なし）".to_string(),
            ),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vehicle_vision_common::{DetectionResult, TrackingResult, VehicleCounts};

    #[test]
    fn test_success_message_kinds_are_exclusive() {
        let empty = AnalysisResult::Detection(DetectionResult::default());
        assert_eq!(success_message(&empty).0, NotifyKind::Info);

        let zero = AnalysisResult::Tracking(TrackingResult {
            preview: None,
            artifact: None,
            total: Some(0),
            counts: VehicleCounts::new(),
        });
        let (kind, message) = success_message(&zero);
        assert_eq!(kind, NotifyKind::Info);
        assert!(message.contains("ありませんでした"));

        let mut counts = VehicleCounts::new();
        counts.insert("car".into(), 3);
        let some = AnalysisResult::Tracking(TrackingResult {
            preview: None,
            artifact: Some("out.mp4".into()),
            total: Some(3),
            counts,
        });
        let (kind, message) = success_message(&some);
        assert_eq!(kind, NotifyKind::Success);
        assert!(message.contains("3台"));
    }

    #[test]
    fn test_success_message_unknown_total_is_not_zero() {
        let unknown = AnalysisResult::Tracking(TrackingResult {
            preview: None,
            artifact: Some("det_1.mp4".into()),
            total: None,
            counts: VehicleCounts::new(),
        });
        let (kind, message) = success_message(&unknown);
        assert_eq!(kind, NotifyKind::Success);
        assert!(!message.contains("ありませんでした"));
        assert!(!message.contains("0台"));
    }
}
