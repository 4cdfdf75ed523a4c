//! テスト用のサービス・通知スタブ

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Notify;
use vehicle_vision::client::AnalysisService;
use vehicle_vision::download::DownloadCoordinator;
use vehicle_vision::notify::{Notifier, NotifyKind};
use vehicle_vision::orchestrator::Orchestrator;
use vehicle_vision_common::{Error, Operation, Result, Subject};

pub const JPEG_BASE64: &str = "/9j/4AAQSkZJRgAB";

/// car1.jpg の検出結果（2件）
pub const IMAGE_TWO_RECORDS: &str = r#"{
    "success": true,
    "detections": [
        {"class_name": "car", "confidence": 0.91, "bbox": [10, 20, 110, 70], "class_id": 2},
        {"class_name": "truck", "confidence": 0.77, "bbox": [200, 40, 380, 160], "class_id": 7}
    ],
    "processed_image": "/9j/4AAQSkZJRgAB"
}"#;

/// drive.mp4 の追跡結果（5台）
pub const TRACKING_FIVE: &str = r#"{
    "success": true,
    "processed_video": "out_123.mp4",
    "preview_image": "/9j/4AAQSkZJRgAB",
    "total_vehicles": 5,
    "final_counts": {"car": 3, "truck": 2},
    "message": "Video processed successfully"
}"#;

/// drive.mp4 の追跡結果（0台）
pub const TRACKING_ZERO: &str = r#"{
    "success": true,
    "processed_video": "out_124.mp4",
    "preview_image": null,
    "total_vehicles": 0,
    "final_counts": {}
}"#;

/// 動画検出で台数情報がない応答（プレビューと成果物のみ）
pub const VIDEO_DETECTION_SUMMARY: &str = r#"{
    "success": true,
    "preview_image": "/9j/4AAQSkZJRgAB",
    "processed_video": "det_1.mp4"
}"#;

pub const SERVICE_ERROR: &str = r#"{"error": "Invalid video format"}"#;

#[derive(Debug, Clone)]
pub enum Reply {
    Body(String),
    Transport(String),
}

/// 応答を事前に決めておく解析サービス
#[derive(Default)]
pub struct FakeService {
    replies: HashMap<Operation, Reply>,
    artifacts: HashMap<String, Vec<u8>>,
    gate: Option<(Operation, Arc<Notify>)>,
    calls: RefCell<Vec<Operation>>,
    fetches: RefCell<Vec<String>>,
}

impl FakeService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(mut self, operation: Operation, body: &str) -> Self {
        self.replies.insert(operation, Reply::Body(body.to_string()));
        self
    }

    pub fn fail(mut self, operation: Operation, message: &str) -> Self {
        self.replies
            .insert(operation, Reply::Transport(message.to_string()));
        self
    }

    pub fn artifact(mut self, reference: &str, bytes: &[u8]) -> Self {
        self.artifacts.insert(reference.to_string(), bytes.to_vec());
        self
    }

    /// `operation` の応答を `gate` が通知されるまで止める
    pub fn gated(mut self, operation: Operation, gate: Arc<Notify>) -> Self {
        self.gate = Some((operation, gate));
        self
    }

    pub fn calls(&self) -> Vec<Operation> {
        self.calls.borrow().clone()
    }

    pub fn fetches(&self) -> Vec<String> {
        self.fetches.borrow().clone()
    }
}

impl AnalysisService for FakeService {
    async fn analyze(&self, operation: Operation, _subject: &Subject) -> Result<Vec<u8>> {
        self.calls.borrow_mut().push(operation);

        if let Some((gated, gate)) = &self.gate {
            if *gated == operation {
                gate.notified().await;
            }
        }

        match self.replies.get(&operation) {
            Some(Reply::Body(body)) => Ok(body.clone().into_bytes()),
            Some(Reply::Transport(message)) => Err(Error::TransportFailure(message.clone())),
            None => Err(Error::TransportFailure("応答が未設定です".into())),
        }
    }

    async fn fetch_artifact(&self, reference: &str) -> Result<Vec<u8>> {
        self.fetches.borrow_mut().push(reference.to_string());
        self.artifacts
            .get(reference)
            .cloned()
            .ok_or(Error::NoArtifact)
    }
}

/// 受け取った通知を記録する
#[derive(Default)]
pub struct RecordingNotifier {
    events: RefCell<Vec<(NotifyKind, String, String)>>,
}

impl RecordingNotifier {
    pub fn events(&self) -> Vec<(NotifyKind, String, String)> {
        self.events.borrow().clone()
    }

    pub fn kinds(&self) -> Vec<NotifyKind> {
        self.events.borrow().iter().map(|(kind, _, _)| *kind).collect()
    }

    pub fn last(&self) -> Option<(NotifyKind, String, String)> {
        self.events.borrow().last().cloned()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, kind: NotifyKind, title: &str, message: &str) {
        self.events
            .borrow_mut()
            .push((kind, title.to_string(), message.to_string()));
    }
}

pub type TestOrchestrator = Orchestrator<FakeService, RecordingNotifier>;

pub fn orchestrator(service: FakeService, dest_dir: &std::path::Path) -> TestOrchestrator {
    Orchestrator::new(
        service,
        RecordingNotifier::default(),
        DownloadCoordinator::new(dest_dir),
    )
}

pub fn image(name: &str) -> Subject {
    Subject::new(name, Some("image/jpeg".into()), vec![0xFF, 0xD8, 0xFF, 0xE0])
}

pub fn video(name: &str) -> Subject {
    Subject::new(name, Some("video/mp4".into()), vec![0, 0, 0, 0x18, b'f', b't', b'y', b'p'])
}
