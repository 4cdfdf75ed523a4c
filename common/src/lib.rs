//! Vehicle Vision Common Library
//!
//! CLIと各フロントエンドで共有される型と正規化ロジック（I/Oなし）

pub mod error;
pub mod parser;
pub mod projection;
pub mod state;
pub mod subject;
pub mod types;

pub use error::{Error, Result};
pub use parser::{normalize, normalize_value};
pub use projection::ResultProjection;
pub use state::{available_operations, Operation, OperationState};
pub use subject::{classify, single_selection, MediaKind, Subject};
pub use types::{
    artifact_file_name, AnalysisResult, BoundingBox, DetectionRecord, DetectionResult,
    PreviewImage, TrackingResult, VehicleCounts,
};
