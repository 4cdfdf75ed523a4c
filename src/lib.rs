//! vehicle-vision
//!
//! 車両検出・追跡サーバーへファイルを1つ送り、結果を表示・保存するクライアント。

pub mod cli;
pub mod client;
pub mod config;
pub mod download;
pub mod error;
pub mod input;
pub mod notify;
pub mod orchestrator;
pub mod progress;
pub mod render;
pub mod session;
