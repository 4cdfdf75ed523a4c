//! 対話モード
//!
//! ファイル選択 → 解析 → ダウンロードをメニューから繰り返し実行する。
//! 新しいファイルを選ぶと前の結果は消える。

use crate::client::AnalysisService;
use crate::error::{Result, VisionError};
use crate::input::load_subjects;
use crate::notify::Notifier;
use crate::orchestrator::Orchestrator;
use crate::progress::Spinner;
use crate::render::render;
use dialoguer::{Input, Select};
use vehicle_vision_common::{available_operations, MediaKind, Operation};

/// メニュー項目
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionAction {
    /// ファイルを選択
    Select,
    /// 解析を実行
    Run(Operation),
    /// 処理済み動画をダウンロード
    Download,
    /// 現在の状態を表示
    Show,
    /// 終了
    Quit,
}

impl SessionAction {
    pub fn label(&self) -> String {
        match self {
            SessionAction::Select => "📂 ファイルを選択".to_string(),
            SessionAction::Run(operation) => format!("▶ {}", operation),
            SessionAction::Download => "💾 処理済み動画をダウンロード".to_string(),
            SessionAction::Show => "📋 結果を表示".to_string(),
            SessionAction::Quit => "終了".to_string(),
        }
    }
}

/// 現在選べるメニュー項目
pub fn menu_actions(kind: Option<MediaKind>, busy: bool, download_enabled: bool) -> Vec<SessionAction> {
    let mut actions = vec![SessionAction::Select];
    actions.extend(
        available_operations(kind, busy)
            .into_iter()
            .map(SessionAction::Run),
    );
    if download_enabled && !busy {
        actions.push(SessionAction::Download);
    }
    actions.push(SessionAction::Show);
    actions.push(SessionAction::Quit);
    actions
}

/// 入力されたパス文字列を分割（カンマ区切りで複数指定）
pub fn split_paths(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(|p| p.trim().trim_matches('"').to_string())
        .filter(|p| !p.is_empty())
        .collect()
}

pub async fn run_interactive_session<S, N>(
    orchestrator: &Orchestrator<S, N>,
    mime: Option<&str>,
) -> Result<()>
where
    S: AnalysisService,
    N: Notifier,
{
    println!("🚗 vehicle-vision - 対話モード\n");

    loop {
        let subject = orchestrator.subject();
        let projection = orchestrator.projection();

        match &subject {
            Some(subject) => println!(
                "選択中: {} ({}, {})",
                subject.name(),
                subject.kind(),
                subject.size_label()
            ),
            None => println!("選択中: なし"),
        }

        let actions = menu_actions(
            subject.as_ref().map(|s| s.kind()),
            orchestrator.is_busy(),
            projection.download_enabled(),
        );
        let labels: Vec<String> = actions.iter().map(SessionAction::label).collect();

        let selected = Select::new()
            .with_prompt("操作を選択")
            .items(&labels)
            .default(0)
            .interact()
            .map_err(|e| VisionError::Prompt(e.to_string()))?;

        match actions[selected] {
            SessionAction::Select => {
                let input: String = Input::new()
                    .with_prompt("ファイルのパス")
                    .interact_text()
                    .map_err(|e| VisionError::Prompt(e.to_string()))?;

                let paths = split_paths(&input);
                match load_subjects(paths.as_slice(), mime) {
                    Ok(files) => {
                        // 失敗時は通知済み
                        let _ = orchestrator.select_files(files);
                    }
                    Err(e) => println!("✖ {}", e),
                }
            }
            SessionAction::Run(operation) => {
                let spinner = Spinner::start(format!("{}中...", operation));
                let _ = match operation {
                    Operation::ImageDetection => orchestrator.run_image_detection().await,
                    Operation::VideoDetection => orchestrator.run_video_detection().await,
                    Operation::VideoTracking => orchestrator.run_video_tracking().await,
                };
                drop(spinner);
                print!("{}", render(&orchestrator.projection()));
            }
            SessionAction::Download => {
                let spinner = Spinner::start("ダウンロード中...");
                let _ = orchestrator.download_current().await;
                drop(spinner);
            }
            SessionAction::Show => {
                print!("{}", render(&orchestrator.projection()));
            }
            SessionAction::Quit => break,
        }
        println!();
    }

    Ok(())
}
