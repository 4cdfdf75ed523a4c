use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "vehicle-vision")]
#[command(about = "車両検出・追跡サーバーのクライアント", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// 解析サーバーのURL（例: http://localhost:8001/api）
    #[arg(long, global = true)]
    pub server: Option<String>,

    /// 選択ファイルのContent-Type（省略時は拡張子で判定）
    #[arg(long, global = true)]
    pub mime: Option<String>,

    /// プレビュー画像の保存先
    #[arg(long, global = true)]
    pub preview: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 画像の車両検出
    Image {
        /// 画像ファイル（1つだけ）
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// 動画の全フレーム検出
    DetectVideo {
        /// 動画ファイル（1つだけ）
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// 動画の追跡・台数カウント
    Track {
        /// 動画ファイル（1つだけ）
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// 処理済み動画をダウンロード
        #[arg(short, long)]
        download: bool,

        /// ダウンロード先（省略時は設定値）
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// 対話モード
    Session,

    /// サーバーの状態を確認
    Health,

    /// 設定を表示/編集
    Config {
        /// サーバーURLを設定
        #[arg(long)]
        set_server: Option<String>,

        /// ダウンロード先を設定
        #[arg(long)]
        set_download_dir: Option<PathBuf>,

        /// プレビュー画像の自動保存を設定
        #[arg(long)]
        set_save_preview: Option<bool>,

        /// 設定を表示
        #[arg(long)]
        show: bool,
    },
}
