use thiserror::Error;

#[derive(Error, Debug)]
pub enum VisionError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error("ファイルが見つかりません: {0}")]
    FileNotFound(String),

    #[error("HTTPクライアントエラー: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error("対話入力エラー: {0}")]
    Prompt(String),

    #[error(transparent)]
    Common(#[from] vehicle_vision_common::Error),
}

pub type Result<T> = std::result::Result<T, VisionError>;
