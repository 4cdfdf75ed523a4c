//! エラー型定義
//!
//! 解析・ダウンロード操作の失敗分類。通信障害と「車両0台」は
//! 必ず別のメッセージになるように分けている。

use crate::state::Operation;
use crate::subject::MediaKind;
use thiserror::Error;

/// 共通エラー型
#[derive(Error, Debug)]
pub enum Error {
    #[error("ファイルが選択されていません")]
    NoSubject,

    #[error("ファイルは1つだけ選択できます（{0}件選択されています）")]
    MultipleFiles(usize),

    #[error("{operation}には{expected}が必要です（選択中のファイル: {actual}）")]
    WrongMediaType {
        operation: Operation,
        expected: MediaKind,
        actual: MediaKind,
    },

    #[error("別の処理を実行中です。完了してから再度実行してください")]
    Busy,

    #[error("サーバーとの通信に失敗しました: {0}")]
    TransportFailure(String),

    /// サーバーが返したエラーメッセージをそのまま保持する
    #[error("{0}")]
    ServiceError(String),

    #[error("サーバーの応答を解釈できません: {0}")]
    MalformedResponse(String),

    #[error("ダウンロードできる処理済み動画がありません")]
    NoArtifact,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// 通知のタイトル
    pub fn title(&self) -> &'static str {
        match self {
            Error::NoSubject => "ファイル未選択",
            Error::MultipleFiles(_) => "ファイル選択エラー",
            Error::WrongMediaType { .. } => "ファイル形式エラー",
            Error::Busy => "処理中",
            Error::TransportFailure(_) => "通信エラー",
            Error::ServiceError(_) => "サーバーエラー",
            Error::MalformedResponse(_) => "応答エラー",
            Error::NoArtifact => "ダウンロード不可",
            Error::Io(_) => "保存エラー",
        }
    }

    /// ネットワーク呼び出し前に判定されるエラーか
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Error::NoSubject
                | Error::MultipleFiles(_)
                | Error::WrongMediaType { .. }
                | Error::Busy
                | Error::NoArtifact
        )
    }
}

/// Result型エイリアス
pub type Result<T> = std::result::Result<T, Error>;
