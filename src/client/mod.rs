//! 解析サーバー連携モジュール
//!
//! - `AnalysisService`: オーケストレーターが使うリモート呼び出しの境界
//! - `HttpService`: reqwestによる実装（multipartアップロード）

mod http;

pub use http::{HealthStatus, HttpService};

use vehicle_vision_common::{Operation, Result, Subject};

/// リモート解析サービス
///
/// エラーは `TransportFailure`（通信・HTTPステータス）として返し、
/// レスポンス本文の解釈は呼び出し側（正規化）に任せる。
#[allow(async_fn_in_trait)]
pub trait AnalysisService {
    /// ファイルを1件アップロードして解析し、レスポンス本文を返す
    async fn analyze(&self, operation: Operation, subject: &Subject) -> Result<Vec<u8>>;

    /// 処理済み成果物を参照名で取得
    async fn fetch_artifact(&self, reference: &str) -> Result<Vec<u8>>;
}
