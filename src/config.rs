use crate::error::{Result, VisionError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// サーバーURLを上書きする環境変数
pub const SERVER_ENV: &str = "VEHICLE_VISION_SERVER";

const DEFAULT_SERVER_URL: &str = "http://localhost:8001/api";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 解析APIのベースURL（`/api` まで）
    pub server_url: String,
    /// 処理済み動画の保存先（未設定ならカレントディレクトリ）
    pub download_dir: Option<PathBuf>,
    /// プレビュー画像を自動保存するか
    pub save_preview: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.into(),
            download_dir: None,
            save_preview: false,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| VisionError::Config("ホームディレクトリが見つかりません".into()))?;
        Ok(home.join(".config").join("vehicle-vision").join("config.json"))
    }

    /// 実際に使うサーバーURL
    ///
    /// 優先順位: 引数（--server） > 環境変数 > 設定ファイル
    pub fn resolve_server_url(&self, flag: Option<&str>) -> String {
        if let Some(url) = flag.filter(|u| !u.trim().is_empty()) {
            return url.trim().to_string();
        }
        if let Ok(url) = std::env::var(SERVER_ENV) {
            if !url.trim().is_empty() {
                return url.trim().to_string();
            }
        }
        self.server_url.clone()
    }

    pub fn download_dir(&self) -> PathBuf {
        self.download_dir.clone().unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn set_server_url(&mut self, url: String) -> Result<()> {
        validate_server_url(&url)?;
        self.server_url = url.trim().trim_end_matches('/').to_string();
        Ok(())
    }

    pub fn set_download_dir(&mut self, dir: PathBuf) {
        self.download_dir = Some(dir);
    }
}

pub fn validate_server_url(url: &str) -> Result<()> {
    let url = url.trim();
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(VisionError::Config(format!(
            "サーバーURLは http:// または https:// で始めてください: {}",
            url
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server_url, "http://localhost:8001/api");
        assert!(config.download_dir.is_none());
        assert_eq!(config.download_dir(), PathBuf::from("."));
    }

    #[test]
    fn test_load_missing_file_returns_default() {
        let dir = tempdir().expect("Failed to create temp dir");
        let config = Config::load_from(&dir.path().join("none.json")).unwrap();
        assert_eq!(config.server_url, DEFAULT_SERVER_URL);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("nested").join("config.json");

        let mut config = Config::default();
        config.set_server_url("http://10.0.0.5:8001/api/".into()).unwrap();
        config.set_download_dir(PathBuf::from("/tmp/videos"));
        config.save_to(&path).expect("設定保存失敗");

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.server_url, "http://10.0.0.5:8001/api");
        assert_eq!(loaded.download_dir(), PathBuf::from("/tmp/videos"));
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"save_preview": true}"#).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert!(config.save_preview);
        assert_eq!(config.server_url, DEFAULT_SERVER_URL);
    }

    #[test]
    fn test_invalid_server_url() {
        let mut config = Config::default();
        let err = config.set_server_url("localhost:8001".into()).unwrap_err();
        assert!(matches!(err, VisionError::Config(_)));
        assert_eq!(config.server_url, DEFAULT_SERVER_URL);
    }

    #[test]
    fn test_flag_overrides_config() {
        let config = Config::default();
        assert_eq!(
            config.resolve_server_url(Some("http://gpu-box:9000/api")),
            "http://gpu-box:9000/api"
        );
    }
}
