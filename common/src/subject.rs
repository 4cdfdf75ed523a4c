//! 選択ファイル（Subject）とメディア種別の判定

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// 拡張子で動画と判定する形式
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "webm", "mov"];

/// 拡張子で画像と判定する形式
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "webp"];

/// メディア種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
    Unknown,
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaKind::Image => write!(f, "画像"),
            MediaKind::Video => write!(f, "動画"),
            MediaKind::Unknown => write!(f, "不明な形式"),
        }
    }
}

/// メディア種別を判定
///
/// 宣言されたContent-Type（`image/*` / `video/*`）を優先し、
/// それ以外はファイル名の拡張子で判定する。
pub fn classify(content_type: Option<&str>, file_name: &str) -> MediaKind {
    if let Some(mime) = content_type {
        let mime = mime.trim().to_ascii_lowercase();
        if mime.starts_with("image/") {
            return MediaKind::Image;
        }
        if mime.starts_with("video/") {
            return MediaKind::Video;
        }
    }

    let ext = match file_name.rsplit_once('.') {
        Some((_, ext)) => ext.to_ascii_lowercase(),
        None => return MediaKind::Unknown,
    };

    if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
        MediaKind::Video
    } else if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        MediaKind::Image
    } else {
        MediaKind::Unknown
    }
}

/// ユーザーが選択したファイル
///
/// バイト列は `Arc` で共有するため、状態のスナップショットを
/// 取ってもファイル内容はコピーされない。
#[derive(Clone)]
pub struct Subject {
    name: String,
    content_type: Option<String>,
    bytes: Arc<[u8]>,
    kind: MediaKind,
}

impl Subject {
    pub fn new(name: impl Into<String>, content_type: Option<String>, bytes: Vec<u8>) -> Self {
        let name = name.into();
        let content_type = content_type.filter(|c| !c.trim().is_empty());
        let kind = classify(content_type.as_deref(), &name);
        Self {
            name,
            content_type,
            bytes: bytes.into(),
            kind,
        }
    }

    /// 表示名（ファイル名）
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    /// アップロード時のContent-Type
    ///
    /// 宣言値が `type/subtype` 形式なら採用し、なければ種別から補う。
    pub fn upload_mime(&self) -> String {
        if let Some(declared) = self.content_type.as_deref() {
            if is_plain_mime(declared) {
                return declared.trim().to_string();
            }
        }

        match self.kind {
            MediaKind::Image => "image/jpeg".to_string(),
            MediaKind::Video => "video/mp4".to_string(),
            MediaKind::Unknown => "application/octet-stream".to_string(),
        }
    }

    /// サイズをMB表記で返す（表示用）
    pub fn size_label(&self) -> String {
        format!("{:.2} MB", self.size() as f64 / 1024.0 / 1024.0)
    }
}

impl std::fmt::Debug for Subject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subject")
            .field("name", &self.name)
            .field("content_type", &self.content_type)
            .field("size", &self.bytes.len())
            .field("kind", &self.kind)
            .finish()
    }
}

fn is_plain_mime(value: &str) -> bool {
    let value = value.trim();
    match value.split_once('/') {
        Some((top, sub)) => {
            !top.is_empty()
                && !sub.is_empty()
                && value
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '-' | '+' | '.'))
        }
        None => false,
    }
}

/// 選択ファイルを1件に絞る
///
/// 複数選択はネットワーク呼び出しの前に拒否する。
pub fn single_selection(mut files: Vec<Subject>) -> Result<Subject> {
    match files.len() {
        0 => Err(Error::NoSubject),
        1 => Ok(files.remove(0)),
        n => Err(Error::MultipleFiles(n)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_by_content_type() {
        assert_eq!(classify(Some("image/png"), "noext"), MediaKind::Image);
        assert_eq!(classify(Some("video/quicktime"), "clip"), MediaKind::Video);
        // Content-Typeが優先される
        assert_eq!(classify(Some("image/jpeg"), "drive.mp4"), MediaKind::Image);
    }

    #[test]
    fn test_classify_falls_back_to_extension() {
        assert_eq!(classify(None, "drive.mp4"), MediaKind::Video);
        assert_eq!(classify(None, "DRIVE.MOV"), MediaKind::Video);
        assert_eq!(classify(None, "clip.webm"), MediaKind::Video);
        assert_eq!(classify(Some("application/octet-stream"), "car1.jpg"), MediaKind::Image);
        assert_eq!(classify(None, "car1.JPEG"), MediaKind::Image);
    }

    #[test]
    fn test_classify_unknown() {
        assert_eq!(classify(None, "notes.txt"), MediaKind::Unknown);
        assert_eq!(classify(None, "README"), MediaKind::Unknown);
        assert_eq!(classify(Some("text/plain"), "clip.avi"), MediaKind::Unknown);
    }

    #[test]
    fn test_subject_metadata() {
        let subject = Subject::new("car1.jpg", None, vec![0u8; 2048]);
        assert_eq!(subject.name(), "car1.jpg");
        assert_eq!(subject.size(), 2048);
        assert_eq!(subject.kind(), MediaKind::Image);
        assert_eq!(subject.upload_mime(), "image/jpeg");
    }

    #[test]
    fn test_upload_mime_keeps_declared_type() {
        let subject = Subject::new("clip", Some("video/webm".into()), vec![1, 2, 3]);
        assert_eq!(subject.kind(), MediaKind::Video);
        assert_eq!(subject.upload_mime(), "video/webm");

        let odd = Subject::new("drive.mp4", Some("video mp4; bad".into()), vec![]);
        assert_eq!(odd.upload_mime(), "video/mp4");
    }

    #[test]
    fn test_blank_content_type_is_ignored() {
        let subject = Subject::new("drive.mp4", Some("  ".into()), vec![]);
        assert_eq!(subject.content_type(), None);
        assert_eq!(subject.kind(), MediaKind::Video);
    }

    #[test]
    fn test_single_selection() {
        let one = vec![Subject::new("a.jpg", None, vec![])];
        assert_eq!(single_selection(one).unwrap().name(), "a.jpg");

        let none: Vec<Subject> = Vec::new();
        assert!(matches!(single_selection(none), Err(Error::NoSubject)));

        let many = vec![
            Subject::new("a.jpg", None, vec![]),
            Subject::new("b.mp4", None, vec![]),
        ];
        assert!(matches!(single_selection(many), Err(Error::MultipleFiles(2))));
    }
}
