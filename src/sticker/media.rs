use crate::prelude::*;

/// How the media must be turned into a sticker
#[derive(strum::Display, Debug, Clone, Copy, PartialEq, Eq)]
#[strum(serialize_all = "kebab-case")]
pub enum MediaKind {
    /// Still image. The messaging platform turns it into a sticker by itself
    Static,

    /// Video or animation that must go through the [`super::Transcoder`]
    Animated,

    Unsupported,
}

impl MediaKind {
    /// Classifies the MIME type of already downloaded media, such as
    /// `video/mp4`. Parameters like `; charset=binary` are ignored.
    ///
    /// Gifs are animations here. Remote media classified by its
    /// `Content-Type` header alone would treat any `image/*` as static.
    pub fn from_mime(mime: &str) -> Self {
        let essence = mime.split(';').next().unwrap_or_default().trim();
        let essence = essence.to_ascii_lowercase();

        // Webp is already a sticker, but we can't tell whether it's an
        // animated one, so it's not accepted
        match essence.as_str() {
            "image/gif" => Self::Animated,
            "image/webp" => Self::Unsupported,
            _ if essence.starts_with("video/") => Self::Animated,
            _ if essence.starts_with("image/") => Self::Static,
            _ => Self::Unsupported,
        }
    }

    /// Classifies by the file extension
    pub fn from_path(path: &Utf8Path) -> Self {
        let Some(extension) = path.extension() else {
            return Self::Unsupported;
        };

        let mime = match extension.to_ascii_lowercase().as_str() {
            "gif" => "image/gif",
            "webp" => "image/webp",
            "png" => "image/png",
            "jpg" | "jpeg" => "image/jpeg",
            "bmp" => "image/bmp",
            "mp4" | "m4v" => "video/mp4",
            "webm" => "video/webm",
            "mov" => "video/quicktime",
            "mkv" => "video/x-matroska",
            "avi" => "video/x-msvideo",
            "3gp" => "video/3gpp",
            _ => return Self::Unsupported,
        };

        Self::from_mime(mime)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use expect_test::expect;

    #[test]
    fn classify_mimes() {
        let actual = [
            "video/mp4",
            "VIDEO/WebM",
            "image/gif",
            "image/gif; charset=binary",
            "image/jpeg",
            "image/webp",
            "audio/ogg",
            "",
        ]
        .map(|mime| format!("{mime:?} -> {}", MediaKind::from_mime(mime)))
        .join("\n");

        expect![[r#"
            "video/mp4" -> animated
            "VIDEO/WebM" -> animated
            "image/gif" -> animated
            "image/gif; charset=binary" -> animated
            "image/jpeg" -> static
            "image/webp" -> unsupported
            "audio/ogg" -> unsupported
            "" -> unsupported"#]]
        .assert_eq(&actual);
    }

    #[test]
    fn classify_paths() {
        assert_eq!(MediaKind::from_path(Utf8Path::new("a/clip.MP4")), MediaKind::Animated);
        assert_eq!(MediaKind::from_path(Utf8Path::new("cat.gif")), MediaKind::Animated);
        assert_eq!(MediaKind::from_path(Utf8Path::new("cat.png")), MediaKind::Static);
        assert_eq!(MediaKind::from_path(Utf8Path::new("cat.webp")), MediaKind::Unsupported);
        assert_eq!(MediaKind::from_path(Utf8Path::new("README")), MediaKind::Unsupported);
    }
}
