use crate::media::ProbeResult;
use serde::{Serialize, Serializer};
use std::collections::HashSet;
use std::path::Path;
use std::sync::LazyLock;

static IMAGE_EXTENSIONS: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| HashSet::from(["jpeg", "jpg", "png"]));

static VIDEO_EXTENSIONS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    HashSet::from([
        "avi", "flv", "m4p", "m4v", "mkv", "mp4", "mpg", "mov", "ogg", "webm", "wmv",
    ])
});

/// Coarse media type tag stored in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    Image,
    Video,
    Audio,
    Unknown,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Image => "image",
            MediaType::Video => "video",
            MediaType::Audio => "audio",
            MediaType::Unknown => "",
        }
    }
}

impl Serialize for MediaType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub media_type: MediaType,
    pub format: String,
}

impl Classification {
    pub fn unknown() -> Self {
        Self {
            media_type: MediaType::Unknown,
            format: String::new(),
        }
    }
}

pub trait Classifier: Send + Sync {
    fn name(&self) -> &'static str;

    fn classify(&self, path: &Path, probe: Option<&ProbeResult>) -> Classification;
}

/// Classifies from stream flags: video beats audio, everything else is an
/// image. Falls back to the file extension when there is no probe.
pub struct ProbeClassifier;

impl Classifier for ProbeClassifier {
    fn name(&self) -> &'static str {
        "probe"
    }

    fn classify(&self, path: &Path, probe: Option<&ProbeResult>) -> Classification {
        let Some(probe) = probe else {
            return ExtensionClassifier.classify(path, None);
        };

        let media_type = if probe.has_video {
            MediaType::Video
        } else if probe.has_audio {
            MediaType::Audio
        } else {
            MediaType::Image
        };

        Classification {
            media_type,
            format: probe.extension.clone(),
        }
    }
}

/// Classifies from the lower-cased file extension alone.
pub struct ExtensionClassifier;

impl Classifier for ExtensionClassifier {
    fn name(&self) -> &'static str {
        "extension"
    }

    fn classify(&self, path: &Path, _probe: Option<&ProbeResult>) -> Classification {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return Classification::unknown();
        };
        let ext = ext.to_ascii_lowercase();

        let media_type = if IMAGE_EXTENSIONS.contains(ext.as_str()) {
            MediaType::Image
        } else if VIDEO_EXTENSIONS.contains(ext.as_str()) {
            MediaType::Video
        } else {
            return Classification::unknown();
        };

        Classification {
            media_type,
            format: ext,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ClassifierKind {
    #[default]
    Probe,
    Extension,
}

impl ClassifierKind {
    pub fn build(self) -> Box<dyn Classifier> {
        match self {
            ClassifierKind::Probe => Box::new(ProbeClassifier),
            ClassifierKind::Extension => Box::new(ExtensionClassifier),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn probe(has_video: bool, has_audio: bool, extension: &str) -> ProbeResult {
        ProbeResult {
            width: 10,
            height: 10,
            has_video,
            has_audio,
            extension: extension.to_string(),
            title: None,
        }
    }

    #[test]
    fn test_probe_classifier() {
        let path = Path::new("whatever.bin");

        let video = ProbeClassifier.classify(path, Some(&probe(true, true, "mp4")));
        assert_eq!(video.media_type, MediaType::Video);
        assert_eq!(video.format, "mp4");

        let audio = ProbeClassifier.classify(path, Some(&probe(false, true, "mp3")));
        assert_eq!(audio.media_type, MediaType::Audio);
        assert_eq!(audio.format, "mp3");

        let image = ProbeClassifier.classify(path, Some(&probe(false, false, "jpg")));
        assert_eq!(image.media_type, MediaType::Image);
        assert_eq!(image.format, "jpg");
    }

    #[test]
    fn test_probe_classifier_without_probe_uses_extension() {
        let result = ProbeClassifier.classify(Path::new("clip.MKV"), None);
        assert_eq!(result.media_type, MediaType::Video);
        assert_eq!(result.format, "mkv");
    }

    #[test]
    fn test_extension_classifier_image_set() {
        for ext in ["jpeg", "jpg", "png"] {
            let path = format!("photo.{}", ext);
            let result = ExtensionClassifier.classify(Path::new(&path), None);
            assert_eq!(result.media_type, MediaType::Image, "{}", ext);
            assert_eq!(result.format, ext);
        }
    }

    #[test]
    fn test_extension_classifier_video_set() {
        for ext in [
            "avi", "flv", "m4p", "m4v", "mkv", "mp4", "mpg", "mov", "ogg", "webm", "wmv",
        ] {
            let path = format!("clip.{}", ext);
            let result = ExtensionClassifier.classify(Path::new(&path), None);
            assert_eq!(result.media_type, MediaType::Video, "{}", ext);
            assert_eq!(result.format, ext);
        }
    }

    #[test]
    fn test_extension_classifier_unknown() {
        for name in ["notes.txt", "archive.tar.gz", "Makefile", "photo.jpgx", "clip.mp"] {
            let result = ExtensionClassifier.classify(Path::new(name), None);
            assert_eq!(result, Classification::unknown(), "{}", name);
        }
    }

    #[test]
    fn test_extension_classifier_case_insensitive() {
        let upper = ExtensionClassifier.classify(Path::new("A.JPG"), None);
        let lower = ExtensionClassifier.classify(Path::new("a.jpg"), None);
        assert_eq!(upper, lower);
        assert_eq!(upper.media_type, MediaType::Image);
    }

    #[test]
    fn test_extension_classifier_ignores_probe() {
        let result = ExtensionClassifier.classify(Path::new("a.png"), Some(&probe(true, true, "mp4")));
        assert_eq!(result.media_type, MediaType::Image);
    }

    #[test]
    fn test_media_type_serialization() {
        assert_eq!(serde_json::to_string(&MediaType::Image).unwrap(), "\"image\"");
        assert_eq!(serde_json::to_string(&MediaType::Video).unwrap(), "\"video\"");
        assert_eq!(serde_json::to_string(&MediaType::Audio).unwrap(), "\"audio\"");
        assert_eq!(serde_json::to_string(&MediaType::Unknown).unwrap(), "\"\"");
    }

    #[test]
    fn test_classifier_kind_build() {
        assert_eq!(ClassifierKind::Probe.build().name(), "probe");
        assert_eq!(ClassifierKind::Extension.build().name(), "extension");
    }
}
