use std::path::Path;

/// A file picked for upload, read fully into memory.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let content_type = content_type_for(&file_name).to_string();
        Self {
            file_name,
            content_type,
            bytes,
        }
    }

    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self::new(file_name, bytes))
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Extension used for the stored object name, falls back to `bin`.
    pub fn extension(&self) -> String {
        Path::new(&self.file_name)
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .filter(|ext| !ext.is_empty())
            .unwrap_or_else(|| String::from("bin"))
    }
}

fn content_type_for(file_name: &str) -> &'static str {
    let extension = Path::new(file_name)
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase());

    match extension.as_deref() {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("heic") => "image/heic",
        Some("pdf") => "application/pdf",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_from_extension() {
        assert_eq!(UploadFile::new("IMG_2919.JPG", vec![1]).content_type, "image/jpeg");
        assert_eq!(UploadFile::new("granny.pdf", vec![1]).content_type, "application/pdf");
        assert_eq!(
            UploadFile::new("notes", vec![1]).content_type,
            "application/octet-stream"
        );
    }

    #[test]
    fn test_extension_is_lowercased_with_fallback() {
        assert_eq!(UploadFile::new("Beanie.PNG", vec![]).extension(), "png");
        assert_eq!(UploadFile::new("README", vec![]).extension(), "bin");
    }

    #[test]
    fn test_from_path_reads_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cactus.webp");
        std::fs::write(&path, b"webp-bytes").unwrap();

        let file = UploadFile::from_path(&path).unwrap();

        assert_eq!(file.file_name, "cactus.webp");
        assert_eq!(file.content_type, "image/webp");
        assert_eq!(file.bytes, b"webp-bytes");
        assert!(!file.is_empty());
    }
}
