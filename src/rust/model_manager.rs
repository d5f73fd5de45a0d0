use std::path::{Path, PathBuf};
use std::fs;
use std::io;
use std::sync::Arc;
use std::env;
use tokio::sync::Mutex;
use sha2::{Sha256, Digest};

/// Environment variable overriding the directory the assets are resolved against.
pub const HOME_ENV: &str = "FOODLENS_HOME";

const WEIGHTS_FILE: &str = "model/model.onnx";
const LABELS_FILE: &str = "food-101/meta/classes.txt";

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Weights file not found: {0}")]
    NotFound(String),
    #[error("Download error: {0}")]
    DownloadError(#[from] reqwest::Error),
    #[error("Download failed with HTTP status {0}")]
    HttpStatus(u16),
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Model verification failed")]
    VerificationFailed,
    #[error("Hash mismatch: expected {expected}, got {actual} for {file_type} file")]
    HashMismatch {
        file_type: String,
        expected: String,
        actual: String,
    },
}

/// A pinned location for the fine-tuned weights.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeightsSource {
    pub url: String,
    /// Lowercase hex SHA-256 of the file
    pub sha256: String,
}

impl WeightsSource {
    pub fn new(url: impl Into<String>, sha256: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            sha256: sha256.into().to_lowercase(),
        }
    }
}

/// Locates the weights file and label list relative to the service, verifies
/// them and fetches pinned weights on request.
///
/// Layout under the base directory:
/// - `model/model.onnx`
/// - `food-101/meta/classes.txt`
#[derive(Debug, Clone)]
pub struct ModelManager {
    base_dir: PathBuf,
    download_lock: Arc<Mutex<()>>,
}

impl ModelManager {
    /// Creates a new ModelManager rooted at the default base directory
    pub fn new_default() -> Self {
        Self::new(Self::get_default_base_dir())
    }

    /// Returns the default base directory. The working directory is never
    /// consulted, so the service behaves the same wherever it is launched from.
    pub fn get_default_base_dir() -> PathBuf {
        // 1. Check environment variable
        if let Ok(path) = env::var(HOME_ENV) {
            return PathBuf::from(path);
        }

        // 2. Directory containing the running executable
        if let Some(dir) = env::current_exe().ok().and_then(|exe| exe.parent().map(Path::to_path_buf)) {
            return dir;
        }

        // 3. Platform-specific data directory
        if let Some(data_dir) = dirs::data_dir() {
            return data_dir.join("foodlens");
        }

        // 4. If all else fails, use system temp directory (platform agnostic)
        env::temp_dir().join("foodlens")
    }

    pub fn new<P: AsRef<Path>>(base_dir: P) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
            download_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn get_weights_path(&self) -> PathBuf {
        self.base_dir.join(WEIGHTS_FILE)
    }

    pub fn get_labels_path(&self) -> PathBuf {
        self.base_dir.join(LABELS_FILE)
    }

    pub fn has_weights(&self) -> bool {
        self.get_weights_path().exists()
    }

    pub fn has_labels(&self) -> bool {
        self.get_labels_path().exists()
    }

    /// True when both startup files are present.
    pub fn is_model_present(&self) -> bool {
        let weights_path = self.get_weights_path();
        let labels_path = self.get_labels_path();
        log::info!("Checking model files:");
        log::info!("  Weights path: {:?} (exists: {})", weights_path, weights_path.exists());
        log::info!("  Labels path: {:?} (exists: {})", labels_path, labels_path.exists());
        weights_path.exists() && labels_path.exists()
    }

    fn hash_bytes(bytes: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        format!("{:x}", hasher.finalize())
    }

    fn verify_file(&self, path: &Path, expected_hash: &str) -> Result<bool, ModelError> {
        log::info!("Verifying file: {:?}", path);
        let bytes = fs::read(path)?;
        let hash = Self::hash_bytes(&bytes);
        log::debug!("Calculated hash: {}", hash);
        log::debug!("Expected hash:   {}", expected_hash);
        Ok(hash == expected_hash.to_lowercase())
    }

    /// Checks the weights file against a SHA-256 digest. A missing file is
    /// reported as `Ok(false)`.
    pub fn verify_weights(&self, expected_hash: &str) -> Result<bool, ModelError> {
        let weights_path = self.get_weights_path();
        if !weights_path.exists() {
            log::info!("Weights file {:?} does not exist", weights_path);
            return Ok(false);
        }
        self.verify_file(&weights_path, expected_hash)
    }

    /// Downloads the weights, checks the digest and moves them into the
    /// managed location. Existing weights are only replaced once the new file
    /// has been written and verified.
    pub async fn download_weights(&self, source: &WeightsSource) -> Result<(), ModelError> {
        let _lock = self.download_lock.lock().await;
        let path = self.get_weights_path();
        log::info!("Downloading weights from {} to {:?}", source.url, path);

        let response = reqwest::get(&source.url).await?;
        log::info!("Download response status: {}", response.status());
        if !response.status().is_success() {
            return Err(ModelError::HttpStatus(response.status().as_u16()));
        }
        let bytes = response.bytes().await?;
        log::info!("Downloaded {} bytes", bytes.len());

        let hash = Self::hash_bytes(&bytes);
        if hash != source.sha256 {
            log::error!("weights hash mismatch: expected {}, got {}", source.sha256, hash);
            return Err(ModelError::HashMismatch {
                file_type: "weights".to_string(),
                expected: source.sha256.clone(),
                actual: hash,
            });
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let staging = path.with_extension("onnx.part");
        fs::write(&staging, &bytes)?;

        if !self.verify_file(&staging, &source.sha256)? {
            let _ = fs::remove_file(&staging);
            return Err(ModelError::VerificationFailed);
        }
        fs::rename(&staging, &path)?;

        log::info!("Weights downloaded and verified successfully");
        Ok(())
    }

    /// Ensures the weights match `source`, downloading them if they are
    /// missing or fail verification.
    pub async fn ensure_weights(&self, source: &WeightsSource) -> Result<PathBuf, ModelError> {
        if self.verify_weights(&source.sha256)? {
            log::info!("Weights verification successful");
        } else {
            log::info!("Weights missing or outdated, downloading...");
            self.download_weights(source).await?;
        }
        Ok(self.get_weights_path())
    }

    /// Returns the weights path, failing if the file is absent.
    pub fn require_weights(&self) -> Result<PathBuf, ModelError> {
        let path = self.get_weights_path();
        if path.exists() {
            Ok(path)
        } else {
            Err(ModelError::NotFound(path.to_string_lossy().to_string()))
        }
    }

    pub fn remove_weights(&self) -> Result<(), ModelError> {
        let weights_path = self.get_weights_path();
        if weights_path.exists() {
            fs::remove_file(&weights_path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EMPTY_SHA256: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = env::temp_dir().join("foodlens-manager-unit").join(name);
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_layout() {
        let manager = ModelManager::new("/srv/foodlens");
        assert_eq!(manager.get_weights_path(), PathBuf::from("/srv/foodlens/model/model.onnx"));
        assert_eq!(
            manager.get_labels_path(),
            PathBuf::from("/srv/foodlens/food-101/meta/classes.txt")
        );
    }

    #[test]
    fn test_verify_weights() {
        let dir = scratch_dir("verify");
        let manager = ModelManager::new(&dir);
        assert!(!manager.verify_weights(EMPTY_SHA256).unwrap());
        assert!(matches!(manager.require_weights(), Err(ModelError::NotFound(_))));

        fs::create_dir_all(dir.join("model")).unwrap();
        fs::write(manager.get_weights_path(), b"").unwrap();
        assert!(manager.verify_weights(EMPTY_SHA256).unwrap());
        assert!(manager.verify_weights(&EMPTY_SHA256.to_uppercase()).unwrap());

        fs::write(manager.get_weights_path(), b"corrupted data").unwrap();
        assert!(!manager.verify_weights(EMPTY_SHA256).unwrap());

        manager.remove_weights().unwrap();
        assert!(!manager.has_weights());
    }

    #[test]
    fn test_source_hash_is_normalized() {
        let source = WeightsSource::new("https://example.invalid/model.onnx", "ABCDEF");
        assert_eq!(source.sha256, "abcdef");
    }

    #[tokio::test]
    async fn test_ensure_weights_skips_download_when_verified() {
        let dir = scratch_dir("ensure");
        let manager = ModelManager::new(&dir);
        fs::create_dir_all(dir.join("model")).unwrap();
        fs::write(manager.get_weights_path(), b"").unwrap();

        // The URL is never contacted because the local file already matches.
        let source = WeightsSource::new("http://127.0.0.1:9/model.onnx", EMPTY_SHA256);
        let path = manager.ensure_weights(&source).await.unwrap();
        assert_eq!(path, manager.get_weights_path());
    }
}
