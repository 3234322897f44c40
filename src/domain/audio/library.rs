/// Clip library: resolves clip names to WAV resources and caches decoded clips
use crate::domain::audio::wav::WavFile;
use crate::domain::shared::{AnnouncerError, ClipRef, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// Clip library rooted at one directory with a fixed file extension
pub struct ClipLibrary {
    base_dir: PathBuf,
    extension: String,
    /// Decoded clips by name
    cache: Mutex<HashMap<String, Arc<WavFile>>>,
}

impl ClipLibrary {
    /// Create library; `extension` is given without the leading dot
    pub fn new<P: AsRef<Path>>(base_dir: P, extension: &str) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
            extension: extension.trim_start_matches('.').to_string(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Resolve a clip name to its file path
    pub fn resolve(&self, clip: &ClipRef) -> Result<PathBuf> {
        let name = clip.name();
        if name.is_empty() || name.contains(['/', '\\']) || name.contains("..") {
            return Err(AnnouncerError::ResourceNotFound(format!(
                "invalid clip name {:?}",
                name
            )));
        }

        let path = self.base_dir.join(format!("{}.{}", name, self.extension));
        if !path.is_file() {
            return Err(AnnouncerError::ResourceNotFound(path.display().to_string()));
        }
        Ok(path)
    }

    /// Load (or fetch from cache) the decoded clip
    pub fn load(&self, clip: &ClipRef) -> Result<Arc<WavFile>> {
        if let Some(wav) = self.cache().get(clip.name()) {
            return Ok(wav.clone());
        }

        let path = self.resolve(clip)?;
        let wav = Arc::new(WavFile::from_file(&path)?);
        debug!(
            "Loaded clip {} ({:?}, {} Hz, {} ch)",
            clip,
            wav.duration(),
            wav.format.sample_rate,
            wav.format.channels
        );

        self.cache().insert(clip.name().to_string(), wav.clone());
        Ok(wav)
    }

    /// Decode every clip in the base directory.
    ///
    /// Unreadable files are skipped with a warning.
    pub fn preload(&self) -> Result<usize> {
        let entries = std::fs::read_dir(&self.base_dir).map_err(|e| {
            AnnouncerError::ResourceNotFound(format!("{}: {}", self.base_dir.display(), e))
        })?;

        let mut count = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) != Some(self.extension.as_str()) {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };

            match self.load(&ClipRef::new(name)) {
                Ok(_) => count += 1,
                Err(e) => warn!("Skipping clip {}: {}", path.display(), e),
            }
        }

        Ok(count)
    }

    /// Number of decoded clips held
    pub fn cached_count(&self) -> usize {
        self.cache().len()
    }

    /// Drop a cached clip so the next load re-reads it
    pub fn evict(&self, clip: &ClipRef) {
        self.cache().remove(clip.name());
    }

    fn cache(&self) -> std::sync::MutexGuard<'_, HashMap<String, Arc<WavFile>>> {
        self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
