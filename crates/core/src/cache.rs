use std::{
    hash::{DefaultHasher, Hash, Hasher},
    path::{Path, PathBuf},
};

/// Get the cache directory for a given URL
pub fn get_cache_dir(url: &str) -> PathBuf {
    let mut hasher = DefaultHasher::new();
    url.hash(&mut hasher);
    let url_hash = hasher.finish();
    let cache_dir = get_root_cache_dir();

    cache_dir.join("videos").join(url_hash.to_string())
}

pub fn get_root_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("vidreport")
}

/// Root of the filesystem-backed text storage
pub fn get_storage_dir(root: &Path) -> PathBuf {
    root.join("storage")
}

/// Find a downloaded subtitle file in the cache directory
pub fn find_subtitles_in_cache(cache_dir: &Path) -> Option<PathBuf> {
    let Ok(entries) = std::fs::read_dir(cache_dir) else {
        return None;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if let Some(ext) = path.extension() {
            let ext = ext.to_string_lossy().to_lowercase();
            if ext == "json3" {
                return Some(path);
            }
        }
    }
    None
}

/// Storage key for a persisted transcript
pub fn transcript_key(user_id: &str, job_id: &str) -> String {
    format!("transcripts/{}/{}_transcript.txt", user_id, job_id)
}

/// Storage key for a persisted report envelope
pub fn report_key(user_id: &str, job_id: &str) -> String {
    format!("reports/{}/{}/report.json", user_id, job_id)
}
