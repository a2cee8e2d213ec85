use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use super::UploadSource;

/// Stable client-side identity of a tracked upload. Names are for display only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UploadToken(uuid::Uuid);

impl UploadToken {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for UploadToken {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UploadToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum UploadStatus {
    Pending,
    Authorizing,
    Transferring,
    Completed,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrackedUpload {
    pub token: UploadToken,
    pub name: String,
    pub content_type: String,
    pub size: u64,
    /// Percent of bytes handed to the transport; `None` while the total is unknown
    pub progress: Option<f64>,
    pub status: UploadStatus,
    pub attachment_id: Option<String>,
}

impl TrackedUpload {
    fn pending(source: &UploadSource) -> Self {
        Self {
            token: UploadToken::new(),
            name: source.name.clone(),
            content_type: source.content_type.clone(),
            size: source.data.len() as u64,
            progress: None,
            status: UploadStatus::Pending,
            attachment_id: None,
        }
    }

    /// An upload finished in an earlier session, shown alongside new ones.
    pub fn existing(
        name: impl Into<String>,
        content_type: impl Into<String>,
        size: u64,
        attachment_id: impl Into<String>,
    ) -> Self {
        Self {
            token: UploadToken::new(),
            name: name.into(),
            content_type: content_type.into(),
            size,
            progress: Some(100.0),
            status: UploadStatus::Completed,
            attachment_id: Some(attachment_id.into()),
        }
    }
}

/// Percentage of `total` represented by `sent`, or `None` when the total is unknown.
pub fn progress_percent(sent: u64, total: u64) -> Option<f64> {
    if total == 0 {
        return None;
    }
    Some(sent.min(total) as f64 / total as f64 * 100.0)
}

/// Ordered list of tracked uploads, shared between the caller and upload tasks.
///
/// Updates are applied to the entry matching a token under the lock, so
/// concurrent progress reports for different files never overwrite each other.
#[derive(Debug, Clone, Default)]
pub struct UploadTracker {
    inner: Arc<Mutex<Vec<TrackedUpload>>>,
}

impl UploadTracker {
    pub fn new(existing: Vec<TrackedUpload>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(existing)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<TrackedUpload>> {
        // A panicking updater cannot leave an entry half-written; keep going.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Start tracking every source whose name is not tracked yet. Returns, for
    /// each newly tracked source, its index in `sources` and its token.
    pub fn track_new(&self, sources: &[UploadSource]) -> Vec<(usize, UploadToken)> {
        let mut uploads = self.lock();
        let mut names: HashSet<String> = uploads.iter().map(|u| u.name.clone()).collect();

        let mut tracked = Vec::new();
        for (i, source) in sources.iter().enumerate() {
            if !names.insert(source.name.clone()) {
                tracing::debug!(name = %source.name, "Skipping already tracked file");
                continue;
            }
            let upload = TrackedUpload::pending(source);
            tracked.push((i, upload.token));
            uploads.push(upload);
        }
        tracked
    }

    /// Apply `f` to the upload with `token`. Returns false if it is no longer tracked.
    pub fn update(&self, token: UploadToken, f: impl FnOnce(&mut TrackedUpload)) -> bool {
        let mut uploads = self.lock();
        match uploads.iter_mut().find(|u| u.token == token) {
            Some(upload) => {
                f(upload);
                true
            }
            None => false,
        }
    }

    /// Stop tracking the upload at `index`. Its transfer, if any, keeps running.
    pub fn remove(&self, index: usize) -> Option<TrackedUpload> {
        let mut uploads = self.lock();
        (index < uploads.len()).then(|| uploads.remove(index))
    }

    pub fn get(&self, token: UploadToken) -> Option<TrackedUpload> {
        self.lock().iter().find(|u| u.token == token).cloned()
    }

    /// `(name, reason)` for every tracked upload that failed.
    pub fn failures(&self) -> Vec<(String, String)> {
        self.lock()
            .iter()
            .filter_map(|u| match u.status {
                UploadStatus::Failed(ref reason) => Some((u.name.clone(), reason.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn snapshot(&self) -> Vec<TrackedUpload> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn source(name: &str) -> UploadSource {
        UploadSource::new(name, "image/png", Bytes::from_static(b"data"))
    }

    #[test]
    fn test_track_new_deduplicates_by_name() {
        let tracker = UploadTracker::default();

        let first = tracker.track_new(&[source("a.png"), source("a.png")]);
        assert_eq!(first.len(), 1);

        let second = tracker.track_new(&[source("a.png"), source("b.png")]);
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].0, 1);

        let names: Vec<String> = tracker.snapshot().into_iter().map(|u| u.name).collect();
        assert_eq!(names, vec!["a.png", "b.png"]);
    }

    #[test]
    fn test_existing_uploads_count_for_deduplication() {
        let tracker = UploadTracker::new(vec![TrackedUpload::existing(
            "a.png",
            "image/png",
            4,
            "att-1",
        )]);

        assert!(tracker.track_new(&[source("a.png")]).is_empty());
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn test_remove_by_position_keeps_other_entries() {
        let tracker = UploadTracker::default();
        tracker.track_new(&[source("a.png"), source("b.png"), source("c.png")]);
        let before = tracker.snapshot();

        let removed = tracker.remove(1).unwrap();
        assert_eq!(removed.name, "b.png");

        let after = tracker.snapshot();
        assert_eq!(after, vec![before[0].clone(), before[2].clone()]);
        assert!(tracker.remove(5).is_none());
    }

    #[test]
    fn test_update_merges_by_token() {
        let tracker = UploadTracker::default();
        let tokens = tracker.track_new(&[source("a.png"), source("b.png")]);
        let (a, b) = (tokens[0].1, tokens[1].1);

        assert!(tracker.update(a, |u| u.progress = Some(40.0)));
        assert!(tracker.update(b, |u| u.progress = Some(70.0)));

        assert_eq!(tracker.get(a).unwrap().progress, Some(40.0));
        assert_eq!(tracker.get(b).unwrap().progress, Some(70.0));
    }

    #[test]
    fn test_update_after_removal_is_dropped() {
        let tracker = UploadTracker::default();
        let tokens = tracker.track_new(&[source("a.png"), source("b.png")]);
        tracker.remove(0);

        assert!(!tracker.update(tokens[0].1, |u| u.progress = Some(10.0)));
        assert_eq!(tracker.snapshot()[0].name, "b.png");
        assert_eq!(tracker.snapshot()[0].progress, None);
    }

    #[test]
    fn test_failures_count_tracked_uploads_only() {
        let tracker = UploadTracker::default();
        // The duplicate is never tracked, so it cannot fail
        let tokens = tracker.track_new(&[source("a.png"), source("a.png"), source("b.png")]);
        tracker.update(tokens[1].1, |u| {
            u.status = UploadStatus::Failed("File type not allowed".to_string())
        });

        assert_eq!(tracker.len(), 2);
        assert_eq!(
            tracker.failures(),
            vec![("b.png".to_string(), "File type not allowed".to_string())]
        );
    }

    #[test]
    fn test_progress_percent() {
        assert_eq!(progress_percent(0, 200), Some(0.0));
        assert_eq!(progress_percent(50, 200), Some(25.0));
        assert_eq!(progress_percent(300, 200), Some(100.0));
        assert_eq!(progress_percent(10, 0), None);
    }
}
