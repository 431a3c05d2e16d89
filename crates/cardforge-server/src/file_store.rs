//! Filesystem-backed store for uploaded and generated images.
//!
//! Files live under a single upload root and are addressed externally by
//! logical URLs of the form `/data/upload/<subpath>/<filename>`.  Every
//! resolved URL is containment-checked against the root so a crafted path can
//! never escape it.

use std::path::{Component, Path, PathBuf};

use tokio::fs;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::ServerError;

/// Result of a successful [`FileStore::save`].
#[derive(Debug, Clone)]
pub struct SavedFile {
    /// Logical URL clients use to reference the file.
    pub url: String,
    /// Physical path on disk.
    pub path: PathBuf,
    /// Stored (generated) file name.
    pub filename: String,
}

#[derive(Debug, Clone)]
pub struct FileStore {
    upload_root: PathBuf,
    data_root: PathBuf,
    max_size: usize,
    allowed_extensions: Vec<String>,
}

impl FileStore {
    pub async fn new(
        upload_root: PathBuf,
        max_size: usize,
        allowed_extensions: Vec<String>,
    ) -> Result<Self, ServerError> {
        fs::create_dir_all(&upload_root).await.map_err(|e| {
            ServerError::Internal(format!(
                "Failed to create upload directory '{}': {}",
                upload_root.display(),
                e
            ))
        })?;

        info!(path = %upload_root.display(), "File store initialized");

        // `/data/...` URLs are rooted one level above the upload directory,
        // mirroring the `<data>/upload` layout.
        let data_root = upload_root
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| upload_root.clone());

        Ok(Self {
            upload_root,
            data_root,
            max_size,
            allowed_extensions,
        })
    }

    pub fn upload_root(&self) -> &Path {
        &self.upload_root
    }

    /// Root directory served under `/data`.
    pub fn data_root(&self) -> &Path {
        &self.data_root
    }

    /// Store an uploaded file under a generated unique name.
    ///
    /// The extension must be in the allowed set and the content must not
    /// exceed the configured maximum size.  `subdirectory` (if any) nests the
    /// file under the upload root; `prefix` is prepended to the generated
    /// file name.
    pub async fn save(
        &self,
        data: &[u8],
        original_filename: &str,
        subdirectory: Option<&str>,
        prefix: Option<&str>,
    ) -> Result<SavedFile, ServerError> {
        let extension = file_extension(original_filename);
        let allowed = extension
            .as_deref()
            .map(|ext| self.allowed_extensions.iter().any(|a| a == ext))
            .unwrap_or(false);
        if !allowed {
            return Err(ServerError::UnsupportedMedia(format!(
                "'{}' (allowed: {})",
                original_filename,
                self.allowed_extensions.join(", ")
            )));
        }

        if data.len() > self.max_size {
            return Err(ServerError::FileTooLarge {
                size: data.len(),
                max: self.max_size,
            });
        }

        let target_dir = match subdirectory.filter(|s| !s.is_empty()) {
            Some(sub) => self.full_path(sub)?,
            None => self.upload_root.clone(),
        };
        fs::create_dir_all(&target_dir)
            .await
            .map_err(|e| ServerError::Internal(format!("Failed to create directory: {e}")))?;

        let filename = match &extension {
            Some(ext) => format!("{}{}.{}", prefix.unwrap_or(""), Uuid::new_v4(), ext),
            None => format!("{}{}", prefix.unwrap_or(""), Uuid::new_v4()),
        };
        let path = target_dir.join(&filename);

        fs::write(&path, data)
            .await
            .map_err(|e| ServerError::Internal(format!("Failed to write file: {e}")))?;

        let url = self.url_for(&path);
        debug!(url = %url, size = data.len(), "Stored file");

        Ok(SavedFile {
            url,
            path,
            filename,
        })
    }

    /// Map a logical URL back to a physical path inside the upload root.
    ///
    /// Returns `None` when the URL cannot be resolved: unknown prefix, a path
    /// that would escape the root, or a file that does not exist.
    pub fn resolve(&self, url: &str) -> Option<PathBuf> {
        let mut rest = strip_scheme_and_host(url);

        for prefix in ["/data/upload/", "/data/upload", "/data/", "/"] {
            if let Some(stripped) = rest.strip_prefix(prefix) {
                rest = stripped;
                break;
            }
        }
        rest = rest.strip_prefix("upload/").unwrap_or(rest);

        if rest.is_empty() {
            return None;
        }

        let mut resolved = self.upload_root.clone();
        for component in Path::new(rest).components() {
            match component {
                Component::Normal(c) => resolved.push(c),
                // Anything that walks upward is treated as unresolvable.
                Component::ParentDir => return None,
                _ => {}
            }
        }

        if resolved.exists() {
            Some(resolved)
        } else {
            None
        }
    }

    /// Best-effort file removal.  A missing file (or any I/O failure) is a
    /// no-op reported as `false`, never an error for the caller.
    pub async fn delete(&self, path: &Path) -> bool {
        if !path.exists() {
            return false;
        }
        match fs::remove_file(path).await {
            Ok(()) => {
                debug!(path = %path.display(), "Deleted file");
                true
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to delete file");
                false
            }
        }
    }

    /// Resolve a logical URL and best-effort-delete the file behind it.
    pub async fn delete_url(&self, url: &str) -> bool {
        match self.resolve(url) {
            Some(path) => self.delete(&path).await,
            None => false,
        }
    }

    /// Relocate the file behind `url` into `dest_rel` (relative to the upload
    /// root), preserving the file name.  On collision a numeric suffix is
    /// appended before the extension.  Returns the new logical URL, or
    /// `Ok(None)` when the source URL does not resolve to a file.
    pub async fn move_into(
        &self,
        url: &str,
        dest_rel: &str,
    ) -> Result<Option<String>, ServerError> {
        let Some(src) = self.resolve(url) else {
            return Ok(None);
        };

        let dest_dir = self.full_path(dest_rel)?;
        fs::create_dir_all(&dest_dir)
            .await
            .map_err(|e| ServerError::Internal(format!("Failed to create directory: {e}")))?;

        let file_name = src
            .file_name()
            .ok_or_else(|| ServerError::Internal(format!("Invalid source path: {url}")))?
            .to_os_string();

        // Already in place: nothing to move.
        if src.parent() == Some(dest_dir.as_path()) {
            return Ok(Some(self.url_for(&src)));
        }

        let mut candidate = dest_dir.join(&file_name);
        if candidate.exists() {
            let stem = Path::new(&file_name)
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("file")
                .to_string();
            let ext = Path::new(&file_name)
                .extension()
                .and_then(|s| s.to_str())
                .map(|e| format!(".{e}"))
                .unwrap_or_default();

            let mut n = 1;
            loop {
                candidate = dest_dir.join(format!("{stem}_{n}{ext}"));
                if !candidate.exists() {
                    break;
                }
                n += 1;
            }
        }

        fs::rename(&src, &candidate)
            .await
            .map_err(|e| ServerError::Internal(format!("Failed to move file: {e}")))?;

        let new_url = self.url_for(&candidate);
        debug!(from = %url, to = %new_url, "Relocated file");
        Ok(Some(new_url))
    }

    /// Build a containment-checked physical path for a caller-supplied
    /// relative path.  Rejects upward traversal with a 403-mapped error.
    pub fn full_path(&self, rel: &str) -> Result<PathBuf, ServerError> {
        resolve_within(&self.upload_root, rel)
    }

    /// Same containment check rooted at the `/data` directory.
    pub fn data_path(&self, rel: &str) -> Result<PathBuf, ServerError> {
        resolve_within(&self.data_root, rel)
    }

    /// Logical URL for a physical path under the upload root.
    fn url_for(&self, path: &Path) -> String {
        let rel = path
            .strip_prefix(&self.upload_root)
            .unwrap_or(path)
            .components()
            .filter_map(|c| match c {
                Component::Normal(s) => s.to_str(),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("/");
        format!("/data/upload/{rel}")
    }
}

/// Build `base/rel`, stripping root/current-dir markers and rejecting any
/// parent-dir component.
fn resolve_within(base: &Path, rel: &str) -> Result<PathBuf, ServerError> {
    let mut resolved = base.to_path_buf();
    for component in Path::new(rel).components() {
        match component {
            Component::Normal(c) => resolved.push(c),
            Component::ParentDir => {
                return Err(ServerError::Forbidden("Path traversal detected".to_string()));
            }
            _ => {} // RootDir, CurDir, Prefix — skip
        }
    }
    Ok(resolved)
}

/// Lowercased file extension, if any.
fn file_extension(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
}

/// Drop an `http(s)://host` prefix, keeping only the path part.
fn strip_scheme_and_host(url: &str) -> &str {
    for scheme in ["http://", "https://"] {
        if let Some(rest) = url.strip_prefix(scheme) {
            return rest.find('/').map(|i| &rest[i..]).unwrap_or("");
        }
    }
    url
}

/// Reduce a user-supplied value to a safe directory name: keep alphanumerics,
/// spaces, hyphens and underscores, then collapse spaces to underscores.
/// Falls back to `fallback` when nothing survives.
pub fn sanitize_component(raw: &str, fallback: &str) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect();
    let cleaned = cleaned.trim().replace(' ', "_");

    if cleaned.is_empty() {
        fallback.to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn test_store() -> (FileStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(
            dir.path().join("upload"),
            1024 * 1024,
            vec!["png".to_string(), "jpg".to_string()],
        )
        .await
        .unwrap();
        (store, dir)
    }

    #[tokio::test]
    async fn test_save_and_resolve() {
        let (store, _dir) = test_store().await;

        let saved = store.save(b"png-bytes", "char.png", None, None).await.unwrap();
        assert!(saved.url.starts_with("/data/upload/"));
        assert!(saved.filename.ends_with(".png"));

        let path = store.resolve(&saved.url).expect("should resolve");
        assert_eq!(std::fs::read(path).unwrap(), b"png-bytes");
    }

    #[tokio::test]
    async fn test_save_into_subdirectory() {
        let (store, _dir) = test_store().await;

        let saved = store
            .save(b"data", "bg.jpg", Some("staging"), None)
            .await
            .unwrap();
        assert!(saved.url.starts_with("/data/upload/staging/"));
        assert!(saved.path.starts_with(store.upload_root().join("staging")));
    }

    #[tokio::test]
    async fn test_save_rejects_bad_extension() {
        let (store, _dir) = test_store().await;

        let err = store.save(b"#!/bin/sh", "evil.sh", None, None).await.unwrap_err();
        assert!(matches!(err, ServerError::UnsupportedMedia(_)));

        let err = store.save(b"data", "no_extension", None, None).await.unwrap_err();
        assert!(matches!(err, ServerError::UnsupportedMedia(_)));
    }

    #[tokio::test]
    async fn test_save_rejects_oversized_content() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().join("upload"), 8, vec!["png".to_string()])
            .await
            .unwrap();

        let err = store
            .save(b"way too many bytes", "big.png", None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ServerError::FileTooLarge { size: 18, max: 8 }));
    }

    #[tokio::test]
    async fn test_resolve_rejects_traversal() {
        let (store, dir) = test_store().await;

        // Plant a file outside the upload root.
        std::fs::write(dir.path().join("secret.txt"), b"secret").unwrap();

        assert!(store.resolve("/data/upload/../secret.txt").is_none());
        assert!(store.resolve("/data/../../etc/passwd").is_none());
    }

    #[tokio::test]
    async fn test_resolve_strips_known_prefixes() {
        let (store, _dir) = test_store().await;

        let saved = store.save(b"data", "a.png", None, None).await.unwrap();

        let full = format!("http://localhost:8000{}", saved.url);
        assert_eq!(store.resolve(&full), Some(saved.path.clone()));
        assert_eq!(store.resolve(&saved.url), Some(saved.path.clone()));
        assert_eq!(
            store.resolve(&format!("upload/{}", saved.filename)),
            Some(saved.path.clone())
        );

        assert!(store.resolve("/data/upload/missing.png").is_none());
        assert!(store.resolve("").is_none());
    }

    #[tokio::test]
    async fn test_delete_is_best_effort() {
        let (store, _dir) = test_store().await;

        let saved = store.save(b"data", "a.png", None, None).await.unwrap();
        assert!(store.delete(&saved.path).await);
        assert!(!store.delete(&saved.path).await);
        assert!(!store.delete_url("/data/upload/never-existed.png").await);
    }

    #[tokio::test]
    async fn test_move_into_relocates_and_rewrites_url() {
        let (store, _dir) = test_store().await;

        let saved = store.save(b"data", "char.png", None, None).await.unwrap();
        let moved = store
            .move_into(&saved.url, "My_Series/7")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(moved, format!("/data/upload/My_Series/7/{}", saved.filename));
        assert!(!saved.path.exists());
        assert!(store.resolve(&moved).is_some());
    }

    #[tokio::test]
    async fn test_move_into_collision_appends_suffix() {
        let (store, _dir) = test_store().await;

        let saved = store.save(b"new", "char.png", None, None).await.unwrap();

        // Occupy the destination name.
        let dest_dir = store.upload_root().join("s/1");
        std::fs::create_dir_all(&dest_dir).unwrap();
        std::fs::write(dest_dir.join(&saved.filename), b"old").unwrap();

        let moved = store.move_into(&saved.url, "s/1").await.unwrap().unwrap();

        let stem = saved.filename.trim_end_matches(".png");
        assert_eq!(moved, format!("/data/upload/s/1/{stem}_1.png"));
        assert_eq!(
            std::fs::read(store.resolve(&moved).unwrap()).unwrap(),
            b"new"
        );
    }

    #[tokio::test]
    async fn test_move_into_same_destination_is_noop() {
        let (store, _dir) = test_store().await;

        let saved = store.save(b"data", "a.png", Some("s/1"), None).await.unwrap();
        let moved = store.move_into(&saved.url, "s/1").await.unwrap().unwrap();

        assert_eq!(moved, saved.url);
        assert!(saved.path.exists());
    }

    #[tokio::test]
    async fn test_move_into_unresolvable_source_is_none() {
        let (store, _dir) = test_store().await;
        let moved = store.move_into("/data/upload/gone.png", "s/1").await.unwrap();
        assert!(moved.is_none());
    }

    #[test]
    fn test_sanitize_component() {
        assert_eq!(sanitize_component("My Series", "default"), "My_Series");
        assert_eq!(sanitize_component("a/b\\c..d", "default"), "abcd");
        assert_eq!(sanitize_component("  ", "default"), "default");
        assert_eq!(sanitize_component("!!!", "42"), "42");
        assert_eq!(sanitize_component("No-7_ok", "default"), "No-7_ok");
    }
}
