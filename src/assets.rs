//! Asset resolution – maps relative `src`/`href`/`url()` references in card
//! templates to URLs the rasterizer can load.

use std::path::{Component, Path, PathBuf};

use base64::{engine::general_purpose::STANDARD as BASE64_STD, Engine as _};

use crate::fs::FileSystem;

/// Resolves a reference relative to the project root. `None` leaves the
/// reference untouched in the rendered HTML.
pub trait AssetResolver {
    fn resolve(&self, root: &Path, relative: &str) -> Option<String>;

    /// Distinguishes resolvers whose output differs, so rendered cards are
    /// not shared between them.
    fn kind(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Join `relative` onto `root`, rejecting paths that climb out of it.
pub fn join_within(root: &Path, relative: &str) -> Option<PathBuf> {
    let relative = relative.split(['?', '#']).next().unwrap_or(relative);
    let rel = Path::new(relative);
    if rel.is_absolute() {
        return None;
    }
    let mut depth = 0usize;
    for component in rel.components() {
        match component {
            Component::Normal(_) => depth += 1,
            Component::CurDir => {}
            Component::ParentDir => {
                if depth == 0 {
                    return None;
                }
                depth -= 1;
            }
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(root.join(rel))
}

/// Resolves to `file://` URLs without checking existence.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileUrlAssetResolver;

impl AssetResolver for FileUrlAssetResolver {
    fn resolve(&self, root: &Path, relative: &str) -> Option<String> {
        let path = join_within(root, relative)?;
        let path = path.to_string_lossy().replace('\\', "/");
        if path.starts_with('/') {
            Some(format!("file://{path}"))
        } else {
            Some(format!("file:///{path}"))
        }
    }
}

/// Inlines assets as base64 `data:` URIs so the rendered HTML is
/// self-contained. Unreadable files resolve to `None`.
pub struct DataUriAssetResolver<'a> {
    fs: &'a dyn FileSystem,
}

impl<'a> DataUriAssetResolver<'a> {
    pub fn new(fs: &'a dyn FileSystem) -> Self {
        Self { fs }
    }
}

impl AssetResolver for DataUriAssetResolver<'_> {
    fn resolve(&self, root: &Path, relative: &str) -> Option<String> {
        let path = join_within(root, relative)?;
        match self.fs.read_binary(&path) {
            Ok(bytes) => Some(format!(
                "data:{};base64,{}",
                mime_for(&path),
                BASE64_STD.encode(bytes)
            )),
            Err(e) => {
                log::warn!("Asset '{relative}' not resolved: {e}");
                None
            }
        }
    }
}

fn mime_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "css" => "text/css",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "otf" => "font/otf",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFileSystem;

    #[test]
    fn join_rejects_escapes() {
        let root = Path::new("/project");
        assert_eq!(
            join_within(root, "img/a.png"),
            Some(PathBuf::from("/project/img/a.png"))
        );
        assert_eq!(
            join_within(root, "img/../b.png"),
            Some(PathBuf::from("/project/img/../b.png"))
        );
        assert_eq!(join_within(root, "../secret.png"), None);
        assert_eq!(join_within(root, "/etc/passwd"), None);
    }

    #[test]
    fn file_urls() {
        let url = FileUrlAssetResolver.resolve(Path::new("/project"), "art/x.png?v=2");
        assert_eq!(url.as_deref(), Some("file:///project/art/x.png"));
    }

    #[test]
    fn data_uris_inline_file_bytes() {
        let fs = MemoryFileSystem::new();
        fs.add("/project/art/dot.png", vec![1u8, 2, 3]);
        let resolver = DataUriAssetResolver::new(&fs);
        assert_eq!(
            resolver.resolve(Path::new("/project"), "art/dot.png").as_deref(),
            Some("data:image/png;base64,AQID")
        );
        assert_eq!(resolver.resolve(Path::new("/project"), "art/missing.png"), None);
    }
}
