//! Writes social-preview pages for surveys and assessments.

use std::path::{Path, PathBuf};

use learnhub_core::preview::{preview_file_name, render_preview, PreviewMeta, PREVIEW_DIR};

use crate::site::SiteConfig;

/// What the preview page describes.
pub struct PreviewTarget<'a> {
    /// App route segment, e.g. `"surveys"`.
    pub section: &'a str,
    pub id: i64,
    pub title: &'a str,
    pub description: Option<&'a str>,
}

/// Write `<static_dir>/preview/<uuid>.html` and return the generated key.
///
/// Failures are logged and yield `None`; a missing preview never fails the
/// request that created the resource.
pub async fn write_preview(
    static_dir: &str,
    site: &SiteConfig,
    target: &PreviewTarget<'_>,
) -> Option<String> {
    let key = uuid::Uuid::new_v4().to_string();
    let url = format!(
        "{}/{}/{}",
        site.base_url.trim_end_matches('/'),
        target.section,
        target.id
    );
    let html = render_preview(&PreviewMeta {
        site_name: &site.site_name,
        title: target.title,
        description: target.description,
        image: site.preview_image.as_deref(),
        url: &url,
    });

    let dir = Path::new(static_dir).join(PREVIEW_DIR);
    let path: PathBuf = dir.join(preview_file_name(&key));

    if let Err(e) = tokio::fs::create_dir_all(&dir).await {
        tracing::warn!(dir = %dir.display(), error = %e, "Failed to create preview directory");
        return None;
    }
    if let Err(e) = tokio::fs::write(&path, html).await {
        tracing::warn!(path = %path.display(), error = %e, "Failed to write preview file");
        return None;
    }

    tracing::debug!(section = target.section, id = target.id, key = %key, "Preview written");
    Some(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn writes_file_under_preview_dir() {
        let dir = tempfile::tempdir().unwrap();
        let site = SiteConfig::default();
        let target = PreviewTarget {
            section: "surveys",
            id: 4,
            title: "Onboarding <feedback>",
            description: None,
        };

        let key = write_preview(dir.path().to_str().unwrap(), &site, &target)
            .await
            .expect("preview should be written");

        let written = std::fs::read_to_string(
            dir.path().join(PREVIEW_DIR).join(preview_file_name(&key)),
        )
        .unwrap();
        assert!(written.contains("/surveys/4"));
        assert!(written.contains("Onboarding &lt;feedback&gt;"));
    }

    #[tokio::test]
    async fn unwritable_root_yields_none() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("not-a-dir");
        std::fs::write(&file, "x").unwrap();

        let target = PreviewTarget {
            section: "assessments",
            id: 1,
            title: "Quiz",
            description: None,
        };
        let key = write_preview(file.to_str().unwrap(), &SiteConfig::default(), &target).await;
        assert!(key.is_none());
    }
}
