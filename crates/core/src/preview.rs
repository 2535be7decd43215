//! Social-preview HTML stubs for surveys and assessments.
//!
//! A preview is a tiny static page carrying Open Graph tags so links shared
//! in chat tools unfurl with a title and image, then redirect to the app.

/// Sub-directory of the static root that holds preview files.
pub const PREVIEW_DIR: &str = "preview";

/// Values rendered into a preview page.
#[derive(Debug, Clone)]
pub struct PreviewMeta<'a> {
    pub site_name: &'a str,
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub image: Option<&'a str>,
    /// Where the page redirects to and what `og:url` points at.
    pub url: &'a str,
}

/// File name for a preview key, relative to [`PREVIEW_DIR`].
pub fn preview_file_name(key: &str) -> String {
    format!("{key}.html")
}

/// Render the preview page. Every interpolated value is HTML-escaped.
pub fn render_preview(meta: &PreviewMeta<'_>) -> String {
    let attr = |s: &str| html_escape::encode_double_quoted_attribute(s).into_owned();

    let title = attr(meta.title);
    let site_name = attr(meta.site_name);
    let url = attr(meta.url);

    let mut tags = vec![
        r#"<meta property="og:type" content="website">"#.to_string(),
        format!(r#"<meta property="og:site_name" content="{site_name}">"#),
        format!(r#"<meta property="og:title" content="{title}">"#),
        format!(r#"<meta property="og:url" content="{url}">"#),
    ];
    if let Some(description) = meta.description {
        tags.push(format!(
            r#"<meta property="og:description" content="{}">"#,
            attr(description)
        ));
    }
    if let Some(image) = meta.image {
        tags.push(format!(r#"<meta property="og:image" content="{}">"#, attr(image)));
    }

    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n{}\n\
         <meta http-equiv=\"refresh\" content=\"0; url={url}\">\n</head>\n<body></body>\n</html>\n",
        html_escape::encode_text(meta.title),
        tags.join("\n"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta<'a>(title: &'a str) -> PreviewMeta<'a> {
        PreviewMeta {
            site_name: "LearnHub",
            title,
            description: None,
            image: Some("https://cdn.example.org/og.png"),
            url: "https://learn.example.org/surveys/4",
        }
    }

    #[test]
    fn contains_open_graph_tags() {
        let html = render_preview(&meta("Onboarding survey"));
        assert!(html.contains(r#"<meta property="og:title" content="Onboarding survey">"#));
        assert!(html.contains(r#"og:image" content="https://cdn.example.org/og.png""#));
        assert!(!html.contains("og:description"));
    }

    #[test]
    fn escapes_markup_in_titles() {
        let html = render_preview(&meta(r#"<script>"quiz"</script>"#));
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn file_name_appends_extension() {
        assert_eq!(preview_file_name("abc"), "abc.html");
    }
}
