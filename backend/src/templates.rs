use shared::{AllowedExtension, MediaKind};
use std::collections::HashMap;
use std::path::Path;

const MEDIA_SLOT: &str = "{{ result_media }}";
const VERDICT_SLOT: &str = "{{ verdict }}";

#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("Failed to read template {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Page {
    Index,
    About,
    Contact,
    Prediction,
    Results,
}

impl Page {
    pub const ALL: [Page; 5] = [
        Page::Index,
        Page::About,
        Page::Contact,
        Page::Prediction,
        Page::Results,
    ];

    pub fn file_name(&self) -> &'static str {
        match self {
            Page::Index => "index.html",
            Page::About => "about.html",
            Page::Contact => "contact.html",
            Page::Prediction => "prediction-page.html",
            Page::Results => "results.html",
        }
    }
}

/// What the results page shows for one run.
#[derive(Debug, Clone)]
pub struct ResultView {
    pub file_url: String,
    pub kind: MediaKind,
    pub drowning: bool,
}

impl ResultView {
    pub fn new(file_url: String, file_name: &str, drowning: bool) -> Self {
        let kind = AllowedExtension::from_filename(file_name)
            .map(|ext| ext.media_kind())
            .unwrap_or(MediaKind::Image);
        Self {
            file_url,
            kind,
            drowning,
        }
    }
}

/// Page templates, read once at startup.
pub struct Templates {
    pages: HashMap<Page, String>,
}

impl Templates {
    pub fn load(dir: &Path) -> Result<Self, TemplateError> {
        let mut pages = HashMap::new();
        for page in Page::ALL {
            let path = dir.join(page.file_name());
            let body = std::fs::read_to_string(&path).map_err(|source| TemplateError::Io {
                path: path.display().to_string(),
                source,
            })?;
            pages.insert(page, body);
        }
        log::info!("Loaded {} templates from {}", pages.len(), dir.display());
        Ok(Self { pages })
    }

    fn raw(&self, page: Page) -> &str {
        self.pages.get(&page).map(String::as_str).unwrap_or_default()
    }

    pub fn render(&self, page: Page) -> String {
        match page {
            Page::Results => self.render_results(None),
            other => self.raw(other).to_string(),
        }
    }

    pub fn render_results(&self, view: Option<&ResultView>) -> String {
        let (media, verdict) = match view {
            Some(view) => (media_html(view), verdict_html(view.drowning)),
            None => (
                String::new(),
                r#"<p class="verdict">Upload an image or video on the prediction page to see results.</p>"#
                    .to_string(),
            ),
        };
        self.raw(Page::Results)
            .replace(MEDIA_SLOT, &media)
            .replace(VERDICT_SLOT, &verdict)
    }
}

fn media_html(view: &ResultView) -> String {
    let src = escape_html(&view.file_url);
    match view.kind {
        MediaKind::Image => format!(r#"<img class="result-media" src="{}" alt="Annotated result">"#, src),
        MediaKind::Video => format!(
            r#"<video class="result-media" src="{}" controls autoplay muted></video>"#,
            src
        ),
    }
}

fn verdict_html(drowning: bool) -> String {
    if drowning {
        r#"<p class="verdict verdict--alert">Drowning detected</p>"#.to_string()
    } else {
        r#"<p class="verdict verdict--clear">No drowning detected</p>"#.to_string()
    }
}

pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn templates() -> Templates {
        let dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("templates");
        Templates::load(&dir).unwrap()
    }

    #[test]
    fn loads_every_page() {
        let templates = templates();
        for page in Page::ALL {
            assert!(templates.render(page).contains("<html"), "{:?}", page);
        }
    }

    #[test]
    fn missing_directory_is_reported() {
        let err = Templates::load(Path::new("/nonexistent/templates"))
            .err()
            .unwrap();
        assert!(err.to_string().contains("index.html"));
    }

    #[test]
    fn static_results_page_has_no_slots_left() {
        let page = templates().render(Page::Results);
        assert!(!page.contains(MEDIA_SLOT));
        assert!(!page.contains(VERDICT_SLOT));
        assert!(!page.contains("verdict--"));
    }

    #[test]
    fn video_results_use_video_element() {
        let view = ResultView::new("/static/predictions/r/clip.mp4".into(), "clip.mp4", true);
        let page = templates().render_results(Some(&view));
        assert!(page.contains(r#"<video class="result-media" src="/static/predictions/r/clip.mp4""#));
        assert!(page.contains("verdict--alert"));
    }

    #[test]
    fn image_results_use_img_element() {
        let view = ResultView::new("/static/predictions/r/a.png".into(), "a.png", false);
        let page = templates().render_results(Some(&view));
        assert!(page.contains(r#"<img class="result-media" src="/static/predictions/r/a.png""#));
        assert!(page.contains("verdict--clear"));
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(
            escape_html(r#"<a href="x">'&'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;&#x27;&amp;&#x27;&lt;/a&gt;"
        );
    }
}
