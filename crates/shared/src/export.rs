use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use scraper::{Html, Selector};

use crate::error::{AssistantError, Result};

pub struct DocumentExporter;

impl DocumentExporter {
    /// `<title with underscores>_<YYYY-MM-DD>`, without extension.
    pub fn document_filename(title: &str, date: NaiveDate) -> String {
        format!("{}_{}", title.replace(' ', "_"), date.format("%Y-%m-%d"))
    }

    fn content_lines(content: &str) -> impl Iterator<Item = &str> {
        content
            .split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line))
    }

    /// Standalone HTML document: the title as heading, one paragraph per line.
    pub fn render_document(content: &str, title: &str) -> String {
        let mut html = String::new();

        html.push_str("<!DOCTYPE html>\n<html>\n<head>\n");
        html.push_str("  <meta charset=\"UTF-8\">\n");
        html.push_str("  <meta name=\"generator\" content=\"Content Assistant\">\n");
        html.push_str(&format!("  <title>{}</title>\n", Self::escape_html(title)));
        html.push_str("  <style>\n");
        html.push_str("    body { font-family: Calibri, Arial, sans-serif; font-size: 11pt; max-width: 800px; margin: 40px auto; padding: 0 20px; }\n");
        html.push_str("    h1 { font-family: 'Calibri Light', Arial, sans-serif; font-size: 16pt; color: #004B87; text-align: center; margin: 24px 0 12px 0; }\n");
        html.push_str("    p { margin: 0 0 6px 0; min-height: 1em; white-space: pre-wrap; }\n");
        html.push_str("  </style>\n");
        html.push_str("</head>\n<body>\n");

        html.push_str(&format!("<h1>{}</h1>\n", Self::escape_html(title)));
        html.push_str("<section class=\"document-body\">\n");
        for line in Self::content_lines(content) {
            html.push_str(&format!("<p>{}</p>\n", Self::escape_html(line)));
        }
        html.push_str("</section>\n");

        html.push_str("</body>\n</html>\n");
        html
    }

    /// Paragraph texts of a document produced by [`Self::render_document`].
    pub fn read_document_lines(html: &str) -> Result<Vec<String>> {
        let selector = Selector::parse("section.document-body > p")
            .map_err(|e| AssistantError::Export(format!("invalid selector: {}", e)))?;

        let document = Html::parse_document(html);
        Ok(document
            .select(&selector)
            .map(|p| p.text().collect::<String>())
            .collect())
    }

    /// Minimal print page with the literal content in a monospace block.
    pub fn render_print_view(content: &str) -> String {
        format!(
            "<html><head><title>Print Content</title><style>\
             body {{ font-family: 'Courier Prime', monospace; margin: 20px; color: #333; }} \
             pre {{ white-space: pre-wrap; word-wrap: break-word; }}\
             </style></head><body><pre>{}</pre></body></html>\n",
            Self::escape_html(content)
        )
    }

    pub fn save_document(
        content: &str,
        title: &str,
        dir: &Path,
        date: NaiveDate,
    ) -> Result<PathBuf> {
        let filename = format!("{}.html", Self::document_filename(title, date));
        Self::write(dir, &filename, &Self::render_document(content, title))
    }

    pub fn save_print_view(
        content: &str,
        title: &str,
        dir: &Path,
        date: NaiveDate,
    ) -> Result<PathBuf> {
        let filename = format!("{}_print.html", Self::document_filename(title, date));
        Self::write(dir, &filename, &Self::render_print_view(content))
    }

    fn write(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
        fs::create_dir_all(dir).map_err(|e| {
            AssistantError::Export(format!("failed to create {}: {}", dir.display(), e))
        })?;

        let filepath = dir.join(filename);
        fs::write(&filepath, content).map_err(|e| {
            AssistantError::Export(format!("failed to write {}: {}", filepath.display(), e))
        })?;

        Ok(filepath)
    }

    fn escape_html(text: &str) -> String {
        text.replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;")
            .replace('"', "&quot;")
            .replace('\'', "&#39;")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, 1).unwrap()
    }

    #[test]
    fn test_document_filename() {
        assert_eq!(
            DocumentExporter::document_filename("Press Note Draft", date()),
            "Press_Note_Draft_2026-02-01"
        );
    }

    #[test]
    fn test_round_trip_preserves_lines() {
        let content = "CARACAS, February 1\n\n  Indented line\nRates & <prices> \"held\"\nIt's final";
        let html = DocumentExporter::render_document(content, "Press Note Draft");
        let lines = DocumentExporter::read_document_lines(&html).unwrap();

        let expected: Vec<&str> = content.split('\n').collect();
        assert_eq!(lines, expected);
    }

    #[test]
    fn test_round_trip_normalizes_crlf() {
        let html = DocumentExporter::render_document("one\r\ntwo", "T");
        assert_eq!(
            DocumentExporter::read_document_lines(&html).unwrap(),
            vec!["one", "two"]
        );
    }

    #[test]
    fn test_document_heading_is_title() {
        let html = DocumentExporter::render_document("body", "News Summary");
        assert!(html.contains("<h1>News Summary</h1>"));
        assert!(html.contains("<title>News Summary</title>"));
    }

    #[test]
    fn test_escape_html_combined() {
        assert_eq!(
            DocumentExporter::escape_html("<a href=\"test\">Click & Go</a>"),
            "&lt;a href=&quot;test&quot;&gt;Click &amp; Go&lt;/a&gt;"
        );
    }

    #[test]
    fn test_print_view_wraps_content_in_pre() {
        let html = DocumentExporter::render_print_view("line 1\n  line <2>");
        assert!(html.contains("<pre>line 1\n  line &lt;2&gt;</pre>"));
        assert!(html.contains("monospace"));
        assert!(html.contains("white-space: pre-wrap"));
    }

    #[test]
    fn test_save_document_writes_named_file() {
        let dir = tempfile::tempdir().unwrap();
        let path =
            DocumentExporter::save_document("a\nb", "News Summary", dir.path(), date()).unwrap();

        assert_eq!(
            path.file_name().and_then(|n| n.to_str()),
            Some("News_Summary_2026-02-01.html")
        );
        let written = fs::read_to_string(&path).unwrap();
        assert_eq!(
            DocumentExporter::read_document_lines(&written).unwrap(),
            vec!["a", "b"]
        );
    }

    #[test]
    fn test_save_print_view() {
        let dir = tempfile::tempdir().unwrap();
        let path =
            DocumentExporter::save_print_view("text", "Press Note Draft", dir.path(), date())
                .unwrap();
        assert!(path.ends_with("Press_Note_Draft_2026-02-01_print.html"));
    }
}
