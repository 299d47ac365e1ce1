use scraper::{ElementRef, Html, Selector};
use url::Url;

pub struct HtmlResult {
    pub title: Option<String>,
    pub article_text: String,
    pub links: Vec<Url>,
}

/// Candidate containers for the paragraph-density heuristic. `body` is
/// always scored too, as the fallback when the DOM has no nested
/// container worth distinguishing.
const CONTAINER_TAGS: &[&str] = &["div", "article", "section", "main", "body"];

pub fn parse_html(html_str: &str, base_url: &Url) -> HtmlResult {
    let document = Html::parse_document(html_str);

    let title = selector("title")
        .and_then(|s| document.select(&s).next())
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty());

    let article_text = dominant_paragraph_text(&document);
    let links = extract_links(&document, base_url);

    HtmlResult {
        title,
        article_text,
        links,
    }
}

fn selector(s: &str) -> Option<Selector> {
    Selector::parse(s).ok()
}

/// Score every candidate container by the ratio of its descendant `<p>`
/// text to its total descendant text, and return the text of the
/// highest scorer. Ties favor the longer paragraph text.
fn dominant_paragraph_text(document: &Html) -> String {
    let Some(p_sel) = selector("p") else {
        return String::new();
    };

    let mut best_score = -1.0f64;
    let mut best_text = String::new();

    for tag in CONTAINER_TAGS {
        let Some(sel) = selector(tag) else { continue };
        for container in document.select(&sel) {
            let total_len = normalize(&container.text().collect::<String>()).len();
            if total_len == 0 {
                continue;
            }
            let paragraph_text: String = container
                .select(&p_sel)
                .map(|p| p.text().collect::<String>())
                .collect::<Vec<_>>()
                .join(" ");
            let paragraph_text = normalize(&paragraph_text);
            if paragraph_text.is_empty() {
                continue;
            }
            let density = paragraph_text.len() as f64 / total_len as f64;
            if density > best_score
                || (density == best_score && paragraph_text.len() > best_text.len())
            {
                best_score = density;
                best_text = paragraph_text;
            }
        }
    }

    if best_text.is_empty() {
        // No paragraph-bearing container found; fall back to whole-body text.
        if let Some(sel) = selector("body") {
            if let Some(body) = document.select(&sel).next() {
                return normalize(&body.text().collect::<String>());
            }
        }
    }
    best_text
}

fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn extract_links(document: &Html, base_url: &Url) -> Vec<Url> {
    let Some(sel) = selector("a[href]") else {
        return vec![];
    };

    document
        .select(&sel)
        .filter_map(|el: ElementRef| {
            let href = el.value().attr("href")?;
            if href.starts_with("javascript:")
                || href.starts_with("mailto:")
                || href.starts_with("tel:")
                || href.starts_with('#')
            {
                return None;
            }
            base_url.join(href).ok()
        })
        .collect()
}
