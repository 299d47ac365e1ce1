pub mod entities;
pub mod html;
pub mod summary;
pub mod wapp;

use tracing::debug;
use url::Url;

use onioncrawl_core::{md5_fingerprint, FetchResponse, PageRecord};

/// Parsed result of one fetch: the record to persist (if the title gate
/// passed) plus the links discovered on the page, for the caller to feed
/// back into the dispatch queue.
pub struct Extraction {
    pub record: PageRecord,
    pub links: Vec<Url>,
}

/// Runs the full extraction pipeline over a single fetch response.
/// Returns `None` when the title gate drops the page (spec.md §4.F step 1
/// / §3 invariant 1: no persisted record may have an empty title).
pub fn extract(resp: &FetchResponse) -> Option<Extraction> {
    let raw_body = String::from_utf8_lossy(&resp.body);
    let html_result = html::parse_html(&raw_body, &resp.url);

    let title = html_result.title.filter(|t| !t.is_empty())?;

    let article_text = html_result.article_text;
    let domain = resp
        .url
        .host_str()
        .unwrap_or("unknown")
        .trim_end_matches(".onion")
        .to_string();
    let fingerprint = md5_fingerprint(&article_text);
    let is_home_page = matches!(resp.url.path(), "" | "/");

    let key_points = summary::key_points(&title, &article_text);
    let keywords = summary::keywords(&article_text);
    let attributes = entities::extract_attributes(&raw_body);

    // Informational only (spec §4.F step 8) — never persisted as an attribute.
    let onion_mentions = entities::extract_onion_mentions(&raw_body);
    if !onion_mentions.is_empty() {
        debug!(url = %resp.url, count = onion_mentions.len(), ?onion_mentions, "onion mentions found");
    }

    // Tech fingerprint only attempted for home pages (invariant 3);
    // failure to find anything just leaves `wapp` empty, never fatal.
    let wapp = if is_home_page {
        let techs = wapp::fingerprint(&resp.headers, &raw_body);
        serde_json::to_string(&techs).unwrap_or_default()
    } else {
        String::new()
    };

    let (language, lang_confidence) = detect_language(&article_text);

    let now = resp.fetched_at;
    let record = PageRecord {
        url: resp.url.to_string(),
        title,
        summary: article_text,
        key_points,
        keywords,
        domain,
        is_home_page,
        status: resp.status,
        language,
        lang_confidence,
        fingerprint,
        wapp,
        attributes,
        created_at: now,
        updated_at: now,
    };

    Some(Extraction {
        record,
        links: html_result.links,
    })
}

/// Language detection runs exactly once, immediately before persistence,
/// and only if `summary` is non-empty (invariant 4).
fn detect_language(summary: &str) -> (String, f64) {
    if summary.is_empty() {
        return (String::new(), 0.0);
    }
    match whatlang::detect(summary) {
        Some(info) => (info.lang().code().to_string(), info.confidence()),
        None => (String::new(), 0.0),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn resp(path: &str, body: &str, headers: HashMap<String, String>) -> FetchResponse {
        FetchResponse {
            url: Url::parse(&format!("http://abcdefghijklmnop.onion{path}")).unwrap(),
            status: 200,
            headers,
            body: body.as_bytes().to_vec(),
            content_type: Some("text/html".to_string()),
            fetched_at: chrono::Utc::now(),
            response_time_ms: 0,
        }
    }

    #[test]
    fn drops_pages_with_no_title() {
        let response = resp("/page", "<html><body><p>no title here</p></body></html>", HashMap::new());
        assert!(extract(&response).is_none());
    }

    #[test]
    fn drops_pages_with_empty_title() {
        let response = resp("/page", "<html><head><title></title></head><body><p>x</p></body></html>", HashMap::new());
        assert!(extract(&response).is_none());
    }

    #[test]
    fn keeps_pages_with_a_title() {
        let response = resp(
            "/page",
            "<html><head><title>Hello</title></head><body><p>some article text here</p></body></html>",
            HashMap::new(),
        );
        let extraction = extract(&response).expect("title gate should pass");
        assert_eq!(extraction.record.title, "Hello");
    }

    #[test]
    fn wapp_is_populated_only_for_home_pages() {
        let mut headers = HashMap::new();
        headers.insert("server".to_string(), "nginx".to_string());
        let home = resp("/", "<html><head><title>Home</title></head><body><p>welcome</p></body></html>", headers.clone());
        let extraction = extract(&home).expect("title gate should pass");
        assert!(extraction.record.is_home_page);
        assert!(extraction.record.wapp.contains("nginx"));

        let subpage = resp("/about", "<html><head><title>About</title></head><body><p>welcome</p></body></html>", headers);
        let extraction = extract(&subpage).expect("title gate should pass");
        assert!(!extraction.record.is_home_page);
        assert_eq!(extraction.record.wapp, "");
    }
}
