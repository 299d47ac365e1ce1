use std::collections::HashMap;

/// One curated signature: a technology name plus the substrings that, if
/// found in the relevant signal, identify it. Checked against response
/// headers, then the raw HTML body.
struct Signature {
    tech: &'static str,
    header: Option<(&'static str, &'static str)>,
    html_needle: Option<&'static str>,
}

const SIGNATURES: &[Signature] = &[
    Signature { tech: "nginx", header: Some(("server", "nginx")), html_needle: None },
    Signature { tech: "Apache", header: Some(("server", "Apache")), html_needle: None },
    Signature { tech: "cloudflare", header: Some(("server", "cloudflare")), html_needle: None },
    Signature { tech: "PHP", header: Some(("x-powered-by", "PHP")), html_needle: None },
    Signature { tech: "Express", header: Some(("x-powered-by", "Express")), html_needle: None },
    Signature { tech: "ASP.NET", header: Some(("x-powered-by", "ASP.NET")), html_needle: None },
    Signature { tech: "WordPress", header: None, html_needle: Some("wp-content") },
    Signature { tech: "WordPress", header: None, html_needle: Some("wp-includes") },
    Signature { tech: "Drupal", header: None, html_needle: Some("Drupal.settings") },
    Signature { tech: "Joomla", header: None, html_needle: Some("/media/jui/") },
    Signature { tech: "phpBB", header: None, html_needle: Some("phpbb") },
    Signature { tech: "vBulletin", header: None, html_needle: Some("vbulletin") },
    Signature { tech: "MyBB", header: None, html_needle: Some("mybb") },
    Signature { tech: "Discourse", header: None, html_needle: Some("discourse") },
    Signature { tech: "React", header: None, html_needle: Some("data-reactroot") },
    Signature { tech: "jQuery", header: None, html_needle: Some("jquery") },
    Signature { tech: "Bootstrap", header: None, html_needle: Some("bootstrap") },
];

/// Match the curated dictionary against headers and raw HTML. Never
/// fails — an unrecognized stack simply yields an empty map.
pub fn fingerprint(headers: &HashMap<String, String>, raw_html: &str) -> Vec<String> {
    let html_lower = raw_html.to_lowercase();
    let mut found = Vec::new();

    for sig in SIGNATURES {
        let matched = if let Some((header_name, needle)) = sig.header {
            headers
                .get(header_name)
                .map(|v| v.to_lowercase().contains(&needle.to_lowercase()))
                .unwrap_or(false)
        } else if let Some(needle) = sig.html_needle {
            html_lower.contains(&needle.to_lowercase())
        } else {
            false
        };

        if matched && !found.contains(&sig.tech.to_string()) {
            found.push(sig.tech.to_string());
        }
    }

    found
}
