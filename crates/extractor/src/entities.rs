use once_cell::sync::Lazy;
use regex::Regex;

use onioncrawl_core::Attribute;

static BITCOIN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[13][a-km-zA-HJ-NP-Z0-9]{26,33}$").unwrap());

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([a-zA-Z0-9_.\-]+)@([a-zA-Z0-9_.\-]+)\.([a-zA-Z]{2,5})$").unwrap());

static ONION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?:https?://)?[\w\-\.]+\.onion").unwrap());

static TWITTER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(https?:)?(//)(www\.)?(twitter\.com/)([a-zA-Z0-9_]{1,15})/?").unwrap()
});

/// Runs the three attribute regexes over the raw body (not the extracted
/// article text) and returns a duplicate-free attribute list.
pub fn extract_attributes(raw_body: &str) -> Vec<Attribute> {
    let mut attributes = Vec::new();
    attributes.extend(dedup_matches(&BITCOIN_RE, raw_body, "bitcoin"));
    attributes.extend(dedup_matches(&EMAIL_RE, raw_body, "email"));
    attributes.extend(dedup_matches(&TWITTER_RE, raw_body, "twitter"));
    attributes
}

/// Informational-only onion mention scan, not persisted as an attribute.
pub fn extract_onion_mentions(raw_body: &str) -> Vec<String> {
    let mut seen: Vec<String> = ONION_RE.find_iter(raw_body).map(|m| m.as_str().to_string()).collect();
    seen.sort();
    seen.dedup();
    seen
}

fn dedup_matches(re: &Regex, text: &str, name: &str) -> Vec<Attribute> {
    // The regexes are anchored with `$`; check line-by-line so a match
    // isn't limited to the last line of a multi-line body.
    let mut values: Vec<String> = text
        .lines()
        .filter_map(|line| re.find(line.trim()).map(|m| m.as_str().to_string()))
        .collect();
    values.sort();
    values.dedup();
    values
        .into_iter()
        .map(|value| Attribute {
            name: name.to_string(),
            value,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_single_email_attribute() {
        let attrs = extract_attributes("hello world, contact a@b.co");
        assert_eq!(attrs, vec![Attribute { name: "email".into(), value: "a@b.co".into() }]);
    }

    #[test]
    fn dedups_repeated_bitcoin_address() {
        let body = "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa\n1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa\n1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa";
        let attrs = extract_attributes(body);
        assert_eq!(attrs.len(), 1);
        assert_eq!(attrs[0].name, "bitcoin");
    }

    #[test]
    fn dedups_repeated_onion_mentions() {
        let body = "see http://abcdefghijklmnop.onion/ and abcdefghijklmnop.onion again";
        let mentions = extract_onion_mentions(body);
        assert_eq!(mentions, vec!["abcdefghijklmnop.onion", "http://abcdefghijklmnop.onion"]);
    }
}
