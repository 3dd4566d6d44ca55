//! Search state carried in the URL fragment: `#q=<phrase>&s=<id>,<id>`.

use std::{borrow::Cow, fmt};

use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HashParams {
    /// Phrase to search for (`q`); absent or empty means "no search requested"
    pub query: Option<String>,
    /// Source ids to restrict the search to (`s`)
    pub source_ids: Vec<String>,
}

impl HashParams {
    /// Parse a URL fragment, with or without the leading `#`.
    ///
    /// Values are percent-decoded and `+` reads as a space. Unknown keys and
    /// undecodable values are ignored.
    pub fn parse(fragment: &str) -> Self {
        let fragment = fragment.trim_start_matches('#').trim_start_matches('?');
        let mut params = Self::default();

        for pair in fragment.split('&').filter(|p| !p.is_empty()) {
            let (key, raw) = pair.split_once('=').unwrap_or((pair, ""));
            let Some(value) = decode(raw) else {
                debug!(key, raw, "Ignoring undecodable hash value");
                continue;
            };
            match key {
                "q" => params.query = Some(value).filter(|q| !q.trim().is_empty()),
                "s" => {
                    params.source_ids = value
                        .split(',')
                        .map(str::trim)
                        .filter(|id| !id.is_empty())
                        .map(ToString::to_string)
                        .collect();
                }
                _ => {}
            }
        }
        params
    }
}

fn decode(raw: &str) -> Option<String> {
    urlencoding::decode(&raw.replace('+', " "))
        .ok()
        .map(Cow::into_owned)
}

/// Renders the fragment without the leading `#`.
impl fmt::Display for HashParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut pairs = Vec::with_capacity(2);
        if let Some(query) = &self.query {
            pairs.push(format!("q={}", urlencoding::encode(query)));
        }
        if !self.source_ids.is_empty() {
            let ids: Vec<_> = self.source_ids.iter().map(String::as_str).map(urlencoding::encode).collect();
            pairs.push(format!("s={}", ids.join(",")));
        }
        write!(f, "{}", pairs.join("&"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_query_and_sources() {
        let params = HashParams::parse("#q=Main%20Street%2C%209&s=addresses,%20parks,");
        assert_eq!(params.query.as_deref(), Some("Main Street, 9"));
        assert_eq!(params.source_ids, vec!["addresses", "parks"]);
    }

    #[test]
    fn test_plus_is_space_and_unknown_keys_ignored() {
        let params = HashParams::parse("zoom=4&q=central+park&flag");
        assert_eq!(params.query.as_deref(), Some("central park"));
        assert!(params.source_ids.is_empty());
    }

    #[test]
    fn test_empty_query_is_absent() {
        assert_eq!(HashParams::parse("#q=&s=parks").query, None);
        assert_eq!(HashParams::parse(""), HashParams::default());
    }

    #[test]
    fn test_display_is_parseable() {
        let params = HashParams {
            query: Some("Maple & co".into()),
            source_ids: vec!["schools".into()],
        };
        assert_eq!(params.to_string(), "q=Maple%20%26%20co&s=schools");
        assert_eq!(HashParams::parse(&params.to_string()), params);
    }
}
