//! Response URL Extraction
//!
//! Upstream schemas are not stable across models, so the image URL is looked up
//! at a primary location and then at an ordered list of fallback paths. Paths
//! are plain data interpreted by [`resolve`]; supporting a new schema means
//! adding a row to [`FALLBACK_PATHS`].

use serde_json::Value;
use url::Url;

/// One step into a JSON tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathSegment {
    Key(&'static str),
    Index(usize),
}

use PathSegment::{Index, Key};

/// Named property path
#[derive(Debug, Clone, Copy)]
pub struct JsonPath {
    pub name: &'static str,
    pub segments: &'static [PathSegment],
}

/// Documented response shape: `{"data": [{"image_url": "..."}]}`
pub const PRIMARY_PATH: JsonPath = JsonPath {
    name: "data[0].image_url",
    segments: &[Key("data"), Index(0), Key("image_url")],
};

/// Tried in order when the primary path yields nothing usable
pub const FALLBACK_PATHS: &[JsonPath] = &[
    JsonPath {
        name: "url",
        segments: &[Key("url")],
    },
    JsonPath {
        name: "image_url",
        segments: &[Key("image_url")],
    },
    JsonPath {
        name: "images[0].url",
        segments: &[Key("images"), Index(0), Key("url")],
    },
    JsonPath {
        name: "link",
        segments: &[Key("link")],
    },
    JsonPath {
        name: "images.url",
        segments: &[Key("images"), Key("url")],
    },
    JsonPath {
        name: "data.url",
        segments: &[Key("data"), Key("url")],
    },
    JsonPath {
        name: "response.url",
        segments: &[Key("response"), Key("url")],
    },
    JsonPath {
        name: "result.url",
        segments: &[Key("result"), Key("url")],
    },
    JsonPath {
        name: "image.url",
        segments: &[Key("image"), Key("url")],
    },
];

/// Result of probing a response body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    /// A well-formed absolute URL, as the provider wrote it, and the path it
    /// was found at
    Found { url: String, path: &'static str },
    /// No URL, but the provider explained itself in the body
    ProviderReported(String),
    /// Unexpected schema
    NotFound,
}

/// Resolve a path against a loosely-typed tree. Missing steps yield `None`.
pub fn resolve<'a>(root: &'a Value, segments: &[PathSegment]) -> Option<&'a Value> {
    segments
        .iter()
        .try_fold(root, |node, segment| match segment {
            Key(key) => node.as_object()?.get(*key),
            Index(idx) => node.as_array()?.get(*idx),
        })
}

/// Accept only absolute URLs with a scheme and a host. The trimmed candidate
/// is returned untouched; parsing only validates it.
pub fn validate_url(candidate: &str) -> Option<&str> {
    let trimmed = candidate.trim();
    Url::parse(trimmed).ok()?.host()?;
    Some(trimmed)
}

/// Locate the result URL in a decoded response body
pub fn extract(body: &Value) -> Extraction {
    let found = std::iter::once(&PRIMARY_PATH)
        .chain(FALLBACK_PATHS)
        .find_map(|path| {
            let candidate = resolve(body, path.segments)?.as_str()?;
            match validate_url(candidate) {
                Some(url) => Some((url.to_string(), path.name)),
                None => {
                    tracing::debug!(path = path.name, candidate, "Rejected malformed URL");
                    None
                }
            }
        });

    if let Some((url, path)) = found {
        return Extraction::Found { url, path };
    }

    match reported_error(body) {
        Some(detail) => Extraction::ProviderReported(detail),
        None => Extraction::NotFound,
    }
}

fn reported_error(body: &Value) -> Option<String> {
    let describe = |value: &Value| -> Option<String> {
        match value {
            Value::Null | Value::Bool(false) => None,
            Value::String(s) if s.trim().is_empty() => None,
            Value::String(s) => Some(s.clone()),
            Value::Object(obj) => Some(
                obj.get("message")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| value.to_string()),
            ),
            other => Some(other.to_string()),
        }
    };

    let obj = body.as_object()?;
    obj.get("error")
        .and_then(describe)
        .or_else(|| obj.get("message").and_then(describe))
}

#[cfg(test)]
mod tests {
    use super::PathSegment::{Index, Key};
    use super::*;
    use serde_json::json;

    fn found(body: Value) -> (String, &'static str) {
        match extract(&body) {
            Extraction::Found { url, path } => (url, path),
            other => panic!("expected Found, got {:?}", other),
        }
    }

    #[test]
    fn test_primary_path() {
        let (url, path) = found(json!({"data": [{"image_url": "https://x/y.png"}]}));
        assert_eq!(url, "https://x/y.png");
        assert_eq!(path, "data[0].image_url");
    }

    #[test]
    fn test_fallback_images_array() {
        let (url, path) = found(json!({"images": [{"url": "https://a/b.png"}]}));
        assert_eq!(url, "https://a/b.png");
        assert_eq!(path, "images[0].url");
    }

    #[test]
    fn test_invalid_url_not_found() {
        assert_eq!(extract(&json!({"url": "not-a-url"})), Extraction::NotFound);
        assert_eq!(extract(&json!({})), Extraction::NotFound);
        assert_eq!(extract(&json!([1, 2, 3])), Extraction::NotFound);
        assert_eq!(extract(&json!("https://x/y.png")), Extraction::NotFound);
    }

    #[test]
    fn test_non_string_values_skipped() {
        let (url, path) = found(json!({
            "url": 42,
            "image_url": {"href": "https://nope/"},
            "link": "https://cdn.example.com/img.webp"
        }));
        assert_eq!(url, "https://cdn.example.com/img.webp");
        assert_eq!(path, "link");
    }

    #[test]
    fn test_invalid_primary_falls_through() {
        let (url, path) = found(json!({
            "data": [{"image_url": "relative/path.png"}],
            "result": {"url": "https://r/1.png"}
        }));
        assert_eq!(url, "https://r/1.png");
        assert_eq!(path, "result.url");
    }

    #[test]
    fn test_fallback_order_is_stable() {
        let (_, path) = found(json!({
            "image": {"url": "https://late/1.png"},
            "url": "https://early/1.png"
        }));
        assert_eq!(path, "url");
    }

    #[test]
    fn test_data_object_path() {
        let (url, _) = found(json!({"data": {"url": "https://d/1.png"}}));
        assert_eq!(url, "https://d/1.png");
    }

    #[test]
    fn test_empty_data_array() {
        assert_eq!(extract(&json!({"data": []})), Extraction::NotFound);
    }

    #[test]
    fn test_url_without_host_rejected() {
        assert_eq!(
            extract(&json!({"url": "mailto:someone@example.com"})),
            Extraction::NotFound
        );
        assert_eq!(
            extract(&json!({"url": "data:image/png;base64,AAAA"})),
            Extraction::NotFound
        );
    }

    #[test]
    fn test_provider_reported_error() {
        assert_eq!(
            extract(&json!({"error": "content policy violation"})),
            Extraction::ProviderReported("content policy violation".into())
        );
        assert_eq!(
            extract(&json!({"error": {"message": "model overloaded", "code": 503}})),
            Extraction::ProviderReported("model overloaded".into())
        );
        assert_eq!(
            extract(&json!({"message": "queued"})),
            Extraction::ProviderReported("queued".into())
        );
        assert_eq!(extract(&json!({"error": null})), Extraction::NotFound);
    }

    #[test]
    fn test_url_returned_as_sent() {
        let (url, _) = found(json!({"url": "  https://example.com  "}));
        assert_eq!(url, "https://example.com");

        let (url, _) = found(json!({"url": "https://cdn.example.com/a%20b/Cat Pic.png?sig=x"}));
        assert_eq!(url, "https://cdn.example.com/a%20b/Cat Pic.png?sig=x");
    }

    #[test]
    fn test_url_wins_over_error_field() {
        let (url, _) = found(json!({"error": "partial", "url": "https://ok/1.png"}));
        assert_eq!(url, "https://ok/1.png");
    }

    #[test]
    fn test_resolve_missing_intermediate() {
        let body = json!({"images": "flat"});
        assert_eq!(resolve(&body, &[Key("images"), Index(0), Key("url")]), None);
        assert_eq!(resolve(&body, &[Key("images")]), Some(&json!("flat")));
        assert_eq!(resolve(&body, &[]), Some(&body));
    }
}
