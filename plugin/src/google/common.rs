//! Shared utilities for Google API modules

use serde_json::Value;

/// Extract an array field from a JSON response, returning an empty vec if missing.
///
/// Google APIs return lists under varying field names ("items", "messages", "drives", "files").
pub fn extract_array(response: &Value, field: &str) -> Vec<Value> {
    response
        .get(field)
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default()
}

/// One page of a Google list response.
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub items: Vec<Value>,
    pub next_page_token: Option<String>,
    /// Top-level `summary` of the collection, when the API reports one.
    pub summary: Option<String>,
}

impl Page {
    pub fn from_response(response: &Value, field: &str) -> Self {
        let str_field = |name: &str| {
            response
                .get(name)
                .and_then(|v| v.as_str())
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        Self {
            items: extract_array(response, field),
            next_page_token: str_field("nextPageToken"),
            summary: str_field("summary"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_page_from_response() {
        let page = Page::from_response(
            &json!({"items": [{"id": "a"}], "nextPageToken": "t2", "summary": "me@example.com"}),
            "items",
        );
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.next_page_token.as_deref(), Some("t2"));
        assert_eq!(page.summary.as_deref(), Some("me@example.com"));
    }

    #[test]
    fn test_missing_list_and_empty_token() {
        let page = Page::from_response(&json!({"nextPageToken": ""}), "files");
        assert!(page.items.is_empty());
        assert!(page.next_page_token.is_none());
    }
}
