use crate::error::{CoreError, Result};
use url::Url;

/// Validates a URL submitted for shortening.
///
/// The URL must be absolute, use `http` or `https` and carry a host.
/// Control characters are rejected; the string is later sent verbatim as
/// a `Location` header.
pub fn validate_original_url(raw: &str) -> Result<()> {
    if raw.trim().is_empty() {
        return Err(CoreError::InvalidUrl("url is required".to_string()));
    }

    if raw.chars().any(char::is_control) {
        return Err(CoreError::InvalidUrl(
            "invalid control character in URL".to_string(),
        ));
    }

    let parsed = Url::parse(raw).map_err(|e| CoreError::InvalidUrl(format!("{raw}: {e}")))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(CoreError::InvalidUrl(format!(
            "url scheme must be http or https: {}",
            parsed.scheme()
        )));
    }

    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(CoreError::InvalidUrl(format!("url must have a host: {raw}")));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_absolute_http_urls() {
        assert!(validate_original_url("https://example.com").is_ok());
        assert!(validate_original_url("http://example.com/a?b=c#d").is_ok());
        assert!(validate_original_url("https://sub.example.com:8443/path").is_ok());
    }

    #[test]
    fn empty_url_is_required() {
        assert_eq!(
            validate_original_url("").unwrap_err(),
            CoreError::InvalidUrl("url is required".to_string())
        );
        assert!(validate_original_url("   ").is_err());
    }

    #[test]
    fn rejects_relative_and_malformed_urls() {
        assert!(validate_original_url("not-a-url").is_err());
        assert!(validate_original_url("/relative/path").is_err());
        assert!(validate_original_url("http://").is_err());
    }

    #[test]
    fn rejects_control_characters() {
        for raw in [
            "https://example.com/a\nb",
            "https://example.com/a\rb",
            "https://example.com/a\tb",
            "https://example.com/a\u{1}b",
            "https://example.com/a\u{7f}b",
        ] {
            assert_eq!(
                validate_original_url(raw).unwrap_err(),
                CoreError::InvalidUrl("invalid control character in URL".to_string()),
                "{raw:?}"
            );
        }
    }

    #[test]
    fn rejects_other_schemes() {
        assert!(validate_original_url("ftp://example.com/file").is_err());
        assert!(validate_original_url("javascript:alert(1)").is_err());
    }
}
