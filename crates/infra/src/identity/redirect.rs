//! Defensive extraction of values from redirect headers
//!
//! The provider's header formats are not a published contract. Every helper
//! returns `None` for a missing or malformed value and leaves the decision of
//! how to fail to the caller.

use polestar_domain::CodeOutcome;

/// Value of query parameter `name` in a `Location` header
///
/// Works for absolute and relative locations; the fragment is ignored.
/// Empty values count as absent.
pub fn query_param(location: &str, name: &str) -> Option<String> {
    let (_, query) = location.split_once('?')?;
    let query = query.split('#').next().unwrap_or_default();
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())
}

/// The `name=value` part of a `Set-Cookie` directive
pub fn first_cookie(set_cookie: &str) -> Option<String> {
    let pair = set_cookie.split(';').next()?.trim();
    match pair.split_once('=') {
        Some((name, _)) if !name.trim().is_empty() => Some(pair.to_string()),
        _ => None,
    }
}

/// `max-age` of a `Strict-Transport-Security` header, in seconds
pub fn hsts_max_age(header: &str) -> Option<u64> {
    header
        .split(';')
        .map(str::trim)
        .find_map(|directive| directive.strip_prefix("max-age="))
        .and_then(|value| value.trim_matches('"').parse().ok())
}

/// Classify the redirect that follows a credential or consent submission
pub fn classify_code(location: Option<&str>) -> CodeOutcome {
    let Some(location) = location else {
        return CodeOutcome::Rejected;
    };
    if let Some(code) = query_param(location, "code") {
        return CodeOutcome::Found(code);
    }
    match query_param(location, "uid") {
        Some(uid) => CodeOutcome::NeedsConsent(uid),
        None => CodeOutcome::Rejected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resume_path_from_relative_location() {
        let location =
            "/as/authorization?resumePath=Ab12C&allowInteraction=true&client_id=l3oopkc_10";
        assert_eq!(query_param(location, "resumePath"), Some("Ab12C".to_string()));
        assert_eq!(query_param(location, "client_id"), Some("l3oopkc_10".to_string()));
        assert_eq!(query_param(location, "missing"), None);
    }

    #[test]
    fn test_query_param_edge_cases() {
        assert_eq!(query_param("https://example.com/callback", "code"), None);
        assert_eq!(query_param("https://example.com/cb?code=", "code"), None);
        assert_eq!(
            query_param("https://example.com/cb?code=a%2Fb#frag", "code"),
            Some("a/b".to_string())
        );
        // parameter names are matched whole, not as substrings
        assert_eq!(query_param("https://example.com/cb?xcode=1", "code"), None);
    }

    #[test]
    fn test_first_cookie() {
        assert_eq!(
            first_cookie("PF=abc123; Path=/; Secure; HttpOnly"),
            Some("PF=abc123".to_string())
        );
        assert_eq!(first_cookie("PF=abc123"), Some("PF=abc123".to_string()));
        assert_eq!(first_cookie(""), None);
        assert_eq!(first_cookie("; Path=/"), None);
        assert_eq!(first_cookie("garbage"), None);
    }

    #[test]
    fn test_hsts_max_age() {
        assert_eq!(hsts_max_age("max-age=31536000; includeSubDomains"), Some(31_536_000));
        assert_eq!(hsts_max_age("includeSubDomains; max-age=600"), Some(600));
        assert_eq!(hsts_max_age("includeSubDomains"), None);
        assert_eq!(hsts_max_age("max-age=soon"), None);
    }

    #[test]
    fn test_classify_code() {
        let callback = "https://www.polestar.com/sign-in-callback";
        assert_eq!(
            classify_code(Some(&format!("{callback}?code=XyZ&state=s1"))),
            CodeOutcome::Found("XyZ".to_string())
        );
        assert_eq!(
            classify_code(Some("/as/Ab12C/resume/as/authorization.ping?uid=user-42")),
            CodeOutcome::NeedsConsent("user-42".to_string())
        );
        assert_eq!(
            classify_code(Some(&format!("{callback}?error=access_denied"))),
            CodeOutcome::Rejected
        );
        assert_eq!(classify_code(None), CodeOutcome::Rejected);
    }
}
