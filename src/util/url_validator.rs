use std::net::IpAddr;
use thiserror::Error;
use url::Url;

/// Errors that can occur while validating an API base URL.
#[derive(Error, Debug)]
pub enum UrlValidationError {
    /// The URL string could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// The URL uses a scheme other than http or https.
    #[error("Unsupported scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),
    /// Plain HTTP pointed somewhere other than the local machine.
    #[error("Insecure base URL: HTTPS required (except localhost for testing)")]
    Insecure,
    /// The URL points to a private/internal IP address.
    #[error("Private IP address not allowed: {0}")]
    PrivateIp(String),
    /// The URL carries a query string or fragment, which would break path joining.
    #[error("Base URL must not contain a query or fragment")]
    HasQuery,
}

/// Validates the base URL the API client will prefix onto every request.
///
/// Rules:
/// - Only `http` and `https` schemes.
/// - `http` is accepted only for loopback hosts (`localhost`, `127.0.0.1`,
///   `::1`) so tests can point the client at a local mock server.
/// - Private and link-local IPs are rejected.
/// - No query string or fragment.
///
/// The returned URL always ends with `/` so `Url::join` appends path
/// segments instead of replacing the last one.
///
/// # Examples
///
/// ```
/// use hnplus::util::validate_base_url;
///
/// let url = validate_base_url("https://hacker-news.firebaseio.com/v0").unwrap();
/// assert_eq!(url.as_str(), "https://hacker-news.firebaseio.com/v0/");
///
/// assert!(validate_base_url("http://127.0.0.1:8080").is_ok());
/// assert!(validate_base_url("http://example.com").is_err());
/// assert!(validate_base_url("file:///etc/passwd").is_err());
/// ```
pub fn validate_base_url(url_str: &str) -> Result<Url, UrlValidationError> {
    let mut url = Url::parse(url_str)?;

    let secure = match url.scheme() {
        "https" => true,
        "http" => false,
        scheme => return Err(UrlValidationError::UnsupportedScheme(scheme.to_owned())),
    };

    if url.query().is_some() || url.fragment().is_some() {
        return Err(UrlValidationError::HasQuery);
    }

    let host = url.host_str().unwrap_or_default();
    let host_for_parse = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);

    let loopback = match host_for_parse.parse::<IpAddr>() {
        Ok(ip) if ip.is_loopback() => true,
        Ok(ip) if is_private_ip(&ip) => {
            return Err(UrlValidationError::PrivateIp(ip.to_string()));
        }
        Ok(_) => false,
        Err(_) => host == "localhost",
    };

    if !secure && !loopback {
        return Err(UrlValidationError::Insecure);
    }
    if !secure {
        tracing::warn!(base_url = %url, "Using non-HTTPS API base URL (localhost only)");
    }

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }

    Ok(url)
}

fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(ipv4) => ipv4.is_private() || ipv4.is_link_local() || ipv4.is_unspecified(),
        IpAddr::V6(ipv6) => {
            if ipv6.is_unspecified() {
                return true;
            }
            let segments = ipv6.segments();
            // Unique Local (fc00::/7)
            let is_unique_local = (segments[0] & 0xfe00) == 0xfc00;
            // Link-Local (fe80::/10)
            let is_link_local = (segments[0] & 0xffc0) == 0xfe80;
            is_unique_local || is_link_local
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_api_url_accepted() {
        let url = validate_base_url("https://hacker-news.firebaseio.com/v0").unwrap();
        assert_eq!(url.host_str(), Some("hacker-news.firebaseio.com"));
        assert_eq!(url.path(), "/v0/");
    }

    #[test]
    fn test_trailing_slash_kept() {
        let url = validate_base_url("https://example.com/v0/").unwrap();
        assert_eq!(url.path(), "/v0/");
    }

    #[test]
    fn test_invalid_schemes() {
        assert!(matches!(
            validate_base_url("file:///etc/passwd"),
            Err(UrlValidationError::UnsupportedScheme(_))
        ));
        assert!(validate_base_url("ftp://example.com").is_err());
    }

    #[test]
    fn test_http_public_host_rejected() {
        assert!(matches!(
            validate_base_url("http://evil.com"),
            Err(UrlValidationError::Insecure)
        ));
    }

    #[test]
    fn test_http_loopback_allowed() {
        assert!(validate_base_url("http://127.0.0.1:4000").is_ok());
        assert!(validate_base_url("http://localhost:4000/v0").is_ok());
        assert!(validate_base_url("http://[::1]:4000").is_ok());
    }

    #[test]
    fn test_private_ips_rejected() {
        assert!(validate_base_url("https://192.168.1.1").is_err());
        assert!(validate_base_url("https://10.0.0.1").is_err());
        assert!(validate_base_url("https://169.254.1.1").is_err());
        assert!(validate_base_url("https://[fe80::1]").is_err());
        assert!(validate_base_url("https://0.0.0.0").is_err());
    }

    #[test]
    fn test_query_rejected() {
        assert!(matches!(
            validate_base_url("https://example.com/v0?print=pretty"),
            Err(UrlValidationError::HasQuery)
        ));
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(matches!(
            validate_base_url("not a url"),
            Err(UrlValidationError::InvalidUrl(_))
        ));
    }
}
