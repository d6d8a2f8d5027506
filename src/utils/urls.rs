// RTMP URL utilities

use super::parse_query_string_simple;

/// Default RTMP port
pub const DEFAULT_RTMP_PORT: u16 = 1935;

/// Default app instance, synthesized when the app path has no
/// explicit instance component
pub const DEFAULT_INSTANCE: &str = "_definst_";

/// Parsed RTMP URL
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RtmpUrl {
    /// URL scheme, always "rtmp"
    pub scheme: String,

    /// Host name or address
    pub host: String,

    /// Port (1935 unless given)
    pub port: u16,

    /// Application path, without the leading slash
    pub app: String,
}

/// Parses an RTMP URL: rtmp://host[:port]/app[/instance][?query]
///
/// # Arguments
///
/// * `url` - The URL string
///
/// # Return value
///
/// The parsed URL, or None if the URL is not an rtmp:// URL
pub fn parse_rtmp_url(url: &str) -> Option<RtmpUrl> {
    let url = url.trim();

    let rest = url.strip_prefix("rtmp://")?;

    let (authority, path) = match rest.find('/') {
        Some(i) => (&rest[..i], &rest[i + 1..]),
        None => (rest, ""),
    };

    if authority.is_empty() {
        return None;
    }

    let (host, port) = match authority.rsplit_once(':') {
        Some((h, p)) => match p.parse::<u16>() {
            Ok(port) => (h, port),
            Err(_) => (h, DEFAULT_RTMP_PORT),
        },
        None => (authority, DEFAULT_RTMP_PORT),
    };

    // the application "name" does not start with a slash
    let app = path.strip_prefix('/').unwrap_or(path);

    Some(RtmpUrl {
        scheme: "rtmp".to_string(),
        host: host.to_string(),
        port,
        app: app.to_string(),
    })
}

/// Turns a parsed RTMP URL back into its string form,
/// omitting the port when it is the default one
pub fn unparse_rtmp_url(url: &RtmpUrl) -> String {
    let mut result = format!("{}://{}", url.scheme, url.host);

    if url.port != DEFAULT_RTMP_PORT {
        result.push_str(&format!(":{}", url.port));
    }

    if !url.app.is_empty() {
        result.push('/');
        result.push_str(&url.app);
    }

    result
}

/// Normalized app path
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NormalizedApp {
    /// App path as given, query stripped
    pub app_base: String,

    /// App path with the default instance appended when missing,
    /// used for digest URIs
    pub normalized: String,

    /// key=value pairs from the query string
    pub args: Vec<(String, String)>,
}

/// Splits the query string off an app path and normalizes it with the
/// default instance
pub fn parse_normalized_app(app: &str) -> NormalizedApp {
    let (app_base, query) = match app.split_once('?') {
        Some((base, query)) => (base, query),
        None => (app, ""),
    };

    let args = parse_query_string_simple(query);

    let trimmed = app_base.trim_matches('/');
    let parts: Vec<&str> = trimmed.split('/').collect();

    let normalized = if parts.len() == 1 {
        format!("{}/{}", parts[0], DEFAULT_INSTANCE)
    } else {
        app_base.to_string()
    };

    NormalizedApp {
        app_base: app_base.to_string(),
        normalized,
        args,
    }
}

// Tests

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rtmp_url() {
        let url = parse_rtmp_url("rtmp://example.com/live").unwrap();

        assert_eq!(url.host, "example.com");
        assert_eq!(url.port, DEFAULT_RTMP_PORT);
        assert_eq!(url.app, "live");

        let url = parse_rtmp_url("rtmp://example.com:1936/live/instance").unwrap();

        assert_eq!(url.host, "example.com");
        assert_eq!(url.port, 1936);
        assert_eq!(url.app, "live/instance");

        let url = parse_rtmp_url("rtmp://example.com").unwrap();

        assert_eq!(url.app, "");

        assert!(parse_rtmp_url("http://example.com/live").is_none());
    }

    #[test]
    fn test_parse_rtmp_url_bad_port() {
        let url = parse_rtmp_url("rtmp://example.com:port/app").unwrap();

        assert_eq!(url.port, DEFAULT_RTMP_PORT);
    }

    #[test]
    fn test_unparse_rtmp_url() {
        for s in [
            "rtmp://example.com/live",
            "rtmp://example.com:1936/live/instance",
            "rtmp://example.com",
        ] {
            let url = parse_rtmp_url(s).unwrap();
            assert_eq!(unparse_rtmp_url(&url), s);
        }
    }

    #[test]
    fn test_parse_normalized_app() {
        let app = parse_normalized_app("live");

        assert_eq!(app.app_base, "live");
        assert_eq!(app.normalized, "live/_definst_");
        assert!(app.args.is_empty());

        let app = parse_normalized_app("live/other");

        assert_eq!(app.normalized, "live/other");

        let app = parse_normalized_app("live?auth=key&t=1");

        assert_eq!(app.app_base, "live");
        assert_eq!(app.normalized, "live/_definst_");
        assert_eq!(
            app.args,
            vec![
                ("auth".to_string(), "key".to_string()),
                ("t".to_string(), "1".to_string()),
            ]
        );
    }
}
