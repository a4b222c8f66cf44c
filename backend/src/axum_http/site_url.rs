use axum::http::{HeaderMap, header::HOST};

/// Configured base URL first, then `{x-forwarded-proto|https}://{host}` from the request.
pub fn resolve_site_url(configured: Option<&str>, headers: &HeaderMap) -> Option<String> {
    if let Some(url) = configured
        .map(|url| url.trim().trim_end_matches('/'))
        .filter(|url| !url.is_empty())
    {
        return Some(url.to_string());
    }

    let host = header_value(headers, HOST.as_str())?;
    let proto = header_value(headers, "x-forwarded-proto").unwrap_or("https");

    Some(format!("{}://{}", proto, host))
}

/// First entry of a possibly comma-separated proxy header.
fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}
