//! `Content-Disposition` header values for downloads.

use axum::http::HeaderValue;

/// Build `attachment; filename="..."` for a download.
///
/// Non-ASCII names get an ASCII fallback (`?` for each unrepresentable
/// character) plus an RFC 5987 `filename*` parameter carrying the real name.
pub fn attachment(filename: &str) -> HeaderValue {
    let name: String = filename
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect();

    let fallback: String = name
        .chars()
        .map(|c| if c.is_ascii() { c } else { '?' })
        .collect();
    let quoted = fallback.replace('"', "\\\"");

    let value = if name.is_ascii() {
        format!("attachment; filename=\"{}\"", quoted)
    } else {
        format!(
            "attachment; filename=\"{}\"; filename*=UTF-8''{}",
            quoted,
            urlencoding::encode(&name)
        )
    };

    // Only visible ASCII is left at this point.
    HeaderValue::from_str(&value).unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}
