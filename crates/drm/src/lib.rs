//! DRM signature detection for HLS/DASH manifests, URLs, HTTP headers and
//! error text.
//!
//! An HLS `#EXT-X-KEY` tag with `METHOD=AES-128` is not by itself DRM — many
//! ad-supported streaming services serve a plain AES-128 key over HTTP with
//! no license server behind it. [`is_public_aes128_key`] carves those cases
//! out before they're counted as a DRM indicator.

mod patterns;

use std::collections::HashMap;

pub use patterns::KNOWN_PUBLIC_SERVICES;

/// A DRM family recognized by [`DRM_PATTERNS`](patterns::DRM_PATTERNS).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrmType {
    Widevine,
    PlayReady,
    FairPlay,
    ClearKey,
    Generic,
    /// An `#EXT-X-KEY` line in an HLS manifest whose method isn't `NONE` and
    /// isn't recognizable as public AES-128.
    HlsEncryption,
    /// A `<ContentProtection>` element in a DASH manifest.
    DashProtection,
    /// A DRM-shaped keyword found only in an error message.
    ErrorBased,
}

impl DrmType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DrmType::Widevine => "widevine",
            DrmType::PlayReady => "playready",
            DrmType::FairPlay => "fairplay",
            DrmType::ClearKey => "clearkey",
            DrmType::Generic => "generic_drm",
            DrmType::HlsEncryption => "hls_encryption",
            DrmType::DashProtection => "dash_protection",
            DrmType::ErrorBased => "error_based",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Confidence {
    Low,
    Medium,
    High,
}

/// Result of scanning one source (URL, content, headers, or error text).
#[derive(Debug, Clone, Default)]
pub struct DrmDetection {
    pub drm_types: Vec<DrmType>,
    pub indicators: Vec<String>,
}

impl DrmDetection {
    pub fn has_drm(&self) -> bool {
        !self.indicators.is_empty()
    }

    fn merge(&mut self, other: DrmDetection) {
        self.drm_types.extend(other.drm_types);
        self.indicators.extend(other.indicators);
    }

    fn dedup_types(&mut self) {
        let mut seen = std::collections::HashSet::new();
        self.drm_types.retain(|t| seen.insert(*t));
    }
}

/// Aggregated result of [`comprehensive_check`].
#[derive(Debug, Clone)]
pub struct DrmReport {
    pub has_drm: bool,
    pub primary_type: Option<DrmType>,
    pub drm_types: Vec<DrmType>,
    pub indicators: Vec<String>,
    pub confidence: Confidence,
}

/// Checks whether an `#EXT-X-KEY` line describes public AES-128 encryption
/// (no real DRM behind it) rather than genuine content protection.
pub fn is_public_aes128_key(key_line: &str, content: &str) -> bool {
    let key_upper = key_line.to_uppercase();
    if !key_upper.contains("METHOD=AES-128") {
        return false;
    }
    let content_lower = content.to_lowercase();
    let key_lower = key_line.to_lowercase();

    let pluto_patterns = ["pluto.tv", "plutotv", "samsung", "samsungtv"];
    if pluto_patterns
        .iter()
        .any(|p| content_lower.contains(p) || key_lower.contains(p))
    {
        return true;
    }

    let Some(uri) = extract_key_uri(key_line) else {
        return false;
    };
    let uri_lower = uri.to_lowercase();

    if uri_lower.starts_with("http://") || uri_lower.starts_with("https://") {
        if patterns::looks_like_simple_key_filename(&uri_lower) {
            return true;
        }
        if KNOWN_PUBLIC_SERVICES.iter().any(|s| uri_lower.contains(s)) {
            return true;
        }
    }
    false
}

fn extract_key_uri(key_line: &str) -> Option<String> {
    let start = key_line.find("URI=\"")? + 5;
    let rest = &key_line[start..];
    let end = rest.find('"')?;
    Some(rest[..end].to_string())
}

/// Detects DRM indicators in a bare URL.
pub fn detect_in_url(url: &str) -> DrmDetection {
    let mut result = DrmDetection::default();
    if url.is_empty() {
        return result;
    }
    let url_lower = url.to_lowercase();
    patterns::scan(&url_lower, |drm_type, pattern| {
        result.drm_types.push(drm_type);
        result.indicators.push(format!("URL pattern: {pattern}"));
    });
    result.dedup_types();
    result
}

/// Detects DRM indicators in manifest/HTML/JSON content. `content_type`
/// hints whether this is `m3u8`/`hls` or `mpd`/`dash`.
pub fn detect_in_content(content: &str, content_type: &str) -> DrmDetection {
    let mut result = DrmDetection::default();
    if content.is_empty() {
        return result;
    }
    let content_lower = content.to_lowercase();
    patterns::scan(&content_lower, |drm_type, pattern| {
        result.drm_types.push(drm_type);
        result
            .indicators
            .push(format!("Content pattern: {pattern}"));
    });

    let ct = content_type.to_lowercase();
    if ct == "m3u8" || ct == "hls" || content.contains("#EXTM3U") {
        for line in content.lines() {
            if !line.starts_with("#EXT-X-KEY:") && !line.starts_with("#EXT-X-KEY ") {
                continue;
            }
            if line.to_uppercase().contains("METHOD=NONE") {
                continue;
            }
            if is_public_aes128_key(line, content) {
                continue;
            }
            result.drm_types.push(DrmType::HlsEncryption);
            result.indicators.push(format!("HLS encryption: {line}"));
        }
    }

    let looks_like_dash = ct == "mpd" || ct == "dash" || (content_lower.contains("xmlns") && content_lower.contains("dash"));
    if looks_like_dash {
        let count = content_lower.matches("<contentprotection").count();
        if count > 0 {
            result.drm_types.push(DrmType::DashProtection);
            result.indicators.push(format!(
                "DASH ContentProtection elements found ({count})"
            ));
        }
    }

    result.dedup_types();
    result
}

/// Detects DRM indicators in HTTP response headers.
pub fn detect_in_headers(headers: &HashMap<String, String>) -> DrmDetection {
    let mut result = DrmDetection::default();
    for (name, value) in headers {
        let name_lower = name.to_lowercase();
        let value_lower = value.to_lowercase();

        for indicator in patterns::DRM_HTTP_INDICATORS {
            if name_lower.contains(indicator) {
                result.indicators.push(format!("Header name: {name}"));
                result.drm_types.push(if name_lower.contains("widevine") {
                    DrmType::Widevine
                } else if name_lower.contains("playready") {
                    DrmType::PlayReady
                } else {
                    DrmType::Generic
                });
            }
        }

        patterns::scan(&value_lower, |drm_type, pattern| {
            result.drm_types.push(drm_type);
            result
                .indicators
                .push(format!("Header value ({name}): {pattern}"));
        });
    }
    result.dedup_types();
    result
}

/// Detects DRM-shaped keywords in an error message.
pub fn detect_in_error(error_message: &str) -> DrmDetection {
    let mut result = DrmDetection::default();
    if error_message.is_empty() {
        return result;
    }
    let error_lower = error_message.to_lowercase();
    for keyword in patterns::DRM_ERROR_MESSAGES {
        if error_lower.contains(keyword) {
            result.indicators.push(format!("Error keyword: {keyword}"));
            result.drm_types.push(DrmType::ErrorBased);
        }
    }
    result.dedup_types();
    result
}

/// Aggregates detection across every source that's available; any empty
/// input is skipped. Confidence is `High` at 2+ indicators, `Medium` at 1,
/// `Low` at 0.
pub fn comprehensive_check(
    url: &str,
    content: &str,
    headers: Option<&HashMap<String, String>>,
    error_message: &str,
    content_type: &str,
) -> DrmReport {
    let mut all = DrmDetection::default();

    if !url.is_empty() {
        all.merge(detect_in_url(url));
    }
    if !content.is_empty() {
        all.merge(detect_in_content(content, content_type));
    }
    if let Some(headers) = headers {
        if !headers.is_empty() {
            all.merge(detect_in_headers(headers));
        }
    }
    if !error_message.is_empty() {
        all.merge(detect_in_error(error_message));
    }
    all.dedup_types();

    let confidence = if all.indicators.len() >= 2 {
        Confidence::High
    } else if !all.indicators.is_empty() {
        Confidence::Medium
    } else {
        Confidence::Low
    };

    tracing::debug!(
        has_drm = !all.indicators.is_empty(),
        drm_type = ?all.drm_types.first(),
        "DRM check completed"
    );

    DrmReport {
        has_drm: !all.indicators.is_empty(),
        primary_type: all.drm_types.first().copied(),
        drm_types: all.drm_types,
        indicators: all.indicators,
        confidence,
    }
}

/// Simple boolean check for DRM protection.
pub fn is_drm_protected(url: &str, content: &str, content_type: &str) -> bool {
    comprehensive_check(url, content, None, "", content_type).has_drm
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widevine_url_is_detected() {
        let r = detect_in_url("https://license.example.com/widevine/acquire");
        assert!(r.has_drm());
        assert!(r.drm_types.contains(&DrmType::Widevine));
    }

    #[test]
    fn plain_url_is_clean() {
        let r = detect_in_url("https://cdn.example.com/stream/playlist.m3u8");
        assert!(!r.has_drm());
    }

    #[test]
    fn pluto_aes128_key_is_public() {
        let line = r#"#EXT-X-KEY:METHOD=AES-128,URI="https://service.pluto.tv/v1/key""#;
        assert!(is_public_aes128_key(line, ""));
    }

    #[test]
    fn simple_key_filename_is_public() {
        let line = r#"#EXT-X-KEY:METHOD=AES-128,URI="https://cdn.example.com/stream/key.key""#;
        assert!(is_public_aes128_key(line, ""));
    }

    #[test]
    fn unknown_aes128_key_is_not_public() {
        let line = r#"#EXT-X-KEY:METHOD=AES-128,URI="https://drm.example.com/license/key""#;
        assert!(!is_public_aes128_key(line, ""));
    }

    #[test]
    fn manifest_with_widevine_key_is_drm() {
        let content = "#EXTM3U\n#EXT-X-KEY:METHOD=SAMPLE-AES,URI=\"skd://widevine\"\n";
        let r = detect_in_content(content, "m3u8");
        assert!(r.has_drm());
    }

    #[test]
    fn manifest_with_public_aes128_key_is_not_flagged_via_hls_encryption() {
        let content =
            "#EXTM3U\n#EXT-X-KEY:METHOD=AES-128,URI=\"https://service.pluto.tv/key\"\n";
        let r = detect_in_content(content, "m3u8");
        assert!(!r.drm_types.contains(&DrmType::HlsEncryption));
    }

    #[test]
    fn dash_content_protection_is_detected() {
        let content = "<MPD xmlns=\"urn:dash\"><ContentProtection schemeIdUri=\"x\"/></MPD>";
        let r = detect_in_content(content, "dash");
        assert!(r.drm_types.contains(&DrmType::DashProtection));
    }

    #[test]
    fn comprehensive_check_confidence_scales_with_indicator_count() {
        let r = comprehensive_check(
            "https://license.example.com/widevine",
            "widevine protected",
            None,
            "",
            "",
        );
        assert_eq!(r.confidence, Confidence::High);
    }

    #[test]
    fn error_message_keyword_detected() {
        let r = detect_in_error("403 forbidden: subscription required");
        assert!(r.has_drm());
    }
}
