//! Filler-segment detection.
//!
//! A filler segment is ad/bumper/error content substituted by the upstream
//! CDN; its URI carries one of a handful of known path fragments.

const FILLER_SIGNATURES: &[&str] = &[
    "_plutotv_error_",
    "_plutotv_filler_",
    "_Space_Station_",
    "_Promo/",
    "_ad_bumper_",
    "_Well_be_right_back/",
];

/// True if `uri` contains any known filler-content signature.
pub fn is_filler_uri(uri: &str) -> bool {
    FILLER_SIGNATURES.iter().any(|sig| uri.contains(sig))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_known_signatures() {
        assert!(is_filler_uri(
            "https://cdn.example.com/_plutotv_filler_/seg1.ts"
        ));
        assert!(is_filler_uri("https://cdn.example.com/_ad_bumper_/x.ts"));
        assert!(is_filler_uri("https://cdn.example.com/_Promo/x.ts"));
    }

    #[test]
    fn ignores_unrelated_uris() {
        assert!(!is_filler_uri("https://cdn.example.com/content/seg1.ts"));
    }
}
