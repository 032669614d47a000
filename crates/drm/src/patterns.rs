use once_cell::sync::Lazy;
use regex::Regex;

use crate::DrmType;

/// One named DRM family and the case-insensitive patterns that identify it.
pub struct PatternFamily {
    pub drm_type: DrmType,
    pub patterns: &'static [&'static str],
}

/// Pattern families checked against URLs, manifest content and header
/// values, grounded in the upstream DRM-detection module's own table.
pub static DRM_PATTERNS: &[PatternFamily] = &[
    PatternFamily {
        drm_type: DrmType::Widevine,
        patterns: &[
            r"widevine",
            r"drm\.widevine",
            r"wv-keyos",
            r"application/dash\+xml.*widevine",
        ],
    },
    PatternFamily {
        drm_type: DrmType::PlayReady,
        patterns: &[
            r"playready",
            r"microsoft\.playready",
            r"mspr-2\.0",
            r"application/dash\+xml.*playready",
        ],
    },
    PatternFamily {
        drm_type: DrmType::FairPlay,
        patterns: &[r"fairplay", r"fps-", r"application/vnd\.apple\.fps", r"skd://"],
    },
    PatternFamily {
        drm_type: DrmType::ClearKey,
        patterns: &[r"clearkey", r"clear-key", r"org\.w3\.clearkey"],
    },
    PatternFamily {
        drm_type: DrmType::Generic,
        patterns: &[
            r"encrypted",
            r"protection",
            r"contentprotection",
            r"keyid",
            r"key_id",
            r"cenc",
            r"cbcs",
            r"#EXT-X-KEY.*METHOD=(?!NONE)(?!AES-128)",
        ],
    },
];

/// HTTP header name fragments that hint at DRM-related infrastructure.
pub static DRM_HTTP_INDICATORS: &[&str] = &[
    "x-drm-",
    "x-widevine-",
    "x-playready-",
    "content-protection",
    "www-authenticate",
    "authorization",
];

/// Keywords in an error string that suggest a DRM or access-control
/// rejection rather than a plain network failure.
pub static DRM_ERROR_MESSAGES: &[&str] = &[
    "drm_protected",
    "encrypted",
    "protection",
    "license",
    "authorization",
    "forbidden",
    "content protection",
    "digital rights",
    "access denied",
    "subscription required",
    "geo-blocked",
    "not available in your region",
];

/// Streaming services known to serve AES-128 HLS keys over plain HTTP with
/// no real DRM behind them.
pub static KNOWN_PUBLIC_SERVICES: &[&str] = &["pluto.tv", "samsung", "tubi", "crackle", "xumo"];

static SIMPLE_KEY_FILENAME: Lazy<Vec<Regex>> = Lazy::new(|| {
    [r"\.key$", r"key\d*\.bin$", r"encryption\.key$"]
        .iter()
        .map(|p| Regex::new(p).expect("static pattern"))
        .collect()
});

pub fn looks_like_simple_key_filename(uri: &str) -> bool {
    SIMPLE_KEY_FILENAME.iter().any(|re| re.is_match(uri))
}

static COMPILED: Lazy<Vec<(DrmType, Vec<Regex>)>> = Lazy::new(|| {
    DRM_PATTERNS
        .iter()
        .map(|family| {
            let compiled = family
                .patterns
                .iter()
                .map(|p| Regex::new(&format!("(?i){p}")).expect("static DRM pattern"))
                .collect();
            (family.drm_type, compiled)
        })
        .collect()
});

/// Runs every compiled DRM pattern family against `haystack`, calling `hit`
/// with the matching type and the source pattern text for every match.
pub fn scan(haystack: &str, mut hit: impl FnMut(DrmType, &'static str)) {
    for (drm_type, regexes) in COMPILED.iter() {
        for (idx, re) in regexes.iter().enumerate() {
            if re.is_match(haystack) {
                hit(*drm_type, DRM_PATTERNS
                    .iter()
                    .find(|f| f.drm_type == *drm_type)
                    .unwrap()
                    .patterns[idx]);
            }
        }
    }
}
