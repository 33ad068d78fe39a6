//! Caption language codes.
//!
//! The platform expects regional variants for several languages (`es-US`
//! rather than `es`). [`normalize`] maps a user-supplied code onto that form;
//! [`is_recognized`] checks it against the accepted list. An unrecognized
//! code is only ever a warning.

/// Lower-cased code → regional variant accepted by the platform.
const REGIONAL_VARIANTS: &[(&str, &str)] = &[
    ("ar", "ar"),
    ("bn", "bn"),
    ("nl", "nl-NL"),
    ("fr", "fr-FR"),
    ("de", "de-DE"),
    ("hi", "hi"),
    ("id", "id"),
    ("it", "it"),
    ("ja", "ja"),
    ("ko", "ko"),
    ("ml", "ml"),
    ("pl", "pl"),
    ("pt", "pt-BR"),
    ("pt-br", "pt-BR"),
    ("pa", "pa"),
    ("ru", "ru"),
    ("es", "es-US"),
    ("es-us", "es-US"),
    ("ta", "ta"),
    ("te", "te"),
    ("uk", "uk"),
    ("en", "en"),
    ("en-us", "en-US"),
    ("en-gb", "en-GB"),
    ("zh", "zh"),
    ("zh-cn", "zh-CN"),
    ("zh-tw", "zh-TW"),
    ("zh-hk", "zh-HK"),
];

/// Caption languages the platform accepts, lower-cased.
const RECOGNIZED: &[&str] = &[
    "aa", "ab", "af", "ak", "am", "an", "ar", "as", "av", "ay", "az", "ba", "be", "bg", "bh",
    "bi", "bm", "bn", "bo", "br", "bs", "ca", "ce", "ch", "co", "cr", "cs", "cu", "cv", "cy",
    "da", "de", "de-de", "dv", "dz", "ee", "el", "en", "en-us", "en-gb", "eo", "es", "es-us",
    "et", "eu", "fa", "ff", "fi", "fj", "fo", "fr", "fr-fr", "fy", "ga", "gd", "gl", "gn", "gu",
    "gv", "ha", "he", "hi", "ho", "hr", "ht", "hu", "hy", "hz", "ia", "id", "ie", "ig", "ii",
    "ik", "io", "is", "it", "iu", "ja", "jv", "ka", "kg", "ki", "kj", "kk", "kl", "km", "kn",
    "ko", "kr", "ks", "ku", "kv", "kw", "ky", "la", "lb", "lg", "li", "ln", "lo", "lt", "lu",
    "lv", "mg", "mh", "mi", "mk", "ml", "mn", "mo", "mr", "ms", "mt", "my", "na", "nb", "nd",
    "ne", "ng", "nl", "nl-nl", "nn", "no", "nr", "nv", "ny", "oc", "oj", "om", "or", "os", "pa",
    "pi", "pl", "ps", "pt", "pt-br", "qu", "rm", "rn", "ro", "ru", "rw", "sa", "sc", "sd", "se",
    "sg", "sh", "si", "sk", "sl", "sm", "sn", "so", "sq", "sr", "ss", "st", "su", "sv", "sw",
    "ta", "te", "tg", "th", "ti", "tk", "tl", "tn", "to", "tr", "ts", "tt", "tw", "ty", "ug",
    "uk", "ur", "uz", "ve", "vi", "vo", "wa", "wo", "xh", "yi", "yo", "za", "zh", "zh-cn",
    "zh-tw", "zh-hk", "zu",
];

/// Map `raw` onto the platform's regional variant.
///
/// Codes outside the regional table come back trimmed but otherwise as
/// given. Idempotent: `normalize(normalize(x)) == normalize(x)`.
pub fn normalize(raw: &str) -> String {
    let trimmed = raw.trim();
    let lower = trimmed.to_ascii_lowercase();
    match REGIONAL_VARIANTS.iter().find(|(from, _)| *from == lower) {
        Some((_, to)) => {
            if *to != trimmed {
                tracing::debug!("language code '{trimmed}' normalized to '{to}'");
            }
            (*to).to_string()
        }
        None => trimmed.to_string(),
    }
}

/// Whether the platform is known to accept `code` for captions.
pub fn is_recognized(code: &str) -> bool {
    let lower = code.trim().to_ascii_lowercase();
    RECOGNIZED.contains(&lower.as_str())
}
