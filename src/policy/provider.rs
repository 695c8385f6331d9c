use super::engine::GENERIC_PROFILE;

/// Substrings of MX host names or reply text identifying a provider.
const SIGNATURES: &[(&str, &[&str])] = &[
    ("gmail", &["google", "gmail"]),
    (
        "microsoft",
        &["outlook", "hotmail", "microsoft", "office365"],
    ),
    ("yahoo", &["yahoo", "yahoodns", "aol.com"]),
];

/// Effective provider profile name for a reply.
///
/// An explicit hint other than empty/`generic`/`default` wins; otherwise the
/// host and message are scanned for known signatures.
pub fn resolve_provider(hint: &str, host: &str, message: &str) -> String {
    let hint = hint.trim().to_ascii_lowercase();
    if !hint.is_empty() && hint != GENERIC_PROFILE && hint != "default" {
        return hint;
    }
    let host = host.to_ascii_lowercase();
    let message = message.to_ascii_lowercase();
    SIGNATURES
        .iter()
        .find(|(_, needles)| {
            needles
                .iter()
                .any(|needle| host.contains(needle) || message.contains(needle))
        })
        .map(|(name, _)| (*name).to_string())
        .unwrap_or_else(|| GENERIC_PROFILE.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_hint_wins() {
        assert_eq!(resolve_provider("Yahoo", "aspmx.l.google.com", ""), "yahoo");
    }

    #[test]
    fn infers_from_host() {
        assert_eq!(resolve_provider("", "aspmx.l.google.com", ""), "gmail");
        assert_eq!(
            resolve_provider("generic", "example-com.mail.protection.outlook.com", ""),
            "microsoft"
        );
        assert_eq!(resolve_provider("default", "mta5.am0.yahoodns.net", ""), "yahoo");
    }

    #[test]
    fn infers_from_message() {
        assert_eq!(
            resolve_provider("", "mx.example.net", "see https://support.google.com/mail"),
            "gmail"
        );
    }

    #[test]
    fn unknown_is_generic() {
        assert_eq!(resolve_provider("", "mx.example.net", "User unknown"), "generic");
    }
}
