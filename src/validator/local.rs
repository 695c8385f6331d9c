use super::AddressError;

/// Longueur 1..=64, atext ASCII, '.' ni initial ni terminal, pas de "..".
pub(crate) fn check_local(local: &str) -> Result<(), AddressError> {
    if local.is_empty() || local.len() > 64 {
        return Err(AddressError::LocalLength(local.len()));
    }
    if local.starts_with('.') || local.ends_with('.') || local.contains("..") {
        return Err(AddressError::LocalChars);
    }
    let ok = local.chars().all(|c| {
        c.is_ascii_alphanumeric()
            || matches!(
                c,
                '!' | '#'
                    | '$'
                    | '%'
                    | '&'
                    | '\''
                    | '*'
                    | '+'
                    | '-'
                    | '/'
                    | '='
                    | '?'
                    | '^'
                    | '_'
                    | '`'
                    | '{'
                    | '|'
                    | '}'
                    | '~'
                    | '.'
            )
    });
    if ok {
        Ok(())
    } else {
        Err(AddressError::LocalChars)
    }
}

/// Local part without its `+tag` suffix, used for role matching.
pub(crate) fn base_local(local: &str) -> &str {
    local.split_once('+').map_or(local, |(base, _)| base)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dots() {
        assert!(check_local(".abc").is_err());
        assert!(check_local("abc.").is_err());
        assert!(check_local("a..b").is_err());
        assert!(check_local("a.b").is_ok());
    }

    #[test]
    fn length() {
        assert_eq!(check_local(""), Err(AddressError::LocalLength(0)));
        assert!(check_local(&"a".repeat(65)).is_err());
        assert!(check_local(&"a".repeat(64)).is_ok());
    }

    #[test]
    fn plus_tag_stripped() {
        assert_eq!(base_local("info+news"), "info");
        assert_eq!(base_local("alice"), "alice");
    }
}
