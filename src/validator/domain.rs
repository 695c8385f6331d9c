use super::AddressError;

/// Conversion IDNA (échec = adresse invalide) puis contrôle des labels.
pub(crate) fn ascii_domain(domain: &str) -> Result<String, AddressError> {
    let trimmed = domain.trim().trim_end_matches('.');
    if trimmed.is_empty() {
        return Err(AddressError::EmptyDomain);
    }
    let ascii = idna::domain_to_ascii(trimmed).map_err(|_| AddressError::Idna)?;
    if ascii.is_empty() {
        return Err(AddressError::EmptyDomain);
    }

    // au moins un point
    if !ascii.contains('.') {
        return Err(AddressError::domain("must contain at least one dot"));
    }
    for label in ascii.split('.') {
        if label.is_empty() {
            return Err(AddressError::domain("empty label"));
        }
        if label.len() > 63 {
            return Err(AddressError::domain(format!(
                "label '{label}' length {} > 63",
                label.len()
            )));
        }
        if label.starts_with('-') || label.ends_with('-') {
            return Err(AddressError::domain(format!(
                "label '{label}' cannot start/end with '-'"
            )));
        }
        if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(AddressError::domain(format!(
                "label '{label}' has invalid chars"
            )));
        }
    }
    Ok(ascii)
}

/// `a.b.example.com`, `b.example.com`, `example.com`, `com`.
pub(crate) fn suffixes(domain: &str) -> impl Iterator<Item = &str> {
    std::iter::successors(Some(domain), |d| d.split_once('.').map(|(_, rest)| rest))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_domain_ok() {
        assert_eq!(ascii_domain("Example.COM").as_deref(), Ok("example.com"));
    }

    #[test]
    fn idna_converted() {
        assert_eq!(
            ascii_domain("exämple.com").as_deref(),
            Ok("xn--exmple-cua.com")
        );
    }

    #[test]
    fn label_too_long() {
        let long = "a".repeat(64);
        assert!(ascii_domain(&format!("{long}.com")).is_err());
    }

    #[test]
    fn needs_a_dot() {
        assert!(ascii_domain("localhost").is_err());
    }

    #[test]
    fn walks_parent_labels() {
        let all: Vec<_> = suffixes("a.b.example.com").collect();
        assert_eq!(all, ["a.b.example.com", "b.example.com", "example.com", "com"]);
    }
}
