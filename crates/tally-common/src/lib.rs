use rand::{distributions::Alphanumeric, rngs::OsRng, Rng};
use uuid::Uuid;

pub const API_SECRET_LENGTH: usize = 64;
pub const MAX_NAME_LENGTH: usize = 255;

/// Opaque version token carried by every mutable resource.
pub fn gen_etag() -> String {
    Uuid::new_v4().simple().to_string()
}

pub fn gen_api_secret() -> String {
    OsRng.sample_iter(&Alphanumeric).take(API_SECRET_LENGTH).map(char::from).collect()
}

pub fn validate_name(name: &str) -> bool {
    let trimmed = name.trim();
    if trimmed.is_empty() || trimmed.len() != name.len() || name.len() > MAX_NAME_LENGTH {
        return false;
    }

    !name.chars().any(char::is_control)
}

pub fn validate_label(label: &str) -> bool {
    if label.is_empty() || label.len() > MAX_NAME_LENGTH {
        return false;
    }

    label.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

/// Derives a label from a display name: `"Product Owner"` becomes `"PRODUCT_OWNER"`.
pub fn label_from_name(name: &str) -> String {
    name.split_whitespace().map(str::to_uppercase).collect::<Vec<_>>().join("_")
}

/// Strips the optional double quotes a client may wrap an `If-Match` value with.
pub fn normalize_etag(value: &str) -> &str {
    let value = value.trim();
    let value = value.strip_prefix("W/").unwrap_or(value);
    value.strip_prefix('"').and_then(|v| v.strip_suffix('"')).unwrap_or(value)
}

#[cfg(test)]
mod test {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn when_generating_etags_then_every_etag_is_fresh() {
        let etags: HashSet<String> = (0..1000).map(|_| gen_etag()).collect();

        assert_eq!(etags.len(), 1000);
        assert!(etags.iter().all(|etag| etag.len() == 32));
    }

    #[test]
    fn when_generating_api_secret_then_it_is_alphanumeric_with_fixed_length() {
        let secret = gen_api_secret();

        assert_eq!(secret.len(), API_SECRET_LENGTH);
        assert!(secret.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(secret, gen_api_secret());
    }

    #[test]
    fn when_validating_names_then_blank_padded_or_oversized_names_are_rejected() {
        assert!(validate_name("Manager"));
        assert!(validate_name("my feeder 01"));
        assert!(!validate_name(""));
        assert!(!validate_name("   "));
        assert!(!validate_name(" padded"));
        assert!(!validate_name("line\nbreak"));
        assert!(!validate_name(&"a".repeat(MAX_NAME_LENGTH + 1)));
    }

    #[test]
    fn when_validating_labels_then_only_screaming_snake_case_is_accepted() {
        assert!(validate_label("SUPER_ADMIN"));
        assert!(validate_label("REMOTECI2"));
        assert!(!validate_label("Manager"));
        assert!(!validate_label("NEW LABEL"));
        assert!(!validate_label(""));
    }

    #[test]
    fn when_deriving_label_from_name_then_words_are_upper_cased_and_joined() {
        assert_eq!(label_from_name("Manager"), "MANAGER");
        assert_eq!(label_from_name("Product  Owner"), "PRODUCT_OWNER");
    }

    #[test]
    fn when_normalizing_etag_then_quotes_and_weak_prefix_are_removed() {
        assert_eq!(normalize_etag("\"abc\""), "abc");
        assert_eq!(normalize_etag("W/\"abc\""), "abc");
        assert_eq!(normalize_etag(" abc "), "abc");
        assert_eq!(normalize_etag("\"abc"), "\"abc");
    }
}
