//! Internal helpers for model validation and conversion.
//!
//! These utilities are **not** part of the public API. They centralize
//! validation and mapping logic so the engine enforces consistent invariants.

use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};

use crate::{Currency, EngineError, ResultEngine};

const MAX_NAME_LEN: usize = 120;
pub(crate) const MAX_TAGS: usize = 20;
const MAX_TAG_LEN: usize = 40;

/// Trim a required display name and reject empty or oversized values.
pub(crate) fn normalize_required_name(value: &str, label: &str) -> ResultEngine<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::InvalidName(format!(
            "{label} name must not be empty"
        )));
    }
    if trimmed.chars().count() > MAX_NAME_LEN {
        return Err(EngineError::InvalidName(format!(
            "{label} name must be at most {MAX_NAME_LEN} characters"
        )));
    }
    Ok(trimmed.to_string())
}

pub(crate) fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// Comparison key for names: diacritics stripped, lowercase, single spaces.
///
/// `"  Café   Bar "` and `"cafe bar"` share the same key.
pub(crate) fn normalize_key(value: &str) -> String {
    let stripped: String = value
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub(crate) fn normalize_email(value: &str) -> ResultEngine<String> {
    let email = value.trim().to_lowercase();
    let valid = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'))
        && !email.chars().any(char::is_whitespace);
    if !valid {
        return Err(EngineError::InvalidName(format!("invalid email: {email}")));
    }
    Ok(email)
}

/// Tags are trimmed, lowercased and de-duplicated keeping the first
/// occurrence order.
pub(crate) fn normalize_tags(tags: &[String]) -> ResultEngine<Vec<String>> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim().to_lowercase();
        if tag.is_empty() || out.contains(&tag) {
            continue;
        }
        if tag.chars().count() > MAX_TAG_LEN {
            return Err(EngineError::InvalidName(format!(
                "tag '{tag}' exceeds {MAX_TAG_LEN} characters"
            )));
        }
        out.push(tag);
    }
    if out.len() > MAX_TAGS {
        return Err(EngineError::InvalidName(format!(
            "at most {MAX_TAGS} tags are allowed"
        )));
    }
    Ok(out)
}

/// Escape backslash, `%` and `_` so `raw` matches literally in a `LIKE`
/// pattern whose escape character is a backslash.
pub(crate) fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// Parse a currency code stored in the DB into a strongly typed `Currency`.
pub(crate) fn model_currency(value: &str) -> ResultEngine<Currency> {
    Currency::try_from(value)
        .map_err(|_| EngineError::Internal(format!("invalid stored currency: {value}")))
}

/// Ensure two currencies match, naming the thing being checked.
pub(crate) fn ensure_currency(expected: Currency, actual: Currency, label: &str) -> ResultEngine<()> {
    if expected != actual {
        return Err(EngineError::CurrencyMismatch(format!(
            "{label} currency is {}, got {}",
            expected.code(),
            actual.code()
        )));
    }
    Ok(())
}

/// Largest amount accepted from callers, in minor units. Sums of many such
/// amounts still fit an `i64`.
pub const MAX_AMOUNT_MINOR: i64 = 1_000_000_000_000_000;

/// Ensure `|amount_minor| <= MAX_AMOUNT_MINOR`.
pub(crate) fn ensure_in_range(amount_minor: i64, label: &str) -> ResultEngine<()> {
    if amount_minor.unsigned_abs() > MAX_AMOUNT_MINOR.unsigned_abs() {
        return Err(EngineError::InvalidAmount(format!(
            "{label} must be at most {MAX_AMOUNT_MINOR} in absolute value"
        )));
    }
    Ok(())
}

pub(crate) fn ensure_positive(amount_minor: i64, label: &str) -> ResultEngine<()> {
    if amount_minor <= 0 {
        return Err(EngineError::InvalidAmount(format!("{label} must be > 0")));
    }
    ensure_in_range(amount_minor, label)
}

pub(crate) fn ensure_non_negative(amount_minor: i64, label: &str) -> ResultEngine<()> {
    if amount_minor < 0 {
        return Err(EngineError::InvalidAmount(format!("{label} must be >= 0")));
    }
    ensure_in_range(amount_minor, label)
}

/// `a + b`, or `InvalidAmount` when the sum leaves the `i64` range.
pub(crate) fn add_minor(a: i64, b: i64) -> ResultEngine<i64> {
    a.checked_add(b)
        .ok_or_else(|| EngineError::InvalidAmount("amount total overflows".to_string()))
}

/// `a - b`, or `InvalidAmount` when the result leaves the `i64` range.
pub(crate) fn sub_minor(a: i64, b: i64) -> ResultEngine<i64> {
    a.checked_sub(b)
        .ok_or_else(|| EngineError::InvalidAmount("amount total overflows".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("a_c"), "a\\_c");
        assert_eq!(escape_like("50%"), "50\\%");
        assert_eq!(escape_like("c:\\tmp"), "c:\\\\tmp");
        assert_eq!(escape_like("plain"), "plain");
    }

    #[test]
    fn amounts_are_bounded() {
        assert!(ensure_positive(MAX_AMOUNT_MINOR, "amount").is_ok());
        assert!(ensure_positive(MAX_AMOUNT_MINOR + 1, "amount").is_err());
        assert!(ensure_in_range(-MAX_AMOUNT_MINOR, "balance").is_ok());
        assert!(ensure_in_range(i64::MIN, "balance").is_err());
        assert!(add_minor(i64::MAX, 1).is_err());
        assert!(sub_minor(i64::MIN, 1).is_err());
        assert_eq!(add_minor(2, 3).unwrap(), 5);
    }

    #[test]
    fn key_ignores_case_accents_and_spacing() {
        assert_eq!(normalize_key("  Café   Bar "), "cafe bar");
        assert_eq!(normalize_key("FOOD & Dining"), "food & dining");
    }

    #[test]
    fn email_is_lowercased_and_validated() {
        assert_eq!(normalize_email(" Alice@Example.COM ").unwrap(), "alice@example.com");
        assert!(normalize_email("alice").is_err());
        assert!(normalize_email("@example.com").is_err());
        assert!(normalize_email("al ice@example.com").is_err());
    }

    #[test]
    fn tags_are_deduplicated() {
        let tags = vec![
            " Trip ".to_string(),
            "trip".to_string(),
            "".to_string(),
            "Work".to_string(),
        ];
        assert_eq!(normalize_tags(&tags).unwrap(), vec!["trip", "work"]);
    }

    #[test]
    fn too_many_tags_are_rejected() {
        let tags: Vec<String> = (0..=MAX_TAGS).map(|i| format!("t{i}")).collect();
        assert!(normalize_tags(&tags).is_err());
    }
}
