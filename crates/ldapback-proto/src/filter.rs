//! Search filters in their RFC 4515 string form.
//!
//! Parsing is done by `ldap3_proto` into an [`LdapFilter`] tree. Before the
//! text reaches that parser its nesting depth is bounded, so a hostile
//! filter fails with [`Error::InvalidFilter`] instead of exhausting the stack.
//! Evaluation against a [`DirectoryEntry`] compares attribute names and
//! values without regard to ASCII case.

pub use ldap3_proto::proto::{LdapFilter, LdapSubstringFilter};

use crate::entry::DirectoryEntry;
use crate::error::Error;

/// Deepest parenthesis nesting accepted in a filter string.
pub const MAX_FILTER_DEPTH: usize = 64;

/// Parse a filter string. A bare item without parentheses is accepted.
pub fn parse(input: &str) -> Result<LdapFilter, Error> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidFilter("empty filter".to_string()));
    }
    let text = if trimmed.starts_with('(') {
        trimmed.to_string()
    } else {
        format!("({})", trimmed)
    };

    check_depth(&text)?;
    ldap3_proto::parse_ldap_filter_str(&text)
        .map_err(|e| Error::InvalidFilter(format!("{}: {:?}", text, e)))
}

/// Evaluate `filter` against an entry.
///
/// Extensible matches never match.
pub fn matches(filter: &LdapFilter, entry: &DirectoryEntry) -> bool {
    match filter {
        LdapFilter::And(filters) => filters.iter().all(|f| matches(f, entry)),
        LdapFilter::Or(filters) => filters.iter().any(|f| matches(f, entry)),
        LdapFilter::Not(inner) => !matches(inner, entry),
        LdapFilter::Present(attr) => entry.get_ignore_case(attr).is_some(),
        LdapFilter::Equality(attr, value) | LdapFilter::Approx(attr, value) => {
            any_value(entry, attr, |v| v.eq_ignore_ascii_case(value))
        }
        LdapFilter::Substring(attr, substring) => {
            any_value(entry, attr, |v| substring_match(v, substring))
        }
        LdapFilter::GreaterOrEqual(attr, value) => any_value(entry, attr, |v| {
            compare(v, value) != std::cmp::Ordering::Less
        }),
        LdapFilter::LessOrEqual(attr, value) => any_value(entry, attr, |v| {
            compare(v, value) != std::cmp::Ordering::Greater
        }),
        _ => false,
    }
}

fn check_depth(text: &str) -> Result<(), Error> {
    let mut depth = 0usize;
    for (offset, byte) in text.bytes().enumerate() {
        match byte {
            b'(' => {
                depth += 1;
                if depth > MAX_FILTER_DEPTH {
                    return Err(Error::InvalidFilter(format!(
                        "nesting exceeds {} levels at offset {}",
                        MAX_FILTER_DEPTH, offset
                    )));
                }
            }
            b')' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    Ok(())
}

fn any_value(entry: &DirectoryEntry, attr: &str, pred: impl Fn(&str) -> bool) -> bool {
    entry
        .get_ignore_case(attr)
        .map(|a| a.values.iter().any(|v| pred(v)))
        .unwrap_or(false)
}

fn compare(candidate: &str, bound: &str) -> std::cmp::Ordering {
    match (candidate.parse::<i64>(), bound.parse::<i64>()) {
        (Ok(a), Ok(b)) => a.cmp(&b),
        _ => candidate
            .to_ascii_lowercase()
            .cmp(&bound.to_ascii_lowercase()),
    }
}

fn substring_match(value: &str, substring: &LdapSubstringFilter) -> bool {
    let value = value.to_ascii_lowercase();
    let mut rest = value.as_str();

    if let Some(initial) = &substring.initial {
        match rest.strip_prefix(initial.to_ascii_lowercase().as_str()) {
            Some(tail) => rest = tail,
            None => return false,
        }
    }

    for part in &substring.any {
        let part = part.to_ascii_lowercase();
        match rest.find(part.as_str()) {
            Some(idx) => rest = &rest[idx + part.len()..],
            None => return false,
        }
    }

    match &substring.final_ {
        Some(last) => rest.ends_with(last.to_ascii_lowercase().as_str()),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::EntryAttribute;

    fn group_entry() -> DirectoryEntry {
        DirectoryEntry::new("cn=superheros,ou=groups,dc=example,dc=com")
            .with_attribute(EntryAttribute::single("cn", "superheros"))
            .with_attribute(EntryAttribute::single("gidNumber", "5501"))
            .with_attribute(EntryAttribute::new("memberUid", ["hackers", "johndoe"]))
            .with_attribute(EntryAttribute::new("objectClass", ["posixGroup", "top"]))
    }

    fn eq(attr: &str, value: &str) -> LdapFilter {
        LdapFilter::Equality(attr.to_string(), value.to_string())
    }

    fn substring(initial: Option<&str>, any: &[&str], last: Option<&str>) -> LdapFilter {
        LdapFilter::Substring(
            "cn".to_string(),
            LdapSubstringFilter {
                initial: initial.map(String::from),
                any: any.iter().map(|s| s.to_string()).collect(),
                final_: last.map(String::from),
            },
        )
    }

    #[test]
    fn test_parse_nested() {
        let filter =
            parse("(&(objectClass=posixGroup)(|(cn=super*)(!(gidNumber=1))))").unwrap();
        match filter {
            LdapFilter::And(ref parts) => {
                assert_eq!(parts.len(), 2);
                assert!(matches!(parts[1], LdapFilter::Or(_)));
            }
            ref other => panic!("expected And, got {:?}", other),
        }
        assert!(matches(&filter, &group_entry()));
    }

    #[test]
    fn test_bare_item() {
        assert_eq!(parse("cn=superheros").unwrap(), eq("cn", "superheros"));
        assert_eq!(parse("  (cn=superheros) ").unwrap(), eq("cn", "superheros"));
    }

    #[test]
    fn test_presence_and_case() {
        let entry = group_entry();
        assert!(matches(&parse("(MEMBERUID=*)").unwrap(), &entry));
        assert!(matches(&parse("(objectclass=POSIXGROUP)").unwrap(), &entry));
        assert!(!matches(&parse("(uniqueMember=*)").unwrap(), &entry));
    }

    #[test]
    fn test_substring() {
        let entry = group_entry();
        assert!(matches(&substring(None, &["hero"], None), &entry));
        assert!(matches(&substring(Some("s"), &["r"], Some("s")), &entry));
        assert!(!matches(&substring(Some("x"), &[], None), &entry));
        assert!(!matches(&substring(None, &["heros"], Some("per")), &entry));
        assert!(matches(&parse("(cn=SUPER*)").unwrap(), &entry));
    }

    #[test]
    fn test_ordering() {
        let entry = group_entry();
        let ge = |v: &str| LdapFilter::GreaterOrEqual("gidNumber".into(), v.into());
        let le = |v: &str| LdapFilter::LessOrEqual("gidNumber".into(), v.into());
        assert!(matches(&ge("5000"), &entry));
        assert!(matches(&le("5501"), &entry));
        assert!(!matches(&ge("10000"), &entry));
    }

    #[test]
    fn test_empty_lists() {
        let entry = group_entry();
        assert!(matches(&LdapFilter::And(Vec::new()), &entry));
        assert!(!matches(&LdapFilter::Or(Vec::new()), &entry));
    }

    #[test]
    fn test_malformed() {
        assert!(parse("").is_err());
        assert!(parse("   ").is_err());
        assert!(parse("(cn=a").is_err());
        assert!(parse("(cn=a))").is_err());
    }

    #[test]
    fn test_nesting_limit() {
        let nested = |depth: usize| {
            format!("{}(cn=superheros){}", "(!".repeat(depth), ")".repeat(depth))
        };

        // An even number of negations keeps the match.
        let filter = parse(&nested(10)).unwrap();
        assert!(matches(&filter, &group_entry()));

        let err = parse(&nested(MAX_FILTER_DEPTH)).unwrap_err();
        assert!(matches!(err, Error::InvalidFilter(_)));

        let err = parse(&nested(200_000)).unwrap_err();
        assert!(err.to_string().contains("nesting exceeds 64 levels"));
    }
}
