//! Distinguished name helpers.
//!
//! These work on the plain comma-separated form used by the backend. Escaped
//! commas inside values are not supported.

use crate::error::Error;

/// Split a DN into `(attribute, value)` pairs, leftmost first.
pub fn parse(dn: &str) -> Result<Vec<(String, String)>, Error> {
    if dn.trim().is_empty() {
        return Ok(Vec::new());
    }
    dn.split(',')
        .map(|component| {
            let (attr, value) = component
                .split_once('=')
                .ok_or_else(|| Error::InvalidDn(format!("missing '=' in \"{}\"", component)))?;
            let attr = attr.trim();
            let value = value.trim();
            if attr.is_empty() || value.is_empty() {
                return Err(Error::InvalidDn(format!("empty component in \"{}\"", dn)));
            }
            Ok((attr.to_string(), value.to_string()))
        })
        .collect()
}

/// Return the part of `dn` in front of `base`.
///
/// `Some("")` means `dn` is the base itself; `None` means `dn` is not at or
/// below `base`. Components compare ignoring ASCII case and the whitespace
/// around commas and `=`.
pub fn strip_base<'a>(dn: &'a str, base: &str) -> Option<&'a str> {
    let dn = dn.trim();
    let components: Vec<&str> = dn.split(',').collect();
    let base: Vec<&str> = base.split(',').collect();
    if base.len() > components.len() {
        return None;
    }

    let split = components.len() - base.len();
    if !components[split..]
        .iter()
        .zip(&base)
        .all(|(a, b)| same_component(a, b))
    {
        return None;
    }
    if split == 0 {
        return Some("");
    }

    // Byte offset of the comma in front of the first base component.
    let comma = dn.match_indices(',').nth(split - 1).map(|(i, _)| i)?;
    Some(dn[..comma].trim_end())
}

fn same_component(a: &str, b: &str) -> bool {
    match (a.split_once('='), b.split_once('=')) {
        (Some((ka, va)), Some((kb, vb))) => {
            ka.trim().eq_ignore_ascii_case(kb.trim()) && va.trim().eq_ignore_ascii_case(vb.trim())
        }
        _ => a.trim().eq_ignore_ascii_case(b.trim()),
    }
}

/// Check whether `dn` equals or lies below `base`.
pub fn is_at_or_below(dn: &str, base: &str) -> bool {
    base.is_empty() || strip_base(dn, base).is_some()
}

/// The parent of `dn`, or `None` for a single-component DN.
pub fn parent(dn: &str) -> Option<&str> {
    dn.split_once(',').map(|(_, rest)| rest)
}
