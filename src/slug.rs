//! Slug derivation for display names.

/// Derive a lowercase kebab-case slug from a display name.
///
/// Alphanumeric runs are lowercased and joined by single dashes; apostrophes
/// are dropped so "Grandma's Pie" becomes `grandmas-pie`. The function is
/// idempotent: `slugify(&slugify(s)) == slugify(s)`.
///
/// Non-ASCII letters are kept as lowercase letters, not transliterated:
/// "Crème Brûlée" becomes `crème-brûlée`. The slug never contains
/// whitespace, punctuation or reserved URL characters, so it is a single
/// path segment once percent-encoded.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;

    for ch in name.chars() {
        if ch == '\'' || ch == '\u{2019}' {
            continue;
        }
        if !ch.is_alphanumeric() {
            pending_dash = true;
            continue;
        }
        for lower in ch.to_lowercase().filter(|c| c.is_alphanumeric()) {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(lower);
        }
    }

    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_names() {
        assert_eq!(slugify("Tomato Soup"), "tomato-soup");
        assert_eq!(slugify("Tomato"), "tomato");
        assert_eq!(slugify("  Mac & Cheese!  "), "mac-cheese");
        assert_eq!(slugify("Grandma's Pie"), "grandmas-pie");
    }

    #[test]
    fn test_unicode_letters_are_kept() {
        assert_eq!(slugify("Crème Brûlée"), "crème-brûlée");
    }

    #[test]
    fn test_symbols_only_yield_empty_slug() {
        assert_eq!(slugify("--- !!"), "");
        assert_eq!(slugify(""), "");
    }

    #[test]
    fn test_idempotent() {
        for name in ["Tomato Soup", "a--b", "Pão de Queijo", "x_y_z 42"] {
            let once = slugify(name);
            assert_eq!(slugify(&once), once);
        }
    }
}
