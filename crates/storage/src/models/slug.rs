use std::collections::HashSet;

/// Replaces the accented Latin letters found in Spanish and neighbouring languages
/// with their plain ASCII counterpart. Other characters pass through untouched.
pub fn fold_accents(input: &str) -> String {
    input
        .chars()
        .map(|c| match c {
            'á' | 'à' | 'ä' | 'â' | 'ã' | 'å' => 'a',
            'Á' | 'À' | 'Ä' | 'Â' | 'Ã' | 'Å' => 'A',
            'é' | 'è' | 'ë' | 'ê' => 'e',
            'É' | 'È' | 'Ë' | 'Ê' => 'E',
            'í' | 'ì' | 'ï' | 'î' => 'i',
            'Í' | 'Ì' | 'Ï' | 'Î' => 'I',
            'ó' | 'ò' | 'ö' | 'ô' | 'õ' | 'ø' => 'o',
            'Ó' | 'Ò' | 'Ö' | 'Ô' | 'Õ' | 'Ø' => 'O',
            'ú' | 'ù' | 'ü' | 'û' => 'u',
            'Ú' | 'Ù' | 'Ü' | 'Û' => 'U',
            'ñ' => 'n',
            'Ñ' => 'N',
            'ç' => 'c',
            'Ç' => 'C',
            other => other,
        })
        .collect()
}

/// Builds the URL identifier of an event from its name.
///
/// ```
/// use storage::models::slug::generate_slug;
///
/// assert_eq!(generate_slug("Maratón de Valencia 2024"), "maraton-de-valencia-2024");
/// assert_eq!(generate_slug("  10K / Nocturna!! "), "10k-nocturna");
/// ```
pub fn generate_slug(name: &str) -> String {
    let folded = fold_accents(&name.to_lowercase());

    let mut slug = String::with_capacity(folded.len());
    let mut pending_hyphen = false;
    for c in folded.chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c);
        } else {
            pending_hyphen = true;
        }
    }

    slug
}

/// Lowercase ASCII letters and digits in hyphen separated groups.
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        && !slug.starts_with('-')
        && !slug.ends_with('-')
        && !slug.contains("--")
}

/// First of `base`, `base-1`, `base-2`, ... that is not in `taken`.
pub fn first_free_slug(base: &str, taken: &HashSet<String>) -> String {
    if !taken.contains(base) {
        return base.to_string();
    }

    (1..)
        .map(|n| format!("{}-{}", base, n))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or_else(|| base.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug_strips_accents_and_lowercases() {
        assert_eq!(generate_slug("Maratón Test"), "maraton-test");
        assert_eq!(generate_slug("Carrera Niños Ñandú"), "carrera-ninos-nandu");
    }

    #[test]
    fn test_slug_collapses_separators() {
        assert_eq!(generate_slug("--Trail   del -- Montseny--"), "trail-del-montseny");
    }

    #[test]
    fn test_slug_of_symbols_only_is_empty() {
        assert_eq!(generate_slug("!!! ???"), "");
        assert!(!is_valid_slug(&generate_slug("!!! ???")));
    }

    #[test]
    fn test_generated_slugs_are_valid() {
        for name in ["Maratón Test", "10K Nocturna 2025", "San Silvestre Vallecana"] {
            assert!(is_valid_slug(&generate_slug(name)), "{}", name);
        }
    }

    #[test]
    fn test_is_valid_slug_rejects_bad_shapes() {
        assert!(is_valid_slug("maraton-test"));
        assert!(!is_valid_slug("Maraton"));
        assert!(!is_valid_slug("-maraton"));
        assert!(!is_valid_slug("maraton-"));
        assert!(!is_valid_slug("maraton--test"));
        assert!(!is_valid_slug(""));
    }

    #[test]
    fn test_first_free_slug_appends_counter() {
        let mut taken = HashSet::new();
        assert_eq!(first_free_slug("maraton", &taken), "maraton");

        taken.insert("maraton".to_string());
        taken.insert("maraton-1".to_string());
        assert_eq!(first_free_slug("maraton", &taken), "maraton-2");
    }
}
