use rand::distr::Alphanumeric;
use rand::Rng;

const SUFFIX_LEN: usize = 6;
const REF_CODE_LEN: usize = 10;

/// Lowercase ASCII words joined by single hyphens.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_hyphen = false;

    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }

    if slug.is_empty() {
        "property".to_string()
    } else {
        slug
    }
}

/// Slug for a new listing. The random tail keeps titles reusable; the
/// datastore's unique constraint is the final arbiter.
pub fn unique_slug(title: &str) -> String {
    let suffix: String = rand::rng()
        .sample_iter(Alphanumeric)
        .take(SUFFIX_LEN)
        .map(|b| (b as char).to_ascii_lowercase())
        .collect();

    format!("{}-{}", slugify(title), suffix)
}

pub fn generate_ref_code() -> String {
    rand::rng()
        .sample_iter(Alphanumeric)
        .take(REF_CODE_LEN)
        .map(|b| (b as char).to_ascii_uppercase())
        .collect()
}
