//! Branch-name slugs derived from issue titles

/// Maximum slug length in characters
pub const MAX_SLUG_LEN: usize = 50;

/// Slug used when a title has no usable characters
const FALLBACK_SLUG: &str = "issue";

/// Lowercase, collapse non-alphanumeric runs to `-`, trim hyphens, cap at 50
///
/// Only ASCII letters and digits survive; everything else is a separator.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_hyphen = false;

    for c in title.chars().flat_map(char::to_lowercase) {
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

    if slug.len() > MAX_SLUG_LEN {
        slug.truncate(MAX_SLUG_LEN);
        while slug.ends_with('-') {
            slug.pop();
        }
    }

    slug
}

/// `<number>-<slug>`, the name shared by the branch and its worktree directory
pub fn branch_name(issue: u64, title: &str) -> String {
    let slug = slugify(title);
    if slug.is_empty() {
        format!("{}-{}", issue, FALLBACK_SLUG)
    } else {
        format!("{}-{}", issue, slug)
    }
}
