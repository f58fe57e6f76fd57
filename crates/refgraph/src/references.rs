//! Same-repository issue/PR reference extraction from free text.
//!
//! Three reference forms are recognised and unioned:
//!
//! | Form | Example |
//! |------|---------|
//! | shorthand | `#12` |
//! | qualified | `octo/hello#12` |
//! | web URL | `https://github.com/octo/hello/issues/12`, `.../pull/12` |
//!
//! Qualified and URL forms are kept only when their owner/repo is exactly the
//! target repository. The result is always unique and ascending.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::{Comment, PullRequest, RepositoryRef};

/// `#N` not glued to a preceding identifier character.
static SHORTHAND: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^A-Za-z0-9_])#([0-9]+)\b").expect("static regex")
});

static QUALIFIED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([A-Za-z0-9_.-]+)/([A-Za-z0-9_.-]+)#([0-9]+)\b").expect("static regex")
});

static WEB_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/([A-Za-z0-9_.-]+)/([A-Za-z0-9_.-]+)/(?:issues|pull)/([0-9]+)\b")
        .expect("static regex")
});

fn positive(digits: &str) -> Option<u64> {
    digits.parse::<u64>().ok().filter(|n| *n > 0)
}

/// Extracts every issue/PR number in `text` that refers to `repo`.
pub fn extract_referenced_numbers(text: &str, repo: &RepositoryRef) -> Vec<u64> {
    let mut found = BTreeSet::new();

    for caps in SHORTHAND.captures_iter(text) {
        if let Some(n) = positive(&caps[1]) {
            found.insert(n);
        }
    }

    for pattern in [&*QUALIFIED, &*WEB_URL] {
        for caps in pattern.captures_iter(text) {
            if !repo.matches(&caps[1], &caps[2]) {
                continue;
            }
            if let Some(n) = positive(&caps[3]) {
                found.insert(n);
            }
        }
    }

    found.into_iter().collect()
}

/// Extracts references from a pull request body and all of its comments.
///
/// Missing bodies count as empty text.
pub fn extract_from_pull_request(
    pr: &PullRequest,
    comments: &[Comment],
    repo: &RepositoryRef,
) -> Vec<u64> {
    let mut text = pr.body.clone().unwrap_or_default();
    for comment in comments {
        text.push('\n');
        text.push_str(comment.body.as_deref().unwrap_or(""));
    }
    extract_referenced_numbers(&text, repo)
}
