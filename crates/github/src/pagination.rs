//! Page-following primitives shared by the client's list operations.

/// Hard ceiling on pages fetched for one logical request.
pub const MAX_PAGES: usize = 200;

/// Extracts the `rel="next"` target from a `Link` header.
///
/// ```
/// let link = r#"<https://api.github.com/x?page=2>; rel="next", <https://api.github.com/x?page=9>; rel="last""#;
/// assert_eq!(github::next_link(link).as_deref(), Some("https://api.github.com/x?page=2"));
/// ```
pub fn next_link(header: &str) -> Option<String> {
    header.split(',').find_map(|entry| {
        let mut segments = entry.split(';');
        let target = segments.next()?.trim();
        let is_next = segments.any(|param| {
            let param = param.trim();
            match param.split_once('=') {
                Some((name, value)) => {
                    name.trim().eq_ignore_ascii_case("rel")
                        && value
                            .trim()
                            .trim_matches('"')
                            .split_whitespace()
                            .any(|rel| rel == "next")
                }
                None => false,
            }
        });
        if !is_next {
            return None;
        }
        target
            .strip_prefix('<')
            .and_then(|t| t.strip_suffix('>'))
            .filter(|t| !t.is_empty())
            .map(str::to_string)
    })
}
