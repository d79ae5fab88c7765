//! `Link` header pagination support.

/// Navigation URLs extracted from a `Link` header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pagination {
    /// URL for the next page, if any.
    pub next: Option<String>,

    /// URL for the previous page, if any.
    pub prev: Option<String>,

    /// URL for the first page, if any.
    pub first: Option<String>,

    /// URL for the last page, if any.
    pub last: Option<String>,
}

impl Pagination {
    /// Whether more pages are available.
    pub fn has_next(&self) -> bool {
        self.next.is_some()
    }
}

/// Parse the RFC 8288 style links GitHub attaches to list responses.
///
/// A header value is a comma-separated sequence of
/// `<target-url>; rel="relation"` segments; only the four navigation
/// relations are kept, anything unrecognized or malformed is skipped.
pub fn parse_link_header(link_header: Option<&str>) -> Pagination {
    let mut links = Pagination::default();

    for segment in link_header.unwrap_or_default().split(',') {
        let Some((target, relation)) = parse_link_segment(segment) else {
            continue;
        };
        let slot = match relation {
            "next" => &mut links.next,
            "prev" => &mut links.prev,
            "first" => &mut links.first,
            "last" => &mut links.last,
            _ => continue,
        };
        *slot = Some(target.to_owned());
    }

    links
}

/// Split one `<url>; rel="relation"` segment into its URL and relation.
fn parse_link_segment(segment: &str) -> Option<(&str, &str)> {
    let (target, params) = segment.split_once(';')?;

    let target = target
        .trim()
        .strip_prefix('<')
        .and_then(|rest| rest.strip_suffix('>'))?;
    let relation = params
        .trim()
        .strip_prefix("rel=\"")
        .and_then(|rest| rest.strip_suffix('"'))?;

    Some((target, relation))
}

#[cfg(test)]
#[path = "pagination_tests.rs"]
mod tests;
