//! Route key normalization.
//!
//! # Design Decisions
//! - Keys are compared case-sensitively, like request paths
//! - Only the query string and fragment are stripped; no regex, no prefixes

/// Candidate lookup keys for a raw request target, most specific first.
///
/// `"/graphql?op=x"` yields `["/graphql?op=x", "/graphql"]`; a target without
/// a query yields only itself.
pub fn candidates(route_key: &str) -> impl Iterator<Item = &str> {
    let path = path_of(route_key);
    let stripped = (path.len() != route_key.len()).then_some(path);
    std::iter::once(route_key).chain(stripped)
}

/// The path component of a request target.
pub fn path_of(route_key: &str) -> &str {
    let end = route_key.find(['?', '#']).unwrap_or(route_key.len());
    &route_key[..end]
}
