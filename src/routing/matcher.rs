//! Path segment matching and rewriting.
//!
//! # Design Decisions
//! - Only the first path segment is consulted; exact, case-sensitive match
//! - No wildcard or regex matching
//! - Rewriting strips the first segment only when it is the service name itself

/// First segments owned by the gateway and never proxied.
pub const RESERVED_SEGMENTS: &[&str] = &["", "health", "services", "metrics"];

/// Prefix of the WebSocket relay route; reserved for names, not for proxying.
pub const WS_SEGMENT: &str = "ws";

/// First non-empty-prefix segment of a path: `/documents/upload` → `documents`.
pub fn first_segment(path: &str) -> &str {
    let trimmed = path.trim_start_matches('/');
    trimmed.split('/').next().unwrap_or("")
}

/// True if a request path belongs to the gateway's own endpoints.
pub fn is_reserved_path(path: &str) -> bool {
    RESERVED_SEGMENTS.contains(&first_segment(path))
}

/// True if a name cannot be used as a service name or alias.
pub fn is_reserved_segment(name: &str) -> bool {
    RESERVED_SEGMENTS.contains(&name) || name == WS_SEGMENT
}

/// Path forwarded to the backend.
///
/// `/documents/upload` proxied to `documents` becomes `/upload`; a path whose
/// first segment is an alias is forwarded unchanged.
pub fn rewrite_path(path: &str, service: &str) -> String {
    let trimmed = path.trim_start_matches('/');
    let (head, rest) = match trimmed.split_once('/') {
        Some((head, rest)) => (head, Some(rest)),
        None => (trimmed, None),
    };

    if head != service {
        return path.to_string();
    }
    match rest {
        Some(rest) => format!("/{}", rest),
        None => "/".to_string(),
    }
}
