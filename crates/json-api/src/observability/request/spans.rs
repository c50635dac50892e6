//! Route labels for spans and metrics.

use uuid::Uuid;

/// Collapse uuid path segments so every order or cart item shares one label.
pub(super) fn route_label(path: &str) -> String {
    let segments: Vec<&str> = path
        .trim_start_matches('/')
        .split('/')
        .map(|segment| {
            if Uuid::parse_str(segment).is_ok() {
                "{uuid}"
            } else {
                segment
            }
        })
        .collect();

    format!("/{}", segments.join("/"))
}
