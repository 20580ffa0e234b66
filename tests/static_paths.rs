//! Static path resolution never leaves the public root.

#![cfg(feature = "service")]

use std::path::{Component, Path};

use entity_graph::service::resolve_static_path;
use proptest::prelude::*;

fn segment() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("..".to_string()),
        Just("....".to_string()),
        Just(".".to_string()),
        Just("%2e%2e".to_string()),
        Just("%2E%2E%2F".to_string()),
        Just("..\\".to_string()),
        Just("%5c".to_string()),
        Just(String::new()),
        "[a-zA-Z0-9_.%-]{1,12}",
    ]
}

proptest! {
    #[test]
    fn prop_resolved_path_stays_under_root(segments in prop::collection::vec(segment(), 0..8)) {
        let root = Path::new("/srv/public");
        let request = format!("/{}", segments.join("/"));
        let resolved = resolve_static_path(root, &request);

        prop_assert!(resolved.starts_with(root), "{} -> {}", request, resolved.display());
        prop_assert!(
            resolved.components().all(|c| !matches!(c, Component::ParentDir)),
            "{} -> {}", request, resolved.display()
        );
    }

    #[test]
    fn prop_extensionless_paths_get_index(name in "[a-z]{1,10}") {
        let resolved = resolve_static_path(Path::new("public"), &format!("/{name}"));
        prop_assert!(resolved.ends_with(Path::new(&name).join("index.html")));
    }
}
