//! The document-wide alias reference graph.

use serde_json::json;

use crate::helpers::*;

#[test]
fn test_edges_from_mode_level_alias() {
    let doc = palette();

    let edges = doc.alias_references_from(&path("colors.accent"));
    assert_eq!(edges.len(), 1);
    let edge = &edges[0];
    assert_eq!(edge.from.token, path("colors.accent"));
    assert_eq!(edge.from.mode.as_deref(), Some("light"));
    assert!(edge.from.value_path.is_root());
    assert_eq!(edge.to.token, path("colors.primary"));
    assert_eq!(edge.to.mode.as_deref(), Some("dark"));
    assert!(edge.resolvable);
    assert!(edge.reason.is_none());
}

#[test]
fn test_top_level_edge_has_no_modes() {
    let doc = palette();

    let edges = doc.alias_references_from(&path("aliasToString"));
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0].from.mode, None);
    assert_eq!(edges[0].to.mode, None);
    assert_eq!(edges[0].to.token, path("aString"));
    assert!(edges[0].resolvable);
}

#[test]
fn test_value_level_edge_carries_value_path() {
    let doc = palette();

    let edges = doc.alias_references_from(&path("fancy"));
    assert_eq!(edges.len(), 1);
    let edge = &edges[0];
    assert_eq!(edge.from.mode.as_deref(), Some("light"));
    assert_eq!(edge.from.value_path.to_string(), "hex");
    assert_eq!(edge.to.token, path("aString"));
    assert_eq!(edge.to.mode.as_deref(), Some("default"));
    assert!(edge.resolvable);

    // Edges serialize with the value path in its string form.
    let serialized = serde_json::to_value(edge).expect("edge serializes");
    assert_eq!(serialized["from"]["value_path"], json!("hex"));
    assert_eq!(serialized["to"]["token"], json!("aString"));
}

#[test]
fn test_mode_less_edge_defaults_to_owner_mode() {
    let doc = palette();

    let edges = doc.alias_references_from(&path("semantic.background"));
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0].from.mode.as_deref(), Some("dark"));
    assert_eq!(edges[0].to.mode.as_deref(), Some("dark"));
    assert!(edges[0].resolvable);
}

#[test]
fn test_broken_edge_carries_reason() {
    let doc = palette();

    let edges = doc.alias_references_from(&path("broken"));
    assert_eq!(edges.len(), 1);
    assert!(!edges[0].resolvable);
    assert_eq!(
        edges[0].reason.as_deref(),
        Some("Token \"missing.token\" does not exist")
    );
}

#[test]
fn test_edges_to_scans_the_document() {
    let doc = palette();

    let incoming = doc.alias_references_to(&path("aString"));
    assert_eq!(incoming.len(), 3);
    let sources: Vec<_> = incoming
        .iter()
        .map(|edge| edge.from.token.as_str())
        .collect();
    assert_eq!(sources, vec!["aliasToString", "fancy", "refString"]);

    let incoming = doc.alias_references_to(&path("colors.primary"));
    assert_eq!(incoming.len(), 2);
}

#[test]
fn test_all_edges() {
    let doc = palette();
    let edges = doc.all_alias_references();
    assert_eq!(edges.len(), 6);
    assert_eq!(edges.iter().filter(|edge| edge.resolvable).count(), 5);
}

#[test]
fn test_edges_recomputed_after_mutation() {
    let mut doc = palette();

    doc.remove_token(&path("aString")).expect("remove succeeds");
    let incoming = doc.alias_references_to(&path("aString"));
    assert_eq!(incoming.len(), 3);
    assert!(incoming.iter().all(|edge| !edge.resolvable));
    assert!(
        incoming
            .iter()
            .all(|edge| edge.reason.as_deref() == Some("Token \"aString\" does not exist"))
    );

    // Re-adding the target heals the edges on the next read.
    doc.insert_token(path("aString"), "string", &json!({"default": "back"}), None, None)
        .expect("insert succeeds");
    let incoming = doc.alias_references_to(&path("aString"));
    assert!(incoming.iter().all(|edge| edge.resolvable));
}
