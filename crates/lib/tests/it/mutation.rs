//! Mutation operations and their alias-propagation side effects.

use serde_json::{Value as Json, json};
use tokentree::{
    TokenDocument,
    doc::{UpdateModeOptions, path::TokenPath},
    token::JsonValueOptions,
};

use crate::helpers::*;

fn raw_value(doc: &TokenDocument, p: &TokenPath) -> Json {
    doc.token(p)
        .expect("token exists")
        .json_value(doc, &JsonValueOptions::raw())
        .expect("raw read succeeds")
}

#[test]
fn test_rename_rewrites_alias_literals() {
    let mut doc = palette();

    let changed = doc.rename(&path("aString"), "renamed").expect("rename succeeds");
    assert!(changed);
    assert!(doc.token(&path("aString")).is_none());

    // The value-level alias literal in refString follows the new name.
    assert_eq!(
        raw_value(&doc, &path("refString")),
        json!({"default": {"$alias": "renamed"}})
    );
    // So does the top-level alias, which keeps resolving transitively.
    assert_eq!(
        raw_value(&doc, &path("aliasToString")),
        json!({"$alias": "renamed"})
    );
    let alias = doc.token(&path("aliasToString")).unwrap();
    assert_eq!(alias.modes(&doc), vec!["default"]);
    assert!(alias.is_fully_resolvable(&doc));
}

#[test]
fn test_rename_noop_and_collision() {
    let mut doc = palette();

    let changed = doc.rename(&path("aString"), "aString").expect("same name is a no-op");
    assert!(!changed);

    let err = doc
        .rename(&path("aString"), "colors")
        .expect_err("a group already uses the name");
    assert!(err.is_conflict());

    let err = doc
        .rename(&path("ghost"), "anything")
        .expect_err("renaming a missing token fails");
    assert!(err.is_not_found());
}

#[test]
fn test_rename_group_carries_descendants_and_aliases() {
    let mut doc = palette();

    doc.rename_group(&path("colors"), "paint").expect("group rename succeeds");
    assert!(doc.group(&path("colors")).is_none());
    assert!(doc.token(&path("paint.primary")).is_some());
    assert!(doc.token(&path("paint.accent")).is_some());

    // Alias literals pointing inside the group follow it.
    let accent = raw_value(&doc, &path("paint.accent"));
    assert_eq!(
        accent["light"],
        json!({"$alias": "paint.primary", "$mode": "dark"})
    );
    let background = raw_value(&doc, &path("semantic.background"));
    assert_eq!(background["dark"], json!({"$alias": "paint.primary"}));
}

#[test]
fn test_rename_mode_retargets_explicit_references() {
    let mut doc = palette();

    doc.rename_mode(&path("colors.primary"), "dark", "night")
        .expect("mode rename succeeds");
    let primary = doc.token(&path("colors.primary")).unwrap();
    assert_eq!(primary.modes(&doc), vec!["light", "night"]);

    // The alias that names the mode explicitly is retargeted.
    let accent = raw_value(&doc, &path("colors.accent"));
    assert_eq!(
        accent["light"],
        json!({"$alias": "colors.primary", "$mode": "night"})
    );

    // The $mode-less alias in the collection still means "my own mode" and
    // now dangles, as data.
    let background = doc.token(&path("semantic.background")).unwrap();
    let ui = background.ui_value_on_mode(&doc, "dark");
    let tier = ui.as_mode().expect("mode exists");
    let broken = tier
        .as_unresolvable_alias()
        .expect("mode-less alias no longer resolves");
    assert_eq!(
        broken.reason,
        "Token at path \"colors.primary\" with mode \"dark\" does not exist"
    );
}

#[test]
fn test_rename_mode_forwards_through_top_level_alias() {
    let mut doc = palette();

    // aliasToString's modes are owned by aString; the rename lands there.
    doc.rename_mode(&path("aliasToString"), "default", "base")
        .expect("rename forwards to the alias target");
    let a_string = doc.token(&path("aString")).unwrap();
    assert_eq!(a_string.modes(&doc), vec!["base"]);

    // The explicit $mode reference in fancy follows along.
    let fancy = raw_value(&doc, &path("fancy"));
    assert_eq!(
        fancy["light"]["hex"],
        json!({"$alias": "aString", "$mode": "base"})
    );
}

#[test]
fn test_rename_mode_errors() {
    let mut doc = palette();

    let err = doc
        .rename_mode(&path("colors.primary"), "nope", "x")
        .expect_err("missing source mode");
    assert!(err.is_not_found());

    let err = doc
        .rename_mode(&path("colors.primary"), "light", "dark")
        .expect_err("target mode already exists");
    assert!(err.to_string().contains("already exists"));

    // Inside a collection only the fixed names are allowed.
    let err = doc
        .rename_mode(&path("semantic.background"), "dark", "midnight")
        .expect_err("collection fixes the mode names");
    assert!(err.is_collection_fence());
}

#[test]
fn test_move_token_rewrites_alias_literals() {
    let mut doc = palette();

    doc.move_token(&path("aString"), &path("colors"))
        .expect("move succeeds");
    assert!(doc.token(&path("colors.aString")).is_some());
    assert_eq!(
        raw_value(&doc, &path("refString")),
        json!({"default": {"$alias": "colors.aString"}})
    );
    assert_eq!(
        raw_value(&doc, &path("aliasToString")),
        json!({"$alias": "colors.aString"})
    );
}

#[test]
fn test_move_into_collection_checks_modes() {
    let mut doc = palette();

    // light/dark matches the collection's fixed set.
    doc.move_token(&path("colors.primary"), &path("semantic"))
        .expect("matching mode set moves in");
    assert!(doc.token(&path("semantic.primary")).is_some());

    let err = doc
        .move_token(&path("aString"), &path("semantic"))
        .expect_err("default-only token is fenced out");
    assert!(err.is_collection_fence());
}

#[test]
fn test_move_errors() {
    let mut doc = palette();

    let err = doc
        .move_token(&path("aString"), &path("nowhere"))
        .expect_err("destination must exist");
    assert!(err.is_not_found());

    // An unresolvable top-level alias has no modes to check against a
    // collection's fixed set.
    doc.insert_token(path("dangling"), "string", &json!({"$alias": "gone"}), None, None)
        .expect("insert succeeds");
    let err = doc
        .move_token(&path("dangling"), &path("semantic"))
        .expect_err("unresolvable alias cannot enter a collection");
    assert!(err.is_alias_restriction());
}

#[test]
fn test_update_value_replaces_whole_map() {
    let mut doc = palette();

    doc.update_value(
        &path("colors.primary"),
        &json!({"light": {"hex": "#000000", "alpha": 0.5}}),
    )
    .expect("update succeeds");
    assert_eq!(
        raw_value(&doc, &path("colors.primary")),
        json!({"light": {"hex": "#000000", "alpha": 0.5}})
    );
}

#[test]
fn test_update_value_restrictions() {
    let mut doc = palette();

    let err = doc
        .update_value(&path("aliasToString"), &json!({"default": "x"}))
        .expect_err("top-level alias tokens reject value updates");
    assert!(err.is_alias_restriction());

    let err = doc
        .update_value(&path("aString"), &json!({"$alias": "refString"}))
        .expect_err("update_value cannot introduce a top-level alias");
    assert!(err.is_validation_error());
}

#[test]
fn test_update_value_respects_collection_mode_fence() {
    let mut doc = palette();

    let err = doc
        .update_value(
            &path("semantic.background"),
            &json!({"only": {"hex": "#000000", "alpha": 1.0}}),
        )
        .expect_err("the enclosing collection fixes the mode set");
    assert!(err.is_collection_fence());
    let background = doc.token(&path("semantic.background")).unwrap();
    assert_eq!(background.modes(&doc), vec!["dark", "light"]);

    doc.update_value(
        &path("semantic.background"),
        &json!({
            "light": {"hex": "#fafafa", "alpha": 1.0},
            "dark": {"hex": "#000000", "alpha": 1.0}
        }),
    )
    .expect("a matching mode set commits");
}

#[test]
fn test_update_value_is_atomic() {
    let mut doc = palette();
    let before = raw_value(&doc, &path("colors.primary"));

    let err = doc
        .update_value(
            &path("colors.primary"),
            &json!({"light": {"hex": "#000000"}, "dark": "not-an-object"}),
        )
        .expect_err("one invalid mode fails the whole update");
    assert!(err.is_validation_error());
    assert_eq!(raw_value(&doc, &path("colors.primary")), before);
}

#[test]
fn test_update_mode_value_merges_composites() {
    let mut doc = palette();

    doc.update_mode_value(
        &path("colors.primary"),
        "light",
        &json!({"alpha": 0.5}),
        &UpdateModeOptions::default(),
    )
    .expect("partial update merges");
    let value = raw_value(&doc, &path("colors.primary"));
    assert_eq!(value["light"], json!({"hex": "#336699", "alpha": 0.5}));
}

#[test]
fn test_update_mode_value_mode_creation() {
    let mut doc = palette();

    let err = doc
        .update_mode_value(
            &path("aString"),
            "emph",
            &json!("HELLO"),
            &UpdateModeOptions::default(),
        )
        .expect_err("unknown mode fails by default");
    assert!(err.is_not_found());

    doc.update_mode_value(
        &path("aString"),
        "emph",
        &json!("HELLO"),
        &UpdateModeOptions {
            allow_mode_creation: true,
            ..UpdateModeOptions::default()
        },
    )
    .expect("mode creation succeeds when allowed");
    assert_eq!(
        doc.token(&path("aString")).unwrap().modes(&doc),
        vec!["default", "emph"]
    );

    let err = doc
        .update_mode_value(
            &path("semantic.background"),
            "hover",
            &json!({"hex": "#cccccc", "alpha": 1.0}),
            &UpdateModeOptions {
                allow_mode_creation: true,
                ..UpdateModeOptions::default()
            },
        )
        .expect_err("collection fences out foreign mode names");
    assert!(err.is_collection_fence());
}

#[test]
fn test_update_mode_value_writes_through_resolvable_alias() {
    let mut doc = palette();

    // accent.light aliases colors.primary dark; the update merges into the
    // resolved value and severs the alias.
    doc.update_mode_value(
        &path("colors.accent"),
        "light",
        &json!({"alpha": 0.2}),
        &UpdateModeOptions::default(),
    )
    .expect("write-through succeeds");
    let accent = raw_value(&doc, &path("colors.accent"));
    assert_eq!(accent["light"], json!({"hex": "#112233", "alpha": 0.2}));
    assert!(doc.alias_references_from(&path("colors.accent")).is_empty());
}

#[test]
fn test_update_mode_value_can_leave_aliases_alone() {
    let mut doc = palette();

    doc.update_mode_value(
        &path("colors.accent"),
        "light",
        &json!({"alpha": 0.2}),
        &UpdateModeOptions {
            override_aliases: false,
            ..UpdateModeOptions::default()
        },
    )
    .expect("update succeeds");
    let accent = raw_value(&doc, &path("colors.accent"));
    assert_eq!(
        accent["light"],
        json!({"$alias": "colors.primary", "$mode": "dark"})
    );
}

#[test]
fn test_update_mode_value_installs_alias() {
    let mut doc = palette();

    doc.update_mode_value(
        &path("colors.primary"),
        "light",
        &json!({"$alias": "colors.accent", "$mode": "dark"}),
        &UpdateModeOptions::default(),
    )
    .expect("alias literal replaces the value");
    let primary = raw_value(&doc, &path("colors.primary"));
    assert_eq!(
        primary["light"],
        json!({"$alias": "colors.accent", "$mode": "dark"})
    );
}

#[test]
fn test_create_and_delete_mode() {
    let mut doc = palette();

    doc.create_mode_value(&path("aString"), "emph", &json!("HELLO"))
        .expect("create succeeds");
    assert_eq!(
        doc.token(&path("aString")).unwrap().modes(&doc),
        vec!["default", "emph"]
    );

    let err = doc
        .create_mode_value(&path("aString"), "default", &json!("x"))
        .expect_err("existing mode cannot be created again");
    assert!(err.to_string().contains("already exists"));

    doc.delete_mode_value(&path("aString"), "emph").expect("delete succeeds");
    assert_eq!(doc.token(&path("aString")).unwrap().modes(&doc), vec!["default"]);

    let err = doc
        .delete_mode_value(&path("aString"), "default")
        .expect_err("the last mode cannot be deleted");
    assert!(err.to_string().contains("at least one mode"));
}

#[test]
fn test_mode_creation_restrictions() {
    let mut doc = palette();

    let err = doc
        .create_mode_value(&path("semantic.background"), "hover", &json!({"hex": "#ccc"}))
        .expect_err("collections fix their mode set");
    assert!(err.is_collection_fence());
    let err = doc
        .delete_mode_value(&path("semantic.background"), "dark")
        .expect_err("collections fix their mode set");
    assert!(err.is_collection_fence());

    let err = doc
        .create_mode_value(&path("aliasToString"), "x", &json!("y"))
        .expect_err("alias tokens own no modes");
    assert!(err.is_alias_restriction());
}

#[test]
fn test_resolve_value_aliases_in_place() {
    let mut doc = palette();

    doc.resolve_value_aliases(&path("colors.accent"))
        .expect("in-place resolution succeeds");
    let accent = raw_value(&doc, &path("colors.accent"));
    assert_eq!(accent["light"], json!({"hex": "#112233", "alpha": 1.0}));

    // Broken branches keep their literal: what does not exist cannot be
    // resolved.
    doc.resolve_value_aliases(&path("broken")).expect("operation succeeds");
    assert_eq!(
        raw_value(&doc, &path("broken")),
        json!({"default": {"$alias": "missing.token"}})
    );

    let err = doc
        .resolve_value_aliases(&path("aliasToString"))
        .expect_err("top-level aliases are out of scope");
    assert!(err.is_alias_restriction());
}
