//! Tiered resolution results, deep resolution, and serialization options.

use serde_json::json;
use tokentree::{
    TokenDocument,
    resolve::{ModeTier, TopTier, UiModeValue},
    token::JsonValueOptions,
};

use crate::helpers::*;

#[test]
fn test_stateful_value_classifies_each_mode() {
    let doc = palette();

    let primary = doc.token(&path("colors.primary")).unwrap();
    let TopTier::Value(stateful) = primary.stateful_value(&doc) else {
        panic!("mode-map token classifies as Value");
    };
    assert_eq!(stateful.mode_names(), vec!["dark", "light"]);
    assert!(stateful.get("light").unwrap().is_raw());
    assert!(stateful.get("dark").unwrap().is_raw());

    let accent = doc.token(&path("colors.accent")).unwrap();
    let TopTier::Value(stateful) = accent.stateful_value(&doc) else {
        panic!("mode-map token classifies as Value");
    };
    let alias = stateful
        .get("light")
        .unwrap()
        .as_resolvable_alias()
        .expect("explicit alias resolves");
    assert_eq!(alias.target, path("colors.primary"));
    assert_eq!(alias.mode.as_deref(), Some("dark"));
    assert!(stateful.get("dark").unwrap().is_raw());
}

#[test]
fn test_broken_alias_is_data_not_error() {
    let doc = palette();

    let broken = doc.token(&path("broken")).unwrap();
    let TopTier::Value(stateful) = broken.stateful_value(&doc) else {
        panic!("mode-map token classifies as Value");
    };
    let site = stateful
        .get("default")
        .unwrap()
        .as_unresolvable_alias()
        .expect("missing target classifies as unresolvable");
    assert_eq!(site.reason, "Token \"missing.token\" does not exist");

    // Default serialization keeps the literal rather than failing.
    let raw = broken
        .json_value(&doc, &JsonValueOptions::resolved())
        .expect("resolved read tolerates broken aliases");
    assert_eq!(raw, json!({"default": {"$alias": "missing.token"}}));
}

#[test]
fn test_top_level_alias_tiers() {
    let mut doc = palette();

    let alias = doc.token(&path("aliasToString")).unwrap();
    match alias.stateful_value(&doc) {
        TopTier::ResolvableAlias(resolved) => {
            assert_eq!(resolved.target, path("aString"));
            assert_eq!(resolved.mode, None);
        }
        other => panic!("expected resolvable top-level alias, got {other}"),
    }

    doc.insert_token(path("dangling"), "string", &json!({"$alias": "gone"}), None, None)
        .expect("insert succeeds");
    let dangling = doc.token(&path("dangling")).unwrap();
    match dangling.stateful_value(&doc) {
        TopTier::UnresolvableAlias(broken) => {
            assert_eq!(broken.reason, "Token \"gone\" does not exist");
        }
        other => panic!("expected unresolvable top-level alias, got {other}"),
    }
}

#[test]
fn test_modes_flow_through_alias_chains() {
    let doc = TokenDocument::from_json(&json!({
        "c": {"$type": "string", "$value": {"default": "end", "loud": "END"}},
        "b": {"$type": "string", "$value": {"$alias": "c"}},
        "a": {"$type": "string", "$value": {"$alias": "b"}}
    }))
    .expect("chain imports");

    let a = doc.token(&path("a")).unwrap();
    assert_eq!(a.modes(&doc), vec!["default", "loud"]);
    assert!(a.is_fully_resolvable(&doc));

    let resolved = a
        .json_value(&doc, &JsonValueOptions::resolved())
        .expect("chain resolves");
    assert_eq!(resolved, json!({"default": "end", "loud": "END"}));
}

#[test]
fn test_top_level_alias_cycle_has_no_modes() {
    let doc = TokenDocument::from_json(&json!({
        "p": {"$type": "string", "$value": {"$alias": "q"}},
        "q": {"$type": "string", "$value": {"$alias": "p"}}
    }))
    .expect("cycle imports");

    let p = doc.token(&path("p")).unwrap();
    assert!(p.modes(&doc).is_empty());
    assert!(!p.is_fully_resolvable(&doc));
}

#[test]
fn test_mode_less_alias_defaults_to_own_mode() {
    let doc = palette();

    let background = doc.token(&path("semantic.background")).unwrap();
    let ui = background.ui_value_on_mode(&doc, "dark");
    let tier = ui.as_mode().expect("mode exists");
    let alias = tier
        .as_resolvable_alias()
        .expect("mode-less alias resolves to the same-named mode");
    assert_eq!(alias.target, path("colors.primary"));
    assert_eq!(alias.mode.as_deref(), Some("dark"));

    assert!(background.ui_value_on_mode(&doc, "hover").is_unknown());
}

#[test]
fn test_ui_value_on_mode_through_top_level_alias() {
    let doc = palette();

    let alias = doc.token(&path("aliasToString")).unwrap();
    match alias.ui_value_on_mode(&doc, "default") {
        UiModeValue::Mode(ModeTier::ResolvableAlias(resolved)) => {
            assert_eq!(resolved.target, path("aString"));
            assert_eq!(resolved.mode.as_deref(), Some("default"));
        }
        other => panic!("expected per-mode alias view, got {other:?}"),
    }
    assert!(alias.ui_value_on_mode(&doc, "hover").is_unknown());
}

#[test]
fn test_deep_resolution_across_tokens_and_tiers() {
    let doc = palette();

    // Mode-level alias into another token's mode.
    let accent = doc.token(&path("colors.accent")).unwrap();
    let resolved = accent
        .json_value(&doc, &JsonValueOptions::resolved())
        .expect("resolution succeeds");
    assert_eq!(
        resolved,
        json!({
            "light": {"hex": "#112233", "alpha": 1.0},
            "dark": {"hex": "#445566", "alpha": 0.9}
        })
    );

    // Value-level alias nested inside a composite.
    let fancy = doc.token(&path("fancy")).unwrap();
    let resolved = fancy
        .json_value(&doc, &JsonValueOptions::resolved())
        .expect("resolution succeeds");
    assert_eq!(resolved, json!({"light": {"hex": "hello", "alpha": 1.0}}));

    // Top-level alias resolves transitively to the target's mode map.
    let alias = doc.token(&path("aliasToString")).unwrap();
    let resolved = alias
        .json_value(&doc, &JsonValueOptions::resolved())
        .expect("resolution succeeds");
    assert_eq!(resolved, json!({"default": "hello"}));
}

#[test]
fn test_alias_free_value_round_trips_through_resolution() {
    let doc = palette();
    let primary = doc.token(&path("colors.primary")).unwrap();

    let raw = primary
        .json_value(&doc, &JsonValueOptions::raw())
        .expect("raw read succeeds");
    let resolved = primary
        .json_value(&doc, &JsonValueOptions::resolved())
        .expect("resolved read succeeds");
    assert_eq!(raw, resolved);
    assert!(primary.is_fully_resolvable(&doc));
}

#[test]
fn test_cycle_detection_is_data_by_default() {
    let doc = cycle_pair();

    let x = doc.token(&path("x")).unwrap();
    let resolved = x
        .json_value(&doc, &JsonValueOptions::resolved())
        .expect("cycles do not fail the default read");
    assert_eq!(resolved, json!({"default": {"$alias": "x"}}));

    assert!(!x.is_fully_resolvable(&doc));
    let resolvability = x.modes_resolvability(&doc);
    assert_eq!(resolvability.get("default"), Some(&false));

    let err = x
        .json_value(&doc, &JsonValueOptions::strict())
        .expect_err("strict read escalates the cycle");
    assert!(err.is_unresolved());
    assert_eq!(err.to_string(), "Cannot resolve alias reference(s): x");
}

#[test]
fn test_json_value_mode_narrowing() {
    let doc = palette();
    let accent = doc.token(&path("colors.accent")).unwrap();

    let narrowed = accent
        .json_value(&doc, &JsonValueOptions::resolved().with_mode("light"))
        .expect("narrowed read succeeds");
    assert_eq!(narrowed, json!({"light": {"hex": "#112233", "alpha": 1.0}}));

    let raw = accent
        .json_value(&doc, &JsonValueOptions::raw().with_mode("dark"))
        .expect("raw narrowed read succeeds");
    assert_eq!(raw, json!({"dark": {"hex": "#445566", "alpha": 0.9}}));

    let err = accent
        .json_value(&doc, &JsonValueOptions::raw().with_mode("nope"))
        .expect_err("unknown mode fails");
    assert!(err.is_not_found());
    assert_eq!(
        err.to_string(),
        "Mode \"nope\" does not exist on token \"colors.accent\""
    );
}

#[test]
fn test_strict_json_value_names_missing_targets() {
    let doc = palette();
    let broken = doc.token(&path("broken")).unwrap();

    let err = broken
        .json_value(&doc, &JsonValueOptions::strict())
        .expect_err("strict read escalates broken aliases");
    assert!(err.is_unresolved());
    assert_eq!(
        err.to_string(),
        "Cannot resolve alias reference(s): missing.token"
    );
}

#[test]
fn test_strict_json_value_names_each_missing_target_once() {
    let mut doc = palette();
    doc.insert_token(
        path("multi"),
        "string",
        &json!({
            "a": {"$alias": "gone"},
            "b": {"$alias": "elsewhere"},
            "c": {"$alias": "gone"}
        }),
        None,
        None,
    )
    .expect("insert succeeds");

    let multi = doc.token(&path("multi")).unwrap();
    let err = multi
        .json_value(&doc, &JsonValueOptions::strict())
        .expect_err("strict read escalates broken aliases");
    // "gone" breaks two modes but is named once, after the list is sorted.
    assert_eq!(
        err.to_string(),
        "Cannot resolve alias reference(s): elsewhere, gone"
    );
}

#[test]
fn test_raw_read_of_top_level_alias_keeps_literal_when_narrowed() {
    let doc = palette();
    let alias = doc.token(&path("aliasToString")).unwrap();

    // The mode exists (transitively, on the target), but a raw read never
    // resolves, so the stored alias literal comes back whole.
    let raw = alias
        .json_value(&doc, &JsonValueOptions::raw().with_mode("default"))
        .expect("the target's modes admit the narrowing");
    assert_eq!(raw, json!({"$alias": "aString"}));
}

#[test]
fn test_resolve_deep_stateful_for_mode_follows_hops() {
    let doc = TokenDocument::from_json(&json!({
        "end": {"$type": "string", "$value": {"default": "value"}},
        "middle": {"$type": "string", "$value": {"default": {"$alias": "end"}}},
        "start": {"$type": "string", "$value": {"default": {"$alias": "middle"}}}
    }))
    .expect("chain imports");

    let start = doc.token(&path("start")).unwrap();
    let hop = start
        .resolve_deep_stateful_value_for_mode(&doc, "default")
        .expect("resolution succeeds");
    assert_eq!(hop.token, path("end"));
    assert_eq!(hop.mode, "default");
    assert_eq!(hop.result, ModeTier::Raw(json!("value")));

    let err = start
        .resolve_deep_stateful_value_for_mode(&doc, "nope")
        .expect_err("unknown mode fails");
    assert!(err.is_not_found());
}

#[test]
fn test_resolve_deep_stateful_for_mode_rejects_top_level_alias() {
    let doc = palette();
    let alias = doc.token(&path("aliasToString")).unwrap();

    let err = alias
        .resolve_deep_stateful_value_for_mode(&doc, "default")
        .expect_err("top-level alias is a structural error here");
    assert_eq!(err.module(), "resolve");
}

#[test]
fn test_combinators_over_live_document() {
    let doc = palette();
    let accent = doc.token(&path("colors.accent")).unwrap();

    let TopTier::Value(stateful) = accent.stateful_value(&doc) else {
        panic!("mode-map token classifies as Value");
    };
    let summary = stateful.map_modes(|mode, tier| {
        tier.clone()
            .into_result()
            .map_raw(|_| json!(format!("{mode}: literal")))
            .map_resolvable(|alias| json!(format!("{mode} -> {}", alias.target)))
            .unwrap()
    });
    assert_eq!(
        summary,
        vec![
            json!("dark: literal"),
            json!("light -> colors.primary")
        ]
    );
}
