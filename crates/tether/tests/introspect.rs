use pretty_assertions::assert_eq;
use serde_json::json;
use tether::{
    CodeLoc, CollectConsole, Runtime,
    introspect::{Introspector, Language, ObjectInfo, SymbolIndex},
};

fn index_with(code: &str) -> SymbolIndex {
    let runtime = Runtime::default();
    runtime
        .evaluate(code, &CodeLoc::new("lib.tt", 10), &mut CollectConsole::new())
        .unwrap();
    SymbolIndex::new(runtime)
}

fn search(index: &SymbolIndex, prefix: &str) -> Vec<String> {
    let mut names: Vec<String> = index.search(prefix).collect();
    names.sort();
    names
}

// ============================================================================
// search
// ============================================================================

#[test]
fn search_lists_members_of_matching_types() {
    let index = SymbolIndex::new(Runtime::default());
    let names = search(&index, "Math.s");
    assert_eq!(names, vec!["Math.sin".to_owned(), "Math.sqrt".to_owned()]);
    assert_eq!(search(&index, "Math::"), vec!["Math::E".to_owned(), "Math::PI".to_owned()]);
}

#[test]
fn search_covers_type_names_and_instance_methods() {
    let index = SymbolIndex::new(Runtime::default());
    let types = search(&index, "Ma");
    assert!(types.contains(&"Map".to_owned()));
    assert!(types.contains(&"Math".to_owned()));
    assert!(types.contains(&"Map#keys".to_owned()));
    assert!(search(&index, "String#up").contains(&"String#upcase".to_owned()));
    assert!(search(&index, "Kernel.p").contains(&"Kernel.puts".to_owned()));
}

#[test]
fn search_includes_user_functions_and_is_restartable() {
    let index = index_with("fn mean(xs) = xs.sum / xs.length\nfn median(xs) = xs.sort[xs.length / 2]");
    assert_eq!(search(&index, "me"), vec!["mean".to_owned(), "median".to_owned()]);
    assert_eq!(search(&index, "me"), search(&index, "me"));
    assert!(search(&index, "zzz").is_empty());
}

#[test]
fn every_candidate_starts_with_the_prefix() {
    let index = SymbolIndex::new(Runtime::default());
    for prefix in ["", "S", "Integer", "Integer#", "Obj"] {
        for name in index.search(prefix) {
            assert!(name.starts_with(prefix), "{name} does not start with {prefix:?}");
        }
    }
    let all: Vec<String> = index.search("").collect();
    let mut unique = all.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(all.len(), unique.len(), "search yielded duplicates");
}

// ============================================================================
// describe
// ============================================================================

#[test]
fn describe_type() {
    let index = SymbolIndex::new(Runtime::default());
    let Some(ObjectInfo::Type(info)) = index.describe("Integer") else {
        panic!("Integer should resolve to a type");
    };
    assert_eq!(info.superclass.as_deref(), Some("Numeric"));
    assert!(info.instance_methods.new.contains(&"even?".to_owned()));
    assert!(info.instance_methods.old.contains(&"abs".to_owned()));
    assert!(!info.instance_methods.new.contains(&"abs".to_owned()));
    assert!(info.source_location.0.ends_with("numeric.rs"));

    let value = serde_json::to_value(&index.describe("Math").unwrap()).unwrap();
    assert_eq!(value["type"], json!("module"));
    assert_eq!(value["superclass"], json!(null));
    assert_eq!(value["source"], json!(null));
    assert!(value["methods"]["new"].as_array().unwrap().contains(&json!("sqrt")));
    assert!(value["source-location"][1].as_u64().unwrap() > 0);
    assert_eq!(serde_json::to_value(index.describe("String").unwrap()).unwrap()["included-modules"], json!(["Comparable"]));
}

#[test]
fn describe_native_methods() {
    let index = SymbolIndex::new(Runtime::default());
    let value = serde_json::to_value(index.describe("Math.sqrt").unwrap()).unwrap();
    assert_eq!(value["symbol"], json!("Math.sqrt"));
    assert_eq!(value["type"], json!("method"));
    assert_eq!(value["language"], json!("native"));
    assert_eq!(value["visibility"], json!("public"));
    assert!(value["signature"].as_str().unwrap().starts_with('('));

    let Some(ObjectInfo::Method(puts)) = index.describe("Object#puts") else {
        panic!("Kernel functions are instance methods of every object");
    };
    assert_eq!(puts.symbol, "Object#puts");
    assert_eq!(puts.visibility, tether::Visibility::Private);

    assert_eq!(index.describe("puts").unwrap().symbol(), "Kernel.puts");
}

#[test]
fn describe_user_function() {
    let index = index_with("\n## Averages a list.\n## @param [List] xs\nfn mean(xs) = xs.sum / xs.length");
    let Some(ObjectInfo::Method(info)) = index.describe("mean") else {
        panic!("user functions resolve by bare name");
    };
    assert_eq!(info.language, Language::Tether);
    assert_eq!(info.source_location, ("lib.tt".to_owned(), 13));
    assert_eq!(info.signature, "(xs)");
    assert_eq!(info.source.as_deref(), Some("fn mean(xs) = xs.sum / xs.length"));
    assert_eq!(info.doc.text, "Averages a list.");
    assert_eq!(info.doc.tags[0].name.as_deref(), Some("xs"));
    assert_eq!(index.describe("String#mean").unwrap().symbol(), "mean");
}

#[test]
fn unknown_symbols() {
    let index = SymbolIndex::new(Runtime::default());
    for symbol in ["DoesNotExist123", "Math.nope", "Nope#length", "String#"] {
        assert!(index.describe(symbol).is_none(), "{symbol} should not resolve");
    }
}
