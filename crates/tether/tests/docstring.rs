use pretty_assertions::assert_eq;
use serde_json::json;
use tether::docstring::Docstring;

#[test]
fn named_and_typed_tags() {
    let doc = Docstring::parse(
        "Greets someone.\n\
         @param [String, nil] name who to greet\n\
         @return [String] the greeting\n\
         @raise [ArgumentError] when name is empty",
    );
    assert_eq!(doc.text, "Greets someone.");
    assert_eq!(
        serde_json::to_value(&doc.tags).unwrap(),
        json!([
            {"tag-name": "param", "name": "name", "types": ["String", "nil"], "text": "who to greet"},
            {"tag-name": "return", "name": null, "types": ["String"], "text": "the greeting"},
            {"tag-name": "raise", "name": null, "types": ["ArgumentError"], "text": "when name is empty"},
        ])
    );
}

#[test]
fn free_text_tags_keep_their_words() {
    let doc = Docstring::parse("@note the name [is] not parsed\n@since 0.1");
    assert_eq!(
        serde_json::to_value(&doc.tags).unwrap(),
        json!([
            {"tag-name": "note", "name": null, "types": null, "text": "the name [is] not parsed"},
            {"tag-name": "since", "name": null, "types": null, "text": "0.1"},
        ])
    );
}

#[test]
fn overload_has_parameters_and_a_nested_docstring() {
    let doc = Docstring::parse(
        "Raises.\n\
         @overload raise(kind, message = \"boom\")\n  \
           Raises a typed error.\n  \
           @param [String] kind",
    );
    let tag = &doc.tags[0];
    assert_eq!(tag.tag_name, "overload");
    assert_eq!(tag.name.as_deref(), Some("raise"));
    assert_eq!(tag.signature.as_deref(), Some("raise(kind, message = \"boom\")"));
    assert_eq!(
        tag.parameters,
        Some(vec![
            ("kind".to_owned(), None),
            ("message".to_owned(), Some("\"boom\"".to_owned())),
        ])
    );
    let nested = tag.docstring.as_deref().unwrap();
    assert_eq!(nested.text, "Raises a typed error.");
    assert_eq!(nested.tags[0].name.as_deref(), Some("kind"));
    assert_eq!(
        serde_json::to_value(tag).unwrap()["parameters"],
        json!([["kind", null], ["message", "\"boom\""]])
    );
}

#[test]
fn option_pairs_carry_defaults() {
    let doc = Docstring::parse("@option opts [Integer] :width (80) maximum line width");
    assert_eq!(
        serde_json::to_value(&doc.tags[0]).unwrap(),
        json!({
            "tag-name": "option",
            "name": "opts",
            "types": null,
            "text": null,
            "pair": {
                "tag-name": "option",
                "name": ":width",
                "types": ["Integer"],
                "text": "maximum line width",
                "defaults": ["80"],
            },
        })
    );
}

#[test]
fn example_keeps_title_and_indented_body() {
    let doc = Docstring::parse("Doubles.\n@example Basic use\n  double(2)\n    # => 4\nTrailing text.");
    let example = doc.tags_named("example").next().unwrap();
    assert_eq!(example.name.as_deref(), Some("Basic use"));
    assert_eq!(example.text.as_deref(), Some("double(2)\n  # => 4"));
    assert_eq!(doc.text, "Doubles.\nTrailing text.");
}

#[test]
fn empty_input() {
    assert_eq!(Docstring::parse(""), Docstring::default());
}
