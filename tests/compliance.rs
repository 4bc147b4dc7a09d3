//! A representative slice of TOML 1.0 conformance behavior (§8), covering
//! the duplicate-definition forms and a handful of valid/invalid documents
//! drawn from the areas the BurntSushi `toml-test` suite exercises most:
//! table redefinition, array-of-tables extension, and basic scalar forms.

fn decodes_ok(src: &str) -> bool {
    tomlcodec::from_str::<tomlcodec::Value>(src).is_ok()
}

#[test]
fn every_duplicate_definition_form_is_structurally_rejected() {
    let cases = [
        "[a]\n[a]\n",
        "a = 1\na = 2\n",
        "[a]\n[a.b]\n[a]\n",
        "a.b = 1\n[a.b]\n",
        "[[a]]\n[a]\n",
    ];
    for src in cases {
        let err = tomlcodec::from_str::<tomlcodec::Value>(src).unwrap_err();
        assert!(matches!(err, tomlcodec::Error::Structural { .. }), "expected structural error for {:?}, got {:?}", src, err);
    }
}

#[test]
fn valid_documents_decode_successfully() {
    let cases = [
        "key = \"value\"\n",
        "[table]\nkey = \"value\"\n",
        "[[array]]\nname = \"a\"\n[[array]]\nname = \"b\"\n",
        "inline = { x = 1, y = 2 }\n",
        "inline_dotted = { a.b = 1, a.c = 2 }\n",
        "array = [1, 2, 3]\n",
        "mixed = [1, \"two\", 3.0]\n",
        "nested.dotted.key = true\n",
        "float = -3.1415\n",
        "inf_val = inf\n",
        "nan_val = nan\n",
        "bin = 0b1010\n",
        "local_date = 1979-05-27\n",
        "local_time = 07:32:00\n",
        "local_dt = 1979-05-27T07:32:00\n",
        "offset_dt = 1979-05-27T07:32:00Z\n",
    ];
    for src in cases {
        assert!(decodes_ok(src), "expected {:?} to decode successfully", src);
    }
}

#[test]
fn invalid_documents_are_rejected() {
    let cases = [
        "key = \n",
        "key = \"unterminated\n",
        "= \"no key\"\n",
        "[table]\n[table]\n",
        "a = 01\n",
        "a = 0b102\n",
        "a = 01.5\n",
        "a = \"bare\rcr\"\n",
    ];
    for src in cases {
        assert!(!decodes_ok(src), "expected {:?} to be rejected", src);
    }
}

#[test]
fn array_of_tables_round_trips_through_dynamic_value() {
    let src = "[[fruit]]\nname = \"apple\"\n\n[[fruit]]\nname = \"banana\"\n";
    let value: tomlcodec::Value = tomlcodec::from_str(src).unwrap();
    let rendered = tomlcodec::to_string(&value).unwrap();
    let reparsed: tomlcodec::Value = tomlcodec::from_str(&rendered).unwrap();
    assert_eq!(value, reparsed);
}
