//! End-to-end decode scenarios (§8 examples 1-4).

use serde::Deserialize;

#[test]
fn owner_dob_example_decodes_to_dynamic_value() {
    let doc = r#"
name = "TOML Example"

[owner]
dob = 1979-05-27T07:32:00-08:00
"#;
    let value: tomlcodec::Value = tomlcodec::from_str(doc).unwrap();
    let owner = value.as_table().unwrap().get("owner").unwrap().as_table().unwrap();
    let dob = owner.get("dob").unwrap();
    assert_eq!(dob.type_name(), "datetime");
    assert_eq!(dob.as_str(), None);
}

#[test]
fn integer_literal_forms_decode_to_expected_values() {
    #[derive(Deserialize)]
    struct Doc {
        hex: i64,
        oct: i64,
        bin: i64,
        million: i64,
    }
    let doc: Doc = tomlcodec::from_str(
        "hex = 0xDEADBEEF\noct = 0o17\nbin = 0b101\nmillion = 1_000_000\n",
    )
    .unwrap();
    assert_eq!(doc.hex, 3735928559);
    assert_eq!(doc.oct, 15);
    assert_eq!(doc.bin, 5);
    assert_eq!(doc.million, 1_000_000);
}

#[test]
fn repeated_array_tables_default_missing_field() {
    #[derive(Deserialize, Default)]
    struct Product {
        name: String,
        #[serde(default)]
        color: String,
    }
    #[derive(Deserialize)]
    struct Doc {
        products: Vec<Product>,
    }
    let doc: Doc = tomlcodec::from_str(
        "[[products]]\nname = \"Hammer\"\n[[products]]\nname = \"Nail\"\ncolor = \"gray\"\n",
    )
    .unwrap();
    assert_eq!(doc.products.len(), 2);
    assert_eq!(doc.products[0].color, "");
    assert_eq!(doc.products[1].color, "gray");
}

#[test]
fn multiline_basic_string_swallows_leading_line_continuation() {
    #[derive(Deserialize)]
    struct Doc {
        text: String,
    }
    let doc: Doc = tomlcodec::from_str("text = \"\"\"\\\n    The quick brown fox\"\"\"\n").unwrap();
    assert_eq!(doc.text, "The quick brown fox");
}

#[test]
fn dotted_key_then_conflicting_header_fails_structurally() {
    let err = tomlcodec::from_str::<tomlcodec::Value>("[a]\nb.c = 1\n[a.b]\n").unwrap_err();
    assert!(matches!(err, tomlcodec::Error::Structural { .. }));
}
