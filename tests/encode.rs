//! End-to-end encode scenario (§8 example 6) plus round-trip checks.

use serde::{Deserialize, Serialize};

#[test]
fn nested_struct_emits_table_with_literal_quoted_strings() {
    #[derive(Serialize)]
    struct Name {
        first: String,
        last: String,
    }
    #[derive(Serialize)]
    struct Doc {
        name: Name,
    }
    let doc = Doc { name: Name { first: "Tom".to_string(), last: "Preston-Werner".to_string() } };
    let out = tomlcodec::to_string(&doc).unwrap();
    assert_eq!(out, "\n[name]\nfirst = 'Tom'\nlast = 'Preston-Werner'\n");
}

#[test]
fn round_trips_through_decode_and_encode() {
    #[derive(Deserialize, Serialize)]
    struct Product {
        name: String,
        #[serde(default)]
        color: String,
    }
    #[derive(Deserialize, Serialize)]
    struct Doc {
        products: Vec<Product>,
    }
    let input = "[[products]]\nname = 'Hammer'\ncolor = 'gray'\n\n[[products]]\nname = 'Nail'\n";
    let decoded: Doc = tomlcodec::from_str(input).unwrap();
    let rendered = tomlcodec::to_string(&decoded).unwrap();
    let redecoded: Doc = tomlcodec::from_str(&rendered).unwrap();
    assert_eq!(redecoded.products.len(), 2);
    assert_eq!(redecoded.products[0].color, "gray");
    assert_eq!(redecoded.products[1].color, "");
}
