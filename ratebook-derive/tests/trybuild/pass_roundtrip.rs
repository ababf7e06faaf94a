use ratebook::record::Record;

#[derive(Debug, PartialEq, ratebook::Record)]
#[record(constructor = "Route")]
struct Route {
    #[record(key)]
    client: String,
    #[record(default = "Atlasat")]
    carrier: String,
    number: Option<String>,
}

fn main() {
    let route = Route {
        client: "acme".into(),
        carrier: "Telkom".into(),
        number: None,
    };
    let raw = route.to_raw();
    assert_eq!(raw.constructor(), "Route");
    assert_eq!(Route::KEY_FIELD, "client");
    assert_eq!(route.key(), "acme");
    assert_eq!(Route::from_raw(&raw).unwrap(), route);
}
