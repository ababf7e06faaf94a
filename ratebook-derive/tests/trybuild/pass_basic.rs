#[derive(ratebook_derive::Record)]
#[record(constructor = "Tenant")]
struct TenantConfig {
    #[record(key)]
    name: String,
    #[record(default = 5)]
    retries: u32,
    #[record(rename = "timeout_secs", default = 30)]
    timeout: i64,
    #[record(default = ["alpha", "beta"])]
    roles: Vec<String>,
    #[record(default = 3.5)]
    ratio: f64,
    #[record(default = "per_second")]
    billing: ratebook::RateType,
    #[record(default = 720)]
    price: ratebook::Number,
    optional: Option<bool>,
    #[record(default = [1, 2, 3])]
    optional_numbers: Option<Vec<i64>>,
    #[record(ignore, init = "Vec::new()")]
    scratch: Vec<u8>,
}

fn main() {}
