//! Registers a client into a listing file the way the `ratebook add` command does.
//!
//! Run with:
//! ```shell
//! cargo run --example register_client
//! ```

use ratebook::{EntryForm, Overwrite, Result, Settings, Upsert, UpsertEngine};

#[tokio::main]
async fn main() -> Result<()> {
    let dir = std::env::temp_dir().join("ratebook-demo");
    std::fs::create_dir_all(&dir)?;
    let listing = dir.join("config.py");
    std::fs::write(
        &listing,
        "from billing.models import Files\n\nCONFIG = [\n]\n\nCLIENTS = {c.client: c for c in CONFIG}\n",
    )?;

    let engine = UpsertEngine::from_settings(&Settings {
        listing: listing.clone(),
        ..Settings::default()
    });

    // The form starts from the operator defaults; only the required fields are filled in here.
    let mut form = EntryForm {
        client: "acme".into(),
        folder_prefix: "202505".into(),
        number1: "6281234".into(),
        ..EntryForm::default()
    };
    if let Some(paths) = form.derived_paths() {
        println!("{paths}");
    }

    let report = engine.upsert(&form.to_entry()?, Overwrite::Decline).await?;
    println!("first upsert: {:?}", report.outcome);

    // Same client again without confirmation leaves the file alone.
    form.rate = "1.5".parse().unwrap_or_default();
    let report = engine.upsert(&form.to_entry()?, Overwrite::Decline).await?;
    assert_eq!(report.outcome, Upsert::Declined);

    let report = engine.upsert(&form.to_entry()?, Overwrite::Confirm).await?;
    println!("confirmed upsert: {:?}", report.outcome);

    println!("\n{}", std::fs::read_to_string(&listing)?);
    Ok(())
}
