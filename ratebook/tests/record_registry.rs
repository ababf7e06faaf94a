use ratebook::{
    KeyMatch, ListingFormat, ListingOptions, OrderingPolicy, Overwrite, RatebookError, Record,
    Registry, Result, Upsert,
};

#[derive(Debug, Clone, PartialEq, Record)]
#[record(constructor = "Trunk")]
struct Trunk {
    #[record(key)]
    name: String,
    #[record(default = 30)]
    channels: u32,
    #[record(rename = "codecs")]
    codec_list: Vec<String>,
    fallback: Option<String>,
    #[record(ignore)]
    dirty: bool,
}

fn trunk(name: &str, channels: u32) -> Trunk {
    Trunk {
        name: name.into(),
        channels,
        codec_list: vec!["g711".into()],
        fallback: None,
        dirty: true,
    }
}

const TRUNKS: &str = "TRUNKS = [\n    Trunk(name=\"west\", codecs=[]),\n    Trunk(name=\"east\", channels=12, codecs=[\"g729\"], fallback=\"west\"),\n]\n";

fn options(ordering: OrderingPolicy) -> ListingOptions {
    ListingOptions {
        marker: "TRUNKS".into(),
        ordering,
        ..ListingOptions::for_record::<Trunk>()
    }
}

#[tokio::test]
async fn derived_records_load_with_defaults() -> Result<()> {
    let registry = Registry::from_string(TRUNKS, options(OrderingPolicy::Front))?;
    let all = registry.get_all::<Trunk>().await?;
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].channels, 30);
    assert!(!all[0].dirty);
    assert_eq!(all[1].fallback.as_deref(), Some("west"));
    assert_eq!(all[1].codec_list, vec!["g729".to_string()]);
    Ok(())
}

#[tokio::test]
async fn preserve_policy_keeps_position() -> Result<()> {
    let registry = Registry::from_string(TRUNKS, options(OrderingPolicy::Preserve))?;
    let outcome = registry.upsert(&trunk("WEST", 8), Overwrite::Confirm).await?;
    assert_eq!(outcome, Upsert::Replaced { removed: 1 });
    registry.upsert(&trunk("north", 4), Overwrite::Confirm).await?;
    assert_eq!(registry.keys::<Trunk>().await, vec!["WEST", "east", "north"]);

    let text = registry.save_str().await?;
    assert!(text.contains("    Trunk(name=\"east\", channels=12, codecs=[\"g729\"], fallback=\"west\"),\n"));
    assert!(!text.contains("dirty"));
    Ok(())
}

#[tokio::test]
async fn exact_matching_treats_case_as_distinct() -> Result<()> {
    let registry = Registry::from_string(
        TRUNKS,
        ListingOptions {
            key_match: KeyMatch::Exact,
            ..options(OrderingPolicy::Sorted)
        },
    )?;
    let outcome = registry.upsert(&trunk("West", 8), Overwrite::Decline).await?;
    assert_eq!(outcome, Upsert::Inserted);
    assert_eq!(registry.keys::<Trunk>().await, vec!["east", "west", "West"]);
    Ok(())
}

#[tokio::test]
async fn type_errors_name_record_and_field() {
    let registry = Registry::from_string(
        "TRUNKS = [\n    Trunk(name=\"west\", channels=\"many\", codecs=[]),\n]\n",
        options(OrderingPolicy::Front),
    )
    .expect("listing parses");
    let err = registry.get::<Trunk>("west").await.unwrap_err();
    match err {
        RatebookError::TypeMismatch { record, field, .. } => {
            assert_eq!(record, "Trunk");
            assert_eq!(field, "channels");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn toml_listing_round_trips_through_registry() -> Result<()> {
    let source = "title = \"trunks\"\n\n[[TRUNKS]]\nname = \"west\"\ncodecs = []\n";
    let registry = Registry::from_string(
        source,
        ListingOptions {
            format: ListingFormat::Toml,
            ..options(OrderingPolicy::Front)
        },
    )?;
    registry.upsert(&trunk("east", 12), Overwrite::Confirm).await?;

    let text = registry.save_str().await?;
    assert!(text.contains("title = \"trunks\""));
    assert!(!text.contains("fallback"));

    let reloaded = Registry::from_string(
        &text,
        ListingOptions {
            format: ListingFormat::Toml,
            ..options(OrderingPolicy::Front)
        },
    )?;
    assert_eq!(reloaded.keys::<Trunk>().await, vec!["east", "west"]);
    let east = reloaded.get::<Trunk>("east").await?.expect("east stored");
    assert_eq!(east.channels, 12);
    assert!(!east.dirty);
    Ok(())
}
