use std::io::{self, BufRead, IsTerminal, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use ratebook::record::Record;
use ratebook::settings::DEFAULT_SETTINGS_FILE;
use ratebook::{
    ConfigEntry, DerivedPaths, EntryForm, Number, Overwrite, RateType, Settings, Upsert,
    UpsertEngine, UpsertReport,
};

#[derive(Parser)]
#[command(
    name = "ratebook",
    version,
    about = "Register or update client billing entries in a configuration listing"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the settings file.
    #[arg(short, long, default_value = DEFAULT_SETTINGS_FILE)]
    settings: PathBuf,

    /// Listing file to edit, overriding the settings file.
    #[arg(short, long)]
    listing: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a client, or update it after confirmation.
    Add(AddArgs),
    /// List client names in listing order.
    List,
    /// Print the stored fields of one client.
    Show { client: String },
    /// Remove a client.
    Remove { client: String },
    /// Print the paths derived from a client and folder prefix.
    Paths {
        #[arg(long)]
        client: String,
        #[arg(long)]
        folder_prefix: String,
    },
}

/// Form fields; anything omitted keeps the form default.
#[derive(Args)]
struct AddArgs {
    /// Client name, e.g. a tenant id.
    #[arg(long)]
    client: String,
    /// Folder prefix, e.g. 202505.
    #[arg(long)]
    folder_prefix: String,
    #[arg(long)]
    carrier: Option<String>,
    #[arg(long)]
    rate: Option<Number>,
    #[arg(long)]
    rate_type: Option<RateType>,
    /// S2C number.
    #[arg(long)]
    s2c: Option<String>,
    #[arg(long)]
    s2c_rate: Option<Number>,
    #[arg(long)]
    s2c_rate_type: Option<RateType>,
    /// Comma separated.
    #[arg(long)]
    chargeable_call_types: Option<String>,
    #[arg(long)]
    number1: Option<String>,
    #[arg(long)]
    number1_rate: Option<Number>,
    #[arg(long)]
    number1_rate_type: Option<RateType>,
    /// Comma separated.
    #[arg(long)]
    number1_chargeable_call_types: Option<String>,
    #[arg(long)]
    number2: Option<String>,
    #[arg(long)]
    number2_rate: Option<Number>,
    #[arg(long)]
    number2_rate_type: Option<RateType>,
    /// Comma separated.
    #[arg(long)]
    number2_chargeable_call_types: Option<String>,
    /// Overwrite an existing client without asking.
    #[arg(short, long)]
    yes: bool,
}

impl AddArgs {
    fn to_form(&self) -> EntryForm {
        let mut form = EntryForm {
            client: self.client.clone(),
            folder_prefix: self.folder_prefix.clone(),
            ..EntryForm::default()
        };

        fn set<T: Clone>(slot: &mut T, value: &Option<T>) {
            if let Some(value) = value {
                *slot = value.clone();
            }
        }

        set(&mut form.carrier, &self.carrier);
        set(&mut form.rate, &self.rate);
        set(&mut form.rate_type, &self.rate_type);
        set(&mut form.s2c, &self.s2c);
        set(&mut form.s2c_rate, &self.s2c_rate);
        set(&mut form.s2c_rate_type, &self.s2c_rate_type);
        set(&mut form.chargeable_call_types, &self.chargeable_call_types);
        set(&mut form.number1, &self.number1);
        set(&mut form.number1_rate, &self.number1_rate);
        set(&mut form.number1_rate_type, &self.number1_rate_type);
        set(
            &mut form.number1_chargeable_call_types,
            &self.number1_chargeable_call_types,
        );
        set(&mut form.number2, &self.number2);
        set(&mut form.number2_rate, &self.number2_rate);
        set(&mut form.number2_rate_type, &self.number2_rate_type);
        set(
            &mut form.number2_chargeable_call_types,
            &self.number2_chargeable_call_types,
        );
        form
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let mut settings = Settings::load_or_default(&cli.settings)
        .with_context(|| format!("failed to load settings from {}", cli.settings.display()))?;
    if let Some(listing) = cli.listing {
        settings.listing = listing;
    }
    let engine = UpsertEngine::from_settings(&settings);

    match cli.command {
        Commands::Add(args) => {
            let report = add(&engine, &args, confirm_overwrite).await?;
            let message = outcome_message(&args.client, &report);
            if report.written() {
                println!("{message}");
            } else {
                eprintln!("{message}");
            }
        }
        Commands::List => {
            for client in engine.clients().await? {
                println!("{client}");
            }
        }
        Commands::Show { client } => {
            let entry = show(&engine, &client).await?;
            for (name, value) in entry.to_raw().fields() {
                println!("{name:<30} {value}");
            }
        }
        Commands::Remove { client } => {
            remove(&engine, &client).await?;
            println!("Client `{client}` removed.");
        }
        Commands::Paths {
            client,
            folder_prefix,
        } => println!("{}", DerivedPaths::new(&folder_prefix, &client)),
    }

    Ok(())
}

/// Validates the form and upserts it; `ask` is consulted when the client already exists.
async fn add(
    engine: &UpsertEngine,
    args: &AddArgs,
    ask: impl FnOnce(&str) -> anyhow::Result<bool>,
) -> anyhow::Result<UpsertReport> {
    let entry = args
        .to_form()
        .to_entry()
        .context("please fill in both client name and folder prefix")?;

    let exists = !args.yes && engine.exists(&entry.client).await?;
    let overwrite = overwrite_decision(args.yes, exists, || ask(&entry.client))?;
    Ok(engine.upsert(&entry, overwrite).await?)
}

/// `--yes` confirms outright; otherwise only an existing client needs an answer.
fn overwrite_decision(
    yes: bool,
    exists: bool,
    ask: impl FnOnce() -> anyhow::Result<bool>,
) -> anyhow::Result<Overwrite> {
    if yes || (exists && ask()?) {
        Ok(Overwrite::Confirm)
    } else {
        Ok(Overwrite::Decline)
    }
}

fn outcome_message(client: &str, report: &UpsertReport) -> String {
    match report.outcome {
        Upsert::Declined => format!(
            "warning: entry not added, client `{client}` already exists. Re-run with --yes to overwrite."
        ),
        Upsert::Inserted => format!("Client `{client}` added.\n{}", report.paths),
        Upsert::Replaced { .. } => format!("Client `{client}` updated.\n{}", report.paths),
    }
}

async fn show(engine: &UpsertEngine, client: &str) -> anyhow::Result<ConfigEntry> {
    match engine.get(client).await? {
        Some(entry) => Ok(entry),
        None => anyhow::bail!("client `{client}` not found in {}", engine.path().display()),
    }
}

async fn remove(engine: &UpsertEngine, client: &str) -> anyhow::Result<()> {
    if !engine.remove(client).await? {
        anyhow::bail!("client `{client}` not found in {}", engine.path().display());
    }
    Ok(())
}

/// Asks on the terminal; a non-interactive stdin counts as "no".
fn confirm_overwrite(client: &str) -> anyhow::Result<bool> {
    let stdin = io::stdin();
    if !stdin.is_terminal() {
        return Ok(false);
    }

    print!("Client `{client}` already exists. Overwrite? [y/N] ");
    io::stdout().flush()?;

    let mut answer = String::new();
    stdin.lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes" | "Yes"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("ratebook").chain(args.iter().copied()))
            .expect("arguments parse")
    }

    fn add_args(args: &[&str]) -> AddArgs {
        let mut full = vec!["add", "--client", "acme", "--folder-prefix", "202505"];
        full.extend_from_slice(args);
        match parse(&full).command {
            Commands::Add(args) => args,
            _ => panic!("expected the add command"),
        }
    }

    fn engine_in(dir: &tempfile::TempDir) -> UpsertEngine {
        UpsertEngine::from_settings(&Settings {
            listing: dir.path().join("config.py"),
            ..Settings::default()
        })
    }

    #[test]
    fn flags_override_form_defaults() {
        let form = add_args(&[
            "--rate",
            "1.5",
            "--rate-type",
            "per_second",
            "--number1",
            "6281234",
            "--chargeable-call-types",
            "inbound call",
        ])
        .to_form();
        assert_eq!(form.client, "acme");
        assert_eq!(form.rate, Number::Decimal(1.5));
        assert_eq!(form.rate_type, RateType::PerSecond);
        assert_eq!(form.number1, "6281234");
        assert_eq!(form.chargeable_call_types, "inbound call");
        assert_eq!(form.carrier, "Atlasat");
        assert_eq!(form.s2c_rate, EntryForm::default().s2c_rate);
    }

    #[test]
    fn invalid_rate_is_a_parse_error() {
        let result = Cli::try_parse_from([
            "ratebook",
            "add",
            "--client",
            "acme",
            "--folder-prefix",
            "1",
            "--rate",
            "NaN",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn yes_confirms_without_asking() -> anyhow::Result<()> {
        let decision = overwrite_decision(true, true, || panic!("must not ask"))?;
        assert_eq!(decision, Overwrite::Confirm);
        Ok(())
    }

    #[test]
    fn new_client_is_not_asked_about() -> anyhow::Result<()> {
        let decision = overwrite_decision(false, false, || panic!("must not ask"))?;
        assert_eq!(decision, Overwrite::Decline);
        Ok(())
    }

    #[test]
    fn existing_client_follows_the_answer() -> anyhow::Result<()> {
        assert_eq!(overwrite_decision(false, true, || Ok(true))?, Overwrite::Confirm);
        assert_eq!(overwrite_decision(false, true, || Ok(false))?, Overwrite::Decline);
        Ok(())
    }

    #[tokio::test]
    async fn declined_add_keeps_file_and_warns() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let engine = engine_in(&dir);
        add(&engine, &add_args(&[]), |_| Ok(false)).await?;
        let before = std::fs::read_to_string(engine.path())?;

        let mut asked = None;
        let report = add(&engine, &add_args(&["--rate", "5"]), |client| {
            asked = Some(client.to_owned());
            Ok(false)
        })
        .await?;

        assert_eq!(asked.as_deref(), Some("acme"));
        assert_eq!(report.outcome, Upsert::Declined);
        assert!(outcome_message("acme", &report).starts_with("warning:"));
        assert_eq!(std::fs::read_to_string(engine.path())?, before);
        Ok(())
    }

    #[tokio::test]
    async fn yes_flag_replaces_existing_client() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let engine = engine_in(&dir);
        add(&engine, &add_args(&[]), |_| Ok(false)).await?;

        let report = add(&engine, &add_args(&["--rate", "5", "--yes"]), |_| {
            panic!("must not ask")
        })
        .await?;
        assert_eq!(report.outcome, Upsert::Replaced { removed: 1 });
        assert!(outcome_message("acme", &report).starts_with("Client `acme` updated."));
        assert_eq!(show(&engine, "ACME").await?.rate, Number::Integer(5));
        Ok(())
    }

    #[tokio::test]
    async fn missing_client_fails_show_and_remove() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let engine = engine_in(&dir);
        add(&engine, &add_args(&[]), |_| Ok(false)).await?;

        let err = show(&engine, "ghost").await.unwrap_err();
        assert!(err.to_string().contains("client `ghost` not found"));
        assert!(remove(&engine, "ghost").await.is_err());
        remove(&engine, "acme").await?;
        assert!(engine.clients().await?.is_empty());
        Ok(())
    }
}
