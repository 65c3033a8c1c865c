//! `site-admin`: operator tooling for the community site

use anyhow::{bail, Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use site_image::SizePreset;
use site_model::{MemberField, Roster};
use site_sync::{MemoryStore, SiteConfig, SiteContext, WriteOutcome};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Bound on how long the demo waits for the store to settle
const DEMO_WAIT: Duration = Duration::from_secs(10);

fn cli() -> Command {
    Command::new("site-admin")
        .version(site_sync::VERSION)
        .about("Community site admin tooling")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON"),
        )
        .subcommand(
            Command::new("encode")
                .about("Downscale and re-encode an image as it would be stored")
                .arg(
                    Arg::new("path")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Image file to encode"),
                )
                .arg(
                    Arg::new("preset")
                        .long("preset")
                        .default_value("photo")
                        .value_parser(value_parser!(SizePreset))
                        .help("Size preset: photo or icon"),
                )
                .arg(
                    Arg::new("data-url")
                        .long("data-url")
                        .action(ArgAction::SetTrue)
                        .help("Print the full data URL"),
                ),
        )
        .subcommand(
            Command::new("demo")
                .about("Run a session against an in-memory store and print the view")
                .arg(
                    Arg::new("deny-writes")
                        .long("deny-writes")
                        .action(ArgAction::SetTrue)
                        .help("Reject admin writes after seeding"),
                )
                .arg(
                    Arg::new("dump")
                        .long("dump")
                        .value_parser(value_parser!(PathBuf))
                        .help("Write a local dump of the final view"),
                ),
        )
        .subcommand(Command::new("config").about("Print the effective configuration as TOML"))
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn load_config(matches: &ArgMatches) -> Result<SiteConfig> {
    match matches.get_one::<PathBuf>("config") {
        Some(path) => SiteConfig::load(path)
            .await
            .with_context(|| format!("loading {}", path.display())),
        None => Ok(SiteConfig::default()),
    }
}

async fn encode(config: &SiteConfig, args: &ArgMatches) -> Result<()> {
    let Some(path) = args.get_one::<PathBuf>("path") else {
        bail!("missing image path");
    };
    let preset = args
        .get_one::<SizePreset>("preset")
        .copied()
        .unwrap_or(SizePreset::Photo);

    let encoded = config
        .images
        .codec()
        .encode_file(path, preset)
        .await
        .with_context(|| format!("encoding {}", path.display()))?;

    if args.get_flag("data-url") {
        println!("{}", encoded.as_str());
    } else {
        let decoded = site_image::decode_encoded(&encoded)?;
        println!(
            "{}x{} {} ({} bytes, preset {preset})",
            decoded.width(),
            decoded.height(),
            encoded.media_type(),
            encoded.len(),
        );
    }
    Ok(())
}

async fn demo(config: SiteConfig, args: &ArgMatches) -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    let admin = config.admin.clone();
    let ctx = SiteContext::start(store.clone(), config);

    tokio::time::timeout(
        DEMO_WAIT,
        ctx.wait_until(|v| !v.loading && !v.main_roster.is_empty()),
    )
    .await
    .context("store did not settle")?;

    if args.get_flag("deny-writes") {
        store.deny_all_writes();
    }
    if !ctx.login(&admin.username, &admin.password) {
        bail!("configured admin credential was rejected");
    }

    let writer = ctx.admin()?;
    let (id, created) = writer.create_member(Roster::Main).await?;
    if created.is_persisted() {
        tokio::time::timeout(
            DEMO_WAIT,
            ctx.wait_until(|v| v.main_roster.iter().any(|m| m.id == id)),
        )
        .await
        .context("created member was not echoed")?;
    }
    let renamed = writer
        .update_member(Roster::Main, &id, MemberField::Name("Demo Member".into()))
        .await?;
    report("create", &created);
    report("rename", &renamed);

    if renamed.is_persisted() {
        tokio::time::timeout(
            DEMO_WAIT,
            ctx.wait_until(|v| v.main_roster.iter().any(|m| m.id == id && m.name == "Demo Member")),
        )
        .await
        .context("write was not echoed")?;
    }

    let view = ctx.view();
    println!("{}", serde_json::to_string_pretty(&view)?);

    if let Some(path) = args.get_one::<PathBuf>("dump") {
        ctx.dump()
            .write(path)
            .await
            .with_context(|| format!("writing dump to {}", path.display()))?;
        tracing::info!(path = %path.display(), "local dump written");
    }

    let stats = store.stats();
    tracing::info!(
        writes = stats.writes,
        rejected = stats.rejected_writes,
        "demo finished"
    );
    ctx.shutdown().await;
    Ok(())
}

fn report(action: &str, outcome: &WriteOutcome) {
    match outcome {
        WriteOutcome::Persisted => tracing::info!(action, "persisted"),
        WriteOutcome::LocalOnly(kind) => tracing::warn!(action, %kind, "kept locally only"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("log-json"));
    let config = load_config(&matches).await?;

    match matches.subcommand() {
        Some(("encode", args)) => encode(&config, args).await,
        Some(("demo", args)) => demo(config, args).await,
        Some(("config", _)) => {
            print!("{}", config.to_toml_string()?);
            Ok(())
        }
        _ => unreachable!("subcommand is required"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_definition_is_consistent() {
        cli().debug_assert();
    }

    #[test]
    fn parses_encode_preset() {
        let matches = cli()
            .try_get_matches_from(["site-admin", "encode", "logo.png", "--preset", "icon"])
            .unwrap();
        let (name, args) = matches.subcommand().unwrap();
        assert_eq!(name, "encode");
        assert_eq!(args.get_one::<SizePreset>("preset"), Some(&SizePreset::Icon));
        assert!(!args.get_flag("data-url"));
    }

    #[test]
    fn global_flags_follow_subcommands() {
        let matches = cli()
            .try_get_matches_from(["site-admin", "demo", "--deny-writes", "--log-json"])
            .unwrap();
        assert!(matches.get_flag("log-json"));
        let (_, args) = matches.subcommand().unwrap();
        assert!(args.get_flag("deny-writes"));
        assert!(args.get_one::<PathBuf>("dump").is_none());
    }

    #[test]
    fn subcommand_is_required() {
        assert!(cli().try_get_matches_from(["site-admin"]).is_err());
    }
}
