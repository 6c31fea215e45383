use anyhow::Context as AnyhowContext;
use log_error::LogError;
use once_cell::sync::Lazy;
use recon_types::DayKey;
use sales_recon::{store, sync, ReconConfig};
use std::env;
use std::path::PathBuf;

fn env_path(key: &str, default: &str) -> PathBuf {
    PathBuf::from(envmnt::get_or(key, default))
}

static SETTINGS_PATH: Lazy<PathBuf> = Lazy::new(|| env_path("RECON_SETTINGS", "recon.yml"));
static DAILY_RECORDS_PATH: Lazy<PathBuf> =
    Lazy::new(|| env_path("DAILY_RECORDS_PATH", "storage/daily.json"));
static WEEKLY_RECORDS_PATH: Lazy<PathBuf> =
    Lazy::new(|| env_path("WEEKLY_RECORDS_PATH", "storage/weekly.json"));
static INVENTORY_PATH: Lazy<PathBuf> =
    Lazy::new(|| env_path("INVENTORY_PATH", "storage/inventory.json"));
static CORRECTIONS_PATH: Lazy<PathBuf> =
    Lazy::new(|| env_path("CORRECTIONS_PATH", "storage/corrections.json"));
static SNAPSHOT_PATH: Lazy<PathBuf> =
    Lazy::new(|| env_path("SNAPSHOT_PATH", "storage/snapshot.json"));

fn main() -> Result<(), anyhow::Error> {
    if let Err(env::VarError::NotPresent) = env::var("RUST_LOG") {
        env::set_var("RUST_LOG", "INFO");
    }
    pretty_env_logger::formatted_timed_builder()
        .parse_default_env()
        .init();

    match std::fs::File::open(".env") {
        Ok(_) => envmnt::load_file(".env")?,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            log::debug!("No .env file, using process environment");
        }
        Err(err) => {
            return Err(anyhow::anyhow!("Unable to open .env file: {err}"));
        }
    }

    let config = ReconConfig::load_or_default(&SETTINGS_PATH);

    let input = sync::SyncInput {
        days: store::read_keyed(&DAILY_RECORDS_PATH).context("Unable to load daily records")?,
        stored_weeks: store::read_keyed(&WEEKLY_RECORDS_PATH)
            .context("Unable to load weekly records")?,
        stock: store::read_json(&INVENTORY_PATH)
            .log_error("Unable to load inventory")
            .unwrap_or_default(),
        corrections: store::read_json(&CORRECTIONS_PATH)
            .log_error("Unable to load forecast corrections")
            .unwrap_or_default(),
    };
    let today = DayKey::new(time::OffsetDateTime::now_utc().date());
    let as_of = sync::as_of(&input.days, today);

    let out = sync::run(&input, &config, as_of);

    store::write_json(&WEEKLY_RECORDS_PATH, &out.weeks)?;
    store::write_json(&SNAPSHOT_PATH, &out.snapshot)?;
    log::info!(
        "Snapshot for {as_of}: {} SKUs, {} critical, {} to reorder",
        out.snapshot.items.len(),
        out.snapshot.critical_count,
        out.snapshot.reorder_count
    );

    match out.kpi {
        Some((summary, delta)) => {
            log::info!(
                "{}..{} ({} weeks): revenue {:.2}, profit {:.2}, margin {:.1}%, ROAS {:.2}, TACOS {:.1}%",
                summary.from,
                summary.to,
                summary.weeks,
                summary.total.revenue,
                summary.total.net_profit,
                summary.total.net_margin,
                summary.total.roas,
                summary.total.tacos
            );
            if let Some(delta) = delta {
                log::info!(
                    "vs previous period: revenue {:+.1}%, profit {:+.1}%, ad spend {:+.1}%",
                    delta.revenue,
                    delta.net_profit,
                    delta.ad_spend
                );
            }
        }
        None => log::info!("No weeks to summarize"),
    }
    Ok(())
}
