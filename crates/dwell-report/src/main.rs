mod bootstrap;
mod output;

use anyhow::{Context, Result};
use dwell_core::settings::Settings;
use dwell_runtime::{build_report, DataManager, FilterSelection, Reloader};
use dwell_ui::app::App;

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::load_with_last_used();

    bootstrap::ensure_directories()?;
    bootstrap::setup_logging(&settings.log_level, settings.log_file.as_deref())?;

    tracing::info!("dwell-report v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "Output: {}, Theme: {}, Timezone: {}",
        settings.output,
        settings.theme,
        settings.timezone
    );

    if settings.clear && settings.file.is_none() && settings.url.is_none() {
        println!("Saved parameters cleared.");
        return Ok(());
    }

    let location = settings.source_location()?;
    let mut manager = DataManager::new(settings.column_mapping(), settings.timezone_handler());
    let dataset = manager
        .load(&location)
        .await
        .context("loading data source")?;

    let stats = dataset.stats;
    tracing::info!(
        rows = stats.rows_read,
        events = stats.events,
        unparseable = stats.unparseable_timestamps,
        missing_site = stats.missing_site,
        implausible = stats.implausible_duration,
        "source derived"
    );

    let selection = FilterSelection::new(settings.from, settings.to, &settings.sites);
    // An inverted window fails here, before the terminal is taken over.
    let outcome = build_report(&dataset, &selection)?;

    match settings.output.as_str() {
        "json" => println!("{}", output::render_json(&outcome)?),
        "table" => print!("{}", output::render_plain(&outcome)),
        _ => {
            let app = App::new(&settings.theme, settings.timezone.clone(), dataset, selection);
            let reloader = Reloader::spawn(manager, location);
            app.run(reloader).await.context("running TUI")?;
        }
    }

    Ok(())
}
