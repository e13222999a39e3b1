use std::io::{self, BufRead, Write};
use std::time::Duration;

use anyhow::{Context, Result};
use nimbus_core::{AppError, Config};
use nimbus_ui::services::WeatherServiceError;
use nimbus_ui::WeatherModel;
use nimbus_weather::AssetLocator;

fn main() -> Result<()> {
    // Initialize core
    nimbus_core::init()?;

    let (config, _) = Config::load_validated().inspect_err(|e| {
        tracing::error!("{} ({})", e.user_message(), e);
    })?;
    let place = std::env::args()
        .nth(1)
        .unwrap_or_else(|| config.weather.default_location.clone());

    let mut model = WeatherModel::new(&config)?;
    let assets = AssetLocator::new(&config.assets.root);
    let wait = Duration::from_secs(config.weather.request_timeout_secs.saturating_mul(2));

    tracing::info!("Nimbus started");

    model.submit_location(&place);
    settle(&mut model, wait);
    render(&model, &assets);

    let stdin = io::stdin();
    loop {
        print!("\nSearch (:r refresh, :q quit)> ");
        io::stdout().flush().context("Failed to flush stdout")?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }

        match line.trim() {
            ":q" => break,
            ":r" => model.refresh(),
            "" => continue,
            text => model.submit_location(text),
        }

        settle(&mut model, wait);
        render(&model, &assets);
    }

    tracing::info!("Shutting down");
    Ok(())
}

fn settle(model: &mut WeatherModel, wait: Duration) {
    if !model.wait_idle(wait) {
        tracing::warn!("Weather requests still pending after {:?}", wait);
    }
}

fn check_asset(assets: &AssetLocator, path: &str) {
    if let Err(e) = assets.locate(path) {
        let app_err = AppError::from(WeatherServiceError::from(e));
        tracing::warn!("{} ({})", app_err.user_message(), app_err);
    }
}

fn render(model: &WeatherModel, assets: &AssetLocator) {
    if let Some(message) = model.error_message() {
        println!("! {}", message);
    }

    let Some(current) = model.current_view() else {
        println!("No weather data to show yet.");
        return;
    };

    check_asset(assets, &current.icon_path);
    check_asset(assets, &current.background_path);

    println!();
    println!("{}", current.heading);
    println!("  {}  {}", current.temperature_label, current.description);
    println!("  icon:       {}", current.icon_path);
    println!("  background: {}", current.background_path);

    let strip = model.hourly_strip();
    if strip.is_empty() {
        return;
    }

    println!();
    for tile in &strip {
        check_asset(assets, &tile.icon_path);
        println!(
            "  {:>5}  {:>8}  {}",
            tile.hour_label, tile.temperature_label, tile.icon_path
        );
    }
}
