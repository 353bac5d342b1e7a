//! albtour - command-line view of the Albania tourism data layer.
//!
//! Wires config, logging, the shared cache and its sweeper to the fetchers
//! and prints what they return. Useful for checking the API and the
//! ranking without the app.

use std::io;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use serde::Serialize;
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use albtour_core::api::ApiClient;
use albtour_core::cache::{CacheStore, SystemClock};
use albtour_core::config::Config;
use albtour_core::fetch::{Catalog, DailyEventsFetcher, FetchState};
use albtour_core::grouping::{group_beaches_by_municipality, GroupedMunicipality};
use albtour_core::models::{BeachesQuery, EventsQuery, Language};
use albtour_core::utils::truncate_string;

/// Width of event names in listings
const NAME_WIDTH: usize = 48;

const USAGE: &str = "\
Usage: albtour [--json] <command>

Commands:
  events [page]      List events, loading pages up to `page`
  featured           Top municipalities by event count
  search <term>      Municipalities matching a name (blank: the rest)
  beaches            Public beaches grouped by municipality
  beach <id>         One beach with its nearby places
  rates              Exchange rates against the lek
  cache-stats        Warm the reference data and show cache contents";

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();
    init_tracing();

    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let json = match args.iter().position(|a| a == "--json") {
        Some(i) => {
            args.remove(i);
            true
        }
        None => false,
    };
    let Some(command) = args.first().cloned() else {
        eprintln!("{}", USAGE);
        return Ok(());
    };

    let config = Config::load().context("Failed to load config")?;
    debug!(api = %config.api_base_url, language = %config.language, "Config loaded");

    let store = CacheStore::with_clock(Arc::new(SystemClock), config.cache_ttl());
    let sweeper = store.spawn_sweeper(config.sweep_interval());
    let api = ApiClient::new(&config)?;
    let cli = Cli {
        catalog: Catalog::new(api, store),
        lang: config.language,
        json,
    };
    info!(command = %command, "albtour starting");

    let result = match command.as_str() {
        "events" => {
            let pages = match args.get(1) {
                Some(p) => p.parse().with_context(|| format!("Invalid page: {}", p))?,
                None => 1,
            };
            cli.events(pages).await
        }
        "featured" => cli.featured().await,
        "search" => cli.search(&args[1..].join(" ")).await,
        "beaches" => cli.beaches().await,
        "beach" => match args.get(1) {
            Some(id) => cli.beach(id.parse().with_context(|| format!("Invalid id: {}", id))?).await,
            None => bail!("Usage: albtour beach <id>"),
        },
        "rates" => cli.rates().await,
        "cache-stats" => cli.cache_stats().await,
        "help" | "--help" | "-h" => {
            eprintln!("{}", USAGE);
            Ok(())
        }
        other => {
            eprintln!("{}", USAGE);
            bail!("Unknown command: {}", other)
        }
    };

    sweeper.shutdown().await;
    result
}

struct Cli {
    catalog: Catalog,
    lang: Language,
    json: bool,
}

impl Cli {
    fn print_json<T: Serialize + ?Sized>(&self, value: &T) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }

    /// Data out of a settled state, or its error
    fn settled<T>(state: FetchState<T>) -> Result<T> {
        match (state.data, state.error) {
            (Some(data), _) => Ok(data),
            (None, Some(error)) => bail!(error),
            (None, None) => bail!("No data"),
        }
    }

    async fn events(&self, pages: u32) -> Result<()> {
        let pager = self.catalog.events(EventsQuery::default());
        pager.fetch(false).await;
        pager.load_pages(pages).await;

        let state = pager.state();
        if let Some(error) = &state.error {
            eprintln!("Error: {}", error);
        }
        let events = state.data.unwrap_or_default();
        if self.json {
            return self.print_json(&events);
        }
        for event in &events {
            println!(
                "{:>5}  {:<width$}  {:<14}  {}",
                event.id,
                truncate_string(event.localized_name(self.lang), NAME_WIDTH),
                event.municipality_name(),
                event.formatted_date_range(),
                width = NAME_WIDTH
            );
        }
        eprintln!(
            "{} events, page {} of {}",
            events.len(),
            state.current_page,
            state.total_pages
        );
        Ok(())
    }

    async fn ranking_loaded(&self) -> Result<DailyEventsFetcher> {
        let daily = self.catalog.daily_events();
        daily.fetch(false).await;
        let state = daily.state();
        if let (None, Some(error)) = (&state.data, &state.error) {
            bail!("{}", error);
        }
        Ok(daily)
    }

    fn print_groups(&self, groups: &[GroupedMunicipality]) -> Result<()> {
        if self.json {
            let summary: Vec<_> = groups
                .iter()
                .map(|g| {
                    serde_json::json!({
                        "municipality_id": g.municipality_id,
                        "municipality_name": g.municipality_name,
                        "total_count": g.total_count,
                        "has_more": g.has_more,
                    })
                })
                .collect();
            return self.print_json(&summary);
        }
        for group in groups {
            println!("{} ({})", group.municipality_name, group.total_count);
            for event in &group.display_events {
                println!("    {}", event.localized_name(self.lang));
            }
            if group.has_more {
                println!("    ... and {} more", group.hidden_count());
            }
        }
        Ok(())
    }

    async fn featured(&self) -> Result<()> {
        let daily = self.ranking_loaded().await?;
        self.print_groups(&daily.featured())
    }

    async fn search(&self, term: &str) -> Result<()> {
        let daily = self.ranking_loaded().await?;
        let found = daily.search(term);
        if found.is_empty() && !self.json {
            eprintln!("No municipalities match '{}'", term.trim());
            return Ok(());
        }
        self.print_groups(&found)
    }

    async fn beaches(&self) -> Result<()> {
        let fetcher = self.catalog.beaches(BeachesQuery::public_only());
        fetcher.fetch(false).await;
        let beaches = Self::settled(fetcher.state())?;
        if self.json {
            return self.print_json(&beaches);
        }
        for group in group_beaches_by_municipality(&beaches) {
            println!("{}", group.municipality_name);
            for beach in &group.beaches {
                println!("    {:>4}  {}", beach.id, beach.localized_name(self.lang));
            }
        }
        Ok(())
    }

    async fn beach(&self, id: i64) -> Result<()> {
        let fetcher = self.catalog.beach(id);
        fetcher.fetch(false).await;
        let detail = Self::settled(fetcher.state())?;
        if self.json {
            return self.print_json(&detail);
        }
        let beach = &detail.beach;
        println!("{} ({})", beach.localized_name(self.lang), beach.municipality.name);
        if let Some((lat, lng)) = beach.coordinates() {
            println!("  at {:.5}, {:.5}", lat, lng);
        }
        let description = beach.localized_description(self.lang);
        if !description.is_empty() {
            println!("  {}", truncate_string(description, 200));
        }
        for group in detail.sorted_place_groups() {
            println!("  {}", group.category.localized_name(self.lang));
            for place in &group.places {
                let marker = if place.is_featured() { "*" } else { " " };
                println!(
                    "   {} {} ({:.1} km)",
                    marker,
                    place.localized_name(self.lang),
                    place.distance
                );
            }
        }
        Ok(())
    }

    async fn rates(&self) -> Result<()> {
        let fetcher = self.catalog.exchange_rates();
        fetcher.fetch(false).await;
        let rates = Self::settled(fetcher.state())?;
        let main = rates.main_currencies();
        if self.json {
            return self.print_json(&main);
        }
        println!("Rates as of {}", rates.date);
        for rate in main {
            println!("  1 {} = {:.2} ALL", rate.code, rate.rate);
        }
        Ok(())
    }

    async fn cache_stats(&self) -> Result<()> {
        let categories = self.catalog.categories();
        let municipalities = self.catalog.municipalities();
        categories.fetch(false).await;
        municipalities.fetch(false).await;
        // Served from the entries just written
        categories.fetch(false).await;

        let store = self.catalog.store();
        let stats = store.stats();
        if self.json {
            return self.print_json(&stats.keys);
        }
        println!("{} entries", stats.size);
        let now = store.now();
        for key in &stats.keys {
            let age = store
                .get_entry::<serde_json::Value>(key)
                .map(|entry| entry.age_display(now))
                .unwrap_or_else(|| "expired".to_string());
            println!("  {:<40} {}", key, age);
        }
        Ok(())
    }
}
