//! Health News Digest: binary entrypoint.
//! One batch run: read the feed list, build the digest, write the JSON file.

use anyhow::Context;
use health_news_digest::classify::Classifier;
use health_news_digest::config::digest::{DigestSettings, ENV_LOG_JSON};
use health_news_digest::ingest::config::load_feed_list_default;
use health_news_digest::ingest::providers::rss::RssFeedSource;
use health_news_digest::ingest::Pipeline;
use health_news_digest::metrics::Metrics;
use health_news_digest::normalize::url::HttpRedirectResolver;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("health_news_digest=info,warn"));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .init();
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();

    // Logging first, so settings warnings are visible.
    init_tracing(std::env::var(ENV_LOG_JSON).is_ok_and(|v| v.trim() == "1"));
    let settings = DigestSettings::from_env();

    let metrics = match &settings.metrics_path {
        Some(_) => Some(Metrics::init(settings.window_days)?),
        None => None,
    };

    let now = chrono::Utc::now();
    let feeds = load_feed_list_default()?;
    let classifier = Classifier::load().context("loading classifier rules")?;
    let resolver = HttpRedirectResolver::new(
        classifier.aggregator_domains().to_vec(),
        settings.redirect_timeout,
    )
    .context("building redirect client")?;
    let source = RssFeedSource::live(settings.feed_timeout)?;

    tracing::info!(
        feeds = feeds.len(),
        window_days = settings.window_days,
        output = %settings.output_path.display(),
        "starting digest run"
    );

    let pipeline = Pipeline::new(&classifier, &resolver, settings.window_days);
    let (digest, _stats) = pipeline.run(&source, &feeds, now).await;

    digest.write_to(&settings.output_path)?;
    tracing::info!(count = digest.count, path = %settings.output_path.display(), "digest written");

    if let (Some(m), Some(path)) = (&metrics, &settings.metrics_path) {
        m.write_to(path)?;
    }

    Ok(())
}
