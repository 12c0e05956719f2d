use anyhow::Context;
use clap::Parser;
use livemap::{
    ApiClient, HeadlessSurface, LiveMap, MapSession, TrackLayer, UpsertOutcome, ViewerConfig,
};
use std::path::PathBuf;

/// Headless live location viewer for an OwnTracks recorder
#[derive(Debug, Parser)]
#[command(name = "livemap-app", version)]
struct Args {
    /// Recorder base URL [default: http://localhost:8083]
    #[arg(long)]
    base_url: Option<String>,

    /// Explicit WebSocket feed URL
    #[arg(long)]
    ws_url: Option<String>,

    /// JSON configuration file; command line flags override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Page-style query, e.g. "fit=1&user=jane&device=phone"
    #[arg(long)]
    query: Option<String>,

    /// Fit the view to all markers after each update
    #[arg(long)]
    fit: bool,

    /// Allow several popups to stay open
    #[arg(long)]
    no_singular: bool,

    /// Place the last known positions before the feed delivers anything
    #[arg(long)]
    preload: bool,

    /// Draw the queried device's track before going live
    #[arg(long)]
    track: bool,
}

impl Args {
    fn viewer_config(&self) -> anyhow::Result<ViewerConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let json = std::fs::read_to_string(path)
                    .with_context(|| format!("reading {}", path.display()))?;
                ViewerConfig::from_json_str(&json)?
            }
            None => ViewerConfig::default(),
        };

        if let Some(base_url) = &self.base_url {
            config.base_url = base_url.clone();
        }
        if self.ws_url.is_some() {
            config.ws_url = self.ws_url.clone();
        }
        if let Some(query) = &self.query {
            config.apply_query(query)?;
        }
        if self.fit {
            config.auto_fit = true;
        }
        if self.no_singular {
            config.singular_markers = false;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    livemap::init_logging();

    let args = Args::parse();
    let config = args.viewer_config()?;
    let api = ApiClient::new(&config)?;

    match api.version().await {
        Ok(version) => log::info!("connected to recorder {}", version),
        Err(e) => log::warn!("recorder version unavailable: {}", e),
    }

    let mut session = MapSession::from_config(HeadlessSurface::new(), &config);

    if args.track {
        let track = api.track(&config.query).await?;
        let layer = TrackLayer::new(&track)
            .with_styles(config.track_style.clone(), config.marker_style.clone());
        layer.render(session.surface_mut());
        log::info!("drew track with {} features", layer.features().len());
    }

    let mut live = LiveMap::start(session, &config)?;
    if args.preload {
        live.preload(&api, &config.query).await?;
    }

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                log::info!("shutting down");
                break;
            }
            outcome = live.next() => match outcome {
                Some(Ok(UpsertOutcome::Created(key))) => log::info!("new marker for {}", key),
                Some(Ok(UpsertOutcome::Updated(key))) => {
                    if let Some(marker) = live.session().marker(&key) {
                        log::info!("{} moved to {:?}", marker.title(), marker.position());
                    }
                }
                Some(Err(e)) => log::warn!("skipping location update: {}", e),
                None => break,
            },
        }
    }

    live.shutdown();
    Ok(())
}
