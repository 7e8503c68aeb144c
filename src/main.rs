//! Mandel Tiles - a Mandelbrot tile server.
//!
//! This binary starts the HTTP server and configures all components.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mandel_tiles::{
    config::{Cli, Command, RenderConfig, ServeConfig, StoreKind},
    create_router, create_s3_client,
    dispatch::RenderQueue,
    fractal::Renderer,
    server::RouterConfig,
    store::{MemoryTileStore, S3TileStore, TileStore},
    tile::{PngTileEncoder, TileController, TileIndex, TileName},
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.into_command() {
        Command::Serve(config) => run_serve(config).await,
        Command::Render(config) => run_render(config),
    }
}

// =============================================================================
// Serve Command
// =============================================================================

async fn run_serve(config: ServeConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    info!("Mandel Tiles v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration:");
    info!("  Tiles: {}px, zoom 0-{}", config.tile_size, config.max_zoom);
    info!(
        "  Render: {:?} order, {}",
        config.dispatch_order,
        if config.no_worker { "inline" } else { "worker thread" }
    );
    info!("  Image cache: {}MB", config.cache_images / (1024 * 1024));

    match config.store {
        StoreKind::Memory => {
            info!("  Store: memory (tiles are lost on restart)");
            serve(config, MemoryTileStore::new()).await
        }
        StoreKind::S3 => {
            let bucket = config.bucket().unwrap_or_default().to_string();
            info!("  Store: s3://{}/{}", bucket, config.s3_prefix);
            if let Some(ref endpoint) = config.s3_endpoint {
                info!("  S3 endpoint: {}", endpoint);
            }
            info!("  S3 region: {}", config.s3_region);

            let client = create_s3_client(config.s3_endpoint.as_deref(), &config.s3_region).await;
            let store = S3TileStore::new(client, bucket, config.s3_prefix.clone());
            serve(config, store).await
        }
    }
}

async fn serve<S: TileStore>(config: ServeConfig, store: S) -> ExitCode {
    let renderer = Arc::new(Renderer::default());
    let queue = if config.no_worker {
        RenderQueue::inline(renderer)
    } else {
        RenderQueue::spawn(renderer, config.dispatch_order)
    };

    let controller = Arc::new(TileController::new(
        Arc::new(store),
        queue,
        config.controller_config(),
    ));
    let router = create_router(controller, build_router_config(&config));

    let addr = config.bind_address();
    info!("");
    info!("  Server listening on: http://{}", addr);
    info!("    curl http://{}/health", addr);
    info!("    curl -o 0.png http://{}/tiles/0/0/0.png", addr);
    info!("");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = axum::serve(listener, router).await {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "mandel_tiles=debug,tower_http=debug"
    } else {
        "mandel_tiles=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build RouterConfig from the application ServeConfig.
fn build_router_config(config: &ServeConfig) -> RouterConfig {
    let mut router_config = RouterConfig::new()
        .with_cache_max_age(config.cache_max_age)
        .with_max_zoom(config.max_zoom)
        .with_tracing(!config.no_tracing);

    if let Some(ref origins) = config.cors_origins {
        router_config = router_config.with_cors_origins(origins.clone());
    }

    router_config
}

// =============================================================================
// Render Command
// =============================================================================

fn run_render(config: RenderConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let renderer = Renderer::default();
    let image = match (&config.tile, config.key) {
        (Some(tile), false) => {
            let name = match TileName::parse(tile) {
                Ok(name) => name,
                Err(e) => {
                    error!("{}", e);
                    return ExitCode::FAILURE;
                }
            };
            let index = TileIndex::default();
            let rect = index.rect_from_tile_name(&name);
            info!("Rendering {} ({:?})", name, rect.as_array());
            renderer.render(&rect, config.width, config.height)
        }
        _ => {
            info!("Rendering color key");
            renderer.render_key(config.width, config.height)
        }
    };

    let png = match PngTileEncoder::new().encode(&image) {
        Ok(png) => png,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let path = config.output_path();
    if let Err(e) = std::fs::write(&path, &png) {
        error!("Failed to write {}: {}", path.display(), e);
        return ExitCode::FAILURE;
    }

    info!("Wrote {} ({} bytes)", path.display(), png.len());
    ExitCode::SUCCESS
}
