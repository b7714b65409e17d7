use std::error::Error;
use std::path::PathBuf;

use catalog::{FileCacheStore, TransitCache};
use clap::{Parser, Subcommand};
use formats::{BoundingBox, CitySources, CityTable, Infrastructure, TransitQuery};
use metroverse::chat::{ChatSession, OpenRouterTransport};
use metroverse::config::AppConfig;
use metroverse::source_for;
use metroverse::transitland::TransitlandSource;
use runtime::Frame;
use scene::{extrude_buildings, focus_view, search_stations, ExtrusionStyle, DEFAULT_SEARCH_LIMIT};
use streaming::{fetch_scene, CityScene, LoadStatus};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Metro network scene builder and train simulator")]
struct Args {
    /// JSON city table replacing the built-in one
    #[arg(long)]
    cities: Option<PathBuf>,

    /// Seed for train spawn state
    #[arg(long, default_value_t = 42)]
    seed: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List configured cities
    Cities,

    /// Load a city and print its scene
    Layout {
        #[arg(long)]
        city: Option<String>,
    },

    /// Run the train motion model for a number of frames
    Simulate {
        #[arg(long)]
        city: Option<String>,

        #[arg(long, default_value_t = 600)]
        frames: u64,

        /// Seconds per frame
        #[arg(long, default_value_t = 1.0 / 60.0)]
        dt: f64,
    },

    /// Find stations by name and print the fly-to camera
    Search {
        #[arg(long)]
        city: Option<String>,

        query: String,

        #[arg(long, default_value_t = DEFAULT_SEARCH_LIMIT)]
        limit: usize,
    },

    /// Query Transitland directly and print the line GeoJSON
    Fetch {
        /// Operator onestop id (e.g. o-ttn-dmrc)
        #[arg(long, conflicts_with = "bbox")]
        operator: Option<String>,

        /// Bounding box: minLon,minLat,maxLon,maxLat
        #[arg(long)]
        bbox: Option<String>,
    },

    /// Drop expired entries from the transit cache
    PurgeCache,

    /// Ask the guide a question
    Chat {
        #[arg(long)]
        city: Option<String>,

        message: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let config = AppConfig::from_env();
    let table = match &args.cities {
        Some(path) => CityTable::from_json_str(&tokio::fs::read_to_string(path).await?)?,
        None => CityTable::builtin(),
    };

    match args.command {
        Command::Cities => {
            for city in table.cities() {
                let kind = match &city.sources {
                    CitySources::Files { .. } => "files".to_string(),
                    CitySources::Live { query } => format!("live {}", query.canonical()),
                };
                println!("{:<10} {:<4} {:<18} {}", city.id, city.label, city.name, kind);
            }
            match config.map_style_url() {
                Ok(url) => println!("map style: {url}"),
                Err(err) => warn!("map mode unavailable: {err}"),
            }
        }
        Command::Layout { city } => {
            let scene = load(&table, &config, city.as_deref(), args.seed).await?;
            let snapshot = scene.snapshot();
            println!("{} [{}]", snapshot.city_id, scene.status().indicator());
            for line in &snapshot.lines {
                println!(
                    "  line {:<12} {:<24} {} {:>4} pts  {}",
                    line.id,
                    line.name,
                    line.color,
                    line.points.len(),
                    Infrastructure::of(line.elevation).as_str()
                );
            }
            println!("  stations: {}", snapshot.stations.len());
            let mesh = extrude_buildings(&snapshot.buildings, ExtrusionStyle::default());
            println!(
                "  buildings: {} ({} triangles)",
                snapshot.buildings.len(),
                mesh.triangle_count()
            );
            let camera = scene.camera();
            println!(
                "  camera: eye ({:.1}, {:.1}, {:.1}) target ({:.1}, {:.1}, {:.1})",
                camera.eye.x,
                camera.eye.y,
                camera.eye.z,
                camera.target.x,
                camera.target.y,
                camera.target.z
            );
        }
        Command::Simulate { city, frames, dt } => {
            let mut scene = load(&table, &config, city.as_deref(), args.seed).await?;
            let mut frame = Frame::first();
            for _ in 0..frames {
                frame = frame.advance(dt);
                scene.update_frame(&frame);
            }
            println!("t = {:.2}s after {} frames", frame.time.0, frame.index);
            for (pose, agent) in scene.poses().iter().zip(scene.motion().agents()) {
                println!(
                    "  {:<12} {} progress {:.3} at ({:.3}, {:.3}, {:.3})",
                    pose.line_id,
                    pose.color,
                    agent.progress,
                    pose.position.x,
                    pose.position.y,
                    pose.position.z
                );
            }
        }
        Command::Search { city, query, limit } => {
            let mut scene = load(&table, &config, city.as_deref(), args.seed).await?;
            let snapshot = scene.snapshot();
            let hits = search_stations(&snapshot.stations, &query, limit);
            if hits.is_empty() {
                println!("no stations match {query:?}");
            }
            for &station in &hits {
                let view = focus_view(station);
                println!(
                    "  {:<28} eye ({:.3}, {:.3}, {:.3})",
                    station.name, view.eye.x, view.eye.y, view.eye.z
                );
            }
            if let Some(first) = hits.first().and_then(|s| scene.fly_to(&s.id)) {
                println!(
                    "flying to ({:.3}, {:.3}, {:.3})",
                    first.target.x, first.target.y, first.target.z
                );
            }
        }
        Command::Fetch { operator, bbox } => {
            let query = match (operator, bbox) {
                (Some(onestop_id), _) => TransitQuery::Operator { onestop_id },
                (None, Some(raw)) => TransitQuery::BoundingBox {
                    bbox: parse_bbox(&raw)?,
                },
                (None, None) => return Err("pass --operator or --bbox".into()),
            };
            let key = config.transitland_key()?;
            let source = TransitlandSource::new(
                key,
                TransitCache::new(FileCacheStore::new(&config.cache_path)),
            );
            let lines = source.fetch_routes(&query).await?;
            info!("{} lines for {}", lines.len(), query.canonical());
            println!("{}", serde_json::to_string_pretty(&lines.to_geojson_value())?);
        }
        Command::PurgeCache => {
            let mut cache = TransitCache::new(FileCacheStore::new(&config.cache_path));
            let removed = cache.purge_expired(foundation::now_unix_ms())?;
            println!("removed {removed} expired entries");
        }
        Command::Chat { city, message } => {
            let key = config.openrouter_key()?;
            let transport = OpenRouterTransport::new(key, config.chat_model.clone());
            let mut session = ChatSession::new();
            if let Some(id) = city {
                session.set_city(Some(table.get(&id)?.name.clone()));
            }
            match session.send(&transport, &message.join(" ")).await {
                Some(reply) => println!("{}", reply.content),
                None => warn!("nothing to send"),
            }
        }
    }
    Ok(())
}

/// Selects a city and waits for its load to finish.
async fn load(
    table: &CityTable,
    config: &AppConfig,
    city_id: Option<&str>,
    seed: u64,
) -> Result<CityScene, Box<dyn Error>> {
    let city = match city_id {
        Some(id) => table.get(id)?,
        None => table.default_city(),
    };
    let mut scene = CityScene::new(table.clone(), seed);
    let ticket = scene.select_city(&city.id)?;
    let source = source_for(city, config)?;
    let result = fetch_scene(source.as_ref(), city, scene.options()).await;
    scene.complete(&ticket, result);
    if let LoadStatus::Error(msg) = scene.status() {
        return Err(msg.clone().into());
    }
    Ok(scene)
}

fn parse_bbox(raw: &str) -> Result<BoundingBox, Box<dyn Error>> {
    let parts: Vec<f64> = raw
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<_, _>>()?;
    let &[min_lon, min_lat, max_lon, max_lat] = parts.as_slice() else {
        return Err(format!("bbox needs 4 numbers, got {}", parts.len()).into());
    };
    let bbox = BoundingBox::new(min_lon, min_lat, max_lon, max_lat);
    if !bbox.is_valid() {
        return Err(format!("invalid bbox: {raw}").into());
    }
    Ok(bbox)
}
