use std::path::Path;

use tracing::info;

use roomfinder::config::{Config, StoreKind};
use roomfinder::engine::Engine;
use roomfinder::model::Room;
use roomfinder::request::SearchQuery;
use roomfinder::store::{DocumentStore, InMemoryStore, RoomStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let config = Config::from_env()?;
    roomfinder::observability::init(config.metrics_port)?;

    info!("roomfinder starting");
    info!("  store: {:?}", config.store);
    info!("  result_limit: {}", config.result_limit);
    info!(
        "  metrics: {}",
        config
            .metrics_port
            .map_or("disabled".to_string(), |p| format!("http://0.0.0.0:{p}/metrics"))
    );

    let args: Vec<String> = std::env::args().skip(1).collect();
    match config.store {
        StoreKind::Memory => run(InMemoryStore::new(), &config, &args).await,
        StoreKind::Document => {
            std::fs::create_dir_all(&config.data_dir)?;
            info!("  data_dir: {}", config.data_dir.display());
            let store = DocumentStore::open(&config.log_path(), config.compact_threshold)?;
            run(store, &config, &args).await
        }
    }
}

async fn run<S: RoomStore>(
    mut store: S,
    config: &Config,
    args: &[String],
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(seed) = &config.seed_file {
        if store.get_buildings().await?.is_empty() {
            seed_rooms(&mut store, seed).await?;
        } else {
            info!("store already populated, skipping seed {}", seed.display());
        }
    }

    let engine = Engine::new(store);
    let Some(date) = args.first() else {
        for (building, rooms) in engine.rooms_by_building().await? {
            info!("{building}: {} rooms", rooms.len());
        }
        return Ok(());
    };

    let arg = |i: usize| args.get(i).map(String::as_str);
    let query = SearchQuery::parse(date, arg(1), arg(2), arg(3), arg(4), arg(5))?
        .limit(config.result_limit);
    let rows = engine.search(&query).await?;
    info!("{} rooms available on {}", rows.len(), query.date);
    for row in rows {
        let next = row
            .next_availability
            .map_or("Not available today".to_string(), |slot| slot.to_string());
        match row.location {
            Some(location) => println!("{} {}\t{next}\t{location}", row.building, row.room),
            None => println!("{} {}\t{next}", row.building, row.room),
        }
    }
    Ok(())
}

async fn seed_rooms<S: RoomStore>(store: &mut S, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let data = std::fs::read_to_string(path)?;
    let rooms: Vec<Room> = serde_json::from_str(&data)?;
    let count = rooms.len();
    for mut room in rooms {
        for events in room.schedule.values_mut() {
            events.sort_by_key(|e| e.start_time);
        }
        store.insert_room(room).await?;
    }
    info!("seeded {count} rooms from {}", path.display());
    Ok(())
}
