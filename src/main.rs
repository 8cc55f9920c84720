use chrono::{Duration, Utc};
use std::path::Path;
use std::process::ExitCode;
use timecollage::{CollageConfig, CollagePipeline, InMemoryHistory, Track};

/// Demo driver: reads history events from a JSON file (an array of tracks)
/// and renders a collage for the past week. The real history client, web
/// layer and mail delivery live outside this crate.
#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 3 {
        eprintln!("Usage: {} <history.json> <output.(png|jpg)> [user]", args[0]);
        return ExitCode::FAILURE;
    }
    let history_path = &args[1];
    let out_path = Path::new(&args[2]);
    let user = args.get(3).map(String::as_str).unwrap_or("local");

    let tracks: Vec<Track> = match std::fs::read_to_string(history_path)
        .map_err(|e| e.to_string())
        .and_then(|raw| serde_json::from_str(&raw).map_err(|e| e.to_string()))
    {
        Ok(tracks) => tracks,
        Err(e) => {
            log::error!("Could not read history file [{}]: {}", history_path, e);
            return ExitCode::FAILURE;
        }
    };
    log::info!("Loaded {} history events from [{}]", tracks.len(), history_path);

    let config = CollageConfig::from_env();
    let pipeline = match CollagePipeline::from_config(&config) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            log::error!("Could not build pipeline: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let to = Utc::now();
    let from = to - Duration::days(7);
    match pipeline
        .generate(InMemoryHistory::new(tracks), user, from, to, out_path)
        .await
    {
        Ok(summary) => {
            for message in &summary.messages {
                log::warn!("{}", message);
            }
            log::info!(
                "Successfully generated collage image [{}]",
                out_path.display()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
