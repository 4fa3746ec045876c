use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;
use tracklist::config::{default_spec, load_json, load_table, DESCRIPTIVE_FIELDS};
use tracklist::{
    EngineConfig, FeatureReducer, FeatureTable, IndexFactory, IndexKind, IndexSpec, Playlist,
    PlaylistWalker, SimilarityScorer, WalkerConfig,
};

/// Build playlists by walking a nearest-neighbor index over audio features
#[derive(Parser, Debug)]
#[command(name = "tracklist")]
#[command(about = "Generate playlists from audio features", long_about = None)]
struct Args {
    /// JSON array of track objects
    #[arg(short, long)]
    input: PathBuf,

    /// Comma-separated feature columns (default: every numeric non-metadata field)
    #[arg(short, long, value_delimiter = ',')]
    features: Vec<String>,

    /// Embedding dimension after reduction
    #[arg(short, long, default_value_t = 8)]
    dim: usize,

    /// Index strategy
    #[arg(short, long, default_value = "flat-l2")]
    strategy: IndexKind,

    /// Item the playlist starts from
    #[arg(long, default_value_t = 0)]
    seed: usize,

    /// Playlist length
    #[arg(short, long, default_value_t = 10)]
    length: usize,

    /// Also walk from this item and compare the two playlists
    #[arg(long)]
    compare_seed: Option<usize>,

    /// Engine config (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Index spec (JSON); overrides --strategy
    #[arg(long)]
    index_config: Option<PathBuf>,

    /// Walker config (JSON)
    #[arg(long)]
    walker_config: Option<PathBuf>,

    /// Metadata field used to label tracks
    #[arg(long, default_value = "name")]
    label: String,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = match args.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting tracklist v{}", env!("CARGO_PKG_VERSION"));

    let engine_config: EngineConfig = match &args.config {
        Some(path) => load_json(path)
            .with_context(|| format!("loading engine config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    let walker_config: WalkerConfig = match &args.walker_config {
        Some(path) => load_json(path)
            .with_context(|| format!("loading walker config {}", path.display()))?,
        None => WalkerConfig::default(),
    };

    let table = load_table(&args.input)
        .with_context(|| format!("loading tracks from {}", args.input.display()))?;
    info!("Loaded {} tracks from {:?}", table.len(), args.input);

    let features = if args.features.is_empty() {
        table.numeric_columns_except(DESCRIPTIVE_FIELDS)
    } else {
        args.features.clone()
    };
    info!("Feature columns: {}", features.join(", "));

    let reducer = FeatureReducer::new(features, args.dim)?;
    let (_fitted, corpus) = reducer.fit_transform(&table)?;
    let corpus = Arc::new(corpus);

    let factory = IndexFactory::new(engine_config);
    let spec: IndexSpec = match &args.index_config {
        Some(path) => load_json(path)
            .with_context(|| format!("loading index spec {}", path.display()))?,
        None => default_spec(args.strategy, corpus.len(), corpus.dim(), &factory),
    };
    info!("Index spec: {}", serde_json::to_string(&spec)?);

    let handle = factory.build(corpus.clone(), &spec)?;
    let walker = PlaylistWalker::new(walker_config)?;

    let playlist = walker.walk(&handle, args.seed, args.length)?;
    print_playlist(args.seed, &playlist, &table, &args.label);

    if let Some(other_seed) = args.compare_seed {
        let other = walker.walk(&handle, other_seed, args.length)?;
        print_playlist(other_seed, &other, &table, &args.label);

        let report = SimilarityScorer::score(&playlist.resolve(&corpus)?, &other.resolve(&corpus)?)?;
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    Ok(())
}

fn print_playlist(seed: usize, playlist: &Playlist, table: &FeatureTable, field: &str) {
    println!("Playlist from track {}:", seed);
    for (pos, (id, label)) in playlist.iter().zip(playlist.labels(table, field)).enumerate() {
        println!("{:>3}. [{}] {}", pos + 1, id, label.as_deref().unwrap_or("-"));
    }
}
