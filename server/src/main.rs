use clap::Parser;
use log::info;
use server::network::Server;
use shared::game::GameConfig;
use shared::puzzle::Puzzle;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Server port to listen on
    #[arg(short, long, default_value = "4000")]
    port: u16,

    /// Maximum concurrent clients
    #[arg(short, long, default_value = "8")]
    max_clients: usize,

    /// Seed for grid generation (random when omitted)
    #[arg(long)]
    grid_seed: Option<u64>,

    /// Directory of puzzle files replacing the built-in set
    #[arg(long)]
    puzzle_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args = Args::parse();

    let mut config = GameConfig {
        grid_seed: args.grid_seed,
        ..GameConfig::default()
    };
    if let Some(dir) = &args.puzzle_dir {
        config.puzzles = Puzzle::load_dir(dir)?;
        info!(
            "loaded {} puzzles from {}",
            config.puzzles.len(),
            dir.display()
        );
    }

    let addr = format!("{}:{}", args.host, args.port);
    let mut server = Server::new(&addr, args.max_clients, config).await?;
    server.run().await
}
