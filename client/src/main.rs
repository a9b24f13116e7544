use clap::Parser;
use client::network::Client;
use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::Controls;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short, long, default_value = "127.0.0.1:4000")]
    server: String,

    /// Ticks to play before disconnecting (0 = run forever)
    #[arg(short, long, default_value = "0")]
    ticks: u64,

    /// Seed for the scripted driver (random when omitted)
    #[arg(long)]
    seed: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args = Args::parse();

    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let mut client = Client::connect(&args.server).await?;
    info!("session started");

    // scripted driver: wander the board, flip fill mode now and then, and
    // guess whenever the dice say so; stands in for a keyboard
    let mut tick = 0u64;
    client
        .run(move |controls, world| {
            tick += 1;
            if args.ticks > 0 && tick > args.ticks {
                return false;
            }

            release_all(controls);
            match rng.gen_range(0..8) {
                0 => controls.left.press(),
                1 => controls.right.press(),
                2 => controls.up.press(),
                3 => controls.down.press(),
                4 => controls.shift.press(),
                _ => controls.confirm.press(),
            }

            if tick % 20 == 0 {
                if let Some(me) = world.self_player() {
                    info!(
                        "at cell {:?}, fill_mode={}, cooldown={:.1}",
                        me.grid_pos, me.fill_mode, me.player_cooldown
                    );
                }
                for line in world.scoreboard() {
                    info!("{}", line);
                }
            }
            true
        })
        .await
}

fn release_all(controls: &mut Controls) {
    for button in controls.buttons_mut() {
        button.release();
    }
}
