//! Headless bot client
//!
//! Connects to the relay, runs a full client session at a fixed frame rate
//! and drives its player with a seeded random walk. Handy for smoke-testing
//! the relay with several participants at once.

use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use futures::{SinkExt, StreamExt};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

use platformer_relay::game::session::random_hex_color;
use platformer_relay::game::{ClientSession, InputState, SessionConfig};
use platformer_relay::util::time::{frame_interval, CLIENT_FPS};
use platformer_relay::ws::protocol::{ClientMsg, ServerMsg};

#[derive(Parser, Debug)]
#[command(name = "bot_client", about = "Headless platformer client driven by a random walk")]
struct Args {
    /// Relay WebSocket URL
    #[arg(long, default_value = "ws://127.0.0.1:3000/ws")]
    url: String,

    /// Frames per second
    #[arg(long, default_value_t = CLIENT_FPS)]
    fps: u32,

    /// Seed for the random walk and color (random when omitted)
    #[arg(long)]
    seed: Option<u64>,

    /// Stop after this many seconds (run until the relay closes when omitted)
    #[arg(long)]
    duration_secs: Option<u64>,

    #[arg(long, default_value_t = 800.0)]
    canvas_width: f32,

    #[arg(long, default_value_t = 600.0)]
    canvas_height: f32,

    /// Log level when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// Holds a direction for a random number of frames, jumps now and then
struct RandomWalk {
    direction: i8,
    frames_left: u32,
}

impl RandomWalk {
    fn new() -> Self {
        Self {
            direction: 0,
            frames_left: 0,
        }
    }

    fn next_input(&mut self, rng: &mut impl Rng) -> InputState {
        if self.frames_left == 0 {
            self.direction = rng.gen_range(-1..=1);
            self.frames_left = rng.gen_range(30..90);
        }
        self.frames_left -= 1;

        InputState {
            left: self.direction < 0,
            right: self.direction > 0,
            jump: rng.gen_ratio(1, 90),
        }
    }
}

type WsSink = futures::stream::SplitSink<
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>,
    Message,
>;

async fn send(sink: &mut WsSink, msg: &ClientMsg) -> anyhow::Result<()> {
    let json = serde_json::to_string(msg)?;
    sink.send(Message::Text(json)).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let mut rng = match args.seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    };

    let (ws, _) = connect_async(args.url.as_str())
        .await
        .with_context(|| format!("connecting to {}", args.url))?;
    info!(url = %args.url, "Connected to relay");

    let (mut sink, mut stream) = ws.split();

    let mut session = ClientSession::new(SessionConfig {
        canvas_width: args.canvas_width,
        canvas_height: args.canvas_height,
        fps: args.fps,
        color: random_hex_color(&mut rng),
        ..SessionConfig::default()
    });
    let mut walk = RandomWalk::new();

    let mut frames = interval(frame_interval(args.fps));
    frames.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut report = interval(Duration::from_secs(5));

    let deadline = args
        .duration_secs
        .map(|secs| Instant::now() + Duration::from_secs(secs));
    let stop = async move {
        match deadline {
            Some(at) => tokio::time::sleep_until(at).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(stop);

    let mut sent: u64 = 0;
    let mut received: u64 = 0;

    loop {
        tokio::select! {
            _ = frames.tick() => {
                let input = walk.next_input(&mut rng);
                if let Some(msg) = session.tick(input) {
                    send(&mut sink, &msg).await?;
                    sent += 1;
                }
            }
            incoming = stream.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        received += 1;
                        match serde_json::from_str::<ServerMsg>(&text) {
                            Ok(msg) => {
                                for reply in session.on_message(msg) {
                                    send(&mut sink, &reply).await?;
                                    sent += 1;
                                }
                            }
                            Err(e) => warn!(error = %e, "Unparseable relay message"),
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        info!("Relay closed the connection");
                        break;
                    }
                    Some(Ok(other)) => debug!(?other, "Ignoring non-text frame"),
                    Some(Err(e)) => {
                        warn!(error = %e, "WebSocket error");
                        break;
                    }
                }
            }
            _ = report.tick() => {
                info!(
                    id = ?session.local_id(),
                    remotes = session.remotes().len(),
                    sent,
                    received,
                    "Bot status"
                );
            }
            _ = &mut stop => {
                info!("Duration elapsed, disconnecting");
                break;
            }
        }
    }

    let _ = sink.send(Message::Close(None)).await;
    Ok(())
}
