//! Client network session: controls out once per tick, state mirror in.

use crate::game::ClientWorld;
use log::{debug, info};
use shared::{wire, Controls, TICK};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{interval, MissedTickBehavior};

/// A connected client session.
pub struct Client {
    stream: TcpStream,
    recv_buffer: Vec<u8>,
    /// Aggregated local input; the driver mutates this between ticks.
    pub controls: Controls,
    /// Mirror of the last server snapshot.
    pub world: ClientWorld,
}

impl Client {
    pub async fn connect(addr: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        info!("connected to {}", addr);

        Ok(Client {
            stream,
            recv_buffer: Vec::new(),
            controls: Controls::default(),
            world: ClientWorld::new(),
        })
    }

    /// Runs the session.
    ///
    /// Once per tick the driver is handed `(controls, world)`; afterwards
    /// one controls frame is sent and the edge counters are flushed. The
    /// session ends cleanly when the driver returns `false`, and with an
    /// error on transport loss or a fatal protocol violation.
    pub async fn run<F>(&mut self, mut driver: F) -> Result<(), Box<dyn std::error::Error>>
    where
        F: FnMut(&mut Controls, &ClientWorld) -> bool,
    {
        let mut tick_interval = interval(Duration::from_secs_f32(TICK));
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut read_buffer = [0u8; 2048];

        loop {
            tokio::select! {
                result = self.stream.read(&mut read_buffer) => {
                    match result {
                        Ok(0) => return Err("lost connection to server".into()),
                        Ok(n) => {
                            self.recv_buffer.extend_from_slice(&read_buffer[..n]);
                            self.drain_state_messages()?;
                        }
                        Err(e) => return Err(e.into()),
                    }
                },

                _ = tick_interval.tick() => {
                    if !driver(&mut self.controls, &self.world) {
                        debug!("driver ended the session");
                        return Ok(());
                    }

                    let mut frame = Vec::new();
                    wire::encode_controls(&self.controls, &mut frame);
                    self.controls.clear_downs();
                    self.stream.write_all(&frame).await?;
                },
            }
        }
    }

    /// Applies every complete state message buffered so far; several may
    /// have accumulated between polls.
    fn drain_state_messages(&mut self) -> Result<(), wire::WireError> {
        while let Some(snapshot) = wire::decode_state(&mut self.recv_buffer)? {
            self.world.apply(snapshot);
        }
        Ok(())
    }
}
