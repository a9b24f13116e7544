//! Byte-level wire codec: framing, stream reassembly, and the two protocol
//! messages.
//!
//! Every message is framed as `[type: u8][size: u24 little-endian][payload]`
//! over a reliable, ordered byte stream. The three-byte size field and the
//! four-byte header are fixed protocol constants; both endpoints must
//! reproduce this framing exactly. All multi-byte fields are little-endian.
//!
//! Decoding distinguishes three outcomes:
//! - "no message yet" — fewer bytes buffered than a complete frame needs, or
//!   the buffer leads with a different message type. Not an error; the
//!   caller re-polls after more bytes arrive.
//! - success — exactly one message was applied and its bytes drained from
//!   the front of the buffer. Callers loop until "no message yet", since
//!   several messages may have accumulated between polls.
//! - [`WireError`] — a fatal protocol violation; the connection should be
//!   terminated, not resynchronized.
//!
//! A message is never partially applied: decoding parses the whole payload
//! before committing any effect or draining any byte.

use crate::controls::Controls;
use crate::game::{Game, Player, StateSnapshot};
use crate::puzzle::Clues;
use crate::vec::{Vec2, Vec3};
use std::collections::HashMap;
use thiserror::Error;

/// Leading type byte of a client-to-server controls message.
pub const MSG_CONTROLS: u8 = 1;
/// Leading type byte of a server-to-client state message.
pub const MSG_STATE: u8 = b's';
/// Frame header: type byte plus 24-bit little-endian payload size.
pub const HEADER_LEN: usize = 4;
/// A controls payload is always one byte per button.
pub const CONTROLS_PAYLOAD_LEN: usize = 6;

/// Fatal protocol violations. These mean a corrupted stream or a schema
/// mismatch, never partial delivery.
#[derive(Debug, Error)]
pub enum WireError {
    #[error("controls message with size {0} != 6")]
    BadControlsSize(u32),

    #[error("ran out of bytes reading state message")]
    UnexpectedEnd,

    #[error("trailing data in state message")]
    TrailingData,
}

/// Appends one controls frame to `send_buffer`.
pub fn encode_controls(controls: &Controls, send_buffer: &mut Vec<u8>) {
    send_buffer.push(MSG_CONTROLS);
    let size = CONTROLS_PAYLOAD_LEN as u32;
    send_buffer.push(size as u8);
    send_buffer.push((size >> 8) as u8);
    send_buffer.push((size >> 16) as u8);
    for button in controls.buttons() {
        send_buffer.push(button.to_wire_byte());
    }
}

/// Attempts to consume one controls frame from the front of `recv_buffer`,
/// accumulating its button state into `controls`.
///
/// Returns `Ok(false)` when no complete controls message is buffered yet,
/// `Ok(true)` after exactly one message was applied and drained. A
/// recognized controls header whose size is not exactly 6 is fatal: the
/// payload size is fixed by the schema, so a mismatch is corruption, not
/// partial delivery.
pub fn recv_controls(
    recv_buffer: &mut Vec<u8>,
    controls: &mut Controls,
) -> Result<bool, WireError> {
    if recv_buffer.len() < HEADER_LEN {
        return Ok(false);
    }
    if recv_buffer[0] != MSG_CONTROLS {
        return Ok(false);
    }
    let size = payload_size(recv_buffer);
    if size as usize != CONTROLS_PAYLOAD_LEN {
        return Err(WireError::BadControlsSize(size));
    }
    if recv_buffer.len() < HEADER_LEN + CONTROLS_PAYLOAD_LEN {
        return Ok(false);
    }

    for (i, button) in controls.buttons_mut().into_iter().enumerate() {
        button.accumulate_wire_byte(recv_buffer[HEADER_LEN + i]);
    }

    recv_buffer.drain(..HEADER_LEN + CONTROLS_PAYLOAD_LEN);
    Ok(true)
}

/// Appends one full state frame to `send_buffer`.
///
/// When `focus_player` names a player id, that player's record is emitted
/// first so the receiving client can identify itself as the head of the
/// roster; the rest follow in container order.
pub fn encode_state(game: &Game, focus_player: Option<u32>, send_buffer: &mut Vec<u8>) {
    send_buffer.push(MSG_STATE);
    // placeholder size bytes, patched once the payload length is known
    send_buffer.extend_from_slice(&[0, 0, 0]);
    let mark = send_buffer.len();

    put_u8(send_buffer, game.players.len() as u8);
    let focus = focus_player.and_then(|id| game.player(id));
    if let Some(player) = focus {
        put_player(send_buffer, player);
    }
    for player in &game.players {
        if Some(player.id) == focus.map(|p| p.id) {
            continue;
        }
        put_player(send_buffer, player);
    }

    // ascending id order keeps the encoding deterministic
    let mut color_ids: Vec<u32> = game.colormap.keys().copied().collect();
    color_ids.sort_unstable();
    put_count(send_buffer, color_ids.len());
    for id in color_ids {
        put_u32(send_buffer, id);
        put_vec3(send_buffer, game.colormap[&id]);
    }

    put_u32(send_buffer, game.width);
    put_u32(send_buffer, game.height);
    put_vec2(send_buffer, game.arena_min);
    put_vec2(send_buffer, game.arena_max);

    put_u32(send_buffer, game.clues.height);
    put_u32(send_buffer, game.clues.width);
    put_clue_table(send_buffer, &game.clues.by_row);
    put_clue_table(send_buffer, &game.clues.by_col);

    put_count(send_buffer, game.grid.progress.len());
    for row in &game.grid.progress {
        put_count(send_buffer, row.len());
        for &cell in row {
            put_i32(send_buffer, cell);
        }
    }

    put_f32(send_buffer, game.global_cooldown);

    let size = (send_buffer.len() - mark) as u32;
    send_buffer[mark - 3] = size as u8;
    send_buffer[mark - 2] = (size >> 8) as u8;
    send_buffer[mark - 1] = (size >> 16) as u8;
}

/// Attempts to consume one state frame from the front of `recv_buffer`.
///
/// Returns `Ok(None)` when no complete state message is buffered yet,
/// `Ok(Some(snapshot))` after exactly one message was parsed and drained.
/// Fatal if any field read would pass the declared payload size, or if
/// bytes remain unconsumed once every field has been read.
pub fn decode_state(recv_buffer: &mut Vec<u8>) -> Result<Option<StateSnapshot>, WireError> {
    if recv_buffer.len() < HEADER_LEN {
        return Ok(None);
    }
    if recv_buffer[0] != MSG_STATE {
        return Ok(None);
    }
    let size = payload_size(recv_buffer) as usize;
    if recv_buffer.len() < HEADER_LEN + size {
        return Ok(None);
    }

    let mut reader = Reader::new(&recv_buffer[HEADER_LEN..HEADER_LEN + size]);

    let player_count = reader.u8()?;
    let mut players = Vec::new();
    for _ in 0..player_count {
        players.push(read_player(&mut reader)?);
    }

    let colormap_count = reader.count()?;
    let mut colormap = HashMap::new();
    for _ in 0..colormap_count {
        let id = reader.u32()?;
        let color = reader.vec3()?;
        colormap.insert(id, color);
    }

    let width = reader.u32()?;
    let height = reader.u32()?;
    let arena_min = reader.vec2()?;
    let arena_max = reader.vec2()?;

    let clues_height = reader.u32()?;
    let clues_width = reader.u32()?;
    let by_row = read_clue_table(&mut reader)?;
    let by_col = read_clue_table(&mut reader)?;

    let outer = reader.count()?;
    let mut progress = Vec::new();
    for _ in 0..outer {
        let inner = reader.count()?;
        let mut row = Vec::new();
        for _ in 0..inner {
            row.push(reader.i32()?);
        }
        progress.push(row);
    }

    let global_cooldown = reader.f32()?;

    if !reader.finished() {
        return Err(WireError::TrailingData);
    }

    recv_buffer.drain(..HEADER_LEN + size);

    Ok(Some(StateSnapshot {
        players,
        colormap,
        width,
        height,
        arena_min,
        arena_max,
        clues: Clues {
            width: clues_width,
            height: clues_height,
            by_row,
            by_col,
        },
        progress,
        global_cooldown,
    }))
}

/// Reads the 24-bit little-endian size from a frame header.
fn payload_size(buf: &[u8]) -> u32 {
    u32::from(buf[1]) | u32::from(buf[2]) << 8 | u32::from(buf[3]) << 16
}

fn put_u8(buf: &mut Vec<u8>, v: u8) {
    buf.push(v);
}

fn put_u32(buf: &mut Vec<u8>, v: u32) {
    buf.extend_from_slice(&v.to_le_bytes());
}

fn put_i32(buf: &mut Vec<u8>, v: i32) {
    buf.extend_from_slice(&v.to_le_bytes());
}

fn put_f32(buf: &mut Vec<u8>, v: f32) {
    buf.extend_from_slice(&v.to_le_bytes());
}

/// Sequence counts go out as u64 so the encoding is identical across
/// platforms.
fn put_count(buf: &mut Vec<u8>, v: usize) {
    buf.extend_from_slice(&(v as u64).to_le_bytes());
}

fn put_vec2(buf: &mut Vec<u8>, v: Vec2) {
    put_f32(buf, v.x);
    put_f32(buf, v.y);
}

fn put_vec3(buf: &mut Vec<u8>, v: Vec3) {
    put_f32(buf, v.x);
    put_f32(buf, v.y);
    put_f32(buf, v.z);
}

fn put_clue_table(buf: &mut Vec<u8>, table: &[Vec<u32>]) {
    put_count(buf, table.len());
    for line in table {
        put_count(buf, line.len());
        for &clue in line {
            put_u32(buf, clue);
        }
    }
}

fn put_player(buf: &mut Vec<u8>, player: &Player) {
    put_vec2(buf, player.position);
    put_u32(buf, player.grid_pos.0);
    put_u32(buf, player.grid_pos.1);
    put_u8(buf, player.fill_mode as u8);
    put_u32(buf, player.id);
    put_vec3(buf, player.color);

    put_u32(buf, player.fill_correct);
    put_u32(buf, player.fill_incorrect);
    put_u32(buf, player.x_correct);
    put_u32(buf, player.x_incorrect);

    put_f32(buf, player.player_cooldown);

    // truncate to 255 bytes without tearing a UTF-8 character
    let mut len = player.name.len().min(255);
    while !player.name.is_char_boundary(len) {
        len -= 1;
    }
    put_u8(buf, len as u8);
    buf.extend_from_slice(&player.name.as_bytes()[..len]);
}

/// Bounds-checked little-endian cursor over one message payload.
struct Reader<'a> {
    payload: &'a [u8],
    at: usize,
}

impl<'a> Reader<'a> {
    fn new(payload: &'a [u8]) -> Self {
        Reader { payload, at: 0 }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], WireError> {
        if self.payload.len() - self.at < len {
            return Err(WireError::UnexpectedEnd);
        }
        let bytes = &self.payload[self.at..self.at + len];
        self.at += len;
        Ok(bytes)
    }

    fn finished(&self) -> bool {
        self.at == self.payload.len()
    }

    fn u8(&mut self) -> Result<u8, WireError> {
        Ok(self.take(1)?[0])
    }

    fn u32(&mut self) -> Result<u32, WireError> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn i32(&mut self) -> Result<i32, WireError> {
        let bytes = self.take(4)?;
        Ok(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn f32(&mut self) -> Result<f32, WireError> {
        let bytes = self.take(4)?;
        Ok(f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn count(&mut self) -> Result<usize, WireError> {
        let bytes = self.take(8)?;
        let v = u64::from_le_bytes([
            bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
        ]);
        // a count the payload cannot possibly satisfy is the same failure
        // as running out of bytes
        usize::try_from(v).map_err(|_| WireError::UnexpectedEnd)
    }

    fn vec2(&mut self) -> Result<Vec2, WireError> {
        Ok(Vec2::new(self.f32()?, self.f32()?))
    }

    fn vec3(&mut self) -> Result<Vec3, WireError> {
        Ok(Vec3::new(self.f32()?, self.f32()?, self.f32()?))
    }
}

fn read_clue_table(reader: &mut Reader) -> Result<Vec<Vec<u32>>, WireError> {
    let outer = reader.count()?;
    let mut table = Vec::new();
    for _ in 0..outer {
        let inner = reader.count()?;
        let mut line = Vec::new();
        for _ in 0..inner {
            line.push(reader.u32()?);
        }
        table.push(line);
    }
    Ok(table)
}

fn read_player(reader: &mut Reader) -> Result<Player, WireError> {
    let position = reader.vec2()?;
    let grid_pos = (reader.u32()?, reader.u32()?);
    let fill_mode = reader.u8()? != 0;
    let id = reader.u32()?;
    let color = reader.vec3()?;

    let fill_correct = reader.u32()?;
    let fill_incorrect = reader.u32()?;
    let x_correct = reader.u32()?;
    let x_incorrect = reader.u32()?;

    let player_cooldown = reader.f32()?;

    let name_len = reader.u8()? as usize;
    let name = String::from_utf8_lossy(reader.take(name_len)?).into_owned();

    Ok(Player {
        controls: Controls::default(),
        position,
        grid_pos,
        fill_mode,
        id,
        color,
        name,
        fill_correct,
        fill_incorrect,
        x_correct,
        x_incorrect,
        player_cooldown,
    })
}
