//! Input aggregation shared by client and server.
//!
//! Each button tracks two things between simulation ticks: how many times it
//! was pressed (edge count, saturating) and whether it is held right now
//! (level state). The client aggregates real input events into a `Controls`
//! value and ships it once per tick; the server accumulates decoded controls
//! messages into its per-player mirror until the simulation consumes them.

use log::warn;

/// Pressed flag in a wire-encoded button byte.
const PRESSED_BIT: u8 = 0x80;
/// Low seven bits of a wire-encoded button byte carry the press count.
const DOWNS_MASK: u8 = 0x7f;

/// A single control input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Button {
    /// Rising edges since the last flush; saturates at 255.
    pub downs: u8,
    /// Is the button held right now. Persists across flushes until an
    /// opposing release event.
    pub pressed: bool,
}

impl Button {
    /// Records a press edge. Key-repeat events must not be fed here; the
    /// event source filters them out.
    pub fn press(&mut self) {
        self.downs = self.downs.saturating_add(1);
        self.pressed = true;
    }

    /// Records a release. The edge count is unaffected.
    pub fn release(&mut self) {
        self.pressed = false;
    }

    /// Packs the button into its wire byte: bit 7 = pressed, bits 0..=6 =
    /// press count, clamped to the 7-bit range.
    pub(crate) fn to_wire_byte(self) -> u8 {
        if self.downs > DOWNS_MASK {
            warn!(
                "button pressed {} times since last flush; clamping to {}",
                self.downs, DOWNS_MASK
            );
        }
        let downs = self.downs.min(DOWNS_MASK);
        if self.pressed {
            PRESSED_BIT | downs
        } else {
            downs
        }
    }

    /// Unpacks a wire byte, adding its press count onto whatever edges are
    /// already buffered here. The sum saturates at 255.
    pub(crate) fn accumulate_wire_byte(&mut self, byte: u8) {
        self.pressed = byte & PRESSED_BIT != 0;
        let total = u32::from(self.downs) + u32::from(byte & DOWNS_MASK);
        if total > 255 {
            warn!("button press count saturated at 255");
        }
        self.downs = total.min(255) as u8;
    }
}

/// The full set of controls for one player.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Controls {
    pub left: Button,
    pub right: Button,
    pub up: Button,
    pub down: Button,
    /// Toggles between fill mode and mark-empty mode.
    pub shift: Button,
    /// Submits a guess for the player's current cell.
    pub confirm: Button,
}

impl Controls {
    /// Buttons in wire order.
    pub fn buttons(&self) -> [&Button; 6] {
        [
            &self.left,
            &self.right,
            &self.up,
            &self.down,
            &self.shift,
            &self.confirm,
        ]
    }

    /// Buttons in wire order, mutable.
    pub fn buttons_mut(&mut self) -> [&mut Button; 6] {
        [
            &mut self.left,
            &mut self.right,
            &mut self.up,
            &mut self.down,
            &mut self.shift,
            &mut self.confirm,
        ]
    }

    /// Clears the edge counters once they have been consumed. Level state is
    /// left alone; it tracks the physical keys.
    pub fn clear_downs(&mut self) {
        for button in self.buttons_mut() {
            button.downs = 0;
        }
    }
}
