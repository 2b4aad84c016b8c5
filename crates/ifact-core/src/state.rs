//! Interpreter snapshots
//!
//! A [`GameState`] is a complete, restorable copy of an interpreter at one
//! instant. It is immutable once produced: the image sits behind an `Arc`,
//! so cloning a state (for example to hand it to every parallel worker) is
//! cheap and no holder can mutate what another holder sees.

use std::sync::Arc;

use ifact_rng::RngTriple;
use serde::{Deserialize, Serialize};

/// Machine registers captured alongside memory
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Registers {
    /// Program counter
    pub pc: u32,
    /// Stack pointer
    pub sp: u32,
    /// Frame pointer
    pub fp: u32,
    /// Number of active call frames
    pub frame_count: u32,
    /// Pending-input opcode marker
    pub opcode: u16,
}

/// Interpreter "dirty" flags for the last executed command
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChangeFlags {
    /// The object tree differed before and after the last command
    pub objects_changed: bool,
    /// The special-RAM bytes differed before and after the last command
    pub ram_changed: bool,
}

#[derive(Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
struct StateImage {
    memory: Vec<u8>,
    stack: Vec<u8>,
    registers: Registers,
    rng: RngTriple,
    narrative: String,
    flags: ChangeFlags,
}

/// Opaque, immutable snapshot of interpreter state.
///
/// Restoring the same `GameState` twice must yield identical subsequent
/// behaviour; interpreters guarantee this by overwriting all live state
/// from the snapshot in `set_state`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GameState {
    image: Arc<StateImage>,
}

impl GameState {
    /// Build a snapshot from its parts.
    pub fn new(
        memory: Vec<u8>,
        stack: Vec<u8>,
        registers: Registers,
        rng: RngTriple,
        narrative: String,
        flags: ChangeFlags,
    ) -> Self {
        Self {
            image: Arc::new(StateImage {
                memory,
                stack,
                registers,
                rng,
                narrative,
                flags,
            }),
        }
    }

    /// Dynamic memory image
    pub fn memory(&self) -> &[u8] {
        &self.image.memory
    }

    /// Call stack image
    pub fn stack(&self) -> &[u8] {
        &self.image.stack
    }

    pub fn registers(&self) -> Registers {
        self.image.registers
    }

    pub fn rng(&self) -> RngTriple {
        self.image.rng
    }

    /// Narrative text buffer at snapshot time
    pub fn narrative(&self) -> &str {
        &self.image.narrative
    }

    pub fn flags(&self) -> ChangeFlags {
        self.image.flags
    }

    /// Whether two handles share the same underlying image
    pub fn shares_image(&self, other: &GameState) -> bool {
        Arc::ptr_eq(&self.image, &other.image)
    }

    /// Serialize the snapshot to JSON bytes (for persisting branch points).
    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(&*self.image)
    }

    /// Restore a snapshot previously written by [`GameState::to_json`].
    pub fn from_json(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        let image: StateImage = serde_json::from_slice(bytes)?;
        Ok(Self {
            image: Arc::new(image),
        })
    }
}
