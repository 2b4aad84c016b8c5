//! Equivalence keys
//!
//! Two candidate actions are "the same action" when they leave the world in
//! the same state. The resolver buckets by one of two keys:
//!
//! - [`WorldDigest`]: SHA-256 over the cleaned object tree and special RAM.
//!   Fixed size, opaque.
//! - [`WorldDelta`]: the structured difference from the reference state
//!   (objects moved, attributes set and cleared, RAM bytes written).
//!
//! Both are computed against the same reference, so the delta partition is
//! never coarser than the digest partition. When a delta cannot describe a
//! change (capacity overflow, property or name edits) it carries the digest
//! of the resulting world as a residual.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use strum::{Display, EnumString};
use tracing::warn;

use crate::interpreter::GameInterpreter;
use crate::world::{ATTRIBUTE_COUNT, ObjectNum, WorldObject};

/// Opaque fixed-size digest of a world state
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorldDigest(pub [u8; 32]);

impl WorldDigest {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl core::fmt::Display for WorldDigest {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl core::fmt::Debug for WorldDigest {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "WorldDigest({})", &hex::encode(self.0)[..16])
    }
}

/// Hash an object table and special RAM.
///
/// Sibling and child links are left out: they encode the order of objects
/// inside a container, which many commands shuffle without any real effect.
pub fn digest_world(objects: &[WorldObject], special_ram: &[u8]) -> WorldDigest {
    let mut hasher = Sha256::new();
    hasher.update((objects.len() as u64).to_le_bytes());
    for obj in objects {
        hasher.update(obj.num.to_le_bytes());
        hasher.update((obj.name.len() as u64).to_le_bytes());
        hasher.update(obj.name.as_bytes());
        hasher.update(obj.parent.to_le_bytes());
        hasher.update(obj.attributes);
        hasher.update((obj.properties.len() as u64).to_le_bytes());
        for (id, bytes) in &obj.properties {
            hasher.update([*id]);
            hasher.update((bytes.len() as u64).to_le_bytes());
            hasher.update(bytes);
        }
    }
    hasher.update((special_ram.len() as u64).to_le_bytes());
    hasher.update(special_ram);
    WorldDigest(hasher.finalize().into())
}

/// The parts of interpreter state an equivalence key is computed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorldView {
    /// Cleaned object table, indexed by object number
    pub objects: Vec<WorldObject>,
    pub special_ram: Vec<u8>,
}

impl WorldView {
    pub fn capture<I: GameInterpreter + ?Sized>(interp: &I) -> Self {
        Self {
            objects: interp.world_objects(true),
            special_ram: interp.special_ram(),
        }
    }

    pub fn digest(&self) -> WorldDigest {
        digest_world(&self.objects, &self.special_ram)
    }
}

/// Maximum number of changes a [`WorldDelta`] records per axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeltaCapacity {
    pub moved: usize,
    pub attrs: usize,
    pub ram: usize,
}

impl Default for DeltaCapacity {
    fn default() -> Self {
        Self {
            moved: 16,
            attrs: 32,
            ram: 32,
        }
    }
}

/// Structured difference between a reference world and a resulting one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorldDelta {
    /// (object, new parent)
    pub moved: Vec<(ObjectNum, ObjectNum)>,
    /// (object, attribute) newly set
    pub set_attrs: Vec<(ObjectNum, u8)>,
    /// (object, attribute) newly cleared
    pub cleared_attrs: Vec<(ObjectNum, u8)>,
    /// (special RAM index, new value)
    pub ram: Vec<(u16, u8)>,
    /// Digest of the resulting world when the axes above are incomplete
    pub residual: Option<WorldDigest>,
    /// At least one axis hit its capacity
    pub overflowed: bool,
}

fn push_capped<T>(axis: &mut Vec<T>, cap: usize, item: T, overflowed: &mut bool) {
    if axis.len() < cap {
        axis.push(item);
    } else {
        *overflowed = true;
    }
}

impl WorldDelta {
    /// Diff `after` against `before`.
    pub fn between(before: &WorldView, after: &WorldView, cap: DeltaCapacity) -> Self {
        let mut delta = WorldDelta::default();
        let mut overflowed = false;
        let mut untracked = before.objects.len() != after.objects.len()
            || before.special_ram.len() != after.special_ram.len();

        for (old, new) in before.objects.iter().zip(&after.objects) {
            if old.num != new.num || old.name != new.name || old.properties != new.properties {
                untracked = true;
            }
            if old.parent != new.parent {
                push_capped(&mut delta.moved, cap.moved, (new.num, new.parent), &mut overflowed);
            }
            if old.attributes == new.attributes {
                continue;
            }
            for attr in 0..ATTRIBUTE_COUNT {
                match (old.has_attr(attr), new.has_attr(attr)) {
                    (false, true) => {
                        push_capped(&mut delta.set_attrs, cap.attrs, (new.num, attr), &mut overflowed)
                    }
                    (true, false) => push_capped(
                        &mut delta.cleared_attrs,
                        cap.attrs,
                        (new.num, attr),
                        &mut overflowed,
                    ),
                    _ => {}
                }
            }
        }

        for (idx, (old, new)) in before.special_ram.iter().zip(&after.special_ram).enumerate() {
            if old == new {
                continue;
            }
            match u16::try_from(idx) {
                Ok(idx) => push_capped(&mut delta.ram, cap.ram, (idx, *new), &mut overflowed),
                Err(_) => untracked = true,
            }
        }

        if overflowed {
            warn!(
                moved = delta.moved.len(),
                attrs = delta.set_attrs.len() + delta.cleared_attrs.len(),
                ram = delta.ram.len(),
                "world delta exceeded capacity, falling back to residual digest"
            );
        }
        if overflowed || untracked {
            delta.residual = Some(after.digest());
        }
        delta.overflowed = overflowed;
        delta
    }

    /// No tracked or untracked change
    pub fn is_empty(&self) -> bool {
        self.moved.is_empty()
            && self.set_attrs.is_empty()
            && self.cleared_attrs.is_empty()
            && self.ram.is_empty()
            && self.residual.is_none()
    }
}

/// Which key the resolver buckets by
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum KeyKind {
    Digest,
    #[default]
    Delta,
}

/// Identity of a resulting world state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EquivalenceKey {
    WorldDigest(WorldDigest),
    WorldDelta(WorldDelta),
}

impl EquivalenceKey {
    /// Key for `after`, relative to `before` when `kind` is structured.
    pub fn compute(kind: KeyKind, before: &WorldView, after: &WorldView, cap: DeltaCapacity) -> Self {
        match kind {
            KeyKind::Digest => EquivalenceKey::WorldDigest(after.digest()),
            KeyKind::Delta => EquivalenceKey::WorldDelta(WorldDelta::between(before, after, cap)),
        }
    }
}

impl From<WorldDigest> for EquivalenceKey {
    fn from(digest: WorldDigest) -> Self {
        EquivalenceKey::WorldDigest(digest)
    }
}
