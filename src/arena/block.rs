//! Block resource entities
//!
//! Blocks are movable resources placed by a distributor, carried by robots,
//! or aggregated into caches. A block is owned by exactly one of those three
//! states at any instant. While carried, its location is parked at an
//! out-of-sight sentinel coordinate used only for rendering consistency,
//! never for spatial lookup.

use serde::{Deserialize, Serialize};

use crate::util::span::Span;
use crate::util::vec2::{GridCoord, Vec2};

/// Unique block identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockId(pub u32);

/// Identifier of a simulated robot interacting with the arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RobotId(pub u32);

/// Sequential id allocator owned by the arena
///
/// Passed explicitly to entity constructors; there is no process-global
/// counter.
#[derive(Debug, Default)]
pub struct IdAllocator {
    next: u32,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self) -> u32 {
        let id = self.next;
        self.next += 1;
        id
    }
}

/// Out-of-sight sentinel for carried blocks
pub const OUT_OF_SIGHT_RLOC: Vec2 = Vec2 {
    x: 1000.0,
    y: 1000.0,
};
/// Discrete counterpart of [`OUT_OF_SIGHT_RLOC`]
pub const OUT_OF_SIGHT_DLOC: GridCoord = GridCoord { x: 1000, y: 1000 };

/// Capability interface for spatially extended entities
///
/// Anything with a real-valued center, a discretized location, and physical
/// dimensions; overlap checks are written against this rather than concrete
/// entity types.
pub trait Spatial {
    fn rloc(&self) -> Vec2;
    fn dloc(&self) -> GridCoord;
    fn dims(&self) -> Vec2;

    /// Bounding interval along X
    fn xspan(&self) -> Span {
        Span::centered(self.rloc().x, self.dims().x)
    }

    /// Bounding interval along Y
    fn yspan(&self) -> Span {
        Span::centered(self.rloc().y, self.dims().y)
    }
}

/// Carrier/pickup bookkeeping shared by all block variants
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockMetadata {
    /// Robot currently carrying this block, if any
    carried_by: Option<RobotId>,
    /// Timestep of the block's first pickup
    first_pickup: Option<u64>,
}

impl BlockMetadata {
    pub fn carried_by(&self) -> Option<RobotId> {
        self.carried_by
    }

    pub fn first_pickup(&self) -> Option<u64> {
        self.first_pickup
    }

    pub fn robot_id_reset(&mut self) {
        self.carried_by = None;
    }

    fn robot_pickup(&mut self, robot: RobotId, t: u64) {
        self.carried_by = Some(robot);
        self.first_pickup.get_or_insert(t);
    }
}

/// Planar block entity
#[derive(Debug, Clone)]
pub struct Block2D {
    id: BlockId,
    dims: Vec2,
    rloc: Vec2,
    dloc: GridCoord,
    md: BlockMetadata,
}

impl Block2D {
    pub fn new(id: BlockId, dims: Vec2) -> Self {
        Self {
            id,
            dims,
            rloc: Vec2::ZERO,
            dloc: GridCoord::new(0, 0),
            md: BlockMetadata::default(),
        }
    }
}

/// Block entity with a vertical extent, for 3D physics backends
#[derive(Debug, Clone)]
pub struct Block3D {
    id: BlockId,
    dims: Vec2,
    height: f64,
    rloc: Vec2,
    z: f64,
    dloc: GridCoord,
    md: BlockMetadata,
}

impl Block3D {
    pub fn new(id: BlockId, dims: Vec2, height: f64) -> Self {
        Self {
            id,
            dims,
            height,
            rloc: Vec2::ZERO,
            z: 0.0,
            dloc: GridCoord::new(0, 0),
            md: BlockMetadata::default(),
        }
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn z(&self) -> f64 {
        self.z
    }
}

/// Sum type over block variants carried through operation arguments
///
/// All dispatch is an exhaustive match; there is no inheritance hierarchy to
/// double-dispatch over.
#[derive(Debug, Clone)]
pub enum Block {
    TwoD(Block2D),
    ThreeD(Block3D),
}

impl Block {
    pub fn id(&self) -> BlockId {
        match self {
            Block::TwoD(b) => b.id,
            Block::ThreeD(b) => b.id,
        }
    }

    pub fn md(&self) -> &BlockMetadata {
        match self {
            Block::TwoD(b) => &b.md,
            Block::ThreeD(b) => &b.md,
        }
    }

    pub fn md_mut(&mut self) -> &mut BlockMetadata {
        match self {
            Block::TwoD(b) => &mut b.md,
            Block::ThreeD(b) => &mut b.md,
        }
    }

    /// Whether a robot currently carries this block
    pub fn is_carried(&self) -> bool {
        self.md().carried_by.is_some()
    }

    /// Write the block's real and discretized location together
    pub fn set_location(&mut self, rloc: Vec2, dloc: GridCoord) {
        match self {
            Block::TwoD(b) => {
                b.rloc = rloc;
                b.dloc = dloc;
            }
            Block::ThreeD(b) => {
                b.rloc = rloc;
                b.z = 0.0;
                b.dloc = dloc;
            }
        }
    }

    /// Record a robot pickup and move the block out of sight
    ///
    /// The sentinel location exists for rendering/consistency only; spatial
    /// lookups must go through the grid, which no longer references this
    /// block after pickup.
    pub fn robot_pickup_event(&mut self, robot: RobotId, t: u64) {
        self.md_mut().robot_pickup(robot, t);
        self.move_out_of_sight();
    }

    pub fn is_out_of_sight(&self) -> bool {
        self.dloc() == OUT_OF_SIGHT_DLOC || self.rloc() == OUT_OF_SIGHT_RLOC
    }

    fn move_out_of_sight(&mut self) {
        self.set_location(OUT_OF_SIGHT_RLOC, OUT_OF_SIGHT_DLOC);
    }
}

impl Spatial for Block {
    fn rloc(&self) -> Vec2 {
        match self {
            Block::TwoD(b) => b.rloc,
            Block::ThreeD(b) => b.rloc,
        }
    }

    fn dloc(&self) -> GridCoord {
        match self {
            Block::TwoD(b) => b.dloc,
            Block::ThreeD(b) => b.dloc,
        }
    }

    fn dims(&self) -> Vec2 {
        match self {
            Block::TwoD(b) => b.dims,
            Block::ThreeD(b) => b.dims,
        }
    }
}
