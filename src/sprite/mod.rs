//! Contract for the external graphics subsystem.
//!
//! Every visual handle the engine owns goes through a [`SpriteService`]. Calls
//! are synchronous and expected to return quickly, so the engine makes them
//! while holding the shared-state lock.

pub mod mock;

use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpriteHandle(pub u32);

impl fmt::Display for SpriteHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sprite#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GroupHandle(pub u32);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SpriteError {
    #[error("sprite service has no free handles")]
    Exhausted,
    #[error("sprite service did not respond")]
    Unavailable,
    #[error("unknown handle {0}")]
    UnknownHandle(u32),
}

/// Everything needed to put a new sprite on screen.
#[derive(Debug, Clone, PartialEq)]
pub struct SpriteSpec {
    pub image: String,
    pub x: f32,
    pub y: f32,
    pub angle: f32,
    pub width: f32,
    pub height: f32,
    pub depth: u8,
}

impl SpriteSpec {
    pub fn new(image: impl Into<String>, x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            image: image.into(),
            x,
            y,
            angle: 0.0,
            width,
            height,
            depth: 1,
        }
    }

    pub fn square(image: impl Into<String>, x: f32, y: f32, size: f32) -> Self {
        Self::new(image, x, y, size, size)
    }

    pub fn with_angle(mut self, angle: f32) -> Self {
        self.angle = angle;
        self
    }

    pub fn with_depth(mut self, depth: u8) -> Self {
        self.depth = depth;
        self
    }
}

/// Result of a group intersection query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CollisionHits {
    pub count: usize,
    pub first: Option<SpriteHandle>,
}

impl CollisionHits {
    pub fn is_hit(&self) -> bool {
        self.count > 0
    }
}

pub trait SpriteService: Send {
    fn create(&mut self, spec: &SpriteSpec) -> Result<SpriteHandle, SpriteError>;

    fn delete(&mut self, handle: SpriteHandle) -> Result<(), SpriteError>;

    fn set_position(&mut self, handle: SpriteHandle, x: f32, y: f32) -> Result<(), SpriteError>;

    fn set_rotation(&mut self, handle: SpriteHandle, angle: f32) -> Result<(), SpriteError>;

    fn create_group(&mut self) -> Result<GroupHandle, SpriteError>;

    fn delete_group(&mut self, group: GroupHandle) -> Result<(), SpriteError>;

    fn add_to_group(&mut self, group: GroupHandle, handle: SpriteHandle)
    -> Result<(), SpriteError>;

    /// Tests `handle` against every member of `group`, reporting at most
    /// `max_results` hits. The handle itself never counts as a hit.
    fn test_collision(
        &mut self,
        handle: SpriteHandle,
        group: GroupHandle,
        max_results: usize,
    ) -> Result<CollisionHits, SpriteError>;
}

impl<S: SpriteService + ?Sized> SpriteService for Box<S> {
    fn create(&mut self, spec: &SpriteSpec) -> Result<SpriteHandle, SpriteError> {
        (**self).create(spec)
    }

    fn delete(&mut self, handle: SpriteHandle) -> Result<(), SpriteError> {
        (**self).delete(handle)
    }

    fn set_position(&mut self, handle: SpriteHandle, x: f32, y: f32) -> Result<(), SpriteError> {
        (**self).set_position(handle, x, y)
    }

    fn set_rotation(&mut self, handle: SpriteHandle, angle: f32) -> Result<(), SpriteError> {
        (**self).set_rotation(handle, angle)
    }

    fn create_group(&mut self) -> Result<GroupHandle, SpriteError> {
        (**self).create_group()
    }

    fn delete_group(&mut self, group: GroupHandle) -> Result<(), SpriteError> {
        (**self).delete_group(group)
    }

    fn add_to_group(
        &mut self,
        group: GroupHandle,
        handle: SpriteHandle,
    ) -> Result<(), SpriteError> {
        (**self).add_to_group(group, handle)
    }

    fn test_collision(
        &mut self,
        handle: SpriteHandle,
        group: GroupHandle,
        max_results: usize,
    ) -> Result<CollisionHits, SpriteError> {
        (**self).test_collision(handle, group, max_results)
    }
}
