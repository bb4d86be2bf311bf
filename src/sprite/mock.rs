use super::{CollisionHits, GroupHandle, SpriteError, SpriteHandle, SpriteService, SpriteSpec};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// A change observed by the mock, recorded when history is enabled.
#[derive(Debug, Clone, PartialEq)]
pub enum SpriteEvent {
    Created { handle: SpriteHandle, image: String },
    Deleted { handle: SpriteHandle, image: String },
}

#[derive(Debug, Clone)]
struct MockSprite {
    spec: SpriteSpec,
}

impl MockSprite {
    fn overlaps(&self, other: &MockSprite) -> bool {
        let (a, b) = (&self.spec, &other.spec);
        (a.x - b.x).abs() * 2.0 < a.width + b.width && (a.y - b.y).abs() * 2.0 < a.height + b.height
    }
}

#[derive(Debug, Default)]
struct Inner {
    next_sprite: u32,
    next_group: u32,
    sprites: BTreeMap<u32, MockSprite>,
    groups: HashMap<u32, Vec<SpriteHandle>>,
    capacity: Option<usize>,
    unavailable: bool,
    failing_deletes: bool,
    failed_calls: u64,
    history: Option<Vec<SpriteEvent>>,
}

impl Inner {
    fn check_available(&mut self) -> Result<(), SpriteError> {
        if self.unavailable {
            self.failed_calls += 1;
            return Err(SpriteError::Unavailable);
        }
        Ok(())
    }

    fn sprite_mut(&mut self, handle: SpriteHandle) -> Result<&mut MockSprite, SpriteError> {
        self.sprites
            .get_mut(&handle.0)
            .ok_or(SpriteError::UnknownHandle(handle.0))
    }
}

/// In-memory sprite service with axis-aligned box collision.
///
/// Clones share the same scene, so a test can keep one copy for inspection
/// while the engine owns another.
#[derive(Debug, Clone, Default)]
pub struct MockSpriteService {
    inner: Arc<Mutex<Inner>>,
}

impl MockSpriteService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let service = Self::default();
        service.inner.lock().capacity = Some(capacity);
        service
    }

    pub fn record_history(&self) {
        self.inner.lock().history.get_or_insert_with(Vec::new);
    }

    pub fn history(&self) -> Vec<SpriteEvent> {
        self.inner.lock().history.clone().unwrap_or_default()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.inner.lock().unavailable = unavailable;
    }

    /// Makes `delete` fail while every other call keeps working.
    pub fn set_failing_deletes(&self, failing: bool) {
        self.inner.lock().failing_deletes = failing;
    }

    pub fn set_capacity(&self, capacity: Option<usize>) {
        self.inner.lock().capacity = capacity;
    }

    pub fn failed_calls(&self) -> u64 {
        self.inner.lock().failed_calls
    }

    pub fn live_count(&self) -> usize {
        self.inner.lock().sprites.len()
    }

    pub fn group_count(&self) -> usize {
        self.inner.lock().groups.len()
    }

    pub fn count_image(&self, image: &str) -> usize {
        self.inner
            .lock()
            .sprites
            .values()
            .filter(|s| s.spec.image == image)
            .count()
    }

    pub fn images(&self) -> Vec<String> {
        self.inner
            .lock()
            .sprites
            .values()
            .map(|s| s.spec.image.clone())
            .collect()
    }

    pub fn is_live(&self, handle: SpriteHandle) -> bool {
        self.inner.lock().sprites.contains_key(&handle.0)
    }

    pub fn spec(&self, handle: SpriteHandle) -> Option<SpriteSpec> {
        self.inner
            .lock()
            .sprites
            .get(&handle.0)
            .map(|s| s.spec.clone())
    }
}

impl SpriteService for MockSpriteService {
    fn create(&mut self, spec: &SpriteSpec) -> Result<SpriteHandle, SpriteError> {
        let mut inner = self.inner.lock();
        inner.check_available()?;
        if inner
            .capacity
            .is_some_and(|limit| inner.sprites.len() >= limit)
        {
            return Err(SpriteError::Exhausted);
        }
        inner.next_sprite += 1;
        let handle = SpriteHandle(inner.next_sprite);
        inner
            .sprites
            .insert(handle.0, MockSprite { spec: spec.clone() });
        if let Some(history) = inner.history.as_mut() {
            history.push(SpriteEvent::Created {
                handle,
                image: spec.image.clone(),
            });
        }
        Ok(handle)
    }

    fn delete(&mut self, handle: SpriteHandle) -> Result<(), SpriteError> {
        let mut inner = self.inner.lock();
        inner.check_available()?;
        if inner.failing_deletes {
            inner.failed_calls += 1;
            return Err(SpriteError::Unavailable);
        }
        let sprite = inner
            .sprites
            .remove(&handle.0)
            .ok_or(SpriteError::UnknownHandle(handle.0))?;
        for members in inner.groups.values_mut() {
            members.retain(|h| *h != handle);
        }
        if let Some(history) = inner.history.as_mut() {
            history.push(SpriteEvent::Deleted {
                handle,
                image: sprite.spec.image,
            });
        }
        Ok(())
    }

    fn set_position(&mut self, handle: SpriteHandle, x: f32, y: f32) -> Result<(), SpriteError> {
        let mut inner = self.inner.lock();
        inner.check_available()?;
        let sprite = inner.sprite_mut(handle)?;
        sprite.spec.x = x;
        sprite.spec.y = y;
        Ok(())
    }

    fn set_rotation(&mut self, handle: SpriteHandle, angle: f32) -> Result<(), SpriteError> {
        let mut inner = self.inner.lock();
        inner.check_available()?;
        inner.sprite_mut(handle)?.spec.angle = angle;
        Ok(())
    }

    fn create_group(&mut self) -> Result<GroupHandle, SpriteError> {
        let mut inner = self.inner.lock();
        inner.check_available()?;
        inner.next_group += 1;
        let group = inner.next_group;
        inner.groups.insert(group, Vec::new());
        Ok(GroupHandle(group))
    }

    fn delete_group(&mut self, group: GroupHandle) -> Result<(), SpriteError> {
        let mut inner = self.inner.lock();
        inner.check_available()?;
        inner
            .groups
            .remove(&group.0)
            .map(|_| ())
            .ok_or(SpriteError::UnknownHandle(group.0))
    }

    fn add_to_group(
        &mut self,
        group: GroupHandle,
        handle: SpriteHandle,
    ) -> Result<(), SpriteError> {
        let mut inner = self.inner.lock();
        inner.check_available()?;
        if !inner.sprites.contains_key(&handle.0) {
            return Err(SpriteError::UnknownHandle(handle.0));
        }
        let members = inner
            .groups
            .get_mut(&group.0)
            .ok_or(SpriteError::UnknownHandle(group.0))?;
        if !members.contains(&handle) {
            members.push(handle);
        }
        Ok(())
    }

    fn test_collision(
        &mut self,
        handle: SpriteHandle,
        group: GroupHandle,
        max_results: usize,
    ) -> Result<CollisionHits, SpriteError> {
        let mut inner = self.inner.lock();
        inner.check_available()?;
        let query = inner
            .sprites
            .get(&handle.0)
            .ok_or(SpriteError::UnknownHandle(handle.0))?;
        let members = inner
            .groups
            .get(&group.0)
            .ok_or(SpriteError::UnknownHandle(group.0))?;

        let mut hits = CollisionHits::default();
        for member in members.iter().filter(|m| **m != handle) {
            if hits.count >= max_results {
                break;
            }
            let Some(other) = inner.sprites.get(&member.0) else {
                continue;
            };
            if query.overlaps(other) {
                hits.count += 1;
                hits.first.get_or_insert(*member);
            }
        }
        Ok(hits)
    }
}
