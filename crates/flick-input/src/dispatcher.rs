//! The listener table and pointer-event dispatch.
//!
//! Interactive targets live in an arena; a `TargetId` is an index into
//! it, so unregistering can never leave a dangling reference behind.
//! Every registered target gets a normalized hit identifier in `(0,1]`
//! forming a uniform partition of the unit interval, recomputed on
//! every insert and remove. The table, the remembered pointer-down
//! target and the drag state all share the dispatcher lock.

use crate::events::{EventKind, EventSink, RawInput};
use flick_core::{Rect, Vec2};
use flick_render::{RenderHandle, NO_TARGET};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, trace};

/// Resolves a canvas point to the normalized identifier drawn there.
/// Implemented by the render thread's handle; tests substitute stubs.
pub trait HitTester: Send + Sync {
    fn hit_test(&self, x: u32, y: u32) -> f32;
}

impl HitTester for RenderHandle {
    fn hit_test(&self, x: u32, y: u32) -> f32 {
        self.request_hit_test(x, y)
    }
}

/// An object that can be drawn with a hit identifier and receive
/// logical events.
pub trait InteractiveTarget: Send + Sync {
    /// Called whenever the listener partition is recomputed. The
    /// target renders itself with this identifier in the hit-test
    /// pass.
    fn set_hit_id(&self, id: f32);
}

/// Stable arena index of a registered target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetId(pub(crate) usize);

struct Drag {
    // Strong reference: the dragged object outlives its table entry.
    _target: Arc<dyn InteractiveTarget>,
    bounds: Option<Rect>,
}

#[derive(Default)]
struct Table {
    slots: Vec<Option<Arc<dyn InteractiveTarget>>>,
    order: Vec<TargetId>,
    last_down: Option<TargetId>,
    drag: Option<Drag>,
    key_hook: Option<Box<dyn FnMut(u32) + Send>>,
}

impl Table {
    /// Reassign every listed target its position in the uniform
    /// partition `k/n` for `k` in `1..=n`.
    fn recompute_ids(&self) {
        let count = self.order.len();
        for (index, id) in self.order.iter().enumerate() {
            if let Some(target) = self.slots.get(id.0).and_then(Option::as_ref) {
                target.set_hit_id((index + 1) as f32 / count as f32);
            }
        }
    }

    /// Map a sampled identifier back to the listed target it encodes.
    fn resolve(&self, hit_id: f32) -> Option<TargetId> {
        let count = self.order.len();
        if count == 0 || hit_id <= 0.0 {
            return None;
        }
        let position = (hit_id * count as f32).round() as usize;
        if position == 0 || position > count {
            return None;
        }
        Some(self.order[position - 1])
    }
}

/// Routes raw pointer input to interactive targets.
pub struct InputDispatcher {
    hit: Arc<dyn HitTester>,
    sink: Arc<dyn EventSink>,
    table: Mutex<Table>,
}

impl InputDispatcher {
    pub fn new(hit: Arc<dyn HitTester>, sink: Arc<dyn EventSink>) -> Self {
        Self {
            hit,
            sink,
            table: Mutex::new(Table::default()),
        }
    }

    /// Add a target to the listener table and hand out its arena id.
    ///
    /// # Panics
    ///
    /// Registering the same object twice is a programming error.
    pub fn register(&self, target: Arc<dyn InteractiveTarget>) -> TargetId {
        let mut table = self.table.lock();
        assert!(
            !table
                .slots
                .iter()
                .flatten()
                .any(|existing| Arc::ptr_eq(existing, &target)),
            "target registered twice"
        );
        let id = match table.slots.iter().position(Option::is_none) {
            Some(free) => {
                table.slots[free] = Some(target);
                TargetId(free)
            }
            None => {
                table.slots.push(Some(target));
                TargetId(table.slots.len() - 1)
            }
        };
        table.order.push(id);
        table.recompute_ids();
        trace!(id = id.0, listeners = table.order.len(), "target registered");
        id
    }

    /// Remove a target. The remaining identifiers close ranks into a
    /// fresh uniform partition. Unknown ids are ignored.
    pub fn unregister(&self, id: TargetId) -> bool {
        let mut table = self.table.lock();
        match table.slots.get_mut(id.0).and_then(|slot| slot.take()) {
            Some(_) => {
                table.order.retain(|other| *other != id);
                if table.last_down == Some(id) {
                    table.last_down = None;
                }
                table.recompute_ids();
                trace!(id = id.0, listeners = table.order.len(), "target unregistered");
                true
            }
            None => false,
        }
    }

    pub fn listener_count(&self) -> usize {
        self.table.lock().order.len()
    }

    /// Handle one raw event from the platform backend.
    pub fn handle(&self, raw: RawInput) {
        match raw {
            RawInput::PointerDown { x, y } => self.pointer_down(x, y),
            RawInput::PointerUp { x, y } => self.pointer_up(x, y),
            RawInput::KeyDown { code } => self.key_down(code),
        }
    }

    /// Resolve the target under the pointer and post `MouseDown`,
    /// remembering it for click correlation.
    pub fn pointer_down(&self, x: u32, y: u32) {
        let hit_id = self.hit.hit_test(x, y);
        if hit_id == NO_TARGET {
            return;
        }
        let target = {
            let mut table = self.table.lock();
            let target = table.resolve(hit_id);
            table.last_down = target;
            target
        };
        if let Some(target) = target {
            self.sink.post(target, EventKind::MouseDown);
        }
    }

    /// Resolve the target under the pointer and post `MouseUp`, plus a
    /// `Click` when it matches the remembered pointer-down target. The
    /// remembered target is cleared either way.
    pub fn pointer_up(&self, x: u32, y: u32) {
        let hit_id = self.hit.hit_test(x, y);
        let (target, clicked) = {
            let mut table = self.table.lock();
            let target = if hit_id == NO_TARGET {
                None
            } else {
                table.resolve(hit_id)
            };
            let clicked = target.is_some() && target == table.last_down;
            table.last_down = None;
            (target, clicked)
        };
        if let Some(target) = target {
            self.sink.post(target, EventKind::MouseUp);
            if clicked {
                self.sink.post(target, EventKind::Click);
            }
        }
    }

    fn key_down(&self, code: u32) {
        let mut table = self.table.lock();
        if let Some(hook) = table.key_hook.as_mut() {
            hook(code);
        }
    }

    /// Install the handler raw key codes are routed to.
    pub fn set_key_hook(&self, hook: impl FnMut(u32) + Send + 'static) {
        self.table.lock().key_hook = Some(Box::new(hook));
    }

    /// Hold a target for dragging. At most one target is dragged at a
    /// time; enabling a new drag releases the previous one first.
    pub fn enable_drag(&self, target: Arc<dyn InteractiveTarget>, bounds: Option<Rect>) {
        let mut table = self.table.lock();
        if table.drag.is_some() {
            debug!("replacing active drag");
        }
        table.drag = Some(Drag {
            _target: target,
            bounds,
        });
    }

    /// Release the dragged target, if any.
    pub fn disable_drag(&self) {
        self.table.lock().drag = None;
    }

    pub fn is_dragging(&self) -> bool {
        self.table.lock().drag.is_some()
    }

    /// Constrain a pointer position to the active drag's bounds.
    pub fn clamp_to_drag_bounds(&self, point: Vec2) -> Vec2 {
        let table = self.table.lock();
        match table.drag.as_ref().and_then(|drag| drag.bounds) {
            Some(bounds) => bounds.clamp_point(point),
            None => point,
        }
    }
}
