//! Damage-propagation graph for post-effects.
//!
//! A surface owns at most one [`EffectTree`]. Each node is either a leaf
//! (one effect, e.g. a blur overlay) or a pair combining exactly two
//! children. Composition is append-only: attaching an effect to a surface
//! that already has one wraps the existing root in a pair. There is no
//! single-node removal - discard the whole tree to detach.
//!
//! # Pair algebra
//!
//! - `is_dirty(pair) == is_dirty(left) && is_dirty(right)`
//! - damage skips children that are already dirty (their caches will be
//!   recomputed anyway), bounding propagation cost once a subtree is
//!   fully stale
//! - `clip_exclude` always reaches both children: both footprints must be
//!   excluded from the source paint

use std::cell::RefCell;
use std::rc::Rc;

use crate::canvas::Canvas;
use crate::types::Damage;

/// A node in the damage-propagation graph.
///
/// Implemented by blur overlays; a surface talks to its effects only
/// through this trait.
pub trait PostEffect {
    /// True once the effect's cached output is stale and not yet
    /// recomputed.
    fn is_dirty(&self) -> bool;

    /// Receive an invalidation notification.
    ///
    /// Returns whether the notification was absorbed (the damaged region
    /// intersects this effect, or the damage covers the whole surface).
    fn on_invalidated(&mut self, damage: Damage) -> bool;

    /// Avoid rendering the part of the source affected by this effect.
    /// Called by the source surface right before it paints its own content.
    fn clip_exclude(&self, canvas: &mut Canvas<'_>);
}

/// Shared handle to an effect: the host keeps one to drive setters, the
/// surface's tree keeps another for damage and clipping. Single-threaded.
pub type EffectHandle = Rc<RefCell<dyn PostEffect>>;

enum EffectNode {
    Leaf(EffectHandle),
    Pair(Box<EffectNode>, Box<EffectNode>),
}

impl EffectNode {
    fn is_dirty(&self) -> bool {
        match self {
            EffectNode::Leaf(effect) => effect.borrow().is_dirty(),
            EffectNode::Pair(left, right) => left.is_dirty() && right.is_dirty(),
        }
    }

    fn on_invalidated(&mut self, damage: Damage) -> bool {
        match self {
            EffectNode::Leaf(effect) => effect.borrow_mut().on_invalidated(damage),
            EffectNode::Pair(left, right) => {
                // A dirty child absorbs vacuously; no point re-notifying.
                let l = left.is_dirty() || left.on_invalidated(damage);
                let r = right.is_dirty() || right.on_invalidated(damage);
                l || r
            }
        }
    }

    fn clip_exclude(&self, canvas: &mut Canvas<'_>) {
        match self {
            EffectNode::Leaf(effect) => effect.borrow().clip_exclude(canvas),
            EffectNode::Pair(left, right) => {
                left.clip_exclude(canvas);
                right.clip_exclude(canvas);
            }
        }
    }
}

/// The post-effect slot a surface owns.
#[derive(Default)]
pub struct EffectTree {
    root: Option<EffectNode>,
}

impl EffectTree {
    pub fn new() -> Self {
        Self { root: None }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Attach an effect. If the tree already has a root, the root is
    /// wrapped in a pair with the new effect on the right.
    pub fn attach(&mut self, effect: EffectHandle) {
        self.root = Some(match self.root.take() {
            None => EffectNode::Leaf(effect),
            Some(existing) => {
                EffectNode::Pair(Box::new(existing), Box::new(EffectNode::Leaf(effect)))
            }
        });
    }

    /// Discard every attached effect.
    pub fn clear(&mut self) {
        self.root = None;
    }

    /// Whether every attached effect is stale. An empty tree is clean.
    pub fn is_dirty(&self) -> bool {
        self.root.as_ref().is_some_and(|n| n.is_dirty())
    }

    /// Propagate damage to the attached effects. Returns whether any
    /// effect absorbed it; an empty tree absorbs nothing.
    pub fn on_invalidated(&mut self, damage: Damage) -> bool {
        self.root
            .as_mut()
            .is_some_and(|n| n.on_invalidated(damage))
    }

    /// Exclude every attached effect's footprint from `canvas`.
    pub fn clip_exclude(&self, canvas: &mut Canvas<'_>) {
        if let Some(root) = &self.root {
            root.clip_exclude(canvas);
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Rect;

    /// Recording stub: tracks dirtiness and every notification received.
    struct StubEffect {
        dirty: bool,
        bounds: Rect,
        notified: u32,
    }

    impl StubEffect {
        fn handle(dirty: bool, bounds: Rect) -> Rc<RefCell<StubEffect>> {
            Rc::new(RefCell::new(StubEffect {
                dirty,
                bounds,
                notified: 0,
            }))
        }
    }

    impl PostEffect for StubEffect {
        fn is_dirty(&self) -> bool {
            self.dirty
        }

        fn on_invalidated(&mut self, damage: Damage) -> bool {
            self.notified += 1;
            let absorbed = match damage {
                Damage::Whole => true,
                Damage::Region(r) => r.intersects(&self.bounds),
            };
            if absorbed {
                self.dirty = true;
            }
            absorbed
        }

        fn clip_exclude(&self, _canvas: &mut Canvas<'_>) {}
    }

    const BOUNDS: Rect = Rect::new(0, 0, 100, 100);

    #[test]
    fn test_leaf_absorbs_intersecting_damage() {
        let effect = StubEffect::handle(false, BOUNDS);
        let mut tree = EffectTree::new();
        tree.attach(effect.clone());

        assert!(!tree.is_dirty());
        assert!(tree.on_invalidated(Damage::Region(Rect::new(50, 50, 60, 60))));
        assert!(tree.is_dirty());
        assert_eq!(effect.borrow().notified, 1);
    }

    #[test]
    fn test_leaf_ignores_disjoint_damage() {
        let effect = StubEffect::handle(false, BOUNDS);
        let mut tree = EffectTree::new();
        tree.attach(effect.clone());

        assert!(!tree.on_invalidated(Damage::Region(Rect::new(200, 200, 210, 210))));
        assert!(!tree.is_dirty());
        // Whole-surface damage always absorbs.
        assert!(tree.on_invalidated(Damage::Whole));
        assert!(tree.is_dirty());
    }

    #[test]
    fn test_pair_dirty_is_conjunction() {
        for (a, b) in [(false, false), (false, true), (true, false), (true, true)] {
            let left = StubEffect::handle(a, BOUNDS);
            let right = StubEffect::handle(b, BOUNDS);
            let mut tree = EffectTree::new();
            tree.attach(left);
            tree.attach(right);
            assert_eq!(tree.is_dirty(), a && b, "a={a} b={b}");
        }
    }

    #[test]
    fn test_pair_skips_already_dirty_child() {
        let left = StubEffect::handle(true, BOUNDS);
        let right = StubEffect::handle(false, BOUNDS);
        let mut tree = EffectTree::new();
        tree.attach(left.clone());
        tree.attach(right.clone());

        assert!(tree.on_invalidated(Damage::Whole));
        // The dirty left child must not have its handler re-invoked.
        assert_eq!(left.borrow().notified, 0);
        assert_eq!(right.borrow().notified, 1);
        assert!(tree.is_dirty());
    }

    #[test]
    fn test_attach_wraps_root_append_only() {
        let a = StubEffect::handle(false, BOUNDS);
        let b = StubEffect::handle(false, Rect::new(100, 0, 200, 100));
        let c = StubEffect::handle(false, Rect::new(0, 100, 100, 200));
        let mut tree = EffectTree::new();
        tree.attach(a.clone());
        tree.attach(b.clone());
        tree.attach(c.clone());

        // Damage hitting only c still reaches the deepest leaf.
        assert!(tree.on_invalidated(Damage::Region(Rect::new(10, 110, 20, 120))));
        assert!(c.borrow().dirty);
        assert!(!a.borrow().dirty);
        assert!(!b.borrow().dirty);
    }

    #[test]
    fn test_clear_discards_everything() {
        let a = StubEffect::handle(true, BOUNDS);
        let mut tree = EffectTree::new();
        tree.attach(a);
        assert!(!tree.is_empty());
        tree.clear();
        assert!(tree.is_empty());
        assert!(!tree.is_dirty());
        assert!(!tree.on_invalidated(Damage::Whole));
    }
}
