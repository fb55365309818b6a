//! Shared component handles and the type-keyed component bag.
//!
//! Components are plain data. Systems hold them through [`Shared`] handles so
//! that one component (typically an entity's space) can be joined by several
//! systems, and so game code can keep a handle to mutate it between frames.
//!
//! A [`ComponentBag`] collects the handles for one entity. Passing the bag to
//! [`World::add_entity`](crate::world::World::add_entity) offers it to every
//! system, each of which takes what it needs.

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

// ---------------------------------------------------------------------------
// Shared
// ---------------------------------------------------------------------------

/// A shared, interior-mutable component handle.
pub type Shared<T> = Rc<RefCell<T>>;

/// Wrap a component value in a [`Shared`] handle.
#[inline]
pub fn shared<T>(value: T) -> Shared<T> {
    Rc::new(RefCell::new(value))
}

// ---------------------------------------------------------------------------
// ComponentBag
// ---------------------------------------------------------------------------

/// A set of component handles for one entity, keyed by component type.
///
/// At most one handle per type is kept; inserting a second one replaces the
/// first.
#[derive(Default)]
pub struct ComponentBag {
    handles: HashMap<TypeId, Box<dyn Any>>,
    names: Vec<&'static str>,
}

impl ComponentBag {
    /// An empty bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with<T: 'static>(mut self, handle: Shared<T>) -> Self {
        self.insert(handle);
        self
    }

    /// Builder-style insert of a plain value, wrapping it in a fresh handle.
    pub fn with_value<T: 'static>(self, value: T) -> Self {
        self.with(shared(value))
    }

    /// Insert a handle, returning the handle it replaced, if any.
    pub fn insert<T: 'static>(&mut self, handle: Shared<T>) -> Option<Shared<T>> {
        let previous = self.handles.insert(TypeId::of::<T>(), Box::new(handle));
        match previous {
            Some(old) => old.downcast::<Shared<T>>().ok().map(|boxed| *boxed),
            None => {
                self.names.push(std::any::type_name::<T>());
                None
            }
        }
    }

    /// A clone of the handle for `T`, if present.
    pub fn get<T: 'static>(&self) -> Option<Shared<T>> {
        self.handles
            .get(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast_ref::<Shared<T>>())
            .cloned()
    }

    /// Whether the bag holds a `T`.
    pub fn contains<T: 'static>(&self) -> bool {
        self.handles.contains_key(&TypeId::of::<T>())
    }

    /// Number of component kinds in the bag.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Whether the bag is empty.
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

impl fmt::Debug for ComponentBag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentBag")
            .field("kinds", &self.names)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Position {
        x: f32,
        y: f32,
    }

    #[derive(Debug, PartialEq)]
    struct Health(u32);

    #[test]
    fn get_returns_same_handle() {
        let pos = shared(Position { x: 1.0, y: 2.0 });
        let bag = ComponentBag::new().with(pos.clone());

        let fetched = bag.get::<Position>().unwrap();
        assert!(Rc::ptr_eq(&pos, &fetched));

        fetched.borrow_mut().x = 5.0;
        assert_eq!(pos.borrow().x, 5.0);
    }

    #[test]
    fn missing_kind_is_none() {
        let bag = ComponentBag::new().with_value(Health(3));
        assert!(bag.get::<Position>().is_none());
        assert!(!bag.contains::<Position>());
        assert!(bag.contains::<Health>());
    }

    #[test]
    fn insert_replaces_and_returns_previous() {
        let mut bag = ComponentBag::new();
        assert!(bag.insert(shared(Health(1))).is_none());
        let old = bag.insert(shared(Health(2))).unwrap();
        assert_eq!(*old.borrow(), Health(1));
        assert_eq!(*bag.get::<Health>().unwrap().borrow(), Health(2));
        assert_eq!(bag.len(), 1);
    }

    #[test]
    fn debug_lists_kinds() {
        let bag = ComponentBag::new().with_value(Health(1));
        let text = format!("{bag:?}");
        assert!(text.contains("Health"));
    }
}
