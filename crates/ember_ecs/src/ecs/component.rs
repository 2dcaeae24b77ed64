//! # Component Types
//!
//! Components are plain data records with no behavior. Each Rust type that
//! implements [`Component`] is assigned a dense index the first time a world
//! sees it; that index is its bit position in every composition.

use std::any::{type_name, TypeId};
use std::collections::HashMap;
use std::fmt;

use super::storage::{ComponentStore, Mapper};

/// Marker trait for ECS components.
///
/// Components must be:
/// - `Default`: transmuters and archetypes create components without a value
/// - `'static`: identified by `TypeId`
///
/// # Example
///
/// ```rust
/// use ember_ecs::Component;
///
/// #[derive(Clone, Copy, Debug, Default)]
/// struct Position {
///     x: f32,
///     y: f32,
/// }
///
/// impl Component for Position {}
///
/// /// Stays readable in `removed` callbacks until the round settles.
/// #[derive(Default)]
/// struct Health(u32);
///
/// impl Component for Health {
///     const DELAYED_REMOVAL: bool = true;
/// }
/// ```
pub trait Component: Default + 'static {
    /// Keeps removed instances readable until every subscription has been
    /// told about the removal.
    const DELAYED_REMOVAL: bool = false;
}

/// Type identity of a registered component.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ComponentType {
    index: usize,
    type_id: TypeId,
    name: &'static str,
    delayed_removal: bool,
}

impl ComponentType {
    /// Dense index of this type; its bit in compositions.
    #[inline]
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// `TypeId` of the Rust type.
    #[inline]
    #[must_use]
    pub const fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Full Rust type name.
    #[inline]
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Whether removal of this type is delayed until the round settles.
    #[inline]
    #[must_use]
    pub const fn is_delayed_removal(&self) -> bool {
        self.delayed_removal
    }
}

impl fmt::Debug for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComponentType[{}]({})", self.index, short_name(self.name))
    }
}

/// Unregistered reference to a component type.
///
/// Builders collect these and resolve them against a world later, which is
/// when the type is registered if it was not already.
#[derive(Clone, Copy)]
pub struct ComponentKey {
    type_id: TypeId,
    name: &'static str,
    delayed_removal: bool,
    new_store: fn(ComponentType, usize) -> Box<dyn ComponentStore>,
}

impl ComponentKey {
    /// Key for component type `C`.
    #[inline]
    #[must_use]
    pub fn of<C: Component>() -> Self {
        Self {
            type_id: TypeId::of::<C>(),
            name: type_name::<C>(),
            delayed_removal: C::DELAYED_REMOVAL,
            new_store: boxed_mapper::<C>,
        }
    }

    /// `TypeId` of the referenced type.
    #[inline]
    #[must_use]
    pub const fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Full Rust type name of the referenced type.
    #[inline]
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) const fn delayed_removal(&self) -> bool {
        self.delayed_removal
    }

    /// Builds an empty mapper for the referenced type.
    pub(crate) fn new_store(&self, ty: ComponentType, capacity: usize) -> Box<dyn ComponentStore> {
        (self.new_store)(ty, capacity)
    }
}

impl PartialEq for ComponentKey {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for ComponentKey {}

impl fmt::Debug for ComponentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(short_name(self.name))
    }
}

/// Assigns dense indices to component types, in first-use order.
#[derive(Debug, Default)]
pub struct ComponentTypeFactory {
    types: Vec<ComponentType>,
    by_type_id: HashMap<TypeId, usize>,
}

impl ComponentTypeFactory {
    /// Creates an empty factory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up an already registered type.
    #[must_use]
    pub fn get(&self, type_id: TypeId) -> Option<ComponentType> {
        self.by_type_id.get(&type_id).map(|&index| self.types[index])
    }

    /// Resolves a dense index back to its type.
    #[must_use]
    pub fn type_at(&self, index: usize) -> Option<ComponentType> {
        self.types.get(index).copied()
    }

    /// Returns every registered type, ordered by index.
    #[must_use]
    pub fn types(&self) -> &[ComponentType] {
        &self.types
    }

    /// Number of registered types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Returns `true` if no type has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Returns the type for `key`, assigning the next index if it is new.
    ///
    /// The second value reports whether the type was newly registered.
    pub(crate) fn get_or_register(
        &mut self,
        key: ComponentKey,
        always_delay_removal: bool,
    ) -> (ComponentType, bool) {
        if let Some(ty) = self.get(key.type_id()) {
            return (ty, false);
        }

        let ty = ComponentType {
            index: self.types.len(),
            type_id: key.type_id(),
            name: key.name(),
            delayed_removal: key.delayed_removal() || always_delay_removal,
        };
        self.by_type_id.insert(ty.type_id, ty.index);
        self.types.push(ty);
        (ty, true)
    }
}

fn boxed_mapper<C: Component>(ty: ComponentType, capacity: usize) -> Box<dyn ComponentStore> {
    Box::new(Mapper::<C>::new(ty, capacity))
}

/// Strips the module path from a type name.
fn short_name(name: &str) -> &str {
    let base = name.split('<').next().unwrap_or(name);
    base.rsplit("::").next().unwrap_or(base)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Position;
    impl Component for Position {}

    #[derive(Default)]
    struct Corpse;
    impl Component for Corpse {
        const DELAYED_REMOVAL: bool = true;
    }

    #[test]
    fn test_indices_follow_first_use() {
        let mut factory = ComponentTypeFactory::new();
        let (corpse, new_corpse) = factory.get_or_register(ComponentKey::of::<Corpse>(), false);
        let (position, new_position) =
            factory.get_or_register(ComponentKey::of::<Position>(), false);
        let (again, new_again) = factory.get_or_register(ComponentKey::of::<Corpse>(), false);

        assert!(new_corpse && new_position && !new_again);
        assert_eq!(corpse.index(), 0);
        assert_eq!(position.index(), 1);
        assert_eq!(again, corpse);
        assert_eq!(factory.type_at(1), Some(position));
        assert_eq!(factory.len(), 2);
    }

    #[test]
    fn test_delayed_removal_flag() {
        let mut factory = ComponentTypeFactory::new();
        let (corpse, _) = factory.get_or_register(ComponentKey::of::<Corpse>(), false);
        let (position, _) = factory.get_or_register(ComponentKey::of::<Position>(), false);
        assert!(corpse.is_delayed_removal());
        assert!(!position.is_delayed_removal());

        let mut always = ComponentTypeFactory::new();
        let (position, _) = always.get_or_register(ComponentKey::of::<Position>(), true);
        assert!(position.is_delayed_removal());
    }

    #[test]
    fn test_debug_uses_short_name() {
        assert_eq!(format!("{:?}", ComponentKey::of::<Position>()), "Position");
    }
}
