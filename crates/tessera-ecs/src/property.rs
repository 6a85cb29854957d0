//! Property type tokens, erased property values and the property registry.
//!
//! Every property kind is identified by a [`PropertyType`] token. Queries and
//! triggers carry tokens; the [`PropertyRegistry`] owned by the
//! [`World`](crate::world::World) assigns each token a dense
//! [`PropertyTypeId`] that indexes the per-type chunk storage.

use std::any::{Any, TypeId};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Serialize, Serializer};

use crate::chunk::{AnyChunk, Chunk};

// ---------------------------------------------------------------------------
// Property
// ---------------------------------------------------------------------------

/// A value type that can be attached to an actor.
///
/// Blanket-implemented for every `'static + Clone + Default + Debug` type, so
/// plain structs (including zero-sized marker structs) work out of the box.
pub trait Property: Any + Clone + Default + fmt::Debug {}

impl<T> Property for T where T: Any + Clone + Default + fmt::Debug {}

// ---------------------------------------------------------------------------
// PropertyType
// ---------------------------------------------------------------------------

/// Stable type token for a property kind.
///
/// Equality, hashing and ordering only consider the Rust `TypeId`; the name
/// is carried for logs and history records.
#[derive(Clone, Copy)]
pub struct PropertyType {
    id: TypeId,
    name: &'static str,
}

impl PropertyType {
    /// The token for property type `T`.
    #[inline]
    pub fn of<T: Property>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// The underlying Rust `TypeId`.
    #[inline]
    pub fn type_id(self) -> TypeId {
        self.id
    }

    /// Fully qualified type name.
    #[inline]
    pub fn name(self) -> &'static str {
        self.name
    }

    /// Type name without its module path (`Health` instead of `game::Health`).
    pub fn short_name(self) -> &'static str {
        let base = self.name.split('<').next().unwrap_or(self.name);
        match base.rfind("::") {
            Some(pos) => &self.name[pos + 2..],
            None => self.name,
        }
    }
}

impl PartialEq for PropertyType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for PropertyType {}

impl Hash for PropertyType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl PartialOrd for PropertyType {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PropertyType {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}

impl fmt::Debug for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PropertyType({})", self.short_name())
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

impl Serialize for PropertyType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name)
    }
}

// ---------------------------------------------------------------------------
// PropertyValue -- erased boxed property
// ---------------------------------------------------------------------------

/// A boxed property value whose concrete type is only known at runtime.
///
/// This is the currency of the erased mutation surface
/// ([`World::restore_prop_from_object`](crate::world::World::restore_prop_from_object)
/// and friends). The value knows how to build an empty chunk for its own
/// type, so erased insertion never needs runtime type construction.
pub trait PropertyValue: Any + fmt::Debug {
    /// The token of the concrete type inside the box.
    fn property_type(&self) -> PropertyType;

    /// Clone into a fresh box.
    fn clone_value(&self) -> Box<dyn PropertyValue>;

    /// Borrow as `Any` for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Convert the box into `Box<dyn Any>` for by-value downcasting.
    fn into_any(self: Box<Self>) -> Box<dyn Any>;

    /// Create an empty chunk able to store values of this type.
    fn new_chunk(&self, capacity: usize) -> Box<dyn AnyChunk>;
}

impl<T: Property> PropertyValue for T {
    fn property_type(&self) -> PropertyType {
        PropertyType::of::<T>()
    }

    fn clone_value(&self) -> Box<dyn PropertyValue> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }

    fn new_chunk(&self, capacity: usize) -> Box<dyn AnyChunk> {
        Box::new(Chunk::<T>::with_capacity(capacity))
    }
}

impl Clone for Box<dyn PropertyValue> {
    fn clone(&self) -> Self {
        self.clone_value()
    }
}

impl dyn PropertyValue {
    /// Downcast a borrowed erased value.
    pub fn downcast_ref<T: Property>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }
}

// ---------------------------------------------------------------------------
// PropertyTypeId
// ---------------------------------------------------------------------------

/// Dense index assigned to a property type at registration.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PropertyTypeId(pub(crate) u32);

impl PropertyTypeId {
    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for PropertyTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PropertyTypeId({})", self.0)
    }
}

// ---------------------------------------------------------------------------
// PropertyInfo
// ---------------------------------------------------------------------------

/// Metadata about a registered property type.
#[derive(Debug, Clone)]
pub struct PropertyInfo {
    /// Dense id assigned at registration time.
    pub id: PropertyTypeId,
    /// The type token.
    pub ty: PropertyType,
    /// Fully qualified type name.
    pub name: &'static str,
    /// `std::mem::size_of` of the value type.
    pub size: usize,
}

// ---------------------------------------------------------------------------
// PropertyRegistry
// ---------------------------------------------------------------------------

/// Registry mapping property type tokens to [`PropertyTypeId`]s.
///
/// Registration is idempotent: registering a type twice returns the id handed
/// out the first time.
#[derive(Debug, Default)]
pub struct PropertyRegistry {
    by_type: HashMap<PropertyType, PropertyTypeId>,
    by_name: HashMap<&'static str, PropertyTypeId>,
    infos: Vec<PropertyInfo>,
}

impl PropertyRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register property type `T`.
    pub fn register<T: Property>(&mut self) -> PropertyTypeId {
        self.register_type(PropertyType::of::<T>(), std::mem::size_of::<T>())
    }

    pub(crate) fn register_type(&mut self, ty: PropertyType, size: usize) -> PropertyTypeId {
        if let Some(&existing) = self.by_type.get(&ty) {
            return existing;
        }
        let id = PropertyTypeId(self.infos.len() as u32);
        self.infos.push(PropertyInfo {
            id,
            ty,
            name: ty.name(),
            size,
        });
        self.by_type.insert(ty, id);
        self.by_name.insert(ty.name(), id);
        tracing::debug!(property = %ty, id = id.0, "registered property type");
        id
    }

    /// Look up the id of a type token.
    pub fn lookup(&self, ty: PropertyType) -> Option<PropertyTypeId> {
        self.by_type.get(&ty).copied()
    }

    /// Look up a property type by its fully qualified type name.
    pub fn lookup_by_name(&self, name: &str) -> Option<PropertyTypeId> {
        self.by_name.get(name).copied()
    }

    /// Metadata for a registered id.
    pub fn get_info(&self, id: PropertyTypeId) -> Option<&PropertyInfo> {
        self.infos.get(id.index())
    }

    /// Number of registered property types.
    pub fn len(&self) -> usize {
        self.infos.len()
    }

    /// Whether nothing has been registered yet.
    pub fn is_empty(&self) -> bool {
        self.infos.is_empty()
    }

    /// Names of all registered property types, sorted.
    pub fn registered_names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.by_name.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Pos {
        x: f32,
        y: f32,
    }

    #[derive(Debug, Clone, Default)]
    struct Marker;

    #[test]
    fn register_and_lookup() {
        let mut reg = PropertyRegistry::new();
        let id = reg.register::<Pos>();
        assert_eq!(reg.lookup(PropertyType::of::<Pos>()), Some(id));
        assert_eq!(reg.lookup_by_name(std::any::type_name::<Pos>()), Some(id));
    }

    #[test]
    fn same_type_same_id() {
        let mut reg = PropertyRegistry::new();
        let a = reg.register::<Pos>();
        let b = reg.register::<Pos>();
        assert_eq!(a, b);
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn different_types_different_ids() {
        let mut reg = PropertyRegistry::new();
        assert_ne!(reg.register::<Pos>(), reg.register::<Marker>());
        assert_eq!(reg.registered_names().len(), 2);
    }

    #[test]
    fn info_records_size() {
        let mut reg = PropertyRegistry::new();
        let id = reg.register::<Pos>();
        let info = reg.get_info(id).unwrap();
        assert_eq!(info.size, std::mem::size_of::<Pos>());
        assert_eq!(info.ty, PropertyType::of::<Pos>());
    }

    #[test]
    fn short_name_strips_module_path() {
        assert_eq!(PropertyType::of::<Pos>().short_name(), "Pos");
        assert_eq!(PropertyType::of::<Marker>().to_string(), "Marker");
    }

    #[test]
    fn erased_value_knows_its_type() {
        let value: Box<dyn PropertyValue> = Box::new(Pos { x: 1.0, y: 2.0 });
        assert_eq!(value.property_type(), PropertyType::of::<Pos>());
        let copy = value.clone();
        assert_eq!(copy.downcast_ref::<Pos>(), Some(&Pos { x: 1.0, y: 2.0 }));
        assert!(copy.downcast_ref::<Marker>().is_none());
    }
}
