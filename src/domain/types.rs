//! Model type descriptors driving type-directed view lookup.

use std::{any::Any, iter::FusedIterator, sync::Arc};

/// A named node in an explicit model type hierarchy.
///
/// Names are fully qualified with `.` separators (`com.example.Person`). Every chain
/// ends at an implicit root type: a descriptor without a parent descends directly from
/// it, and the root itself never takes part in view lookup.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct TypeDescriptor {
    name: &'static str,
    parent: Option<&'static TypeDescriptor>,
}

impl TypeDescriptor {
    /// Declare a type that descends directly from the root.
    pub const fn new(name: &'static str) -> Self {
        Self { name, parent: None }
    }

    /// Declare a type extending `parent`.
    pub const fn extending(name: &'static str, parent: &'static TypeDescriptor) -> Self {
        Self {
            name,
            parent: Some(parent),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn parent(&self) -> Option<&'static TypeDescriptor> {
        self.parent
    }

    /// The qualified name with package separators turned into path separators.
    pub fn path_segment(&self) -> String {
        type_path(self.name)
    }

    /// Iterate from this type up through its ancestors, excluding the root.
    pub fn ancestors(&'static self) -> Ancestors {
        Ancestors { next: Some(self) }
    }
}

/// Path form of a qualified type name: `app.model.Person` becomes `app/model/Person`.
pub fn type_path(name: &str) -> String {
    name.replace('.', "/")
}

/// Iterator returned by [`TypeDescriptor::ancestors`].
#[derive(Debug, Clone)]
pub struct Ancestors {
    next: Option<&'static TypeDescriptor>,
}

impl Iterator for Ancestors {
    type Item = &'static TypeDescriptor;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.parent;
        Some(current)
    }
}

impl FusedIterator for Ancestors {}

/// Object-safe access to `Any` for model trait objects.
pub trait AsAny: Any + Send + Sync {
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any + Send + Sync> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A value that can be rendered through a type-directed view.
pub trait Model: AsAny {
    /// The runtime type of this value. Lookup starts here and walks up the parents.
    fn descriptor(&self) -> &'static TypeDescriptor;
}

/// Shared handle to a model, as stored in request attributes.
pub type ModelRef = Arc<dyn Model>;

impl dyn Model {
    /// Borrow the concrete model if it is a `T`.
    pub fn downcast_ref<T: Model>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    pub fn type_name(&self) -> &'static str {
        self.descriptor().name()
    }
}
