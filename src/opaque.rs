use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

type JsonRender = fn(&(dyn Any + Send + Sync)) -> Option<serde_json::Result<serde_json::Value>>;

/// Shared, type-erased handle to an arbitrary object.
///
/// Cloning shares the object. Two handles are equal only when they point at
/// the same allocation.
#[derive(Clone)]
pub struct Opaque {
    type_id: TypeId,
    type_name: &'static str,
    value: Arc<dyn Any + Send + Sync>,
    render: Option<JsonRender>,
}

impl Opaque {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            value: Arc::new(value),
            render: None,
        }
    }

    /// Like [`Opaque::new`], but the handle can also be rendered as JSON.
    pub fn serializable<T>(value: T) -> Self
    where
        T: Any + Send + Sync + serde::Serialize,
    {
        fn render<T: Any + serde::Serialize>(
            value: &(dyn Any + Send + Sync),
        ) -> Option<serde_json::Result<serde_json::Value>> {
            value.downcast_ref::<T>().map(serde_json::to_value)
        }
        Self {
            render: Some(render::<T>),
            ..Self::new(value)
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn is_type<T: 'static>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }

    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.value, &other.value)
    }

    /// `None` when the handle was built without a serializer.
    pub fn to_json(&self) -> Option<serde_json::Result<serde_json::Value>> {
        self.render.and_then(|render| render(self.value.as_ref()))
    }
}

impl PartialEq for Opaque {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for Opaque {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Opaque<{}>", self.type_name)
    }
}
