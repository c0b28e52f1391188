//! Record ⇄ object bridge.
//!
//! A type opts in by implementing [`Bridgeable`], which lists its members on a
//! [`DescriptorBuilder`]: instance properties (getter and/or setter over
//! `&T`) and static fields (getter and/or setter over shared state). The
//! resulting [`TypeDescriptor`] is built once per type and cached.
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::RwLock;

use once_cell::sync::Lazy;

use crate::coerce::{short_type_name, Coerce, CoerceCtx};
use crate::diagnostics::Diagnostics;
use crate::error::{Cause, Error, ErrorKind, Result};
use crate::list::{AssocList, KeyCheck};
use crate::value::Value;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

pub trait Bridgeable: Any + Send + Sync + Sized {
    /// Registers members in declaration order.
    fn describe(members: &mut DescriptorBuilder<Self>);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    Property,
    StaticField,
}

type InstanceGet = Box<dyn Fn(&dyn Any) -> Option<Value> + Send + Sync>;
type InstanceSet = Box<dyn Fn(&mut dyn Any, &Value, &CoerceCtx<'_>) -> Result<()> + Send + Sync>;
type StaticGet = Box<dyn Fn() -> Value + Send + Sync>;
type StaticSet = Box<dyn Fn(&Value, &CoerceCtx<'_>) -> Result<()> + Send + Sync>;

enum Access {
    Instance {
        get: Option<InstanceGet>,
        set: Option<InstanceSet>,
    },
    Static {
        get: Option<StaticGet>,
        set: Option<StaticSet>,
    },
}

pub struct Member {
    name: String,
    declared_type: String,
    ignored: bool,
    owner: TypeId,
    owner_name: String,
    access: Access,
}

pub struct TypeDescriptor {
    type_id: TypeId,
    type_name: String,
    members: Vec<Member>,
}

pub struct DescriptorBuilder<T> {
    members: Vec<Member>,
    _owner: PhantomData<fn() -> T>,
}

// ————————————————————————————————————————————————————————————————————————————
// DESCRIPTORS
// ————————————————————————————————————————————————————————————————————————————

impl Member {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn declared_type(&self) -> &str {
        &self.declared_type
    }

    pub fn is_ignored(&self) -> bool {
        self.ignored
    }

    pub fn owner_name(&self) -> &str {
        &self.owner_name
    }

    pub fn kind(&self) -> MemberKind {
        match self.access {
            Access::Instance { .. } => MemberKind::Property,
            Access::Static { .. } => MemberKind::StaticField,
        }
    }

    pub fn is_readable(&self) -> bool {
        match &self.access {
            Access::Instance { get, .. } => get.is_some(),
            Access::Static { get, .. } => get.is_some(),
        }
    }

    pub fn is_writable(&self) -> bool {
        match &self.access {
            Access::Instance { set, .. } => set.is_some(),
            Access::Static { set, .. } => set.is_some(),
        }
    }
}

impl fmt::Debug for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Member")
            .field("name", &self.name)
            .field("declared_type", &self.declared_type)
            .field("kind", &self.kind())
            .field("ignored", &self.ignored)
            .field("readable", &self.is_readable())
            .field("writable", &self.is_writable())
            .finish()
    }
}

impl TypeDescriptor {
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn member(&self, name: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.name == name)
    }

    pub fn properties(&self) -> impl Iterator<Item = &Member> + '_ {
        self.members.iter().filter(|m| m.kind() == MemberKind::Property)
    }

    pub fn static_fields(&self) -> impl Iterator<Item = &Member> + '_ {
        self.members.iter().filter(|m| m.kind() == MemberKind::StaticField)
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("type_name", &self.type_name)
            .field("members", &self.members)
            .finish()
    }
}

impl<T: Bridgeable> DescriptorBuilder<T> {
    fn new() -> Self {
        Self {
            members: Vec::new(),
            _owner: PhantomData,
        }
    }

    fn push(&mut self, name: &str, declared_type: String, access: Access) -> &mut Self {
        self.members.push(Member {
            name: name.to_string(),
            declared_type,
            ignored: false,
            owner: TypeId::of::<T>(),
            owner_name: short_type_name(std::any::type_name::<T>()),
            access,
        });
        self
    }

    /// Readable and writable instance property.
    pub fn property<V, F>(
        &mut self,
        name: &str,
        get: impl Fn(&T) -> V + Send + Sync + 'static,
        set: impl Fn(&mut T, F) + Send + Sync + 'static,
    ) -> &mut Self
    where
        V: Into<Value>,
        F: Coerce,
    {
        let access = Access::Instance {
            get: Some(instance_getter(get)),
            set: Some(instance_setter::<T, F>(name, set)),
        };
        self.push(name, F::type_name(), access)
    }

    pub fn readonly<V>(&mut self, name: &str, get: impl Fn(&T) -> V + Send + Sync + 'static) -> &mut Self
    where
        V: Into<Value>,
    {
        let access = Access::Instance {
            get: Some(instance_getter(get)),
            set: None,
        };
        self.push(name, short_type_name(std::any::type_name::<V>()), access)
    }

    pub fn writeonly<F: Coerce>(
        &mut self,
        name: &str,
        set: impl Fn(&mut T, F) + Send + Sync + 'static,
    ) -> &mut Self {
        let access = Access::Instance {
            get: None,
            set: Some(instance_setter::<T, F>(name, set)),
        };
        self.push(name, F::type_name(), access)
    }

    /// Readable and writable static field.
    pub fn static_field<V, F>(
        &mut self,
        name: &str,
        get: impl Fn() -> V + Send + Sync + 'static,
        set: impl Fn(F) + Send + Sync + 'static,
    ) -> &mut Self
    where
        V: Into<Value>,
        F: Coerce,
    {
        let access = Access::Static {
            get: Some(Box::new(move || -> Value { get().into() })),
            set: Some(Box::new(move |value: &Value, ctx: &CoerceCtx<'_>| -> Result<()> {
                set(F::coerce_value(value, ctx)?);
                Ok(())
            })),
        };
        self.push(name, F::type_name(), access)
    }

    pub fn static_readonly<V>(&mut self, name: &str, get: impl Fn() -> V + Send + Sync + 'static) -> &mut Self
    where
        V: Into<Value>,
    {
        let access = Access::Static {
            get: Some(Box::new(move || -> Value { get().into() })),
            set: None,
        };
        self.push(name, short_type_name(std::any::type_name::<V>()), access)
    }

    /// Excludes the member registered last from every bridge operation.
    pub fn ignore(&mut self) -> &mut Self {
        if let Some(last) = self.members.last_mut() {
            last.ignored = true;
        }
        self
    }

    fn finish(self) -> TypeDescriptor {
        TypeDescriptor {
            type_id: TypeId::of::<T>(),
            type_name: short_type_name(std::any::type_name::<T>()),
            members: self.members,
        }
    }
}

fn instance_getter<T: Any, V: Into<Value>>(
    get: impl Fn(&T) -> V + Send + Sync + 'static,
) -> InstanceGet {
    Box::new(move |target: &dyn Any| -> Option<Value> {
        target.downcast_ref::<T>().map(|t| get(t).into())
    })
}

fn instance_setter<T: Any, F: Coerce>(
    name: &str,
    set: impl Fn(&mut T, F) + Send + Sync + 'static,
) -> InstanceSet {
    let name = name.to_string();
    Box::new(move |target: &mut dyn Any, value: &Value, ctx: &CoerceCtx<'_>| -> Result<()> {
        let converted = F::coerce_value(value, ctx)?;
        match target.downcast_mut::<T>() {
            Some(t) => {
                set(t, converted);
                Ok(())
            }
            None => Err(ErrorKind::PropertyClassMismatch {
                member: name.clone(),
                expected: short_type_name(std::any::type_name::<T>()),
                actual: "unknown".to_string(),
            }
            .into()),
        }
    })
}

static DESCRIPTORS: Lazy<RwLock<HashMap<TypeId, &'static TypeDescriptor>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// Descriptor table for `T`, built on first use.
pub fn descriptor<T: Bridgeable>() -> &'static TypeDescriptor {
    let id = TypeId::of::<T>();
    {
        let cache = DESCRIPTORS.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(found) = cache.get(&id) {
            return *found;
        }
    }
    // Built outside the lock: `describe` may ask for other descriptors.
    let mut builder = DescriptorBuilder::<T>::new();
    T::describe(&mut builder);
    let built = builder.finish();
    tracing::debug!(type_name = %built.type_name, members = built.members.len(), "descriptor built");

    let mut cache = DESCRIPTORS.write().unwrap_or_else(|poisoned| poisoned.into_inner());
    *cache.entry(id).or_insert_with(|| &*Box::leak(Box::new(built)))
}

// ————————————————————————————————————————————————————————————————————————————
// BRIDGE OPERATIONS
// ————————————————————————————————————————————————————————————————————————————

/// Assigns every settable, non-ignored property of `target` from `source`.
pub fn to_object<T: Bridgeable>(target: &mut T, source: &AssocList, ignore_missing: bool) -> Result<()> {
    let ctx = CoerceCtx {
        ignore_missing,
        diagnostics: source.diagnostics(),
    };
    to_object_in(target, source, &ctx)
}

/// `T::default()` populated from `source`.
pub fn to_new_object<T: Bridgeable + Default>(source: &AssocList, ignore_missing: bool) -> Result<T> {
    let mut target = T::default();
    to_object(&mut target, source, ignore_missing)?;
    Ok(target)
}

fn to_object_in<T: Bridgeable>(target: &mut T, source: &AssocList, ctx: &CoerceCtx<'_>) -> Result<()> {
    let table = descriptor::<T>();
    for member in table.properties().filter(|m| !m.ignored && m.is_writable()) {
        match source.get(&member.name) {
            Some(value) => set_member_in(target, member, value, ctx)?,
            None if ctx.ignore_missing => {
                tracing::debug!(type_name = %table.type_name, property = %member.name, "absent, skipped");
            }
            None => {
                return Err(ctx.diagnostics.fail(
                    "to_object",
                    &table.type_name,
                    Error::missing_property(&table.type_name, &member.name),
                ));
            }
        }
    }
    Ok(())
}

/// Reads every readable, non-ignored property of `source` into a new list.
pub fn from_object<T: Bridgeable>(source: &T) -> Result<AssocList> {
    let table = descriptor::<T>();
    let mut list = AssocList::new();
    for member in table.properties().filter(|m| !m.ignored) {
        let Access::Instance { get: Some(get), .. } = &member.access else {
            continue;
        };
        let value = get(source as &dyn Any).unwrap_or_default();
        list.add_checked(member.name.clone(), value, None, false, KeyCheck::SkipIdentifier)?;
    }
    Ok(list)
}

/// Assigns every settable, non-ignored static field of `T` from `source`.
pub fn to_static_fields<T: Bridgeable>(source: &AssocList, ignore_missing: bool) -> Result<()> {
    let ctx = CoerceCtx {
        ignore_missing,
        diagnostics: source.diagnostics(),
    };
    let table = descriptor::<T>();
    for member in table.static_fields().filter(|m| !m.ignored) {
        let Access::Static { set: Some(set), .. } = &member.access else {
            continue;
        };
        match source.get(&member.name) {
            Some(value) => set(value, &ctx)?,
            None if ignore_missing => {
                tracing::debug!(type_name = %table.type_name, field = %member.name, "absent, skipped");
            }
            None => {
                return Err(ctx.diagnostics.fail(
                    "to_static_fields",
                    &table.type_name,
                    Error::missing_property(&table.type_name, &member.name),
                ));
            }
        }
    }
    Ok(())
}

/// Reads every readable, non-ignored static field of `T` into a new list.
pub fn from_static_fields<T: Bridgeable>() -> Result<AssocList> {
    let table = descriptor::<T>();
    let mut list = AssocList::new();
    for member in table.static_fields().filter(|m| !m.ignored) {
        let Access::Static { get: Some(get), .. } = &member.access else {
            continue;
        };
        list.add_checked(member.name.clone(), get(), None, false, KeyCheck::SkipIdentifier)?;
    }
    Ok(list)
}

/// Reads one instance property through an explicit descriptor.
pub fn get_member<T: Bridgeable>(target: &T, member: &Member) -> Result<Value> {
    check_owner::<T>(member, &Diagnostics::none())?;
    match &member.access {
        Access::Instance { get: Some(get), .. } => Ok(get(target as &dyn Any).unwrap_or_default()),
        Access::Static { get: Some(get), .. } => Ok(get()),
        _ => Err(Error::invalid_argument("member", format!("`{}` is not readable", member.name))),
    }
}

/// Writes one instance property through an explicit descriptor.
pub fn set_member<T: Bridgeable>(
    target: &mut T,
    member: &Member,
    value: &Value,
    ignore_missing: bool,
) -> Result<()> {
    let diagnostics = Diagnostics::none();
    let ctx = CoerceCtx {
        ignore_missing,
        diagnostics: &diagnostics,
    };
    set_member_in(target, member, value, &ctx)
}

fn set_member_in<T: Bridgeable>(
    target: &mut T,
    member: &Member,
    value: &Value,
    ctx: &CoerceCtx<'_>,
) -> Result<()> {
    check_owner::<T>(member, ctx.diagnostics)?;
    match &member.access {
        Access::Instance { set: Some(set), .. } => set(target as &mut dyn Any, value, ctx),
        Access::Static { set: Some(set), .. } => set(value, ctx),
        _ => Err(ctx.diagnostics.fail(
            "set_member",
            &member.name,
            Error::invalid_argument("member", format!("`{}` is not writable", member.name)),
        )),
    }
}

fn check_owner<T: Any>(member: &Member, diagnostics: &Diagnostics) -> Result<()> {
    if member.owner == TypeId::of::<T>() {
        return Ok(());
    }
    Err(diagnostics.fail(
        "member",
        &member.name,
        ErrorKind::PropertyClassMismatch {
            member: member.name.clone(),
            expected: member.owner_name.clone(),
            actual: short_type_name(std::any::type_name::<T>()),
        }
        .into(),
    ))
}

/// [`Coerce::from_list`] body for record types.
pub fn record_from_list<T: Bridgeable + Default>(
    list: &AssocList,
    ctx: &CoerceCtx<'_>,
) -> Result<T, Cause> {
    let mut target = T::default();
    to_object_in(&mut target, list, ctx).map_err(Cause::source)?;
    Ok(target)
}

/// Implements [`Coerce`](crate::Coerce) for bridgeable records, so nested
/// lists convert into them.
#[macro_export]
macro_rules! impl_coerce_record {
    ($($t:ty),+ $(,)?) => {$(
        impl $crate::Coerce for $t {
            fn from_list(
                list: &$crate::AssocList,
                ctx: &$crate::CoerceCtx<'_>,
            ) -> ::std::option::Option<::std::result::Result<Self, $crate::Cause>> {
                ::std::option::Option::Some($crate::reflect::record_from_list::<Self>(list, ctx))
            }
        }
    )+};
}

impl AssocList {
    pub fn from_object<T: Bridgeable>(source: &T) -> Result<Self> {
        from_object(source)
    }

    pub fn from_static_fields<T: Bridgeable>() -> Result<Self> {
        from_static_fields::<T>()
    }

    pub fn to_object<T: Bridgeable>(&self, target: &mut T, ignore_missing: bool) -> Result<()> {
        to_object(target, self, ignore_missing)
    }

    pub fn to_static_fields<T: Bridgeable>(&self, ignore_missing: bool) -> Result<()> {
        to_static_fields::<T>(self, ignore_missing)
    }
}
