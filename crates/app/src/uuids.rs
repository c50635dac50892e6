//! Typed Uuids
//!
//! `TypedUuid<T>` tags a UUID with the record it identifies so a product uuid
//! cannot be passed where an order uuid is expected. The marker is never
//! stored, so none of the trait impls below place bounds on `T`.

use std::{
    cmp::Ordering,
    fmt,
    hash::{Hash, Hasher},
    marker::PhantomData,
    str::FromStr,
};

use uuid::Uuid;

pub struct TypedUuid<T> {
    uuid: Uuid,
    marker: PhantomData<fn() -> T>,
}

impl<T> TypedUuid<T> {
    /// A fresh v7 uuid. These sort by creation time.
    #[must_use]
    pub fn new() -> Self {
        Self::from_uuid(Uuid::now_v7())
    }

    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self {
            uuid,
            marker: PhantomData,
        }
    }

    #[must_use]
    pub const fn into_uuid(self) -> Uuid {
        self.uuid
    }
}

impl<T> Default for TypedUuid<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for TypedUuid<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for TypedUuid<T> {}

impl<T> PartialEq for TypedUuid<T> {
    fn eq(&self, other: &Self) -> bool {
        self.uuid == other.uuid
    }
}

impl<T> Eq for TypedUuid<T> {}

impl<T> PartialOrd for TypedUuid<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// Row locks are taken in this order.
impl<T> Ord for TypedUuid<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.uuid.cmp(&other.uuid)
    }
}

impl<T> Hash for TypedUuid<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.uuid.hash(state);
    }
}

impl<T> fmt::Debug for TypedUuid<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.uuid, f)
    }
}

impl<T> fmt::Display for TypedUuid<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.uuid, f)
    }
}

impl<T> FromStr for TypedUuid<T> {
    type Err = uuid::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        value.parse().map(Self::from_uuid)
    }
}

impl<T> From<Uuid> for TypedUuid<T> {
    fn from(uuid: Uuid) -> Self {
        Self::from_uuid(uuid)
    }
}

impl<T> From<TypedUuid<T>> for Uuid {
    fn from(typed: TypedUuid<T>) -> Self {
        typed.into_uuid()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Widget;

    #[test]
    fn ordering_and_equality_follow_the_inner_uuid() {
        let low = TypedUuid::<Widget>::from_uuid(Uuid::from_u128(1));
        let high = TypedUuid::<Widget>::from_uuid(Uuid::from_u128(2));

        let mut sorted = vec![high, low];
        sorted.sort();

        assert_eq!(sorted, vec![low, high]);
        assert_eq!(low, TypedUuid::from(Uuid::from_u128(1)));
    }

    #[test]
    fn parses_and_displays_as_a_plain_uuid() -> Result<(), uuid::Error> {
        let text = "0190a6b2-5c3e-7d4f-8a1b-2c3d4e5f6a7b";

        let typed: TypedUuid<Widget> = text.parse()?;

        assert_eq!(typed.to_string(), text);
        assert!("not-a-uuid".parse::<TypedUuid<Widget>>().is_err());

        Ok(())
    }
}
