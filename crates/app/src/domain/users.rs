//! Users
//!
//! Accounts and the address book live outside this crate. Users and their
//! delivery addresses are referenced by UUID only.

use crate::uuids::TypedUuid;

/// User Record
#[derive(Debug)]
pub struct UserRecord;

/// User UUID
pub type UserUuid = TypedUuid<UserRecord>;

/// Address Record
#[derive(Debug)]
pub struct AddressRecord;

/// Address UUID
pub type AddressUuid = TypedUuid<AddressRecord>;
