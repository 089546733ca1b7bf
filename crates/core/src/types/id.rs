//! Entity IDs.
//!
//! Every row key handed out by the stores gets its own wrapper, so a
//! `RoleId` cannot be passed where a `UserId` is expected.

/// Define one or more `i32` ID wrappers.
///
/// Each wrapper serializes as a bare integer and, with the `postgres`
/// feature, binds and decodes as `INTEGER`.
///
/// ```rust
/// # use ticketdesk_core::define_id;
/// define_id!(AccountId, GroupId);
///
/// let account = AccountId::new(1);
/// assert_eq!(account.get(), 1);
/// // let _: AccountId = GroupId::new(1); // mismatched types
/// ```
#[macro_export]
macro_rules! define_id {
    ($($name:ident),+ $(,)?) => {$(
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        #[cfg_attr(feature = "postgres", derive(::sqlx::Type), sqlx(transparent))]
        pub struct $name(i32);

        impl $name {
            #[must_use]
            pub const fn new(id: i32) -> Self {
                Self(id)
            }

            #[must_use]
            pub const fn get(self) -> i32 {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                ::core::fmt::Display::fmt(&self.0, f)
            }
        }
    )+};
}

define_id!(UserId, RoleId, TicketId);
