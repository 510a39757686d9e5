//! Status helper enums mapping to SMALLSERIAL/SMALLINT lookup tables.
//!
//! Each enum variant's discriminant matches the seed data order (1-based)
//! in the corresponding `*_statuses` database table. Job lifecycle states
//! live in `fieldline_core::job_state::JobState`, which follows the same
//! convention; this module re-exports it so repository code reads uniformly.

pub use fieldline_core::job_state::JobState;

/// Status ID type matching SMALLINT/SMALLSERIAL in the database.
pub type StatusId = i16;

macro_rules! define_status_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $val:expr ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[repr(i16)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $( $(#[$vmeta])* $variant = $val ),+
        }

        impl $name {
            /// Return the database status ID.
            pub fn id(self) -> StatusId {
                self as StatusId
            }
        }

        impl From<$name> for StatusId {
            fn from(value: $name) -> Self {
                value as StatusId
            }
        }
    };
}

define_status_enum! {
    /// Offer resolution status.
    OfferStatus {
        Pending = 1,
        Accepted = 2,
        Rejected = 3,
        Expired = 4,
        Superseded = 5,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offer_status_ids_match_seed_data() {
        assert_eq!(OfferStatus::Pending.id(), 1);
        assert_eq!(OfferStatus::Accepted.id(), 2);
        assert_eq!(OfferStatus::Rejected.id(), 3);
        assert_eq!(OfferStatus::Expired.id(), 4);
        assert_eq!(OfferStatus::Superseded.id(), 5);
    }

    #[test]
    fn job_state_ids_match_seed_data() {
        assert_eq!(JobState::PendingAssignment.id(), 1);
        assert_eq!(JobState::Cancelled.id(), 6);
    }

    #[test]
    fn status_into_status_id() {
        let id: StatusId = OfferStatus::Superseded.into();
        assert_eq!(id, 5);
    }
}
