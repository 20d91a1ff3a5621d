//! UUID-backed identifiers for directory, academic, and ledger records.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Error returned when an identifier string is not a UUID.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} must be a valid UUID")]
pub struct IdParseError {
    kind: &'static str,
}

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Generate a fresh random identifier.
            pub fn random() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wrap an existing UUID.
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Access the underlying UUID.
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl std::str::FromStr for $name {
            type Err = IdParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s.trim())
                    .map(Self)
                    .map_err(|_| IdParseError { kind: $kind })
            }
        }

        impl From<Uuid> for $name {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }
    };
}

uuid_id!(
    /// Identifier of an authenticated actor.
    PrincipalId,
    "principal id"
);
uuid_id!(
    /// Identifier of a student profile.
    StudentId,
    "student id"
);
uuid_id!(
    /// Identifier of a lecturer profile.
    LecturerId,
    "lecturer id"
);
uuid_id!(
    /// Identifier of a course offering.
    OfferingId,
    "offering id"
);
uuid_id!(
    /// Identifier of a course registration.
    RegistrationId,
    "registration id"
);
uuid_id!(
    /// Identifier of a grade record.
    GradeRecordId,
    "grade record id"
);
uuid_id!(
    /// Identifier of a fee structure.
    FeeStructureId,
    "fee structure id"
);
uuid_id!(
    /// Identifier of an invoice.
    InvoiceId,
    "invoice id"
);
uuid_id!(
    /// Identifier of a payment attempt.
    PaymentId,
    "payment id"
);

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn parses_and_displays_uuid() {
        let raw = "3fa85f64-5717-4562-b3fc-2c963f66afa6";
        let id: OfferingId = raw.parse().expect("valid uuid");
        assert_eq!(id.to_string(), raw);
    }

    #[rstest]
    fn parse_error_names_the_identifier_kind() {
        let err = "nope".parse::<StudentId>().expect_err("invalid uuid");
        assert_eq!(err.to_string(), "student id must be a valid UUID");
    }

    #[rstest]
    fn serialises_transparently() {
        let id = InvoiceId::from_uuid(Uuid::nil());
        let value = serde_json::to_value(id).expect("serialise id");
        assert_eq!(value, "00000000-0000-0000-0000-000000000000");
    }
}
