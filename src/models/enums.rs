use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

str_enum!(Role {
    Admin => "admin",
    Psychologist => "psychologist",
    Assistant => "assistant",
});

str_enum!(PatientStatus {
    Active => "active",
    Inactive => "inactive",
});

str_enum!(AppointmentStatus {
    Scheduled => "scheduled",
    Completed => "completed",
    Cancelled => "cancelled",
    NoShow => "no_show",
});

str_enum!(PaymentStatus {
    Pending => "pending",
    Paid => "paid",
    Waived => "waived",
});

str_enum!(PaymentMethod {
    Cash => "cash",
    Card => "card",
    Transfer => "transfer",
    Pix => "pix",
    Insurance => "insurance",
});

str_enum!(ConfidentialityLevel {
    Confidential => "confidential",
    Restricted => "restricted",
    Internal => "internal",
});

str_enum!(AuditOutcome {
    Success => "success",
    Failure => "failure",
    Denied => "denied",
});

impl Role {
    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn role_round_trips_through_str() {
        for role in [Role::Admin, Role::Psychologist, Role::Assistant] {
            assert_eq!(Role::from_str(role.as_str()).unwrap(), role);
        }
    }

    #[test]
    fn unknown_value_is_invalid_enum() {
        let err = AppointmentStatus::from_str("postponed").unwrap_err();
        assert!(matches!(err, DatabaseError::InvalidEnum { .. }));
    }

    #[test]
    fn serde_uses_snake_case_matching_as_str() {
        let json = serde_json::to_string(&AppointmentStatus::NoShow).unwrap();
        assert_eq!(json, "\"no_show\"");
        let parsed: PaymentMethod = serde_json::from_str("\"pix\"").unwrap();
        assert_eq!(parsed, PaymentMethod::Pix);
    }

    #[test]
    fn only_admin_is_admin() {
        assert!(Role::Admin.is_admin());
        assert!(!Role::Psychologist.is_admin());
        assert!(!Role::Assistant.is_admin());
    }
}
