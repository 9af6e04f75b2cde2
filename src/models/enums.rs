use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern.
/// The string token doubles as the serde wire name, so JSON and the
/// database always carry the same value.
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
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
    };
}

str_enum!(Sex {
    Male => "MALE",
    Female => "FEMALE",
});

str_enum!(BloodType {
    APositive => "A_POSITIVE",
    ANegative => "A_NEGATIVE",
    BPositive => "B_POSITIVE",
    BNegative => "B_NEGATIVE",
    AbPositive => "AB_POSITIVE",
    AbNegative => "AB_NEGATIVE",
    OPositive => "O_POSITIVE",
    ONegative => "O_NEGATIVE",
});

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn sex_round_trip() {
        for (variant, s) in [(Sex::Male, "MALE"), (Sex::Female, "FEMALE")] {
            assert_eq!(variant.as_str(), s);
            assert_eq!(Sex::from_str(s).unwrap(), variant);
        }
    }

    #[test]
    fn sex_rejects_unknown_value() {
        assert!(Sex::from_str("OTHER").is_err());
        assert!(Sex::from_str("male").is_err());
    }

    #[test]
    fn blood_type_parses_all_eight() {
        for s in [
            "A_POSITIVE",
            "A_NEGATIVE",
            "B_POSITIVE",
            "B_NEGATIVE",
            "AB_POSITIVE",
            "AB_NEGATIVE",
            "O_POSITIVE",
            "O_NEGATIVE",
        ] {
            let parsed = BloodType::from_str(s).unwrap();
            assert_eq!(parsed.as_str(), s);
        }
        assert!(BloodType::from_str("C_POSITIVE").is_err());
    }

    #[test]
    fn serde_uses_wire_tokens() {
        let json = serde_json::to_string(&Sex::Female).unwrap();
        assert_eq!(json, "\"FEMALE\"");
        let back: BloodType = serde_json::from_str("\"AB_NEGATIVE\"").unwrap();
        assert_eq!(back, BloodType::AbNegative);
    }
}
