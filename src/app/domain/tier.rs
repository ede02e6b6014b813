use serde::{Deserialize, Serialize};

/// Coarse visibility rank derived from role. Narrows list-query result sets
/// independently of the per-action permission flags: tiers 1 and 2 see the
/// whole organization, tier 3 sees only assigned records, tier 4 sees none
/// of the assignment-scoped resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Tier {
    Executive = 1,
    Office = 2,
    Field = 3,
    Finance = 4,
}

impl Tier {
    /// Numeric rank as stored in the users table (1 highest).
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Parse the stored rank. Out-of-range values are treated as absent.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Tier::Executive),
            2 => Some(Tier::Office),
            3 => Some(Tier::Field),
            4 => Some(Tier::Finance),
            _ => None,
        }
    }
}

impl From<Tier> for u8 {
    fn from(tier: Tier) -> u8 {
        tier.as_u8()
    }
}

impl TryFrom<u8> for Tier {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Tier::from_u8(value).ok_or_else(|| format!("invalid tier: {value}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rank_round_trip() {
        for rank in 1..=4u8 {
            assert_eq!(Tier::from_u8(rank).unwrap().as_u8(), rank);
        }
    }

    #[test]
    fn out_of_range_rank_is_absent() {
        assert_eq!(Tier::from_u8(0), None);
        assert_eq!(Tier::from_u8(5), None);
    }
}
