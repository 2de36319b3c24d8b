use serde::{Deserialize, Serialize};

/// Signed vote direction. The wire value is the signed integer itself; the
/// ledger stores the resolved value and enforces one row per (post, voter).
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(try_from = "i16", into = "i16")]
pub enum VoteType {
    Up,
    Down,
}

impl VoteType {
    pub fn value(&self) -> i16 {
        match self {
            VoteType::Up => 1,
            VoteType::Down => -1,
        }
    }
}

impl TryFrom<i16> for VoteType {
    type Error = String;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(VoteType::Up),
            -1 => Ok(VoteType::Down),
            other => Err(format!("vote_type must be 1 or -1, got {other}")),
        }
    }
}

impl From<VoteType> for i16 {
    fn from(vote: VoteType) -> i16 {
        vote.value()
    }
}
