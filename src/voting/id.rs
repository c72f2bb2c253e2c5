use std::fmt::{self, Display, Formatter};
use std::num::ParseIntError;
use std::str::FromStr;

use serde::{Serialize, Deserialize};
use uuid::Uuid;

/// Globally unique id, used for principals.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct Id(pub Uuid);
impl Id {
    pub fn new() -> Id {
        Id(Uuid::new_v4())
    }
}
impl Display for Id {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Database-assigned serial id, used for questions, choices and votes.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct WeakId(pub i32);
impl Display for WeakId {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl FromStr for WeakId {
    type Err = ParseIntError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(WeakId)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weak_id_parses_form_values() {
        assert_eq!("42".parse::<WeakId>().unwrap(), WeakId(42));
        assert_eq!(" 7 ".parse::<WeakId>().unwrap(), WeakId(7));
        assert!("".parse::<WeakId>().is_err());
        assert!("seven".parse::<WeakId>().is_err());
    }

    #[test]
    fn ids_serialize_as_bare_values() {
        assert_eq!(serde_json::to_string(&WeakId(3)).unwrap(), "3");
        let id = Id::new();
        assert_eq!(serde_json::to_string(&id).unwrap(), format!("\"{}\"", id.0));
    }
}
