use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Accounting period (exercice) identified by its closing year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Exercice(pub u16);

impl fmt::Display for Exercice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Exercice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u16>()
            .map(Exercice)
            .map_err(|_| format!("Invalid exercice: '{s}'"))
    }
}

impl Exercice {
    pub fn new(year: u16) -> Self {
        Exercice(year)
    }

    pub fn year(self) -> u16 {
        self.0
    }

    /// The N-1 period compared against this one.
    pub fn previous(self) -> Exercice {
        Exercice(self.0.saturating_sub(1))
    }
}
