use std::fmt;
use std::fmt::{Debug, Display, Formatter};
use std::str::FromStr;

use crate::map::GoalMap;
use crate::map_formatter::MapFormatter;
use crate::parser::{self, ParserErr};
use crate::state::State;

/// A map plus the initial placement of the player and boxes.
/// Immutable once parsed.
#[derive(Clone)]
pub struct Level {
    pub map: GoalMap,
    pub(crate) state: State,
}

impl Level {
    pub(crate) fn new(map: GoalMap, state: State) -> Self {
        Level { map, state }
    }

    pub fn initial_state(&self) -> &State {
        &self.state
    }

    pub fn xsb(&self) -> MapFormatter<'_> {
        self.map.xsb_with_state(&self.state)
    }
}

impl FromStr for Level {
    type Err = ParserErr;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parser::parse_level(s)
    }
}

impl Display for Level {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.xsb())
    }
}

impl Debug for Level {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.xsb())
    }
}
