use std::fmt;
use std::fmt::{Debug, Display, Formatter};

use crate::data::{MapCell, Pos};
use crate::map_formatter::MapFormatter;
use crate::state::State;
use crate::vec2d::Vec2d;

/// The static part of a level: walls, floor and goals.
#[derive(Clone)]
pub struct GoalMap {
    pub(crate) grid: Vec2d<MapCell>,
    pub(crate) goals: Vec<Pos>,
}

impl GoalMap {
    pub(crate) fn new(grid: Vec2d<MapCell>, mut goals: Vec<Pos>) -> Self {
        goals.sort_unstable();
        GoalMap { grid, goals }
    }

    pub fn is_wall(&self, pos: Pos) -> bool {
        self.grid[pos] == MapCell::Wall
    }

    pub fn is_goal(&self, pos: Pos) -> bool {
        self.grid[pos] == MapCell::Goal
    }

    pub fn goals(&self) -> &[Pos] {
        &self.goals
    }

    pub fn xsb(&self) -> MapFormatter<'_> {
        MapFormatter::new(&self.grid, None)
    }

    pub fn xsb_with_state<'a>(&'a self, state: &'a State) -> MapFormatter<'a> {
        MapFormatter::new(&self.grid, Some(state))
    }
}

impl Display for GoalMap {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.xsb())
    }
}

impl Debug for GoalMap {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::Level;

    #[test]
    fn formatting_map() {
        let xsb_level: &str = r"
#####
#@$.#
#*  #
#####
"
        .trim_start_matches('\n');
        let xsb_map: &str = "
#####
#  .#
#.  #
#####
"
        .trim_start_matches('\n');

        let level: Level = xsb_level.parse().unwrap();
        let map = &level.map;

        assert_eq!(map.to_string(), xsb_map);
        assert_eq!(map.xsb().to_string(), xsb_map);
        assert_eq!(format!("{}", map), xsb_map);
        assert_eq!(format!("{:?}", map), xsb_map);

        assert_eq!(
            map.xsb_with_state(level.initial_state()).to_string(),
            xsb_level
        );
    }

    #[test]
    fn goal_queries() {
        let level: Level = "\
#####
#@$.#
#####
"
        .parse()
        .unwrap();
        assert!(level.map.is_wall(Pos::new(0, 0)));
        assert!(!level.map.is_wall(Pos::new(1, 1)));
        assert!(level.map.is_goal(Pos::new(1, 3)));
        assert_eq!(level.map.goals(), &[Pos::new(1, 3)]);
    }
}
