use std::fmt::{self, Debug, Display, Formatter};

use crate::data::MapCell;
use crate::map::GoalMap;
use crate::moves::Moves;
use crate::state::State;

/// Prints the board states a solution passes through, verifying the moves
/// are actually playable along the way.
pub struct SolutionFormatter<'a> {
    map: &'a GoalMap,
    initial_state: &'a State,
    moves: &'a Moves,
    include_steps: bool,
}

impl<'a> SolutionFormatter<'a> {
    pub fn new(
        map: &'a GoalMap,
        initial_state: &'a State,
        moves: &'a Moves,
        include_steps: bool,
    ) -> Self {
        Self {
            map,
            initial_state,
            moves,
            include_steps,
        }
    }
}

impl Display for SolutionFormatter<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.map.xsb_with_state(self.initial_state))?;
        let mut last_state = self.initial_state.clone();
        for &mov in self.moves {
            // moves could come from a different level - sanity check them
            let new_player_pos = last_state.player_pos + mov.dir;
            assert_ne!(
                self.map.grid[new_player_pos],
                MapCell::Wall,
                "new_player_pos: {:?}",
                new_player_pos
            );

            let new_state = if mov.is_push {
                let new_box_pos = new_player_pos + mov.dir;
                assert_ne!(self.map.grid[new_box_pos], MapCell::Wall);
                assert!(!last_state.has_box(new_box_pos));
                assert!(
                    last_state.has_box(new_player_pos),
                    "move is a push but there is no box"
                );
                last_state.with_moved_box(new_player_pos, new_box_pos, new_player_pos)
            } else {
                assert!(!last_state.has_box(new_player_pos));
                State::new(new_player_pos, last_state.boxes.clone())
            };

            if mov.is_push || self.include_steps {
                writeln!(f, "{}", self.map.xsb_with_state(&new_state))?;
            }

            last_state = new_state;
        }
        Ok(())
    }
}

impl Debug for SolutionFormatter<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}
