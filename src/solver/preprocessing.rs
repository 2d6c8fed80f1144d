use std::collections::VecDeque;

use crate::data::{MapCell, Pos, DIRECTIONS, MAX_BOXES};
use crate::level::Level;
use crate::map::GoalMap;
use crate::solver::SolverErr;
use crate::state::State;
use crate::vec2d::Vec2d;

/// Checks the level is usable and normalizes it for the search:
/// the border must be closed, unreachable cells become walls and
/// box/goal pairs outside the playable area are dropped.
pub(crate) fn process_level(level: &Level) -> Result<(GoalMap, State), SolverErr> {
    // Guarantees we have here:
    // - the player exists and therefore the map is at least 1x1
    // - rows and cols are <= 255

    // make sure the level is surrounded by wall
    let mut visited = level.map.grid.scratchpad();
    let mut to_visit = vec![level.state.player_pos];

    while let Some(cur) = to_visit.pop() {
        visited[cur] = true;

        let (r, c) = (i32::from(cur.r), i32::from(cur.c));
        let neighbors = [(r + 1, c), (r - 1, c), (r, c + 1), (r, c - 1)];
        for &(nr, nc) in &neighbors {
            // this is the only place in the solver where we need to check bounds (using signed types)
            // everything after that will be surrounded by walls
            if nr < 0
                || nc < 0
                || nr >= i32::from(level.map.grid.rows())
                || nc >= i32::from(level.map.grid.cols())
            {
                // we got out of bounds without hitting a wall
                return Err(SolverErr::IncompleteBorder);
            }

            let new_pos = Pos::new(nr as u8, nc as u8);
            if !visited[new_pos] && level.map.grid[new_pos] != MapCell::Wall {
                to_visit.push(new_pos);
            }
        }
    }

    // make sure all relevant game elements are reachable
    let mut reachable_goals = Vec::new();
    let mut reachable_boxes = Vec::new();
    for &pos in &level.state.boxes {
        if visited[pos] {
            reachable_boxes.push(pos);
        } else if !level.map.goals.contains(&pos) {
            return Err(SolverErr::UnreachableBoxes);
        }
    }
    for &pos in &level.map.goals {
        if visited[pos] {
            reachable_goals.push(pos);
        } else if !level.state.boxes.contains(&pos) {
            return Err(SolverErr::UnreachableGoals);
        }
    }

    // make sure all non-reachable cells are walls
    // to avoid errors with code that iterates through all non-walls
    let mut processed_grid = level.map.grid.clone();
    for pos in processed_grid.positions() {
        if !visited[pos] {
            processed_grid[pos] = MapCell::Wall;
        }
    }

    if reachable_boxes.len() != reachable_goals.len() {
        return Err(SolverErr::BoxesGoals);
    }

    if reachable_boxes.len() > MAX_BOXES {
        return Err(SolverErr::TooMany);
    }

    let processed_map = GoalMap::new(processed_grid, reachable_goals);
    let clean_state = State::new(level.state.player_pos, reachable_boxes);
    Ok((processed_map, clean_state))
}

/// Flood fill of the squares the player can reach without pushing anything.
/// Also returns the smallest reachable square - the canonical player position.
pub(crate) fn player_reachability(grid: &Vec2d<MapCell>, state: &State) -> (Vec2d<bool>, Pos) {
    let mut reachable = grid.scratchpad();
    reachable[state.player_pos] = true;
    let mut min_pos = state.player_pos;

    // Vec is noticeably faster than VecDeque on some levels
    let mut to_visit = vec![state.player_pos];
    while let Some(cur) = to_visit.pop() {
        for &new_pos in &cur.neighbors() {
            if grid[new_pos] != MapCell::Wall && !state.has_box(new_pos) && !reachable[new_pos] {
                reachable[new_pos] = true;
                if new_pos < min_pos {
                    min_pos = new_pos;
                }
                to_visit.push(new_pos);
            }
        }
    }

    (reachable, min_pos)
}

/// Rewrites the player to the smallest square of its reachable region so
/// states that differ only in where exactly the player stands compare equal.
pub(crate) fn canonicalize(grid: &Vec2d<MapCell>, state: State) -> State {
    let (_, min_pos) = player_reachability(grid, &state);
    State {
        player_pos: min_pos,
        boxes: state.boxes,
    }
}

/// Number of connected components of non-wall squares not occupied by `boxes`.
pub(crate) fn free_components(grid: &Vec2d<MapCell>, boxes: &[Pos]) -> u16 {
    let mut blocked: Vec2d<bool> = grid.scratchpad();
    for &b in boxes {
        blocked[b] = true;
    }

    let mut seen: Vec2d<bool> = grid.scratchpad();
    let mut components = 0;
    for pos in grid.positions() {
        if grid[pos] == MapCell::Wall || blocked[pos] || seen[pos] {
            continue;
        }
        components += 1;
        seen[pos] = true;
        let mut to_visit = vec![pos];
        while let Some(cur) = to_visit.pop() {
            for &new_pos in &cur.neighbors() {
                if grid[new_pos] != MapCell::Wall && !blocked[new_pos] && !seen[new_pos] {
                    seen[new_pos] = true;
                    to_visit.push(new_pos);
                }
            }
        }
    }

    components
}

/// Squares from which a lone box can still reach some goal.
///
/// Computed backwards: a pull from a goal mirrors a push towards it, so a
/// square is live when pulls (ignoring other boxes) connect it to a goal.
/// Pushes into dead squares are never generated - this covers corners and
/// wall-hugging dead ends in one pass.
pub(crate) fn live_squares(map: &GoalMap) -> Vec2d<bool> {
    let mut live = map.grid.scratchpad();
    let mut to_visit = VecDeque::new();
    for &goal in &map.goals {
        live[goal] = true;
        to_visit.push_back(goal);
    }

    while let Some(cur) = to_visit.pop_front() {
        for &dir in &DIRECTIONS {
            // a box at `from` pushed along `dir` lands on `cur`,
            // the player pushes from one square further back
            let from = cur - dir;
            if map.grid[from] == MapCell::Wall || live[from] {
                continue;
            }
            if map.grid[from - dir] == MapCell::Wall {
                continue;
            }
            live[from] = true;
            to_visit.push_back(from);
        }
    }

    live
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unreachable_boxes() {
        let level: Level = r"
########
#@$.#$.#
########
"
        .parse()
        .unwrap();
        assert_eq!(
            process_level(&level).unwrap_err(),
            SolverErr::UnreachableBoxes
        );
    }

    #[test]
    fn unreachable_box_on_goal_is_dropped() {
        let level: Level = r"
########
#@$.#*##
########
"
        .parse()
        .unwrap();
        let (map, state) = process_level(&level).unwrap();
        assert_eq!(map.goals().len(), 1);
        assert_eq!(state.boxes.len(), 1);
        // the walled-off part is all wall now
        assert!(map.is_wall(Pos::new(1, 5)));
    }

    #[test]
    fn incomplete_border() {
        let level0 = r"
####
#@*
####
";
        let level1 = r"
####
# *#
#@##
";
        for level in &[level0, level1] {
            let level: Level = level.parse().unwrap();
            assert_eq!(
                process_level(&level).unwrap_err(),
                SolverErr::IncompleteBorder
            );
        }
    }

    #[test]
    fn mismatched_boxes_and_goals() {
        let level: Level = r"
#####
#@$ #
#$ .#
#####
"
        .parse()
        .unwrap();
        assert_eq!(process_level(&level).unwrap_err(), SolverErr::BoxesGoals);
    }

    #[test]
    fn reachability_stops_at_boxes() {
        let level: Level = r"
#####
#@$ #
#####
"
        .parse()
        .unwrap();
        let (reachable, min_pos) = player_reachability(&level.map.grid, &level.state);
        assert!(reachable[Pos::new(1, 1)]);
        assert!(!reachable[Pos::new(1, 2)]);
        assert!(!reachable[Pos::new(1, 3)]);
        assert_eq!(min_pos, Pos::new(1, 1));
    }

    #[test]
    fn canonical_player_collapses_region() {
        let left: Level = r"
######
#@   #
# $$ #
######
"
        .parse()
        .unwrap();
        let right: Level = r"
######
#   @#
# $$ #
######
"
        .parse()
        .unwrap();
        let a = canonicalize(&left.map.grid, left.state.clone());
        let b = canonicalize(&right.map.grid, right.state.clone());
        assert_eq!(a, b);
        assert_eq!(a.player_pos, Pos::new(1, 1));
    }

    #[test]
    fn corners_are_dead() {
        let level: Level = r"
#####
#@ $#
#  .#
#####
"
        .parse()
        .unwrap();
        let (map, _) = process_level(&level).unwrap();
        let live = live_squares(&map);
        // goal and the square it can be pushed in from
        assert!(live[Pos::new(2, 3)]);
        assert!(live[Pos::new(2, 2)]);
        // corners are not
        assert!(!live[Pos::new(1, 1)]);
        assert!(!live[Pos::new(1, 3)]);
        // neither is a lane whose push would need a player inside a wall
        assert!(!live[Pos::new(2, 1)]);
    }

    #[test]
    fn counting_free_components() {
        let level: Level = r"
#####
#@$.#
#####
"
        .parse()
        .unwrap();
        // the box splits the corridor in two
        assert_eq!(free_components(&level.map.grid, &level.state.boxes), 2);
        assert_eq!(free_components(&level.map.grid, &[]), 1);
    }
}
