use std::collections::{HashMap, VecDeque};

use crate::data::{MapCell, Pos};
use crate::map::GoalMap;
use crate::moves::{Move, Moves, PushMove};
use crate::state::State;

// Terminology:
// move = changing player position by one cell
// push = a move that changes a box position
// step = a move that doesn't change a box position

/// Expands the macro pushes of a solution into the full move string by
/// splicing player steps between them.
///
/// Tree states are canonicalized so their player positions are useless here;
/// instead the pushes are replayed from the true initial state, which pins
/// the player exactly.
pub(crate) fn reconstruct_moves(
    map: &GoalMap,
    initial_state: &State,
    pushes: &[PushMove],
) -> Moves {
    let mut moves = Moves::default();
    let mut state = initial_state.clone();

    for &push in pushes {
        let behind = push.box_from - push.dir;
        moves.extend(&player_steps(map, &state, state.player_pos, behind));
        for _ in 0..push.push_count {
            moves.add(Move::new(push.dir, true));
        }
        state = state.with_moved_box(push.box_from, push.box_to(), push.player_end());
    }

    moves
}

/// Steps (no pushes) taking the player from `src_pos` to `dest_pos`.
fn player_steps(map: &GoalMap, state: &State, src_pos: Pos, dest_pos: Pos) -> Moves {
    if src_pos == dest_pos {
        // because it's not a proper BFS with an open set
        return Moves::default();
    }

    let mut prevs = HashMap::new();
    prevs.insert(src_pos, src_pos);

    let mut to_visit = VecDeque::new();
    to_visit.push_back(src_pos);

    'bfs: loop {
        let player_pos = to_visit
            .pop_front()
            .expect("no step path to dest_pos");

        for &new_player_pos in &player_pos.neighbors() {
            if map.grid[new_player_pos] == MapCell::Wall
                || state.has_box(new_player_pos)
                || prevs.contains_key(&new_player_pos)
            {
                continue;
            }

            prevs.insert(new_player_pos, player_pos);
            if new_player_pos == dest_pos {
                break 'bfs;
            }
            to_visit.push_back(new_player_pos);
        }
    }

    let positions = backtrack_prevs(&prevs, dest_pos);

    let mut moves = Moves::default();
    let mut iter = positions.iter();
    let mut cur = iter.next().unwrap();
    for next in iter {
        moves.add(Move::new(cur.dir_to(*next), false));
        cur = next;
    }

    moves
}

fn backtrack_prevs(prevs: &HashMap<Pos, Pos>, final_pos: Pos) -> Vec<Pos> {
    let mut positions = Vec::new();
    let mut cur = final_pos;
    loop {
        positions.push(cur);
        let prev = prevs[&cur];
        if prev == cur {
            positions.reverse();
            return positions;
        }
        cur = prev;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Dir;
    use crate::level::Level;

    #[test]
    fn push_without_steps() {
        let level: Level = r"
#####
#@$.#
#####
"
        .parse()
        .unwrap();
        let pushes = [PushMove::new(Pos::new(1, 2), Dir::Right, 1)];
        let moves = reconstruct_moves(&level.map, level.initial_state(), &pushes);
        assert_eq!(moves.to_string(), "R");
    }

    #[test]
    fn steps_then_push() {
        let level: Level = r"
######
#@   #
# $. #
######
"
        .parse()
        .unwrap();
        let pushes = [PushMove::new(Pos::new(2, 2), Dir::Right, 1)];
        let moves = reconstruct_moves(&level.map, level.initial_state(), &pushes);
        assert_eq!(moves.to_string(), "dR");
        assert_eq!(moves.push_cnt(), 1);
        assert_eq!(moves.move_cnt(), 2);
    }

    #[test]
    fn walking_around_a_box() {
        let level: Level = r"
######
#    #
# $@ #
# .  #
######
"
        .parse()
        .unwrap();
        // pushing down means getting above the box first
        let pushes = [PushMove::new(Pos::new(2, 2), Dir::Down, 1)];
        let moves = reconstruct_moves(&level.map, level.initial_state(), &pushes);
        assert_eq!(moves.to_string(), "ulD");
    }

    #[test]
    fn chained_pushes_replay_the_player() {
        let level: Level = r"
#####
# . #
#   #
# $ #
# @ #
#####
"
        .parse()
        .unwrap();
        let pushes = [
            PushMove::new(Pos::new(3, 2), Dir::Up, 1),
            PushMove::new(Pos::new(2, 2), Dir::Up, 1),
        ];
        let moves = reconstruct_moves(&level.map, level.initial_state(), &pushes);
        assert_eq!(moves.to_string(), "UU");
    }
}
