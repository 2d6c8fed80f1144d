use crate::data::{Dir, MapCell, Pos};
use crate::map::GoalMap;
use crate::state::State;
use crate::vec2d::Vec2d;

/// Rooms-and-tunnels view of a map, built once per level.
///
/// A tunnel square is a width-1 corridor cell: its two neighbours along one
/// axis are open, the two along the other are walls. Rooms are the connected
/// components of the remaining open squares. Since a tunnel's corridor
/// neighbours are open by definition, following a corridor always ends in a
/// room (dead ends terminate in a one-cell room), so every tunnel square
/// links rooms and a box parked on one cuts the level into islands.
pub(crate) struct RoomGraph {
    tunnel: Vec2d<bool>,
    pub(crate) room_count: u16,
}

impl RoomGraph {
    pub(crate) fn new(map: &GoalMap) -> RoomGraph {
        let grid = &map.grid;

        let mut tunnel: Vec2d<bool> = grid.scratchpad();
        for pos in grid.positions() {
            if grid[pos] == MapCell::Wall {
                continue;
            }
            let vertical = grid[pos + Dir::Up] != MapCell::Wall
                && grid[pos + Dir::Down] != MapCell::Wall
                && grid[pos + Dir::Left] == MapCell::Wall
                && grid[pos + Dir::Right] == MapCell::Wall;
            let horizontal = grid[pos + Dir::Left] != MapCell::Wall
                && grid[pos + Dir::Right] != MapCell::Wall
                && grid[pos + Dir::Up] == MapCell::Wall
                && grid[pos + Dir::Down] == MapCell::Wall;
            tunnel[pos] = vertical || horizontal;
        }

        // label the rooms
        let mut room: Vec2d<Option<u16>> = grid.scratchpad();
        let mut room_count = 0;
        for pos in grid.positions() {
            if grid[pos] == MapCell::Wall || tunnel[pos] || room[pos].is_some() {
                continue;
            }
            let label = room_count;
            room_count += 1;
            room[pos] = Some(label);
            let mut to_visit = vec![pos];
            while let Some(cur) = to_visit.pop() {
                for &next in &cur.neighbors() {
                    if grid[next] != MapCell::Wall && !tunnel[next] && room[next].is_none() {
                        room[next] = Some(label);
                        to_visit.push(next);
                    }
                }
            }
        }

        RoomGraph { tunnel, room_count }
    }

    pub(crate) fn is_tunnel(&self, pos: Pos) -> bool {
        self.tunnel[pos]
    }

    /// Feature F3: room links obstructed by a box.
    pub(crate) fn obstructed_links(&self, state: &State) -> u16 {
        state.boxes.iter().filter(|&&b| self.tunnel[b]).count() as u16
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::Level;
    use crate::state::State;
    use crate::solver::preprocessing::process_level;

    fn rooms_for(level: &str) -> (RoomGraph, State) {
        let level: Level = level.parse().unwrap();
        let (map, state) = process_level(&level).unwrap();
        (RoomGraph::new(&map), state)
    }

    #[test]
    fn two_rooms_one_corridor() {
        let (rooms, state) = rooms_for(
            r"
########
#@ #   #
#  $   #
#  # . #
########
",
        );
        assert_eq!(rooms.room_count, 2);
        // the corridor cell between the two rooms
        assert!(rooms.is_tunnel(Pos::new(2, 3)));
        assert!(!rooms.is_tunnel(Pos::new(2, 2)));
        assert!(!rooms.is_tunnel(Pos::new(2, 4)));
        // the box stands right on it
        assert_eq!(rooms.obstructed_links(&state), 1);
    }

    #[test]
    fn dead_end_corridor_ends_in_a_one_cell_room() {
        let (rooms, _) = rooms_for(
            r"
######
#@$ .#
## ###
## ###
######
",
        );
        // the corridor cell is a tunnel, its dead end is its own room
        assert!(rooms.is_tunnel(Pos::new(2, 2)));
        assert!(!rooms.is_tunnel(Pos::new(3, 2)));
        assert_eq!(rooms.room_count, 2);
    }

    #[test]
    fn open_hall_has_no_tunnels() {
        let (rooms, state) = rooms_for(
            r"
######
#@   #
# $. #
#    #
######
",
        );
        assert_eq!(rooms.room_count, 1);
        assert_eq!(rooms.obstructed_links(&state), 0);
        for r in 1..=3 {
            for c in 1..=4 {
                assert!(!rooms.is_tunnel(Pos::new(r, c)));
            }
        }
    }
}
