use std::collections::VecDeque;

use log::debug;

use crate::data::{MapCell, Pos, DIRECTIONS};
use crate::map::GoalMap;
use crate::solver::preprocessing::free_components;
use crate::solver::SolverErr;
use crate::state::State;
use crate::vec2d::Vec2d;

/// The order the goals have to be filled in, derived once per level by
/// retrograde analysis: starting from the solved position, repeatedly
/// un-pack a box that can still be pulled clear of the goal area. The
/// reversed removal order is the packing order.
///
/// The pull corridors recorded along the way are the plan-critical squares:
/// a box parked on one of them will have to be moved again before the plan
/// can finish.
pub(crate) struct PackingPlan {
    order: Vec<Pos>,
    // goal square -> its position in `order`
    order_index: Vec2d<Option<u16>>,
    critical: Vec2d<bool>,
}

impl PackingPlan {
    pub(crate) fn new(map: &GoalMap) -> Result<PackingPlan, SolverErr> {
        let mut remaining = map.goals.clone();
        let mut removal = Vec::new();
        let mut critical = map.grid.scratchpad();

        while !remaining.is_empty() {
            // among the removable goals, prefer the one whose removal leaves
            // the free space least fragmented, then the smallest square
            let mut best: Option<(u16, Pos, Vec2d<bool>)> = None;
            for (i, &goal) in remaining.iter().enumerate() {
                let mut others = remaining.clone();
                others.remove(i);

                if let Some(corridor) = pull_clear(map, &others, goal) {
                    let components = free_components(&map.grid, &others);
                    if best.as_ref().map_or(true, |&(c, _, _)| components < c) {
                        best = Some((components, goal, corridor));
                    }
                }
            }

            match best {
                None => return Err(SolverErr::UnsolvablePlan),
                Some((_, goal, corridor)) => {
                    remaining.retain(|&g| g != goal);
                    removal.push(goal);
                    for pos in corridor.positions() {
                        if corridor[pos] {
                            critical[pos] = true;
                        }
                    }
                }
            }
        }

        removal.reverse();
        debug!("packing order: {:?}", removal);
        Ok(Self::from_order(map, removal, critical))
    }

    /// Plan for a level that is already solved - nothing to pack.
    pub(crate) fn trivial(map: &GoalMap) -> PackingPlan {
        Self::from_order(map, map.goals.clone(), map.grid.scratchpad())
    }

    fn from_order(map: &GoalMap, order: Vec<Pos>, critical: Vec2d<bool>) -> PackingPlan {
        let mut order_index = map.grid.scratchpad();
        for (i, &goal) in order.iter().enumerate() {
            order_index[goal] = Some(i as u16);
        }
        PackingPlan {
            order,
            order_index,
            critical,
        }
    }

    #[cfg(test)]
    pub(crate) fn order(&self) -> &[Pos] {
        &self.order
    }

    /// Length of the longest plan prefix fully packed in `state`.
    /// Monotone along a packing path, equals the goal count when solved.
    pub(crate) fn packed_prefix(&self, state: &State) -> u16 {
        let mut prefix = 0;
        for &goal in &self.order {
            if !state.has_box(goal) {
                break;
            }
            prefix += 1;
        }
        prefix
    }

    /// Boxes sitting on plan-critical squares, not counting the ones already
    /// packed on the current prefix.
    pub(crate) fn out_of_plan(&self, state: &State) -> u16 {
        let prefix = self.packed_prefix(state);
        state
            .boxes
            .iter()
            .filter(|&&b| self.critical[b] && !self.in_prefix(b, prefix))
            .count() as u16
    }

    /// Whether the packing plan needs to traverse this square.
    pub(crate) fn is_critical(&self, pos: Pos) -> bool {
        self.critical[pos]
    }

    fn in_prefix(&self, pos: Pos, prefix: u16) -> bool {
        match self.order_index[pos] {
            Some(i) => i < prefix,
            None => false,
        }
    }
}

/// BFS of pulls: all squares a box on `goal` can be pulled through while the
/// other `obstacles` stay put. Succeeds once the box gets off the goal area.
///
/// A pull mirrors a push read backwards, so both the destination square and
/// the one beyond it (where the pulling player retreats) must be open.
fn pull_clear(map: &GoalMap, obstacles: &[Pos], goal: Pos) -> Option<Vec2d<bool>> {
    let mut blocked: Vec2d<bool> = map.grid.scratchpad();
    for &o in obstacles {
        blocked[o] = true;
    }

    let mut visited: Vec2d<bool> = map.grid.scratchpad();
    visited[goal] = true;
    let mut to_visit = VecDeque::new();
    to_visit.push_back(goal);
    let mut cleared = false;

    while let Some(cur) = to_visit.pop_front() {
        if map.grid[cur] != MapCell::Goal {
            cleared = true;
        }
        for &dir in &DIRECTIONS {
            let dest = cur + dir;
            let beyond = dest + dir;
            if visited[dest]
                || map.grid[dest] == MapCell::Wall
                || blocked[dest]
                || map.grid[beyond] == MapCell::Wall
                || blocked[beyond]
            {
                continue;
            }
            visited[dest] = true;
            to_visit.push_back(dest);
        }
    }

    if cleared {
        Some(visited)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::Level;
    use crate::solver::preprocessing::process_level;

    fn plan_for(level: &str) -> PackingPlan {
        let level: Level = level.parse().unwrap();
        let (map, _) = process_level(&level).unwrap();
        PackingPlan::new(&map).unwrap()
    }

    #[test]
    fn goal_room_is_packed_back_to_front() {
        // the far end of the dead-end goal room must be filled first
        let plan = plan_for(
            r"
#######
#@$$..#
#######
",
        );
        assert_eq!(plan.order(), &[Pos::new(1, 5), Pos::new(1, 4)]);
    }

    #[test]
    fn packed_prefix_follows_plan_order() {
        let level: Level = r"
#######
#@$$..#
#######
"
        .parse()
        .unwrap();
        let (map, state) = process_level(&level).unwrap();
        let plan = PackingPlan::new(&map).unwrap();

        assert_eq!(plan.packed_prefix(&state), 0);

        // only the near goal filled - out of order, prefix stays 0
        let near = State::new(Pos::new(1, 1), vec![Pos::new(1, 2), Pos::new(1, 4)]);
        assert_eq!(plan.packed_prefix(&near), 0);

        // the far goal filled first - prefix 1
        let far = State::new(Pos::new(1, 1), vec![Pos::new(1, 2), Pos::new(1, 5)]);
        assert_eq!(plan.packed_prefix(&far), 1);

        // both filled
        let solved = State::new(Pos::new(1, 1), vec![Pos::new(1, 4), Pos::new(1, 5)]);
        assert_eq!(plan.packed_prefix(&solved), 2);
    }

    #[test]
    fn critical_squares_cover_the_push_lane() {
        let level: Level = r"
#######
#@ $ .#
#######
"
        .parse()
        .unwrap();
        let (map, state) = process_level(&level).unwrap();
        let plan = PackingPlan::new(&map).unwrap();

        for c in 2..=5 {
            assert!(plan.is_critical(Pos::new(1, c)), "column {}", c);
        }
        assert!(!plan.is_critical(Pos::new(1, 1)));

        // the lone box stands in the lane and is not packed yet
        assert_eq!(plan.out_of_plan(&state), 1);
        // once packed it no longer counts
        let solved = State::new(Pos::new(1, 1), vec![Pos::new(1, 5)]);
        assert_eq!(plan.out_of_plan(&solved), 0);
    }

    #[test]
    fn unsolvable_plan() {
        // the goal sits in a pocket no pull can leave
        let level: Level = r"
######
#@ #.#
#  $ #
######
"
        .parse()
        .unwrap();
        let (map, _) = process_level(&level).unwrap();
        assert!(matches!(
            PackingPlan::new(&map),
            Err(SolverErr::UnsolvablePlan)
        ));
    }
}
