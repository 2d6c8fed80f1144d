use std::fmt;
use std::fmt::{Debug, Display, Formatter};

use crate::map::GoalMap;
use crate::moves::PushMove;
use crate::solver::packing::PackingPlan;
use crate::solver::preprocessing::free_components;
use crate::solver::rooms::RoomGraph;
use crate::state::State;

/// Where a state lands in the 4-dimensional feature space.
///
/// - `packing`: boxes packed in plan order (more is better)
/// - `connectivity`: regions of free space (fewer is better)
/// - `room_links`: room links obstructed by a box (fewer is better)
/// - `out_of_plan`: boxes the plan will have to shove aside (fewer is better)
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FeatureVector {
    pub packing: u16,
    pub connectivity: u16,
    pub room_links: u16,
    pub out_of_plan: u16,
}

impl Display for FeatureVector {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {}, {})",
            self.packing, self.connectivity, self.room_links, self.out_of_plan
        )
    }
}

impl Debug for FeatureVector {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

/// The per-level analyses the advisors read. Built once at engine
/// construction, read-only afterwards.
pub(crate) struct Advisors {
    pub(crate) plan: PackingPlan,
    pub(crate) rooms: RoomGraph,
}

impl Advisors {
    pub(crate) fn project(&self, map: &GoalMap, state: &State) -> FeatureVector {
        FeatureVector {
            packing: self.plan.packed_prefix(state),
            connectivity: free_components(&map.grid, &state.boxes),
            room_links: self.rooms.obstructed_links(state),
            out_of_plan: self.plan.out_of_plan(state),
        }
    }

    /// Weight of a candidate move: 0 when at least one advisor endorses it
    /// and none vetoes, 1 otherwise. The engine tries weight-0 moves first
    /// but still falls back to the rest, so the search stays complete.
    pub(crate) fn weigh(
        &self,
        map: &GoalMap,
        parent: FeatureVector,
        mov: PushMove,
        child: FeatureVector,
    ) -> u8 {
        let mut endorsed = false;
        for &advisor in &ADVISORS {
            match advisor.opinion(self, map, parent, mov, child) {
                Opinion::Veto => return 1,
                Opinion::Endorse => endorsed = true,
                Opinion::Neutral => {}
            }
        }
        // the packing advisor's fallback rule: pushing a box the plan has no
        // use for yet is endorsed too, as long as nobody vetoed (a veto
        // returned above)
        if !endorsed && !self.plan.is_critical(mov.box_from) {
            endorsed = true;
        }
        if endorsed {
            0
        } else {
            1
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Opinion {
    Endorse,
    Neutral,
    Veto,
}

/// The four advisors as a closed set - there is no open extensibility here,
/// a new feature dimension means a new variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Advisor {
    Packing,
    Connectivity,
    Room,
    OutOfPlan,
}

pub(crate) const ADVISORS: [Advisor; 4] = [
    Advisor::Packing,
    Advisor::Connectivity,
    Advisor::Room,
    Advisor::OutOfPlan,
];

impl Advisor {
    /// Packing endorses only actual progress on the plan (its fallback rule
    /// for boxes the plan does not care about yet lives in `Advisors::weigh`
    /// because it must know nobody vetoed). Connectivity and out-of-plan
    /// endorse any move that does not make their feature worse. The room
    /// advisor vetoes parking a box on a corridor cell that is not a goal.
    pub(crate) fn opinion(
        self,
        advisors: &Advisors,
        map: &GoalMap,
        parent: FeatureVector,
        mov: PushMove,
        child: FeatureVector,
    ) -> Opinion {
        match self {
            Advisor::Packing => {
                if child.packing > parent.packing {
                    Opinion::Endorse
                } else if child.packing < parent.packing {
                    Opinion::Veto
                } else {
                    Opinion::Neutral
                }
            }
            Advisor::Connectivity => non_regression(parent.connectivity, child.connectivity),
            Advisor::Room => {
                let dest = mov.box_to();
                if advisors.rooms.is_tunnel(dest) && !map.is_goal(dest) {
                    Opinion::Veto
                } else if child.room_links < parent.room_links {
                    Opinion::Endorse
                } else if child.room_links > parent.room_links {
                    Opinion::Veto
                } else {
                    Opinion::Neutral
                }
            }
            Advisor::OutOfPlan => non_regression(parent.out_of_plan, child.out_of_plan),
        }
    }
}

/// Non-strict rule - holding the feature where it is counts as an
/// endorsement, only making it worse is a veto.
fn non_regression(before: u16, after: u16) -> Opinion {
    if after <= before {
        Opinion::Endorse
    } else {
        Opinion::Veto
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Pos;
    use crate::level::Level;
    use crate::solver::preprocessing::process_level;
    use crate::state::State;

    fn setup(level: &str) -> (GoalMap, State, Advisors) {
        let level: Level = level.parse().unwrap();
        let (map, state) = process_level(&level).unwrap();
        let advisors = Advisors {
            plan: PackingPlan::new(&map).unwrap(),
            rooms: RoomGraph::new(&map),
        };
        (map, state, advisors)
    }

    #[test]
    fn projection_of_the_simplest_level() {
        let (map, state, advisors) = setup(
            r"
#####
#@$.#
#####
",
        );
        let fv = advisors.project(&map, &state);
        assert_eq!(fv.packing, 0);
        // the box splits the corridor
        assert_eq!(fv.connectivity, 2);
        // and sits on the corridor cell
        assert_eq!(fv.room_links, 1);
        assert_eq!(fv.out_of_plan, 1);

        let solved = State::new(Pos::new(1, 1), vec![Pos::new(1, 3)]);
        let fv = advisors.project(&map, &solved);
        assert_eq!(fv.packing, 1);
        assert_eq!(fv.connectivity, 1);
        assert_eq!(fv.room_links, 0);
        assert_eq!(fv.out_of_plan, 0);
    }

    #[test]
    fn projection_is_stable() {
        let (map, state, advisors) = setup(
            r"
#######
#@$$..#
#######
",
        );
        assert_eq!(
            advisors.project(&map, &state),
            advisors.project(&map, &state)
        );
    }

    #[test]
    fn packing_push_weighs_zero() {
        let (map, state, advisors) = setup(
            r"
#####
#@$.#
#####
",
        );
        let parent = advisors.project(&map, &state);
        let mov = PushMove::new(Pos::new(1, 2), crate::data::Dir::Right, 1);
        let child_state = State::new(Pos::new(1, 2), vec![Pos::new(1, 3)]);
        let child = advisors.project(&map, &child_state);
        assert_eq!(advisors.weigh(&map, parent, mov, child), 0);
    }

    #[test]
    fn fragmenting_push_is_vetoed() {
        let (map, _, advisors) = setup(
            r"
#####
#@$.#
#####
",
        );
        let parent = FeatureVector {
            packing: 0,
            connectivity: 1,
            room_links: 0,
            out_of_plan: 0,
        };
        let worse = FeatureVector {
            connectivity: 2,
            ..parent
        };
        let mov = PushMove::new(Pos::new(1, 2), crate::data::Dir::Right, 1);
        let opinion = Advisor::Connectivity.opinion(&advisors, &map, parent, mov, worse);
        assert_eq!(opinion, Opinion::Veto);
        assert_eq!(advisors.weigh(&map, parent, mov, worse), 1);
    }

    #[test]
    fn holding_a_feature_is_an_endorsement() {
        let (map, _, advisors) = setup(
            r"
#####
#@$.#
#####
",
        );
        let fv = FeatureVector {
            packing: 0,
            connectivity: 1,
            room_links: 0,
            out_of_plan: 0,
        };
        let mov = PushMove::new(Pos::new(1, 2), crate::data::Dir::Right, 1);

        // unchanged connectivity and out-of-plan still endorse,
        // packing stays neutral without actual progress
        let connectivity = Advisor::Connectivity.opinion(&advisors, &map, fv, mov, fv);
        assert_eq!(connectivity, Opinion::Endorse);
        let out_of_plan = Advisor::OutOfPlan.opinion(&advisors, &map, fv, mov, fv);
        assert_eq!(out_of_plan, Opinion::Endorse);
        let packing = Advisor::Packing.opinion(&advisors, &map, fv, mov, fv);
        assert_eq!(packing, Opinion::Neutral);

        // endorsed and nothing vetoed - the move is free
        assert_eq!(advisors.weigh(&map, fv, mov, fv), 0);
    }

    #[test]
    fn off_plan_shuffling_is_not_penalized() {
        let (map, state, advisors) = setup(
            r"
########
#@ #   #
#  $   #
#  # . #
########
",
        );
        // the bottom-left corner is nowhere near the packing lane
        let outside = Pos::new(3, 1);
        assert!(!advisors.plan.is_critical(outside));

        let parked = state.with_moved_box(Pos::new(2, 3), outside, Pos::new(2, 3));
        let parent = advisors.project(&map, &parked);
        let mov = PushMove::new(outside, crate::data::Dir::Right, 1);
        let child_state = parked.with_moved_box(outside, Pos::new(3, 2), Pos::new(3, 1));
        let child = advisors.project(&map, &child_state);

        assert_eq!(advisors.weigh(&map, parent, mov, child), 0);
    }

    #[test]
    fn parking_on_a_tunnel_is_vetoed() {
        let (map, state, advisors) = setup(
            r"
########
#@$#   #
#      #
#  # . #
########
",
        );
        let tunnel = Pos::new(2, 3);
        assert!(advisors.rooms.is_tunnel(tunnel));

        // box one push away from the corridor cell between the two rooms
        let mid = state.with_moved_box(Pos::new(1, 2), Pos::new(2, 2), Pos::new(1, 2));
        let parent = advisors.project(&map, &mid);
        let mov = PushMove::new(Pos::new(2, 2), crate::data::Dir::Right, 1);
        let child_state = mid.with_moved_box(Pos::new(2, 2), tunnel, Pos::new(2, 2));
        let child = advisors.project(&map, &child_state);

        let opinion = Advisor::Room.opinion(&advisors, &map, parent, mov, child);
        assert_eq!(opinion, Opinion::Veto);
        assert_eq!(advisors.weigh(&map, parent, mov, child), 1);
    }
}
