mod backtracking;
mod features;
mod index;
mod packing;
mod preprocessing;
mod rooms;
mod tree;

use std::error::Error;
use std::fmt;
use std::fmt::{Debug, Display, Formatter};
use std::time::{Duration, Instant};

use log::debug;
use separator::Separatable;

use crate::data::{MapCell, DIRECTIONS};
use crate::level::Level;
use crate::map::GoalMap;
use crate::moves::{Moves, PushMove};
use crate::state::State;
use crate::vec2d::Vec2d;

pub use self::features::FeatureVector;

use self::features::Advisors;
use self::index::FeatureSpace;
use self::packing::PackingPlan;
use self::rooms::RoomGraph;
use self::tree::{NodeId, RatedMove, SearchTree};

/// Problems that make a level unusable, detected at engine construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverErr {
    IncompleteBorder,
    UnreachableBoxes,
    UnreachableGoals,
    TooMany,
    BoxesGoals,
    UnsolvablePlan,
}

impl Display for SolverErr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match *self {
            SolverErr::IncompleteBorder => write!(f, "Incomplete border"),
            SolverErr::UnreachableBoxes => write!(
                f,
                "Unreachable boxes - some boxes are not on goal but can't be reached"
            ),
            SolverErr::UnreachableGoals => write!(
                f,
                "Unreachable goals - some goals don't have a box but can't be reached"
            ),
            SolverErr::TooMany => write!(
                f,
                "More than {} reachable boxes or goals",
                crate::data::MAX_BOXES
            ),
            SolverErr::BoxesGoals => write!(f, "Different number of reachable boxes and goals"),
            SolverErr::UnsolvablePlan => write!(
                f,
                "Retrograde packing analysis failed - some goal can never be unpacked"
            ),
        }
    }
}

impl Error for SolverErr {}

/// Why a search came back empty-handed. Both cases are ordinary values, not
/// errors in the panicking sense - a budget failure is even retryable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    BudgetExhausted,
    NoSolution,
}

impl Display for FailureReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match *self {
            FailureReason::BudgetExhausted => write!(f, "budget exhausted"),
            FailureReason::NoSolution => write!(f, "no solution exists"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Failure {
    pub reason: FailureReason,
    pub stats: SearchStats,
}

impl Display for Failure {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.reason)
    }
}

impl Error for Failure {}

/// A solved level: the macro pushes the search found, the equivalent full
/// move string and the usual counters.
pub struct Solution {
    pub pushes: Vec<PushMove>,
    pub moves: Moves,
    pub stats: SearchStats,
}

impl Debug for Solution {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}: {} pushes", self.moves, self.moves.push_cnt())?;
        write!(f, "{}", self.stats)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SearchStats {
    /// Expansion steps - moves tried from tree nodes.
    pub states_explored: u64,
    /// Tree nodes created, the root included.
    pub states_generated: u64,
    /// Moves that reached an already known state.
    pub duplicates: u64,
    /// Non-empty cells of the feature space.
    pub cells_occupied: usize,
    pub solve_time: Duration,
}

impl Display for SearchStats {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "States explored: {}",
            self.states_explored.separated_string()
        )?;
        writeln!(
            f,
            "States generated: {}",
            self.states_generated.separated_string()
        )?;
        writeln!(
            f,
            "Reached duplicates: {}",
            self.duplicates.separated_string()
        )?;
        writeln!(f, "Cells occupied: {}", self.cells_occupied)?;
        writeln!(f, "Solve time: {:?}", self.solve_time)
    }
}

/// Exploration caps. The search tests both on every iteration and gives up
/// with `FailureReason::BudgetExhausted` when either is hit.
#[derive(Debug, Clone, Copy)]
pub struct SearchBudget {
    /// Max tree nodes created.
    pub max_states: u64,
    pub time_limit: Duration,
}

impl Default for SearchBudget {
    fn default() -> SearchBudget {
        SearchBudget {
            max_states: 100_000,
            time_limit: Duration::from_secs(60),
        }
    }
}

/// How often (in iterations) a progress callback may fire.
const PROGRESS_INTERVAL: u64 = 10_000;

/// The FESS search engine.
///
/// Instead of ordering the open list by one scalar, states are bucketed by
/// their feature vector and the buckets are cycled round-robin; inside the
/// picked bucket the cheapest unexpanded move (by accumulated weight) goes
/// first. Weight 0 means some advisor endorsed the move, weight 1 moves are
/// the fallback that keeps the search complete.
pub struct FessEngine {
    map: GoalMap,
    /// True (non-canonical) starting state, kept for move reconstruction.
    initial_state: State,
    advisors: Advisors,
    live: Vec2d<bool>,
    budget: SearchBudget,
    tree: SearchTree,
    index: FeatureSpace,
    stats: SearchStats,
}

impl FessEngine {
    pub fn new(level: &Level, budget: SearchBudget) -> Result<FessEngine, SolverErr> {
        debug!("Processing level...");
        let (map, initial_state) = preprocessing::process_level(level)?;
        let live = preprocessing::live_squares(&map);
        let plan = if is_goal(&map, &initial_state) {
            // nothing to pack, don't let retrograde analysis reject the level
            PackingPlan::trivial(&map)
        } else {
            PackingPlan::new(&map)?
        };
        let rooms = RoomGraph::new(&map);
        debug!(
            "Processed level: {} goals, {} rooms",
            map.goals().len(),
            rooms.room_count
        );

        let mut engine = FessEngine {
            map,
            initial_state,
            advisors: Advisors { plan, rooms },
            live,
            budget,
            tree: SearchTree::new(),
            index: FeatureSpace::new(),
            stats: SearchStats::default(),
        };
        engine.insert_root();
        Ok(engine)
    }

    /// Runs the search to completion, a failure or a blown budget.
    ///
    /// The optional callback sees a statistics snapshot at most once per
    /// `PROGRESS_INTERVAL` iterations; it must not take long and it cannot
    /// touch the engine.
    pub fn search(
        &mut self,
        mut progress: Option<&mut dyn FnMut(&SearchStats)>,
    ) -> Result<Solution, Failure> {
        let start = Instant::now();

        if is_goal(&self.map, &self.initial_state) {
            self.stats.solve_time = start.elapsed();
            return Ok(Solution {
                pushes: Vec::new(),
                moves: Moves::default(),
                stats: self.stats,
            });
        }

        let mut iteration: u64 = 0;
        // cells inspected in a row without finding anything to expand;
        // a full fruitless cycle means the search space is exhausted
        let mut idle_cells = 0;

        loop {
            if self.stats.states_generated >= self.budget.max_states
                || start.elapsed() >= self.budget.time_limit
            {
                return Err(self.failure(FailureReason::BudgetExhausted, start));
            }

            iteration += 1;
            if iteration % PROGRESS_INTERVAL == 0 {
                if let Some(ref mut callback) = progress {
                    self.stats.solve_time = start.elapsed();
                    callback(&self.stats);
                }
            }

            let cell_index = match self.index.next_cell() {
                Some(index) => index,
                None => return Err(self.failure(FailureReason::NoSolution, start)),
            };

            let (node_id, move_index) = match self.pick_move(cell_index) {
                Some(pick) => pick,
                None => {
                    idle_cells += 1;
                    if idle_cells >= self.index.cell_count() {
                        return Err(self.failure(FailureReason::NoSolution, start));
                    }
                    continue;
                }
            };
            idle_cells = 0;

            let (mov, weight) = {
                let rated = &mut self.tree.node_mut(node_id).moves[move_index];
                rated.expanded = true;
                (rated.mov, rated.weight)
            };
            self.stats.states_explored += 1;

            let child_state = {
                let parent_state = &self.tree.node(node_id).state;
                self.apply(parent_state, mov)
            };

            let child_id = match self.tree.try_add(child_state.clone(), node_id, mov, weight) {
                Some(id) => id,
                None => {
                    self.stats.duplicates += 1;
                    continue;
                }
            };
            self.stats.states_generated += 1;

            let vector = self.advisors.project(&self.map, &child_state);
            // the projection must be a pure function of the state
            debug_assert_eq!(
                vector,
                self.advisors.project(&self.map, &self.tree.node(child_id).state)
            );
            let rated = self.rate_moves(&child_state, vector);
            self.tree.node_mut(child_id).moves = rated;
            self.index.insert(vector, child_id);
            self.stats.cells_occupied = self.index.cell_count();

            if is_goal(&self.map, &child_state) {
                debug!("Solved, extracting moves");
                return Ok(self.extract_solution(child_id, start));
            }
        }
    }

    pub fn statistics(&self) -> SearchStats {
        self.stats
    }

    fn insert_root(&mut self) {
        let root_state =
            preprocessing::canonicalize(&self.map.grid, self.initial_state.clone());
        let vector = self.advisors.project(&self.map, &root_state);
        let rated = self.rate_moves(&root_state, vector);
        let root = self.tree.add_root(root_state);
        self.tree.node_mut(root).moves = rated;
        self.index.insert(vector, root);
        self.stats.states_generated = 1;
        self.stats.cells_occupied = 1;
    }

    /// The unexpanded move with the least accumulated plus move weight among
    /// the nodes of a cell.
    fn pick_move(&self, cell_index: usize) -> Option<(NodeId, usize)> {
        let mut best: Option<(NodeId, usize, u32)> = None;
        for &node_id in &self.index.cell(cell_index).nodes {
            let node = self.tree.node(node_id);
            for (i, rated) in node.moves.iter().enumerate() {
                if rated.expanded {
                    continue;
                }
                let weight = node.accumulated_weight + u32::from(rated.weight);
                if best.map_or(true, |(_, _, w)| weight < w) {
                    best = Some((node_id, i, weight));
                }
            }
        }
        best.map(|(node_id, move_index, _)| (node_id, move_index))
    }

    /// All legal pushes from a state: the target square must be open and
    /// live, the square behind the box reachable. Pushes into dead squares
    /// (corners and the like) are filtered out right here.
    fn generate_pushes(&self, state: &State) -> Vec<PushMove> {
        let (reachable, _) = preprocessing::player_reachability(&self.map.grid, state);

        let mut pushes = Vec::new();
        for &box_pos in &state.boxes {
            for &dir in &DIRECTIONS {
                let ahead = box_pos + dir;
                let behind = box_pos - dir;
                if self.map.grid[ahead] == MapCell::Wall
                    || state.has_box(ahead)
                    || !self.live[ahead]
                {
                    continue;
                }
                if !reachable[behind] {
                    continue;
                }
                pushes.push(PushMove::new(box_pos, dir, 1));
            }
        }
        pushes
    }

    /// Generates the moves of a freshly inserted node and asks the advisors
    /// to weigh each of them.
    fn rate_moves(&self, state: &State, vector: FeatureVector) -> Vec<RatedMove> {
        self.generate_pushes(state)
            .into_iter()
            .map(|mov| {
                let child = self.apply(state, mov);
                let child_vector = self.advisors.project(&self.map, &child);
                let weight = self.advisors.weigh(&self.map, vector, mov, child_vector);
                RatedMove {
                    mov,
                    weight,
                    expanded: false,
                }
            })
            .collect()
    }

    fn apply(&self, state: &State, mov: PushMove) -> State {
        let next = state.with_moved_box(mov.box_from, mov.box_to(), mov.player_end());
        preprocessing::canonicalize(&self.map.grid, next)
    }

    fn extract_solution(&mut self, goal_node: NodeId, start: Instant) -> Solution {
        let mut pushes = Vec::new();
        for id in self.tree.path_from_root(goal_node) {
            if let Some(mov) = self.tree.node(id).mov {
                pushes.push(mov);
            }
        }
        let moves = backtracking::reconstruct_moves(&self.map, &self.initial_state, &pushes);
        self.stats.solve_time = start.elapsed();
        Solution {
            pushes,
            moves,
            stats: self.stats,
        }
    }

    fn failure(&mut self, reason: FailureReason, start: Instant) -> Failure {
        self.stats.solve_time = start.elapsed();
        Failure {
            reason,
            stats: self.stats,
        }
    }
}

impl Debug for FessEngine {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "FESS engine: {} nodes in {} cells",
            self.tree.len(),
            self.index.cell_count()
        )?;
        for i in 0..self.index.cell_count() {
            let cell = self.index.cell(i);
            writeln!(f, "{}: {} nodes", cell.vector, cell.nodes.len())?;
        }
        write!(f, "{}", self.stats)
    }
}

pub(crate) fn is_goal(map: &GoalMap, state: &State) -> bool {
    state.boxes.iter().all(|&b| map.grid[b] == MapCell::Goal)
}
