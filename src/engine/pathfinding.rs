use tracing::debug;

use crate::types::{Direction, Vec2};
use crate::world::GridMap;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PathPlan {
    pub moves: Vec<Direction>,
    pub destination: Vec2,
    pub reached_goal: bool,
    pub iterations: usize,
}

#[derive(Clone, Debug)]
struct Node {
    pos: Vec2,
    parent: Option<usize>,
    dir: Option<Direction>,
    g: u32,
    h: u32,
}

impl Node {
    fn f(&self) -> u32 {
        self.g + self.h
    }
}

pub fn find_path(map: &GridMap, start: Vec2, goal: Vec2, iter_cap: usize) -> PathPlan {
    if start == goal {
        return PathPlan {
            moves: Vec::new(),
            destination: start,
            reached_goal: true,
            iterations: 0,
        };
    }
    if !map.is_open_at(start) {
        return PathPlan {
            moves: Vec::new(),
            destination: start,
            reached_goal: false,
            iterations: 0,
        };
    }

    let side = map.side();
    let slot = |pos: Vec2| pos.y as usize * side + pos.x as usize;
    let heuristic = |pos: Vec2| pos.manhattan(goal) as u32;

    let mut nodes = vec![Node {
        pos: start,
        parent: None,
        dir: None,
        g: 0,
        h: heuristic(start),
    }];
    // Cell slot -> node index, for cells that have a node at all.
    let mut node_at: Vec<Option<usize>> = vec![None; side * side];
    let mut closed = vec![false; side * side];
    let mut open: Vec<usize> = vec![0];
    node_at[slot(start)] = Some(0);

    let mut result = None;
    let mut iterations = 0;

    while !open.is_empty() && iterations < iter_cap {
        iterations += 1;

        // Lowest f wins; ties go to whichever entered the open list first.
        let mut best = 0;
        for (i, &node_idx) in open.iter().enumerate() {
            if nodes[node_idx].f() < nodes[open[best]].f() {
                best = i;
            }
        }
        let focus = open.remove(best);
        let focus_pos = nodes[focus].pos;
        closed[slot(focus_pos)] = true;

        if focus_pos == goal {
            result = Some(focus);
            break;
        }

        let tentative_g = nodes[focus].g + 1;
        for (dir, next) in map.neighbors(focus_pos) {
            if closed[slot(next)] {
                continue;
            }
            match node_at[slot(next)] {
                Some(existing) => {
                    if nodes[existing].g > tentative_g {
                        let node = &mut nodes[existing];
                        node.g = tentative_g;
                        node.parent = Some(focus);
                        node.dir = Some(dir);
                    }
                }
                None => {
                    let idx = nodes.len();
                    nodes.push(Node {
                        pos: next,
                        parent: Some(focus),
                        dir: Some(dir),
                        g: tentative_g,
                        h: heuristic(next),
                    });
                    node_at[slot(next)] = Some(idx);
                    open.push(idx);
                }
            }
        }
    }

    let reached_goal = result.is_some();
    let chosen = match result {
        Some(idx) => idx,
        None => {
            let fallback = best_effort(&nodes);
            debug!(
                start_x = start.x,
                start_y = start.y,
                goal_x = goal.x,
                goal_y = goal.y,
                iterations,
                "goal not reached, heading for best explored cell"
            );
            fallback
        }
    };

    let mut moves = Vec::new();
    let mut cursor = Some(chosen);
    while let Some(idx) = cursor {
        if let Some(dir) = nodes[idx].dir {
            moves.push(dir);
        }
        cursor = nodes[idx].parent;
    }
    moves.reverse();

    PathPlan {
        moves,
        destination: nodes[chosen].pos,
        reached_goal,
        iterations,
    }
}

/// Lowest f over every explored node; ties prefer the node nearer the goal,
/// then discovery order.
fn best_effort(nodes: &[Node]) -> usize {
    let mut best = 0;
    for (idx, node) in nodes.iter().enumerate() {
        let current = &nodes[best];
        if (node.f(), node.h) < (current.f(), current.h) {
            best = idx;
        }
    }
    best
}
