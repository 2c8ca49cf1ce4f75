use super::types::{GameState, PlayerState, SnakePoint};
use crate::shared::validate::in_bounds;

pub fn is_wall(point: SnakePoint, width: i32, height: i32) -> bool {
    !in_bounds(point.x, point.y, width, height)
}

/// Hit against the snake's own body, head excluded.
pub fn is_self(point: SnakePoint, player: &PlayerState) -> bool {
    player.body.len() >= 2 && player.body[1..].contains(&point)
}

pub fn is_snake(point: SnakePoint, player: &PlayerState) -> bool {
    player.body.contains(&point)
}

pub fn candidate_heads(state: &GameState) -> Vec<Option<SnakePoint>> {
    state
        .players
        .iter()
        .map(|player| {
            if !player.active {
                return None;
            }
            player.head().map(|head| player.current_dir.step(head))
        })
        .collect()
}

/// Marks every player whose candidate head collides, judged against the
/// bodies as they were before anyone moved. A tail is treated as vacated
/// when its owner is not about to eat.
pub fn detect(state: &GameState) -> Vec<bool> {
    let heads = candidate_heads(state);
    let will_eat: Vec<bool> = heads
        .iter()
        .map(|head| head.map_or(false, |head| state.is_food(head)))
        .collect();
    let mut marked = vec![false; state.players.len()];

    for (index, player) in state.players.iter().enumerate() {
        let Some(next) = heads[index] else { continue };

        if is_wall(next, state.width, state.height) {
            marked[index] = true;
            continue;
        }

        if is_self(next, player) {
            let vacating = player.tail() == Some(next) && !will_eat[index];
            if !vacating {
                marked[index] = true;
                continue;
            }
        }

        for (other_index, other) in state.players.iter().enumerate() {
            if other_index == index || heads[other_index].is_none() {
                continue;
            }
            if !is_snake(next, other) {
                continue;
            }
            let vacating = other.tail() == Some(next) && !will_eat[other_index];
            if !vacating {
                marked[index] = true;
                break;
            }
        }
    }

    for a in 0..heads.len() {
        let Some(next_a) = heads[a] else { continue };
        for b in (a + 1)..heads.len() {
            let Some(next_b) = heads[b] else { continue };
            if next_a == next_b {
                marked[a] = true;
                marked[b] = true;
                continue;
            }
            let swapped = state.players[b].head() == Some(next_a)
                && state.players[a].head() == Some(next_b);
            if swapped {
                marked[a] = true;
                marked[b] = true;
            }
        }
    }

    marked
}
