//! Pure rule functions: how many mafia, how roles are dealt, who has won.

use rand::Rng;
use rand::seq::SliceRandom;

use crate::{Role, Side};

/// Fewest players a game can start with: two mafia, the detective, the
/// doctor, and at least two villagers.
pub const MIN_PLAYERS: usize = 6;

/// Mafia headcount for a table of `player_count` players.
pub fn mafia_count(player_count: usize) -> usize {
    match player_count {
        0..=8 => 2,
        9..=12 => 3,
        _ => 4,
    }
}

/// Builds the role multiset for `player_count` players and shuffles it.
///
/// The result has exactly one role per player: [`mafia_count`] mafia, one
/// detective, one doctor, villagers for the rest. The shuffle is an
/// unbiased Fisher-Yates permutation driven by `rng`.
pub fn deal_roles(player_count: usize, rng: &mut impl Rng) -> Vec<Role> {
    let mafia = mafia_count(player_count);
    let mut roles = Vec::with_capacity(player_count);
    roles.extend(std::iter::repeat_n(Role::Mafia, mafia));
    roles.push(Role::Detective);
    roles.push(Role::Doctor);
    roles.resize(player_count.max(roles.len()), Role::Villager);
    roles.shuffle(rng);
    roles
}

/// Decides the winner from living headcounts, or `None` if play goes on.
///
/// Villagers are checked first, so an empty table counts as a villager
/// win.
pub fn evaluate_win(living_mafia: usize, living_others: usize) -> Option<Side> {
    if living_mafia == 0 {
        Some(Side::Villagers)
    } else if living_mafia >= living_others {
        Some(Side::Mafia)
    } else {
        None
    }
}
