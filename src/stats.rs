//! Incremental per-player statistics.
//!
//! The aggregate is never rebuilt from the record history: each new balance
//! is folded into the previous aggregate, or seeds a fresh one.

use tracing::{debug, instrument};

use crate::PlayerStats;

/// Folds `balance` into `prior`, or starts a new aggregate when there is none.
///
/// The average is kept unrounded; rounding is a presentation concern.
#[instrument(skip(prior), fields(has_prior = prior.is_some()))]
pub fn accumulate(prior: Option<&PlayerStats>, player_name: &str, balance: i64) -> PlayerStats {
    let next = match prior {
        None => PlayerStats::new(
            player_name.to_string(),
            1,
            balance,
            balance as f64,
            balance,
            balance,
        ),
        Some(stats) => {
            let games = stats.total_games().saturating_add(1);
            let total = stats.total_balance().saturating_add(balance);
            PlayerStats::new(
                player_name.to_string(),
                games,
                total,
                total as f64 / games as f64,
                (*stats.best_balance()).max(balance),
                (*stats.worst_balance()).min(balance),
            )
        }
    };
    debug!(
        total_games = next.total_games(),
        total_balance = next.total_balance(),
        "Statistics accumulated"
    );
    next
}

/// Builds the aggregate for a whole sequence of balances.
///
/// Returns `None` for an empty sequence.
pub fn aggregate<I>(player_name: &str, balances: I) -> Option<PlayerStats>
where
    I: IntoIterator<Item = i64>,
{
    balances
        .into_iter()
        .fold(None, |prior, b| Some(accumulate(prior.as_ref(), player_name, b)))
}
