//! Majority vote over the dates proposed by the individual engines.

use chrono::NaiveDate;
use tracing::info;

/// How the winning date was reached.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Agreement {
    /// Every candidate is the same date
    Unanimous,
    /// One date has strictly more votes than any other
    Majority,
    /// Several dates share the top count; the first one seen wins
    TieBreak,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolution {
    pub date: NaiveDate,
    pub agreement: Agreement,
    /// Distinct dates with their vote counts, best first
    pub ranking: Vec<(NaiveDate, usize)>,
}

/// Ranks distinct dates by descending count. Equal counts keep the order in
/// which each date first appeared.
pub fn rank_candidates(candidates: &[NaiveDate]) -> Vec<(NaiveDate, usize)> {
    let mut ranking: Vec<(NaiveDate, usize)> = Vec::new();
    for &date in candidates {
        match ranking.iter_mut().find(|(d, _)| *d == date) {
            Some((_, count)) => *count += 1,
            None => ranking.push((date, 1)),
        }
    }
    // sort_by is stable
    ranking.sort_by(|a, b| b.1.cmp(&a.1));
    ranking
}

/// Picks one date out of the candidates, or `None` when there are none.
pub fn resolve(candidates: &[NaiveDate]) -> Option<Resolution> {
    let ranking = rank_candidates(candidates);
    let &(date, top_count) = ranking.first()?;

    let agreement = if ranking.len() == 1 {
        Agreement::Unanimous
    } else if ranking.get(1).is_some_and(|&(_, count)| count == top_count) {
        Agreement::TieBreak
    } else {
        Agreement::Majority
    };

    let summary = format_ranking(&ranking);
    match agreement {
        Agreement::Unanimous => info!("OCR results - all agree: {}", summary),
        Agreement::Majority => info!("OCR results - majority vote: {}", summary),
        Agreement::TieBreak => info!("OCR results - tie, first seen wins: {}", summary),
    }

    Some(Resolution {
        date,
        agreement,
        ranking,
    })
}

fn format_ranking(ranking: &[(NaiveDate, usize)]) -> String {
    ranking
        .iter()
        .map(|(date, count)| format!("{}x{}", date, count))
        .collect::<Vec<_>>()
        .join(", ")
}
