//! Values derived from related rows at read time. Nothing here is stored.

use std::collections::HashMap;

use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QuerySelect};

use crate::{
    entities::{movie, movie_actor, movie_genre, review},
    error::AppResult,
};

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ReviewStats {
    pub review_count: u64,
    pub average_rating: Option<Decimal>,
}

impl ReviewStats {
    pub fn from_ratings(ratings: &[i32]) -> Self {
        if ratings.is_empty() {
            return Self::default();
        }
        let sum: i64 = ratings.iter().map(|&r| i64::from(r)).sum();
        let mean = Decimal::from(sum) / Decimal::from(ratings.len() as u64);
        Self {
            review_count: ratings.len() as u64,
            average_rating: Some(
                mean.round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero),
            ),
        }
    }

    pub fn average_as_f64(&self) -> Option<f64> {
        self.average_rating.and_then(|d| d.to_f64())
    }
}

/// Review statistics for each of `movie_ids`. Movies without reviews map to the empty stats.
pub async fn review_stats<C: ConnectionTrait>(
    conn: &C,
    movie_ids: &[i32],
) -> AppResult<HashMap<i32, ReviewStats>> {
    if movie_ids.is_empty() {
        return Ok(HashMap::new());
    }
    let mut ratings: HashMap<i32, Vec<i32>> =
        movie_ids.iter().map(|&id| (id, Vec::new())).collect();

    let rows: Vec<(i32, i32)> = review::Entity::find()
        .select_only()
        .column(review::Column::MovieId)
        .column(review::Column::Rating)
        .filter(review::Column::MovieId.is_in(movie_ids.iter().copied()))
        .into_tuple()
        .all(conn)
        .await?;

    for (movie_id, rating) in rows {
        ratings.entry(movie_id).or_default().push(rating);
    }

    Ok(ratings.into_iter().map(|(id, r)| (id, ReviewStats::from_ratings(&r))).collect())
}

/// Which relation to count when computing `movies_count`.
#[derive(Clone, Copy, Debug)]
pub enum MovieLink {
    Director,
    Actor,
    Genre,
}

/// Number of related movies for each of `ids`.
pub async fn movie_counts<C: ConnectionTrait>(
    conn: &C,
    link: MovieLink,
    ids: &[i32],
) -> AppResult<HashMap<i32, u64>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let ids = ids.iter().copied();

    let owners: Vec<i32> = match link {
        MovieLink::Director => {
            movie::Entity::find()
                .select_only()
                .column(movie::Column::DirectorId)
                .filter(movie::Column::DirectorId.is_in(ids))
                .into_tuple()
                .all(conn)
                .await?
        },
        MovieLink::Actor => {
            movie_actor::Entity::find()
                .select_only()
                .column(movie_actor::Column::ActorId)
                .filter(movie_actor::Column::ActorId.is_in(ids))
                .into_tuple()
                .all(conn)
                .await?
        },
        MovieLink::Genre => {
            movie_genre::Entity::find()
                .select_only()
                .column(movie_genre::Column::GenreId)
                .filter(movie_genre::Column::GenreId.is_in(ids))
                .into_tuple()
                .all(conn)
                .await?
        },
    };

    let mut counts = HashMap::new();
    for owner in owners {
        *counts.entry(owner).or_insert(0u64) += 1;
    }
    Ok(counts)
}
