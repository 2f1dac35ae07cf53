use jiff::{Timestamp, civil::Date};
use rust_decimal::{Decimal, prelude::ToPrimitive};
use serde::Serialize;

use crate::{
    entities::{actor, director, genre, movie, review},
    ratings::ReviewStats,
};

/// Stored timestamps are microseconds since the Unix epoch.
pub fn timestamp(micros: i64) -> Timestamp {
    Timestamp::from_microsecond(micros).unwrap_or_default()
}

pub fn now_micros() -> i64 {
    Timestamp::now().as_microsecond()
}

/// Stored movie ratings are whole tenths of a point.
pub fn rating_decimal(tenths: i32) -> Decimal {
    Decimal::new(tenths.into(), 1)
}

/// Inverse of [`rating_decimal`] for ratings already limited to one fractional digit.
pub fn rating_tenths(rating: Decimal) -> Option<i32> {
    (rating * Decimal::TEN).round().to_i32()
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GenreOut {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub movies_count: u64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl GenreOut {
    pub fn new(m: genre::Model, movies_count: u64) -> Self {
        Self {
            id: m.id,
            name: m.name,
            description: m.description,
            movies_count,
            created_at: timestamp(m.created_at),
            updated_at: timestamp(m.updated_at),
        }
    }
}

/// Base shape shared by actors and directors.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PersonOut {
    pub id: i32,
    pub name: String,
    pub birth_date: Option<Date>,
    pub nationality: String,
    pub biography: String,
    pub image_url: Option<String>,
    pub movies_count: u64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl PersonOut {
    pub fn director(m: director::Model, movies_count: u64) -> Self {
        Self {
            id: m.id,
            name: m.name,
            birth_date: m.birth_date.and_then(|d| d.parse().ok()),
            nationality: m.nationality,
            biography: m.biography,
            image_url: m.image_url,
            movies_count,
            created_at: timestamp(m.created_at),
            updated_at: timestamp(m.updated_at),
        }
    }

    pub fn actor(m: actor::Model, movies_count: u64) -> Self {
        Self {
            id: m.id,
            name: m.name,
            birth_date: m.birth_date.and_then(|d| d.parse().ok()),
            nationality: m.nationality,
            biography: m.biography,
            image_url: m.image_url,
            movies_count,
            created_at: timestamp(m.created_at),
            updated_at: timestamp(m.updated_at),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct PersonDetail {
    #[serde(flatten)]
    pub person: PersonOut,
    pub movies: Vec<MovieSummary>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ReviewOut {
    pub id: i32,
    pub movie: i32,
    pub reviewer_name: String,
    pub rating: i32,
    pub comment: String,
    pub is_featured: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<review::Model> for ReviewOut {
    fn from(m: review::Model) -> Self {
        Self {
            id: m.id,
            movie: m.movie_id,
            reviewer_name: m.reviewer_name,
            rating: m.rating,
            comment: m.comment,
            is_featured: m.is_featured,
            created_at: timestamp(m.created_at),
            updated_at: timestamp(m.updated_at),
        }
    }
}

/// List shape: scalars plus relation names, no nested objects.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MovieSummary {
    pub id: i32,
    pub title: String,
    pub release_year: i32,
    pub rating: Option<Decimal>,
    pub poster_url: Option<String>,
    pub backdrop_url: Option<String>,
    pub director_name: String,
    pub genres: Vec<String>,
    pub average_rating: Option<f64>,
    pub review_count: u64,
}

impl MovieSummary {
    pub fn new(m: movie::Model, director_name: String, genres: Vec<String>, stats: ReviewStats) -> Self {
        Self {
            id: m.id,
            title: m.title,
            release_year: m.release_year,
            rating: m.rating.map(rating_decimal),
            poster_url: m.poster_url,
            backdrop_url: m.backdrop_url,
            director_name,
            genres,
            average_rating: stats.average_as_f64(),
            review_count: stats.review_count,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct MovieDetail {
    pub id: i32,
    pub title: String,
    pub release_year: i32,
    pub duration: Option<i32>,
    pub plot: String,
    pub poster_url: Option<String>,
    pub backdrop_url: Option<String>,
    pub rating: Option<Decimal>,
    pub director: PersonOut,
    pub actors: Vec<PersonOut>,
    pub genres: Vec<GenreOut>,
    pub reviews: Vec<ReviewOut>,
    pub average_rating: Option<f64>,
    pub review_count: u64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_rating_renders_with_one_decimal() {
        assert_eq!(rating_decimal(88).to_string(), "8.8");
        assert_eq!(rating_decimal(90).to_string(), "9.0");
        assert_eq!(rating_decimal(0).to_string(), "0.0");
        assert_eq!(rating_decimal(100).to_string(), "10.0");
    }

    #[test]
    fn ratings_convert_to_tenths() {
        assert_eq!(rating_tenths(Decimal::new(88, 1)), Some(88));
        assert_eq!(rating_tenths(Decimal::from(9)), Some(90));
        assert_eq!(rating_tenths(Decimal::ZERO), Some(0));
    }

    #[test]
    fn out_of_range_timestamp_falls_back_to_epoch() {
        assert_eq!(timestamp(i64::MAX), Timestamp::UNIX_EPOCH);
        assert_eq!(timestamp(1_000_000).as_second(), 1);
    }
}
