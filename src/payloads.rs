//! Write payloads and their merge onto stored records.
//!
//! Every input field is optional at the type level. [`WriteMode`] decides whether an
//! omitted field is an error (create, replace) or keeps the stored value (partial update).
//! Checks that need the database (existence of referenced ids, uniqueness) live in the
//! store; everything here is pure.

use jiff::civil::Date;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};

use crate::{
    entities::{actor, director, genre, movie, review},
    error::FieldErrors,
    models::rating_decimal,
};

pub const MIN_RELEASE_YEAR: i32 = 1900;
pub const MAX_RELEASE_YEAR: i32 = 2030;
pub const MIN_REVIEW_RATING: i32 = 1;
pub const MAX_REVIEW_RATING: i32 = 10;

const REQUIRED: &str = "This field is required.";
const BLANK: &str = "This field may not be blank.";
const NULL: &str = "This field may not be null.";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum WriteMode {
    Create,
    Replace,
    Patch,
}

/// Deserializes a present field (including explicit `null`) as `Some`, so that
/// `#[serde(default)]` leaves an absent one as `None`.
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Resolves a required field: the input wins, a patch falls back to the stored value,
/// anything else is reported as missing. An explicit `null` is never accepted.
fn required<T>(
    errors: &mut FieldErrors,
    field: &str,
    input: Option<Option<T>>,
    stored: Option<T>,
    mode: WriteMode,
) -> Option<T> {
    match (input, mode) {
        (Some(Some(value)), _) => Some(value),
        (Some(None), _) => {
            errors.add(field, NULL);
            None
        },
        (None, WriteMode::Patch) => stored,
        (None, _) => {
            errors.add(field, REQUIRED);
            None
        },
    }
}

fn check_text(errors: &mut FieldErrors, field: &str, value: String, max_chars: Option<usize>, allow_blank: bool) -> String {
    let value = value.trim().to_string();
    if value.is_empty() && !allow_blank {
        errors.add(field, BLANK);
    }
    if let Some(max) = max_chars {
        if value.chars().count() > max {
            errors.add(field, format!("Ensure this field has no more than {max} characters."));
        }
    }
    value
}

/// Empty strings mean "no URL"; anything else must be an absolute http(s) URL.
fn check_url(errors: &mut FieldErrors, field: &str, value: Option<String>) -> Option<String> {
    let value = value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())?;
    match url::Url::parse(&value) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") && parsed.has_host() => {
            Some(value)
        },
        _ => {
            errors.add(field, "Enter a valid URL.");
            None
        },
    }
}

fn into_result<T>(errors: FieldErrors, value: Option<T>) -> Result<T, FieldErrors> {
    match value {
        Some(value) if errors.is_empty() => Ok(value),
        _ => Err(errors),
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct GenreInput {
    #[serde(default, deserialize_with = "nullable")]
    pub name: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct GenreDraft {
    pub name: String,
    pub description: Option<String>,
}

impl GenreInput {
    pub fn merge(self, stored: Option<&genre::Model>, mode: WriteMode) -> Result<GenreDraft, FieldErrors> {
        let mut errors = FieldErrors::default();
        let name = required(&mut errors, "name", self.name, stored.map(|g| g.name.clone()), mode)
            .map(|n| check_text(&mut errors, "name", n, Some(100), false));
        let description = match self.description {
            Some(d) => d.map(|d| d.trim().to_string()).filter(|d| !d.is_empty()),
            None => stored.and_then(|g| g.description.clone()),
        };
        into_result(errors, name.map(|name| GenreDraft { name, description }))
    }
}

/// Payload for actors and directors, which share a shape.
#[derive(Debug, Default, Deserialize)]
pub struct PersonInput {
    #[serde(default, deserialize_with = "nullable")]
    pub name: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub birth_date: Option<Option<Date>>,
    #[serde(default, deserialize_with = "nullable")]
    pub nationality: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub biography: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub image_url: Option<Option<String>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PersonDraft {
    pub name: String,
    pub birth_date: Option<Date>,
    pub nationality: String,
    pub biography: String,
    pub image_url: Option<String>,
}

/// Stored fields of a person, whichever table it came from.
#[derive(Clone, Debug)]
pub struct StoredPerson {
    pub name: String,
    pub birth_date: Option<Date>,
    pub nationality: String,
    pub biography: String,
    pub image_url: Option<String>,
}

impl From<&director::Model> for StoredPerson {
    fn from(m: &director::Model) -> Self {
        Self {
            name: m.name.clone(),
            birth_date: m.birth_date.as_deref().and_then(|d| d.parse().ok()),
            nationality: m.nationality.clone(),
            biography: m.biography.clone(),
            image_url: m.image_url.clone(),
        }
    }
}

impl From<&actor::Model> for StoredPerson {
    fn from(m: &actor::Model) -> Self {
        Self {
            name: m.name.clone(),
            birth_date: m.birth_date.as_deref().and_then(|d| d.parse().ok()),
            nationality: m.nationality.clone(),
            biography: m.biography.clone(),
            image_url: m.image_url.clone(),
        }
    }
}

impl PersonInput {
    pub fn merge(self, stored: Option<StoredPerson>, mode: WriteMode) -> Result<PersonDraft, FieldErrors> {
        let mut errors = FieldErrors::default();
        let name = required(&mut errors, "name", self.name, stored.as_ref().map(|p| p.name.clone()), mode)
            .map(|n| check_text(&mut errors, "name", n, Some(200), false));

        let birth_date = match self.birth_date {
            Some(d) => d,
            None => stored.as_ref().and_then(|p| p.birth_date),
        };
        let nationality = match self.nationality {
            Some(n) => n.unwrap_or_default(),
            None => stored.as_ref().map(|p| p.nationality.clone()).unwrap_or_default(),
        };
        let nationality = check_text(&mut errors, "nationality", nationality, Some(100), true);
        let biography = match self.biography {
            Some(b) => b.unwrap_or_default().trim().to_string(),
            None => stored.as_ref().map(|p| p.biography.clone()).unwrap_or_default(),
        };
        let image_url = match self.image_url {
            Some(url) => check_url(&mut errors, "image_url", url),
            None => stored.and_then(|p| p.image_url),
        };

        into_result(
            errors,
            name.map(|name| PersonDraft { name, birth_date, nationality, biography, image_url }),
        )
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct MovieInput {
    #[serde(default, deserialize_with = "nullable")]
    pub title: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub release_year: Option<Option<i32>>,
    #[serde(default, deserialize_with = "nullable")]
    pub duration: Option<Option<i32>>,
    #[serde(default, deserialize_with = "nullable")]
    pub plot: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub poster_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub backdrop_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub rating: Option<Option<Decimal>>,
    #[serde(default, deserialize_with = "nullable")]
    pub director_id: Option<Option<i32>>,
    pub actor_ids: Option<Vec<i32>>,
    pub genre_ids: Option<Vec<i32>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MovieDraft {
    pub title: String,
    pub release_year: i32,
    pub duration: Option<i32>,
    pub plot: String,
    pub poster_url: Option<String>,
    pub backdrop_url: Option<String>,
    pub rating: Option<Decimal>,
    pub director_id: i32,
    /// `None` leaves the stored membership untouched.
    pub actor_ids: Option<Vec<i32>>,
    pub genre_ids: Option<Vec<i32>>,
}

fn check_movie_rating(errors: &mut FieldErrors, rating: Decimal) -> Decimal {
    let rating = rating.normalize();
    if rating.scale() > 1 {
        errors.add("rating", "Ensure that there are no more than 1 decimal places.");
    } else if rating.mantissa().unsigned_abs() >= 1000 {
        errors.add("rating", "Ensure that there are no more than 3 digits in total.");
    }
    if rating < Decimal::ZERO {
        errors.add("rating", "Ensure this value is greater than or equal to 0.0.");
    } else if rating > Decimal::TEN {
        errors.add("rating", "Ensure this value is less than or equal to 10.0.");
    }
    rating
}

fn dedup_ids(mut ids: Vec<i32>) -> Vec<i32> {
    ids.sort_unstable();
    ids.dedup();
    ids
}

impl MovieInput {
    pub fn merge(self, stored: Option<&movie::Model>, mode: WriteMode) -> Result<MovieDraft, FieldErrors> {
        let mut errors = FieldErrors::default();

        let title = required(&mut errors, "title", self.title, stored.map(|m| m.title.clone()), mode)
            .map(|t| check_text(&mut errors, "title", t, Some(300), false));

        let release_year =
            required(&mut errors, "release_year", self.release_year, stored.map(|m| m.release_year), mode);
        if let Some(year) = release_year {
            if year < MIN_RELEASE_YEAR {
                errors.add("release_year", format!("Ensure this value is greater than or equal to {MIN_RELEASE_YEAR}."));
            } else if year > MAX_RELEASE_YEAR {
                errors.add("release_year", format!("Ensure this value is less than or equal to {MAX_RELEASE_YEAR}."));
            }
        }

        let director_id =
            required(&mut errors, "director_id", self.director_id, stored.map(|m| m.director_id), mode);

        let genre_ids = match (self.genre_ids, mode) {
            (Some(ids), _) => Some(dedup_ids(ids)),
            (None, WriteMode::Patch) => None,
            (None, _) => {
                errors.add("genre_ids", REQUIRED);
                None
            },
        };
        let actor_ids = self.actor_ids.map(dedup_ids);

        let duration = match self.duration {
            Some(d) => d,
            None => stored.and_then(|m| m.duration),
        };
        let plot = match self.plot {
            Some(p) => p.unwrap_or_default().trim().to_string(),
            None => stored.map(|m| m.plot.clone()).unwrap_or_default(),
        };
        let poster_url = match self.poster_url {
            Some(url) => check_url(&mut errors, "poster_url", url),
            None => stored.and_then(|m| m.poster_url.clone()),
        };
        let backdrop_url = match self.backdrop_url {
            Some(url) => check_url(&mut errors, "backdrop_url", url),
            None => stored.and_then(|m| m.backdrop_url.clone()),
        };
        let rating = match self.rating {
            Some(r) => r.map(|r| check_movie_rating(&mut errors, r)),
            None => stored.and_then(|m| m.rating).map(rating_decimal),
        };

        let draft = match (title, release_year, director_id) {
            (Some(title), Some(release_year), Some(director_id)) => Some(MovieDraft {
                title,
                release_year,
                duration,
                plot,
                poster_url,
                backdrop_url,
                rating,
                director_id,
                actor_ids,
                genre_ids,
            }),
            _ => None,
        };
        into_result(errors, draft)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ReviewInput {
    #[serde(default, deserialize_with = "nullable")]
    pub movie: Option<Option<i32>>,
    #[serde(default, deserialize_with = "nullable")]
    pub reviewer_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub rating: Option<Option<i32>>,
    #[serde(default, deserialize_with = "nullable")]
    pub comment: Option<Option<String>>,
    pub is_featured: Option<bool>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ReviewDraft {
    pub movie_id: i32,
    pub reviewer_name: String,
    pub rating: i32,
    pub comment: String,
    pub is_featured: bool,
}

impl ReviewInput {
    pub fn merge(self, stored: Option<&review::Model>, mode: WriteMode) -> Result<ReviewDraft, FieldErrors> {
        let mut errors = FieldErrors::default();

        let movie_id = required(&mut errors, "movie", self.movie, stored.map(|r| r.movie_id), mode);
        let reviewer_name = required(
            &mut errors,
            "reviewer_name",
            self.reviewer_name,
            stored.map(|r| r.reviewer_name.clone()),
            mode,
        )
        .map(|n| check_text(&mut errors, "reviewer_name", n, Some(200), false));

        let rating = required(&mut errors, "rating", self.rating, stored.map(|r| r.rating), mode);
        if let Some(rating) = rating {
            if rating < MIN_REVIEW_RATING {
                errors.add("rating", format!("Ensure this value is greater than or equal to {MIN_REVIEW_RATING}."));
            } else if rating > MAX_REVIEW_RATING {
                errors.add("rating", format!("Ensure this value is less than or equal to {MAX_REVIEW_RATING}."));
            }
        }

        let comment = required(&mut errors, "comment", self.comment, stored.map(|r| r.comment.clone()), mode)
            .map(|c| check_text(&mut errors, "comment", c, None, false));

        let is_featured = self.is_featured.or(stored.map(|r| r.is_featured)).unwrap_or(false);

        let draft = match (movie_id, reviewer_name, rating, comment) {
            (Some(movie_id), Some(reviewer_name), Some(rating), Some(comment)) => {
                Some(ReviewDraft { movie_id, reviewer_name, rating, comment, is_featured })
            },
            _ => None,
        };
        into_result(errors, draft)
    }
}
