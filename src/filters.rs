//! Query-parameter filters for each collection.
//!
//! Parameters are read from a name to value map. Empty values count as absent, unknown
//! names are ignored, and every recognised parameter adds one predicate to an AND.
//! Relationship lookups are `IN (subquery)` so joins never duplicate rows.

use std::{collections::BTreeMap, str::FromStr};

use rust_decimal::{Decimal, prelude::ToPrimitive};
use sea_orm::{
    ColumnTrait, Condition, Order, QueryOrder, Select,
    sea_query::{Expr, Func, IntoColumnRef, LikeExpr, Query, SelectStatement, SimpleExpr},
};

use crate::{
    entities::{actor, director, genre, movie, movie_actor, movie_genre, review},
    error::{AppError, AppResult, FieldErrors},
};

pub type Params = BTreeMap<String, String>;

/// Typed access to filter parameters, collecting parse failures per parameter.
struct Reader<'a> {
    params: &'a Params,
    errors: FieldErrors,
}

impl<'a> Reader<'a> {
    fn new(params: &'a Params) -> Self {
        Self { params, errors: FieldErrors::default() }
    }

    fn text(&self, key: &str) -> Option<&'a str> {
        self.params.get(key).map(|v| v.trim()).filter(|v| !v.is_empty())
    }

    fn parse<T: FromStr>(&mut self, key: &str, message: &str) -> Option<T> {
        let raw = self.text(key)?;
        match raw.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                self.errors.add(key, message);
                None
            },
        }
    }

    fn int(&mut self, key: &str) -> Option<i32> {
        self.parse(key, "Enter a whole number.")
    }

    /// A movie rating bound in stored tenths, rounded with `round` so fractional tenths
    /// keep the comparison exact. Out-of-range bounds are clamped.
    fn rating_tenths(&mut self, key: &str, round: fn(&Decimal) -> Decimal) -> Option<i32> {
        let rating = self.parse::<Decimal>(key, "Enter a number.")?;
        let rating = rating.clamp(Decimal::from(-1000), Decimal::from(1000));
        round(&(rating * Decimal::TEN)).to_i32()
    }

    fn boolean(&mut self, key: &str) -> Option<bool> {
        let raw = self.text(key)?;
        match raw.to_ascii_lowercase().as_str() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => {
                self.errors.add(key, "Select a valid choice. Must be true or false.");
                None
            },
        }
    }

    fn finish(self, condition: Condition) -> AppResult<Condition> {
        self.errors.into_result().map(|_| condition)
    }
}

fn escape_like(needle: &str) -> String {
    let mut out = String::with_capacity(needle.len());
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Case-insensitive substring match.
pub fn icontains<C: IntoColumnRef>(column: C, needle: &str) -> SimpleExpr {
    let pattern = format!("%{}%", escape_like(&needle.to_lowercase()));
    Expr::expr(Func::lower(Expr::col(column))).like(LikeExpr::new(pattern).escape('\\'))
}

fn movies_with_actor(predicate: SimpleExpr) -> SelectStatement {
    Query::select()
        .column((movie_actor::Entity, movie_actor::Column::MovieId))
        .from(movie_actor::Entity)
        .inner_join(
            actor::Entity,
            Expr::col((actor::Entity, actor::Column::Id))
                .equals((movie_actor::Entity, movie_actor::Column::ActorId)),
        )
        .and_where(predicate)
        .to_owned()
}

fn movies_with_genre(predicate: SimpleExpr) -> SelectStatement {
    Query::select()
        .column((movie_genre::Entity, movie_genre::Column::MovieId))
        .from(movie_genre::Entity)
        .inner_join(
            genre::Entity,
            Expr::col((genre::Entity, genre::Column::Id))
                .equals((movie_genre::Entity, movie_genre::Column::GenreId)),
        )
        .and_where(predicate)
        .to_owned()
}

fn actors_in_movies(predicate: SimpleExpr) -> SelectStatement {
    Query::select()
        .column((movie_actor::Entity, movie_actor::Column::ActorId))
        .from(movie_actor::Entity)
        .inner_join(
            movie::Entity,
            Expr::col((movie::Entity, movie::Column::Id))
                .equals((movie_actor::Entity, movie_actor::Column::MovieId)),
        )
        .and_where(predicate)
        .to_owned()
}

fn actors_in_genre(predicate: SimpleExpr) -> SelectStatement {
    Query::select()
        .column((movie_actor::Entity, movie_actor::Column::ActorId))
        .from(movie_actor::Entity)
        .inner_join(
            movie_genre::Entity,
            Expr::col((movie_genre::Entity, movie_genre::Column::MovieId))
                .equals((movie_actor::Entity, movie_actor::Column::MovieId)),
        )
        .inner_join(
            genre::Entity,
            Expr::col((genre::Entity, genre::Column::Id))
                .equals((movie_genre::Entity, movie_genre::Column::GenreId)),
        )
        .and_where(predicate)
        .to_owned()
}

fn directors_of_movies(predicate: SimpleExpr) -> SelectStatement {
    Query::select()
        .column((movie::Entity, movie::Column::DirectorId))
        .from(movie::Entity)
        .and_where(predicate)
        .to_owned()
}

fn movie_ids(predicate: SimpleExpr) -> SelectStatement {
    Query::select()
        .column((movie::Entity, movie::Column::Id))
        .from(movie::Entity)
        .and_where(predicate)
        .to_owned()
}

pub fn movie_condition(params: &Params) -> AppResult<Condition> {
    let mut r = Reader::new(params);
    let mut cond = Condition::all();

    if let Some(title) = r.text("title") {
        cond = cond.add(icontains((movie::Entity, movie::Column::Title), title));
    }
    if let Some(year) = r.int("release_year") {
        cond = cond.add(movie::Column::ReleaseYear.eq(year));
    }
    if let Some(year) = r.int("release_year_gte") {
        cond = cond.add(movie::Column::ReleaseYear.gte(year));
    }
    if let Some(year) = r.int("release_year_lte") {
        cond = cond.add(movie::Column::ReleaseYear.lte(year));
    }
    if let Some(name) = r.text("director") {
        cond = cond.add(movies_by_director_named(name));
    }
    if let Some(id) = r.int("director_id") {
        cond = cond.add(movie::Column::DirectorId.eq(id));
    }
    if let Some(name) = r.text("actor") {
        cond = cond.add(
            movie::Column::Id
                .in_subquery(movies_with_actor(icontains((actor::Entity, actor::Column::Name), name))),
        );
    }
    if let Some(id) = r.int("actor_id") {
        cond = cond.add(movie::Column::Id.in_subquery(movies_with_actor(
            Expr::col((movie_actor::Entity, movie_actor::Column::ActorId)).eq(id),
        )));
    }
    if let Some(name) = r.text("genre") {
        cond = cond.add(movies_in_genre_named(name));
    }
    if let Some(id) = r.int("genre_id") {
        cond = cond.add(movie::Column::Id.in_subquery(movies_with_genre(
            Expr::col((movie_genre::Entity, movie_genre::Column::GenreId)).eq(id),
        )));
    }
    if let Some(rating) = r.rating_tenths("rating_gte", Decimal::ceil) {
        cond = cond.add(movie::Column::Rating.gte(rating));
    }
    if let Some(rating) = r.rating_tenths("rating_lte", Decimal::floor) {
        cond = cond.add(movie::Column::Rating.lte(rating));
    }

    r.finish(cond)
}

/// Movies with a genre whose name contains `name`.
pub fn movies_in_genre_named(name: &str) -> SimpleExpr {
    movie::Column::Id
        .in_subquery(movies_with_genre(icontains((genre::Entity, genre::Column::Name), name)))
}

/// Movies whose director name contains `name`.
pub fn movies_by_director_named(name: &str) -> SimpleExpr {
    movie::Column::DirectorId.in_subquery(
        Query::select()
            .column((director::Entity, director::Column::Id))
            .from(director::Entity)
            .and_where(icontains((director::Entity, director::Column::Name), name))
            .to_owned(),
    )
}

/// Applies `ordering` (e.g. `-rating,title`) or the default movie ordering.
pub fn order_movies(select: Select<movie::Entity>, params: &Params) -> AppResult<Select<movie::Entity>> {
    let Some(raw) = params.get("ordering").map(|o| o.trim()).filter(|o| !o.is_empty()) else {
        return Ok(default_movie_order(select));
    };

    let mut keys = Vec::new();
    for term in raw.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        let (name, order) = match term.strip_prefix('-') {
            Some(name) => (name, Order::Desc),
            None => (term, Order::Asc),
        };
        let column = match name {
            "title" => movie::Column::Title,
            "release_year" => movie::Column::ReleaseYear,
            "rating" => movie::Column::Rating,
            "created_at" => movie::Column::CreatedAt,
            _ => {
                return Err(AppError::Validation(FieldErrors::single(
                    "ordering",
                    format!("Select a valid choice. {term} is not one of the available choices."),
                )));
            },
        };
        keys.push((column, order));
    }

    if keys.is_empty() {
        return Ok(default_movie_order(select));
    }
    let select = keys.into_iter().fold(select, |s, (col, order)| s.order_by(col, order));
    Ok(select.order_by_asc(movie::Column::Id))
}

pub fn default_movie_order(select: Select<movie::Entity>) -> Select<movie::Entity> {
    select
        .order_by_desc(movie::Column::ReleaseYear)
        .order_by_asc(movie::Column::Title)
        .order_by_asc(movie::Column::Id)
}

pub fn actor_condition(params: &Params) -> AppResult<Condition> {
    let mut r = Reader::new(params);
    let mut cond = Condition::all();

    if let Some(name) = r.text("name") {
        cond = cond.add(icontains((actor::Entity, actor::Column::Name), name));
    }
    if let Some(nationality) = r.text("nationality") {
        cond = cond.add(icontains((actor::Entity, actor::Column::Nationality), nationality));
    }
    if let Some(title) = r.text("movie") {
        cond = cond.add(
            actor::Column::Id
                .in_subquery(actors_in_movies(icontains((movie::Entity, movie::Column::Title), title))),
        );
    }
    if let Some(id) = r.int("movie_id") {
        cond = cond.add(actor::Column::Id.in_subquery(actors_in_movies(
            Expr::col((movie_actor::Entity, movie_actor::Column::MovieId)).eq(id),
        )));
    }
    if let Some(name) = r.text("genre") {
        cond = cond.add(
            actor::Column::Id
                .in_subquery(actors_in_genre(icontains((genre::Entity, genre::Column::Name), name))),
        );
    }
    if let Some(id) = r.int("genre_id") {
        cond = cond.add(actor::Column::Id.in_subquery(actors_in_genre(
            Expr::col((movie_genre::Entity, movie_genre::Column::GenreId)).eq(id),
        )));
    }

    r.finish(cond)
}

pub fn director_condition(params: &Params) -> AppResult<Condition> {
    let mut r = Reader::new(params);
    let mut cond = Condition::all();

    if let Some(name) = r.text("name") {
        cond = cond.add(icontains((director::Entity, director::Column::Name), name));
    }
    if let Some(nationality) = r.text("nationality") {
        cond = cond.add(icontains((director::Entity, director::Column::Nationality), nationality));
    }
    if let Some(title) = r.text("movie") {
        cond = cond.add(director::Column::Id.in_subquery(directors_of_movies(icontains(
            (movie::Entity, movie::Column::Title),
            title,
        ))));
    }
    if let Some(id) = r.int("movie_id") {
        cond = cond.add(director::Column::Id.in_subquery(directors_of_movies(
            Expr::col((movie::Entity, movie::Column::Id)).eq(id),
        )));
    }

    r.finish(cond)
}

pub fn genre_condition(params: &Params) -> AppResult<Condition> {
    let r = Reader::new(params);
    let mut cond = Condition::all();
    if let Some(name) = r.text("name") {
        cond = cond.add(icontains((genre::Entity, genre::Column::Name), name));
    }
    r.finish(cond)
}

pub fn review_condition(params: &Params) -> AppResult<Condition> {
    let mut r = Reader::new(params);
    let mut cond = Condition::all();

    if let Some(title) = r.text("movie") {
        cond = cond.add(
            review::Column::MovieId
                .in_subquery(movie_ids(icontains((movie::Entity, movie::Column::Title), title))),
        );
    }
    if let Some(id) = r.int("movie_id") {
        cond = cond.add(review::Column::MovieId.eq(id));
    }
    if let Some(name) = r.text("reviewer_name") {
        cond = cond.add(icontains((review::Entity, review::Column::ReviewerName), name));
    }
    if let Some(rating) = r.int("rating") {
        cond = cond.add(review::Column::Rating.eq(rating));
    }
    if let Some(rating) = r.int("rating_gte") {
        cond = cond.add(review::Column::Rating.gte(rating));
    }
    if let Some(rating) = r.int("rating_lte") {
        cond = cond.add(review::Column::Rating.lte(rating));
    }
    if let Some(featured) = r.boolean("is_featured") {
        cond = cond.add(review::Column::IsFeatured.eq(featured));
    }

    r.finish(cond)
}

#[cfg(test)]
mod tests {
    use sea_orm::{DbBackend, EntityTrait, QueryFilter, QueryTrait};

    use super::*;

    fn params(pairs: &[(&str, &str)]) -> Params {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn movie_sql(pairs: &[(&str, &str)]) -> String {
        let p = params(pairs);
        let select = movie::Entity::find().filter(movie_condition(&p).unwrap());
        order_movies(select, &p).unwrap().build(DbBackend::Sqlite).to_string()
    }

    #[test]
    fn like_metacharacters_are_escaped() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
    }

    #[test]
    fn empty_values_are_ignored() {
        let sql = movie_sql(&[("title", ""), ("release_year", "  ")]);
        assert!(!sql.contains("LIKE"), "{sql}");
        assert!(!sql.contains("\"movie\".\"release_year\" ="), "{sql}");
    }

    #[test]
    fn substring_search_lowercases_both_sides() {
        let sql = movie_sql(&[("title", "Dark KNIGHT")]);
        assert!(sql.contains("LOWER(\"movie\".\"title\") LIKE '%dark knight%'"), "{sql}");
    }

    #[test]
    fn relation_filters_use_subqueries() {
        let sql = movie_sql(&[("actor", "ryan"), ("genre_id", "3")]);
        assert!(sql.contains("\"movie\".\"id\" IN (SELECT \"movie_actor\".\"movie_id\""), "{sql}");
        assert!(sql.contains("\"movie\".\"id\" IN (SELECT \"movie_genre\".\"movie_id\""), "{sql}");
        assert!(sql.contains("\"movie_genre\".\"genre_id\" ="), "{sql}");
    }

    #[test]
    fn rating_bounds_compare_in_tenths() {
        let sql = movie_sql(&[("rating_gte", "6.55"), ("rating_lte", "8")]);
        assert!(sql.contains("\"movie\".\"rating\" >= 66"), "{sql}");
        assert!(sql.contains("\"movie\".\"rating\" <= 80"), "{sql}");
    }

    #[test]
    fn default_and_explicit_ordering() {
        let sql = movie_sql(&[]);
        assert!(
            sql.ends_with(
                "ORDER BY \"movie\".\"release_year\" DESC, \"movie\".\"title\" ASC, \"movie\".\"id\" ASC"
            ),
            "{sql}"
        );
        let sql = movie_sql(&[("ordering", "-rating,title")]);
        assert!(
            sql.ends_with(
                "ORDER BY \"movie\".\"rating\" DESC, \"movie\".\"title\" ASC, \"movie\".\"id\" ASC"
            ),
            "{sql}"
        );
    }

    #[test]
    fn unknown_ordering_is_rejected() {
        let p = params(&[("ordering", "-budget")]);
        let err = order_movies(movie::Entity::find(), &p).unwrap_err();
        match err {
            AppError::Validation(errors) => assert!(errors.get("ordering").is_some()),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn unparseable_numbers_name_the_parameter() {
        let err = movie_condition(&params(&[("release_year_gte", "abc"), ("rating_lte", "x")]))
            .unwrap_err();
        match err {
            AppError::Validation(errors) => {
                assert!(errors.get("release_year_gte").is_some());
                assert!(errors.get("rating_lte").is_some());
            },
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn boolean_flag_accepts_common_spellings() {
        for raw in ["true", "True", "1", "false", "0"] {
            assert!(review_condition(&params(&[("is_featured", raw)])).is_ok(), "{raw}");
        }
        assert!(review_condition(&params(&[("is_featured", "maybe")])).is_err());
    }
}
