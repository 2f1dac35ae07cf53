//! Builds list and detail shapes, batching relation lookups per page.

use std::collections::{HashMap, HashSet};

use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, sea_query::Query,
};

use crate::{
    entities::{actor, director, genre, movie, movie_actor, movie_genre, review},
    error::AppResult,
    filters::default_movie_order,
    models::{GenreOut, MovieDetail, MovieSummary, PersonDetail, PersonOut, ReviewOut, rating_decimal, timestamp},
    ratings::{MovieLink, ReviewStats, movie_counts, review_stats},
};

pub async fn genres<C: ConnectionTrait>(conn: &C, rows: Vec<genre::Model>) -> AppResult<Vec<GenreOut>> {
    let ids: Vec<i32> = rows.iter().map(|g| g.id).collect();
    let counts = movie_counts(conn, MovieLink::Genre, &ids).await?;
    Ok(rows
        .into_iter()
        .map(|g| {
            let count = counts.get(&g.id).copied().unwrap_or(0);
            GenreOut::new(g, count)
        })
        .collect())
}

pub async fn directors<C: ConnectionTrait>(conn: &C, rows: Vec<director::Model>) -> AppResult<Vec<PersonOut>> {
    let ids: Vec<i32> = rows.iter().map(|d| d.id).collect();
    let counts = movie_counts(conn, MovieLink::Director, &ids).await?;
    Ok(rows
        .into_iter()
        .map(|d| {
            let count = counts.get(&d.id).copied().unwrap_or(0);
            PersonOut::director(d, count)
        })
        .collect())
}

pub async fn actors<C: ConnectionTrait>(conn: &C, rows: Vec<actor::Model>) -> AppResult<Vec<PersonOut>> {
    let ids: Vec<i32> = rows.iter().map(|a| a.id).collect();
    let counts = movie_counts(conn, MovieLink::Actor, &ids).await?;
    Ok(rows
        .into_iter()
        .map(|a| {
            let count = counts.get(&a.id).copied().unwrap_or(0);
            PersonOut::actor(a, count)
        })
        .collect())
}

pub fn reviews(rows: Vec<review::Model>) -> Vec<ReviewOut> {
    rows.into_iter().map(ReviewOut::from).collect()
}

/// Genres of each movie, in name order.
async fn genres_by_movie<C: ConnectionTrait>(
    conn: &C,
    movie_ids: &[i32],
) -> AppResult<HashMap<i32, Vec<genre::Model>>> {
    let links = movie_genre::Entity::find()
        .filter(movie_genre::Column::MovieId.is_in(movie_ids.iter().copied()))
        .all(conn)
        .await?;
    let genre_ids: HashSet<i32> = links.iter().map(|l| l.genre_id).collect();
    let by_id: HashMap<i32, genre::Model> = genre::Entity::find()
        .filter(genre::Column::Id.is_in(genre_ids))
        .all(conn)
        .await?
        .into_iter()
        .map(|g| (g.id, g))
        .collect();

    let mut out: HashMap<i32, Vec<genre::Model>> = HashMap::new();
    for link in links {
        if let Some(g) = by_id.get(&link.genre_id) {
            out.entry(link.movie_id).or_default().push(g.clone());
        }
    }
    for list in out.values_mut() {
        list.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
    }
    Ok(out)
}

pub async fn movie_summaries<C: ConnectionTrait>(
    conn: &C,
    rows: Vec<movie::Model>,
) -> AppResult<Vec<MovieSummary>> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<i32> = rows.iter().map(|m| m.id).collect();
    let director_ids: HashSet<i32> = rows.iter().map(|m| m.director_id).collect();

    let director_names: HashMap<i32, String> = director::Entity::find()
        .filter(director::Column::Id.is_in(director_ids))
        .all(conn)
        .await?
        .into_iter()
        .map(|d| (d.id, d.name))
        .collect();
    let mut genres = genres_by_movie(conn, &ids).await?;
    let stats = review_stats(conn, &ids).await?;

    Ok(rows
        .into_iter()
        .map(|m| {
            let director_name = director_names.get(&m.director_id).cloned().unwrap_or_default();
            let genre_names =
                genres.remove(&m.id).unwrap_or_default().into_iter().map(|g| g.name).collect();
            let movie_stats = stats.get(&m.id).copied().unwrap_or_default();
            MovieSummary::new(m, director_name, genre_names, movie_stats)
        })
        .collect())
}

pub async fn movie_detail<C: ConnectionTrait>(conn: &C, m: movie::Model) -> AppResult<MovieDetail> {
    let director = director::Entity::find_by_id(m.director_id)
        .one(conn)
        .await?
        .ok_or_else(|| anyhow::anyhow!("movie {} references missing director {}", m.id, m.director_id))?;
    let director_movies = movie_counts(conn, MovieLink::Director, &[director.id]).await?;
    let director_out =
        PersonOut::director(director, director_movies.values().copied().sum());

    let actor_rows = actor::Entity::find()
        .filter(
            actor::Column::Id.in_subquery(
                Query::select()
                    .column(movie_actor::Column::ActorId)
                    .from(movie_actor::Entity)
                    .and_where(movie_actor::Column::MovieId.eq(m.id))
                    .to_owned(),
            ),
        )
        .order_by_asc(actor::Column::Name)
        .order_by_asc(actor::Column::Id)
        .all(conn)
        .await?;
    let actor_out = actors(conn, actor_rows).await?;

    let genre_rows = genres_by_movie(conn, &[m.id]).await?.remove(&m.id).unwrap_or_default();
    let genre_out = genres(conn, genre_rows).await?;

    let review_rows = review::Entity::find()
        .filter(review::Column::MovieId.eq(m.id))
        .order_by_desc(review::Column::CreatedAt)
        .order_by_desc(review::Column::Id)
        .all(conn)
        .await?;
    let ratings: Vec<i32> = review_rows.iter().map(|r| r.rating).collect();
    let stats = ReviewStats::from_ratings(&ratings);

    Ok(MovieDetail {
        id: m.id,
        title: m.title,
        release_year: m.release_year,
        duration: m.duration,
        plot: m.plot,
        poster_url: m.poster_url,
        backdrop_url: m.backdrop_url,
        rating: m.rating.map(rating_decimal),
        director: director_out,
        actors: actor_out,
        genres: genre_out,
        reviews: reviews(review_rows),
        average_rating: stats.average_as_f64(),
        review_count: stats.review_count,
        created_at: timestamp(m.created_at),
        updated_at: timestamp(m.updated_at),
    })
}

pub async fn director_detail<C: ConnectionTrait>(conn: &C, d: director::Model) -> AppResult<PersonDetail> {
    let movies = default_movie_order(movie::Entity::find().filter(movie::Column::DirectorId.eq(d.id)))
        .all(conn)
        .await?;
    let movies = movie_summaries(conn, movies).await?;
    let person = PersonOut::director(d, movies.len() as u64);
    Ok(PersonDetail { person, movies })
}

pub async fn actor_detail<C: ConnectionTrait>(conn: &C, a: actor::Model) -> AppResult<PersonDetail> {
    let movies = default_movie_order(
        movie::Entity::find().filter(
            movie::Column::Id.in_subquery(
                Query::select()
                    .column(movie_actor::Column::MovieId)
                    .from(movie_actor::Entity)
                    .and_where(movie_actor::Column::ActorId.eq(a.id))
                    .to_owned(),
            ),
        ),
    )
    .all(conn)
    .await?;
    let movies = movie_summaries(conn, movies).await?;
    let person = PersonOut::actor(a, movies.len() as u64);
    Ok(PersonDetail { person, movies })
}
