use std::collections::HashSet;

use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, Condition, ConnectionTrait, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
    sea_query::{NullOrdering, Order, Query},
};
use tracing::{debug, info};

use super::{Catalog, existing_ids, invalid_pk, report_missing};
use crate::{
    entities::{actor, director, genre, movie, movie_actor, movie_genre, review},
    error::{AppError, AppResult, FieldErrors, NON_FIELD_ERRORS},
    filters::{self, Params},
    models::{MovieDetail, MovieSummary, now_micros, rating_tenths},
    pagination::{PageRequest, fetch_page},
    payloads::{MovieDraft, MovieInput, WriteMode},
    shape,
};

/// Movies returned by the top rated listing.
const TOP_RATED_LIMIT: u64 = 10;

#[derive(Clone, Copy, Debug)]
enum Membership {
    Cast,
    Genres,
}

async fn find_movie<C: ConnectionTrait>(conn: &C, id: i32) -> AppResult<movie::Model> {
    movie::Entity::find_by_id(id).one(conn).await?.ok_or_else(AppError::not_found)
}

/// Checks every id the draft references and the (title, year, director) uniqueness.
async fn check_draft<C: ConnectionTrait>(conn: &C, draft: &MovieDraft, except: Option<i32>) -> AppResult<()> {
    let mut errors = FieldErrors::default();

    let director_exists = director::Entity::find_by_id(draft.director_id).one(conn).await?.is_some();
    if !director_exists {
        errors.add("director_id", invalid_pk(draft.director_id));
    }
    if let Some(ids) = &draft.actor_ids {
        let found = existing_ids::<actor::Entity, _>(conn, actor::Column::Id, ids).await?;
        report_missing(&mut errors, "actor_ids", ids, &found);
    }
    if let Some(ids) = &draft.genre_ids {
        let found = existing_ids::<genre::Entity, _>(conn, genre::Column::Id, ids).await?;
        report_missing(&mut errors, "genre_ids", ids, &found);
    }

    if director_exists {
        let mut duplicate = movie::Entity::find().filter(
            Condition::all()
                .add(movie::Column::Title.eq(draft.title.as_str()))
                .add(movie::Column::ReleaseYear.eq(draft.release_year))
                .add(movie::Column::DirectorId.eq(draft.director_id)),
        );
        if let Some(id) = except {
            duplicate = duplicate.filter(movie::Column::Id.ne(id));
        }
        if duplicate.one(conn).await?.is_some() {
            errors.add(
                NON_FIELD_ERRORS,
                "The fields title, release_year, director must make a unique set.",
            );
        }
    }

    errors.into_result()
}

async fn members<C: ConnectionTrait>(conn: &C, which: Membership, movie_id: i32) -> AppResult<HashSet<i32>> {
    let ids: Vec<i32> = match which {
        Membership::Cast => {
            movie_actor::Entity::find()
                .select_only()
                .column(movie_actor::Column::ActorId)
                .filter(movie_actor::Column::MovieId.eq(movie_id))
                .into_tuple()
                .all(conn)
                .await?
        },
        Membership::Genres => {
            movie_genre::Entity::find()
                .select_only()
                .column(movie_genre::Column::GenreId)
                .filter(movie_genre::Column::MovieId.eq(movie_id))
                .into_tuple()
                .all(conn)
                .await?
        },
    };
    Ok(ids.into_iter().collect())
}

/// Makes the movie's membership exactly `wanted`, touching only the rows that differ.
async fn reconcile<C: ConnectionTrait>(conn: &C, which: Membership, movie_id: i32, wanted: &[i32]) -> AppResult<()> {
    let current = members(conn, which, movie_id).await?;
    let wanted: HashSet<i32> = wanted.iter().copied().collect();
    let removed: Vec<i32> = current.difference(&wanted).copied().collect();
    let added: Vec<i32> = wanted.difference(&current).copied().collect();

    if !removed.is_empty() {
        match which {
            Membership::Cast => {
                movie_actor::Entity::delete_many()
                    .filter(movie_actor::Column::MovieId.eq(movie_id))
                    .filter(movie_actor::Column::ActorId.is_in(removed.iter().copied()))
                    .exec(conn)
                    .await?;
            },
            Membership::Genres => {
                movie_genre::Entity::delete_many()
                    .filter(movie_genre::Column::MovieId.eq(movie_id))
                    .filter(movie_genre::Column::GenreId.is_in(removed.iter().copied()))
                    .exec(conn)
                    .await?;
            },
        }
    }
    if !added.is_empty() {
        match which {
            Membership::Cast => {
                movie_actor::Entity::insert_many(added.iter().map(|&actor_id| movie_actor::ActiveModel {
                    movie_id: Set(movie_id),
                    actor_id: Set(actor_id),
                }))
                .exec_without_returning(conn)
                .await?;
            },
            Membership::Genres => {
                movie_genre::Entity::insert_many(added.iter().map(|&genre_id| movie_genre::ActiveModel {
                    movie_id: Set(movie_id),
                    genre_id: Set(genre_id),
                }))
                .exec_without_returning(conn)
                .await?;
            },
        }
    }

    debug!(movie_id, ?which, added = added.len(), removed = removed.len(), "membership reconciled");
    Ok(())
}

async fn apply_memberships<C: ConnectionTrait>(conn: &C, movie_id: i32, draft: &MovieDraft) -> AppResult<()> {
    if let Some(ids) = &draft.actor_ids {
        reconcile(conn, Membership::Cast, movie_id, ids).await?;
    }
    if let Some(ids) = &draft.genre_ids {
        reconcile(conn, Membership::Genres, movie_id, ids).await?;
    }
    Ok(())
}

fn assign(active: &mut movie::ActiveModel, draft: &MovieDraft) {
    active.title = Set(draft.title.clone());
    active.release_year = Set(draft.release_year);
    active.duration = Set(draft.duration);
    active.plot = Set(draft.plot.clone());
    active.poster_url = Set(draft.poster_url.clone());
    active.backdrop_url = Set(draft.backdrop_url.clone());
    active.rating = Set(draft.rating.and_then(rating_tenths));
    active.director_id = Set(draft.director_id);
}

fn required_name<'a>(name: Option<&'a str>, message: &str) -> AppResult<&'a str> {
    name.map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| AppError::BadRequest(message.to_string()))
}

impl Catalog {
    pub async fn list_movies(&self, params: &Params, page: PageRequest) -> AppResult<(u64, Vec<MovieSummary>)> {
        let select = movie::Entity::find().filter(filters::movie_condition(params)?);
        let select = filters::order_movies(select, params)?;
        let (count, rows) = fetch_page(&self.db, select, page).await?;
        debug!(count, page = page.number, "listed movies");
        Ok((count, shape::movie_summaries(&self.db, rows).await?))
    }

    pub async fn get_movie(&self, id: i32) -> AppResult<MovieDetail> {
        let row = find_movie(&self.db, id).await?;
        shape::movie_detail(&self.db, row).await
    }

    pub async fn create_movie(&self, input: MovieInput) -> AppResult<MovieDetail> {
        let draft = input.merge(None, WriteMode::Create).map_err(AppError::Validation)?;

        let (_gate, txn) = self.begin_write().await?;
        check_draft(&txn, &draft, None).await?;
        let now = now_micros();
        let mut active = movie::ActiveModel {
            id: NotSet,
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        assign(&mut active, &draft);
        let row = active.insert(&txn).await?;
        apply_memberships(&txn, row.id, &draft).await?;
        txn.commit().await?;

        info!(movie_id = row.id, title = %row.title, "movie created");
        shape::movie_detail(&self.db, row).await
    }

    /// Updates the movie. Omitted `actor_ids`/`genre_ids` leave membership as stored; a
    /// supplied list, even an empty one, replaces it.
    pub async fn update_movie(&self, id: i32, input: MovieInput, mode: WriteMode) -> AppResult<MovieDetail> {
        let (_gate, txn) = self.begin_write().await?;
        let stored = find_movie(&txn, id).await?;
        let draft = input.merge(Some(&stored), mode).map_err(AppError::Validation)?;
        check_draft(&txn, &draft, Some(id)).await?;

        let mut active: movie::ActiveModel = stored.into();
        assign(&mut active, &draft);
        active.updated_at = Set(now_micros());
        let row = active.update(&txn).await?;
        apply_memberships(&txn, id, &draft).await?;
        txn.commit().await?;

        info!(movie_id = id, "movie updated");
        shape::movie_detail(&self.db, row).await
    }

    /// Deletes the movie with its reviews and membership rows.
    pub async fn delete_movie(&self, id: i32) -> AppResult<()> {
        let (_gate, txn) = self.begin_write().await?;
        find_movie(&txn, id).await?;
        let reviews = review::Entity::delete_many()
            .filter(review::Column::MovieId.eq(id))
            .exec(&txn)
            .await?
            .rows_affected;
        movie_actor::Entity::delete_many().filter(movie_actor::Column::MovieId.eq(id)).exec(&txn).await?;
        movie_genre::Entity::delete_many().filter(movie_genre::Column::MovieId.eq(id)).exec(&txn).await?;
        movie::Entity::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;

        info!(movie_id = id, reviews, "movie deleted");
        Ok(())
    }

    /// Movies in any genre whose name contains `name`, case-insensitively.
    pub async fn movies_by_genre(&self, name: Option<&str>, page: PageRequest) -> AppResult<(u64, Vec<MovieSummary>)> {
        let name = required_name(name, "Genre name parameter is required")?;
        let select = filters::default_movie_order(
            movie::Entity::find().filter(filters::movies_in_genre_named(name)),
        );
        let (count, rows) = fetch_page(&self.db, select, page).await?;
        Ok((count, shape::movie_summaries(&self.db, rows).await?))
    }

    /// Movies whose director's name contains `name`, case-insensitively.
    pub async fn movies_by_director(&self, name: Option<&str>, page: PageRequest) -> AppResult<(u64, Vec<MovieSummary>)> {
        let name = required_name(name, "Director name parameter is required")?;
        let select = filters::default_movie_order(
            movie::Entity::find().filter(filters::movies_by_director_named(name)),
        );
        let (count, rows) = fetch_page(&self.db, select, page).await?;
        Ok((count, shape::movie_summaries(&self.db, rows).await?))
    }

    /// Up to ten reviewed movies by stored rating, unrated ones last.
    pub async fn top_rated(&self) -> AppResult<Vec<MovieSummary>> {
        let rows = movie::Entity::find()
            .filter(
                movie::Column::Id.in_subquery(
                    Query::select()
                        .column(review::Column::MovieId)
                        .from(review::Entity)
                        .to_owned(),
                ),
            )
            .order_by_with_nulls(movie::Column::Rating, Order::Desc, NullOrdering::Last)
            .order_by_asc(movie::Column::Id)
            .limit(TOP_RATED_LIMIT)
            .all(&self.db)
            .await?;
        shape::movie_summaries(&self.db, rows).await
    }

    pub async fn movie_titled(&self, title: &str, release_year: i32, director_id: i32) -> AppResult<Option<movie::Model>> {
        Ok(movie::Entity::find()
            .filter(movie::Column::Title.eq(title))
            .filter(movie::Column::ReleaseYear.eq(release_year))
            .filter(movie::Column::DirectorId.eq(director_id))
            .one(&self.db)
            .await?)
    }
}
