use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter,
    QueryOrder, Select, Set,
};
use tracing::{debug, info};

use super::{Catalog, invalid_pk};
use crate::{
    entities::{movie, review},
    error::{AppError, AppResult, FieldErrors, NON_FIELD_ERRORS},
    filters::{self, Params},
    models::{ReviewOut, now_micros},
    pagination::{PageRequest, fetch_page},
    payloads::{ReviewDraft, ReviewInput, WriteMode},
    shape,
};

async fn find_review<C: ConnectionTrait>(conn: &C, id: i32) -> AppResult<review::Model> {
    review::Entity::find_by_id(id).one(conn).await?.ok_or_else(AppError::not_found)
}

/// Checks the referenced movie and the one-review-per-reviewer-per-movie rule.
async fn check_draft<C: ConnectionTrait>(conn: &C, draft: &ReviewDraft, except: Option<i32>) -> AppResult<()> {
    if movie::Entity::find_by_id(draft.movie_id).one(conn).await?.is_none() {
        return Err(AppError::Validation(FieldErrors::single("movie", invalid_pk(draft.movie_id))));
    }

    let mut duplicate = review::Entity::find()
        .filter(review::Column::MovieId.eq(draft.movie_id))
        .filter(review::Column::ReviewerName.eq(draft.reviewer_name.as_str()));
    if let Some(id) = except {
        duplicate = duplicate.filter(review::Column::Id.ne(id));
    }
    if duplicate.one(conn).await?.is_some() {
        return Err(AppError::Validation(FieldErrors::single(
            NON_FIELD_ERRORS,
            "The fields movie, reviewer_name must make a unique set.",
        )));
    }
    Ok(())
}

fn newest_first(select: Select<review::Entity>) -> Select<review::Entity> {
    select.order_by_desc(review::Column::CreatedAt).order_by_desc(review::Column::Id)
}

impl Catalog {
    pub async fn list_reviews(&self, params: &Params, page: PageRequest) -> AppResult<(u64, Vec<ReviewOut>)> {
        let select = newest_first(review::Entity::find().filter(filters::review_condition(params)?));
        let (count, rows) = fetch_page(&self.db, select, page).await?;
        debug!(count, page = page.number, "listed reviews");
        Ok((count, shape::reviews(rows)))
    }

    pub async fn featured_reviews(&self, page: PageRequest) -> AppResult<(u64, Vec<ReviewOut>)> {
        let select = newest_first(review::Entity::find().filter(review::Column::IsFeatured.eq(true)));
        let (count, rows) = fetch_page(&self.db, select, page).await?;
        Ok((count, shape::reviews(rows)))
    }

    pub async fn get_review(&self, id: i32) -> AppResult<ReviewOut> {
        Ok(find_review(&self.db, id).await?.into())
    }

    pub async fn create_review(&self, input: ReviewInput) -> AppResult<ReviewOut> {
        let draft = input.merge(None, WriteMode::Create).map_err(AppError::Validation)?;

        let (_gate, txn) = self.begin_write().await?;
        check_draft(&txn, &draft, None).await?;
        let now = now_micros();
        let row = review::ActiveModel {
            id: NotSet,
            movie_id: Set(draft.movie_id),
            reviewer_name: Set(draft.reviewer_name),
            rating: Set(draft.rating),
            comment: Set(draft.comment),
            is_featured: Set(draft.is_featured),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;

        info!(review_id = row.id, movie_id = row.movie_id, "review created");
        Ok(row.into())
    }

    pub async fn update_review(&self, id: i32, input: ReviewInput, mode: WriteMode) -> AppResult<ReviewOut> {
        let (_gate, txn) = self.begin_write().await?;
        let stored = find_review(&txn, id).await?;
        let draft = input.merge(Some(&stored), mode).map_err(AppError::Validation)?;
        check_draft(&txn, &draft, Some(id)).await?;

        let mut active: review::ActiveModel = stored.into();
        active.movie_id = Set(draft.movie_id);
        active.reviewer_name = Set(draft.reviewer_name);
        active.rating = Set(draft.rating);
        active.comment = Set(draft.comment);
        active.is_featured = Set(draft.is_featured);
        active.updated_at = Set(now_micros());
        let row = active.update(&txn).await?;
        txn.commit().await?;

        info!(review_id = id, "review updated");
        Ok(row.into())
    }

    pub async fn delete_review(&self, id: i32) -> AppResult<()> {
        let (_gate, txn) = self.begin_write().await?;
        find_review(&txn, id).await?;
        review::Entity::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;

        info!(review_id = id, "review deleted");
        Ok(())
    }

    pub async fn review_by(&self, movie_id: i32, reviewer_name: &str) -> AppResult<Option<review::Model>> {
        Ok(review::Entity::find()
            .filter(review::Column::MovieId.eq(movie_id))
            .filter(review::Column::ReviewerName.eq(reviewer_name))
            .one(&self.db)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        db,
        payloads::{GenreInput, MovieInput, PersonInput},
        store::testing,
    };

    async fn movie_id(catalog: &Catalog) -> i32 {
        let director = catalog
            .create_director(PersonInput { name: Some(Some("Denis Villeneuve".into())), ..Default::default() })
            .await
            .unwrap();
        let genre = catalog
            .create_genre(GenreInput { name: Some(Some("Sci-Fi".into())), description: None })
            .await
            .unwrap();
        catalog
            .create_movie(MovieInput {
                title: Some(Some("Arrival".into())),
                release_year: Some(Some(2016)),
                director_id: Some(Some(director.id)),
                genre_ids: Some(vec![genre.id]),
                ..Default::default()
            })
            .await
            .unwrap()
            .id
    }

    fn review(movie: i32, reviewer: &str, featured: bool) -> ReviewInput {
        ReviewInput {
            movie: Some(Some(movie)),
            reviewer_name: Some(Some(reviewer.into())),
            rating: Some(Some(8)),
            comment: Some(Some("Quietly devastating.".into())),
            is_featured: Some(featured),
        }
    }

    #[tokio::test]
    async fn one_review_per_reviewer_per_movie() {
        let catalog = testing::catalog().await;
        let movie = movie_id(&catalog).await;
        catalog.create_review(review(movie, "Ann", false)).await.unwrap();
        let err = catalog.create_review(review(movie, "Ann", true)).await.unwrap_err();
        let AppError::Validation(errors) = err else { panic!("expected validation error") };
        assert_eq!(
            errors.get(NON_FIELD_ERRORS),
            Some(&["The fields movie, reviewer_name must make a unique set.".to_string()][..])
        );
    }

    #[tokio::test]
    async fn unknown_movie_is_a_field_error() {
        let catalog = testing::catalog().await;
        let err = catalog.create_review(review(404, "Ann", false)).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(ref e) if e.get("movie").is_some()));
    }

    #[tokio::test]
    async fn featured_lists_only_featured_newest_first() {
        let catalog = testing::catalog().await;
        let movie = movie_id(&catalog).await;
        catalog.create_review(review(movie, "Ann", true)).await.unwrap();
        catalog.create_review(review(movie, "Bob", false)).await.unwrap();
        catalog.create_review(review(movie, "Cid", true)).await.unwrap();

        let (count, rows) = catalog.featured_reviews(PageRequest { number: 1, size: 10 }).await.unwrap();
        assert_eq!(count, 2);
        let names: Vec<_> = rows.iter().map(|r| r.reviewer_name.as_str()).collect();
        assert_eq!(names, ["Cid", "Ann"]);
    }

    #[tokio::test]
    async fn patch_rating_keeps_other_fields() {
        let catalog = testing::catalog().await;
        let movie = movie_id(&catalog).await;
        let created = catalog.create_review(review(movie, "Ann", false)).await.unwrap();
        let patched = catalog
            .update_review(created.id, ReviewInput { rating: Some(Some(10)), ..Default::default() }, WriteMode::Patch)
            .await
            .unwrap();
        assert_eq!(patched.rating, 10);
        assert_eq!(patched.reviewer_name, "Ann");
        assert_eq!(patched.movie, movie);

        catalog.delete_review(created.id).await.unwrap();
        assert!(matches!(catalog.get_review(created.id).await, Err(AppError::NotFound(_))));
    }

    fn params(pairs: &[(&str, &str)]) -> Params {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    async fn listed(catalog: &Catalog, pairs: &[(&str, &str)]) -> Vec<(String, i32)> {
        let (_, rows) = catalog.list_reviews(&params(pairs), PageRequest { number: 1, size: 10 }).await.unwrap();
        rows.into_iter().map(|r| (r.reviewer_name, r.movie)).collect()
    }

    #[tokio::test]
    async fn review_filters() {
        let catalog = testing::catalog().await;
        let arrival = movie_id(&catalog).await;
        let director = catalog.get_movie(arrival).await.unwrap().director.id;
        let dune = catalog
            .create_movie(MovieInput {
                title: Some(Some("Dune".into())),
                release_year: Some(Some(2021)),
                director_id: Some(Some(director)),
                genre_ids: Some(vec![]),
                ..Default::default()
            })
            .await
            .unwrap()
            .id;
        catalog.create_review(review(arrival, "Ann", true)).await.unwrap();
        catalog.create_review(ReviewInput { rating: Some(Some(3)), ..review(arrival, "Bob", false) }).await.unwrap();
        catalog.create_review(ReviewInput { rating: Some(Some(10)), ..review(dune, "Ann", true) }).await.unwrap();
        catalog.create_review(ReviewInput { rating: Some(Some(6)), ..review(dune, "Cid", false) }).await.unwrap();

        let by = |name: &str, movie: i32| (name.to_string(), movie);

        assert_eq!(listed(&catalog, &[("movie", "DUN")]).await, [by("Cid", dune), by("Ann", dune)]);
        assert_eq!(listed(&catalog, &[("reviewer_name", "an")]).await, [by("Ann", dune), by("Ann", arrival)]);
        assert_eq!(listed(&catalog, &[("rating", "8")]).await, [by("Ann", arrival)]);
        assert_eq!(
            listed(&catalog, &[("rating_gte", "6"), ("rating_lte", "8")]).await,
            [by("Cid", dune), by("Ann", arrival)]
        );
        assert_eq!(listed(&catalog, &[("is_featured", "true")]).await, [by("Ann", dune), by("Ann", arrival)]);
        assert_eq!(listed(&catalog, &[("is_featured", "false"), ("rating_lte", "5")]).await, [by("Bob", arrival)]);

        let arrival_id = arrival.to_string();
        let (_, rows) = catalog
            .list_reviews(&params(&[("movie_id", arrival_id.as_str())]), PageRequest { number: 1, size: 10 })
            .await
            .unwrap();
        let reviewers: Vec<_> = rows.iter().map(|r| r.reviewer_name.as_str()).collect();
        assert_eq!(reviewers, ["Bob", "Ann"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_writers_on_a_file_database_all_succeed() {
        let path = std::env::temp_dir()
            .join(format!("movie-catalog-{}-{}.db", std::process::id(), now_micros()));
        let url = format!("sqlite://{}?mode=rwc", path.display());
        let catalog = Catalog::new(db::connect_and_migrate(&url, 5).await.unwrap());
        let movie = movie_id(&catalog).await;

        let mut writers = tokio::task::JoinSet::new();
        for i in 0..40 {
            let catalog = catalog.clone();
            writers.spawn(async move { catalog.create_review(review(movie, &format!("reviewer {i}"), i % 2 == 0)).await });
        }
        let mut failures = Vec::new();
        while let Some(joined) = writers.join_next().await {
            if let Err(err) = joined.unwrap() {
                failures.push(err);
            }
        }

        let (count, _) = catalog.list_reviews(&Params::new(), PageRequest { number: 1, size: 10 }).await.unwrap();
        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{suffix}", path.display()));
        }
        assert!(failures.is_empty(), "{} writers failed; first: {:?}", failures.len(), failures.first());
        assert_eq!(count, 40);
    }
}
