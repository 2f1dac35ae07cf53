use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use tracing::{debug, info};

use super::Catalog;
use crate::{
    entities::{genre, movie_genre},
    error::{AppError, AppResult, FieldErrors},
    filters::{self, Params},
    models::{GenreOut, now_micros},
    pagination::{PageRequest, fetch_page},
    payloads::{GenreInput, WriteMode},
    shape,
};

async fn find_genre<C: ConnectionTrait>(conn: &C, id: i32) -> AppResult<genre::Model> {
    genre::Entity::find_by_id(id).one(conn).await?.ok_or_else(AppError::not_found)
}

async fn ensure_name_free<C: ConnectionTrait>(conn: &C, name: &str, except: Option<i32>) -> AppResult<()> {
    let mut query = genre::Entity::find().filter(genre::Column::Name.eq(name));
    if let Some(id) = except {
        query = query.filter(genre::Column::Id.ne(id));
    }
    if query.one(conn).await?.is_some() {
        return Err(AppError::Validation(FieldErrors::single(
            "name",
            "genre with this name already exists.",
        )));
    }
    Ok(())
}

impl Catalog {
    pub async fn list_genres(&self, params: &Params, page: PageRequest) -> AppResult<(u64, Vec<GenreOut>)> {
        let select = genre::Entity::find()
            .filter(filters::genre_condition(params)?)
            .order_by_asc(genre::Column::Name)
            .order_by_asc(genre::Column::Id);
        let (count, rows) = fetch_page(&self.db, select, page).await?;
        debug!(count, page = page.number, "listed genres");
        Ok((count, shape::genres(&self.db, rows).await?))
    }

    pub async fn get_genre(&self, id: i32) -> AppResult<GenreOut> {
        let row = find_genre(&self.db, id).await?;
        self.genre_out(row).await
    }

    async fn genre_out(&self, row: genre::Model) -> AppResult<GenreOut> {
        shape::genres(&self.db, vec![row]).await?.pop().ok_or_else(AppError::not_found)
    }

    pub async fn create_genre(&self, input: GenreInput) -> AppResult<GenreOut> {
        let draft = input.merge(None, WriteMode::Create).map_err(AppError::Validation)?;

        let (_gate, txn) = self.begin_write().await?;
        ensure_name_free(&txn, &draft.name, None).await?;
        let now = now_micros();
        let row = genre::ActiveModel {
            id: NotSet,
            name: Set(draft.name),
            description: Set(draft.description),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;

        info!(genre_id = row.id, name = %row.name, "genre created");
        self.genre_out(row).await
    }

    pub async fn update_genre(&self, id: i32, input: GenreInput, mode: WriteMode) -> AppResult<GenreOut> {
        let (_gate, txn) = self.begin_write().await?;
        let stored = find_genre(&txn, id).await?;
        let draft = input.merge(Some(&stored), mode).map_err(AppError::Validation)?;
        ensure_name_free(&txn, &draft.name, Some(id)).await?;

        let mut active: genre::ActiveModel = stored.into();
        active.name = Set(draft.name);
        active.description = Set(draft.description);
        active.updated_at = Set(now_micros());
        let row = active.update(&txn).await?;
        txn.commit().await?;

        info!(genre_id = id, "genre updated");
        self.genre_out(row).await
    }

    /// Detaches the genre from its movies, then deletes it. Movies are kept.
    pub async fn delete_genre(&self, id: i32) -> AppResult<()> {
        let (_gate, txn) = self.begin_write().await?;
        find_genre(&txn, id).await?;
        let detached = movie_genre::Entity::delete_many()
            .filter(movie_genre::Column::GenreId.eq(id))
            .exec(&txn)
            .await?
            .rows_affected;
        genre::Entity::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;

        info!(genre_id = id, detached, "genre deleted");
        Ok(())
    }

    pub async fn genre_named(&self, name: &str) -> AppResult<Option<genre::Model>> {
        Ok(genre::Entity::find().filter(genre::Column::Name.eq(name)).one(&self.db).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testing;

    fn input(name: &str) -> GenreInput {
        GenreInput { name: Some(Some(name.to_string())), description: None }
    }

    #[tokio::test]
    async fn duplicate_name_is_a_validation_error() {
        let catalog = testing::catalog().await;
        catalog.create_genre(input("Action")).await.unwrap();
        let err = catalog.create_genre(input("Action")).await.unwrap_err();
        match err {
            AppError::Validation(errors) => assert!(errors.get("name").is_some()),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn renaming_to_own_name_is_allowed() {
        let catalog = testing::catalog().await;
        let created = catalog.create_genre(input("Drama")).await.unwrap();
        let updated =
            catalog.update_genre(created.id, input("Drama"), WriteMode::Replace).await.unwrap();
        assert_eq!(updated.name, "Drama");
        assert!(updated.updated_at >= created.updated_at);
    }

    #[tokio::test]
    async fn second_delete_is_not_found() {
        let catalog = testing::catalog().await;
        let created = catalog.create_genre(input("Horror")).await.unwrap();
        catalog.delete_genre(created.id).await.unwrap();
        assert!(matches!(catalog.delete_genre(created.id).await, Err(AppError::NotFound(_))));
        assert!(matches!(catalog.get_genre(created.id).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn name_filter_is_case_insensitive() {
        let catalog = testing::catalog().await;
        for name in ["Sci-Fi", "Science", "Comedy"] {
            catalog.create_genre(input(name)).await.unwrap();
        }
        let params: Params = [("name".to_string(), "SCI".to_string())].into_iter().collect();
        let (count, rows) =
            catalog.list_genres(&params, PageRequest { number: 1, size: 10 }).await.unwrap();
        assert_eq!(count, 2);
        let names: Vec<_> = rows.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, ["Sci-Fi", "Science"]);
    }
}
