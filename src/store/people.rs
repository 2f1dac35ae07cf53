use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use tracing::{debug, info};

use super::Catalog;
use crate::{
    entities::{actor, director, movie, movie_actor, movie_genre, review},
    error::{AppError, AppResult},
    filters::{self, Params},
    models::{PersonDetail, PersonOut, now_micros},
    pagination::{PageRequest, fetch_page},
    payloads::{PersonDraft, PersonInput, StoredPerson, WriteMode},
    shape,
};

/// Copies a merged draft onto a director or actor active model.
macro_rules! assign_person {
    ($active:ident, $draft:expr) => {{
        let draft: PersonDraft = $draft;
        $active.name = Set(draft.name);
        $active.birth_date = Set(draft.birth_date.map(|d| d.to_string()));
        $active.nationality = Set(draft.nationality);
        $active.biography = Set(draft.biography);
        $active.image_url = Set(draft.image_url);
        $active.updated_at = Set(now_micros());
    }};
}

async fn find_director<C: ConnectionTrait>(conn: &C, id: i32) -> AppResult<director::Model> {
    director::Entity::find_by_id(id).one(conn).await?.ok_or_else(AppError::not_found)
}

async fn find_actor<C: ConnectionTrait>(conn: &C, id: i32) -> AppResult<actor::Model> {
    actor::Entity::find_by_id(id).one(conn).await?.ok_or_else(AppError::not_found)
}

impl Catalog {
    pub async fn list_directors(&self, params: &Params, page: PageRequest) -> AppResult<(u64, Vec<PersonOut>)> {
        let select = director::Entity::find()
            .filter(filters::director_condition(params)?)
            .order_by_asc(director::Column::Name)
            .order_by_asc(director::Column::Id);
        let (count, rows) = fetch_page(&self.db, select, page).await?;
        debug!(count, page = page.number, "listed directors");
        Ok((count, shape::directors(&self.db, rows).await?))
    }

    pub async fn get_director(&self, id: i32) -> AppResult<PersonDetail> {
        let row = find_director(&self.db, id).await?;
        shape::director_detail(&self.db, row).await
    }

    async fn director_out(&self, row: director::Model) -> AppResult<PersonOut> {
        shape::directors(&self.db, vec![row]).await?.pop().ok_or_else(AppError::not_found)
    }

    pub async fn create_director(&self, input: PersonInput) -> AppResult<PersonOut> {
        let draft = input.merge(None, WriteMode::Create).map_err(AppError::Validation)?;
        let now = now_micros();
        let mut active = director::ActiveModel { id: NotSet, created_at: Set(now), ..Default::default() };
        assign_person!(active, draft);
        active.updated_at = Set(now);
        let row = {
            let _gate = self.write_gate.clone().lock_owned().await;
            active.insert(&self.db).await?
        };

        info!(director_id = row.id, name = %row.name, "director created");
        self.director_out(row).await
    }

    pub async fn update_director(&self, id: i32, input: PersonInput, mode: WriteMode) -> AppResult<PersonOut> {
        let (_gate, txn) = self.begin_write().await?;
        let stored = find_director(&txn, id).await?;
        let draft = input
            .merge(Some(StoredPerson::from(&stored)), mode)
            .map_err(AppError::Validation)?;
        let mut active: director::ActiveModel = stored.into();
        assign_person!(active, draft);
        let row = active.update(&txn).await?;
        txn.commit().await?;

        info!(director_id = id, "director updated");
        self.director_out(row).await
    }

    /// Deletes the director together with their movies and everything hanging off them.
    pub async fn delete_director(&self, id: i32) -> AppResult<()> {
        let (_gate, txn) = self.begin_write().await?;
        find_director(&txn, id).await?;

        let movie_ids: Vec<i32> = movie::Entity::find()
            .select_only()
            .column(movie::Column::Id)
            .filter(movie::Column::DirectorId.eq(id))
            .into_tuple()
            .all(&txn)
            .await?;
        if !movie_ids.is_empty() {
            review::Entity::delete_many()
                .filter(review::Column::MovieId.is_in(movie_ids.iter().copied()))
                .exec(&txn)
                .await?;
            movie_actor::Entity::delete_many()
                .filter(movie_actor::Column::MovieId.is_in(movie_ids.iter().copied()))
                .exec(&txn)
                .await?;
            movie_genre::Entity::delete_many()
                .filter(movie_genre::Column::MovieId.is_in(movie_ids.iter().copied()))
                .exec(&txn)
                .await?;
            movie::Entity::delete_many()
                .filter(movie::Column::Id.is_in(movie_ids.iter().copied()))
                .exec(&txn)
                .await?;
        }
        director::Entity::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;

        info!(director_id = id, movies = movie_ids.len(), "director deleted");
        Ok(())
    }

    pub async fn director_named(&self, name: &str) -> AppResult<Option<director::Model>> {
        Ok(director::Entity::find().filter(director::Column::Name.eq(name)).one(&self.db).await?)
    }

    pub async fn list_actors(&self, params: &Params, page: PageRequest) -> AppResult<(u64, Vec<PersonOut>)> {
        let select = actor::Entity::find()
            .filter(filters::actor_condition(params)?)
            .order_by_asc(actor::Column::Name)
            .order_by_asc(actor::Column::Id);
        let (count, rows) = fetch_page(&self.db, select, page).await?;
        debug!(count, page = page.number, "listed actors");
        Ok((count, shape::actors(&self.db, rows).await?))
    }

    pub async fn get_actor(&self, id: i32) -> AppResult<PersonDetail> {
        let row = find_actor(&self.db, id).await?;
        shape::actor_detail(&self.db, row).await
    }

    async fn actor_out(&self, row: actor::Model) -> AppResult<PersonOut> {
        shape::actors(&self.db, vec![row]).await?.pop().ok_or_else(AppError::not_found)
    }

    pub async fn create_actor(&self, input: PersonInput) -> AppResult<PersonOut> {
        let draft = input.merge(None, WriteMode::Create).map_err(AppError::Validation)?;
        let now = now_micros();
        let mut active = actor::ActiveModel { id: NotSet, created_at: Set(now), ..Default::default() };
        assign_person!(active, draft);
        active.updated_at = Set(now);
        let row = {
            let _gate = self.write_gate.clone().lock_owned().await;
            active.insert(&self.db).await?
        };

        info!(actor_id = row.id, name = %row.name, "actor created");
        self.actor_out(row).await
    }

    pub async fn update_actor(&self, id: i32, input: PersonInput, mode: WriteMode) -> AppResult<PersonOut> {
        let (_gate, txn) = self.begin_write().await?;
        let stored = find_actor(&txn, id).await?;
        let draft = input
            .merge(Some(StoredPerson::from(&stored)), mode)
            .map_err(AppError::Validation)?;
        let mut active: actor::ActiveModel = stored.into();
        assign_person!(active, draft);
        let row = active.update(&txn).await?;
        txn.commit().await?;

        info!(actor_id = id, "actor updated");
        self.actor_out(row).await
    }

    /// Removes the actor from every cast, then deletes it. Movies are kept.
    pub async fn delete_actor(&self, id: i32) -> AppResult<()> {
        let (_gate, txn) = self.begin_write().await?;
        find_actor(&txn, id).await?;
        let detached = movie_actor::Entity::delete_many()
            .filter(movie_actor::Column::ActorId.eq(id))
            .exec(&txn)
            .await?
            .rows_affected;
        actor::Entity::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;

        info!(actor_id = id, detached, "actor deleted");
        Ok(())
    }

    pub async fn actor_named(&self, name: &str) -> AppResult<Option<actor::Model>> {
        Ok(actor::Entity::find().filter(actor::Column::Name.eq(name)).one(&self.db).await?)
    }
}

#[cfg(test)]
mod tests {
    use jiff::civil::date;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        payloads::{GenreInput, MovieInput},
        store::testing,
    };

    fn person(name: &str) -> PersonInput {
        PersonInput { name: Some(Some(name.to_string())), ..Default::default() }
    }

    fn params(pairs: &[(&str, &str)]) -> Params {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn names(rows: Vec<PersonOut>) -> Vec<String> {
        rows.into_iter().map(|p| p.name).collect()
    }

    /// Two directors, each with one movie; Drive is a crime film starring Ryan Gosling,
    /// Arrival a sci-fi film starring Amy Adams.
    async fn filmography(catalog: &Catalog) -> (i32, i32) {
        let refn = catalog.create_director(person("Nicolas Winding Refn")).await.unwrap().id;
        let villeneuve = catalog.create_director(person("Denis Villeneuve")).await.unwrap().id;
        let gosling = catalog.create_actor(person("Ryan Gosling")).await.unwrap().id;
        let adams = catalog.create_actor(person("Amy Adams")).await.unwrap().id;
        let crime = catalog
            .create_genre(GenreInput { name: Some(Some("Crime".into())), description: None })
            .await
            .unwrap()
            .id;
        let scifi = catalog
            .create_genre(GenreInput { name: Some(Some("Sci-Fi".into())), description: None })
            .await
            .unwrap()
            .id;

        let mut ids = Vec::new();
        for (title, director, actor, genre) in
            [("Drive", refn, gosling, crime), ("Arrival", villeneuve, adams, scifi)]
        {
            let created = catalog
                .create_movie(MovieInput {
                    title: Some(Some(title.into())),
                    release_year: Some(Some(2011)),
                    director_id: Some(Some(director)),
                    actor_ids: Some(vec![actor]),
                    genre_ids: Some(vec![genre]),
                    ..Default::default()
                })
                .await
                .unwrap();
            ids.push(created.id);
        }
        (ids[0], crime)
    }

    #[tokio::test]
    async fn patch_keeps_omitted_fields() {
        let catalog = testing::catalog().await;
        let created = catalog
            .create_actor(PersonInput {
                name: Some(Some("Tom Hanks".to_string())),
                birth_date: Some(Some(date(1956, 7, 9))),
                nationality: Some(Some("American".to_string())),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(created.birth_date, Some(date(1956, 7, 9)));

        let patched = catalog
            .update_actor(
                created.id,
                PersonInput { biography: Some(Some("Actor.".to_string())), ..Default::default() },
                WriteMode::Patch,
            )
            .await
            .unwrap();
        assert_eq!(patched.name, "Tom Hanks");
        assert_eq!(patched.nationality, "American");
        assert_eq!(patched.birth_date, Some(date(1956, 7, 9)));
        assert_eq!(patched.biography, "Actor.");
    }

    #[tokio::test]
    async fn replace_without_name_is_rejected() {
        let catalog = testing::catalog().await;
        let created = catalog.create_director(person("Greta Gerwig")).await.unwrap();
        let err = catalog
            .update_director(created.id, PersonInput::default(), WriteMode::Replace)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(ref e) if e.get("name").is_some()));
    }

    #[tokio::test]
    async fn unknown_person_is_not_found() {
        let catalog = testing::catalog().await;
        assert!(matches!(catalog.get_actor(42).await, Err(AppError::NotFound(_))));
        assert!(matches!(catalog.delete_director(42).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn new_director_has_no_movies() {
        let catalog = testing::catalog().await;
        let created = catalog.create_director(person("Bong Joon-ho")).await.unwrap();
        assert_eq!(created.movies_count, 0);
        let detail = catalog.get_director(created.id).await.unwrap();
        assert!(detail.movies.is_empty());
    }

    #[tokio::test]
    async fn actor_relation_filters() {
        let catalog = testing::catalog().await;
        let (drive, crime) = filmography(&catalog).await;
        let page = PageRequest { number: 1, size: 10 };
        let (drive, crime) = (drive.to_string(), crime.to_string());

        let (_, rows) = catalog.list_actors(&params(&[("movie", "driv")]), page).await.unwrap();
        assert_eq!(names(rows), ["Ryan Gosling"]);
        let (_, rows) = catalog.list_actors(&params(&[("movie_id", drive.as_str())]), page).await.unwrap();
        assert_eq!(names(rows), ["Ryan Gosling"]);
        let (_, rows) = catalog.list_actors(&params(&[("genre", "sci")]), page).await.unwrap();
        assert_eq!(names(rows), ["Amy Adams"]);
        let (_, rows) = catalog.list_actors(&params(&[("genre_id", crime.as_str())]), page).await.unwrap();
        assert_eq!(names(rows), ["Ryan Gosling"]);
        let (count, _) =
            catalog.list_actors(&params(&[("genre", "sci"), ("movie", "drive")]), page).await.unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn director_relation_filters() {
        let catalog = testing::catalog().await;
        let (drive, _) = filmography(&catalog).await;
        let page = PageRequest { number: 1, size: 10 };
        let drive = drive.to_string();

        let (_, rows) = catalog.list_directors(&params(&[("movie", "ARRIV")]), page).await.unwrap();
        assert_eq!(names(rows), ["Denis Villeneuve"]);
        let (_, rows) = catalog.list_directors(&params(&[("movie_id", drive.as_str())]), page).await.unwrap();
        assert_eq!(names(rows), ["Nicolas Winding Refn"]);
        let (_, rows) = catalog.list_directors(&params(&[]), page).await.unwrap();
        assert_eq!(names(rows), ["Denis Villeneuve", "Nicolas Winding Refn"]);
    }
}
