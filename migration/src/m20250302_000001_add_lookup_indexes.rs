use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_index(
                Index::create()
                    .name("idx_movie_director")
                    .table(Movie::Table)
                    .col(Movie::DirectorId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_movie_actor_actor")
                    .table(MovieActor::Table)
                    .col(MovieActor::ActorId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_movie_genre_genre")
                    .table(MovieGenre::Table)
                    .col(MovieGenre::GenreId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_review_created_at")
                    .table(Review::Table)
                    .col(Review::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_review_created_at").table(Review::Table).to_owned())
            .await?;
        manager
            .drop_index(
                Index::drop().name("idx_movie_genre_genre").table(MovieGenre::Table).to_owned(),
            )
            .await?;
        manager
            .drop_index(
                Index::drop().name("idx_movie_actor_actor").table(MovieActor::Table).to_owned(),
            )
            .await?;
        manager
            .drop_index(Index::drop().name("idx_movie_director").table(Movie::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Movie {
    Table,
    DirectorId,
}

#[derive(DeriveIden)]
enum MovieActor {
    Table,
    ActorId,
}

#[derive(DeriveIden)]
enum MovieGenre {
    Table,
    GenreId,
}

#[derive(DeriveIden)]
enum Review {
    Table,
    CreatedAt,
}
