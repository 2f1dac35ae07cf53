use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Genre::Table)
                    .if_not_exists()
                    .col(pk_auto(Genre::Id))
                    .col(string_len_uniq(Genre::Name, 100))
                    .col(text_null(Genre::Description))
                    .col(big_integer(Genre::CreatedAt))
                    .col(big_integer(Genre::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Director::Table)
                    .if_not_exists()
                    .col(pk_auto(Director::Id))
                    .col(string_len(Director::Name, 200))
                    .col(string_null(Director::BirthDate))
                    .col(string_len(Director::Nationality, 100).default(""))
                    .col(text(Director::Biography).default(""))
                    .col(string_null(Director::ImageUrl))
                    .col(big_integer(Director::CreatedAt))
                    .col(big_integer(Director::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Actor::Table)
                    .if_not_exists()
                    .col(pk_auto(Actor::Id))
                    .col(string_len(Actor::Name, 200))
                    .col(string_null(Actor::BirthDate))
                    .col(string_len(Actor::Nationality, 100).default(""))
                    .col(text(Actor::Biography).default(""))
                    .col(string_null(Actor::ImageUrl))
                    .col(big_integer(Actor::CreatedAt))
                    .col(big_integer(Actor::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Movie::Table)
                    .if_not_exists()
                    .col(pk_auto(Movie::Id))
                    .col(string_len(Movie::Title, 300))
                    .col(integer(Movie::ReleaseYear))
                    .col(integer_null(Movie::Duration))
                    .col(text(Movie::Plot).default(""))
                    .col(string_null(Movie::PosterUrl))
                    .col(string_null(Movie::BackdropUrl))
                    .col(integer_null(Movie::Rating))
                    .col(integer(Movie::DirectorId))
                    .col(big_integer(Movie::CreatedAt))
                    .col(big_integer(Movie::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_movie_director")
                            .from(Movie::Table, Movie::DirectorId)
                            .to(Director::Table, Director::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_movie_unique")
                    .table(Movie::Table)
                    .col(Movie::Title)
                    .col(Movie::ReleaseYear)
                    .col(Movie::DirectorId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(MovieActor::Table)
                    .if_not_exists()
                    .col(integer(MovieActor::MovieId))
                    .col(integer(MovieActor::ActorId))
                    .primary_key(Index::create().col(MovieActor::MovieId).col(MovieActor::ActorId))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_movie_actor_movie")
                            .from(MovieActor::Table, MovieActor::MovieId)
                            .to(Movie::Table, Movie::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_movie_actor_actor")
                            .from(MovieActor::Table, MovieActor::ActorId)
                            .to(Actor::Table, Actor::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(MovieGenre::Table)
                    .if_not_exists()
                    .col(integer(MovieGenre::MovieId))
                    .col(integer(MovieGenre::GenreId))
                    .primary_key(Index::create().col(MovieGenre::MovieId).col(MovieGenre::GenreId))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_movie_genre_movie")
                            .from(MovieGenre::Table, MovieGenre::MovieId)
                            .to(Movie::Table, Movie::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_movie_genre_genre")
                            .from(MovieGenre::Table, MovieGenre::GenreId)
                            .to(Genre::Table, Genre::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Review::Table)
                    .if_not_exists()
                    .col(pk_auto(Review::Id))
                    .col(integer(Review::MovieId))
                    .col(string_len(Review::ReviewerName, 200))
                    .col(integer(Review::Rating))
                    .col(text(Review::Comment))
                    .col(boolean(Review::IsFeatured).default(false))
                    .col(big_integer(Review::CreatedAt))
                    .col(big_integer(Review::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_review_movie")
                            .from(Review::Table, Review::MovieId)
                            .to(Movie::Table, Movie::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_review_unique")
                    .table(Review::Table)
                    .col(Review::MovieId)
                    .col(Review::ReviewerName)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Review::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(MovieGenre::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(MovieActor::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Movie::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Actor::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Director::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Genre::Table).to_owned()).await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Genre {
    Table,
    Id,
    Name,
    Description,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Director {
    Table,
    Id,
    Name,
    BirthDate,
    Nationality,
    Biography,
    ImageUrl,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Actor {
    Table,
    Id,
    Name,
    BirthDate,
    Nationality,
    Biography,
    ImageUrl,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Movie {
    Table,
    Id,
    Title,
    ReleaseYear,
    Duration,
    Plot,
    PosterUrl,
    BackdropUrl,
    Rating,
    DirectorId,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum MovieActor {
    Table,
    MovieId,
    ActorId,
}

#[derive(DeriveIden)]
enum MovieGenre {
    Table,
    MovieId,
    GenreId,
}

#[derive(DeriveIden)]
enum Review {
    Table,
    Id,
    MovieId,
    ReviewerName,
    Rating,
    Comment,
    IsFeatured,
    CreatedAt,
    UpdatedAt,
}
