//! Sample catalog loader. Safe to run repeatedly: existing records are looked up by
//! their natural key and left untouched.

use std::collections::HashMap;

use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::{
    error::AppResult,
    payloads::{GenreInput, MovieInput, PersonInput, ReviewInput},
    store::Catalog,
};

const GENRES: &[(&str, &str)] = &[
    ("Action", "High-energy films with physical stunts and chases"),
    ("Drama", "Character-driven stories with emotional depth"),
    ("Sci-Fi", "Science fiction and futuristic themes"),
    ("Thriller", "Suspenseful and tension-filled movies"),
    ("Crime", "Stories involving criminal activities"),
    ("Adventure", "Exciting journeys and quests"),
    ("Comedy", "Humorous and entertaining films"),
    ("Horror", "Scary and suspenseful movies"),
    ("Romance", "Love stories and romantic relationships"),
    ("Fantasy", "Magical and fantastical worlds"),
    ("Mystery", "Puzzles and mysteries to solve"),
    ("Biography", "Life stories of real people"),
    ("War", "Military conflicts and warfare"),
    ("Western", "Stories set in the American Old West"),
];

/// (name, nationality)
const DIRECTORS: &[(&str, &str)] = &[
    ("Christopher Nolan", "British"),
    ("Denis Villeneuve", "Canadian"),
    ("Quentin Tarantino", "American"),
    ("Martin Scorsese", "American"),
    ("David Fincher", "American"),
    ("Steven Spielberg", "American"),
    ("Ridley Scott", "British"),
    ("James Cameron", "Canadian"),
    ("Peter Jackson", "New Zealand"),
    ("Coen Brothers", "American"),
    ("Paul Thomas Anderson", "American"),
    ("Wes Anderson", "American"),
    ("Jordan Peele", "American"),
    ("Greta Gerwig", "American"),
    ("Rian Johnson", "American"),
    ("Francis Ford Coppola", "American"),
    ("Stanley Kubrick", "American"),
];

/// (name, nationality)
const ACTORS: &[(&str, &str)] = &[
    ("Leonardo DiCaprio", "American"),
    ("Ryan Gosling", "Canadian"),
    ("Christian Bale", "British"),
    ("Marion Cotillard", "French"),
    ("Harrison Ford", "American"),
    ("Brad Pitt", "American"),
    ("Samuel L. Jackson", "American"),
    ("Robert De Niro", "American"),
    ("Scarlett Johansson", "American"),
    ("Tom Hanks", "American"),
    ("Margot Robbie", "Australian"),
    ("Oscar Isaac", "Guatemalan-American"),
    ("Timothée Chalamet", "American"),
    ("Zendaya", "American"),
    ("Adam Driver", "American"),
    ("Joaquin Phoenix", "American"),
    ("Amy Adams", "American"),
    ("Matthew McConaughey", "American"),
    ("Anne Hathaway", "American"),
];

struct SeedMovie {
    title: &'static str,
    release_year: i32,
    director: &'static str,
    /// Tenths of a point.
    rating: i64,
    duration: i32,
    plot: &'static str,
    genres: &'static [&'static str],
    actors: &'static [&'static str],
}

const MOVIES: &[SeedMovie] = &[
    SeedMovie {
        title: "Inception",
        release_year: 2010,
        director: "Christopher Nolan",
        rating: 88,
        duration: 148,
        plot: "A thief who steals corporate secrets through dream-sharing technology is given the inverse task of planting an idea into the mind of a C.E.O.",
        genres: &["Sci-Fi", "Action", "Thriller"],
        actors: &["Leonardo DiCaprio", "Marion Cotillard"],
    },
    SeedMovie {
        title: "The Dark Knight",
        release_year: 2008,
        director: "Christopher Nolan",
        rating: 90,
        duration: 152,
        plot: "When the menace known as the Joker wreaks havoc and chaos on the people of Gotham, Batman must accept one of the greatest psychological and physical tests.",
        genres: &["Action", "Crime", "Drama"],
        actors: &["Christian Bale"],
    },
    SeedMovie {
        title: "Interstellar",
        release_year: 2014,
        director: "Christopher Nolan",
        rating: 86,
        duration: 169,
        plot: "A team of explorers travel through a wormhole in space in an attempt to ensure humanity's survival.",
        genres: &["Sci-Fi", "Drama", "Adventure"],
        actors: &["Matthew McConaughey", "Anne Hathaway"],
    },
    SeedMovie {
        title: "Dunkirk",
        release_year: 2017,
        director: "Christopher Nolan",
        rating: 78,
        duration: 106,
        plot: "Allied soldiers from Belgium, the British Commonwealth and Empire, and France are surrounded by the German Army and evacuated during a fierce battle in World War II.",
        genres: &["War", "Drama"],
        actors: &["Tom Hanks"],
    },
    SeedMovie {
        title: "Tenet",
        release_year: 2020,
        director: "Christopher Nolan",
        rating: 73,
        duration: 150,
        plot: "Armed with only one word, Tenet, and fighting for the survival of the entire world, a Protagonist journeys through a twilight world of international espionage.",
        genres: &["Sci-Fi", "Action", "Thriller"],
        actors: &["Christian Bale"],
    },
    SeedMovie {
        title: "Blade Runner 2049",
        release_year: 2017,
        director: "Denis Villeneuve",
        rating: 80,
        duration: 164,
        plot: "Young Blade Runner K discovers a long-buried secret that has the potential to plunge what's left of society into chaos.",
        genres: &["Sci-Fi", "Drama", "Thriller"],
        actors: &["Ryan Gosling", "Harrison Ford"],
    },
    SeedMovie {
        title: "Dune",
        release_year: 2021,
        director: "Denis Villeneuve",
        rating: 80,
        duration: 155,
        plot: "The son of a noble family is entrusted with the protection of the most valuable asset and most vital element in the galaxy.",
        genres: &["Sci-Fi", "Adventure", "Drama"],
        actors: &["Timothée Chalamet", "Zendaya", "Oscar Isaac"],
    },
    SeedMovie {
        title: "Arrival",
        release_year: 2016,
        director: "Denis Villeneuve",
        rating: 79,
        duration: 116,
        plot: "A linguist works with the military to communicate with alien lifeforms after twelve mysterious spacecraft appear around the world.",
        genres: &["Sci-Fi", "Drama", "Mystery"],
        actors: &["Amy Adams"],
    },
    SeedMovie {
        title: "Pulp Fiction",
        release_year: 1994,
        director: "Quentin Tarantino",
        rating: 89,
        duration: 154,
        plot: "The lives of two mob hitmen, a boxer, a gangster and his wife intertwine in four tales of violence and redemption.",
        genres: &["Crime", "Drama"],
        actors: &["Samuel L. Jackson", "Brad Pitt"],
    },
    SeedMovie {
        title: "Django Unchained",
        release_year: 2012,
        director: "Quentin Tarantino",
        rating: 84,
        duration: 165,
        plot: "With the help of a German bounty-hunter, a freed slave sets out to rescue his wife from a brutal plantation owner.",
        genres: &["Western", "Drama"],
        actors: &["Leonardo DiCaprio"],
    },
    SeedMovie {
        title: "Once Upon a Time in Hollywood",
        release_year: 2019,
        director: "Quentin Tarantino",
        rating: 76,
        duration: 161,
        plot: "A faded television actor and his stunt double strive to achieve fame and success in the final years of Hollywood's Golden Age.",
        genres: &["Comedy", "Drama"],
        actors: &["Leonardo DiCaprio", "Brad Pitt", "Margot Robbie"],
    },
    SeedMovie {
        title: "Goodfellas",
        release_year: 1990,
        director: "Martin Scorsese",
        rating: 87,
        duration: 146,
        plot: "The story of Henry Hill and his life in the mob, covering his relationship with his wife and his mob partners.",
        genres: &["Crime", "Drama"],
        actors: &["Robert De Niro"],
    },
    SeedMovie {
        title: "The Wolf of Wall Street",
        release_year: 2013,
        director: "Martin Scorsese",
        rating: 82,
        duration: 180,
        plot: "Based on the true story of Jordan Belfort, from his rise to a wealthy stock-broker to his fall involving crime and corruption.",
        genres: &["Biography", "Crime", "Drama"],
        actors: &["Leonardo DiCaprio", "Margot Robbie"],
    },
    SeedMovie {
        title: "The Departed",
        release_year: 2006,
        director: "Martin Scorsese",
        rating: 85,
        duration: 151,
        plot: "An undercover cop and a mole in the police attempt to identify each other while infiltrating an Irish gang in Boston.",
        genres: &["Crime", "Drama", "Thriller"],
        actors: &["Leonardo DiCaprio"],
    },
    SeedMovie {
        title: "Fight Club",
        release_year: 1999,
        director: "David Fincher",
        rating: 88,
        duration: 139,
        plot: "An insomniac office worker and a devil-may-care soap maker form an underground fight club that evolves into much more.",
        genres: &["Drama"],
        actors: &["Brad Pitt"],
    },
    SeedMovie {
        title: "Se7en",
        release_year: 1995,
        director: "David Fincher",
        rating: 86,
        duration: 127,
        plot: "Two detectives hunt a serial killer who uses the seven deadly sins as his motives.",
        genres: &["Crime", "Drama", "Mystery"],
        actors: &["Brad Pitt"],
    },
    SeedMovie {
        title: "Saving Private Ryan",
        release_year: 1998,
        director: "Steven Spielberg",
        rating: 86,
        duration: 169,
        plot: "Following the Normandy Landings, a group of U.S. soldiers go behind enemy lines to retrieve a paratrooper whose brothers have been killed in action.",
        genres: &["Drama", "War"],
        actors: &["Tom Hanks"],
    },
    SeedMovie {
        title: "Gladiator",
        release_year: 2000,
        director: "Ridley Scott",
        rating: 85,
        duration: 155,
        plot: "A former Roman General sets out to exact vengeance against the corrupt emperor who murdered his family and sent him into slavery.",
        genres: &["Action", "Adventure", "Drama"],
        actors: &["Joaquin Phoenix"],
    },
    SeedMovie {
        title: "Titanic",
        release_year: 1997,
        director: "James Cameron",
        rating: 78,
        duration: 194,
        plot: "A seventeen-year-old aristocrat falls in love with a kind but poor artist aboard the luxurious, ill-fated R.M.S. Titanic.",
        genres: &["Drama", "Romance"],
        actors: &["Leonardo DiCaprio"],
    },
    SeedMovie {
        title: "The Lord of the Rings: The Return of the King",
        release_year: 2003,
        director: "Peter Jackson",
        rating: 90,
        duration: 201,
        plot: "Gandalf and Aragorn lead the World of Men against Sauron's army to draw his gaze from Frodo and Sam as they approach Mount Doom with the One Ring.",
        genres: &["Adventure", "Drama", "Fantasy"],
        actors: &[],
    },
    SeedMovie {
        title: "Lady Bird",
        release_year: 2017,
        director: "Greta Gerwig",
        rating: 74,
        duration: 94,
        plot: "In 2002, an artistically inclined seventeen-year-old girl comes of age in Sacramento, California.",
        genres: &["Comedy", "Drama"],
        actors: &[],
    },
    SeedMovie {
        title: "Knives Out",
        release_year: 2019,
        director: "Rian Johnson",
        rating: 79,
        duration: 130,
        plot: "A detective investigates the death of the patriarch of an eccentric, combative family.",
        genres: &["Comedy", "Crime", "Drama"],
        actors: &[],
    },
    SeedMovie {
        title: "The Godfather",
        release_year: 1972,
        director: "Francis Ford Coppola",
        rating: 92,
        duration: 175,
        plot: "The aging patriarch of an organized crime dynasty transfers control of his clandestine empire to his reluctant son.",
        genres: &["Crime", "Drama"],
        actors: &[],
    },
];

/// (movie title, reviewer, rating, comment, featured)
const REVIEWS: &[(&str, &str, i32, &str, bool)] = &[
    ("The Godfather", "Roger Ebert", 10, "A masterpiece of cinema that redefined the crime genre.", true),
    ("The Dark Knight", "Peter Travers", 9, "Heath Ledger's Joker performance is legendary.", true),
    ("Pulp Fiction", "Janet Maslin", 9, "Tarantino's non-linear masterpiece changed cinema forever.", true),
    ("Schindler's List", "Leonard Maltin", 10, "Spielberg's most powerful and important film.", true),
    ("Inception", "A.O. Scott", 9, "A mind-bending thriller that rewards multiple viewings.", true),
    ("Fight Club", "Owen Gleiberman", 8, "A dark satire that became a cultural phenomenon.", false),
    ("Goodfellas", "Pauline Kael", 9, "Scorsese's kinetic energy brings the mob world to life.", true),
    (
        "The Lord of the Rings: The Return of the King",
        "Richard Roeper",
        10,
        "Epic conclusion to the greatest fantasy trilogy ever made.",
        true,
    ),
    ("Blade Runner 2049", "David Edelstein", 8, "A worthy sequel that expands the original's themes beautifully.", false),
    ("Dune", "Stephanie Zacharek", 8, "Villeneuve creates a visually stunning sci-fi epic.", false),
];

/// Records created by one [`load`] run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub genres: usize,
    pub directors: usize,
    pub actors: usize,
    pub movies: usize,
    pub reviews: usize,
}

pub async fn load(catalog: &Catalog) -> AppResult<SeedReport> {
    let mut report = SeedReport::default();

    let mut genres = HashMap::new();
    for (name, description) in GENRES {
        let id = match catalog.genre_named(name).await? {
            Some(existing) => existing.id,
            None => {
                report.genres += 1;
                catalog
                    .create_genre(GenreInput {
                        name: Some(Some(name.to_string())),
                        description: Some(Some(description.to_string())),
                    })
                    .await?
                    .id
            },
        };
        genres.insert(*name, id);
    }

    let mut directors = HashMap::new();
    for (name, nationality) in DIRECTORS {
        let id = match catalog.director_named(name).await? {
            Some(existing) => existing.id,
            None => {
                report.directors += 1;
                catalog.create_director(person(name, nationality)).await?.id
            },
        };
        directors.insert(*name, id);
    }

    let mut actors = HashMap::new();
    for (name, nationality) in ACTORS {
        let id = match catalog.actor_named(name).await? {
            Some(existing) => existing.id,
            None => {
                report.actors += 1;
                catalog.create_actor(person(name, nationality)).await?.id
            },
        };
        actors.insert(*name, id);
    }

    let mut movies = HashMap::new();
    for seed in MOVIES {
        let Some(&director_id) = directors.get(seed.director) else {
            warn!(director = seed.director, title = seed.title, "seed director missing");
            continue;
        };
        if let Some(existing) = catalog.movie_titled(seed.title, seed.release_year, director_id).await? {
            movies.insert(seed.title, existing.id);
            continue;
        }
        let created = catalog
            .create_movie(MovieInput {
                title: Some(Some(seed.title.to_string())),
                release_year: Some(Some(seed.release_year)),
                duration: Some(Some(seed.duration)),
                plot: Some(Some(seed.plot.to_string())),
                rating: Some(Some(Decimal::new(seed.rating, 1))),
                director_id: Some(Some(director_id)),
                genre_ids: Some(lookup(&genres, seed.genres)),
                actor_ids: Some(lookup(&actors, seed.actors)),
                ..Default::default()
            })
            .await?;
        report.movies += 1;
        movies.insert(seed.title, created.id);
    }

    for (title, reviewer, rating, comment, featured) in REVIEWS {
        let Some(&movie_id) = movies.get(title) else {
            debug!(title, reviewer, "no seeded movie for review");
            continue;
        };
        if catalog.review_by(movie_id, reviewer).await?.is_some() {
            continue;
        }
        catalog
            .create_review(ReviewInput {
                movie: Some(Some(movie_id)),
                reviewer_name: Some(Some(reviewer.to_string())),
                rating: Some(Some(*rating)),
                comment: Some(Some(comment.to_string())),
                is_featured: Some(*featured),
            })
            .await?;
        report.reviews += 1;
    }

    info!(?report, "sample catalog loaded");
    Ok(report)
}

fn person(name: &str, nationality: &str) -> PersonInput {
    PersonInput {
        name: Some(Some(name.to_string())),
        nationality: Some(Some(nationality.to_string())),
        ..Default::default()
    }
}

fn lookup(ids: &HashMap<&str, i32>, names: &[&str]) -> Vec<i32> {
    names.iter().filter_map(|name| ids.get(name).copied()).collect()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{filters::Params, pagination::PageRequest, store::testing};

    #[tokio::test]
    async fn loads_once_and_is_idempotent() {
        let catalog = testing::catalog().await;

        let first = load(&catalog).await.unwrap();
        assert_eq!(first.genres, GENRES.len());
        assert_eq!(first.directors, DIRECTORS.len());
        assert_eq!(first.movies, MOVIES.len());
        // One review points at a movie outside the sample set.
        assert_eq!(first.reviews, REVIEWS.len() - 1);

        let (movies, _) = catalog
            .list_movies(&Params::new(), PageRequest { number: 1, size: 100 })
            .await
            .unwrap();
        assert_eq!(movies as usize, MOVIES.len());

        let second = load(&catalog).await.unwrap();
        assert_eq!(second, SeedReport::default());
    }

    #[tokio::test]
    async fn seeded_movies_carry_their_relations() {
        let catalog = testing::catalog().await;
        load(&catalog).await.unwrap();

        let params: Params = [("title".to_string(), "inception".to_string())].into_iter().collect();
        let (count, rows) = catalog.list_movies(&params, PageRequest { number: 1, size: 10 }).await.unwrap();
        assert_eq!(count, 1);
        let detail = catalog.get_movie(rows[0].id).await.unwrap();
        assert_eq!(detail.director.name, "Christopher Nolan");
        assert_eq!(detail.actors.len(), 2);
        assert_eq!(detail.genres.len(), 3);
        assert_eq!(detail.review_count, 1);
        assert_eq!(detail.average_rating, Some(9.0));
    }
}
