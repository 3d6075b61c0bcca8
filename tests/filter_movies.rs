use movie_catalog::catalog::facets::FacetCounts;
use reqwest::StatusCode;
use serde_json::Value;
use std::collections::HashSet;
use test_startup::*;

fn titles(body: &Value) -> Vec<String> {
    body["movies"]
        .as_array()
        .expect("movies must be a list")
        .iter()
        .map(|movie| movie["title"].as_str().unwrap().to_string())
        .collect()
}

async fn error_message(res: reqwest::Response) -> String {
    let body = res.json::<Value>().await.expect("Failed to parse error body");
    body["error"].as_str().unwrap_or_default().to_string()
}

#[actix_rt::test]
async fn unfiltered_request_lists_the_whole_collection() {
    let app = spawn_app().await;

    let body = app.get_json("/movies/filter").await;

    assert_eq!(body["total_movies"], 14);
    assert_eq!(body["total_pages"], 2);
    assert_eq!(body["current_page"], 1);
    assert_eq!(body["items_per_page"], 12);
    assert_eq!(body["grid"]["rows"], 3);
    assert_eq!(body["grid"]["columns"], 4);
    assert_eq!(body["sort_by"], "Jahr desc");
    assert_eq!(body["sort_options"].as_array().unwrap().len(), 11);
    assert_eq!(titles(&body).len(), 12);
    assert_eq!(titles(&body)[0], "Gravity");
}

#[actix_rt::test]
async fn facet_counts_are_ordered_and_complete() {
    let app = spawn_app().await;

    let counts = app
        .get("/movies/filter")
        .await
        .json::<FacetCounts>()
        .await
        .expect("Failed to parse facet counts");

    let genres = counts.genres.keys().collect::<Vec<_>>();
    assert_eq!(&genres[..3], &["Sci-Fi", "Horror", "Drama"]);
    assert_eq!(counts.genres.get("Unknown"), Some(1));
    assert_eq!(
        counts.media.iter().collect::<Vec<_>>(),
        vec![("VHS", 5), ("DVD", 7), ("Blu-ray", 5), ("Blu-ray 3D", 2)]
    );
    let years = counts.years.keys().collect::<Vec<_>>();
    assert_eq!(
        &years[..7],
        &[
            "1920...1929",
            "1970...1979",
            "1980...1989",
            "1990...1999",
            "2000...2009",
            "2010...2019",
            "2013"
        ]
    );
    assert_eq!(counts.years.get("1980...1989"), Some(4));
    assert_eq!(counts.years.get("2001"), Some(2));
    assert_eq!(years.last(), Some(&"Unknown"));
    assert_eq!(
        counts.locations.keys().collect::<Vec<_>>(),
        vec!["Regal C", "Regal B", "Regal A", "Keller", "Unknown"]
    );
}

#[actix_rt::test]
async fn genre_filter_does_not_narrow_its_own_counts() {
    let app = spawn_app().await;

    let res = app.get("/movies/filter?genres=Horror&page=1").await;
    assert!(res.status().is_success());
    let counts = res.json::<FacetCounts>().await.unwrap();
    let body = app.get_json("/movies/filter?genres=Horror&page=1").await;

    assert_eq!(body["total_movies"], 5);
    assert_eq!(body["total_pages"], 1);
    assert_eq!(titles(&body).len(), 5);
    assert_eq!(counts.genres.get("Horror"), Some(5));
    assert_eq!(counts.genres.get("Sci-Fi"), Some(6));
    assert_eq!(counts.countries.get("USA"), Some(5));
    assert_eq!(counts.countries.get("UK"), Some(3));
    assert_eq!(counts.countries.get("Germany"), None);
}

#[actix_rt::test]
async fn search_matches_directors_and_cast() {
    let app = spawn_app().await;

    let by_director = app.get_json("/movies/filter?search=carpenter").await;
    let mut found = titles(&by_director);
    found.sort();
    assert_eq!(found, vec!["Halloween", "The Thing"]);

    let by_cast = app.get_json("/movies/filter?search=WEAVER").await;
    assert_eq!(by_cast["total_movies"], 2);

    let by_original_title = app.get_json("/movies/filter?search=lola%20rennt").await;
    assert_eq!(titles(&by_original_title), vec!["Run Lola Run"]);
}

#[actix_rt::test]
async fn unmatched_search_returns_one_empty_page() {
    let app = spawn_app().await;

    let body = app.get_json("/movies/filter?search=zzzz&page=3").await;

    assert_eq!(body["total_movies"], 0);
    assert_eq!(body["total_pages"], 1);
    assert_eq!(body["current_page"], 1);
    assert!(titles(&body).is_empty());
    for dimension in ["years", "genres", "countries", "locations", "media"] {
        assert_eq!(body[dimension], serde_json::json!({}), "{}", dimension);
    }
}

#[actix_rt::test]
async fn like_wildcards_in_search_are_literal() {
    let app = spawn_app().await;

    let body = app.get_json("/movies/filter?search=%25").await;

    assert_eq!(body["total_movies"], 0);
}

#[actix_rt::test]
async fn years_and_decades_combine_with_or() {
    let app = spawn_app().await;

    let body = app
        .get_json("/movies/filter?years=1990...1999,2001&sort_by=Titel%20asc")
        .await;

    assert_eq!(
        titles(&body),
        vec!["Amélie", "Heat", "Run Lola Run", "Spirited Away"]
    );
}

#[actix_rt::test]
async fn malformed_filters_are_rejected() {
    let app = spawn_app().await;

    for path in [
        "/movies/filter?years=nineties",
        "/movies/filter?years=1990...2000",
        "/movies/filter?media=laserdisc",
        "/movies/filter?page=first",
        "/movies/count?years=19x4",
    ] {
        let res = app.get(path).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST, "{}", path);
        assert!(!error_message(res).await.is_empty(), "{}", path);
    }

    let res = app.get("/movies/filter?media=laserdisc").await;
    assert_eq!(error_message(res).await, "Unknown media format `laserdisc`");
}

#[actix_rt::test]
async fn media_filter_matches_any_selected_format() {
    let app = spawn_app().await;

    let vhs = app.get_json("/movies/filter?media=vhs").await;
    assert_eq!(vhs["total_movies"], 5);

    let either = app.get_json("/movies/filter?media=VHS,Blu-ray%203D").await;
    assert_eq!(either["total_movies"], 7);
}

#[actix_rt::test]
async fn page_is_clamped_into_range() {
    let app = spawn_app().await;

    let last = app.get_json("/movies/filter?page=99").await;
    assert_eq!(last["current_page"], 2);
    assert_eq!(titles(&last).len(), 2);

    let first = app.get_json("/movies/filter?page=0").await;
    assert_eq!(first["current_page"], 1);
}

#[actix_rt::test]
async fn sort_keys_order_the_result() {
    let app = spawn_app().await;

    let by_rating = app.get_json("/movies/filter?sort_by=Bewertung%20desc").await;
    assert_eq!(titles(&by_rating)[0], "Spirited Away");

    let by_runtime = app
        .get_json("/movies/filter?sort_by=Laufzeit%20asc&page=2")
        .await;
    assert_eq!(
        titles(&by_runtime).last().map(String::as_str),
        Some("Untitled Home Video")
    );

    let unknown = app.get_json("/movies/filter?sort_by=popularity").await;
    assert_eq!(unknown["sort_by"], "Jahr desc");
}

#[actix_rt::test]
async fn seeded_random_pages_are_complete_and_repeatable() {
    let app = spawn_app().await;

    let first = app
        .get_json("/movies/filter?sort_by=Zufall&seed=s33d&include_counts=false")
        .await;
    assert_eq!(first["seed"], "s33d");
    assert!(first.get("genres").is_none());
    let again = app
        .get_json("/movies/filter?sort_by=Zufall&seed=s33d&include_counts=false")
        .await;
    assert_eq!(titles(&first), titles(&again));

    let second = app
        .get_json("/movies/filter?sort_by=Zufall&seed=s33d&page=2&include_counts=false")
        .await;
    let all = titles(&first)
        .into_iter()
        .chain(titles(&second))
        .collect::<HashSet<_>>();
    assert_eq!(all.len(), 14);

    let generated = app.get_json("/movies/filter?sort_by=Zufall").await;
    assert!(generated["seed"].as_str().is_some());
}

#[actix_rt::test]
async fn count_endpoint_reports_the_filtered_total() {
    let app = spawn_app().await;

    let body = app.get_json("/movies/count?genres=Horror").await;

    assert_eq!(body, serde_json::json!({ "total_movies": 5 }));
}

#[actix_rt::test]
async fn single_facet_endpoint() {
    let app = spawn_app().await;

    let body = app
        .get_json("/movies/facets/genres?genres=Horror&countries=Japan")
        .await;
    assert_eq!(body["dimension"], "genre");
    assert_eq!(
        body["counts"],
        serde_json::json!({ "Animation": 1, "Fantasy": 1 })
    );

    let res = app.get("/movies/facets/rating").await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        error_message(res).await,
        "unsupported facet dimension `rating`"
    );
}

#[actix_rt::test]
async fn autocomplete_suggests_titles_and_people() {
    let app = spawn_app().await;

    let movies = app.get_json("/movies/autocomplete?query=ali").await;
    assert_eq!(
        movies,
        serde_json::json!([
            { "type": "movie", "name": "Alien" },
            { "type": "movie", "name": "Aliens" }
        ])
    );

    let directors = app.get_json("/movies/autocomplete?query=carp").await;
    assert_eq!(
        directors,
        serde_json::json!([{ "type": "director", "name": "John Carpenter" }])
    );

    let empty = app.get_json("/movies/autocomplete?query=").await;
    assert_eq!(empty, serde_json::json!([]));
}

#[actix_rt::test]
async fn movie_details_include_the_full_cast() {
    let app = spawn_app().await;

    let body = app.get_json("/movies/1").await;

    assert_eq!(body["title"], "Alien");
    assert_eq!(
        body["cast"],
        serde_json::json!(["Sigourney Weaver", "John Hurt", "Ian Holm", "Tom Skerritt"])
    );
    assert_eq!(
        body["actors"],
        serde_json::json!(["Sigourney Weaver", "John Hurt", "Ian Holm"])
    );
    assert_eq!(body["formats"], serde_json::json!(["DVD (1)", "Blu-ray (1)"]));
    assert_eq!(body["directors"], serde_json::json!(["Ridley Scott"]));
}

#[actix_rt::test]
async fn unknown_movie_is_not_found() {
    let app = spawn_app().await;

    let res = app.get("/movies/999").await;

    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(error_message(res).await, "Movie 999 not found");
}

#[actix_rt::test]
async fn non_numeric_movie_id_is_a_json_not_found() {
    let app = spawn_app().await;

    let res = app.get("/movies/abc").await;

    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert!(!error_message(res).await.is_empty());
}
