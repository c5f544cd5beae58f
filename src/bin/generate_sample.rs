//! Write small synthetic catalogs and a sales table so the pipeline can be
//! run end to end without Kaggle access:
//!
//! ```text
//! <out>/kaggle/games.csv     games catalog layout
//! <out>/kaggle/steam.csv     store catalog layout
//! <out>/steam_dataset.csv    promotional sales table
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Datelike, Duration, NaiveDate};
use clap::Parser;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

const ADJECTIVES: [&str; 12] = [
    "Hollow", "Crimson", "Silent", "Iron", "Neon", "Lost", "Frozen", "Golden", "Broken",
    "Wild", "Last", "Hidden",
];
const NOUNS: [&str; 12] = [
    "Knight", "Frontier", "Harbor", "Dungeon", "Signal", "Orchard", "Empire", "Circuit",
    "Voyage", "Garden", "Tower", "Legacy",
];
const GENRES: [&str; 6] = ["Action", "Indie", "RPG", "Strategy", "Simulation", "Puzzle"];
const STUDIOS: [&str; 5] = [
    "Pixel Forge", "Northwind Games", "Blue Lantern", "Tinyworks", "Red Kite",
];
const PRICES: [f64; 8] = [0.0, 4.99, 9.99, 14.99, 19.99, 29.99, 39.99, 59.99];

#[derive(Parser, Debug)]
#[command(about = "Generate synthetic Steam catalogs and a sales table")]
struct Args {
    /// Output directory
    #[arg(long, default_value = "data")]
    out_dir: PathBuf,

    /// Games per catalog
    #[arg(long, default_value_t = 200)]
    games: usize,

    #[arg(long, default_value_t = 42)]
    seed: u64,
}

struct Game {
    name: String,
    released: NaiveDate,
    price: f64,
    rating: u32,
    studio: &'static str,
    genre: &'static str,
}

fn random_game(rng: &mut StdRng, id: usize) -> Game {
    let first = NaiveDate::from_ymd_opt(2005, 1, 1).expect("valid date");
    Game {
        name: format!(
            "{} {} {}",
            ADJECTIVES.choose(rng).expect("non-empty"),
            NOUNS.choose(rng).expect("non-empty"),
            id
        ),
        released: first + Duration::days(rng.gen_range(0..7000)),
        price: *PRICES.choose(rng).expect("non-empty"),
        rating: rng.gen_range(35..=98),
        studio: STUDIOS.choose(rng).expect("non-empty"),
        genre: GENRES.choose(rng).expect("non-empty"),
    }
}

fn write_games_catalog(path: &Path, games: &[&Game]) -> csv::Result<()> {
    let mut w = csv::Writer::from_path(path)?;
    w.write_record(["AppID", "Name", "Release date", "Price", "Developers", "Publishers"])?;
    for (i, g) in games.iter().enumerate() {
        w.write_record([
            (1000 + i).to_string(),
            g.name.clone(),
            g.released.format("%b %-d, %Y").to_string(),
            format!("{:.2}", g.price),
            g.studio.to_string(),
            g.studio.to_string(),
        ])?;
    }
    w.flush()?;
    Ok(())
}

fn write_store_catalog(path: &Path, games: &[&Game]) -> csv::Result<()> {
    let mut w = csv::Writer::from_path(path)?;
    w.write_record(["appid", "name", "release_date", "developer", "publisher", "genres", "price"])?;
    for (i, g) in games.iter().enumerate() {
        w.write_record([
            (1000 + i).to_string(),
            // store catalog spells names differently
            format!(" {} ", g.name.to_uppercase()),
            g.released.format("%Y-%m-%d").to_string(),
            g.studio.to_string(),
            g.studio.to_string(),
            g.genre.to_string(),
            format!("{:.2}", g.price * 0.9),
        ])?;
    }
    w.flush()?;
    Ok(())
}

/// Older, better-rated, pricier games are discounted more often.
fn write_sales(path: &Path, games: &[Game], rng: &mut StdRng) -> csv::Result<usize> {
    let mut w = csv::Writer::from_path(path)?;
    w.write_record(["Name", "Price", "Rating", "Release", "Discount", "Ends", "Started", "Note"])?;
    let mut on_sale = 0;
    for g in games.iter().filter(|g| g.price > 0.0) {
        let age = 2025 - g.released.year();
        let score = 0.15 + 0.03 * age as f64 + g.price / 200.0 + (g.rating as f64 - 50.0) / 200.0;
        let record = if rng.gen_bool(score.clamp(0.05, 0.95)) {
            on_sale += 1;
            let discount = [10, 20, 25, 33, 50, 75].choose(rng).copied().unwrap_or(25);
            let note = if rng.gen_bool(0.3) { "New historical low!" } else { "" };
            [
                g.name.clone(),
                format!("${:.2}", g.price * (100 - discount) as f64 / 100.0),
                format!("{}%", g.rating),
                g.released.format("%b %-d, %Y").to_string(),
                format!("-{discount}%"),
                format!("Ends in {} days", rng.gen_range(1..14)),
                format!("Started {} days ago", rng.gen_range(0..10)),
                note.to_string(),
            ]
        } else {
            [
                g.name.clone(),
                format!("${:.2}", g.price),
                format!("{}%", g.rating),
                g.released.format("%b %-d, %Y").to_string(),
                String::new(),
                String::new(),
                String::new(),
                String::new(),
            ]
        };
        w.write_record(&record)?;
    }
    w.flush()?;
    Ok(on_sale)
}

fn main() {
    let args = Args::parse();
    let mut rng = StdRng::seed_from_u64(args.seed);

    let games: Vec<Game> = (0..args.games * 3 / 2).map(|i| random_game(&mut rng, i)).collect();
    // First two thirds go to the games catalog, last two thirds to the
    // store catalog; the middle third is in both.
    let third = games.len() / 3;
    let games_side: Vec<&Game> = games[..2 * third].iter().collect();
    let store_side: Vec<&Game> = games[third..].iter().collect();

    let kaggle_dir = args.out_dir.join("kaggle");
    fs::create_dir_all(&kaggle_dir).expect("Failed to create output directory");

    write_games_catalog(&kaggle_dir.join("games.csv"), &games_side)
        .expect("Failed to write games.csv");
    write_store_catalog(&kaggle_dir.join("steam.csv"), &store_side)
        .expect("Failed to write steam.csv");
    let sales_path = args.out_dir.join("steam_dataset.csv");
    let on_sale = write_sales(&sales_path, &games, &mut rng).expect("Failed to write sales table");

    println!(
        "Wrote {} + {} catalog rows to {} and a sales table with {on_sale} discounted games to {}",
        games_side.len(),
        store_side.len(),
        kaggle_dir.display(),
        sales_path.display()
    );
}
