//! # Seed Data Generator
//!
//! Populates the database with a development catalog of covers, plates and
//! forms.
//!
//! ## Usage
//! ```bash
//! # Seed ./stockslip_dev.db
//! cargo run -p stockslip-db --bin seed
//!
//! # Specify database path and starting stock
//! cargo run -p stockslip-db --bin seed -- --db ./data/stockslip.db --stock 40
//! ```
//!
//! ## Generated Items
//! - Covers: every cover type in every colour (the bulk-eligible types
//!   included, so the bulk discount can be tried out)
//! - Plates: company × bike × plate type
//! - Forms: company × form type × variant
//!
//! SKUs follow `{GROUP}-{ABBREV}-{INDEX}`.

use std::env;
use stockslip_core::request::NewItem;
use stockslip_core::{Classification, ProductType};
use stockslip_db::{Database, DbConfig};
use tracing_subscriber::EnvFilter;

const COVER_TYPES: &[(&str, i64)] = &[
    ("Aster Cover", 10_000),
    ("Without Aster Cover", 8_500),
    ("Calendar Cover", 12_000),
    ("Leather Cover", 25_000),
];

const COVER_COLOURS: &[&str] = &["Red", "Blue", "Black", "Green", "Maroon"];

const PLATE_COMPANIES: &[(&str, &[&str])] = &[
    ("Honda", &["CD 70", "CG 125", "Pridor"]),
    ("Yamaha", &["YBR 125", "YB 125Z"]),
    ("Suzuki", &["GS 150", "GD 110"]),
];

const PLATE_TYPES: &[(&str, i64)] = &[("Front", 3_500), ("Back", 4_000), ("Pair", 7_000)];

const FORMS: &[(&str, &str, &[&str])] = &[
    ("Excise", "Transfer Form", &["Single", "Duplicate"]),
    ("Excise", "Registration Form", &["Single"]),
    ("Insurance", "Claim Form", &["Single", "Triplicate"]),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let args: Vec<String> = env::args().collect();

    let mut stock: i64 = 25;
    let mut db_path = String::from("./stockslip_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--stock" | "-s" => {
                if i + 1 < args.len() {
                    stock = args[i + 1].parse().unwrap_or(25);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Stockslip Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -s, --stock <N>    Starting quantity per item (default: 25)");
                println!("  -d, --db <PATH>    Database file path (default: ./stockslip_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Stockslip Seed Data Generator");
    println!("=============================");
    println!("Database: {}", db_path);
    println!("Stock:    {} per item", stock);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.items().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} items", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    println!();
    println!("Generating items...");

    let catalog = catalog(stock);
    let start = std::time::Instant::now();
    let mut generated = 0;

    for item in &catalog {
        if let Err(e) = db.items().insert(item).await {
            eprintln!("Failed to insert {}: {}", item.sku, e);
            continue;
        }
        generated += 1;
    }

    println!();
    println!("✓ Generated {} items in {:?}", generated, start.elapsed());

    let active = db.items().list_active().await?;
    let covers = active
        .iter()
        .filter(|i| i.classification.product_type == ProductType::Cover)
        .count();
    println!("  Covers: {}", covers);
    println!("  Others: {}", active.len() - covers);

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

/// Builds the full development catalog.
fn catalog(stock: i64) -> Vec<NewItem> {
    let mut items = Vec::new();

    for (type_idx, (cover_type, price)) in COVER_TYPES.iter().enumerate() {
        for (colour_idx, colour) in COVER_COLOURS.iter().enumerate() {
            items.push(NewItem {
                name: format!("{} {}", cover_type, colour),
                sku: format!("CVR-{}-{:03}", abbrev(cover_type), type_idx * 10 + colour_idx),
                classification: Classification {
                    product_type: ProductType::Cover,
                    cover_type: Some(cover_type.to_string()),
                    category: Some("Covers".to_string()),
                    ..Classification::default()
                },
                quantity: stock,
                price_cents: *price,
                base_price_cents: Some(*price),
                cost_price_cents: price * 70 / 100,
                low_stock_threshold: None,
            });
        }
    }

    let mut index = 0;
    for (company, bikes) in PLATE_COMPANIES {
        for bike in bikes.iter() {
            for (plate_type, price) in PLATE_TYPES {
                items.push(NewItem {
                    name: format!("{} {} Plate {}", company, bike, plate_type),
                    sku: format!("PLT-{}-{:03}", abbrev(company), index),
                    classification: Classification {
                        product_type: ProductType::Plate,
                        plate_company: Some(company.to_string()),
                        bike_name: Some(bike.to_string()),
                        plate_type: Some(plate_type.to_string()),
                        category: Some("Plates".to_string()),
                        ..Classification::default()
                    },
                    quantity: stock,
                    price_cents: *price,
                    base_price_cents: None,
                    cost_price_cents: price * 60 / 100,
                    low_stock_threshold: Some(3),
                });
                index += 1;
            }
        }
    }

    let mut index = 0;
    for (company, form_type, variants) in FORMS {
        for variant in variants.iter() {
            items.push(NewItem {
                name: format!("{} {} ({})", company, form_type, variant),
                sku: format!("FRM-{}-{:03}", abbrev(form_type), index),
                classification: Classification {
                    product_type: ProductType::Form,
                    form_company: Some(company.to_string()),
                    form_type: Some(form_type.to_string()),
                    form_variant: Some(variant.to_string()),
                    category: Some("Forms".to_string()),
                    ..Classification::default()
                },
                quantity: stock * 4,
                price_cents: 500,
                base_price_cents: None,
                cost_price_cents: 200,
                low_stock_threshold: Some(20),
            });
            index += 1;
        }
    }

    items
}

/// First letter of each word, uppercased ("Without Aster Cover" → "WAC").
fn abbrev(words: &str) -> String {
    words
        .split_whitespace()
        .filter_map(|w| w.chars().next())
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_uppercase())
        .collect()
}
