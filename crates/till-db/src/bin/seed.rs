//! # Seed Data Generator
//!
//! Populates a Till database with inventory and loyalty members for
//! development.
//!
//! ## Usage
//! ```bash
//! # 200 items (default) and a handful of members
//! cargo run -p till-db --bin seed
//!
//! # Custom amount and database path
//! cargo run -p till-db --bin seed -- --count 1000 --db ./data/till.db
//! ```
//!
//! Items get a SKU of `{CATEGORY}-{NAME}-{NNN}`, a price between 0.99 and
//! 24.99, stock between 0 and 60 and a reorder point of 5 or 10. Every item's
//! opening stock appears in its history like any other created item.

use std::env;
use till_core::{NewInventoryItem, NewMember};
use till_db::{Database, DbConfig};

/// Categories with their SKU code and a few product names.
const CATEGORIES: &[(&str, &str, &[&str])] = &[
    (
        "BEV",
        "Beverages",
        &["Cola", "Lemon Soda", "Mineral Water", "Orange Juice", "Iced Tea", "Coffee"],
    ),
    (
        "SNK",
        "Snacks",
        &["Potato Chips", "Peanuts", "Chocolate Bar", "Crackers", "Cookies", "Popcorn"],
    ),
    (
        "DRY",
        "Dairy",
        &["Whole Milk", "Yogurt", "Cheddar", "Butter", "Eggs", "Cream"],
    ),
    (
        "GRO",
        "Grocery",
        &["Rice", "Spaghetti", "Canned Tuna", "Flour", "Sugar", "Cooking Oil"],
    ),
    (
        "HOM",
        "Household",
        &["Dish Soap", "Paper Towels", "Trash Bags", "Sponges", "Bleach", "Matches"],
    ),
];

const BRANDS: &[&str] = &["House", "Sunrise", "Golden Field", "Blue Harbor"];

/// Members created on an empty database, with the tier each is moved to.
const MEMBERS: &[(&str, &str)] = &[
    ("Ana Reyes", "Bronze"),
    ("Ben Okafor", "Silver"),
    ("Chloe Martin", "Gold"),
    ("Dev Patel", "Platinum"),
    ("Emi Tanaka", "Bronze"),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut count: usize = 200;
    let mut db_path = String::from("./till_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(200);
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
                println!("Till Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of inventory items (default: 200)");
                println!("  -d, --db <PATH>    Database file path (default: ./till_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Till Seed Data Generator");
    println!("===========================");
    println!("Database: {}", db_path);
    println!("Items:    {}", count);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database, migrations applied");

    let existing = db.inventory().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} items", existing);
        println!("  Skipping seed to avoid duplicate SKUs.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let start = std::time::Instant::now();
    let mut generated = 0;
    let mut seed = 0;

    while generated < count && seed < count * 2 {
        let (code, category, names) = CATEGORIES[seed % CATEGORIES.len()];
        let name = names[(seed / CATEGORIES.len()) % names.len()];
        let item = generate_item(code, category, name, seed);
        seed += 1;

        match db.inventory().create_item(&item).await {
            Ok(_) => generated += 1,
            Err(e) => eprintln!("Failed to insert {}: {}", item.sku, e),
        }

        if generated > 0 && generated % 100 == 0 {
            println!("  Generated {} items...", generated);
        }
    }

    println!();
    println!("✓ Generated {} items in {:?}", generated, start.elapsed());

    let mut members = 0;
    for (name, tier) in MEMBERS {
        let member = db.members().create_member(&generate_member(name)).await?;
        if *tier != "Bronze" {
            db.members().change_tier(&member.member_id, tier).await?;
        }
        println!("  {} {} ({})", member.member_id, name, tier);
        members += 1;
    }
    println!("✓ Created {} members", members);

    let low = db.inventory().list_below_reorder_point().await?;
    println!();
    println!("  {} items at or below their reorder point", low.len());
    println!("✓ Seed complete!");

    db.close().await;
    Ok(())
}

/// Builds one item from a deterministic seed.
fn generate_item(code: &str, category: &str, name: &str, seed: usize) -> NewInventoryItem {
    let short: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(4)
        .collect::<String>()
        .to_uppercase();

    NewInventoryItem {
        sku: format!("{}-{}-{:03}", code, short, seed),
        name: format!("{} #{}", name, seed / 30 + 1),
        category: category.to_string(),
        brand: BRANDS[seed % BRANDS.len()].to_string(),
        price_cents: 99 + ((seed * 37) % 2400) as i64,
        stock_quantity: (seed % 61) as i64,
        reorder_point: if seed % 2 == 0 { 5 } else { 10 },
    }
}

fn generate_member(name: &str) -> NewMember {
    let handle = name.to_lowercase().replace(' ', ".");
    NewMember {
        name: name.to_string(),
        email: format!("{}@example.com", handle),
        phone: "+66 81 234 5678".to_string(),
        tier: "Bronze".to_string(),
    }
}
