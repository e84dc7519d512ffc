//! CLI tool to manage API users.
//!
//! Usage:
//!   cargo run --bin manage-users -- create --email <email>
//!   cargo run --bin manage-users -- list
//!   cargo run --bin manage-users -- rotate --id <user-id>
//!   cargo run --bin manage-users -- deactivate --id <user-id>
//!   cargo run --bin manage-users -- activate --id <user-id>

use std::env;

use snapvalue_lib::config::Config;
use snapvalue_lib::db::DbPool;
use snapvalue_lib::models::UserSummary;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_usage();
        std::process::exit(1);
    }

    let command = &args[1];
    if matches!(command.as_str(), "help" | "--help" | "-h") {
        print_usage();
        return;
    }

    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            std::process::exit(1);
        }
    };

    let pool = match DbPool::new(&config.database).await {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error connecting to database: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = pool.run_migrations().await {
        eprintln!("Error running migrations: {}", e);
        std::process::exit(1);
    }

    match command.as_str() {
        "create" => {
            let email = flag_value(&args, "--email", "-e");
            create_user(&pool, &email).await;
        }
        "list" | "ls" => list_users(&pool).await,
        "rotate" => rotate_key(&pool, parse_id_arg(&args)).await,
        "deactivate" => set_active(&pool, parse_id_arg(&args), false).await,
        "activate" => set_active(&pool, parse_id_arg(&args), true).await,
        _ => {
            eprintln!("Unknown command: {}", command);
            print_usage();
            std::process::exit(1);
        }
    }
}

fn flag_value(args: &[String], long: &str, short: &str) -> String {
    let mut i = 2;
    while i < args.len() {
        if (args[i] == long || args[i] == short) && i + 1 < args.len() {
            return args[i + 1].clone();
        }
        i += 1;
    }
    eprintln!("Error: {} is required", long);
    std::process::exit(1);
}

fn parse_id_arg(args: &[String]) -> i32 {
    let raw = flag_value(args, "--id", "-i");
    match raw.parse() {
        Ok(id) => id,
        Err(_) => {
            eprintln!("Error: --id must be a number, got '{}'", raw);
            std::process::exit(1);
        }
    }
}

async fn create_user(pool: &DbPool, email: &str) {
    match pool.insert_user(email).await {
        Ok((user, key)) => {
            println!();
            println!("User created:");
            println!("  ID:    {}", user.id);
            println!("  Email: {}", user.email);
            println!();
            println!("  API key: {}", key);
            println!();
            println!("Store this key now. It cannot be shown again.");
            println!();
        }
        Err(e) => {
            eprintln!("Error creating user: {}", e);
            std::process::exit(1);
        }
    }
}

async fn list_users(pool: &DbPool) {
    let users = match pool.list_users().await {
        Ok(u) => u,
        Err(e) => {
            eprintln!("Error listing users: {}", e);
            std::process::exit(1);
        }
    };

    if users.is_empty() {
        println!("No users found.");
        return;
    }

    println!();
    println!(
        "{:<8} {:<40} {:<10} {:<20}",
        "ID", "EMAIL", "STATUS", "CREATED"
    );
    println!("{}", "-".repeat(80));

    for user in users {
        let item = UserSummary::from(user);
        let status = if item.is_active { "active" } else { "inactive" };

        let email = if item.email.chars().count() > 38 {
            format!("{}...", item.email.chars().take(35).collect::<String>())
        } else {
            item.email.clone()
        };

        println!(
            "{:<8} {:<40} {:<10} {:<20}",
            item.id,
            email,
            status,
            item.created_at.format("%Y-%m-%d %H:%M")
        );
    }
    println!();
}

async fn rotate_key(pool: &DbPool, id: i32) {
    match pool.rotate_user_api_key(id).await {
        Ok(key) => {
            println!("New API key for user {}: {}", id, key);
            println!("The previous key no longer works.");
        }
        Err(e) => {
            eprintln!("Error rotating key: {}", e);
            std::process::exit(1);
        }
    }
}

async fn set_active(pool: &DbPool, id: i32, active: bool) {
    let verb = if active { "activated" } else { "deactivated" };
    match pool.set_user_active(id, active).await {
        Ok(user) => println!("User {} ({}) {}.", user.id, user.email, verb),
        Err(e) => {
            eprintln!("Error updating user: {}", e);
            std::process::exit(1);
        }
    }
}

fn print_usage() {
    eprintln!();
    eprintln!("Usage: manage-users <command> [options]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  create --email <email>   Create a user and print their API key");
    eprintln!("  list, ls                 List all users");
    eprintln!("  rotate --id <id>         Issue a new API key for a user");
    eprintln!("  deactivate --id <id>     Block a user's API key");
    eprintln!("  activate --id <id>       Re-enable a user");
    eprintln!("  help                     Show this help");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  manage-users create --email owner@example.com");
    eprintln!("  manage-users deactivate --id 3");
    eprintln!();
}
