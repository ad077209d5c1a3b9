//! Print a bcrypt hash for the admin seed, ready to paste into `.env`.

use std::env;

fn main() {
    let mut args = env::args().skip(1);
    let password = args.next().unwrap_or_else(|| {
        eprintln!("Usage: cargo run --bin hash-password <PASSWORD> [COST]");
        std::process::exit(1);
    });

    let cost = match args.next() {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            eprintln!("COST must be a number between 4 and 31");
            std::process::exit(1);
        }),
        None => env::var("BCRYPT_COST")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(bcrypt::DEFAULT_COST),
    };

    if password.chars().count() < 6 {
        eprintln!("Password must be at least 6 characters long");
        std::process::exit(1);
    }

    match bcrypt::hash(&password, cost) {
        Ok(hashed) => {
            println!("Cost     : {}", cost);
            println!("Hash     : {}\n", hashed);
            println!("# Paste this into your .env:");
            println!("ADMIN_HASH_PASSWORD={}", hashed);
        }
        Err(e) => {
            eprintln!("Error hashing password: {}", e);
            std::process::exit(1);
        }
    }
}
