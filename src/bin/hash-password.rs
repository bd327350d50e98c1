//! Print a bcrypt hash for `ADMIN_HASH_PASSWORD`.

use bcrypt::{hash, DEFAULT_COST};
use std::env;

/// Shorter passwords are refused for the admin account.
const MIN_PASSWORD_CHARS: usize = 12;

fn main() {
    let password = env::args().nth(1).unwrap_or_else(|| {
        eprintln!("Usage: cargo run --bin hash-password <PASSWORD>");
        std::process::exit(1);
    });

    if password.chars().count() < MIN_PASSWORD_CHARS {
        eprintln!(
            "Refusing to hash: admin passwords need at least {} characters",
            MIN_PASSWORD_CHARS
        );
        std::process::exit(1);
    }

    match hash(&password, DEFAULT_COST) {
        Ok(hashed) => {
            println!("\nCost : {}", DEFAULT_COST);
            println!("Hash : {}\n", hashed);
            println!("# Paste this into your .env (finance90 admin account):");
            println!("ADMIN_HASH_PASSWORD={}", hashed);
        }
        Err(e) => {
            eprintln!("Error hashing password: {}", e);
            std::process::exit(1);
        }
    }
}
