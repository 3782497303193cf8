//! Print an Argon2 hash for seeding accounts by hand.
//!
//! Usage: `cargo run --example hash_password -- <password>`

use classroom_server::auth::password::hash_password;

fn main() -> anyhow::Result<()> {
    let password = std::env::args()
        .nth(1)
        .ok_or_else(|| anyhow::anyhow!("Usage: hash_password <password>"))?;
    let hash = hash_password(&password).map_err(|e| anyhow::anyhow!("Failed to hash: {e}"))?;
    println!("{hash}");
    Ok(())
}
