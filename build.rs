//! Build script for the Spotify Playlist Shuffler.
//!
//! Copies the `.env.example` configuration template to the user's local data
//! directory, next to the place where the application looks for its `.env`
//! file. Failures only produce cargo warnings; the build never depends on a
//! writable home directory.

use std::{env, fs, path::PathBuf};

/// Main build script entry point that handles configuration file setup.
///
/// # File Operations
///
/// ## Source Location
/// The script looks for `.env.example` in the crate root directory (where Cargo.toml resides).
///
/// ## Destination Location
/// The template is copied to the platform-specific local data directory:
/// - Linux: `~/.local/share/playlist-shuffler/.env.example`
/// - macOS: `~/Library/Application Support/playlist-shuffler/.env.example`
/// - Windows: `%LOCALAPPDATA%/playlist-shuffler/.env.example`
fn main() {
    // Re-run if the template changes
    println!("cargo:rerun-if-changed=.env.example");

    if let Err(e) = copy_env_template() {
        println!("cargo:warning=could not install .env.example: {e}");
    }
}

fn copy_env_template() -> Result<(), Box<dyn std::error::Error>> {
    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR")?);
    let env_example_path = manifest_dir.join(".env.example");

    if !env_example_path.is_file() {
        println!(
            "cargo:warning=.env.example not found at {}",
            env_example_path.display()
        );
        return Ok(());
    }

    let Some(mut out_dir) = dirs::data_local_dir() else {
        return Ok(());
    };
    out_dir.push("playlist-shuffler");
    fs::create_dir_all(&out_dir)?;

    let contents = fs::read_to_string(&env_example_path)?;
    fs::write(out_dir.join(".env.example"), contents)?;
    Ok(())
}
