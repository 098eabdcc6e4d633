use std::process::Command;
use std::env;

fn main() {
    // Set build-time environment variables
    set_build_info();

    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=Cargo.toml");
    println!("cargo:rerun-if-env-changed=GIT_COMMIT");
}

fn set_build_info() {
    // Get build timestamp
    let build_time = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
    println!("cargo:rustc-env=BUILD_TIME={}", build_time);

    // Set target triple
    let target = env::var("TARGET").unwrap_or_else(|_| "unknown".to_string());
    println!("cargo:rustc-env=TARGET_TRIPLE={}", target);

    // Docker builds have no .git; let the caller pass the commit in
    if let Ok(commit) = env::var("GIT_COMMIT") {
        if !commit.trim().is_empty() {
            println!("cargo:rustc-env=GIT_COMMIT={}", commit.trim());
            return;
        }
    }

    // Get git commit hash if available
    if let Ok(output) = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
    {
        if output.status.success() {
            let commit = String::from_utf8_lossy(&output.stdout).trim().to_string();
            println!("cargo:rustc-env=GIT_COMMIT={}", commit);
        }
    }
}
