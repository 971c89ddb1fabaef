// build.rs

use chrono::Utc;
use std::env;
use std::fs;
use std::path::Path;

fn main() {
    // Get the output directory set by Cargo
    let out_dir = env::var("OUT_DIR").expect("OUT_DIR is set by cargo");
    // Construct the path for the file where we'll write the build info
    let dest_path = Path::new(&out_dir).join("build_info.rs");

    // Format the current UTC time as the build stamp
    let build_date = Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string();

    // Pulled into main.rs with include!
    fs::write(
        &dest_path,
        format!("pub const BUILD_DATE: &str = \"{}\";", build_date),
    ).expect("write build_info.rs");

    // Only re-run when build.rs itself changes
    println!("cargo:rerun-if-changed=build.rs");
}
