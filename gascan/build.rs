// Build script: stage the automation bundle and runner for embedding.
// Env (all optional): GASCAN_BUNDLE, GASCAN_RUNNER, GASCAN_RELEASE_VERSION,
// GASCAN_BUNDLE_VERSION, GASCAN_RUNNER_VERSION, GASCAN_PYTHON_VERSION,
// GASCAN_CACHE_PATHS, GASCAN_EXTRACT_RUNNER_CONFIG,
// GASCAN_EXTRACT_DYNAMIC_INVENTORY.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;

const PASSTHROUGH: [(&str, &str); 7] = [
    ("GASCAN_RELEASE_VERSION", ""),
    ("GASCAN_BUNDLE_VERSION", "unknown"),
    ("GASCAN_RUNNER_VERSION", "unknown"),
    ("GASCAN_PYTHON_VERSION", "unknown"),
    (
        "GASCAN_CACHE_PATHS",
        "/tmp/.gascan/inventory.cache,~/.config/gascan/cache/gas_inventory_dynamic_inventory_plugin*",
    ),
    ("GASCAN_EXTRACT_RUNNER_CONFIG", ""),
    ("GASCAN_EXTRACT_DYNAMIC_INVENTORY", ""),
];

fn main() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR"));
    println!("cargo:rerun-if-changed=build.rs");

    for (name, default) in PASSTHROUGH {
        println!("cargo:rerun-if-env-changed={name}");
        let value = env::var(name)
            .map(|value| value.replace('"', ""))
            .unwrap_or_else(|_| default.to_string());
        let value = if name == "GASCAN_RELEASE_VERSION" && value.is_empty() {
            env::var("CARGO_PKG_VERSION").expect("CARGO_PKG_VERSION")
        } else {
            value
        };
        println!("cargo:rustc-env=GASCAN_BUILD_{}={value}", &name["GASCAN_".len()..]);
    }

    let bundle = stage("GASCAN_BUNDLE", &out_dir.join("bundle.tgz"), empty_bundle);
    stage("GASCAN_RUNNER", &out_dir.join("runner.pex"), Vec::new);

    let automations = automation_names(&bundle);
    fs::write(out_dir.join("automations.txt"), automations.join(",")).expect("write automations");
}

/// Copy the file named by `var` to `dest`, or write `fallback()` there.
fn stage(var: &str, dest: &Path, fallback: fn() -> Vec<u8>) -> Vec<u8> {
    println!("cargo:rerun-if-env-changed={var}");
    let bytes = match env::var_os(var) {
        Some(source) => {
            println!("cargo:rerun-if-changed={}", Path::new(&source).display());
            fs::read(&source).unwrap_or_else(|err| panic!("read {}: {err}", Path::new(&source).display()))
        }
        None => {
            println!("cargo:warning={var} is not set, embedding a placeholder");
            fallback()
        }
    };
    fs::write(dest, &bytes).unwrap_or_else(|err| panic!("write {}: {err}", dest.display()));
    bytes
}

fn empty_bundle() -> Vec<u8> {
    let tar = tar::Builder::new(Vec::new()).into_inner().expect("finish empty tar");
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    std::io::Write::write_all(&mut encoder, &tar).expect("gzip empty tar");
    encoder.finish().expect("finish gzip")
}

/// Top-level `*.yaml` entries directly under `automation/`, sorted.
fn automation_names(bundle: &[u8]) -> Vec<String> {
    let mut archive = tar::Archive::new(GzDecoder::new(bundle));
    let mut names = Vec::new();
    for entry in archive.entries().expect("read bundle") {
        let entry = entry.expect("read bundle entry");
        let name = entry.path().expect("bundle entry name").display().to_string();
        if name.contains("..") {
            continue;
        }
        let name = name.trim_start_matches("./");
        let Some(name) = name.strip_prefix("automation/") else {
            continue;
        };
        if name.ends_with(".yaml") && !name.contains('/') {
            names.push(name.to_string());
        }
    }
    names.sort();
    names
}
