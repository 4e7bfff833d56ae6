use std::process::Command;

fn git(args: &[&str]) -> Option<std::process::Output> {
    Command::new("git").args(args).output().ok()
}

fn main() {
    println!("cargo:rerun-if-changed=../../.git/HEAD");
    println!("cargo:rerun-if-changed=../../.git/refs");

    let sha = git(&["rev-parse", "HEAD"])
        .filter(|out| out.status.success())
        .map_or_else(
            || "unknown".to_string(),
            |out| String::from_utf8_lossy(&out.stdout).trim().to_string(),
        );
    // Outside a checkout there is nothing to compare against; report dirty.
    let dirty = git(&["diff", "--quiet"]).map_or(true, |out| !out.status.success());

    println!("cargo:rustc-env=RACE_BENCH_GIT_SHA={sha}");
    println!("cargo:rustc-env=RACE_BENCH_GIT_DIRTY={dirty}");
}
