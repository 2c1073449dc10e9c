use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use ndarray::ArrayD;
use ndarray_npy::read_npy;

fn panelcube_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_panelcube"))
}

fn write_inputs(dir: &Path) -> (PathBuf, PathBuf) {
    let a = dir.join("part0.csv");
    let b = dir.join("part1.csv");
    fs::write(&a, "___npi,year,drug_a,drug_b\nK1,2014,5,7\nK1,2015,1,0\n").expect("write part0");
    fs::write(&b, "___npi,year,drug_a,drug_b\nK2,2014,3,9\n").expect("write part1");
    (a, b)
}

fn run(args: &[&str]) -> Output {
    Command::new(panelcube_bin())
        .args(args)
        .output()
        .expect("run panelcube")
}

fn assert_success(out: &Output, what: &str) {
    assert!(
        out.status.success(),
        "{what} failed\nstdout:\n{}\nstderr:\n{}",
        String::from_utf8_lossy(&out.stdout),
        String::from_utf8_lossy(&out.stderr)
    );
}

#[test]
fn build_writes_container_and_inspect_reads_it() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (a, b) = write_inputs(dir.path());
    let cube = dir.path().join("cube");

    let out = run(&[
        "build",
        "-f",
        &format!("{} {}", a.display(), b.display()),
        "-o",
        cube.to_str().expect("utf-8 path"),
        "-d",
        "int32",
    ]);
    assert_success(&out, "panelcube build");

    let core: ArrayD<i32> = read_npy(cube.join("data/core_array.npy")).expect("read core array");
    assert_eq!(core.shape(), &[2, 2, 2]);
    let (values, _) = core.into_raw_vec_and_offset();
    assert_eq!(values, vec![5, 7, 1, 0, 3, 9, 0, 0]);

    let out = run(&["inspect", cube.to_str().expect("utf-8 path")]);
    assert_success(&out, "panelcube inspect");
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("K1, K2"), "stdout: {stdout}");
    assert!(stdout.contains("2014, 2015"), "stdout: {stdout}");
    assert!(stdout.contains("drug_a, drug_b"), "stdout: {stdout}");
}

#[test]
fn build_refuses_existing_output_without_force() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (a, _) = write_inputs(dir.path());
    let cube = dir.path().join("cube");
    fs::create_dir_all(&cube).expect("create cube dir");
    fs::write(cube.join("keep.txt"), "x").expect("write marker");

    let input = a.to_str().expect("utf-8 path");
    let output = cube.to_str().expect("utf-8 path");

    let out = run(&["build", "-f", input, "-o", output]);
    assert!(!out.status.success());
    assert!(cube.join("keep.txt").exists());

    let out = run(&["build", "-f", input, "-o", output, "--force"]);
    assert_success(&out, "panelcube build --force");
    assert!(!cube.join("keep.txt").exists());
    assert!(cube.join("manifest.json").exists());
}

#[test]
fn verify_ordering_rejects_split_key() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("split.csv");
    fs::write(&input, "___npi,year,x\nA,1,1\nB,1,2\nA,2,3\n").expect("write input");
    let cube = dir.path().join("cube");

    let out = run(&[
        "build",
        "-f",
        input.to_str().expect("utf-8 path"),
        "-o",
        cube.to_str().expect("utf-8 path"),
        "--ordering",
        "verify",
    ]);
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("not grouped by key"), "stderr: {stderr}");
}

#[test]
fn config_file_supplies_defaults_and_flags_override() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (a, _) = write_inputs(dir.path());
    let cube = dir.path().join("cube");
    let config = dir.path().join("cube.json");
    fs::write(
        &config,
        format!(
            "{{\"inputs\": [{:?}], \"output\": {:?}, \"dtype\": \"float32\"}}",
            a.to_str().expect("utf-8 path"),
            dir.path().join("unused").to_str().expect("utf-8 path"),
        ),
    )
    .expect("write config");

    let out = run(&[
        "build",
        "--config",
        config.to_str().expect("utf-8 path"),
        "-o",
        cube.to_str().expect("utf-8 path"),
    ]);
    assert_success(&out, "panelcube build --config");

    assert!(!dir.path().join("unused").exists());
    let core: ArrayD<f32> = read_npy(cube.join("data/core_array.npy")).expect("read core array");
    assert_eq!(core.shape(), &[1, 2, 2]);
}
