//! Prediction specs
//!
//! Run the prediction pipeline on this machine against scripted tools.

use crate::prelude::*;

fn images(project: &Project, count: usize) -> Vec<String> {
    (1..=count)
        .map(|i| {
            let path = project.file(&format!("images/spheroid_{i}.tif"), &format!("image {i}"));
            path.display().to_string()
        })
        .collect()
}

fn predict(project: &Project, inputs: &[String], extra: &[&str]) -> Cli {
    let output = project.path("results");
    let mut args = vec!["predict", "--output", output.to_str().unwrap(), "--microscope", "3"];
    for input in inputs {
        args.push("--input");
        args.push(input);
    }
    args.extend_from_slice(extra);
    project.mscope().args(&args)
}

#[test]
fn local_prediction_writes_result_sets() {
    let project = Project::with_tools();
    let inputs = images(&project, 2);

    predict(&project, &inputs, &["--local"])
        .passes()
        .stdout_has("predict job job-")
        .stdout_has("running on localhost")
        .stdout_has("done with spheroid_1")
        .stdout_has("[running prediction] 1/2 spheroid_1.tif")
        .stdout_has("[running prediction] 2/2 spheroid_2.tif")
        .stdout_has("completed");

    assert_eq!(
        sorted_names(&project.path("results")),
        vec![
            "spheroid_1_m3.rdf",
            "spheroid_1_m3.v",
            "spheroid_1_m3_cnn.v",
            "spheroid_2_m3.rdf",
            "spheroid_2_m3.v",
            "spheroid_2_m3_cnn.v",
        ]
    );
    assert!(project.is_empty_dir("staging"));
}

#[test]
fn prediction_selects_the_declared_local_host() {
    let project = Project::with_tools();
    let inputs = images(&project, 1);

    predict(&project, &inputs, &[]).passes().stdout_has("running on localhost");
    assert!(project.path("results/spheroid_1_m3_cnn.v").exists());
}

#[test]
fn failing_tool_exits_one_and_keeps_its_output() {
    let project = Project::with_tools();
    project.script("predict", "echo \"CUDA error: out of memory\"\nexit 1");
    let inputs = images(&project, 2);

    predict(&project, &inputs, &["--local"])
        .exits(1)
        .stdout_has("CUDA error: out of memory")
        .stdout_lacks("[running prediction] 1/2")
        .stderr_has("failed");

    assert!(!project.path("results").exists());
    assert!(project.is_empty_dir("staging"));
}

#[test]
fn no_declared_hosts_means_no_host_available() {
    let project = Project::with_tools();
    let localhost = "[[hosts]]\nname = \"localhost\"\ndefault = true\ncpu_load_threshold = 1000.0\n";
    let config = project.default_config().replace(localhost, "");
    project.config(&config);
    let inputs = images(&project, 1);

    predict(&project, &inputs, &[]).exits(1).stderr_has("no host passed selection");
    assert!(project.is_empty_dir("staging"));
}

#[test]
fn duplicate_input_names_are_rejected() {
    let project = Project::with_tools();
    let a = project.file("a/spheroid.tif", "a").display().to_string();
    let b = project.file("b/spheroid.tif", "b").display().to_string();

    predict(&project, &[a, b], &["--local"]).exits(1).stderr_has("duplicate input file name");
}
