//! Retraining specs
//!
//! Dataset preparation runs on this machine against scripted tools.

use crate::prelude::*;

fn annotated_data(project: &Project, count: usize) -> String {
    for i in 1..=count {
        project.file(&format!("data/sample_{i}.v"), "vol");
        project.file(&format!("data/sample_{i}.rdf"), "rdf");
    }
    project.path("data").display().to_string()
}

#[test]
fn dataset_is_prepared_without_training() {
    let project = Project::with_tools();
    let data = annotated_data(&project, 2);

    project
        .mscope()
        .args(&["retrain", "--dataset", "42", "--desc", "lab", "--data-dir", data.as_str()])
        .args(&["--no-split", "--no-train"])
        .passes()
        .stdout_has("retrain job job-")
        .stdout_has("[dataset created]")
        .stdout_lacks("[training fold started]")
        .stdout_has("completed");

    assert_eq!(
        sorted_names(&project.path("raw/Dataset042_lab/imagesTr")),
        vec!["sample_1_0000.v", "sample_2_0000.v"]
    );
    assert!(project.is_empty_dir("training"));
    assert!(project.is_empty_dir("staging"));
}

#[test]
fn unknown_host_is_rejected() {
    let project = Project::with_tools();
    let data = annotated_data(&project, 1);

    project
        .mscope()
        .args(&["retrain", "--host", "gpu-z", "--dataset", "1", "--desc", "d", "--data-dir", data.as_str()])
        .exits(1)
        .stderr_has("unknown host: gpu-z");
}

#[test]
fn data_dir_without_pairs_is_rejected() {
    let project = Project::with_tools();
    project.file("data/orphan.v", "vol");
    let data = project.path("data").display().to_string();

    project
        .mscope()
        .args(&["retrain", "--dataset", "1", "--desc", "d", "--data-dir", data.as_str()])
        .exits(1)
        .stderr_has("no matching volume/descriptor pairs");
}
