//! End-to-end tests for the `clone` command.
//!
//! Cloning from a real host needs the network, so these tests stop at the
//! checks made before anything is fetched.

mod common;
use common::prelude::*;

#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_clone_refuses_existing_directory_by_default() {
    let fixture = TestFixture::new();
    fixture.child("demo/notes.txt").write_str("keep me").unwrap();

    fixture
        .command()
        .args(["clone", "alice", "demo"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to create or clone repository"))
        .stderr(predicate::str::contains("target directory already exists"));

    fixture
        .child("demo/notes.txt")
        .assert(predicate::str::contains("keep me"));
}

#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_clone_delete_is_not_approved_without_terminal() {
    let fixture = TestFixture::new();
    fixture.child("demo/notes.txt").write_str("keep me").unwrap();

    fixture
        .command()
        .args(["clone", "alice", "demo", "--on-exists", "delete"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Delete not approved"));

    fixture.child("demo/notes.txt").assert(predicate::path::exists());
}

#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_clone_rejects_unknown_on_exists_value() {
    let fixture = TestFixture::new();

    fixture
        .command()
        .args(["clone", "alice", "demo", "--on-exists", "overwrite"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value 'overwrite'"));
}

#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_clone_requires_user_and_name() {
    let fixture = TestFixture::new();

    fixture
        .command()
        .args(["clone", "alice"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("<NAME>"));
}
