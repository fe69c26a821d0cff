use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use chrono::{DateTime, FixedOffset};
use semver::Version;

use crate::error::{Error, Result};
use crate::model::{
    Branch, Commit, Identity, PushResult, RefUpdate, RefUpdateStatus, TagAnnotation, TagRecord,
};
use crate::repository::{CheckoutRequest, MergeRequest, PushRequest, UpstreamMode};
use crate::sha::GitSha;

const FIELD: char = '\u{0}';
const RECORD: char = '\u{1e}';

const LOG_FORMAT: &str = "--format=%H%x00%an%x00%ae%x00%aI%x00%cn%x00%ce%x00%cI%x00%B%x1e";
const TAG_FORMAT: &str = "--format=%(refname:strip=2)%00%(objecttype)%00%(objectname)%00%(*objectname)%00%(taggername)%00%(taggeremail)%00%(taggerdate:iso-strict)%00%(contents)%1e";

// Reads credentials from the environment of the git process, so the token
// never appears on a command line.
const CREDENTIAL_HELPER: &str =
    "credential.helper=!f() { echo \"username=${TANDEM_PUSH_USERNAME}\"; echo \"password=${TANDEM_PUSH_PASSWORD}\"; }; f";

fn git(dir: &Path) -> Command {
    let mut command = Command::new("git");
    command.current_dir(dir).env("GIT_TERMINAL_PROMPT", "0");
    command
}

fn with_identity(command: &mut Command, identity: &Identity) {
    command
        .arg("-c")
        .arg(format!("user.name={}", identity.name))
        .arg("-c")
        .arg(format!("user.email={}", identity.email));
}

fn describe(command: &Command) -> String {
    command
        .get_args()
        .map(|a| a.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Runs `command`, returning its output whatever the exit status.
fn run(mut command: Command, dir: &Path) -> Result<Output> {
    let description = describe(&command);
    log::debug!("git {} (in {})", description, dir.display());
    command.output().map_err(|e| Error::GitCommand {
        command: description,
        dir: dir.to_path_buf(),
        stderr: e.to_string(),
    })
}

fn failure(command: &str, dir: &Path, output: &Output) -> Error {
    let stderr = String::from_utf8_lossy(&output.stderr);

    // Provide helpful error message for common auth failures
    let stderr = if stderr.contains("Authentication failed")
        || stderr.contains("Permission denied")
        || stderr.contains("Could not read from remote repository")
        || stderr.contains("could not read Username")
    {
        format!(
            "Authentication failed. Make sure you have access to the repository.\n\
            Either configure an API token property for the provider, or set up\n\
            an SSH key or credential helper for git.\n\
            Error: {}",
            stderr.trim()
        )
    } else {
        stderr.trim().to_string()
    };

    Error::GitCommand {
        command: command.to_string(),
        dir: dir.to_path_buf(),
        stderr,
    }
}

/// Runs `git <args>` in `dir` and returns stdout, failing on a non-zero exit.
fn run_ok(dir: &Path, args: &[&str]) -> Result<String> {
    let mut command = git(dir);
    command.args(args);
    let output = run(command, dir)?;
    if !output.status.success() {
        return Err(failure(&args.join(" "), dir, &output));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Runs a query that exits with status 1 to mean "no answer".
fn run_query(dir: &Path, args: &[&str]) -> Result<Option<String>> {
    let mut command = git(dir);
    command.args(args);
    let output = run(command, dir)?;
    match output.status.code() {
        Some(0) => Ok(Some(
            String::from_utf8_lossy(&output.stdout).trim().to_string(),
        )),
        Some(1) => Ok(None),
        _ => Err(failure(&args.join(" "), dir, &output)),
    }
}

fn unexpected_output(command: &str, dir: &Path, detail: String) -> Error {
    Error::GitCommand {
        command: command.to_string(),
        dir: dir.to_path_buf(),
        stderr: format!("unexpected output: {}", detail),
    }
}

pub fn is_repository(dir: &Path) -> bool {
    dir.join(".git").exists()
}

pub fn init(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)?;
    run_ok(dir, &["init", "--quiet"])?;
    // Independent of init.defaultBranch.
    run_ok(dir, &["symbolic-ref", "HEAD", "refs/heads/master"])?;
    Ok(())
}

/// Clone a repository into `target_dir`
///
/// This uses the system git command, which automatically handles:
/// - SSH keys from ~/.ssh/
/// - Git credential helpers
/// - Personal access tokens
/// - Any authentication configured in ~/.gitconfig
pub fn clone(url: &str, target_dir: &Path) -> Result<()> {
    let parent = match target_dir.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir()?,
    };
    fs::create_dir_all(&parent)?;

    let mut command = git(&parent);
    command.args(["clone", "--quiet", url]).arg(target_dir);
    let output = run(command, &parent)?;
    if !output.status.success() {
        return Err(failure(&format!("clone {}", url), &parent, &output));
    }
    Ok(())
}

pub fn add(dir: &Path, pathspec: &str) -> Result<()> {
    run_ok(dir, &["add", "--", pathspec]).map(|_| ())
}

pub fn commit(dir: &Path, message: &str, identity: Option<&Identity>) -> Result<GitSha> {
    let mut command = git(dir);
    if let Some(identity) = identity {
        with_identity(&mut command, identity);
    }
    command.args(["commit", "--quiet", "--allow-empty", "-m", message]);
    let output = run(command, dir)?;
    if !output.status.success() {
        return Err(failure("commit", dir, &output));
    }
    let head = run_ok(dir, &["rev-parse", "HEAD"])?;
    GitSha::new(head.trim())
}

pub fn branches(dir: &Path) -> Result<Vec<Branch>> {
    let stdout = run_ok(
        dir,
        &["for-each-ref", "--format=%(refname:strip=2)", "refs/heads"],
    )?;
    Ok(stdout
        .lines()
        .filter(|l| !l.is_empty())
        .map(Branch::new)
        .collect())
}

pub fn current_branch(dir: &Path) -> Result<Branch> {
    let name = run_ok(dir, &["symbolic-ref", "--short", "HEAD"])?;
    Ok(Branch::new(name.trim()))
}

pub fn checkout(dir: &Path, request: &CheckoutRequest) -> Result<()> {
    let mut args = vec!["checkout", "--quiet"];
    if request.create {
        args.push("-b");
    }
    args.push(&request.target);
    if request.create {
        if let Some(start_point) = &request.start_point {
            args.push(start_point);
        }
    }
    run_ok(dir, &args)?;

    if request.upstream == UpstreamMode::SetUpstream {
        // Written directly so it works before origin/<branch> exists.
        config_set(dir, &format!("branch.{}.remote", request.target), "origin")?;
        config_set(
            dir,
            &format!("branch.{}.merge", request.target),
            &Branch::new(&request.target).reference(),
        )?;
    }
    Ok(())
}

pub fn create_branch(dir: &Path, name: &str, start_point: Option<&str>) -> Result<()> {
    let mut args = vec!["branch", name];
    if let Some(start_point) = start_point {
        args.push(start_point);
    }
    run_ok(dir, &args).map(|_| ())
}

pub fn push(dir: &Path, request: &PushRequest) -> Result<PushResult> {
    let mut command = git(dir);
    if let Some(credentials) = &request.credentials {
        command
            .args(["-c", "credential.helper=", "-c", CREDENTIAL_HELPER])
            .env("TANDEM_PUSH_USERNAME", &credentials.username)
            .env("TANDEM_PUSH_PASSWORD", &credentials.password);
    }
    command.args(["push", "--porcelain"]);
    if request.force {
        command.arg("--force");
    }
    if request.tags {
        command.arg("--tags");
    }
    command.arg(&request.remote).args(&request.refspecs);

    let output = run(command, dir)?;
    let result = parse_push_porcelain(&String::from_utf8_lossy(&output.stdout));
    if !output.status.success() && result.updates.is_empty() {
        return Err(failure(&format!("push {}", request.remote), dir, &output));
    }
    Ok(result)
}

/// Parses `git push --porcelain` output into per-ref updates.
///
/// Each ref line is `<flag>\t<from>:<to>\t<summary>`, where a rejected
/// summary carries the reason in parentheses.
pub fn parse_push_porcelain(stdout: &str) -> PushResult {
    let mut result = PushResult::default();
    for line in stdout.lines() {
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 3 || fields[0].chars().count() != 1 {
            continue;
        }
        let ref_name = fields[1]
            .split_once(':')
            .map_or(fields[1], |(_, to)| to)
            .to_string();
        let summary = fields[2];
        let reason = summary
            .rsplit_once('(')
            .and_then(|(_, r)| r.strip_suffix(')'))
            .map(str::to_string);

        let status = match fields[0] {
            "=" => RefUpdateStatus::UpToDate,
            " " | "+" | "-" | "*" => RefUpdateStatus::Ok,
            "!" if summary.starts_with("[remote rejected]") => RefUpdateStatus::RemoteRejected,
            "!" => match reason.as_deref() {
                Some("non-fast-forward") | Some("fetch first") => {
                    RefUpdateStatus::RejectedNonFastForward
                }
                Some("stale info") => RefUpdateStatus::RejectedRemoteChanged,
                _ => RefUpdateStatus::RejectedOther,
            },
            _ => continue,
        };

        let mut update = RefUpdate::new(ref_name, status);
        if !status.is_accepted() {
            if let Some(reason) = reason {
                update = update.with_message(reason);
            }
        }
        result.add(update);
    }
    result
}

pub fn pull(dir: &Path, remote: &str, branch: Option<&str>) -> Result<()> {
    let mut args = vec!["pull", "--quiet", remote];
    if let Some(branch) = branch {
        args.push(branch);
    }
    run_ok(dir, &args).map(|_| ())
}

fn merge_args(request: &MergeRequest) -> Vec<&str> {
    let mut args = vec!["merge", "--quiet", "--no-edit", request.fast_forward.flag()];
    args.extend_from_slice(request.strategy.args());
    args.push(&request.branch);
    args
}

pub fn merge(dir: &Path, request: &MergeRequest, identity: Option<&Identity>) -> Result<()> {
    let args = merge_args(request);
    let mut command = git(dir);
    if let Some(identity) = identity {
        with_identity(&mut command, identity);
    }
    command.args(&args);
    let output = run(command, dir)?;
    if !output.status.success() {
        let error = failure(&args.join(" "), dir, &output);
        // leave the work tree as it was before the merge
        let _ = run_ok(dir, &["merge", "--abort"]);
        return Err(error);
    }
    Ok(())
}

pub fn tag_annotated(dir: &Path, name: &str, message: &str, tagger: &Identity) -> Result<()> {
    let mut command = git(dir);
    with_identity(&mut command, tagger);
    command.args(["tag", "-a", name, "-m", message]);
    let output = run(command, dir)?;
    if !output.status.success() {
        return Err(failure(&format!("tag -a {}", name), dir, &output));
    }
    Ok(())
}

pub fn tag_lightweight(dir: &Path, name: &str) -> Result<()> {
    run_ok(dir, &["tag", name]).map(|_| ())
}

pub fn tags(dir: &Path) -> Result<Vec<TagRecord>> {
    let stdout = run_ok(dir, &["for-each-ref", TAG_FORMAT, "refs/tags"])?;
    parse_tags(&stdout).map_err(|detail| unexpected_output("for-each-ref refs/tags", dir, detail))
}

fn parse_date(value: &str) -> std::result::Result<DateTime<FixedOffset>, String> {
    DateTime::parse_from_rfc3339(value).map_err(|e| format!("date '{}': {}", value, e))
}

fn parse_sha(value: &str) -> std::result::Result<GitSha, String> {
    GitSha::new(value).map_err(|e| e.to_string())
}

fn records(stdout: &str) -> impl Iterator<Item = &str> {
    stdout
        .split(RECORD)
        .map(|r| r.trim_start_matches('\n'))
        .filter(|r| !r.is_empty())
}

/// Parses the `for-each-ref` output produced with the tag format. Tags on
/// anything other than a commit are skipped.
pub(crate) fn parse_tags(stdout: &str) -> std::result::Result<Vec<TagRecord>, String> {
    let mut tags = Vec::new();
    for record in records(stdout) {
        let fields: Vec<&str> = record.splitn(8, FIELD).collect();
        if fields.len() != 8 {
            return Err(format!("tag record '{}'", record));
        }
        let tag = match fields[1] {
            "commit" => TagRecord {
                name: fields[0].to_string(),
                commit: parse_sha(fields[2])?,
                annotation: None,
            },
            "tag" if !fields[3].is_empty() => TagRecord {
                name: fields[0].to_string(),
                commit: parse_sha(fields[3])?,
                annotation: Some(TagAnnotation {
                    tagger: Identity::new(
                        fields[4],
                        fields[5].trim_start_matches('<').trim_end_matches('>'),
                    ),
                    tagged_at: parse_date(fields[6])?,
                    message: fields[7].trim_end().to_string(),
                }),
            },
            _ => continue,
        };
        tags.push(tag);
    }
    Ok(tags)
}

pub fn config_get(dir: &Path, key: &str) -> Result<Option<String>> {
    run_query(dir, &["config", "--get", key])
}

pub fn config_set(dir: &Path, key: &str, value: &str) -> Result<()> {
    run_ok(dir, &["config", key, value]).map(|_| ())
}

pub fn all_commits(dir: &Path) -> Result<Vec<Commit>> {
    let mut command = git(dir);
    command.args(["log", "--all", "--author-date-order", LOG_FORMAT]);
    let output = run(command, dir)?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        if stderr.contains("does not have any commits") {
            return Ok(Vec::new());
        }
        return Err(failure("log --all", dir, &output));
    }
    parse_log(&String::from_utf8_lossy(&output.stdout))
        .map_err(|detail| unexpected_output("log --all", dir, detail))
}

/// Parses `git log` output produced with the commit format.
pub(crate) fn parse_log(stdout: &str) -> std::result::Result<Vec<Commit>, String> {
    records(stdout)
        .map(|record| {
            let fields: Vec<&str> = record.splitn(8, FIELD).collect();
            if fields.len() != 8 {
                return Err(format!("commit record '{}'", record));
            }
            Ok(Commit::new(
                parse_sha(fields[0])?,
                fields[7].trim_end(),
                Identity::new(fields[1], fields[2]),
                Identity::new(fields[4], fields[5]),
                parse_date(fields[3])?,
                parse_date(fields[6])?,
            ))
        })
        .collect()
}

pub fn is_ancestor(dir: &Path, ancestor: &GitSha, descendant: &GitSha) -> Result<bool> {
    Ok(run_query(
        dir,
        &[
            "merge-base",
            "--is-ancestor",
            ancestor.as_str(),
            descendant.as_str(),
        ],
    )?
    .is_some())
}

pub fn resolve_ref(dir: &Path, reference: &str) -> Result<Option<GitSha>> {
    let spec = format!("{}^{{commit}}", reference);
    match run_query(dir, &["rev-parse", "--verify", "--quiet", &spec])? {
        Some(sha) => Ok(Some(GitSha::new(sha)?)),
        None => Ok(None),
    }
}

pub fn head_ref(dir: &Path) -> Result<Option<String>> {
    run_query(dir, &["symbolic-ref", "--quiet", "HEAD"])
}

/// Parse a tag string into a semantic version
pub fn parse_semver_tag(tag: &str) -> Option<Version> {
    // Common tag formats: v1.0.0, 1.0.0
    let version_str = if let Some(stripped) = tag.strip_prefix('v') {
        stripped
    } else {
        tag
    };

    Version::parse(version_str).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{FastForwardMode, MergeStrategy};

    const SHA_A: &str = "0123456789abcdef0123456789abcdef01234567";
    const SHA_B: &str = "89abcdef0123456789abcdef0123456789abcdef";

    #[test]
    fn test_parse_semver_tag() {
        assert_eq!(
            parse_semver_tag("v1.0.0"),
            Some(Version::parse("1.0.0").unwrap())
        );
        assert_eq!(
            parse_semver_tag("1.0.0"),
            Some(Version::parse("1.0.0").unwrap())
        );
        assert_eq!(parse_semver_tag("current build"), None);
    }

    #[test]
    fn test_merge_args() {
        assert_eq!(
            merge_args(&MergeRequest::new("develop")),
            ["merge", "--quiet", "--no-edit", "--ff", "-X", "theirs", "develop"]
        );
        let request = MergeRequest::new("feature")
            .strategy(MergeStrategy::Ours)
            .fast_forward(FastForwardMode::Never);
        assert_eq!(
            merge_args(&request),
            ["merge", "--quiet", "--no-edit", "--no-ff", "-s", "ours", "feature"]
        );
        let request = MergeRequest::new("develop")
            .strategy(MergeStrategy::Default)
            .fast_forward(FastForwardMode::Only);
        assert_eq!(
            merge_args(&request),
            ["merge", "--quiet", "--no-edit", "--ff-only", "develop"]
        );
    }

    #[test]
    fn test_parse_push_porcelain_accepted() {
        let stdout = "To https://github.com/alice/demo.git\n\
            *\trefs/heads/develop:refs/heads/develop\t[new branch]\n\
            =\trefs/heads/master:refs/heads/master\t[up to date]\n\
            Done\n";
        let result = parse_push_porcelain(stdout);
        assert_eq!(result.updates.len(), 2);
        assert_eq!(result.updates[0].ref_name, "refs/heads/develop");
        assert_eq!(result.updates[0].status, RefUpdateStatus::Ok);
        assert_eq!(result.updates[1].status, RefUpdateStatus::UpToDate);
        assert!(result.is_successful());
    }

    #[test]
    fn test_parse_push_porcelain_rejected() {
        let stdout = "To https://github.com/alice/demo.git\n\
            !\trefs/heads/master:refs/heads/master\t[rejected] (non-fast-forward)\n\
            !\trefs/heads/develop:refs/heads/develop\t[remote rejected] (hook declined)\n\
            Done\n";
        let result = parse_push_porcelain(stdout);
        assert_eq!(
            result.updates[0].status,
            RefUpdateStatus::RejectedNonFastForward
        );
        assert_eq!(
            result.updates[0].message.as_deref(),
            Some("non-fast-forward")
        );
        assert_eq!(result.updates[1].status, RefUpdateStatus::RemoteRejected);
        assert!(!result.is_successful());
    }

    #[test]
    fn test_parse_log() {
        let stdout = format!(
            "{SHA_B}\0Ann\0ann@example.com\02024-03-02T10:00:00+01:00\0Cy\0cy@example.com\02024-03-02T11:00:00+01:00\0Second\n\nbody text\n\u{1e}\n\
             {SHA_A}\0Ann\0ann@example.com\02024-03-01T10:00:00+00:00\0Ann\0ann@example.com\02024-03-01T10:00:00+00:00\0Initial commit\n\u{1e}\n"
        );
        let commits = parse_log(&stdout).unwrap();
        assert_eq!(commits.len(), 2);
        assert_eq!(commits[0].hash.as_str(), SHA_B);
        assert_eq!(commits[0].short_message, "Second");
        assert_eq!(commits[0].full_message, "Second\n\nbody text");
        assert_eq!(commits[0].committer.name, "Cy");
        assert_eq!(commits[1].full_message, "Initial commit");
    }

    #[test]
    fn test_parse_log_rejects_truncated_record() {
        assert!(parse_log("abc\0def\u{1e}").is_err());
        assert!(parse_log("").unwrap().is_empty());
    }

    #[test]
    fn test_parse_tags() {
        let stdout = format!(
            "v0.1\0commit\0{SHA_A}\0\0\0\0\0\n\u{1e}\n\
             v0.2\0tag\0{SHA_B}\0{SHA_A}\0Tess\0<tess@example.com>\02024-04-01T09:30:00+00:00\0Release 0.2\n\u{1e}\n\
             blob-tag\0blob\0{SHA_B}\0\0\0\0\0\n\u{1e}\n"
        );
        let tags = parse_tags(&stdout).unwrap();
        assert_eq!(tags.len(), 2);
        assert_eq!(tags[0].name, "v0.1");
        assert!(tags[0].annotation.is_none());

        let annotation = tags[1].annotation.as_ref().unwrap();
        assert_eq!(tags[1].commit.as_str(), SHA_A);
        assert_eq!(annotation.tagger, Identity::new("Tess", "tess@example.com"));
        assert_eq!(annotation.message, "Release 0.2");
    }
}
