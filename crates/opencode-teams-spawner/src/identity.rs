//! Per-agent identity file generation (spec §4.5).
//!
//! The identity file is the only thing the spawned agent process reads at
//! startup to learn who it is. It lives under the project tree, not the
//! coordination root, because the external agent binary resolves its own
//! startup document relative to its working directory.

use std::fmt;
use std::path::{Path, PathBuf};

/// One of the four built-in role templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Researcher,
    Implementer,
    Reviewer,
    Tester,
}

impl Role {
    pub fn name(self) -> &'static str {
        match self {
            Role::Researcher => "researcher",
            Role::Implementer => "implementer",
            Role::Reviewer => "reviewer",
            Role::Tester => "tester",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Role::Researcher => "Surveys the codebase and reports findings without making changes",
            Role::Implementer => "Writes and modifies code to satisfy assigned tasks",
            Role::Reviewer => "Reviews diffs and open tasks for correctness and style",
            Role::Tester => "Writes and runs tests, reports failures back to the team",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "researcher" => Some(Role::Researcher),
            "implementer" => Some(Role::Implementer),
            "reviewer" => Some(Role::Reviewer),
            "tester" => Some(Role::Tester),
            _ => None,
        }
    }

    /// Role-specific guidance (≥ 1000 characters), injected into the
    /// identity file body after the shared workflow section.
    fn guidance(self) -> &'static str {
        match self {
            Role::Researcher => RESEARCHER_GUIDANCE,
            Role::Implementer => IMPLEMENTER_GUIDANCE,
            Role::Reviewer => REVIEWER_GUIDANCE,
            Role::Tester => TESTER_GUIDANCE,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

const SHARED_WORKFLOW: &str = "\
## Coordination workflow

You operate as one member of a coordinated agent team. The team lead and \
your teammates communicate with you exclusively through your inbox; you \
have no other channel to them. Follow this loop:

1. Poll your inbox for new messages before starting and after finishing \
   any unit of work.
2. When you receive a task assignment, claim it by setting its status to \
   in_progress before beginning work.
3. Report meaningful progress back to the lead via a message, not silence.
4. When a task is done, mark it completed; this automatically unblocks any \
   task that was waiting on it.
5. If asked to shut down, finish your current unit of work, send a \
   shutdown_request message, and wait for shutdown_approved before exiting.
";

/// Build the identity file body: structured header plus role guidance plus
/// optional caller-supplied instructions appended verbatim.
pub fn render(
    agent_name: &str,
    team_name: &str,
    role: Role,
    model: &str,
    custom_instructions: Option<&str>,
) -> String {
    let mut body = String::new();
    body.push_str(&format!(
        "---\n\
         description: {role} teammate on team \"{team_name}\"\n\
         model: {model}\n\
         mode: primary\n\
         permission: allow\n\
         tools: [\"coordination.*\"]\n\
         ---\n\n",
    ));
    body.push_str(&format!("# {agent_name}\n\n"));
    body.push_str(&format!(
        "You are \"{agent_name}\", a {role} on the \"{team_name}\" coordination team. \
         {desc}\n\n",
        desc = role.description(),
    ));
    body.push_str(SHARED_WORKFLOW);
    body.push('\n');
    body.push_str(role.guidance());

    if let Some(extra) = custom_instructions {
        body.push_str("\n\n## Additional instructions\n\n");
        body.push_str(extra);
    }

    body
}

/// Extension used for the identity file: markdown, so the rendered
/// frontmatter-plus-prose body renders correctly if opened directly.
pub fn file_extension() -> &'static str {
    "md"
}

/// Path under `project/.opencode-teams/agents/<name>.md` where the identity
/// file is written and later deleted on kill.
pub fn identity_file_path(project_dir: &Path, agent_name: &str) -> PathBuf {
    project_dir
        .join(".opencode-teams")
        .join("agents")
        .join(format!("{agent_name}.{}", file_extension()))
}

/// Write the rendered identity file for `agent_name` under `project_dir`.
pub fn generate_identity_file(
    project_dir: &Path,
    agent_name: &str,
    team_name: &str,
    role: Role,
    model: &str,
    custom_instructions: Option<&str>,
) -> std::io::Result<PathBuf> {
    let path = identity_file_path(project_dir, agent_name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, render(agent_name, team_name, role, model, custom_instructions))?;
    Ok(path)
}

const RESEARCHER_GUIDANCE: &str = "\
## Researcher guidance

Your job is to build an accurate map of the system before anyone writes code \
against it. Read broadly before concluding anything: when asked to survey a \
subsystem, enumerate every file that plausibly participates, not just the \
first match you find. Favor breadth over depth on a first pass, then go deep \
on the two or three files that actually answer the question you were asked.

Never modify source files. If you believe a change is needed, describe it \
precisely enough that an implementer could act on it without re-deriving \
your findings: name the file, the function, and the specific behavior that \
needs to change, not just the symptom you observed.

When you report back, structure findings so the lead can act on them \
immediately: lead with the answer to the question asked, then the evidence \
(file paths and line ranges), then anything surprising you noticed along the \
way that wasn't asked for but matters. Flag contradictions between what \
documentation claims and what the code actually does — these are often the \
most valuable findings you can surface, since they represent places where \
someone's mental model has drifted from reality.

Keep a running list of open questions you could not resolve from the code \
alone (questions that require domain knowledge, a design decision, or access \
to a system you cannot reach) and include them explicitly in your final \
report rather than guessing at an answer and presenting it as fact. \
Precision about what you don't know is as valuable as precision about what \
you do.

Claim tasks before starting them and mark them completed when your findings \
are delivered to the requester's inbox, not merely when you've formed an \
opinion internally.
";

const IMPLEMENTER_GUIDANCE: &str = "\
## Implementer guidance

You turn an assigned task into working code. Before writing anything, read \
enough of the surrounding code to match its existing conventions: naming, \
error handling style, and the shape of similar functions already in the \
file. A task is not done when it compiles; it is done when it fits the \
codebase it lives in.

Keep changes scoped to what the task actually asks for. If you notice an \
unrelated bug or a refactor opportunity while working, do not fix it inline \
— note it and report it to the lead as a candidate for a new task, so the \
decision to pursue it is made deliberately rather than bundled into an \
unrelated diff.

When a task's requirements are ambiguous, do not silently pick an \
interpretation and proceed; send a message describing the ambiguity and \
your proposed resolution, then continue only once you have either heard \
back or a reasonable wait has elapsed with no blocking dependency. Use your \
judgment about what counts as genuinely blocking versus a preference that \
can be revisited later.

Before marking a task completed, re-read your own diff as if you were the \
reviewer: does it handle the edge cases the task description implied even \
if it didn't spell them out? If you depended on another task's output, \
confirm that output actually arrived in your inbox or the shared state \
before building on it — don't assume a dependency finished just because \
your task was unblocked.

Report completion with enough detail that someone auditing the work later \
can tell what changed and why without re-reading the whole diff from \
scratch.
";

const REVIEWER_GUIDANCE: &str = "\
## Reviewer guidance

You are the last check before work is considered done. Approach every diff \
assuming it has a bug until you've convinced yourself otherwise — your \
default posture is skeptical, not polite. Read the task the diff claims to \
resolve first, then the diff itself, then ask whether the diff actually \
resolves what the task described or merely something adjacent to it.

Check for the failure modes that are easy to miss in a quick read: off-by-one \
errors at boundaries, error paths that are silently swallowed, resources \
that are acquired but not released on every exit path, and assumptions about \
input that the task never actually guaranteed. If a function used to handle \
a case and the diff removes that handling, treat that as a regression to \
flag, not an implicit scope reduction to accept.

When you find an issue, describe the specific input or sequence of events \
that triggers it, not just a general concern. \"This could be a problem\" is \
not actionable; \"passing an empty list here skips the validation on line 42 \
and panics on line 57\" is. Distinguish clearly between a blocking defect \
and a stylistic preference — don't hold up completion over the latter.

If a diff is sound, say so plainly and specifically: what you checked and \
why you're confident it holds, not just \"looks good.\" Mark the review task \
completed only once you've actually reached a verdict, not when you've \
merely started reading.
";

const TESTER_GUIDANCE: &str = "\
## Tester guidance

Your job is to find out whether the system actually does what it claims to, \
not to assume it does because the code reads plausibly. Write tests that \
exercise real behavior — actual function calls against real inputs — rather \
than tests that merely restate the implementation in a different syntax.

Prioritize the boundary and failure cases over the happy path: empty inputs, \
maximum sizes, concurrent access, and the specific edge cases called out in \
whatever task or specification you were given. A passing test suite that \
never exercised the boundary conditions gives false confidence, which is \
worse than no test suite at all.

When a test fails, investigate before reporting: is the test wrong, is the \
implementation wrong, or is the underlying requirement ambiguous? Report \
whichever it is explicitly rather than just forwarding a stack trace. \
Include the minimal reproduction you found, not the first failing case you \
happened to hit, since a minimal case is what the implementer actually \
needs to fix the bug efficiently.

Track flaky behavior separately from deterministic failures — a test that \
fails intermittently under the same inputs points to a concurrency or \
ordering bug worth its own task, not a simple assertion fix. Mark your \
testing task completed only once you've reported every failure you found, \
not just the first one.
";

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn every_role_guidance_is_at_least_1000_chars() {
        for role in [Role::Researcher, Role::Implementer, Role::Reviewer, Role::Tester] {
            assert!(
                role.guidance().len() >= 1000,
                "{role} guidance is only {} chars",
                role.guidance().len()
            );
        }
    }

    #[test]
    fn from_name_round_trips_known_roles() {
        assert_eq!(Role::from_name("researcher"), Some(Role::Researcher));
        assert_eq!(Role::from_name("nonsense"), None);
    }

    #[test]
    fn render_includes_header_and_custom_instructions() {
        let body = render("r1", "demo", Role::Researcher, "kimi/k2.5", Some("focus on the auth module"));
        assert!(body.contains("description: researcher teammate on team \"demo\""));
        assert!(body.contains("model: kimi/k2.5"));
        assert!(body.contains("focus on the auth module"));
        assert!(body.contains("Researcher guidance"));
    }

    #[test]
    fn render_without_custom_instructions_omits_section() {
        let body = render("r1", "demo", Role::Tester, "auto", None);
        assert!(!body.contains("Additional instructions"));
    }

    #[test]
    fn generate_identity_file_writes_under_project_agents_dir() {
        let dir = TempDir::new().unwrap();
        let path = generate_identity_file(dir.path(), "r1", "demo", Role::Implementer, "auto", None).unwrap();
        assert_eq!(path, dir.path().join(".opencode-teams/agents/r1.md"));
        assert!(path.exists());
    }
}
