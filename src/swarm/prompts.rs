//! Prompt templates for swarm members.
//!
//! Each prompt tells the sub-agent who it is, which (phase, round) it serves,
//! and exactly how to record its result so the next evaluation can see it.
//!
//! ## Prompt Types
//!
//! - **Review prompt**: one reviewer role, plan or code review
//! - **Planning prompt**: a planning-swarm role producing the plan document
//! - **Implementation prompt**: an implementation role and its assigned plan item

use std::path::Path;

use crate::artifacts::{PlanArtifact, ReviewRole};
use crate::artifacts::store::ARTIFACT_DIR;
use crate::phase::Phase;

/// Context shared by every prompt for one parent session.
#[derive(Debug, Clone, Copy)]
pub struct PromptContext<'a> {
    pub parent_session_id: &'a str,
    pub project_id: &'a str,
    pub workspace: &'a Path,
    pub issue: Option<&'a str>,
    pub branch: Option<&'a str>,
}

/// Build the prompt for one reviewer in a plan or code review round.
pub fn build_review_prompt(
    ctx: &PromptContext<'_>,
    phase: Phase,
    round: u32,
    role: ReviewRole,
) -> String {
    let mut prompt = String::new();

    let subject = match phase {
        Phase::PlanReview => "implementation plan",
        _ => "code changes",
    };
    prompt.push_str(&format!(
        "# {} Review: {}\n\n\
         You are the **{}** reviewer for the {} of session `{}`, review round {}.\n\n",
        title_case(role.as_str()),
        subject,
        role,
        subject,
        ctx.parent_session_id,
        round
    ));

    prompt.push_str(&build_context_section(ctx));

    prompt.push_str("## What to Review\n\n");
    match phase {
        Phase::PlanReview => prompt.push_str(&format!(
            "Read the plan at `{}/plan.md` in the workspace.\n\n",
            ARTIFACT_DIR
        )),
        _ => {
            let branch = ctx.branch.unwrap_or("the session branch");
            prompt.push_str(&format!(
                "Review the diff of `{}` against the base branch. The agreed plan is at `{}/plan.md`.\n\n",
                branch, ARTIFACT_DIR
            ));
        }
    }

    prompt.push_str("## Focus Areas\n\n");
    for area in role.focus_areas() {
        prompt.push_str(&format!("- {}\n", area));
    }
    prompt.push('\n');

    prompt.push_str(&format!(
        "## Recording Your Decision\n\n\
         Submit exactly one decision for this round:\n\n\
         ```bash\n\
         foreman submit-review --workspace {} --phase {} --round {} --role {} \\\n\
           --decision approved --notes \"Summary of your review\"\n\
         ```\n\n\
         Use `--decision changes_requested` if anything must change before proceeding, \
         and list the required changes in `--notes`.\n",
        ctx.workspace.display(),
        phase,
        round,
        role
    ));

    prompt
}

/// Build the prompt for a planning-swarm member.
pub fn build_planning_prompt(ctx: &PromptContext<'_>, role: &str, plan_round: u32) -> String {
    let mut prompt = String::new();

    prompt.push_str(&format!(
        "# Planning: {}\n\n\
         You are the **{}** member of the planning swarm for session `{}`, planning round {}.\n\n",
        title_case(role),
        role,
        ctx.parent_session_id,
        plan_round
    ));

    prompt.push_str(&build_context_section(ctx));

    if plan_round > 1 {
        prompt.push_str(&format!(
            "## Revision\n\n\
             The previous plan was sent back by reviewers. Their notes are under \
             `{}/reviews/plan_review/`. Address every requested change.\n\n",
            ARTIFACT_DIR
        ));
    }

    prompt.push_str(
        "## Deliverable\n\n\
         A markdown plan whose top-level bullet list contains one independently \
         implementable work item per line. Work items are handed to implementers in order.\n\n",
    );

    prompt.push_str(&format!(
        "## Submitting the Plan\n\n\
         ```bash\n\
         foreman submit-plan --workspace {} --round {} --file plan.md\n\
         ```\n",
        ctx.workspace.display(),
        plan_round
    ));

    prompt
}

/// Build the prompt for an implementation-swarm member.
pub fn build_implementation_prompt(
    ctx: &PromptContext<'_>,
    role: &str,
    implementation_round: u32,
    item: &str,
    plan: Option<&PlanArtifact>,
) -> String {
    let mut prompt = String::new();

    prompt.push_str(&format!(
        "# Implementation: {}\n\n\
         You are the **{}** implementer for session `{}`, implementation round {}.\n\n",
        title_case(role),
        role,
        ctx.parent_session_id,
        implementation_round
    ));

    prompt.push_str(&build_context_section(ctx));

    prompt.push_str(&format!(
        "## Your Assignment\n\n{}\n\n\
         Other implementers own the remaining plan items. Keep your changes to this one.\n\n",
        item
    ));

    if implementation_round > 1 {
        prompt.push_str(&format!(
            "## Rework\n\n\
             Code review requested changes. Read the notes under \
             `{}/reviews/code_review/` and address them.\n\n",
            ARTIFACT_DIR
        ));
    }

    if let Some(plan) = plan {
        prompt.push_str("## Full Plan (for context)\n\n");
        prompt.push_str(plan.text.trim());
        prompt.push_str("\n\n");
    }

    prompt.push_str(
        "## Completion\n\n\
         Commit your work to the session branch and exit when your assignment is done.\n",
    );

    prompt
}

fn build_context_section(ctx: &PromptContext<'_>) -> String {
    let mut section = String::from("## Context\n\n");
    section.push_str(&format!("- **Project**: {}\n", ctx.project_id));
    if let Some(issue) = ctx.issue {
        section.push_str(&format!("- **Issue**: {}\n", issue));
    }
    if let Some(branch) = ctx.branch {
        section.push_str(&format!("- **Branch**: `{}`\n", branch));
    }
    section.push_str(&format!(
        "- **Workspace**: {}\n\n",
        ctx.workspace.display()
    ));
    section
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
