//! System prompt construction.
//!
//! The prompt carries the caller's identity so the model can fill in
//! `getNews` arguments; the tool itself never trusts them.

use campusdesk_core::actor::Actor;

const PERSONA: &str = "You are CampusDesk, the university's information assistant. \
You help students, staff and visitors with campus locations, departments, courses, \
news and school fees.";

const GUIDELINES: [&str; 5] = [
    "Use the available functions to look up campus data instead of guessing.",
    "When asked where something is, call queryDatabase with queryType \"building\".",
    "When asked about fees, call getFeesCatalog with the student's level and session.",
    "Keep answers short and friendly; use bullet points for lists.",
    "If the data does not contain an answer, say so and suggest the relevant office.",
];

/// Build the system prompt for one turn.
pub fn system_prompt(actor: &Actor) -> String {
    let mut prompt = String::from(PERSONA);

    prompt.push_str("\n\n## Guidelines\n");
    for line in GUIDELINES {
        prompt.push_str("- ");
        prompt.push_str(line);
        prompt.push('\n');
    }

    prompt.push_str("\n## Current user\n");
    if actor.is_guest() {
        prompt.push_str("- A guest visitor (not signed in)\n");
    } else {
        prompt.push_str(&format!("- userId: {}\n- userRole: {}\n", actor.id, actor.role));
        if let Some(department) = &actor.department {
            prompt.push_str(&format!("- departmentId: {department}\n"));
        }
        if !actor.courses.is_empty() {
            prompt.push_str(&format!("- courseIds: {}\n", actor.courses.join(", ")));
        }
    }
    prompt
}
