//! Canned tickets and provider responses shared by unit and integration tests

use crate::ticket::{Ticket, TicketType};
use serde_json::{Value, json};

/// Twelve sign-in scenarios that stay well under the duplicate threshold pairwise
pub const SIGN_IN_CASES: [(&str, [&str; 3]); 12] = [
    (
        "Sign in with valid email and password",
        ["Navigate to the sign in page", "Enter a registered email and its password", "Click the Sign in button"],
    ),
    (
        "Reject sign in with wrong password",
        ["Open the sign in form", "Type a registered email with an incorrect password", "Press Enter to submit"],
    ),
    (
        "Lock account after five failed attempts",
        [
            "Attempt to sign in five times with a bad password",
            "Wait for the lockout notice",
            "Try the correct password once more",
        ],
    ),
    (
        "Reset password through emailed link",
        [
            "Click Forgot password on the login screen",
            "Submit the account email address",
            "Follow the link delivered to the inbox",
        ],
    ),
    (
        "Session expires after thirty idle minutes",
        ["Log in as a standard user", "Leave the browser idle for thirty minutes", "Refresh the dashboard"],
    ),
    (
        "Remember me keeps user signed in across restarts",
        ["Check the Remember me box before signing in", "Close and relaunch the browser", "Visit the home page again"],
    ),
    (
        "Password field masks typed characters",
        ["Select the password input", "Type the string secret123", "Inspect what the field displays"],
    ),
    (
        "Sign out clears the session cookie",
        ["Sign in with any valid account", "Choose Sign out from the profile menu", "Inspect cookies in developer tools"],
    ),
    (
        "Brute force requests are rate limited",
        [
            "Send 100 login requests within one minute from one IP",
            "Observe the HTTP status codes returned",
            "Verify a Retry-After header is present",
        ],
    ),
    (
        "SQL injection in email field is rejected",
        ["Enter ' OR 1=1 -- into the email field", "Submit the login form", "Check the server response"],
    ),
    (
        "Login page loads within two seconds",
        ["Clear the browser cache", "Load the login page over a 3G profile", "Measure the time to interactive"],
    ),
    (
        "Two factor code required for admin accounts",
        ["Sign in with an admin account", "Wait for the verification code prompt", "Enter the code from the authenticator app"],
    ),
];

pub fn sign_in_ticket(key: &str) -> Ticket {
    Ticket::new(key, TicketType::Feature, "Email and password sign in")
        .with_description("Customers sign in with their email address and password.")
        .with_acceptance_criteria(
            "- Valid credentials open the dashboard\n- Five failed attempts lock the account",
        )
}

pub fn case_value(index: usize) -> Value {
    let (title, steps) = SIGN_IN_CASES[index % SIGN_IN_CASES.len()];
    json!({
        "title": title,
        "description": format!("Scenario {}", index + 1),
        "preconditions": ["A registered customer account exists"],
        "steps": steps,
        "expectedResult": format!("{} behaves as described", title),
        "priority": "High",
        "category": "positive",
        "tags": ["sign-in"]
    })
}

/// Rewording of the first case that collapses into it on dedup
pub fn reworded_first_case() -> Value {
    json!({
        "title": "Sign in with a valid email and password",
        "steps": ["Navigate to the sign in page", "Enter a registered email and password", "Click Sign in"],
        "expectedResult": "The dashboard opens"
    })
}

/// A draft the validator rejects for having no steps
pub fn stepless_case() -> Value {
    json!({"title": "Missing steps", "steps": [], "expectedResult": "Nothing"})
}

pub fn cases(count: usize) -> Vec<Value> {
    (0..count.min(SIGN_IN_CASES.len())).map(case_value).collect()
}

pub fn response_with(cases: Vec<Value>) -> String {
    Value::Array(cases).to_string()
}

/// JSON array of `count` distinct drafts, as a provider would return it
pub fn response(count: usize) -> String {
    response_with(cases(count))
}
