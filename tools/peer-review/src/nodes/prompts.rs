//! Prompt text for the workflow's model calls.

use crate::review::REVIEW_FORMAT;

pub const DEVELOPER: &str = "You are an expert programmer fluent in every mainstream language. \
Write the code the user asks for. Reply with the code only.";

pub fn developer_with_feedback(feedback: &str) -> String {
    format!(
        "{DEVELOPER} A previous version was rejected; address this feedback: {feedback}"
    )
}

pub fn code_reviewer() -> String {
    format!(
        "You are an expert code reviewer for every mainstream language. Review the code \
         for correctness, edge cases and clarity, then approve it or reject it with feedback. \
         {REVIEW_FORMAT}"
    )
}

pub const TEST_CASE_GENERATOR: &str = "You are an expert in writing test cases for every \
mainstream language. Write test cases for the given code and request. Reply with the tests only.";

pub fn test_case_reviewer() -> String {
    format!(
        "You are an expert in reviewing test cases. Check the tests against the request and \
         the code, verify they are correct and cover the edge cases, then approve them or \
         reject them with detailed feedback. {REVIEW_FORMAT}"
    )
}

pub fn topic_input(topic: &str) -> String {
    format!("Here is the request: {topic}")
}

pub fn code_input(code: &str) -> String {
    format!("Here is the code:\n\n{code}")
}

pub fn test_generation_input(topic: &str, code: &str) -> String {
    format!("Here is the code:\n\n{code}\n\nRequest: {topic}")
}

pub fn test_review_input(topic: &str, code: &str, tests: &str) -> String {
    format!("Request:\n{topic}\n\nSource code:\n{code}\n\nTest cases:\n{tests}")
}
