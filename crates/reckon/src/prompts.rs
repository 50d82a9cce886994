// Copyright © 2026 reckon contributors
// Licensed under the Apache License, Version 2.0

//! Few-shot prompt constants.
//!
//! Static data: each prompt teaches the model to answer with a short
//! script instead of prose. `{question}` marks where the question goes.

/// Placeholder substituted by [`format_prompt`].
pub const QUESTION_SLOT: &str = "{question}";

/// Render a prompt template with the question filled in.
pub fn format_prompt(template: &str, question: &str) -> String {
    template.replace(QUESTION_SLOT, question)
}

/// System instruction for the chat variant.
pub const MATH_CHAT_SYSTEM_MESSAGE: &str = "You are a careful assistant that solves math word \
problems by writing a short rhai script. The script must define a function solution() that \
returns the final numeric answer. Reply with only a fenced ```rhai code block and nothing else.";

/// Few-shot math prompt for the completion shape. Default-mode programs:
/// statements first, the answer expression on the last line.
pub const MATH_PROMPT: &str = r#"Q: Olivia has $23. She bought five bagels for $3 each. How much money does she have left?

// solution in rhai:

let money_initial = 23;
let bagels = 5;
let bagel_cost = 3;
let money_spent = bagels * bagel_cost;
let money_left = money_initial - money_spent;
money_left


Q: Michael had 58 golf balls. On tuesday, he lost 23 golf balls. On wednesday, he lost 2 more. How many golf balls did he have at the end of wednesday?

// solution in rhai:

let golf_balls_initial = 58;
let golf_balls_lost_tuesday = 23;
let golf_balls_lost_wednesday = 2;
let golf_balls_left = golf_balls_initial - golf_balls_lost_tuesday - golf_balls_lost_wednesday;
golf_balls_left


Q: {question}

// solution in rhai:

"#;

/// Few-shot date-understanding prompt. Pairs with a date-seeded runtime
/// and the named-symbol policy on `answer`.
pub const DATE_UNDERSTANDING_PROMPT: &str = r#"Q: 2015 is coming in 36 hours. What is the date one week from today in MM/DD/YYYY?

// solution in rhai:

// If 2015 is coming in 36 hours, then today is 36 hours before it.
let start = date(2015, 1, 1) - 1;
// One week from today,
let answer = start + 7;


Q: The first day of 2019 is a Tuesday, and today is the first Monday of 2019. What is the date today in MM/DD/YYYY?

// solution in rhai:

// If the first day of 2019 is a Tuesday, and today is the first Monday of 2019, then today is 6 days later.
let start = date(2019, 1, 1);
let answer = start + 6;


Q: {question}

// solution in rhai:

"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_prompt_substitutes_question() {
        let rendered = format_prompt(MATH_PROMPT, "What is 2+2?");
        assert!(rendered.contains("Q: What is 2+2?"));
        assert!(!rendered.contains(QUESTION_SLOT));
    }

    #[test]
    fn test_prompts_end_ready_for_continuation() {
        assert!(MATH_PROMPT.ends_with("// solution in rhai:\n\n"));
        assert!(DATE_UNDERSTANDING_PROMPT.ends_with("// solution in rhai:\n\n"));
    }
}
