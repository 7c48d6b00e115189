pub const QUIZ_PROMPT_HEADER: &str = "Analyze the following markdown note content and create a comprehensive quiz based on key concepts, facts, and information presented.";

pub const QUIZ_QUESTION_RULES: &str = "For multiple-choice questions, provide exactly 4 options in the options field and mark exactly one of them as correct with is_correct.
For true-false questions, use the boolean_answer field and leave options and answers empty.
For text-answer questions, list the accepted answers in the answers field and leave options empty.";

pub const DECK_PROMPT_HEADER: &str = "Analyze the following markdown note content and create a comprehensive flashcard set based on key concepts, facts, and information presented.";

pub const DECK_CARD_RULES: &str = "Make sure the cards are not too long. The front holds the question, the back holds a concise answer.";

pub const NOTE_PROMPT: &str = "Convert the following content into well-structured markdown notes. Use appropriate headers, bullet points, and formatting to make it easy to read and study.";

pub const SOURCE_LABEL: &str = "MARKDOWN CONTENT:";

/// Appended for backends that cannot enforce a response schema themselves.
pub const JSON_ONLY_INSTRUCTION: &str = "Respond with a single JSON object that matches the following JSON Schema. Do not wrap it in prose or code fences and do not add fields that are not in the schema.";
