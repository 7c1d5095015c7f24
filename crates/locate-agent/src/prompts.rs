//! System prompts for the judgment oracle.
//!
//! Bump `PROMPT_VERSION` whenever prompt content changes so reports can be
//! tied back to the wording that produced them.

use resolution::SearchItem;

/// Prompt version. Bump on any content change.
pub const PROMPT_VERSION: &str = "1.2.0";

/// Judge instructions. `{task}` is replaced with the user's request.
pub const JUDGE_INSTRUCTIONS: &str = "\
You decide whether the file or folder a user asked for is in a list of \
candidates. The request is: {task}

## Decide
- If the requested file or folder is among the candidates, set `satisfied` to \
true and put its **exact path**, copied from the list, in `target_path`.
- If it is **not** among the candidates, set `satisfied` to false, leave \
`target_path` empty, and put a **flexible regular expression** in `pattern` \
that a file search can use to find it. Make it broad enough to catch \
variations in naming or wording.
- Users often name a common variant of the real file. Be reasonably lenient \
and pay attention to the file type they imply.

## Rules
- Do not assume the request is precise. Allow common variants in the \
expression: wildcards, case differences, likely misspellings.
- Never give a path unless it appears in the candidate list.

## Output
Always return a JSON object with all three keys `satisfied`, `pattern` and \
`target_path`, even when a value is empty.

## Strategy
- If the user asks for \"a document\", do not search for the word \
\"document\"; target document types instead: `.*\\.(docx|pdf|txt|odt|rtf).*`
- Images: `.*\\.(jpg|jpeg|png|gif|bmp).*`
- Executables: `.*\\.(exe|bat|msi|app).*`
- When the user names a format, cover its variants (`.jpg` and `.jpeg`).";

/// Task refinement instructions for noisy, transcribed requests.
pub const REFINE_INSTRUCTIONS: &str = "\
You receive a user's request as transcribed text. It may contain spelling \
mistakes, filler words and broken grammar.

1. Correct the text so it is semantically sound and states the user's intent.
2. Work out what is really being asked for. If the user wants to open a \
program (\"open the chat app\"), the file finder should look for that \
program's executable or installation folder.
3. Rewrite it as one concise request a file-finding agent can act on, focused \
on the specific file or folder mentioned.

Reply with the rewritten request only.

Example:
User: \"hi um its me can you like open wechat for me\"
Request: \"Find the WeChat executable or its installation folder.\"";

/// Render the judge system prompt for `task`.
pub fn judge_system_prompt(task: &str) -> String {
    JUDGE_INSTRUCTIONS.replace("{task}", task)
}

/// Render the candidate list shown to the judge.
pub fn candidates_message(candidates: &[SearchItem]) -> String {
    if candidates.is_empty() {
        return "The candidate list is empty.".to_string();
    }
    let lines = candidates
        .iter()
        .map(|c| format!("- {} | {}", c.name, c.path.display()))
        .collect::<Vec<_>>()
        .join("\n");
    format!("The candidates are (name | path):\n{lines}")
}
