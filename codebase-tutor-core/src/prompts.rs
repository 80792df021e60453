//! Prompt text for the four LLM stages.
//!
//! Everything here is a pure string builder; the stage modules assemble the
//! context and validate the replies.

use crate::config::StageSettings;

/// Extra instruction appended when the tutorial is not in English. `subject`
/// names what must be translated (e.g. "`name` and `description` values").
fn language_instruction(settings: &StageSettings, subject: &str) -> String {
    if !settings.is_translated() {
        return String::new();
    }
    let lang = settings.language_display();
    format!(
        "IMPORTANT: Generate the {subject} in **{lang}** language. \
         Do NOT use English for these fields. Keep code, syntax and file paths unchanged.\n\n"
    )
}

/// `" (in French)"`, or nothing for English.
fn language_hint(settings: &StageSettings) -> String {
    if settings.is_translated() {
        format!(" (in {})", settings.language_display())
    } else {
        String::new()
    }
}

pub fn identify_abstractions(
    settings: &StageSettings,
    context: &str,
    file_listing: &str,
) -> String {
    let project = &settings.project_name;
    let max = settings.max_abstractions;
    let instruction = language_instruction(settings, "`name` and `description` for each abstraction");
    let hint = language_hint(settings);
    format!(
        r#"For the project `{project}`:

Codebase Context:
{context}

{instruction}Analyze the codebase context.
Identify the top 5-{max} core most important abstractions to help those new to the codebase.

For each abstraction, provide:
1. A concise `name`{hint}.
2. A beginner-friendly `description` explaining what it is with a simple analogy, in around 100 words{hint}.
3. A list of relevant `file_indices` (integers) using the format `idx # path/comment`.

List of file indices and paths present in the context:
{file_listing}

Format the output as a YAML list of dictionaries:

```yaml
- name: |
    Query Processing{hint}
  description: |
    Explains what the abstraction does.
    It's like a central dispatcher routing requests.{hint}
  file_indices:
    - 0 # path/to/file1.py
    - 3 # path/to/related.py
- name: |
    Query Optimization{hint}
  description: |
    Another core concept, similar to a blueprint for objects.{hint}
  file_indices:
    - 5 # path/to/another.js
# ... up to {max} abstractions
```"#
    )
}

pub fn analyze_relationships(
    settings: &StageSettings,
    abstraction_listing: &str,
    context: &str,
) -> String {
    let project = &settings.project_name;
    let instruction = language_instruction(settings, "`summary` and relationship `label` fields");
    let hint = language_hint(settings);
    format!(
        r#"Based on the following abstractions and relevant code snippets from the project `{project}`:

List of Abstraction Indices and Names:
{abstraction_listing}

Context (Abstractions, Descriptions, Code):
{context}

{instruction}Please provide:
1. A high-level `summary` of the project's main purpose and functionality in a few beginner-friendly sentences{hint}. Use markdown formatting with **bold** and *italic* text to highlight important concepts.
2. A list (`relationships`) describing the key interactions between these abstractions. For each relationship, specify:
    - `from_abstraction`: Index of the source abstraction (e.g., `0 # AbstractionName1`)
    - `to_abstraction`: Index of the target abstraction (e.g., `1 # AbstractionName2`)
    - `label`: A brief label for the interaction **in just a few words**{hint} (e.g., "Manages", "Inherits", "Uses").
    Ideally the relationship should be backed by one abstraction calling or passing parameters to another.
    Simplify the relationship and exclude those non-important ones.

IMPORTANT: Make sure EVERY abstraction is involved in at least ONE relationship (either as source or target). Each abstraction index must appear at least once across all relationships.

Format the output as YAML:

```yaml
summary: |
  A brief, simple explanation of the project{hint}.
  Can span multiple lines with **bold** and *italic* for emphasis.
relationships:
  - from_abstraction: 0 # AbstractionName1
    to_abstraction: 1 # AbstractionName2
    label: "Manages"{hint}
  - from_abstraction: 2 # AbstractionName3
    to_abstraction: 0 # AbstractionName1
    label: "Provides config"{hint}
  # ... other relationships
```

Now, provide the YAML output:
"#
    )
}

pub fn order_chapters(
    settings: &StageSettings,
    abstraction_listing: &str,
    context: &str,
) -> String {
    let project = &settings.project_name;
    let note = if settings.is_translated() {
        format!(
            " Note: Project Summary might be in {}.",
            settings.language_display()
        )
    } else {
        String::new()
    };
    format!(
        r#"Given the following project abstractions and their relationships for the project `{project}`:

Abstractions (Index # Name){note}:
{abstraction_listing}

Context about relationships and project summary:
{context}

If you are going to make a tutorial for `{project}`, what is the best order to explain these abstractions, from first to last?
Ideally, first explain those that are the most important or foundational, perhaps user-facing concepts or entry points. Then move to more detailed, lower-level implementation details or supporting concepts.

Output the ordered list of abstraction indices, including the name in a comment for clarity. Use the format `idx # AbstractionName`.

```yaml
- 2 # FoundationalConcept
- 0 # CoreClassA
- 1 # CoreClassB (uses CoreClassA)
- ...
```

Now, provide the YAML output:
"#
    )
}

/// Inputs for one chapter prompt.
pub struct ChapterPrompt<'a> {
    pub settings: &'a StageSettings,
    pub chapter_number: usize,
    pub abstraction_name: &'a str,
    pub abstraction_description: &'a str,
    /// Numbered list of every chapter with its Markdown link.
    pub full_chapter_listing: &'a str,
    pub previous_chapter: Option<&'a str>,
    pub next_chapter: Option<&'a str>,
    pub file_context: &'a str,
    /// Text of the chapters already written, for consistency.
    pub previous_chapters_summary: &'a str,
}

pub fn write_chapter(input: &ChapterPrompt<'_>) -> String {
    let settings = input.settings;
    let project = &settings.project_name;
    let number = input.chapter_number;
    let name = input.abstraction_name;
    let description = input.abstraction_description;
    let listing = input.full_chapter_listing;
    let files = if input.file_context.is_empty() {
        "No specific code snippets provided for this abstraction."
    } else {
        input.file_context
    };
    let previous = if input.previous_chapters_summary.is_empty() {
        "This is the first chapter."
    } else {
        input.previous_chapters_summary
    };
    let transitions = match (input.previous_chapter, input.next_chapter) {
        (Some(prev), Some(next)) => format!("The previous chapter is {prev}. The next chapter is {next}."),
        (Some(prev), None) => format!("The previous chapter is {prev}. This is the final chapter."),
        (None, Some(next)) => format!("This is the first chapter. The next chapter is {next}."),
        (None, None) => "This is the only chapter.".to_string(),
    };

    let (lang_instruction, concept_note, structure_note, prev_note, lang_cap, tone_note) =
        if settings.is_translated() {
            let lang = settings.language_display();
            (
                format!(
                    "IMPORTANT: Write this ENTIRE tutorial chapter in **{lang}**. Some input context \
                     (like concept name, description, chapter list, previous summary) might already be \
                     in {lang}, but you MUST translate ALL other generated content including \
                     explanations, examples, technical terms, and potentially code comments into {lang}. \
                     DO NOT use English anywhere except in code syntax, required proper nouns, or when \
                     specified. The entire output MUST be in {lang}.\n\n"
                ),
                format!(" (Note: Provided in {lang})"),
                format!(" (Note: Chapter names might be in {lang})"),
                format!(" (Note: This summary might be in {lang})"),
                format!(" (in {lang})"),
                format!(" (appropriate for {lang} readers)"),
            )
        } else {
            Default::default()
        };

    format!(
        r#"{lang_instruction}Write a very beginner-friendly tutorial chapter (in Markdown format) for the project `{project}` about the concept: "{name}". This is Chapter {number}.

Concept Details{concept_note}:
- Name: {name}
- Description:
{description}

Complete Tutorial Structure{structure_note}:
{listing}

{transitions}

Context from previous chapters{prev_note}:
{previous}

Relevant Code Snippets (Code itself remains unchanged):
{files}

Instructions for the chapter (Generate content in {lang_or_default} unless specified otherwise):
- Start with a clear heading (e.g., `# Chapter {number}: {name}`). Use the provided concept name.

- If this is not the first chapter, begin with a brief transition from the previous chapter{lang_cap}, referencing it with a proper Markdown link using its name{lang_cap}.

- Begin with a high-level motivation explaining what problem this abstraction solves{lang_cap}. Start with a central use case as a concrete example. The whole chapter should guide the reader to understand how to solve this use case. Make it very minimal and friendly to beginners.

- If the abstraction is complex, break it down into key concepts. Explain each concept one-by-one in a very beginner-friendly way{lang_cap}.

- Explain how to use this abstraction to solve the use case{lang_cap}. Give example inputs and outputs for code snippets (if the output isn't values, describe at a high level what will happen{lang_cap}).

- Each code block should be BELOW 10 lines! If longer code blocks are needed, break them down into smaller pieces and walk through them one-by-one. Aggressively simplify the code to make it minimal. Use comments{lang_cap} to skip non-important implementation details. Each code block should have a beginner friendly explanation right after it{lang_cap}.

- Describe the internal implementation to help understand what's under the hood{lang_cap}. First provide a non-code or code-light walkthrough on what happens step-by-step when the abstraction is called{lang_cap}. It's recommended to use a simple sequenceDiagram with a dummy example - keep it minimal with at most 5 participants to ensure clarity. If participant name has space, use: `participant QP as Query Processing`{lang_cap}.

- Then dive deeper into code for the internal implementation with references to files. Provide example code blocks, but make them similarly simple and beginner-friendly. Explain{lang_cap}.

- IMPORTANT: When you need to refer to other core abstractions covered in other chapters, ALWAYS use proper Markdown links like this: [Chapter Title](filename.md). Use the Complete Tutorial Structure above to find the correct filename and the chapter title{lang_cap}. Translate the surrounding text.

- Use mermaid diagrams to illustrate complex concepts (```mermaid``` format).

- Heavily use analogies and examples throughout{lang_cap} to help beginners understand.

- End the chapter with a brief conclusion that summarizes what was learned{lang_cap} and provides a transition to the next chapter{lang_cap}. If there is a next chapter, use a proper Markdown link: [Next Chapter Title](next_chapter_filename){lang_cap}.

- Ensure the tone is welcoming and easy for a newcomer to understand{tone_note}.

- Output *only* the Markdown content for this chapter.

Now, directly provide a super beginner-friendly Markdown output (DON'T need ```markdown``` tags):
"#,
        lang_or_default = if settings.is_translated() {
            settings.language_display()
        } else {
            "English".to_string()
        },
    )
}
