//! Prompt templates for every completion the pipeline makes.

use std::collections::BTreeSet;

use crate::research::citations::SourceId;

pub fn query_planner(topic: &str, report_organization: &str, num_queries: usize) -> String {
    format!(
        r#"Generate {num_queries} search queries that will help with planning the sections of the final report.

# Report topic
{topic}

# Report organization
{report_organization}

# Instructions
1. Create queries to help answer questions for all sections in report organization.
2. Format your response as a JSON array of objects with the following keys:
- "query": The actual search query string
- "report_section": The section of report organization the query is generated for
- "rationale": Brief explanation of why this query is relevant to report organization

**Output example**
```json
[
    {{
        "query": "What is a transformer?",
        "report_section": "Introduction",
        "rationale": "Introduces the user to transformer"
    }}
]
```"#
    )
}

pub fn relevancy_check(query: &str, document: &str) -> String {
    format!(
        r#"Determine if the Context contains proper information to answer the Question.

# Question
{query}

# Context
{document}

# Instructions
1. Give a binary score 'yes' or 'no' to indicate whether the context is able to answer the question.

**Output example**
```json
{{
    "score": "yes"
}}
```"#
    )
}

pub fn section_writer(
    topic: &str,
    section: &str,
    existing: &str,
    sources: &str,
    citable: &BTreeSet<SourceId>,
) -> String {
    let allowed = if citable.is_empty() {
        "none; do not cite anything".to_string()
    } else {
        citable
            .iter()
            .map(|id| format!("[{}]", id))
            .collect::<Vec<_>>()
            .join(", ")
    };

    format!(
        r#"Write the "{section}" section of a research report on the topic below.

# Report topic
{topic}

# Existing section content
{existing}

# Knowledge sources for this section
{sources}

# Instructions
1. Write only new paragraphs for this section; do not repeat the existing content.
2. Use the knowledge sources; if they are thin, write a short honest overview.
3. Cite sources inline with their number in square brackets, for example [1].
4. You may only cite these sources: {allowed}
5. Use markdown for lists and emphasis but do not add a heading for the section.
6. Do NOT wrap the text in markdown code blocks."#
    )
}

pub fn reflection(topic: &str, report_organization: &str, report: &str) -> String {
    format!(
        r#"Using report organization as a guide identify knowledge gaps and/or areas that have not been addressed comprehensively in the report.

# Report topic
{topic}

# Report organization
{report_organization}

# Draft Report
{report}

# Instructions
1. Focus on details that are necessary to understanding the key concepts as a whole that have not been fully covered
2. Ensure the follow-up question is self-contained and includes necessary context for web search.
3. Format your response as a JSON object with the following keys:
- query: Write a specific follow up question to address this gap
- report_section: The section of report the query is for
- rationale: Describe what information is missing or needs clarification

**Output example**
```json
{{
    "query": "What are typical performance benchmarks and metrics used to evaluate [specific technology]?",
    "report_section": "Deep dive",
    "rationale": "The report lacks information about performance metrics and benchmarks"
}}
```"#
    )
}

pub fn executive_summary(topic: &str, report_organization: &str, report: &str) -> String {
    format!(
        r#"Write an executive summary for the research report below.

# Report topic
{topic}

# Report organization
{report_organization}

<REPORT DRAFT>
{report}
</REPORT DRAFT>

# Instructions
1. Two to four short paragraphs covering the most significant findings.
2. Do not add headings, a title or a sources section.
3. Return only the summary without any other commentary."#
    )
}

pub fn artifact_guardrail(question: &str, artifact: &str) -> String {
    format!(
        r#"You are an AI assistant part of a research team. You have a draft research report and access to the data sources for the report. The user will be asking questions about the report and making requests for edits.

Your job is to determine whether the user prompt is within scope. Reply using JSON with the format

```json
{{"relevant": "no"}}
```

## Prompt
{question}

## Draft Report
{artifact}

Examples:

prompt: what is the report about
response: {{"relevant": "yes"}}

prompt: change the title to be shorter
response: {{"relevant": "yes"}}

prompt: who is the current president
draft report: a report about effective study habits
response: {{"relevant": "no"}}"#
    )
}

pub fn artifact_rewrite(artifact: &str, request: &str) -> String {
    format!(
        r#"The user has asked for an update to a report you wrote earlier.

Here is the current content of the report:
<artifact>
{artifact}
</artifact>

Rules:
- Respond with the ENTIRE updated report, with no additional text before or after.
- Do not wrap it in any XML tags you see in this prompt.
- Use proper markdown, and do not wrap the report in triple backticks.

User request:
{request}"#
    )
}

pub fn artifact_chat_context(artifact: &str) -> String {
    format!(
        "<app-context>\nYou are a helpful AI assistant. The user has a research report in front of them. \
         Refer to it as needed to answer questions or provide clarifications. \
         Follow the user requests carefully.\n</app-context>\n\n<artifact>\n{}\n</artifact>",
        artifact
    )
}
