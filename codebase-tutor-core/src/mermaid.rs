//! Mermaid diagram builders and clean-up of LLM-written diagrams.
//!
//! LLMs regularly break Mermaid syntax by putting line breaks inside node
//! labels or by using `List~T~` generics; [`fix_common_issues`] repairs those
//! and [`validate_syntax`] reports what it cannot repair.

use crate::abstractions::Abstraction;
use crate::relationships::RelationshipMap;
use regex::Regex;
use std::sync::OnceLock;

const MAX_EDGE_LABEL_LEN: usize = 30;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NodeShape {
    Start,
    End,
    Process,
    Decision,
    #[default]
    Box,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowNode {
    pub id: String,
    pub label: String,
    pub shape: NodeShape,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowEdge {
    pub from: String,
    pub to: String,
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub id: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interaction {
    pub from: String,
    pub to: String,
    pub message: String,
    /// Mermaid arrow such as `->>` or `-->>`. Defaults to `->`.
    pub arrow: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassMember {
    /// `+`, `-`, `#` or `~`.
    pub visibility: char,
    pub name: String,
    pub ty: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassMethod {
    pub visibility: char,
    pub name: String,
    pub params: String,
    pub returns: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDef {
    pub name: String,
    pub attributes: Vec<ClassMember>,
    pub methods: Vec<ClassMethod>,
}

fn single_line(label: &str) -> String {
    label.replace('\n', " ").trim().to_string()
}

pub fn format_flowchart(nodes: &[FlowNode], edges: &[FlowEdge]) -> String {
    let mut lines = vec!["flowchart TD".to_string()];
    for node in nodes {
        let label = single_line(&node.label);
        let id = &node.id;
        lines.push(match node.shape {
            NodeShape::Process => format!("    {id}(\"{label}\")"),
            NodeShape::Decision => format!("    {id}{{{label}}}"),
            NodeShape::Start | NodeShape::End | NodeShape::Box => format!("    {id}[\"{label}\"]"),
        });
    }
    for edge in edges {
        lines.push(match edge.label.as_deref() {
            Some(label) if !label.is_empty() => {
                format!("    {} -- \"{label}\" --> {}", edge.from, edge.to)
            }
            _ => format!("    {} --> {}", edge.from, edge.to),
        });
    }
    lines.join("\n")
}

pub fn format_sequence_diagram(participants: &[Participant], interactions: &[Interaction]) -> String {
    let mut lines = vec!["sequenceDiagram".to_string()];
    for p in participants {
        lines.push(format!("    participant {} as {}", p.id, single_line(&p.label)));
    }
    for i in interactions {
        let arrow = i.arrow.as_deref().unwrap_or("->");
        lines.push(format!("    {}{arrow}{}: {}", i.from, i.to, i.message));
    }
    lines.join("\n")
}

pub fn format_class_diagram(classes: &[ClassDef]) -> String {
    let mut lines = vec!["classDiagram".to_string()];
    for class in classes {
        lines.push(format!("    class {} {{", class.name));
        for attr in &class.attributes {
            lines.push(format!("        {}{}: {}", attr.visibility, attr.name, attr.ty));
        }
        for method in &class.methods {
            lines.push(format!(
                "        {}{}({}): {}",
                method.visibility, method.name, method.params, method.returns
            ));
        }
        lines.push("    }".to_string());
    }
    lines.join("\n")
}

/// The relationship graph shown in `index.md`: one node per abstraction,
/// one labelled edge per relationship.
pub fn relationship_flowchart(abstractions: &[Abstraction], relationships: &RelationshipMap) -> String {
    let nodes: Vec<FlowNode> = abstractions
        .iter()
        .enumerate()
        .map(|(i, a)| FlowNode {
            id: format!("A{i}"),
            label: a.name.replace('"', ""),
            shape: NodeShape::Box,
        })
        .collect();
    let edges: Vec<FlowEdge> = relationships
        .details
        .iter()
        .map(|r| FlowEdge {
            from: format!("A{}", r.from),
            to: format!("A{}", r.to),
            label: Some(edge_label(&r.label)),
        })
        .collect();
    format_flowchart(&nodes, &edges)
}

fn edge_label(raw: &str) -> String {
    let label = raw.replace('"', "").replace('\n', " ");
    if label.chars().count() > MAX_EDGE_LABEL_LEN {
        let cut: String = label.chars().take(MAX_EDGE_LABEL_LEN - 3).collect();
        format!("{cut}...")
    } else {
        label
    }
}

fn multiline_label_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"\["([^"]*?)\n([^"]*?)"\]"#).expect("valid label regex"))
}

fn generic_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"List~([^~]+)~").expect("valid generic regex"))
}

fn mermaid_block_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```mermaid[ \t]*\r?\n(.*?)```").expect("valid block regex"))
}

/// Join line breaks inside `["..."]` node labels with spaces.
pub fn clean_node_labels(text: &str) -> String {
    let re = multiline_label_regex();
    let mut text = text.to_string();
    while re.is_match(&text) {
        text = re.replace_all(&text, "[\"${1} ${2}\"]").into_owned();
    }
    text
}

/// Strip code fences, join multi-line labels and rewrite `List~T~` generics.
pub fn fix_common_issues(text: &str) -> String {
    let text = text.replace("```mermaid\n", "").replace("```", "");
    let text = clean_node_labels(&text);
    let text = generic_regex().replace_all(&text, "List<${1}>");
    text.trim().to_string()
}

/// Problems that would stop a diagram from rendering. Empty when none are found.
pub fn validate_syntax(text: &str) -> Vec<String> {
    let mut errors = Vec::new();
    if let Some((_, after)) = text.split_once("```mermaid") {
        if !after.contains("```") {
            errors.push("Missing closing ``` for mermaid block".to_string());
        }
    }
    if multiline_label_regex().is_match(text) {
        errors.push("Line breaks found in node labels - use spaces instead".to_string());
    }
    if text.contains("sequenceDiagram") {
        let participants = text
            .lines()
            .filter(|l| l.trim_start().starts_with("participant"))
            .count();
        let interactions = text.lines().filter(|l| l.contains("->")).count();
        if participants > 0 && interactions == 0 {
            errors.push("Sequence diagram has participants but no interactions".to_string());
        }
    }
    errors
}

/// Apply [`fix_common_issues`] to every ```` ```mermaid ```` block of a
/// Markdown document. Returns the new text and the problems still found in
/// the repaired blocks.
pub fn repair_markdown_diagrams(markdown: &str) -> (String, Vec<String>) {
    let mut problems = Vec::new();
    let repaired = mermaid_block_regex().replace_all(markdown, |caps: &regex::Captures| {
        let fixed = fix_common_issues(&caps[1]);
        problems.extend(validate_syntax(&fixed));
        format!("```mermaid\n{fixed}\n```")
    });
    (repaired.into_owned(), problems)
}
