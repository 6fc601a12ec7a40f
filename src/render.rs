//! Rendering surfaces for the aggregate: summary JSON on disk, a console
//! listing, and a Graphviz digraph of the requirement/prerequisite edges.
//! These consume a finished `CatalogSummary` and never touch the network.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::catalog::CatalogSummary;

pub fn write_summary_json(summary: &CatalogSummary, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(summary)?;
    fs::write(path, json).with_context(|| format!("write summary: {}", path.display()))?;
    info!(path = %path.display(), schools = summary.schools.len(), "saved catalog summary");
    Ok(())
}

pub fn load_summary_json(path: &Path) -> Result<CatalogSummary> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("read summary: {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parse summary: {}", path.display()))
}

/// Indented console listing of the whole aggregate.
pub fn print_summary(summary: &CatalogSummary) {
    println!("Catalog: {}", summary.catalog_url);
    println!("Total courses: {}", summary.total_courses);

    for school in &summary.schools {
        println!("\nSchool: {}", school.school_name);
        println!("  Overview: {}", school.school_url);

        for program in &school.programs {
            println!("\n  Program: {}", program.program_name);

            if program.requirement_courses.is_empty() {
                println!("    Requirement courses: none found ({})", program.program_requirements_url);
            } else {
                println!(
                    "    Requirement courses ({}): {}",
                    program.requirement_courses.len(),
                    program.program_requirements_url
                );
                for course in &program.requirement_courses {
                    println!("      - {}: {}", course.course_id, course.course_title);
                }
            }

            println!("    Courses: {}", program.courses_url);
            for course in &program.program_courses {
                println!("      - {}: {}", course.course_id, course.course_title);
                for prerequisite in &course.prerequisites {
                    println!(
                        "          requires {}: {}",
                        prerequisite.course_id, prerequisite.course_title
                    );
                }
            }
        }
    }
}

/// Graphviz digraph: school → program → requirement-course edges plus
/// course → prerequisite edges, duplicates suppressed.
pub fn dot_graph(summary: &CatalogSummary) -> String {
    let mut lines = vec![
        "digraph CatalogSummary {".to_string(),
        "    rankdir=LR;".to_string(),
        "    node [shape=box, style=filled];".to_string(),
        "    edge [fontsize=10];".to_string(),
        String::new(),
    ];

    let mut nodes: HashSet<String> = HashSet::new();
    let mut edges: HashSet<(String, String)> = HashSet::new();

    fn add_node(lines: &mut Vec<String>, nodes: &mut HashSet<String>, id: &str, label: &str, color: &str) {
        if nodes.insert(id.to_string()) {
            lines.push(format!(
                "    {id} [label=\"{}\", fillcolor={color}];",
                escape_label(label)
            ));
        }
    }
    fn add_edge(lines: &mut Vec<String>, edges: &mut HashSet<(String, String)>, from: &str, to: &str, label: Option<&str>) {
        if edges.insert((from.to_string(), to.to_string())) {
            match label {
                Some(l) => lines.push(format!("    {from} -> {to} [label=\"{l}\"];")),
                None => lines.push(format!("    {from} -> {to};")),
            }
        }
    }

    for school in &summary.schools {
        let school_id = sanitize_id(&format!("school_{}", school.school_name));
        add_node(&mut lines, &mut nodes, &school_id, &school.school_name, "lightblue");

        for program in &school.programs {
            let program_id = sanitize_id(&format!(
                "program_{}_{}",
                school.school_name, program.program_name
            ));
            add_node(&mut lines, &mut nodes, &program_id, &program.program_name, "lightgreen");
            add_edge(&mut lines, &mut edges, &school_id, &program_id, None);

            for course in &program.requirement_courses {
                let course_id = sanitize_id(&format!("course_{}", course.course_id));
                add_node(&mut lines, &mut nodes, &course_id, &course.course_id, "lightyellow");
                add_edge(&mut lines, &mut edges, &program_id, &course_id, Some("requires"));
            }

            for course in &program.program_courses {
                let course_node = sanitize_id(&format!("course_{}", course.course_id));
                add_node(&mut lines, &mut nodes, &course_node, &course.course_id, "lightyellow");
                for prerequisite in &course.prerequisites {
                    let prereq_node = sanitize_id(&format!("course_{}", prerequisite.course_id));
                    add_node(&mut lines, &mut nodes, &prereq_node, &prerequisite.course_id, "lightyellow");
                    add_edge(&mut lines, &mut edges, &course_node, &prereq_node, Some("prereq"));
                }
            }
        }
    }

    lines.push("}".to_string());
    lines.join("\n")
}

pub fn write_dot_graph(summary: &CatalogSummary, path: &Path) -> Result<()> {
    fs::write(path, dot_graph(summary))
        .with_context(|| format!("write graph: {}", path.display()))?;
    info!(path = %path.display(), "saved catalog graph");
    Ok(())
}

/// Valid DOT node id: non-alphanumerics become `_`, runs collapsed,
/// ends trimmed.
fn sanitize_id(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev_underscore = false;
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c);
            prev_underscore = false;
        } else if !prev_underscore {
            out.push('_');
            prev_underscore = true;
        }
    }
    out.trim_matches('_').to_string()
}

fn escape_label(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

// ── Tests ──
