//! Terminal rendering of [`CmdResult`]s.
//!
//! Layout math (truncation, padding) is done on display width, not bytes, so
//! titles with wide characters line up.

use colored::*;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};
use xfsite::commands::{CmdMessage, CmdResult, MessageLevel};
use xfsite::model::{ContentDocument, DocId, Image, RoadmapData, Section};

pub const LINE_WIDTH: usize = 100;
const PREVIEW_WIDTH: usize = 72;
const BAR_WIDTH: usize = 20;
const ELLIPSIS: &str = "…";

/// Cut `text` to at most `width` columns, ending in an ellipsis when cut.
pub fn truncate_to_width(text: &str, width: usize) -> String {
    if text.width() <= width {
        return text.to_string();
    }
    let budget = width.saturating_sub(ELLIPSIS.width());
    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w > budget {
            break;
        }
        used += w;
        out.push(ch);
    }
    out.push_str(ELLIPSIS);
    out
}

fn pad_to_width(text: &str, width: usize) -> String {
    let padding = width.saturating_sub(text.width());
    format!("{}{}", text, " ".repeat(padding))
}

pub fn progress_bar(progress: u8) -> String {
    let filled = (progress as usize * BAR_WIDTH) / 100;
    format!(
        "[{}{}] {:>3}%",
        "#".repeat(filled),
        "-".repeat(BAR_WIDTH - filled),
        progress
    )
}

pub fn print_messages(messages: &[CmdMessage]) {
    for message in messages {
        match message.level {
            MessageLevel::Info => println!("{}", message.content),
            MessageLevel::Success => println!("{}", message.content.green()),
            MessageLevel::Warning => eprintln!("{}", message.content.yellow()),
            MessageLevel::Error => eprintln!("{}", message.content.red()),
        }
    }
}

fn first_line(content: &str) -> &str {
    content
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("")
}

fn print_section(section: &Section) {
    let images = match section.images.len() {
        0 => String::new(),
        1 => " (1 image)".to_string(),
        n => format!(" ({} images)", n),
    };
    let id_width = LINE_WIDTH.saturating_sub(section.title.width() + images.width() + 4);
    println!(
        "  {}  {}{}",
        section.title.bold(),
        truncate_to_width(&section.id, id_width).dimmed(),
        images.dimmed()
    );
    let preview = first_line(&section.content);
    if !preview.is_empty() {
        println!("    {}", truncate_to_width(preview, PREVIEW_WIDTH));
    }
}

pub fn print_document(id: DocId, doc: &ContentDocument) {
    println!("{} {}", doc.title.bold().underline(), format!("[{}]", id).dimmed());
    if !doc.subtitle.is_empty() {
        println!("{}", truncate_to_width(&doc.subtitle, LINE_WIDTH).italic());
    }
    if doc.sections.is_empty() {
        println!("  {}", "No sections.".dimmed());
    }
    for section in &doc.sections {
        print_section(section);
    }
}

pub fn print_images(images: &[Image]) {
    if images.is_empty() {
        println!("No images.");
        return;
    }
    for image in images {
        println!(
            "{:<14} {} {} {}",
            image.id.to_string().yellow(),
            truncate_to_width(&image.name, 40),
            image.media_type.dimmed(),
            image.blob[..12.min(image.blob.len())].dimmed()
        );
    }
}

pub fn print_roadmap(roadmap: &RoadmapData) {
    println!("{} {}", "Roadmap".bold().underline(), format!("(updated {})", roadmap.last_updated).dimmed());
    if roadmap.quarters.is_empty() {
        println!("  {}", "No quarters.".dimmed());
    }
    let title_width = LINE_WIDTH - BAR_WIDTH - 40;
    for quarter in &roadmap.quarters {
        println!();
        println!("{} {}", quarter.name.bold(), format!("[{}]", quarter.id).dimmed());
        if quarter.tasks.is_empty() {
            println!("  {}", "No tasks.".dimmed());
        }
        for task in &quarter.tasks {
            let bar = progress_bar(task.progress);
            let bar = if task.progress == 100 {
                bar.green()
            } else {
                bar.normal()
            };
            println!(
                "  {} {} {:<10} {}",
                pad_to_width(&truncate_to_width(&task.title, title_width), title_width),
                bar,
                task.category.name().cyan(),
                task.id.dimmed()
            );
        }
    }
}

/// Print everything a command produced: messages first, then data.
pub fn print_result(result: &CmdResult) {
    print_messages(&result.messages);
    for (id, doc) in &result.documents {
        print_document(*id, doc);
        println!();
    }
    if !result.images.is_empty() {
        print_images(&result.images);
    }
    if let Some(roadmap) = &result.roadmap {
        print_roadmap(roadmap);
    }
}
