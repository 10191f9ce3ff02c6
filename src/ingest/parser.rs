//! Course document parsing.
//!
//! Expected layout:
//!
//! ```text
//! Course Title: <title>
//! Course Link: <url>
//! Course Instructor: <name>
//!
//! Lesson 0: <lesson title>
//! Lesson Link: <url>
//! <lesson text...>
//! ```

use crate::course::{Course, Lesson};
use regex::Regex;
use std::sync::LazyLock;

static COURSE_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^course\s+(title|link|instructor)\s*:\s*(.*)$").unwrap()
});
static LESSON_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^lesson\s+(\d+)\s*:\s*(.*)$").unwrap());
static LESSON_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^lesson\s+link\s*:\s*(.*)$").unwrap());

/// A parsed course document: metadata plus the raw text of each section.
#[derive(Debug, Clone, PartialEq)]
pub struct CourseDocument {
    pub course: Course,
    /// Text of each lesson, keyed by lesson number, in document order.
    pub lessons: Vec<(u32, String)>,
    /// Body text when the document has no lesson markers.
    pub body: String,
}

/// Parse a course document. `fallback_title` is used when the document has no
/// `Course Title:` line.
pub fn parse_course(text: &str, fallback_title: &str) -> CourseDocument {
    let mut course = Course {
        title: fallback_title.to_string(),
        course_link: None,
        instructor: None,
        lessons: Vec::new(),
    };

    let mut lessons: Vec<(u32, String)> = Vec::new();
    let mut body = Vec::new();
    let mut current: Option<(Lesson, Vec<&str>)> = None;

    for line in text.lines() {
        let trimmed = line.trim();

        if current.is_none() {
            if let Some(caps) = COURSE_FIELD.captures(trimmed) {
                let value = caps[2].trim().to_string();
                match caps[1].to_lowercase().as_str() {
                    "title" if !value.is_empty() => course.title = value,
                    "link" if !value.is_empty() => course.course_link = Some(value),
                    "instructor" if !value.is_empty() => course.instructor = Some(value),
                    _ => {}
                }
                continue;
            }
        }

        if let Some(caps) = LESSON_HEADER.captures(trimmed) {
            if let Some((lesson, lines)) = current.take() {
                lessons.push((lesson.lesson_number, lines.join("\n")));
                course.lessons.push(lesson);
            }
            let Ok(lesson_number) = caps[1].parse::<u32>() else {
                continue;
            };
            current = Some((
                Lesson {
                    lesson_number,
                    title: caps[2].trim().to_string(),
                    lesson_link: None,
                },
                Vec::new(),
            ));
            continue;
        }

        match current.as_mut() {
            Some((lesson, lines)) => {
                if lines.is_empty() && lesson.lesson_link.is_none() {
                    if let Some(caps) = LESSON_LINK.captures(trimmed) {
                        let link = caps[1].trim();
                        if !link.is_empty() {
                            lesson.lesson_link = Some(link.to_string());
                        }
                        continue;
                    }
                }
                lines.push(line);
            }
            None => body.push(line),
        }
    }

    if let Some((lesson, lines)) = current {
        lessons.push((lesson.lesson_number, lines.join("\n")));
        course.lessons.push(lesson);
    }

    CourseDocument {
        course,
        lessons,
        body: body.join("\n").trim().to_string(),
    }
}
