//! Human-readable catalog report

use super::format::{format_bytes, format_duration};
use crate::catalog::{CatalogTotals, Course};
use std::fmt::{self, Write};

const RULE_WIDTH: usize = 80;

/// Render the nested course report with running totals
pub fn generate_report(courses: &[Course]) -> String {
    let mut report = String::new();
    // Writing into a String cannot fail
    let _ = write_report(&mut report, courses);
    report
}

fn write_report(out: &mut String, courses: &[Course]) -> fmt::Result {
    writeln!(out, "📊 COURSE REPORT - ALL LESSONS")?;
    writeln!(out, "{}", "=".repeat(RULE_WIDTH))?;
    writeln!(out)?;

    for course in courses {
        writeln!(out, "📚 COURSE: {}", course.name)?;
        writeln!(out, "   📍 Path: {}", course.path)?;
        writeln!(out, "   📦 Modules: {}", course.modules.len())?;
        writeln!(out, "   🎥 Lessons: {}", course.total_lessons)?;
        writeln!(out, "   💾 Total size: {}", format_bytes(course.total_size))?;
        writeln!(out)?;

        for module in &course.modules {
            writeln!(out, "   📁 MODULE: {}", module.name)?;
            writeln!(out, "      📍 Path: {}", module.path)?;
            writeln!(out, "      🎥 Lessons: {}", module.lessons.len())?;
            writeln!(out)?;

            for lesson in &module.lessons {
                writeln!(out, "      🎬 {}", lesson.title)?;
                writeln!(out, "         📍 {}", lesson.path)?;
                writeln!(out, "         🔗 {}", lesson.url)?;
                writeln!(out, "         💾 {}", format_bytes(lesson.size))?;
                if let Some(duration) = lesson.duration {
                    writeln!(out, "         ⏱️  {}", format_duration(duration))?;
                }
                writeln!(out)?;
            }
        }

        writeln!(out)?;
        writeln!(out, "{}", "-".repeat(RULE_WIDTH))?;
        writeln!(out)?;
    }

    let totals = CatalogTotals::of(courses);
    writeln!(out, "📈 OVERALL STATISTICS")?;
    writeln!(out, "   📚 Courses: {}", totals.total_courses)?;
    writeln!(out, "   📦 Modules: {}", totals.total_modules)?;
    writeln!(out, "   🎥 Lessons: {}", totals.total_lessons)?;
    writeln!(out, "   💾 Total size: {}", format_bytes(totals.total_size))?;

    Ok(())
}
