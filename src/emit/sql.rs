//! SQL import batch
//!
//! Emits one transaction inserting into `courses`, `course_modules` and
//! `lessons`, followed by a verification query. Children are attached to
//! their parents either through the generated ids carried by the model or,
//! in `TitleLookup` mode, by looking the parent up by title.

use super::format::{comment_safe, escape_sql};
use crate::catalog::{Course, Lesson, Module};
use crate::config::SqlConfig;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Write};

const SECTION_RULE: &str = "-- ============================================";

/// How child rows find their parent row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqlLinking {
    /// Insert generated ids and reference them literally
    #[default]
    Identifiers,
    /// `INSERT ... SELECT` resolving the parent by title.
    ///
    /// Two courses sharing a module name, or two modules sharing a title
    /// within a course, resolve to the wrong or to several parents.
    TitleLookup,
}

/// Renders the import batch for a given configuration
pub struct SqlGenerator<'c> {
    config: &'c SqlConfig,
}

impl<'c> SqlGenerator<'c> {
    pub fn new(config: &'c SqlConfig) -> Self {
        Self { config }
    }

    pub fn generate(&self, courses: &[Course]) -> String {
        let mut sql = String::new();
        // Writing into a String cannot fail
        let _ = self.write_batch(&mut sql, courses);
        sql
    }

    fn lit(&self, value: &str) -> String {
        format!("'{}'", escape_sql(value, self.config.escape_backslashes))
    }

    fn table(&self, name: &str) -> String {
        if self.config.schema.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", self.config.schema, name)
        }
    }

    fn conflict_clause(&self) -> &'static str {
        match (self.config.conflict_guard, self.config.linking) {
            (false, _) => "",
            (true, SqlLinking::Identifiers) => " ON CONFLICT (id) DO NOTHING",
            (true, SqlLinking::TitleLookup) => " ON CONFLICT DO NOTHING",
        }
    }

    fn with_id(&self, columns: &[&'static str]) -> Vec<&'static str> {
        let mut all = Vec::with_capacity(columns.len() + 1);
        if self.config.linking == SqlLinking::Identifiers {
            all.push("id");
        }
        all.extend_from_slice(columns);
        all
    }

    fn write_batch(&self, out: &mut String, courses: &[Course]) -> fmt::Result {
        writeln!(out, "{}", SECTION_RULE)?;
        writeln!(out, "-- {}", comment_safe(&self.config.header))?;
        writeln!(out, "-- Courses: {}", courses.len())?;
        writeln!(out, "{}", SECTION_RULE)?;
        writeln!(out)?;
        writeln!(out, "BEGIN;")?;
        writeln!(out)?;

        for (i, course) in courses.iter().enumerate() {
            writeln!(out, "{}", SECTION_RULE)?;
            writeln!(out, "-- COURSE {}/{}: {}", i + 1, courses.len(), comment_safe(&course.name))?;
            writeln!(out, "{}", SECTION_RULE)?;
            writeln!(out)?;
            self.write_course(out, course)?;

            for (j, module) in course.modules.iter().enumerate() {
                writeln!(
                    out,
                    "-- Module {}/{}: {}",
                    j + 1,
                    course.modules.len(),
                    comment_safe(&module.name)
                )?;
                self.write_module(out, course, module, j + 1)?;

                for (k, lesson) in module.lessons.iter().enumerate() {
                    writeln!(
                        out,
                        "-- Lesson {}/{}: {}",
                        k + 1,
                        module.lessons.len(),
                        comment_safe(&lesson.title)
                    )?;
                    self.write_lesson(out, course, module, lesson, k + 1)?;
                }
            }
            writeln!(out)?;
        }

        writeln!(out, "COMMIT;")?;
        writeln!(out)?;
        self.write_verification(out)
    }

    fn write_columns(&self, out: &mut String, table: &str, columns: &[&str]) -> fmt::Result {
        writeln!(out, "INSERT INTO {} (", self.table(table))?;
        writeln!(out, "  {}", columns.join(",\n  "))
    }

    fn write_values(&self, out: &mut String, values: &[String]) -> fmt::Result {
        writeln!(out, "  {}", values.join(",\n  "))
    }

    fn write_course(&self, out: &mut String, course: &Course) -> fmt::Result {
        let columns = self.with_id(&[
            "title",
            "description",
            "category",
            "is_published",
            "instructor_name",
            "duration_minutes",
            "created_at",
        ]);

        let description = course
            .description
            .clone()
            .unwrap_or_else(|| self.render_template(&self.config.course_description, course, None));
        let category = course.category.as_deref().unwrap_or(&self.config.default_category);
        let instructor = course
            .instructor
            .as_deref()
            .unwrap_or(&self.config.default_instructor);

        let mut values = Vec::new();
        if self.config.linking == SqlLinking::Identifiers {
            values.push(self.lit(&course.id.to_string()));
        }
        values.extend([
            self.lit(&course.name),
            self.lit(&description),
            self.lit(category),
            "true".to_string(),
            self.lit(instructor),
            course_duration_minutes(course).to_string(),
            "now()".to_string(),
        ]);

        self.write_columns(out, "courses", &columns)?;
        writeln!(out, ") VALUES (")?;
        self.write_values(out, &values)?;
        writeln!(out, "){};", self.conflict_clause())?;
        writeln!(out)
    }

    fn write_module(&self, out: &mut String, course: &Course, module: &Module, order: usize) -> fmt::Result {
        let columns = self.with_id(&["title", "description", "course_id", "order_index", "created_at"]);
        let description = module
            .description
            .clone()
            .unwrap_or_else(|| self.render_template(&self.config.module_description, course, Some(module)));

        self.write_columns(out, "course_modules", &columns)?;
        match self.config.linking {
            SqlLinking::Identifiers => {
                writeln!(out, ") VALUES (")?;
                self.write_values(
                    out,
                    &[
                        self.lit(&module.id.to_string()),
                        self.lit(&module.name),
                        self.lit(&description),
                        self.lit(&course.id.to_string()),
                        order.to_string(),
                        "now()".to_string(),
                    ],
                )?;
                writeln!(out, "){};", self.conflict_clause())?;
            }
            SqlLinking::TitleLookup => {
                writeln!(out, ") SELECT")?;
                self.write_values(
                    out,
                    &[
                        self.lit(&module.name),
                        self.lit(&description),
                        "c.id".to_string(),
                        order.to_string(),
                        "now()".to_string(),
                    ],
                )?;
                writeln!(out, "FROM {} c", self.table("courses"))?;
                writeln!(out, "WHERE c.title = {}{};", self.lit(&course.name), self.conflict_clause())?;
            }
        }
        writeln!(out)
    }

    fn write_lesson(
        &self,
        out: &mut String,
        course: &Course,
        module: &Module,
        lesson: &Lesson,
        order: usize,
    ) -> fmt::Result {
        let columns = self.with_id(&[
            "title",
            "description",
            "module_id",
            "video_url",
            "order_index",
            "duration_minutes",
            "created_at",
        ]);
        let description = lesson
            .description
            .clone()
            .unwrap_or_else(|| self.render_template(&self.config.lesson_description, course, Some(module)));

        self.write_columns(out, "lessons", &columns)?;
        match self.config.linking {
            SqlLinking::Identifiers => {
                writeln!(out, ") VALUES (")?;
                self.write_values(
                    out,
                    &[
                        self.lit(&lesson.id.to_string()),
                        self.lit(&lesson.title),
                        self.lit(&description),
                        self.lit(&module.id.to_string()),
                        self.lit(&lesson.url),
                        order.to_string(),
                        lesson.duration_minutes().to_string(),
                        "now()".to_string(),
                    ],
                )?;
                writeln!(out, "){};", self.conflict_clause())?;
            }
            SqlLinking::TitleLookup => {
                writeln!(out, ") SELECT")?;
                self.write_values(
                    out,
                    &[
                        self.lit(&lesson.title),
                        self.lit(&description),
                        "cm.id".to_string(),
                        self.lit(&lesson.url),
                        order.to_string(),
                        lesson.duration_minutes().to_string(),
                        "now()".to_string(),
                    ],
                )?;
                writeln!(out, "FROM {} cm", self.table("course_modules"))?;
                writeln!(out, "WHERE cm.title = {}", self.lit(&module.name))?;
                writeln!(
                    out,
                    "  AND cm.course_id = (SELECT id FROM {} WHERE title = {}){};",
                    self.table("courses"),
                    self.lit(&course.name),
                    self.conflict_clause()
                )?;
            }
        }
        writeln!(out)
    }

    fn write_verification(&self, out: &mut String) -> fmt::Result {
        writeln!(out, "{}", SECTION_RULE)?;
        writeln!(out, "-- IMPORT VERIFICATION")?;
        writeln!(out, "{}", SECTION_RULE)?;
        writeln!(out)?;
        writeln!(out, "SELECT")?;
        writeln!(out, "  c.title AS course,")?;
        writeln!(out, "  COUNT(DISTINCT cm.id) AS total_modules,")?;
        writeln!(out, "  COUNT(DISTINCT l.id) AS total_lessons,")?;
        writeln!(out, "  SUM(l.duration_minutes) AS total_duration_minutes")?;
        writeln!(out, "FROM {} c", self.table("courses"))?;
        writeln!(out, "LEFT JOIN {} cm ON cm.course_id = c.id", self.table("course_modules"))?;
        writeln!(out, "LEFT JOIN {} l ON l.module_id = cm.id", self.table("lessons"))?;
        writeln!(out, "GROUP BY c.id, c.title")?;
        writeln!(out, "ORDER BY c.created_at DESC;")
    }

    /// Fill `{course}`, `{module}`, `{modules}` and `{lessons}` placeholders
    fn render_template(&self, template: &str, course: &Course, module: Option<&Module>) -> String {
        let lessons = module
            .map(|m| m.lessons.len())
            .unwrap_or(course.total_lessons);
        template
            .replace("{course}", &course.name)
            .replace("{module}", module.map(|m| m.name.as_str()).unwrap_or(""))
            .replace("{modules}", &course.modules.len().to_string())
            .replace("{lessons}", &lessons.to_string())
    }
}

/// Whole minutes for a course: summed lesson durations when all are known,
/// otherwise an estimate of one minute per 10 MB.
pub fn course_duration_minutes(course: &Course) -> u64 {
    match course.total_duration() {
        Some(seconds) => (seconds / 60.0).round() as u64,
        None => (course.total_size as f64 / 1024.0 / 1024.0 / 10.0).round() as u64,
    }
}

/// Render the import batch with the given configuration
pub fn generate_sql(courses: &[Course], config: &SqlConfig) -> String {
    SqlGenerator::new(config).generate(courses)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn course(name: &str, modules: Vec<(&str, Vec<&str>)>) -> Course {
        let mut course = Course::new(name, name);
        for (module_name, lessons) in modules {
            let module_path = format!("{}/{}", name, module_name);
            let mut module = Module::new(module_name, name, module_path.as_str());
            for title in lessons {
                module.lessons.push(Lesson::new(
                    title,
                    format!("https://files/{}.mp4", title),
                    1024,
                    "video/mp4",
                    format!("{}/{}.mp4", module_path, title),
                ));
            }
            course.add_module(module);
        }
        course
    }

    /// Walks the script and checks every literal is closed before each `;`
    fn literals_balanced(sql: &str) -> bool {
        let mut in_literal = false;
        let mut in_comment = false;
        let mut chars = sql.chars().peekable();
        while let Some(c) = chars.next() {
            if in_comment {
                if c == '\n' {
                    in_comment = false;
                }
                continue;
            }
            match (in_literal, c) {
                (false, '-') if chars.peek() == Some(&'-') => in_comment = true,
                (false, '\'') => in_literal = true,
                (true, '\'') => {
                    if chars.peek() == Some(&'\'') {
                        chars.next();
                    } else {
                        in_literal = false;
                    }
                }
                (false, ';') => {}
                _ => {}
            }
        }
        !in_literal
    }

    #[test]
    fn test_transaction_wrapping_and_verification() {
        let sql = generate_sql(&[course("CursoA", vec![("M1", vec!["Aula1"])])], &SqlConfig::default());

        let begin = sql.find("BEGIN;").unwrap();
        let commit = sql.find("COMMIT;").unwrap();
        let verify = sql.find("LEFT JOIN public.lessons l ON l.module_id = cm.id").unwrap();
        assert!(begin < commit && commit < verify);
        assert!(sql.contains("SUM(l.duration_minutes)"));
    }

    #[test]
    fn test_identifier_mode_links_by_id() {
        let courses = vec![course("CursoA", vec![("M1", vec!["Aula1"])])];
        let sql = generate_sql(&courses, &SqlConfig::default());

        let course_id = courses[0].id.to_string();
        let module_id = courses[0].modules[0].id.to_string();
        let lesson_id = courses[0].modules[0].lessons[0].id.to_string();

        assert!(sql.contains(&format!("  '{}',\n  'CursoA'", course_id)));
        assert!(sql.contains(&format!("  '{}',\n  'M1',", module_id)));
        assert!(sql.contains(&format!("  '{}',\n  1,", course_id)));
        assert!(sql.contains(&format!("  '{}',\n  'https://files/Aula1.mp4'", module_id)));
        assert!(sql.contains(&format!("'{}'", lesson_id)));
        assert!(!sql.contains("WHERE c.title"));
        assert!(!sql.contains("WHERE cm.title"));
        assert_eq!(sql.matches("ON CONFLICT (id) DO NOTHING;").count(), 3);
    }

    #[test]
    fn test_generation_is_deterministic() {
        let courses = vec![course("CursoA", vec![("M1", vec!["Aula1", "Aula2"])])];
        let config = SqlConfig::default();
        assert_eq!(generate_sql(&courses, &config), generate_sql(&courses, &config));
    }

    #[test]
    fn test_columns_match_destination_tables() {
        let sql = generate_sql(&[course("C", vec![("M", vec!["L"])])], &SqlConfig::default());
        assert!(sql.contains(
            "INSERT INTO public.courses (\n  id,\n  title,\n  description,\n  category,\n  is_published,\n  instructor_name,\n  duration_minutes,\n  created_at\n)"
        ));
        assert!(sql.contains(
            "INSERT INTO public.course_modules (\n  id,\n  title,\n  description,\n  course_id,\n  order_index,\n  created_at\n)"
        ));
        assert!(sql.contains(
            "INSERT INTO public.lessons (\n  id,\n  title,\n  description,\n  module_id,\n  video_url,\n  order_index,\n  duration_minutes,\n  created_at\n)"
        ));
    }

    #[test]
    fn test_quotes_are_escaped() {
        let courses = vec![course("O'Brien's Course", vec![("Mod'ulo", vec!["Aula d'água", "It's"])])];

        for linking in [SqlLinking::Identifiers, SqlLinking::TitleLookup] {
            let config = SqlConfig {
                linking,
                ..SqlConfig::default()
            };
            let sql = generate_sql(&courses, &config);
            assert!(sql.contains("'O''Brien''s Course'"));
            assert!(sql.contains("'Aula d''água'"));
            assert!(literals_balanced(&sql), "unbalanced literal in {:?} mode", linking);
        }
    }

    #[test]
    fn test_backslash_escaping_is_optional() {
        let courses = vec![course("C\\D", vec![("M", vec!["L"])])];
        let plain = generate_sql(&courses, &SqlConfig::default());
        assert!(plain.contains("'C\\D'"));

        let config = SqlConfig {
            escape_backslashes: true,
            ..SqlConfig::default()
        };
        assert!(generate_sql(&courses, &config).contains("'C\\\\D'"));
    }

    #[test]
    fn test_title_lookup_mode_resolves_parents_by_name() {
        let config = SqlConfig {
            linking: SqlLinking::TitleLookup,
            ..SqlConfig::default()
        };
        let sql = generate_sql(&[course("CursoA", vec![("M1", vec!["Aula1"])])], &config);

        assert!(sql.contains("FROM public.courses c\nWHERE c.title = 'CursoA' ON CONFLICT DO NOTHING;"));
        assert!(sql.contains("WHERE cm.title = 'M1'"));
        assert!(sql.contains("(SELECT id FROM public.courses WHERE title = 'CursoA')"));
        assert!(!sql.contains("  id,\n"));
    }

    #[test]
    fn test_title_lookup_cross_links_shared_module_names() {
        // Two modules called "Introducao" in one course: the lesson lookups
        // cannot tell them apart.
        let config = SqlConfig {
            linking: SqlLinking::TitleLookup,
            ..SqlConfig::default()
        };
        let mut twin = course("CursoA", vec![("Introducao", vec!["A1"])]);
        let mut second = Module::new("Introducao", "CursoA", "CursoA/Parte2/Introducao");
        second.lessons.push(Lesson::new(
            "A2",
            "https://files/A2.mp4",
            1024,
            "video/mp4",
            "CursoA/Parte2/Introducao/A2.mp4",
        ));
        twin.add_module(second);

        let sql = generate_sql(&[twin.clone()], &config);
        let lookup = "WHERE cm.title = 'Introducao'\n  AND cm.course_id = (SELECT id FROM public.courses WHERE title = 'CursoA')";
        // Both lessons use the identical parent lookup, so each matches both modules
        assert_eq!(sql.matches(lookup).count(), 2);

        // Identifier mode keeps them apart
        assert_ne!(twin.modules[0].id, twin.modules[1].id);
        let by_id = generate_sql(&[twin.clone()], &SqlConfig::default());
        assert!(by_id.contains(&twin.modules[0].id.to_string()));
        assert!(by_id.contains(&twin.modules[1].id.to_string()));
    }

    #[test]
    fn test_conflict_guard_can_be_disabled() {
        let config = SqlConfig {
            conflict_guard: false,
            ..SqlConfig::default()
        };
        let sql = generate_sql(&[course("C", vec![("M", vec!["L"])])], &config);
        assert!(!sql.contains("ON CONFLICT"));
    }

    #[test]
    fn test_description_templates_and_overrides() {
        let mut c = course("CursoA", vec![("M1", vec!["Aula1", "Aula2"])]);
        let sql = generate_sql(&[c.clone()], &SqlConfig::default());
        assert!(sql.contains("'Curso completo importado do OneDrive - 2 aulas'"));
        assert!(sql.contains("'Módulo com 2 aulas'"));
        assert!(sql.contains("'Aula do curso CursoA'"));
        assert!(sql.contains("'plataforma'"));
        assert!(sql.contains("'Instituto dos Sonhos'"));

        c.description = Some("Própria".to_string());
        c.category = Some("doces".to_string());
        let sql = generate_sql(&[c], &SqlConfig::default());
        assert!(sql.contains("'Própria'"));
        assert!(sql.contains("'doces'"));
    }

    #[test]
    fn test_course_duration_estimate() {
        let mut c = Course::new("C", "C");
        let mut m = Module::new("M", "C", "C/M");
        m.lessons.push(Lesson::new("L", "u", 50 * 1024 * 1024, "video/mp4", "C/M/L"));
        c.add_module(m.clone());
        assert_eq!(course_duration_minutes(&c), 5);

        let mut timed = Course::new("T", "T");
        m.lessons[0].duration = Some(600.0);
        timed.add_module(m);
        assert_eq!(course_duration_minutes(&timed), 10);
    }

    #[test]
    fn test_one_untimed_lesson_falls_back_to_size_estimate() {
        let mut c = Course::new("C", "C");
        let mut m = Module::new("M", "C", "C/M");
        m.lessons
            .push(Lesson::new("A", "u", 0, "video/mp4", "C/M/A").with_duration(Some(60.0)));
        m.lessons
            .push(Lesson::new("B", "u", 10 * 1024 * 1024 * 1024, "video/mp4", "C/M/B"));
        c.add_module(m);
        assert_eq!(course_duration_minutes(&c), 1024);
    }

    #[test]
    fn test_comment_lines_cannot_break_out() {
        let sql = generate_sql(&[course("Curso\nDROP TABLE x;", vec![("M", vec!["L"])])], &SqlConfig::default());
        assert!(sql.contains("-- COURSE 1/1: Curso DROP TABLE x;"));
    }
}
