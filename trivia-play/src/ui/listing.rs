//! Plain-text listings for the non-interactive commands.

use std::io::{self, Write};

use trivia_client::{Category, ExternalCategory, SessionRecord, TriviaSummary};

pub fn render_sessions<W: Write>(out: &mut W, sessions: &[SessionRecord]) -> io::Result<()> {
    if sessions.is_empty() {
        return writeln!(out, "No sessions.");
    }
    for record in sessions {
        writeln!(
            out,
            "{}  {:<11}  {}/{} answered  {} pts  {}",
            record.session_id,
            record.status.as_str(),
            record.answered_count,
            record.total_questions,
            record.total_score,
            record.trivia_title.as_deref().unwrap_or(&record.trivia_id)
        )?;
    }
    Ok(())
}

pub fn render_trivias<W: Write>(out: &mut W, trivias: &[TriviaSummary]) -> io::Result<()> {
    if trivias.is_empty() {
        return writeln!(out, "No published trivias.");
    }
    for trivia in trivias {
        writeln!(
            out,
            "{}  {:<6}  {}{}",
            trivia.trivia_id,
            trivia.difficulty.map_or("-", |d| d.as_str()),
            trivia.title,
            trivia
                .category
                .as_deref()
                .map(|c| format!("  ({c})"))
                .unwrap_or_default()
        )?;
    }
    Ok(())
}

pub fn render_categories<W: Write>(
    out: &mut W,
    own: &[Category],
    external: &[ExternalCategory],
) -> io::Result<()> {
    writeln!(out, "Platform categories:")?;
    for category in own {
        writeln!(out, "  {}  {}", category.id, category.name)?;
    }
    writeln!(out, "External bank categories (use with --category):")?;
    for category in external {
        writeln!(out, "  {:>3}  {}", category.id, category.name)?;
    }
    Ok(())
}
