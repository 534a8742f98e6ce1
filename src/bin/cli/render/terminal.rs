use studyquest_lib::flashcards::algorithm::{format_offset, preview_offsets};
use studyquest_lib::progress::{LevelTable, UserProgress};
use studyquest_lib::session::{SessionSummary, SprintPhase, SprintSnapshot};
use studyquest_lib::CompletionReport;

/// ANSI color codes
#[allow(dead_code)]
pub struct Color;

#[allow(dead_code)]
impl Color {
    pub const RESET: &str = "\x1b[0m";
    pub const BOLD: &str = "\x1b[1m";
    pub const DIM: &str = "\x1b[2m";
    pub const RED: &str = "\x1b[31m";
    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const BLUE: &str = "\x1b[34m";
    pub const MAGENTA: &str = "\x1b[35m";
    pub const CYAN: &str = "\x1b[36m";
    pub const GRAY: &str = "\x1b[90m";
}

const WIDTH: usize = 72;

/// Wrap `text` in `color` when colors are on
pub fn paint(text: &str, color: &str, use_color: bool) -> String {
    if use_color {
        format!("{}{}{}", color, text, Color::RESET)
    } else {
        text.to_string()
    }
}

/// Question side of a card under a dimmed header line
pub fn render_question(question: &str, header: &str, use_color: bool) -> String {
    let mut lines = vec![paint(header, Color::GRAY, use_color)];
    for line in wrap_lines(question, "  ", WIDTH) {
        lines.push(paint(&line, Color::BOLD, use_color));
    }
    lines.join("\n")
}

pub fn render_answer(answer: &str, use_color: bool) -> String {
    let mut lines = vec![paint("Answer", Color::GRAY, use_color)];
    for line in wrap_lines(answer, "  ", WIDTH) {
        lines.push(paint(&line, Color::CYAN, use_color));
    }
    lines.join("\n")
}

/// `[#####.....] 150/250 XP`
pub fn render_level_bar(progress: &UserProgress, levels: &LevelTable, use_color: bool) -> String {
    const BAR: usize = 20;

    let start = levels.threshold(progress.level).unwrap_or(0);
    let next = levels.threshold(progress.level + 1);
    let filled = match next {
        Some(next) if next > start => {
            let into_level = progress.xp_total.saturating_sub(start);
            ((into_level * BAR as u64) / (next - start)) as usize
        }
        _ => BAR,
    };

    let bar = format!("{}{}", "#".repeat(filled.min(BAR)), ".".repeat(BAR - filled.min(BAR)));
    let target = match next {
        Some(next) => format!("{}/{} XP", progress.xp_total, next),
        None => format!("{} XP (max level)", progress.xp_total),
    };
    format!("[{}] {}", paint(&bar, Color::GREEN, use_color), target)
}

pub fn render_timer(snapshot: &SprintSnapshot, use_color: bool) -> String {
    let (label, color) = match snapshot.phase {
        SprintPhase::Focus => ("Focus", Color::RED),
        SprintPhase::Break => ("Break", Color::GREEN),
    };
    let state = if snapshot.running { "" } else { " (paused)" };
    format!(
        "{} {}{}  blocks: {}",
        paint(label, color, use_color),
        snapshot.display(),
        state,
        snapshot.completed_focus_blocks
    )
}

/// Rating prompt showing where each rating sends the card
pub fn render_rating_prompt() -> String {
    let [hard, medium, easy] = preview_offsets();
    format!(
        "How was it? [1] Hard ({}) [2] Medium ({}) [3] Easy ({}) >",
        format_offset(hard),
        format_offset(medium),
        format_offset(easy)
    )
}

/// Where a re-queued card went; `position` is its new index in the queue
pub fn render_requeue(position: usize) -> String {
    format!("back {}", format_offset(position))
}

fn render_summary(summary: &SessionSummary, use_color: bool) -> Vec<String> {
    let mut lines = vec![paint(
        &format!("Session complete: {}", summary.technique),
        Color::BOLD,
        use_color,
    )];
    lines.push(format!("  Cards:       {}/{}", summary.completed, summary.total));
    if summary.graded > 0 {
        lines.push(format!("  Correct:     {}/{}", summary.correct, summary.graded));
    }
    if summary.focus_blocks > 0 {
        lines.push(format!("  Focus blocks: {}", summary.focus_blocks));
    }
    if summary.connections > 0 {
        lines.push(format!("  Connections: {}", summary.connections));
    }
    if let Some(players) = &summary.players {
        for player in &players.players {
            lines.push(format!("  {}: {}", player.name, player.score));
        }
        match players.leader() {
            Some(name) => lines.push(format!("  {} wins", name)),
            None => lines.push("  It's a tie".to_string()),
        }
    }
    let bonus = if summary.completion_bonus > 0 {
        format!(" (incl. {} completion bonus)", summary.completion_bonus)
    } else if summary.ended_early {
        " (ended early, no completion bonus)".to_string()
    } else {
        String::new()
    };
    lines.push(format!(
        "  XP earned:   {}{}",
        paint(&format!("+{}", summary.xp), Color::YELLOW, use_color),
        bonus
    ));
    lines
}

pub fn render_report(report: &CompletionReport, levels: &LevelTable, use_color: bool) -> String {
    let mut lines = render_summary(&report.summary, use_color);
    lines.push(String::new());

    let progress = &report.progress;
    let confirmed = if report.progress_confirmed { "" } else { " (not yet confirmed)" };
    lines.push(format!("Level {}{}", progress.level, confirmed));
    lines.push(format!("  {}", render_level_bar(progress, levels, use_color)));

    if report.leveled_up {
        lines.push(paint(
            &format!("Level up! You reached level {}", progress.level),
            Color::MAGENTA,
            use_color,
        ));
    }
    for technique in &report.newly_unlocked {
        let name = technique.descriptor().name;
        lines.push(paint(&format!("Unlocked: {}", name), Color::GREEN, use_color));
    }
    lines.join("\n")
}

/// Simple word-wrapping for terminal output
fn wrap_lines(text: &str, prefix: &str, max_width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let effective_width = max_width.saturating_sub(prefix.len());

    for line in text.lines() {
        if line.chars().count() <= effective_width {
            lines.push(format!("{}{}", prefix, line));
            continue;
        }
        let mut current_line = String::new();
        for word in line.split_whitespace() {
            if current_line.is_empty() {
                current_line = word.to_string();
            } else if current_line.chars().count() + 1 + word.chars().count() <= effective_width {
                current_line.push(' ');
                current_line.push_str(word);
            } else {
                lines.push(format!("{}{}", prefix, current_line));
                current_line = word.to_string();
            }
        }
        if !current_line.is_empty() {
            lines.push(format!("{}{}", prefix, current_line));
        }
    }

    if lines.is_empty() && !text.is_empty() {
        lines.push(format!("{}{}", prefix, text));
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_long_line() {
        let lines = wrap_lines("one two three four", "> ", 11);
        assert_eq!(lines, vec!["> one two", "> three", "> four"]);
    }

    #[test]
    fn test_requeue_counts_cards_ahead() {
        assert_eq!(render_requeue(0), "back next");
        assert_eq!(render_requeue(1), "back after 1 card");
        assert_eq!(render_requeue(3), "back after 3 cards");
    }

    #[test]
    fn test_rating_prompt_lists_offsets() {
        assert_eq!(
            render_rating_prompt(),
            "How was it? [1] Hard (after 1 card) [2] Medium (after 3 cards) [3] Easy (after 10 cards) >"
        );
    }

    #[test]
    fn test_level_bar_half_way() {
        let levels = LevelTable::default();
        let progress = UserProgress {
            user_id: "u".to_string(),
            xp_total: 175,
            level: 2,
            xp_to_next_level: 75,
        };
        let bar = render_level_bar(&progress, &levels, false);
        assert_eq!(bar, "[##########..........] 175/250 XP");
    }

    #[test]
    fn test_level_bar_at_max_level() {
        let levels = LevelTable::default();
        let progress = UserProgress {
            user_id: "u".to_string(),
            xp_total: 2500,
            level: 8,
            xp_to_next_level: 0,
        };
        assert!(render_level_bar(&progress, &levels, false).ends_with("2500 XP (max level)"));
    }
}
