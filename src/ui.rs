use colored::*;
use jiff::{Timestamp, tz::TimeZone};

use crate::models::{
    filter::FilterState,
    project::Project,
    tag::{
        FILTER_CATEGORIES, Phase, categories_in, extract_all_tags, group_tags, label_for_tag,
    },
};

const CARD_WIDTH: usize = 34;
const CARD_BADGES: usize = 3;

/// Get the terminal width, defaulting to 80 if unavailable
fn get_terminal_width() -> usize {
    term_size::dimensions().map(|(w, _)| w).unwrap_or(80)
}

/// Truncate to `width` visible characters, marking the cut with an ellipsis
pub fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let kept: String = text.chars().take(width.saturating_sub(1)).collect();
    format!("{kept}…")
}

fn pad(text: &str, width: usize) -> String {
    let visible = truncate(text, width);
    let fill = width.saturating_sub(visible.chars().count());
    format!("{visible}{}", " ".repeat(fill))
}

/// Format a timestamp as "November 2024"
pub fn format_month_year(timestamp: Timestamp) -> String {
    timestamp
        .to_zoned(TimeZone::system())
        .strftime("%B %Y")
        .to_string()
}

/// Badge text for the first `max` tags, plus a `+N` marker for the rest
pub fn badge_labels(tags: &[String], max: usize) -> Vec<String> {
    let mut badges: Vec<String> = tags.iter().take(max).map(|t| label_for_tag(t)).collect();
    if tags.len() > max {
        badges.push(format!("+{}", tags.len() - max));
    }
    badges
}

/// Raw tags for the admin table: the first few, then `+N`
fn tag_summary(tags: &[String]) -> String {
    let mut summary = tags
        .iter()
        .take(CARD_BADGES)
        .cloned()
        .collect::<Vec<_>>()
        .join(", ");
    if tags.len() > CARD_BADGES {
        summary.push_str(&format!(" +{}", tags.len() - CARD_BADGES));
    }
    summary
}

fn short_id(project: &Project) -> String {
    project.id.to_string().chars().take(8).collect()
}

/// Render a view header with title and count
pub fn render_view_header(title: &str, count: usize) {
    let project_word = if count == 1 { "project" } else { "projects" };
    println!("\n  {} ({} {})\n", title.cyan().bold(), count, project_word);
}

/// Render a section header (e.g., "More Filters")
pub fn render_section_header(title: &str) {
    println!("\n  ─── {} ───\n", title.bold());
}

/// Main filter row, the "More Filters" counter, and the active chips
pub fn render_filter_bar(state: &FilterState) {
    let mut row: Vec<String> = categories_in(Phase::Primary)
        .map(|category| {
            let active = state.selected(category.key).map_or(0, |s| s.len());
            if active > 0 {
                format!("{} ({})", category.label, active)
                    .on_black()
                    .white()
                    .bold()
                    .to_string()
            } else {
                category.label.dimmed().to_string()
            }
        })
        .collect();

    let more = state.count_active_in(Phase::Secondary);
    row.push(if more > 0 {
        format!("More Filters ({more})").on_black().white().bold().to_string()
    } else {
        "More Filters".dimmed().to_string()
    });

    println!("  {}", row.join("  "));

    if state.has_active_filters() {
        let chips: Vec<String> = state
            .active_chips()
            .into_iter()
            .map(|chip| format!("× {}", chip.label).yellow().to_string())
            .collect();
        let hint = format!("({} active, drop -f flags to clear)", state.count_active());
        println!("  {}  {}", chips.join("  "), hint.dimmed());
    }
}

fn card_lines(project: &Project) -> [String; 3] {
    let badges = badge_labels(&project.tags, CARD_BADGES).join(" · ");
    let footer = if project.has_pattern() {
        format!("{}  ▤ pattern", short_id(project))
    } else {
        short_id(project)
    };
    [project.name.clone(), badges, footer]
}

/// Render projects as a grid of cards sized to the terminal
pub fn render_gallery(projects: &[&Project]) {
    let columns = (get_terminal_width().saturating_sub(2) / (CARD_WIDTH + 2)).max(1);

    for row in projects.chunks(columns) {
        let cards: Vec<[String; 3]> = row.iter().map(|p| card_lines(p)).collect();

        let names: Vec<String> = cards
            .iter()
            .map(|c| pad(&c[0], CARD_WIDTH).bold().to_string())
            .collect();
        let tags: Vec<String> = cards
            .iter()
            .map(|c| pad(&c[1], CARD_WIDTH).blue().to_string())
            .collect();
        let footers: Vec<String> = cards
            .iter()
            .map(|c| pad(&c[2], CARD_WIDTH).dimmed().to_string())
            .collect();

        println!("  {}", names.join("  "));
        println!("  {}", tags.join("  "));
        println!("  {}", footers.join("  "));
        println!();
    }
}

/// Every category with its options; collection options come from `projects`
pub fn render_filter_catalog(projects: &[Project]) {
    for (phase, title) in [(Phase::Primary, "Filters"), (Phase::Secondary, "More Filters")] {
        render_section_header(title);
        for category in categories_in(phase) {
            let options = category.resolve_options(projects);
            println!("  {} {}", "•".green(), category.label.bold());
            if options.is_empty() {
                println!("    {}", "no options yet".dimmed());
            }
            for option in options {
                println!("    {:<28} {}", option.value, option.label.dimmed());
            }
            println!();
        }
    }
}

/// All distinct tags with the number of projects using them
pub fn render_tag_counts(projects: &[Project]) {
    let tags = extract_all_tags(projects);
    if tags.is_empty() {
        println!("No tags found");
        return;
    }

    println!(
        "{} ({} {})\n",
        "TAGS".cyan(),
        tags.len(),
        if tags.len() == 1 { "tag" } else { "tags" }
    );
    for tag in tags {
        let count = projects.iter().filter(|p| p.tags.contains(&tag)).count();
        println!(
            "  {} {} {}",
            "•".green(),
            tag.bold(),
            format!(
                "({} {})",
                count,
                if count == 1 { "project" } else { "projects" }
            )
            .dimmed()
        );
    }
}

/// Full project view: header, description, grouped tags, links
pub fn render_project_detail(project: &Project, image_url: &str, is_admin: bool) {
    println!("\n  {}", project.name.cyan().bold());
    println!("  {}", format_month_year(project.created_at).dimmed());

    if let Some(description) = &project.description {
        println!();
        for line in description.lines() {
            println!("  {line}");
        }
    }

    if !project.tags.is_empty() {
        let grouped = group_tags(&project.tags);
        let width = FILTER_CATEGORIES
            .iter()
            .map(|c| c.label.chars().count())
            .max()
            .unwrap_or(0);

        println!();
        for (label, values) in grouped.groups {
            println!("  {}  {}", pad(label, width).dimmed(), values.join(", "));
        }
        if !grouped.other.is_empty() {
            let badges: Vec<String> = grouped.other.iter().map(|t| format!("#{t}")).collect();
            println!("  {}  {}", pad("Tags", width).dimmed(), badges.join(" ").blue());
        }
    }

    println!();
    println!("  {}  {}", "Image".dimmed(), image_url);
    if project.has_pattern() {
        println!(
            "  {}  stitch pattern {}",
            "Pattern".dimmed(),
            project.id
        );
    }
    if is_admin {
        println!(
            "  {}  stitch admin edit {} · stitch admin delete {}",
            "Admin".dimmed(),
            project.id,
            project.id
        );
    }
    println!();
}

/// Admin overview table, newest first
pub fn render_admin_table(projects: &[Project]) {
    render_view_header("Projects", projects.len());

    println!(
        "  {}",
        format!(
            "{:<36}  {:<28}  {:<14}  {:<34}  {}",
            "ID", "NAME", "ADDED", "TAGS", "PATTERN"
        )
        .dimmed()
    );

    for project in projects {
        let pattern = if project.has_pattern() {
            "✓".green()
        } else {
            "—".dimmed()
        };
        println!(
            "  {:<36}  {}  {:<14}  {}  {}",
            project.id,
            pad(&project.name, 28).bold(),
            format_month_year(project.created_at),
            pad(&tag_summary(&project.tags), 34),
            pattern
        );
    }
    println!();
}
