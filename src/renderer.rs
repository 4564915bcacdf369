//! Ratatui-based renderer for heatwatch.
//!
//! Purely presentational, per the teacher's `renderer.rs`: it takes a
//! [`LayoutResult`] (already flattened, weighed, and selected) plus the
//! interactive state the orchestrator owns, and paints a `Frame`. It owns no
//! state of its own and performs no tree or layout logic.

use ratatui::layout::{Constraint, Direction, Layout as RatatuiLayout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;
use unicode_width::UnicodeWidthStr;

use crate::heat::{self, HeatColor};
use crate::layout::LayoutResult;
use crate::tree::NodeKind;
use crate::vcs::VcsClass;

fn heat_ratatui_color(color: HeatColor) -> Color {
    match color {
        HeatColor::BrightRed => Color::LightRed,
        HeatColor::Red => Color::Red,
        HeatColor::Magenta => Color::Magenta,
        HeatColor::Cyan => Color::Cyan,
        HeatColor::Blue => Color::Blue,
    }
}

fn vcs_glyph_and_color(class: VcsClass) -> (&'static str, Color) {
    match class {
        VcsClass::Conflict => ("!", Color::LightRed),
        VcsClass::Unstaged => ("~", Color::Yellow),
        VcsClass::Both => ("~", Color::Yellow),
        VcsClass::Staged => ("+", Color::Green),
        VcsClass::Untracked => ("?", Color::DarkGray),
    }
}

/// Heat bar as a fixed-width Unicode string, e.g. `"███░░░"`.
fn heat_bar(h: f64) -> String {
    let filled = heat::bar_fill(h);
    let empty = heat::BAR_SEGMENTS - filled;
    format!("{}{}", "█".repeat(filled), "░".repeat(empty))
}

/// Tree-prefix string for one line: ancestor continuation bars plus this
/// line's own connector, built from `parent_continues`/`is_last_among_siblings`
/// the same way the teacher's `render_tree_lines` builds `child_prefix`, but
/// read from precomputed per-line data instead of recursion state.
fn tree_prefix(depth: usize, parent_continues: &[bool], is_last: bool) -> String {
    if depth == 0 {
        return String::new();
    }
    let mut out = String::new();
    for continues in parent_continues {
        out.push_str(if *continues { "│   " } else { "    " });
    }
    out.push_str(if is_last { "└── " } else { "├── " });
    out
}

fn render_header(frame: &mut Frame, area: Rect, root_path: &std::path::Path) {
    let title_line = Line::from(vec![
        Span::styled(
            " heatwatch ",
            Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" "),
        Span::styled(
            root_path.display().to_string(),
            Style::default().fg(Color::White),
        ),
    ]);
    frame.render_widget(Paragraph::new(title_line), area);
}

fn render_footer(
    frame: &mut Frame,
    area: Rect,
    filter_mode: bool,
    filter_pattern: &str,
    collapsed: bool,
    total_rows: usize,
    available_rows: usize,
    last_error: Option<&str>,
) {
    let line = if let Some(err) = last_error {
        Line::from(vec![Span::styled(
            format!(" {err}"),
            Style::default().fg(Color::Red),
        )])
    } else if filter_mode {
        Line::from(vec![
            Span::styled(" filter: ", Style::default().fg(Color::Cyan)),
            Span::styled(filter_pattern.to_string(), Style::default().fg(Color::White)),
            Span::styled("_", Style::default().fg(Color::DarkGray)),
        ])
    } else {
        let mut spans = vec![Span::styled(
            " / to filter  |  Enter to open  |  Ctrl+C to quit",
            Style::default().fg(Color::DarkGray),
        )];
        if collapsed {
            spans.push(Span::styled(
                format!("  ({total_rows} entries, {available_rows} shown)"),
                Style::default().fg(Color::DarkGray),
            ));
        }
        Line::from(spans)
    };

    frame.render_widget(Paragraph::new(line), area);
}

/// Render the full UI: header, tree body, footer/filter-bar, from a
/// precomputed [`LayoutResult`] and the orchestrator's interactive state.
#[allow(clippy::too_many_arguments)]
pub fn render_ui(
    frame: &mut Frame,
    layout: &LayoutResult,
    filter_mode: bool,
    filter_pattern: &str,
    cursor_index: usize,
    last_error: Option<&str>,
) {
    let size = frame.area();

    let chunks = RatatuiLayout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(2), Constraint::Min(1), Constraint::Length(1)])
        .split(size);

    let header_area = chunks[0];
    let tree_area = chunks[1];
    let footer_area = chunks[2];

    render_header(frame, header_area, &layout.root_path);

    let mut lines: Vec<Line<'static>> = Vec::with_capacity(layout.lines.len());
    for (i, line) in layout.lines.iter().enumerate() {
        let prefix = tree_prefix(line.depth, &line.parent_continues, line.is_last_among_siblings);

        let mut spans: Vec<Span<'static>> = Vec::new();
        spans.push(Span::styled(prefix, Style::default().fg(Color::DarkGray)));

        let name_style = {
            let mut style = Style::default();
            if line.kind == NodeKind::Directory {
                style = style.add_modifier(Modifier::BOLD);
            }
            if line.ghost {
                style = style.fg(Color::DarkGray).add_modifier(Modifier::CROSSED_OUT);
            } else if line.filter_match.is_some() {
                style = style.fg(Color::White).add_modifier(Modifier::UNDERLINED);
            } else {
                style = style.fg(Color::White);
            }
            style
        };
        spans.push(Span::styled(line.name.clone(), name_style));

        if let Some(class) = line.vcs_class {
            let (glyph, color) = vcs_glyph_and_color(class);
            spans.push(Span::raw(" "));
            spans.push(Span::styled(glyph, Style::default().fg(color)));
        }

        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            heat_bar(line.heat),
            Style::default().fg(heat_ratatui_color(heat::heat_color(line.heat))),
        ));

        if line.kind == NodeKind::Directory && line.change_count > 0 {
            spans.push(Span::styled(
                format!("  ({})", line.change_count),
                Style::default().fg(Color::DarkGray),
            ));
        }

        let rendered = Line::from(spans);
        let rendered = if i == cursor_index {
            rendered.style(Style::default().bg(Color::DarkGray))
        } else {
            rendered
        };
        lines.push(rendered);
    }

    let tree_block = Block::default().borders(Borders::NONE);
    frame.render_widget(Paragraph::new(lines).block(tree_block), tree_area);

    render_footer(
        frame,
        footer_area,
        filter_mode,
        filter_pattern,
        layout.collapsed,
        layout.total_rows,
        layout.available_rows,
        last_error,
    );
}

/// Rendered column width of `s`, accounting for wide Unicode glyphs -- used
/// wherever a field must be padded to align with its neighbors.
pub fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}
