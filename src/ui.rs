use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Clear, Paragraph},
};

use crate::domain::{GmvConfig, HELP_TEXT};
use crate::engine::{SortDir, SortSpec};
use crate::model::{GroupDisplay, ViewData};
use crate::record::Field;

const COLUMN_SPACING: usize = 2;
const MIN_COLUMN_WIDTH: usize = 3;

pub struct MatchUI {
    config: GmvConfig,
    scroll: usize,
}

impl MatchUI {
    pub fn new(config: &GmvConfig) -> Self {
        Self {
            config: config.clone(),
            scroll: 0,
        }
    }

    pub fn draw(&mut self, view: &ViewData, frame: &mut Frame) {
        let [title_area, body_area, status_area] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .areas(frame.area());

        self.draw_title(view, title_area, frame);
        self.draw_body(view, body_area, frame);
        self.draw_status(view, status_area, frame);

        if view.show_help {
            self.draw_help(frame);
        }
    }

    fn draw_title(&self, view: &ViewData, area: Rect, frame: &mut Frame) {
        let title = Line::from(vec![
            Span::from(format!(" {} ", view.title)).bold(),
            Span::from(format!("— {} of {} records", view.matched, view.total)).dim(),
        ]);
        frame.render_widget(Paragraph::new(title), area);
    }

    fn draw_body(&mut self, view: &ViewData, area: Rect, frame: &mut Frame) {
        if view.groups.is_empty() {
            let hint = if view.total == 0 {
                "No records loaded."
            } else {
                "No matches found."
            };
            frame.render_widget(
                Paragraph::new(Line::from(hint).dim()).centered(),
                area,
            );
            return;
        }

        let widths = self.column_widths(view);
        let mut lines: Vec<Line> = Vec::new();
        let mut selected_line = 0;

        for (gidx, group) in view.groups.iter().enumerate() {
            let is_selected = gidx == view.selected_group;
            if is_selected {
                selected_line = lines.len();
            }
            lines.push(group_header(group, is_selected));
            if group.expanded {
                lines.push(column_header(&widths, view.sort, view.cursor_column));
                for (row_idx, &ridx) in group.rows.iter().enumerate() {
                    let row_selected = is_selected && row_idx == view.cursor_row;
                    if row_selected {
                        selected_line = lines.len();
                    }
                    lines.push(record_line(
                        view,
                        ridx,
                        row_idx,
                        group,
                        &widths,
                        row_selected,
                    ));
                }
            }
        }

        // Keep the selected group/row inside the viewport.
        let height = area.height as usize;
        if selected_line < self.scroll {
            self.scroll = selected_line;
        } else if height > 0 && selected_line >= self.scroll + height {
            self.scroll = selected_line + 1 - height;
        }
        self.scroll = self.scroll.min(lines.len().saturating_sub(1));

        let visible: Vec<Line> = lines
            .into_iter()
            .skip(self.scroll)
            .take(height)
            .collect();
        frame.render_widget(Paragraph::new(Text::from(visible)), area);
    }

    fn draw_status(&self, view: &ViewData, area: Rect, frame: &mut Frame) {
        let line = if view.searching {
            let (before, after) = split_at_char(&view.input.text, view.input.cursor);
            let cursor = after.chars().next().map(String::from);
            let rest: String = after.chars().skip(1).collect();
            Line::from(vec![
                Span::from(" /").bold(),
                Span::from(before.to_string()),
                Span::styled(
                    cursor.unwrap_or_else(|| " ".to_string()),
                    Style::default().add_modifier(Modifier::REVERSED),
                ),
                Span::from(rest),
            ])
        } else if !view.query.is_empty() {
            Line::from(vec![
                Span::from(format!(" /{}", view.query)).yellow(),
                Span::from("  "),
                Span::from(view.status_message.clone()).dim(),
            ])
        } else {
            Line::from(Span::from(format!(" {}", view.status_message)).dim())
        };
        frame.render_widget(Paragraph::new(line), area);
    }

    fn draw_help(&self, frame: &mut Frame) {
        let area = centered_rect(frame.area(), 44, 20);
        frame.render_widget(Clear, area);
        let block = Block::bordered().title(" help ");
        frame.render_widget(Paragraph::new(HELP_TEXT).block(block), area);
    }

    /// Column widths from the currently displayed rows: wide enough for
    /// the header, no wider than the cap.
    fn column_widths(&self, view: &ViewData) -> Vec<usize> {
        Field::ALL
            .iter()
            .map(|&field| {
                let mut width = field.label().len();
                for group in &view.groups {
                    if !group.expanded {
                        continue;
                    }
                    for &ridx in &group.rows {
                        width = width.max(view.records[ridx].field(field).len());
                    }
                }
                width.clamp(MIN_COLUMN_WIDTH, self.config.max_column_width)
            })
            .collect()
    }
}

fn group_header(group: &GroupDisplay, selected: bool) -> Line<'static> {
    let marker = if group.expanded { "▾" } else { "▸" };
    let mut style = Style::default().bold();
    if selected {
        style = style.fg(Color::Blue);
    }
    let mut spans = vec![Span::styled(
        format!("{marker} {} ({})", group.key, group.total),
        style,
    )];
    if group.pages > 1 || group.page > 1 {
        spans.push(Span::from(format!("  page {}/{}", group.page, group.pages)).dim());
    }
    Line::from(spans)
}

fn column_header(widths: &[usize], sort: Option<SortSpec>, cursor_column: usize) -> Line<'static> {
    let mut spans: Vec<Span> = vec![Span::from("  ")];
    for (cidx, &field) in Field::ALL.iter().enumerate() {
        let arrow = match sort {
            Some(spec) if spec.key == field => match spec.dir {
                SortDir::Ascending => "▲",
                SortDir::Descending => "▼",
            },
            _ => "",
        };
        let cell = pad_cell(&format!("{}{arrow}", field.label()), widths[cidx]);
        let mut style = Style::default().add_modifier(Modifier::UNDERLINED);
        if cidx == cursor_column {
            style = style.fg(Color::Blue).bold();
        }
        spans.push(Span::styled(cell, style));
        spans.push(Span::from(" ".repeat(COLUMN_SPACING)));
    }
    Line::from(spans)
}

fn record_line(
    view: &ViewData,
    ridx: usize,
    row_idx: usize,
    group: &GroupDisplay,
    widths: &[usize],
    selected: bool,
) -> Line<'static> {
    let record = &view.records[ridx];
    let base = if selected {
        Style::default().add_modifier(Modifier::REVERSED)
    } else {
        Style::default()
    };
    let mut spans: Vec<Span> = vec![Span::styled("  ", base)];
    for (cidx, &field) in Field::ALL.iter().enumerate() {
        // The id column doubles as the running row number when absent.
        let raw = if field == Field::Id && record.field(field).is_empty() {
            ((group.page - 1) * view.page_size + row_idx + 1).to_string()
        } else {
            record.field(field).to_string()
        };
        let cell = pad_cell(&raw, widths[cidx]);
        spans.extend(highlight_spans(&cell, &view.query, base));
        spans.push(Span::styled(" ".repeat(COLUMN_SPACING), base));
    }
    Line::from(spans)
}

/// Truncate with an ellipsis or right-pad to exactly `width`.
fn pad_cell(value: &str, width: usize) -> String {
    let len = value.chars().count();
    if len > width {
        let kept: String = value.chars().take(width.saturating_sub(3)).collect();
        format!("{kept}...")
    } else {
        format!("{value}{}", " ".repeat(width - len))
    }
}

/// Split a cell into spans with the query occurrences marked, matching the
/// case-insensitive search. Falls back to a single span when byte offsets
/// in the lowercased text do not line up with the original.
fn highlight_spans(text: &str, query: &str, base: Style) -> Vec<Span<'static>> {
    let q = query.trim().to_lowercase();
    if q.is_empty() {
        return vec![Span::styled(text.to_string(), base)];
    }
    let lowered = text.to_lowercase();
    if lowered.len() != text.len() {
        return vec![Span::styled(text.to_string(), base)];
    }
    let mark = base.bg(Color::Yellow).fg(Color::Black);
    let mut spans = Vec::new();
    let mut pos = 0;
    for (start, matched) in lowered.match_indices(&q) {
        if start < pos {
            continue;
        }
        match (text.get(pos..start), text.get(start..start + matched.len())) {
            (Some(gap), Some(hit)) => {
                if !gap.is_empty() {
                    spans.push(Span::styled(gap.to_string(), base));
                }
                spans.push(Span::styled(hit.to_string(), mark));
                pos = start + matched.len();
            }
            _ => return vec![Span::styled(text.to_string(), base)],
        }
    }
    if let Some(rest) = text.get(pos..)
        && !rest.is_empty()
    {
        spans.push(Span::styled(rest.to_string(), base));
    }
    spans
}

fn centered_rect(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

fn split_at_char(text: &str, char_pos: usize) -> (&str, &str) {
    let byte = text
        .char_indices()
        .nth(char_pos)
        .map(|(b, _)| b)
        .unwrap_or(text.len());
    text.split_at(byte)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pad_cell_pads_and_truncates() {
        assert_eq!(pad_cell("ab", 4), "ab  ");
        assert_eq!(pad_cell("abcdefgh", 6), "abc...");
        assert_eq!(pad_cell("abcd", 4), "abcd");
    }

    #[test]
    fn highlight_marks_case_insensitive_matches() {
        let spans = highlight_spans("Jane Roe", "jane", Style::default());
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].content, "Jane");
        assert_eq!(spans[1].content, " Roe");
    }

    #[test]
    fn highlight_handles_repeats_and_misses() {
        let spans = highlight_spans("aXaXa", "x", Style::default());
        let joined: String = spans.iter().map(|s| s.content.as_ref()).collect::<String>();
        assert_eq!(joined, "aXaXa");
        assert_eq!(spans.len(), 5);

        let spans = highlight_spans("nothing", "zz", Style::default());
        assert_eq!(spans.len(), 1);
    }

    #[test]
    fn split_at_char_is_unicode_safe() {
        assert_eq!(split_at_char("Nyõro", 3), ("Nyõ", "ro"));
        assert_eq!(split_at_char("ab", 9), ("ab", ""));
    }
}
